use crate::cli::actions::{probe, session, Action};
use anyhow::Result;

/// Execute the provided action.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::ApiVersion(options) => probe::api_version(&options).await,
        Action::Handshake(options) => probe::handshake(&options).await,
        Action::Create(args) => session::create(args).await,
        Action::Verify(args) => session::verify(args).await,
        Action::Refresh(args) => session::refresh(args).await,
        Action::Revoke(args) => session::revoke(args).await,
        Action::Sessions(args) => session::sessions(args).await,
    }
}
