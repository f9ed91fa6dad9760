use anyhow::Result;
use serde_json::json;
use tracing::info;

use crate::cli::commands::connection;

use super::{connect, report};

/// Print the negotiated API version.
/// # Errors
/// Returns an error if no core answers or no version is shared.
pub async fn api_version(options: &connection::Options) -> Result<()> {
    let functions = connect(options)?;
    let version = functions.api_version().await?;
    info!("negotiated api version {version}");
    report(
        &functions,
        &json!({
            "version": version.to_string(),
            "supported": functions.config().supported_versions,
        }),
    )
}

/// Print the handshake snapshot.
/// # Errors
/// Returns an error if the handshake cannot be fetched.
pub async fn handshake(options: &connection::Options) -> Result<()> {
    let functions = connect(options)?;
    let handshake = functions.handshake().get().await?;
    report(&functions, handshake.as_ref())
}
