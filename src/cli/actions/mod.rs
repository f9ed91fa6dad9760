pub mod probe;
pub mod session;

mod run;

use anyhow::Result;
use serde::Serialize;
use serde_json::{json, Value};

use crate::{cli::commands::connection, SessionFunctions};

#[derive(Debug)]
pub enum Action {
    ApiVersion(connection::Options),
    Handshake(connection::Options),
    Create(session::CreateArgs),
    Verify(session::VerifyArgs),
    Refresh(session::RefreshArgs),
    Revoke(session::RevokeArgs),
    Sessions(session::SessionsArgs),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> Result<()> {
        run::execute(self).await
    }
}

/// Build a session context for the configured core.
fn connect(options: &connection::Options) -> Result<SessionFunctions> {
    Ok(SessionFunctions::new(options.config()?)?)
}

/// Print `result` as pretty JSON, wrapped with the visited hosts when recorded.
fn report<T: Serialize>(functions: &SessionFunctions, result: &T) -> Result<()> {
    let result = serde_json::to_value(result)?;
    let output = if functions.config().record_visited_hosts {
        json!({
            "result": result,
            "visitedHosts": functions.querier().visited_hosts(),
        })
    } else {
        result
    };
    print(&output)
}

fn print(value: &Value) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
