use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Request header naming the frontend SDK that sent the request.
pub const SDK_NAME_HEADER: &str = "supertokens-sdk-name";
/// Request header carrying the frontend SDK version.
pub const SDK_VERSION_HEADER: &str = "supertokens-sdk-version";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontendSdk {
    pub name: String,
    pub version: String,
}

/// Frontend SDKs seen so far, reported to the core as `deviceDriverInfo`.
#[derive(Debug, Default)]
pub struct DeviceInfo {
    frontend_sdks: Mutex<Vec<FrontendSdk>>,
}

impl DeviceInfo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an SDK; duplicates are ignored.
    pub fn add_frontend_sdk(&self, sdk: FrontendSdk) {
        let mut sdks = self
            .frontend_sdks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if !sdks.contains(&sdk) {
            sdks.push(sdk);
        }
    }

    #[must_use]
    pub fn frontend_sdks(&self) -> Vec<FrontendSdk> {
        self.frontend_sdks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// The `deviceDriverInfo` object attached to session-relevant requests.
    #[must_use]
    pub fn driver_info(&self) -> Value {
        json!({
            "frontendSDK": self.frontend_sdks(),
            "driver": {
                "name": crate::DRIVER_NAME,
                "version": crate::DRIVER_VERSION,
            },
        })
    }
}
