//! Updates Configuration
//!
//! The immutable configuration value the host hands us at process start.
//! Loading and parsing build-time settings is the host's job; this module
//! only defines the shape and resolves the effective runtime version.

use serde::{Deserialize, Serialize};

/// When the manager should check the remote source for new updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOnLaunch {
    Always,
    WifiOnly,
    Never,
    /// Check only after a launch failure has been detected. The trigger for
    /// that check comes from the host, out of band.
    ErrorRecoveryOnly,
}

impl Default for CheckOnLaunch {
    fn default() -> Self {
        Self::Always
    }
}

/// Immutable update-manager configuration, loaded once at process start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatesConfig {
    /// Explicit runtime compatibility version, if the host configured one.
    #[serde(default)]
    pub runtime_version: Option<String>,
    /// SDK version, used as the runtime version when none is set explicitly.
    #[serde(default)]
    pub sdk_version: Option<String>,
    #[serde(default)]
    pub check_on_launch: CheckOnLaunch,
    /// Key scoping this installation's cache from others sharing the device.
    pub scope_key: String,
}

impl UpdatesConfig {
    /// Resolve the runtime version every downstream component branches on.
    ///
    /// Falls back from `runtime_version` to `sdk_version` to the literal
    /// `"1"`, so callers never have to handle a missing version.
    pub fn effective_runtime_version(&self) -> String {
        self.runtime_version
            .clone()
            .or_else(|| self.sdk_version.clone())
            .unwrap_or_else(|| "1".to_string())
    }
}
