//! Check Policy Engine
//!
//! Decides whether an update check should happen now, given configuration
//! and live connectivity. Pure over its two inputs; connectivity comes from
//! an injected probe so the decision stays testable without real network
//! state.

use crate::config::{CheckOnLaunch, UpdatesConfig};

/// Connectivity as reported by the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Wifi,
    Cellular,
    None,
    Unknown,
}

/// Supplies the current link state. Implemented by the host.
pub trait ConnectivityProbe {
    fn current_connectivity(&self) -> Connectivity;
}

/// Whether to perform an update check right now.
///
/// `WifiOnly` requires an unmetered link; an undeterminable state counts as
/// "no", not an error. `ErrorRecoveryOnly` always answers no here - that
/// policy's check is triggered out of band, after a launch failure is
/// detected.
pub fn should_check_for_update(config: &UpdatesConfig, connectivity: Connectivity) -> bool {
    match config.check_on_launch {
        CheckOnLaunch::Always => true,
        CheckOnLaunch::Never => false,
        CheckOnLaunch::WifiOnly => connectivity == Connectivity::Wifi,
        CheckOnLaunch::ErrorRecoveryOnly => false,
    }
}
