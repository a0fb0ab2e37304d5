//! Airlift - client-side over-the-air update manager core
//!
//! Maintains a content-addressable on-disk cache of downloaded update
//! bundles, verifies their integrity, decides when to check the remote
//! source for new versions, and selects which locally available version the
//! application boots.
//!
//! Components:
//! - `digest` - SHA-256 fingerprints (hex and URL-safe base64)
//! - `store` - crash-safe content-addressed directory store
//! - `config` - updates configuration and runtime-version resolution
//! - `policy` - launch-time check decision
//! - `selection` - which update to boot
//! - `events` - lifecycle event fan-out
//! - `diag` - diagnostic log store and retention sweeper
//! - `scheduler` - primary-thread marshal
//! - `manager` - facade tying the subsystems together
//!
//! The download transport, configuration loading, and the host UI bridge are
//! external collaborators; this crate only consumes completed, byte-verified
//! payloads and an already-parsed configuration value.

pub mod config;
pub mod diag;
pub mod digest;
pub mod error;
pub mod events;
pub mod manager;
pub mod policy;
pub mod scheduler;
pub mod selection;
pub mod store;
pub mod update;

pub use config::{CheckOnLaunch, UpdatesConfig};
pub use diag::{spawn_retention_sweeper, DiagnosticLog, LogEntry, LogLevel, DEFAULT_RETENTION};
pub use error::{Result, StorageError};
pub use events::{EventEmitter, LifecycleEvent, Subscription};
pub use manager::{DownloadedUpdate, UpdateManager};
pub use policy::{should_check_for_update, Connectivity, ConnectivityProbe};
pub use scheduler::PrimaryThreadMarshal;
pub use selection::{select_update_to_launch, SelectorState};
pub use store::{PlatformRootResolver, RootResolver, UpdateDirectoryStore};
pub use update::{Asset, SelectedUpdate, UpdateRecord};
