//! Update Manager
//!
//! Facade wiring the subsystems together: policy consultation, the
//! commit pipeline for payloads the download transport hands us, the
//! launch-time selection query, and lifecycle event fan-out.

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::config::UpdatesConfig;
use crate::diag::{DiagnosticLog, LogLevel};
use crate::digest::sha256_hex;
use crate::error::Result;
use crate::events::{EventEmitter, LifecycleEvent, Subscription};
use crate::policy::{should_check_for_update, ConnectivityProbe};
use crate::selection::select_update_to_launch;
use crate::store::UpdateDirectoryStore;
use crate::update::{Asset, SelectedUpdate, UpdateRecord};

/// A fully downloaded, byte-verified payload from the download transport.
#[derive(Debug)]
pub struct DownloadedUpdate {
    /// Raw manifest bytes; their SHA-256 becomes the record id.
    pub manifest_body: Vec<u8>,
    /// Runtime compatibility version declared by the manifest.
    pub runtime_version: String,
    /// `(digest_hex, bytes)` pairs for every asset the manifest references,
    /// in manifest order.
    pub assets: Vec<(String, Vec<u8>)>,
}

/// Client-side over-the-air update manager.
///
/// One instance per process. The launch query is answered synchronously and
/// cached: the first call decides what this launch boots and later calls
/// return the same answer.
pub struct UpdateManager {
    config: UpdatesConfig,
    store: Arc<UpdateDirectoryStore>,
    emitter: EventEmitter,
    diag: Option<DiagnosticLog>,
    selection: Mutex<Option<SelectedUpdate>>,
}

impl UpdateManager {
    pub fn new(config: UpdatesConfig, store: UpdateDirectoryStore) -> Self {
        Self {
            config,
            store: Arc::new(store),
            emitter: EventEmitter::new(),
            diag: None,
            selection: Mutex::new(None),
        }
    }

    /// Attach a diagnostic log; non-fatal pipeline failures get recorded
    /// there in addition to tracing output.
    pub fn with_diagnostic_log(mut self, diag: DiagnosticLog) -> Self {
        self.diag = Some(diag);
        self
    }

    pub fn config(&self) -> &UpdatesConfig {
        &self.config
    }

    pub fn store(&self) -> &UpdateDirectoryStore {
        &self.store
    }

    /// Event Subscriber API. Subscribe before starting an operation to get
    /// guaranteed delivery; nothing is replayed.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        self.emitter.subscribe(listener)
    }

    /// Consult the check policy against live connectivity.
    pub fn should_check_for_update(&self, probe: &dyn ConnectivityProbe) -> bool {
        should_check_for_update(&self.config, probe.current_connectivity())
    }

    /// Announce that a remote check is starting.
    ///
    /// Also the entry point for the out-of-band check after a detected
    /// launch failure under the `ErrorRecoveryOnly` policy.
    pub fn begin_check(&self) {
        self.emitter.publish(&LifecycleEvent::CheckStarted);
    }

    /// Announce that a completed check found nothing new.
    pub fn finish_check_no_update(&self) {
        self.emitter.publish(&LifecycleEvent::NoUpdateAvailable);
    }

    /// Launch Query API: which update should this process boot.
    ///
    /// Synchronous and O(committed records); no network, no blocking on a
    /// check in flight. A store that failed to commit a record simply does
    /// not contribute that record as a candidate, and a store that cannot be
    /// read at all yields the embedded fallback - the launch path never
    /// fails.
    pub fn select_update_to_launch(&self) -> SelectedUpdate {
        let mut selection = self.selection.lock().unwrap();
        if let Some(selected) = selection.as_ref() {
            return selected.clone();
        }

        let records = match self.store.committed_records() {
            Ok(records) => records,
            Err(err) => {
                warn!("could not read committed records, booting embedded: {}", err);
                self.log_diag(LogLevel::Warn, format!("record scan failed: {}", err));
                Vec::new()
            }
        };
        let selected =
            select_update_to_launch(&records, &self.config.effective_runtime_version());
        debug!(
            "selected update for launch: {}",
            match &selected {
                SelectedUpdate::Embedded => "embedded".to_string(),
                SelectedUpdate::Stored(r) => r.id.clone(),
            }
        );
        *selection = Some(selected.clone());
        selected
    }

    /// Verify and persist a downloaded update, all or nothing.
    ///
    /// Assets are persisted first, the manifest record last, so an abandoned
    /// or failed check never leaves a partially committed record. On success
    /// the committed record is published as `UpdateAvailable`; on failure an
    /// `Error` event is published and the storage error is returned for the
    /// download pipeline to decide retry vs. abandon.
    pub async fn commit_downloaded_update(
        &self,
        download: DownloadedUpdate,
    ) -> Result<UpdateRecord> {
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || commit_to_store(&store, download))
            .await
            .map_err(|e| {
                crate::error::StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("commit task failed: {}", e),
                ))
            })?;

        match result {
            Ok(record) => {
                self.emitter
                    .publish(&LifecycleEvent::UpdateAvailable(record.clone()));
                Ok(record)
            }
            Err(err) => {
                self.log_diag(LogLevel::Error, format!("commit failed: {}", err));
                self.emitter.publish(&LifecycleEvent::Error {
                    kind: "storage".to_string(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn log_diag(&self, level: LogLevel, message: String) {
        if let Some(diag) = &self.diag {
            if let Err(err) = diag.append(level, message) {
                warn!("diagnostic log append failed: {}", err);
            }
        }
    }
}

fn commit_to_store(store: &UpdateDirectoryStore, download: DownloadedUpdate) -> Result<UpdateRecord> {
    let id = sha256_hex(&download.manifest_body);

    let mut assets = Vec::with_capacity(download.assets.len());
    for (digest_hex, bytes) in &download.assets {
        let local_path = store.put_asset(digest_hex, bytes)?;
        assets.push(Asset::cached(
            digest_hex.clone(),
            bytes.len() as u64,
            local_path,
        ));
    }

    let record = UpdateRecord::new(id, download.runtime_version, assets, download.manifest_body);
    store.commit_update_record(&record)?;
    Ok(record)
}
