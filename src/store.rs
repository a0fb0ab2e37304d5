//! Update Directory Store
//!
//! Content-addressable on-disk cache for downloaded assets and committed
//! update records. Layout under the root:
//!
//! - `assets/<digest_hex>` - one file per asset, named by its SHA-256
//! - `updates/<record_id>.json` - one manifest record per committed update
//!
//! All mutation goes through write-to-temp then atomic rename, so a reader
//! never observes a partially written file under a final name. Identical
//! content always resolves to the same path, which deduplicates assets
//! shared by digest across updates.

use std::fs;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::digest::{is_valid_hex_digest, sha256_hex};
use crate::error::{Result, StorageError};
use crate::update::UpdateRecord;

/// Resolves where the updates root lives on this platform.
///
/// Injected at construction so tests and embedders can point the store at an
/// arbitrary directory.
pub trait RootResolver {
    fn updates_root(&self) -> Result<PathBuf>;
}

/// Default resolver: a hidden cache directory under the platform's
/// application-data location.
///
/// Linux: `~/.local/share/airlift/`
/// Windows: `%LOCALAPPDATA%\Airlift\`
/// macOS: `~/Library/Application Support/Airlift/`
pub struct PlatformRootResolver;

impl RootResolver for PlatformRootResolver {
    fn updates_root(&self) -> Result<PathBuf> {
        #[cfg(target_os = "windows")]
        let base = dirs::data_local_dir().map(|d| d.join("Airlift"));

        #[cfg(target_os = "macos")]
        let base = dirs::data_dir().map(|d| d.join("Airlift"));

        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        let base = dirs::data_dir().map(|d| d.join("airlift"));

        base.ok_or_else(|| {
            StorageError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "no application data directory for this platform",
            ))
        })
    }
}

/// Handle to the content-addressed updates cache.
///
/// Cheap to clone conceptually but deliberately not `Clone`: share it by
/// reference (or use [`UpdateDirectoryStore::shared`]) so all writers go
/// through one handle per root.
#[derive(Debug)]
pub struct UpdateDirectoryStore {
    root: PathBuf,
}

impl UpdateDirectoryStore {
    /// Open (creating if absent) the store at `root`.
    ///
    /// Idempotent and safe under concurrent first-time callers: directory
    /// creation is atomic at the filesystem level, overlapping calls are a
    /// no-op race, and the existence/type re-check after creation catches a
    /// root that exists as a plain file.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        Self::ensure_directory(&root)?;
        let store = Self { root };
        Self::ensure_directory(&store.assets_dir())?;
        Self::ensure_directory(&store.updates_dir())?;
        Ok(store)
    }

    /// Open the store at the platform default root, using the given resolver.
    pub fn open_with_resolver(resolver: &dyn RootResolver) -> Result<Self> {
        Self::open(resolver.updates_root()?)
    }

    /// Process-wide shared store at the platform default root.
    ///
    /// First caller performs creation; racing callers each build a handle to
    /// the same (idempotently created) directory and converge on whichever
    /// was cached first. No caller ever observes a half-created root.
    pub fn shared() -> Result<&'static Self> {
        static SHARED: OnceLock<UpdateDirectoryStore> = OnceLock::new();
        if let Some(store) = SHARED.get() {
            return Ok(store);
        }
        let built = Self::open_with_resolver(&PlatformRootResolver)?;
        Ok(SHARED.get_or_init(|| built))
    }

    fn ensure_directory(path: &Path) -> Result<()> {
        if let Err(err) = fs::create_dir_all(path) {
            if err.kind() != io::ErrorKind::AlreadyExists {
                return Err(StorageError::from_io(err, path));
            }
        }
        // Reconcile: creation raced or the path pre-existed; it must be a
        // directory now or the store cannot proceed.
        let meta = fs::metadata(path).map_err(|e| StorageError::from_io(e, path))?;
        if !meta.is_dir() {
            return Err(StorageError::NotADirectory(path.to_path_buf()));
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    fn updates_dir(&self) -> PathBuf {
        self.root.join("updates")
    }

    /// Final path for an asset, derivable from its digest alone.
    pub fn asset_path(&self, digest_hex: &str) -> PathBuf {
        self.assets_dir().join(digest_hex)
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.updates_dir().join(format!("{}.json", id))
    }

    /// Persist asset bytes under their digest.
    ///
    /// Writes to a uniquely named temp file in the assets directory, hashes
    /// what actually landed on disk, and only then renames into place. A
    /// digest mismatch discards the temp file and leaves nothing visible at
    /// the final path. Two concurrent writers of the same digest both rename
    /// bit-identical content, so write order does not matter.
    pub fn put_asset(&self, digest_hex: &str, bytes: &[u8]) -> Result<PathBuf> {
        if !is_valid_hex_digest(digest_hex) {
            return Err(StorageError::IntegrityMismatch {
                expected: digest_hex.to_string(),
                actual: sha256_hex(bytes),
            });
        }

        let assets_dir = self.assets_dir();
        let mut tmp = NamedTempFile::new_in(&assets_dir)
            .map_err(|e| StorageError::from_io(e, &assets_dir))?;
        tmp.write_all(bytes)
            .and_then(|_| tmp.flush())
            .map_err(|e| StorageError::from_io(e, tmp.path()))?;

        let written = sha256_file(tmp.path()).map_err(|e| StorageError::from_io(e, tmp.path()))?;
        if written != digest_hex {
            // NamedTempFile removes itself on drop.
            return Err(StorageError::IntegrityMismatch {
                expected: digest_hex.to_string(),
                actual: written,
            });
        }

        let final_path = self.asset_path(digest_hex);
        tmp.persist(&final_path)
            .map_err(|e| StorageError::from_io(e.error, &final_path))?;
        Ok(final_path)
    }

    /// Look up an already persisted asset. Existence check only.
    pub fn get_asset(&self, digest_hex: &str) -> Option<PathBuf> {
        let path = self.asset_path(digest_hex);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    /// Commit a fully downloaded update.
    ///
    /// Every non-embedded asset must already be persisted; otherwise the
    /// record would dangle and the commit is refused. The rename of the
    /// manifest file is the commit barrier: once this returns, every
    /// subsequent [`committed_records`](Self::committed_records) call from
    /// any thread sees the record.
    pub fn commit_update_record(&self, record: &UpdateRecord) -> Result<()> {
        for asset in &record.assets {
            if asset.is_embedded() {
                continue;
            }
            if self.get_asset(&asset.digest_hex).is_none() {
                return Err(StorageError::AssetNotPersisted(asset.digest_hex.clone()));
            }
        }

        let updates_dir = self.updates_dir();
        let body = serde_json::to_vec_pretty(record)
            .map_err(|e| StorageError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        let mut tmp = NamedTempFile::new_in(&updates_dir)
            .map_err(|e| StorageError::from_io(e, &updates_dir))?;
        tmp.write_all(&body)
            .and_then(|_| tmp.flush())
            .map_err(|e| StorageError::from_io(e, tmp.path()))?;

        let final_path = self.record_path(&record.id);
        tmp.persist(&final_path)
            .map_err(|e| StorageError::from_io(e.error, &final_path))?;
        Ok(())
    }

    /// All committed update records, in no particular order.
    ///
    /// A record file that cannot be read or parsed is skipped with a warning
    /// rather than failing the launch path; it simply does not become a
    /// launch candidate.
    pub fn committed_records(&self) -> Result<Vec<UpdateRecord>> {
        let updates_dir = self.updates_dir();
        let entries =
            fs::read_dir(&updates_dir).map_err(|e| StorageError::from_io(e, &updates_dir))?;

        let mut records = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(err) => {
                    warn!("skipping unreadable updates entry: {}", err);
                    continue;
                }
            };
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            // Tolerate files vanishing between listing and reading; record
            // removal is driven externally.
            let content = match fs::read(&path) {
                Ok(content) => content,
                Err(err) => {
                    warn!("skipping unreadable record {}: {}", path.display(), err);
                    continue;
                }
            };
            match serde_json::from_slice::<UpdateRecord>(&content) {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!("skipping corrupt record {}: {}", path.display(), err);
                }
            }
        }
        Ok(records)
    }
}

/// Streaming SHA-256 of a file's content.
fn sha256_file(path: &Path) -> io::Result<String> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();

    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(hex::encode(hasher.finalize()))
}
