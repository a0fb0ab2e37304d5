//! Update Data Model
//!
//! Immutable snapshots of updates and their assets. An `Asset` is either
//! embedded (shipped inside the application package) or cached (persisted in
//! the directory store under its digest), never neither. An `UpdateRecord`
//! never changes after it is committed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A single update asset, identified by the SHA-256 of its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Lowercase hex SHA-256 of the asset bytes (64 chars).
    pub digest_hex: String,
    pub size_bytes: u64,
    /// Path in the directory store, set once the asset is persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    /// Filename inside the application package, for embedded assets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded_filename: Option<String>,
    /// Directory inside the application package, for embedded assets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded_directory: Option<String>,
}

impl Asset {
    /// An asset persisted in the directory store. Takes the path the store
    /// returned from `put_asset`, so a cached asset always carries its
    /// location and is never in the neither-embedded-nor-cached state.
    pub fn cached(digest_hex: String, size_bytes: u64, local_path: PathBuf) -> Self {
        Self {
            digest_hex,
            size_bytes,
            local_path: Some(local_path),
            embedded_filename: None,
            embedded_directory: None,
        }
    }

    /// An asset shipped inside the application package at build time.
    pub fn embedded(
        digest_hex: String,
        size_bytes: u64,
        filename: String,
        directory: String,
    ) -> Self {
        Self {
            digest_hex,
            size_bytes,
            local_path: None,
            embedded_filename: Some(filename),
            embedded_directory: Some(directory),
        }
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded_filename.is_some() && self.embedded_directory.is_some()
    }

    pub fn is_cached(&self) -> bool {
        self.local_path.is_some()
    }
}

/// A committed (or about-to-be-committed) update.
///
/// `id` is the hex SHA-256 of `manifest_body`, so identical manifests from
/// different checks collapse onto one record. Asset order is manifest order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRecord {
    pub id: String,
    pub runtime_version: String,
    pub assets: Vec<Asset>,
    #[serde(with = "manifest_body_serde")]
    pub manifest_body: Vec<u8>,
    pub committed_at: DateTime<Utc>,
}

impl UpdateRecord {
    pub fn new(
        id: String,
        runtime_version: String,
        assets: Vec<Asset>,
        manifest_body: Vec<u8>,
    ) -> Self {
        Self {
            id,
            runtime_version,
            assets,
            manifest_body,
            committed_at: Utc::now(),
        }
    }
}

/// What the application should boot this launch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectedUpdate {
    /// Fall back to the version bundled into the application package.
    Embedded,
    /// Boot a committed update from the directory store.
    Stored(UpdateRecord),
}

impl SelectedUpdate {
    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::Embedded)
    }
}

/// The manifest body is opaque bytes; store it base64-encoded so record files
/// stay valid JSON regardless of content.
mod manifest_body_serde {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        STANDARD.encode(bytes).serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(de)?;
        STANDARD.decode(&encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::sha256_hex;

    #[test]
    fn test_asset_kinds() {
        let digest = sha256_hex(b"bundle");
        let cached = Asset::cached(
            digest.clone(),
            6,
            PathBuf::from("assets").join(&digest),
        );
        assert!(!cached.is_embedded());
        assert!(cached.is_cached());

        let embedded = Asset::embedded(
            sha256_hex(b"icon"),
            4,
            "icon.png".to_string(),
            "assets".to_string(),
        );
        assert!(embedded.is_embedded());
        assert!(!embedded.is_cached());
    }

    #[test]
    fn test_record_round_trips_as_json() {
        let body = b"{\"assets\":[]}".to_vec();
        let record = UpdateRecord::new(
            sha256_hex(&body),
            "1".to_string(),
            vec![Asset::cached(
                sha256_hex(b"bundle"),
                6,
                PathBuf::from("assets").join(sha256_hex(b"bundle")),
            )],
            body,
        );
        let json = serde_json::to_string(&record).unwrap();
        let parsed: UpdateRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, record.id);
        assert_eq!(parsed.manifest_body, record.manifest_body);
        assert_eq!(parsed.committed_at, record.committed_at);
    }
}
