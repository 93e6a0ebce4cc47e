//! File-based caching of prepared artifacts.
//!
//! Every prepared table is written once per cache key and reused on later runs. The key
//! covers everything the artifact depends on: the artifact kind, the region set (by name
//! and geometry identity), the data year, the source version and, for weather-driven
//! artifacts, the weather year. A TOML manifest is written next to each payload; if the
//! manifest does not match the requested key, or the payload bytes do not match the
//! recorded digest, the artifact is recomputed instead of trusted.
use anyhow::{ensure, Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// File extension of cached payloads
const PAYLOAD_EXTENSION: &str = "csv";
/// Suffix of the manifest written next to each payload
const MANIFEST_SUFFIX: &str = ".manifest.toml";

/// Everything a cached artifact depends on
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ArtifactKey {
    /// The artifact kind ("powerplants", "feedin_wind", ...)
    pub kind: String,
    /// Name of the region set the artifact was prepared for
    pub region_set_name: String,
    /// Geometry identity of the region set (hex SHA-256)
    pub region_set_identity: String,
    /// The data year
    pub year: u32,
    /// Version of the underlying source dataset
    pub source_version: String,
    /// The weather year, for weather-driven artifacts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_year: Option<u32>,
}

impl ArtifactKey {
    /// The payload file name for this key, without directories
    fn file_name(&self) -> String {
        match self.weather_year {
            Some(weather_year) => format!(
                "{}_{}_wy{}_{}.{PAYLOAD_EXTENSION}",
                self.kind, self.year, weather_year, self.source_version
            ),
            None => format!(
                "{}_{}_{}.{PAYLOAD_EXTENSION}",
                self.kind, self.year, self.source_version
            ),
        }
    }

    /// The directory for this key below the cache root, one per region set
    fn directory(&self) -> String {
        let short = &self.region_set_identity[..self.region_set_identity.len().min(8)];
        format!("{}_{short}", self.region_set_name)
    }
}

/// The manifest written next to each cached payload
#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    /// The key the payload was computed for
    #[serde(flatten)]
    key: ArtifactKey,
    /// Hex SHA-256 digest of the payload bytes
    sha256: String,
    /// When the payload was written (RFC 3339, UTC)
    written: String,
}

/// The outcome of a cache lookup
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CacheStatus {
    /// The payload was already present and valid
    Hit,
    /// The payload was computed for the first time
    Computed,
    /// A stale or corrupt payload was replaced
    Refreshed,
}

/// A summary of one cached artifact, as reported by [`ArtifactCache::info`]
#[derive(Debug)]
pub struct CacheEntry {
    /// Path of the payload file
    pub path: PathBuf,
    /// The key the payload was computed for
    pub key: ArtifactKey,
    /// Payload size in bytes
    pub size: u64,
}

/// A file-based artifact cache below a root directory
#[derive(Clone, Debug)]
pub struct ArtifactCache {
    /// The cache root directory
    root: PathBuf,
    /// Recompute even when a valid payload exists
    overwrite: bool,
}

impl ArtifactCache {
    /// Create a cache below `root`. The directory is created lazily on first write.
    pub fn new<P: AsRef<Path>>(root: P, overwrite: bool) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            overwrite,
        }
    }

    /// The payload path for a key
    pub fn payload_path(&self, key: &ArtifactKey) -> PathBuf {
        self.root.join(key.directory()).join(key.file_name())
    }

    /// The manifest path for a payload path
    fn manifest_path(payload: &Path) -> PathBuf {
        let mut name = payload.file_name().unwrap_or_default().to_os_string();
        name.push(MANIFEST_SUFFIX);
        payload.with_file_name(name)
    }

    /// Return the cached payload for `key`, computing it with `compute` if necessary.
    ///
    /// `compute` must produce the complete payload as a string; artifacts are written
    /// atomically via a temporary file so a failed run never leaves a half-written payload
    /// behind a valid manifest.
    pub fn fetch_with<F>(&self, key: &ArtifactKey, compute: F) -> Result<(PathBuf, CacheStatus)>
    where
        F: FnOnce() -> Result<String>,
    {
        let payload_path = self.payload_path(key);
        let mut status = CacheStatus::Computed;
        if payload_path.exists() {
            if !self.overwrite && self.is_valid(key, &payload_path)? {
                info!("Using cached {} ({}).", key.kind, payload_path.display());
                return Ok((payload_path, CacheStatus::Hit));
            }
            status = CacheStatus::Refreshed;
            if !self.overwrite {
                warn!(
                    "Cached {} at {} is stale, recomputing.",
                    key.kind,
                    payload_path.display()
                );
            }
        }

        info!("Computing {} for {}...", key.kind, key.region_set_name);
        let payload = compute()?;
        self.write(key, &payload_path, &payload)?;

        Ok((payload_path, status))
    }

    /// Check a payload against its manifest
    fn is_valid(&self, key: &ArtifactKey, payload_path: &Path) -> Result<bool> {
        let manifest_path = Self::manifest_path(payload_path);
        if !manifest_path.exists() {
            return Ok(false);
        }
        let contents = fs::read_to_string(&manifest_path)
            .with_context(|| format!("Could not read manifest {}", manifest_path.display()))?;
        let Ok(manifest) = toml::from_str::<Manifest>(&contents) else {
            return Ok(false);
        };
        if &manifest.key != key {
            return Ok(false);
        }

        let payload = fs::read(payload_path)
            .with_context(|| format!("Could not read payload {}", payload_path.display()))?;
        Ok(digest(&payload) == manifest.sha256)
    }

    /// Write a payload and its manifest
    fn write(&self, key: &ArtifactKey, payload_path: &Path, payload: &str) -> Result<()> {
        let directory = payload_path
            .parent()
            .context("Payload path has no parent directory")?;
        fs::create_dir_all(directory)
            .with_context(|| format!("Could not create cache directory {}", directory.display()))?;

        let tmp_path = payload_path.with_extension("tmp");
        fs::write(&tmp_path, payload)
            .with_context(|| format!("Could not write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, payload_path)
            .with_context(|| format!("Could not move payload into {}", payload_path.display()))?;

        let manifest = Manifest {
            key: key.clone(),
            sha256: digest(payload.as_bytes()),
            written: chrono::Utc::now().to_rfc3339(),
        };
        let manifest_path = Self::manifest_path(payload_path);
        fs::write(
            &manifest_path,
            toml::to_string(&manifest).context("Could not serialise manifest")?,
        )
        .with_context(|| format!("Could not write manifest {}", manifest_path.display()))?;

        Ok(())
    }

    /// List all cached artifacts with a readable manifest
    pub fn info(&self) -> Result<Vec<CacheEntry>> {
        let mut entries = Vec::new();
        if !self.root.exists() {
            return Ok(entries);
        }

        for directory in read_sorted_dir(&self.root)? {
            if !directory.is_dir() {
                continue;
            }
            for path in read_sorted_dir(&directory)? {
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if !name.ends_with(MANIFEST_SUFFIX) {
                    continue;
                }
                let contents = fs::read_to_string(&path)
                    .with_context(|| format!("Could not read manifest {}", path.display()))?;
                let Ok(manifest) = toml::from_str::<Manifest>(&contents) else {
                    warn!("Skipping unreadable manifest {}.", path.display());
                    continue;
                };
                let payload_path =
                    path.with_file_name(name.trim_end_matches(MANIFEST_SUFFIX));
                let size = fs::metadata(&payload_path).map(|m| m.len()).unwrap_or(0);
                entries.push(CacheEntry {
                    path: payload_path,
                    key: manifest.key,
                    size,
                });
            }
        }

        Ok(entries)
    }

    /// Delete the whole cache directory
    pub fn clear(&self) -> Result<()> {
        if !self.root.exists() {
            info!("Cache directory {} does not exist.", self.root.display());
            return Ok(());
        }
        ensure!(
            self.root.is_dir(),
            "Cache root {} is not a directory",
            self.root.display()
        );
        fs::remove_dir_all(&self.root)
            .with_context(|| format!("Could not remove {}", self.root.display()))?;
        info!("Removed cache directory {}.", self.root.display());

        Ok(())
    }
}

/// Hex SHA-256 digest of a byte slice
fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Directory entries in name order, for deterministic listings
fn read_sorted_dir(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<_> = fs::read_dir(directory)
        .with_context(|| format!("Could not read directory {}", directory.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    paths.sort();

    Ok(paths)
}
