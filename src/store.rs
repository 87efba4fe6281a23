//! Flat JSON lists persisted in the data directory: custom app shortcuts,
//! certificate pairs and repository sources.

use crate::error::{Result, SilqueError};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

pub const APPS_FILE: &str = "apps.json";
pub const CERTIFICATES_FILE: &str = "certificates.json";
pub const SOURCES_FILE: &str = "sources.json";

/// Items kept in a store list.
pub trait StoredItem: Serialize + DeserializeOwned {
    fn id(&self) -> Uuid;

    /// Case-insensitive search over the user-visible fields.
    fn matches(&self, query: &str) -> bool;
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn non_empty(value: &str, what: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SilqueError::InvalidInput(format!("{} must not be empty", what)));
    }
    Ok(value.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppItem {
    pub id: Uuid,
    pub name: String,
    pub icon: String,
}

impl AppItem {
    pub const DEFAULT_ICON: &'static str = "app.fill";

    pub fn new(name: &str, icon: Option<&str>) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            name: non_empty(name, "app name")?,
            icon: icon
                .map(str::trim)
                .filter(|i| !i.is_empty())
                .unwrap_or(Self::DEFAULT_ICON)
                .to_string(),
        })
    }
}

impl StoredItem for AppItem {
    fn id(&self) -> Uuid {
        self.id
    }

    fn matches(&self, query: &str) -> bool {
        contains_ci(&self.name, query)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceItem {
    pub id: Uuid,
    pub name: String,
    pub url: String,
}

impl SourceItem {
    pub fn new(name: &str, url: &str) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            name: non_empty(name, "source name")?,
            url: non_empty(url, "source URL")?,
        })
    }
}

impl StoredItem for SourceItem {
    fn id(&self) -> Uuid {
        self.id
    }

    fn matches(&self, query: &str) -> bool {
        contains_ci(&self.name, query) || contains_ci(&self.url, query)
    }
}

/// A `.p12` certificate and its `.mobileprovision` profile, referenced by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificatePair {
    pub id: Uuid,
    pub p12_path: PathBuf,
    pub mobileprovision_path: PathBuf,
}

impl CertificatePair {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(p12: P, mobileprovision: Q) -> Result<Self> {
        let p12 = p12.as_ref();
        let mobileprovision = mobileprovision.as_ref();

        for (path, ext) in [(p12, "p12"), (mobileprovision, "mobileprovision")] {
            if !path.is_file() {
                return Err(SilqueError::FileNotFound(path.to_path_buf()));
            }
            let matches = path
                .extension()
                .map(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
                .unwrap_or(false);
            if !matches {
                return Err(SilqueError::InvalidInput(format!(
                    "{} is not a .{} file",
                    path.display(),
                    ext
                )));
            }
        }

        Ok(Self {
            id: Uuid::new_v4(),
            p12_path: p12.to_path_buf(),
            mobileprovision_path: mobileprovision.to_path_buf(),
        })
    }

    /// Name shown when picking a certificate: the `.p12` file stem.
    pub fn display_name(&self) -> String {
        self.p12_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl StoredItem for CertificatePair {
    fn id(&self) -> Uuid {
        self.id
    }

    fn matches(&self, query: &str) -> bool {
        let file_name = |p: &Path| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        contains_ci(&file_name(&self.p12_path), query)
            || contains_ci(&file_name(&self.mobileprovision_path), query)
    }
}

/// Writes `data` next to `path` and renames it into place.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Loads a list, treating a missing or undecodable file as empty.
    pub fn load_list<T: DeserializeOwned>(&self, file: &str) -> Vec<T> {
        let path = self.dir.join(file);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) => {
                debug!("{} not loaded: {}", path.display(), e);
                return Vec::new();
            }
        };
        match serde_json::from_slice(&data) {
            Ok(items) => items,
            Err(e) => {
                warn!("ignoring unreadable {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    pub fn save_list<T: Serialize>(&self, file: &str, items: &[T]) -> Result<()> {
        let data = serde_json::to_vec_pretty(items)?;
        write_atomic(&self.dir.join(file), &data)?;
        debug!("saved {} item(s) to {}", items.len(), file);
        Ok(())
    }

    /// Inserts `item` at the front of the list in `file`.
    pub fn prepend<T: StoredItem>(&self, file: &str, item: T) -> Result<()> {
        let mut items: Vec<T> = self.load_list(file);
        items.insert(0, item);
        self.save_list(file, &items)
    }

    /// Removes the item with `id`; returns whether one was removed.
    pub fn remove<T: StoredItem>(&self, file: &str, id: Uuid) -> Result<bool> {
        let mut items: Vec<T> = self.load_list(file);
        let before = items.len();
        items.retain(|i| i.id() != id);
        if items.len() == before {
            return Ok(false);
        }
        self.save_list(file, &items)?;
        Ok(true)
    }

    pub fn load_apps(&self) -> Vec<AppItem> {
        self.load_list(APPS_FILE)
    }

    pub fn save_apps(&self, apps: &[AppItem]) -> Result<()> {
        self.save_list(APPS_FILE, apps)
    }

    pub fn load_certificates(&self) -> Vec<CertificatePair> {
        self.load_list(CERTIFICATES_FILE)
    }

    pub fn save_certificates(&self, certs: &[CertificatePair]) -> Result<()> {
        self.save_list(CERTIFICATES_FILE, certs)
    }

    pub fn load_sources(&self) -> Vec<SourceItem> {
        self.load_list(SOURCES_FILE)
    }

    pub fn save_sources(&self, sources: &[SourceItem]) -> Result<()> {
        self.save_list(SOURCES_FILE, sources)
    }
}
