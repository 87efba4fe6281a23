use crate::error::{Result, SilqueError};
use log::debug;
use plist::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const DISPLAY_NAME_KEY: &str = "CFBundleDisplayName";
pub const NAME_KEY: &str = "CFBundleName";
pub const BUNDLE_ID_KEY: &str = "CFBundleIdentifier";

/// An editable property list backed by one file.
///
/// Edits are staged in memory; nothing touches the disk until [`PlistFile::save`].
pub struct PlistFile {
    path: PathBuf,
    data: plist::Dictionary,
}

impl PlistFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(SilqueError::PlistNotFound(path));
        }

        let value: Value =
            plist::from_file(&path).map_err(|e| SilqueError::CannotReadPlist(e.to_string()))?;
        let data = value.into_dictionary().ok_or_else(|| {
            SilqueError::InvalidFormat(format!("{} is not a dictionary", path.display()))
        })?;

        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_string())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn set_string(&mut self, key: &str, value: &str) {
        self.data.insert(key.to_string(), Value::String(value.to_string()));
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.data.remove(key).is_some()
    }

    /// `CFBundleDisplayName`, falling back to `CFBundleName`.
    pub fn display_name(&self) -> Option<&str> {
        self.get_string(DISPLAY_NAME_KEY)
            .or_else(|| self.get_string(NAME_KEY))
    }

    pub fn bundle_identifier(&self) -> Option<&str> {
        self.get_string(BUNDLE_ID_KEY)
    }

    /// Rewrites the whole file as XML.
    ///
    /// The document is written to a sibling temp file and renamed over the
    /// original, so on error the file on disk is left as it was.
    pub fn save(&self) -> Result<()> {
        let write_err = |e: &dyn std::fmt::Display| {
            SilqueError::CannotWritePlist(format!("{}: {}", self.path.display(), e))
        };

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| write_err(&e))?;
        plist::to_writer_xml(&mut tmp, &self.data).map_err(|e| write_err(&e))?;
        tmp.flush().map_err(|e| write_err(&e))?;
        tmp.as_file().sync_all().map_err(|e| write_err(&e))?;

        if let Ok(meta) = fs::metadata(&self.path) {
            fs::set_permissions(tmp.path(), meta.permissions()).map_err(|e| write_err(&e))?;
        }

        tmp.persist(&self.path).map_err(|e| write_err(&e.error))?;
        debug!("saved {}", self.path.display());
        Ok(())
    }
}
