//! AltStore-style repository catalogs: decoding, fetching and downloading the
//! apps they list.

use crate::error::{Result, SilqueError};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub apps: Vec<CatalogApp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogApp {
    pub name: String,
    #[serde(rename = "iconURL")]
    pub icon_url: String,
    pub bundle_identifier: String,
    pub versions: Vec<AppVersion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppVersion {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localized_description: Option<HashMap<String, String>>,
}

impl Repository {
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn find_app(&self, bundle_identifier: &str) -> Option<&CatalogApp> {
        self.apps
            .iter()
            .find(|a| a.bundle_identifier == bundle_identifier)
    }
}

impl CatalogApp {
    /// Repositories list the newest version first.
    pub fn latest_version(&self) -> Option<&AppVersion> {
        self.versions.first()
    }
}

impl AppVersion {
    /// Description in `lang`, or the English one when missing.
    pub fn description(&self, lang: &str) -> Option<&str> {
        let descriptions = self.localized_description.as_ref()?;
        descriptions
            .get(lang)
            .or_else(|| descriptions.get("en"))
            .map(String::as_str)
    }
}

/// Blocking GET of a repository JSON document. No retries.
pub fn fetch_repository(url: &str) -> Result<Repository> {
    debug!("fetching repository {}", url);
    let mut response = ureq::get(url).call()?;
    let body = response.body_mut().read_to_string()?;
    let repo = Repository::from_slice(body.as_bytes())?;
    info!("loaded repository \"{}\" ({} apps)", repo.name, repo.apps.len());
    Ok(repo)
}

/// File name used for a downloaded build: `<name>-<version>.ipa`.
pub fn download_file_name(app: &CatalogApp, version: &AppVersion) -> String {
    let sanitize = |s: &str| s.replace(['/', '\\'], "_");
    format!("{}-{}.ipa", sanitize(&app.name), sanitize(&version.version))
}

/// Downloads the latest version of `app` into `dest_dir`, replacing any
/// previous download of the same version.
pub fn download_ipa<P: AsRef<Path>>(app: &CatalogApp, dest_dir: P) -> Result<PathBuf> {
    let dest_dir = dest_dir.as_ref();
    let version = app.latest_version().ok_or_else(|| {
        SilqueError::InvalidInput(format!("{} has no downloadable version", app.name))
    })?;
    if version.url.trim().is_empty() {
        return Err(SilqueError::InvalidInput(format!(
            "{} {} has no download link",
            app.name, version.version
        )));
    }

    fs::create_dir_all(dest_dir)?;
    let dest = dest_dir.join(download_file_name(app, version));

    debug!("downloading {} to {}", version.url, dest.display());
    let mut response = ureq::get(&version.url).call()?;
    let mut tmp = NamedTempFile::new_in(dest_dir)?;
    let bytes = std::io::copy(&mut response.body_mut().as_reader(), &mut tmp)?;
    tmp.persist(&dest).map_err(|e| e.error)?;

    info!("downloaded {} ({} bytes)", dest.display(), bytes);
    Ok(dest)
}
