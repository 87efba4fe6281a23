use crate::error::{Result, SilqueError};
use log::{debug, info};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::ZipArchive;

/// An `.ipa` unpacked into its own temporary directory.
///
/// The extraction directory lives exactly as long as this value: dropping it
/// removes the directory and everything edited inside it. Use
/// [`ImportedBundle::keep`] to leave the output on disk.
#[derive(Debug)]
pub struct ImportedBundle {
    tmpdir: TempDir,
    payload: PathBuf,
    app: PathBuf,
    info_plist: PathBuf,
}

impl ImportedBundle {
    pub fn temp_dir(&self) -> &Path {
        self.tmpdir.path()
    }

    pub fn payload(&self) -> &Path {
        &self.payload
    }

    pub fn app_path(&self) -> &Path {
        &self.app
    }

    pub fn info_plist(&self) -> &Path {
        &self.info_plist
    }

    /// Bundle directory name without the `.app` suffix.
    pub fn app_name(&self) -> String {
        self.app
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Disarms cleanup and returns the extraction directory.
    pub fn keep(self) -> PathBuf {
        self.tmpdir.keep()
    }
}

/// Extracts `ipa_path` into a fresh directory under the system temp dir.
pub fn extract_ipa<P: AsRef<Path>>(ipa_path: P) -> Result<ImportedBundle> {
    extract_ipa_in(ipa_path, std::env::temp_dir())
}

/// Extracts `ipa_path` into a fresh, uniquely named directory under `base`.
///
/// Either every path of the returned bundle exists, or an error is returned and
/// the directory has already been removed.
pub fn extract_ipa_in<P: AsRef<Path>, Q: AsRef<Path>>(ipa_path: P, base: Q) -> Result<ImportedBundle> {
    let ipa_path = ipa_path.as_ref();
    let base = base.as_ref();

    let failed = |e: &dyn std::fmt::Display| SilqueError::ExtractionFailed(e.to_string());

    if !ipa_path.is_file() {
        return Err(failed(&format!("{} is not a file", ipa_path.display())));
    }

    fs::create_dir_all(base).map_err(|e| failed(&e))?;
    let tmpdir = tempfile::Builder::new()
        .prefix("silque-")
        .tempdir_in(base)
        .map_err(|e| failed(&e))?;
    debug!("extracting {} into {}", ipa_path.display(), tmpdir.path().display());

    let file = File::open(ipa_path).map_err(|e| failed(&e))?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| failed(&e))?;

    unpack(&mut archive, tmpdir.path()).map_err(|e| match e {
        SilqueError::ExtractionFailed(_) => e,
        other => SilqueError::ExtractionFailed(other.to_string()),
    })?;

    let payload = tmpdir.path().join("Payload");
    if !payload.is_dir() {
        return Err(SilqueError::PayloadMissing);
    }

    let app = find_app_in_payload(&payload)?;

    let info_plist = app.join("Info.plist");
    if !info_plist.is_file() {
        return Err(SilqueError::InfoPlistMissing);
    }

    info!("extracted {}", app.display());

    Ok(ImportedBundle {
        tmpdir,
        payload,
        app,
        info_plist,
    })
}

fn unpack(archive: &mut ZipArchive<File>, dest: &Path) -> Result<()> {
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let rel = file.enclosed_name().ok_or_else(|| {
            SilqueError::ExtractionFailed(format!("unsafe entry path: {}", file.name()))
        })?;
        let outpath = dest.join(rel);

        if file.is_dir() {
            fs::create_dir_all(&outpath)?;
            continue;
        }

        if let Some(p) = outpath.parent() {
            fs::create_dir_all(p)?;
        }
        let mut outfile = File::create(&outpath)?;
        std::io::copy(&mut file, &mut outfile)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file.unix_mode() {
                // Keep owner-writable: the bundle is edited in place.
                fs::set_permissions(&outpath, fs::Permissions::from_mode(mode | 0o200))?;
            }
        }
    }

    Ok(())
}

/// Picks the `.app` entry of `Payload`. With several candidates the
/// lexicographically smallest name wins so the choice does not depend on
/// directory listing order.
fn find_app_in_payload(payload: &Path) -> Result<PathBuf> {
    let mut apps = Vec::new();
    let failed = |e: std::io::Error| SilqueError::ExtractionFailed(e.to_string());
    for entry in fs::read_dir(payload).map_err(failed)? {
        let path = entry.map_err(failed)?.path();
        if path.extension().map(|e| e == "app").unwrap_or(false) {
            apps.push(path);
        }
    }

    apps.sort();
    if apps.len() > 1 {
        debug!("{} bundles in Payload, using {}", apps.len(), apps[0].display());
    }
    apps.into_iter().next().ok_or(SilqueError::BundleMissing)
}
