use crate::error::{Result, SilqueError};
use crate::icon::{self, IconReplaceReport};
use crate::ipa::{self, ImportedBundle};
use crate::plist_ext::{PlistFile, BUNDLE_ID_KEY, DISPLAY_NAME_KEY};
use image::DynamicImage;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Completed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Completed => f.write_str("completed"),
        }
    }
}

/// Record of a submitted import. Nothing is actually signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningTask {
    pub id: Uuid,
    pub ipa_name: String,
    pub certificate: String,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Ready,
}

struct WorkingState {
    source: PathBuf,
    bundle: ImportedBundle,
    display_name: String,
    bundle_id: String,
    original_icon: Option<DynamicImage>,
    new_icon: Option<DynamicImage>,
}

/// The `Info.plist` fields a session can edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditField {
    DisplayName,
    BundleId,
}

impl EditField {
    fn key(self) -> &'static str {
        match self {
            Self::DisplayName => DISPLAY_NAME_KEY,
            Self::BundleId => BUNDLE_ID_KEY,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::DisplayName => "name",
            Self::BundleId => "bundle id",
        }
    }
}

/// Drives one import/edit/submit cycle at a time and keeps the submitted tasks,
/// most recent first.
#[derive(Default)]
pub struct SigningSession {
    work_root: Option<PathBuf>,
    keep_output: bool,
    last_output: Option<PathBuf>,
    working: Option<WorkingState>,
    certificate: String,
    status_message: String,
    tasks: Vec<SigningTask>,
}

impl SigningSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract archives under `root` instead of the system temp dir.
    pub fn with_work_root<P: AsRef<Path>>(root: P) -> Self {
        Self {
            work_root: Some(root.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    /// Leave the edited extraction directory on disk after [`SigningSession::submit`].
    pub fn set_keep_output(&mut self, keep: bool) {
        self.keep_output = keep;
    }

    /// Directory kept by the last submit when output keeping is on.
    pub fn last_output(&self) -> Option<&Path> {
        self.last_output.as_deref()
    }

    pub fn state(&self) -> SessionState {
        if self.working.is_some() {
            SessionState::Ready
        } else {
            SessionState::Idle
        }
    }

    /// Imports `ipa_path` and prefills the editable fields from its Info.plist.
    ///
    /// Fails with [`SilqueError::SessionActive`] while a previous import is
    /// still open; call [`SigningSession::cancel`] first to discard it.
    pub fn import<P: AsRef<Path>>(&mut self, ipa_path: P) -> Result<()> {
        if self.working.is_some() {
            return Err(SilqueError::SessionActive);
        }

        let ipa_path = ipa_path.as_ref();
        debug!("session: extracting {}", ipa_path.display());
        let extracted = match &self.work_root {
            Some(root) => ipa::extract_ipa_in(ipa_path, root),
            None => ipa::extract_ipa(ipa_path),
        };
        let bundle = match extracted {
            Ok(bundle) => bundle,
            Err(e) => {
                self.status_message = format!("IPA import failed: {}", e);
                return Err(e);
            }
        };

        let (display_name, bundle_id) = match PlistFile::open(bundle.info_plist()) {
            Ok(pl) => (
                pl.display_name().unwrap_or_default().to_string(),
                pl.bundle_identifier().unwrap_or_default().to_string(),
            ),
            Err(e) => {
                warn!("could not read {}: {}", bundle.info_plist().display(), e);
                (String::new(), String::new())
            }
        };
        let original_icon = icon::find_icon(bundle.app_path());

        info!(
            "imported {} (name: {:?}, bundle id: {:?})",
            ipa_path.display(),
            display_name,
            bundle_id
        );

        self.working = Some(WorkingState {
            source: ipa_path.to_path_buf(),
            bundle,
            display_name,
            bundle_id,
            original_icon,
            new_icon: None,
        });
        self.status_message = "Import succeeded".to_string();
        Ok(())
    }

    /// Drops the open import, deleting its extraction directory.
    pub fn cancel(&mut self) {
        if let Some(work) = self.working.take() {
            debug!("session: discarding {}", work.source.display());
        }
        self.status_message.clear();
    }

    pub fn set_display_name(&mut self, value: &str) -> Result<()> {
        self.write_through(EditField::DisplayName, value)
    }

    pub fn set_bundle_id(&mut self, value: &str) -> Result<()> {
        self.write_through(EditField::BundleId, value)
    }

    /// The editable field keeps `value` even when saving fails, so the caller
    /// can see and retry the edit.
    fn write_through(&mut self, field: EditField, value: &str) -> Result<()> {
        let work = self.working.as_mut().ok_or(SilqueError::NoActiveImport)?;
        match field {
            EditField::DisplayName => work.display_name = value.to_string(),
            EditField::BundleId => work.bundle_id = value.to_string(),
        }

        let saved = PlistFile::open(work.bundle.info_plist()).and_then(|mut pl| {
            pl.set_string(field.key(), value);
            pl.save()?;
            debug!("{} = {:?} in {}", field.key(), value, pl.path().display());
            Ok(())
        });

        if let Err(e) = saved {
            warn!("failed to update {}: {}", field.key(), e);
            self.status_message = format!("Error changing {}: {}", field.label(), e);
            return Err(e);
        }
        Ok(())
    }

    pub fn set_icon(&mut self, image: DynamicImage) -> Result<IconReplaceReport> {
        let work = self.working.as_mut().ok_or(SilqueError::NoActiveImport)?;
        let report = icon::replace_icon(work.bundle.app_path(), &image);
        work.new_icon = Some(image);

        self.status_message = if report.failed().is_empty() {
            format!("Icon: {}", report)
        } else {
            format!("Error changing icon: {}", report)
        };
        Ok(report)
    }

    pub fn select_certificate(&mut self, name: &str) {
        self.certificate = name.to_string();
    }

    pub fn certificate(&self) -> &str {
        &self.certificate
    }

    /// Records a completed task for the open import and resets for the next
    /// cycle.
    pub fn submit(&mut self) -> Result<&SigningTask> {
        if self.working.is_none() {
            return Err(SilqueError::NoActiveImport);
        }
        let certificate = self.certificate.trim();
        if certificate.is_empty() {
            return Err(SilqueError::NoCertificate);
        }
        let certificate = certificate.to_string();

        let work = self.working.take().ok_or(SilqueError::NoActiveImport)?;
        let ipa_name = work
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| work.bundle.app_name());

        let task = SigningTask {
            id: Uuid::new_v4(),
            ipa_name,
            certificate,
            status: TaskStatus::Completed,
        };
        info!("recorded task {} for {} ({})", task.id, task.ipa_name, task.certificate);

        self.last_output = if self.keep_output {
            let kept = work.bundle.keep();
            info!("kept output in {}", kept.display());
            Some(kept)
        } else {
            None
        };

        self.tasks.insert(0, task);
        self.certificate.clear();
        self.status_message = "Signing simulated".to_string();

        Ok(&self.tasks[0])
    }

    pub fn remove_task(&mut self, id: Uuid) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    pub fn tasks(&self) -> &[SigningTask] {
        &self.tasks
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn bundle(&self) -> Option<&ImportedBundle> {
        self.working.as_ref().map(|w| &w.bundle)
    }

    pub fn display_name(&self) -> Option<&str> {
        self.working.as_ref().map(|w| w.display_name.as_str())
    }

    pub fn bundle_id(&self) -> Option<&str> {
        self.working.as_ref().map(|w| w.bundle_id.as_str())
    }

    /// The picked replacement if any, otherwise the icon found at import.
    pub fn current_icon(&self) -> Option<&DynamicImage> {
        self.working
            .as_ref()
            .and_then(|w| w.new_icon.as_ref().or(w.original_icon.as_ref()))
    }
}
