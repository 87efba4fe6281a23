pub mod catalog;
pub mod config;
pub mod error;
pub mod icon;
pub mod ipa;
pub mod plist_ext;
pub mod session;
pub mod store;

pub use catalog::{download_ipa, fetch_repository, AppVersion, CatalogApp, Repository};
pub use config::{AccentColor, Settings};
pub use error::{Result, SilqueError};
pub use icon::{
    find_icon, find_icon_path, load_icon, replace_icon, IconOutcome, IconReplaceReport, IconSlot,
    ICON_SLOTS,
};
pub use ipa::{extract_ipa, extract_ipa_in, ImportedBundle};
pub use plist_ext::PlistFile;
pub use session::{SessionState, SigningSession, SigningTask, TaskStatus};
pub use store::{AppItem, CertificatePair, JsonStore, SourceItem, StoredItem};
