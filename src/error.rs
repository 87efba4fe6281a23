use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SilqueError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Plist error: {0}")]
    Plist(#[from] plist::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Archive errors
    #[error("Could not extract the IPA: {0}")]
    ExtractionFailed(String),

    #[error("Payload folder is missing")]
    PayloadMissing,

    #[error("No .app bundle found in Payload")]
    BundleMissing,

    #[error("Info.plist is missing from the bundle")]
    InfoPlistMissing,

    // Metadata errors
    #[error("Info.plist not found: {0}")]
    PlistNotFound(PathBuf),

    #[error("Cannot read Info.plist: {0}")]
    CannotReadPlist(String),

    #[error("Cannot write Info.plist: {0}")]
    CannotWritePlist(String),

    #[error("Invalid Info.plist format: {0}")]
    InvalidFormat(String),

    // Session errors
    #[error("An import is already in progress; cancel it first")]
    SessionActive,

    #[error("No IPA has been imported")]
    NoActiveImport,

    #[error("No certificate selected")]
    NoCertificate,
}

impl SilqueError {
    /// True for the errors produced by the archive extractor.
    pub fn is_import_error(&self) -> bool {
        matches!(
            self,
            Self::ExtractionFailed(_)
                | Self::PayloadMissing
                | Self::BundleMissing
                | Self::InfoPlistMissing
        )
    }
}

pub type Result<T> = std::result::Result<T, SilqueError>;
