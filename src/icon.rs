use crate::error::Result;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use log::{debug, info, warn};
use std::fmt;
use std::path::{Path, PathBuf};

/// A conventional icon file name inside an app bundle and its pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconSlot {
    pub name: &'static str,
    pub size: u32,
}

/// Probe order for [`find_icon`] and the full set rewritten by [`replace_icon`].
pub const ICON_SLOTS: [IconSlot; 5] = [
    IconSlot { name: "AppIcon60x60@3x.png", size: 180 },
    IconSlot { name: "AppIcon60x60@2x.png", size: 120 },
    IconSlot { name: "icon@3x.png", size: 180 },
    IconSlot { name: "icon@2x.png", size: 120 },
    IconSlot { name: "icon.png", size: 60 },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconOutcome {
    Written,
    SkippedAbsent,
    Failed(String),
}

/// Per-slot result of [`replace_icon`].
#[derive(Debug, Clone, Default)]
pub struct IconReplaceReport {
    pub entries: Vec<(IconSlot, IconOutcome)>,
}

impl IconReplaceReport {
    pub fn written(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|(_, o)| *o == IconOutcome::Written)
            .map(|(s, _)| s.name)
            .collect()
    }

    pub fn failed(&self) -> Vec<(&'static str, &str)> {
        self.entries
            .iter()
            .filter_map(|(s, o)| match o {
                IconOutcome::Failed(reason) => Some((s.name, reason.as_str())),
                _ => None,
            })
            .collect()
    }

    /// No candidate file existed, so nothing was attempted.
    pub fn is_noop(&self) -> bool {
        self.entries
            .iter()
            .all(|(_, o)| *o == IconOutcome::SkippedAbsent)
    }

    pub fn is_complete(&self) -> bool {
        !self.is_noop() && self.failed().is_empty()
    }
}

impl fmt::Display for IconReplaceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_noop() {
            return write!(f, "no icon files found in bundle");
        }
        write!(f, "replaced {} icon file(s)", self.written().len())?;
        let failed = self.failed();
        if !failed.is_empty() {
            let names: Vec<&str> = failed.iter().map(|(n, _)| *n).collect();
            write!(f, ", {} failed ({})", failed.len(), names.join(", "))?;
        }
        Ok(())
    }
}

/// Decodes a user-supplied replacement image.
pub fn load_icon<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    Ok(image::open(path)?)
}

/// Returns the first candidate icon that exists and decodes.
pub fn find_icon<P: AsRef<Path>>(bundle: P) -> Option<DynamicImage> {
    probe(bundle.as_ref()).map(|(_, img)| img)
}

pub fn find_icon_path<P: AsRef<Path>>(bundle: P) -> Option<PathBuf> {
    probe(bundle.as_ref()).map(|(path, _)| path)
}

fn probe(bundle: &Path) -> Option<(PathBuf, DynamicImage)> {
    for slot in &ICON_SLOTS {
        let path = bundle.join(slot.name);
        if !path.is_file() {
            continue;
        }
        match image::open(&path) {
            Ok(img) => {
                debug!("found icon {}", path.display());
                return Some((path, img));
            }
            Err(e) => debug!("skipping undecodable icon {}: {}", path.display(), e),
        }
    }
    None
}

/// Overwrites every candidate icon file already present in `bundle` with
/// `image` stretched to that slot's size. Absent slots are never created.
pub fn replace_icon<P: AsRef<Path>>(bundle: P, image: &DynamicImage) -> IconReplaceReport {
    let bundle = bundle.as_ref();
    let mut report = IconReplaceReport::default();

    for slot in ICON_SLOTS {
        let path = bundle.join(slot.name);
        let outcome = if !path.exists() {
            IconOutcome::SkippedAbsent
        } else {
            let resized = image.resize_exact(slot.size, slot.size, FilterType::Lanczos3);
            match resized.save_with_format(&path, ImageFormat::Png) {
                Ok(()) => IconOutcome::Written,
                Err(e) => {
                    warn!("could not write {}: {}", path.display(), e);
                    IconOutcome::Failed(e.to_string())
                }
            }
        };
        report.entries.push((slot, outcome));
    }

    info!("{}", report);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::fs;

    fn png(path: &Path, size: u32) {
        RgbaImage::from_pixel(size, size, Rgba([10, 20, 30, 255]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn finds_flat_icon() {
        let dir = tempfile::tempdir().unwrap();
        png(&dir.path().join("icon.png"), 57);

        let img = find_icon(dir.path()).unwrap();
        assert_eq!((img.width(), img.height()), (57, 57));
        assert_eq!(find_icon_path(dir.path()).unwrap(), dir.path().join("icon.png"));
    }

    #[test]
    fn candidate_order_breaks_ties() {
        let dir = tempfile::tempdir().unwrap();
        png(&dir.path().join("icon.png"), 60);
        png(&dir.path().join("AppIcon60x60@3x.png"), 180);

        assert_eq!(
            find_icon_path(dir.path()).unwrap(),
            dir.path().join("AppIcon60x60@3x.png")
        );
        assert_eq!(find_icon(dir.path()).unwrap().width(), 180);
    }

    #[test]
    fn undecodable_candidates_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("AppIcon60x60@3x.png"), b"not a png").unwrap();
        png(&dir.path().join("icon@2x.png"), 120);

        assert_eq!(
            find_icon_path(dir.path()).unwrap(),
            dir.path().join("icon@2x.png")
        );
    }

    #[test]
    fn no_icon() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Icon-Other.png"), b"").unwrap();
        assert!(find_icon(dir.path()).is_none());
    }

    #[test]
    fn replaces_only_existing_slots() {
        let dir = tempfile::tempdir().unwrap();
        png(&dir.path().join("icon.png"), 10);
        png(&dir.path().join("AppIcon60x60@2x.png"), 10);
        let new_icon = DynamicImage::ImageRgba8(RgbaImage::new(300, 200));

        let report = replace_icon(dir.path(), &new_icon);

        assert_eq!(report.written(), vec!["AppIcon60x60@2x.png", "icon.png"]);
        assert!(report.is_complete());
        assert_eq!(
            image::image_dimensions(dir.path().join("icon.png")).unwrap(),
            (60, 60)
        );
        assert_eq!(
            image::image_dimensions(dir.path().join("AppIcon60x60@2x.png")).unwrap(),
            (120, 120)
        );
        for absent in ["AppIcon60x60@3x.png", "icon@3x.png", "icon@2x.png"] {
            assert!(!dir.path().join(absent).exists());
        }
    }

    #[test]
    fn empty_bundle_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let report = replace_icon(dir.path(), &DynamicImage::new_rgba8(4, 4));
        assert!(report.is_noop());
        assert!(!report.is_complete());
        assert_eq!(report.to_string(), "no icon files found in bundle");
    }

    #[test]
    fn write_failures_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in place of the file cannot be overwritten.
        fs::create_dir(dir.path().join("icon@3x.png")).unwrap();
        png(&dir.path().join("icon.png"), 10);

        let report = replace_icon(dir.path(), &DynamicImage::new_rgba8(4, 4));

        assert!(!report.is_noop());
        assert!(!report.is_complete());
        assert_eq!(report.written(), vec!["icon.png"]);
        let failed = report.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, "icon@3x.png");
    }
}
