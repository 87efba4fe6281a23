//! Fixture builders for pipeline tests

use image::{Rgba, RgbaImage};
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Scratch directory holding fixtures and extraction output
pub struct TestWorkspace {
    #[allow(dead_code)]
    pub temp: TempDir,
    pub path: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().to_path_buf();
        Self { temp, path }
    }

    /// Where sessions extract archives
    pub fn work_root(&self) -> PathBuf {
        self.path.join("work")
    }

    /// Number of extraction directories left behind
    #[allow(dead_code)]
    pub fn leftover_extractions(&self) -> usize {
        std::fs::read_dir(self.work_root())
            .map(|d| d.count())
            .unwrap_or(0)
    }
}

/// Builder for a synthetic `.ipa`
pub struct IpaBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

#[allow(dead_code)]
impl IpaBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// `Payload/<app>.app/Info.plist` with the given string keys
    pub fn app(mut self, app: &str, keys: &[(&str, &str)]) -> Self {
        let mut dict = plist::Dictionary::new();
        dict.insert(
            "CFBundleExecutable".into(),
            plist::Value::String(app.to_string()),
        );
        for (k, v) in keys {
            dict.insert(k.to_string(), plist::Value::String(v.to_string()));
        }
        let mut xml = Vec::new();
        plist::to_writer_xml(&mut xml, &dict).expect("Failed to encode plist");
        self.entries
            .push((format!("Payload/{}.app/Info.plist", app), xml));
        self
    }

    /// A solid PNG of `size`x`size` at `Payload/<app>.app/<name>`
    pub fn icon(mut self, app: &str, name: &str, size: u32) -> Self {
        let img = RgbaImage::from_pixel(size, size, Rgba([200, 30, 30, 255]));
        let mut png = Cursor::new(Vec::new());
        img.write_to(&mut png, image::ImageOutputFormat::Png)
            .expect("Failed to encode png");
        self.entries
            .push((format!("Payload/{}.app/{}", app, name), png.into_inner()));
        self
    }

    pub fn file(mut self, name: &str, data: &[u8]) -> Self {
        self.entries.push((name.to_string(), data.to_vec()));
        self
    }

    pub fn write(self, path: &Path) -> PathBuf {
        let file = File::create(path).expect("Failed to create ipa");
        let mut zip = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (name, data) in &self.entries {
            zip.start_file(name.as_str(), options)
                .expect("Failed to start zip entry");
            zip.write_all(data).expect("Failed to write zip entry");
        }
        zip.finish().expect("Failed to finish zip");
        path.to_path_buf()
    }
}

/// A replacement icon image written to disk
#[allow(dead_code)]
pub fn write_png(path: &Path, width: u32, height: u32) -> PathBuf {
    RgbaImage::from_pixel(width, height, Rgba([0, 120, 255, 255]))
        .save(path)
        .expect("Failed to write png");
    path.to_path_buf()
}

/// `silque` command bound to the workspace's data directory
#[allow(dead_code)]
pub fn silque_cmd(ws: &TestWorkspace) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("silque").expect("Failed to find silque binary");
    cmd.env_remove("SILQUE_DATA_DIR")
        .env("TMPDIR", ws.work_root())
        .arg("--data-dir")
        .arg(ws.path.join("data"));
    cmd
}
