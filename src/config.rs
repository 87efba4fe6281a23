use crate::error::Result;
use crate::store::write_atomic;
use log::warn;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_ACCENT: &str = "#8E44AD";

/// UI accent color, stored as a hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccentColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl AccentColor {
    /// Parses `#RRGGBB` or `#AARRGGBB` (the `#` is optional). Anything else
    /// yields opaque black.
    pub fn from_hex(hex: &str) -> Self {
        let hex = hex.trim().trim_start_matches('#');
        let black = Self { r: 0, g: 0, b: 0, a: 255 };
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return black;
        }
        let Ok(v) = u32::from_str_radix(hex, 16) else {
            return black;
        };
        let byte = |shift: u32| ((v >> shift) & 0xff) as u8;
        match hex.len() {
            6 => Self { r: byte(16), g: byte(8), b: byte(0), a: 255 },
            8 => Self { r: byte(16), g: byte(8), b: byte(0), a: byte(24) },
            _ => black,
        }
    }

    /// Lowercase `#rrggbb`; alpha is not kept.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for AccentColor {
    fn default() -> Self {
        Self::from_hex(DEFAULT_ACCENT)
    }
}

impl fmt::Display for AccentColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for AccentColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccentColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from_hex(&s))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub accent_color: AccentColor,
    #[serde(skip)]
    data_dir: PathBuf,
}

impl Settings {
    /// Reads `settings.json` from `data_dir`, using defaults when it is
    /// missing or unreadable.
    pub fn load<P: AsRef<Path>>(data_dir: P) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        let path = data_dir.join(SETTINGS_FILE);

        let mut settings = match fs::read(&path) {
            Ok(data) => serde_json::from_slice::<Settings>(&data).unwrap_or_else(|e| {
                warn!("ignoring unreadable {}: {}", path.display(), e);
                Settings::default()
            }),
            Err(_) => Settings::default(),
        };
        settings.data_dir = data_dir;
        settings
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn save(&self) -> Result<()> {
        let data = serde_json::to_vec_pretty(self)?;
        write_atomic(&self.data_dir.join(SETTINGS_FILE), &data)
    }
}
