//! Platform preferences: tray icon, main window geometry and media sinks.

use std::{error::Error, fmt, str::FromStr};

use anyhow::{Context, Result, bail, ensure};
use tracing::{debug, instrument, warn};

use crate::prefs::{Pref, PrefStore, PrefStoreExt};

pub const SHOW_TRAYICON: Pref<bool> =
    Pref { key: "showTrayicon", default: || true, platform_specific: false };

/// Empty until the main window is first sized, see [`main_window_dimensions`].
pub const WINDOW_DIMENSIONS: Pref<String> =
    Pref { key: "windowdimensions", default: String::new, platform_specific: false };

pub const WINDOW_MAXIMIZED: Pref<bool> =
    Pref { key: "windowmaximized", default: || false, platform_specific: false };

// Only read on Windows, but kept in the shared config.
pub const WINDOWS_ICON: Pref<Option<String>> =
    Pref { key: "windowsIcon", default: || None, platform_specific: false };

pub const GSTREAMER_IMAGESINK: Pref<String> = Pref {
    key: "DefaultGstreamerImagesink",
    default: || "autovideosink".to_string(),
    platform_specific: false,
};

pub const GSTREAMER_AUDIOSINK: Pref<String> = Pref {
    key: "DefaultGstreamerAudiosink",
    default: || "autoaudiosink".to_string(),
    platform_specific: false,
};

/// Main window position and size, stored as `x,y,width,height`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowDimensions {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowDimensions {
    fn default() -> Self {
        Self { x: 100, y: 100, width: 800, height: 600 }
    }
}

impl fmt::Display for WindowDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

impl FromStr for WindowDimensions {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [x, y, width, height] = parts.as_slice() else {
            bail!("Expected 4 comma separated values, got {}", parts.len());
        };
        let dimensions = Self {
            x: x.parse().context("Invalid window x")?,
            y: y.parse().context("Invalid window y")?,
            width: width.parse().context("Invalid window width")?,
            height: height.parse().context("Invalid window height")?,
        };
        ensure!(dimensions.width > 0 && dimensions.height > 0, "Window size must be non-zero");
        Ok(dimensions)
    }
}

/// Returns the stored main window geometry.
///
/// When nothing usable is stored yet the default geometry is saved and returned.
#[instrument(skip(store))]
pub fn main_window_dimensions(store: &dyn PrefStore) -> WindowDimensions {
    let stored = store.get(&WINDOW_DIMENSIONS);
    if !stored.is_empty() {
        match stored.parse() {
            Ok(dimensions) => return dimensions,
            Err(e) => {
                warn!(error = e.as_ref() as &dyn Error, stored = %stored, "Ignoring invalid window dimensions")
            }
        }
    }

    let dimensions = WindowDimensions::default();
    debug!(%dimensions, "Using default window dimensions");
    if let Err(e) = store.set(&WINDOW_DIMENSIONS, dimensions.to_string()) {
        warn!(error = e.as_ref() as &dyn Error, "Failed to save window dimensions");
    }
    dimensions
}
