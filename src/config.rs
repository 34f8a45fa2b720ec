//! Site configuration
//!
//! JSON file under the user's config directory. Missing keys take defaults,
//! a missing file is created with defaults, environment variables override the
//! file, and out-of-range values are clamped with a warning.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::constants::{self, gallery};
use crate::gallery::GallerySettings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Key-value store location (defaults to the user data dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,

    #[serde(default)]
    pub gallery: GalleryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryConfig {
    #[serde(default = "default_total_images")]
    pub total_images: usize,

    #[serde(default = "default_autoplay_delay_ms")]
    pub autoplay_delay_ms: u64,

    #[serde(default = "default_swipe_threshold_px")]
    pub swipe_threshold_px: u32,

    #[serde(default = "default_preload_count")]
    pub preload_count: usize,

    /// Directory holding `img1.jpg`..`imgN.jpg`; when set, images are probed
    /// on disk and missing files count as load failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_dir: Option<PathBuf>,
}

fn default_total_images() -> usize {
    gallery::TOTAL_IMAGES
}

fn default_autoplay_delay_ms() -> u64 {
    gallery::AUTOPLAY_DELAY_MS
}

fn default_swipe_threshold_px() -> u32 {
    gallery::SWIPE_THRESHOLD_PX
}

fn default_preload_count() -> usize {
    gallery::PRELOAD_COUNT
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            total_images: default_total_images(),
            autoplay_delay_ms: default_autoplay_delay_ms(),
            swipe_threshold_px: default_swipe_threshold_px(),
            preload_count: default_preload_count(),
            image_dir: None,
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            gallery: GalleryConfig::default(),
        }
    }
}

impl SiteConfig {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(constants::config::APP_DIR);
        path.push(constants::config::FILENAME);
        path
    }

    /// Load from `path`, creating it with defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str::<SiteConfig>(&contents).inspect_err(|e| {
                error!(path = %path.display(), error = %e, "Failed to parse config file");
            })
            .with_context(|| format!("Failed to parse JSON from {}", path.display()))?
        } else {
            info!(path = %path.display(), "Config file not found, creating default config");
            let config = SiteConfig::default();
            if let Err(e) = config.save(path) {
                // Read-only config dirs are fine, defaults still apply
                warn!(error = ?e, "Failed to write default config");
            }
            config
        };

        config.apply_env_overrides();
        config.validate_and_clamp();
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        fs::write(path, json).with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    fn parse_env<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Option<T>
    where
        <T as FromStr>::Err: std::fmt::Display,
    {
        let raw = lookup(var)?;
        raw.trim()
            .parse::<T>()
            .inspect_err(|e| error!(var = %var, value = %raw, error = %e, "failed to parse env var"))
            .ok()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|var| env::var(var).ok());
    }

    /// Override gallery settings from `FORUM_SITE_*` variables. Unparsable
    /// values are logged and ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(total) = Self::parse_env(&lookup, "FORUM_SITE_IMAGES") {
            self.gallery.total_images = total;
        }
        if let Some(delay) = Self::parse_env(&lookup, "FORUM_SITE_AUTOPLAY_MS") {
            self.gallery.autoplay_delay_ms = delay;
        }
        if let Some(dir) = lookup("FORUM_SITE_IMAGE_DIR") {
            self.gallery.image_dir = Some(PathBuf::from(dir));
        }
    }

    /// Clamp values to safe ranges
    fn validate_and_clamp(&mut self) {
        use crate::constants::validation::*;

        let g = &mut self.gallery;
        if g.total_images < MIN_TOTAL_IMAGES {
            warn!(total_images = g.total_images, using = default_total_images(), "total_images below minimum, using default");
            g.total_images = default_total_images();
        } else if g.total_images > MAX_TOTAL_IMAGES {
            warn!(total_images = g.total_images, max = MAX_TOTAL_IMAGES, "total_images exceeds maximum, clamping");
            g.total_images = MAX_TOTAL_IMAGES;
        }

        if g.autoplay_delay_ms < MIN_AUTOPLAY_DELAY_MS {
            warn!(autoplay_delay_ms = g.autoplay_delay_ms, min = MIN_AUTOPLAY_DELAY_MS, "autoplay_delay_ms below minimum, clamping");
            g.autoplay_delay_ms = MIN_AUTOPLAY_DELAY_MS;
        } else if g.autoplay_delay_ms > MAX_AUTOPLAY_DELAY_MS {
            warn!(autoplay_delay_ms = g.autoplay_delay_ms, max = MAX_AUTOPLAY_DELAY_MS, "autoplay_delay_ms exceeds maximum, clamping");
            g.autoplay_delay_ms = MAX_AUTOPLAY_DELAY_MS;
        }

        if g.swipe_threshold_px < MIN_SWIPE_THRESHOLD_PX {
            warn!(swipe_threshold_px = g.swipe_threshold_px, min = MIN_SWIPE_THRESHOLD_PX, "swipe_threshold_px below minimum, clamping");
            g.swipe_threshold_px = MIN_SWIPE_THRESHOLD_PX;
        } else if g.swipe_threshold_px > MAX_SWIPE_THRESHOLD_PX {
            warn!(swipe_threshold_px = g.swipe_threshold_px, max = MAX_SWIPE_THRESHOLD_PX, "swipe_threshold_px exceeds maximum, clamping");
            g.swipe_threshold_px = MAX_SWIPE_THRESHOLD_PX;
        }

        if g.preload_count > g.total_images {
            g.preload_count = g.total_images;
        }
    }

    pub fn gallery_settings(&self) -> GallerySettings {
        GallerySettings {
            total_images: self.gallery.total_images,
            autoplay_delay: Duration::from_millis(self.gallery.autoplay_delay_ms),
            swipe_threshold_px: self.gallery.swipe_threshold_px,
            preload_count: self.gallery.preload_count,
        }
    }
}
