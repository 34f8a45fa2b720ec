//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Slideshow constants
pub mod gallery {
    /// Number of images shipped with the conferences gallery
    pub const TOTAL_IMAGES: usize = 55;

    /// Delay between automatic advances while autoplay is running
    pub const AUTOPLAY_DELAY_MS: u64 = 3000;

    /// Minimum horizontal travel (pixels) before a touch counts as a swipe
    pub const SWIPE_THRESHOLD_PX: u32 = 50;

    /// Number of leading images probed when the gallery is activated
    pub const PRELOAD_COUNT: usize = 5;

    /// Message shown when every image in the gallery failed to load
    pub const PLACEHOLDER_MESSAGE: &str = "Image not available";
}

/// Membership ID constants
pub mod membership {
    /// Counter value used when a prefix has never been persisted
    pub const DEFAULT_COUNTER: u64 = 100;

    /// Zero-padded width of the numeric part of an ID
    pub const ID_DIGITS: usize = 7;

    /// Key prefix for persisted counters (followed by the category prefix)
    pub const COUNTER_KEY_PREFIX: &str = "membership_counter_";
}

/// Key-value storage constants
pub mod storage {
    /// Key holding the persisted color scheme
    pub const THEME_KEY: &str = "theme";

    /// Data file name for the key-value store
    pub const STORE_FILENAME: &str = "storage.json";
}

/// Navigation constants
pub mod navigation {
    /// Viewport width above which an open sidebar is closed on resize
    pub const SIDEBAR_CLOSE_WIDTH: u32 = 768;

    /// Quiet period before a resize burst is handled
    pub const RESIZE_DEBOUNCE_MS: u64 = 250;
}

/// Configuration file constants
pub mod config {
    /// Application directory name under the XDG config/data dirs
    pub const APP_DIR: &str = "forum-site";

    /// Config file name
    pub const FILENAME: &str = "config.json";
}

/// Config validation ranges
pub mod validation {
    pub const MIN_TOTAL_IMAGES: usize = 1;
    pub const MAX_TOTAL_IMAGES: usize = 1000;

    pub const MIN_AUTOPLAY_DELAY_MS: u64 = 250;
    pub const MAX_AUTOPLAY_DELAY_MS: u64 = 60_000;

    pub const MIN_SWIPE_THRESHOLD_PX: u32 = 1;
    pub const MAX_SWIPE_THRESHOLD_PX: u32 = 1000;
}
