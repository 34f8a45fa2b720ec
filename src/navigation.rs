//! Slide-out sidebar and page switching

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::constants::navigation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    About,
    Conferences,
    Membership,
    Contact,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::About, Page::Conferences, Page::Membership, Page::Contact];

    pub fn id(self) -> &'static str {
        match self {
            Page::About => "about",
            Page::Conferences => "conferences",
            Page::Membership => "membership",
            Page::Contact => "contact",
        }
    }

    /// Whether the slideshow lives on this page
    pub fn hosts_gallery(self) -> bool {
        self == Page::Conferences
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Page {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Page::ALL
            .into_iter()
            .find(|p| p.id() == wanted)
            .ok_or_else(|| format!("unknown page '{wanted}'"))
    }
}

/// Effect of a page change on the gallery view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryTransition {
    Entered,
    Left,
    Unchanged,
}

#[derive(Debug, Default)]
pub struct NavigationManager {
    sidebar_open: bool,
    current_page: Page,
}

impl NavigationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_nav(&mut self) {
        self.sidebar_open = true;
        debug!("Sidebar opened");
    }

    pub fn close_nav(&mut self) {
        self.sidebar_open = false;
        debug!("Sidebar closed");
    }

    /// Escape closes the sidebar. Returns whether it was open.
    pub fn on_escape(&mut self) -> bool {
        if self.sidebar_open {
            self.close_nav();
            true
        } else {
            false
        }
    }

    /// Show `page` and close the sidebar
    pub fn navigate_to(&mut self, page: Page) -> GalleryTransition {
        let previous = self.current_page;
        self.current_page = page;
        self.close_nav();
        info!(from = %previous, to = %page, "Navigated");

        match (previous.hosts_gallery(), page.hosts_gallery()) {
            (false, true) => GalleryTransition::Entered,
            (true, false) => GalleryTransition::Left,
            _ => GalleryTransition::Unchanged,
        }
    }

    /// Wide viewports close the sidebar. Returns whether it was closed.
    pub fn on_resize(&mut self, width: u32) -> bool {
        if width > navigation::SIDEBAR_CLOSE_WIDTH && self.sidebar_open {
            info!(width = width, "Viewport widened, closing sidebar");
            self.close_nav();
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn current_page(&self) -> Page {
        self.current_page
    }
}

/// Trailing-edge debounce for bursts of resize events
#[derive(Debug)]
pub struct ResizeDebouncer {
    wait: Duration,
    pending: Option<(u32, Instant)>,
}

impl Default for ResizeDebouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(navigation::RESIZE_DEBOUNCE_MS))
    }
}

impl ResizeDebouncer {
    pub fn new(wait: Duration) -> Self {
        Self { wait, pending: None }
    }

    /// Record a resize; restarts the quiet period
    pub fn push(&mut self, width: u32, now: Instant) {
        self.pending = Some((width, now + self.wait));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|(_, deadline)| deadline)
    }

    /// Latest width once the quiet period has elapsed
    pub fn take_ready(&mut self, now: Instant) -> Option<u32> {
        match self.pending {
            Some((width, deadline)) if deadline <= now => {
                self.pending = None;
                Some(width)
            }
            _ => None,
        }
    }
}
