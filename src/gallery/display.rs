//! Rendering surface the slideshow pushes its state to

use std::io::Write;
use tracing::{debug, warn};

/// What the main image area is currently showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayState {
    #[default]
    Showing,
    /// Every image failed to load; no further auto-navigation
    Placeholder,
}

/// Sink for slideshow display updates
pub trait DisplaySurface {
    fn set_current_image(&mut self, index: usize);

    /// `current` is 1-based, as shown to the user
    fn set_counter_text(&mut self, current: usize, total: usize);

    fn set_thumbnail_active(&mut self, index: usize);

    fn show_placeholder(&mut self, message: &str);
}

/// File name of the image at a 0-based gallery index
pub fn image_file_name(index: usize) -> String {
    format!("img{}.jpg", index + 1)
}

/// Display surface that writes one line per update to a terminal
pub struct TerminalDisplay<W: Write> {
    out: W,
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn line(&mut self, text: std::fmt::Arguments<'_>) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|_| self.out.flush()) {
            warn!(error = %e, "Failed to write display update");
        }
    }
}

impl<W: Write> DisplaySurface for TerminalDisplay<W> {
    fn set_current_image(&mut self, index: usize) {
        let file = image_file_name(index);
        debug!(index = index, file = %file, "Display image");
        self.line(format_args!("[image] {file} (Gallery image {})", index + 1));
    }

    fn set_counter_text(&mut self, current: usize, total: usize) {
        self.line(format_args!("[counter] {current} / {total}"));
    }

    fn set_thumbnail_active(&mut self, index: usize) {
        self.line(format_args!("[thumbnail] #{} active", index + 1));
    }

    fn show_placeholder(&mut self, message: &str) {
        self.line(format_args!("[image] {message}"));
    }
}
