//! Composition point owning every manager
//!
//! `Site` holds the store, theme, navigation, gallery and membership state and
//! routes each `InputEvent` to them in arrival order. Nothing here is global;
//! the driver owns one `Site` for the lifetime of the process.

use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::gallery::display::{image_file_name, DisplaySurface};
use crate::gallery::scheduler::{Scheduler, TaskHandle};
use crate::gallery::GalleryController;
use crate::input::{Button, GalleryCommand, InputAdapter, InputEvent, Key};
use crate::membership::{IdAllocator, MembershipError, MembershipForm, MembershipRecord};
use crate::navigation::{GalleryTransition, NavigationManager};
use crate::persistence::KeyValueStore;
use crate::theme::{Theme, ThemeManager};

/// Reports whether a gallery image can be loaded
pub trait ImageProbe {
    fn probe(&self, index: usize) -> bool;
}

/// Probe that checks for `imgN.jpg` in a directory
#[derive(Debug, Clone)]
pub struct DirectoryProbe {
    dir: PathBuf,
}

impl DirectoryProbe {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ImageProbe for DirectoryProbe {
    fn probe(&self, index: usize) -> bool {
        self.dir.join(image_file_name(index)).is_file()
    }
}

/// What the driver should tell the user after an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    ThemeChanged(Theme),
    MemberIdIssued(String),
    /// Sequence number the next ID for `category` will carry
    NextSequence { category: String, sequence: u64 },
    Registered(MembershipRecord),
    /// User-visible error; the form stays blocked
    Rejected(String),
    Quit,
}

pub struct Site<D: DisplaySurface, S: Scheduler, K: KeyValueStore> {
    store: K,
    theme: ThemeManager,
    navigation: NavigationManager,
    gallery: GalleryController<D, S>,
    allocator: IdAllocator,
    form: MembershipForm,
    input: InputAdapter,
    probe: Option<Box<dyn ImageProbe>>,
}

impl<D: DisplaySurface, S: Scheduler, K: KeyValueStore> Site<D, S, K> {
    pub fn new(store: K, gallery: GalleryController<D, S>, probe: Option<Box<dyn ImageProbe>>) -> Self {
        let theme = ThemeManager::load(&store);
        Self {
            store,
            theme,
            navigation: NavigationManager::new(),
            gallery,
            allocator: IdAllocator::new(),
            form: MembershipForm::new(),
            input: InputAdapter::new(),
            probe,
        }
    }

    fn gallery_active(&self) -> bool {
        self.navigation.current_page().hosts_gallery()
    }

    pub fn handle_input(&mut self, event: InputEvent) -> Outcome {
        let gallery_active = self.gallery_active();
        if let Some(command) = self.input.translate(&event, gallery_active) {
            if gallery_active {
                self.run_gallery_command(command);
            } else {
                debug!(command = ?command, "Gallery not visible, ignoring command");
            }
            return Outcome::Continue;
        }

        match event {
            InputEvent::Click(Button::Hamburger) => self.navigation.open_nav(),
            InputEvent::Click(Button::NavClose | Button::NavOverlay) => self.navigation.close_nav(),
            InputEvent::Click(Button::ThemeToggle) => {
                let theme = match self.theme.toggle(&mut self.store) {
                    Ok(theme) => theme,
                    Err(e) => {
                        warn!(error = %e, "Theme switched but not saved");
                        self.theme.current()
                    }
                };
                return Outcome::ThemeChanged(theme);
            }
            InputEvent::KeyDown(Key::Escape) => {
                self.navigation.on_escape();
            }
            InputEvent::Navigate(page) => match self.navigation.navigate_to(page) {
                GalleryTransition::Entered => self.enter_gallery(),
                GalleryTransition::Left => self.gallery.deactivate(),
                GalleryTransition::Unchanged => {}
            },
            InputEvent::VisibilityChanged { hidden: true } => {
                if self.gallery.is_playing() {
                    info!("Page hidden, pausing slideshow");
                    self.gallery.stop_autoplay();
                }
            }
            InputEvent::Resize { width } => {
                self.navigation.on_resize(width);
            }
            InputEvent::SelectCategory(category) => {
                return match self.form.select_category(&category, &self.allocator, &mut self.store) {
                    Ok(id) => Outcome::MemberIdIssued(id.to_string()),
                    Err(e) => {
                        if e.is_persistence_failure() {
                            error!(error = %e, "Membership counters unavailable");
                        }
                        Outcome::Rejected(e.to_string())
                    }
                };
            }
            InputEvent::PeekNextId(category) => {
                return match self.allocator.peek_next(&self.store, &category) {
                    Ok(sequence) => Outcome::NextSequence { category, sequence },
                    Err(e) => Outcome::Rejected(e.to_string()),
                };
            }
            InputEvent::Submit(details) => {
                if !self.form.is_ready_to_submit() {
                    let reason = self
                        .form
                        .last_error()
                        .map(str::to_string)
                        .unwrap_or_else(|| MembershipError::MissingId.to_string());
                    debug!(reason = %reason, "Submission blocked");
                    return Outcome::Rejected(reason);
                }
                return match self.form.submit(details) {
                    Ok(record) => Outcome::Registered(record),
                    Err(e) => Outcome::Rejected(e.to_string()),
                };
            }
            InputEvent::Quit => return Outcome::Quit,
            other => debug!(event = ?other, "Event has no handler"),
        }
        Outcome::Continue
    }

    fn run_gallery_command(&mut self, command: GalleryCommand) {
        match command {
            GalleryCommand::Next => self.gallery.next(),
            GalleryCommand::Previous => self.gallery.previous(),
            GalleryCommand::ToggleAutoplay => {
                self.gallery.toggle_autoplay();
                return;
            }
            GalleryCommand::JumpTo(index) => self.gallery.jump_to(index),
            GalleryCommand::Swipe { start_x, end_x } => self.gallery.on_swipe(start_x, end_x),
            GalleryCommand::ImageLoaded(index) => {
                self.gallery.on_image_load_success(index);
                return;
            }
            GalleryCommand::ImageFailed(index) => self.gallery.on_image_load_failure(index),
            GalleryCommand::PreloadFailed(index) => {
                self.gallery.mark_failed(index);
                return;
            }
        }
        self.probe_current();
    }

    fn enter_gallery(&mut self) {
        let preload = self.gallery.activate();
        if let Some(probe) = &self.probe {
            for index in preload {
                if !probe.probe(index) {
                    debug!(index = index, "Preload probe failed");
                    self.gallery.mark_failed(index);
                }
            }
        }
        self.probe_current();
    }

    /// Feed load/error results for the displayed image back into the gallery
    /// until an image loads or the gallery is exhausted.
    fn probe_current(&mut self) {
        let Some(probe) = &self.probe else {
            return;
        };
        for _ in 0..=self.gallery.total_count() {
            if self.gallery.is_exhausted() {
                return;
            }
            let index = self.gallery.current_index();
            if probe.probe(index) {
                self.gallery.on_image_load_success(index);
                return;
            }
            self.gallery.on_image_load_failure(index);
        }
    }

    /// Deliver an autoplay tick from the scheduler
    pub fn on_autoplay_tick(&mut self, handle: TaskHandle) {
        if self.gallery.on_autoplay_tick(handle) {
            self.probe_current();
        }
    }

    /// Cancel pending work before the process exits
    pub fn shutdown(&mut self) {
        self.gallery.destroy();
        info!(failed_images = self.gallery.failed_count(), "Site shut down");
    }

    pub fn gallery(&self) -> &GalleryController<D, S> {
        &self.gallery
    }

    pub fn gallery_mut(&mut self) -> &mut GalleryController<D, S> {
        &mut self.gallery
    }

    #[cfg(test)]
    pub fn navigation(&self) -> &NavigationManager {
        &self.navigation
    }

    pub fn theme(&self) -> Theme {
        self.theme.current()
    }

    #[cfg(test)]
    pub fn form(&self) -> &MembershipForm {
        &self.form
    }

    #[cfg(test)]
    pub fn store(&self) -> &K {
        &self.store
    }
}
