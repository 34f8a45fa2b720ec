//! Conferences slideshow controller
//!
//! Owns the current slide, autoplay state and the per-session set of images
//! that failed to load. Every state change is pushed to a `DisplaySurface`;
//! autoplay is a repeating task obtained from a `Scheduler` and owned by the
//! controller alone.

pub mod display;
pub mod scheduler;

use std::collections::BTreeSet;
use std::ops::Range;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::constants::gallery;
use display::{DisplayState, DisplaySurface};
use scheduler::{Scheduler, TaskHandle};

/// Tunables for a gallery instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GallerySettings {
    pub total_images: usize,
    pub autoplay_delay: Duration,
    pub swipe_threshold_px: u32,
    pub preload_count: usize,
}

impl Default for GallerySettings {
    fn default() -> Self {
        Self {
            total_images: gallery::TOTAL_IMAGES,
            autoplay_delay: Duration::from_millis(gallery::AUTOPLAY_DELAY_MS),
            swipe_threshold_px: gallery::SWIPE_THRESHOLD_PX,
            preload_count: gallery::PRELOAD_COUNT,
        }
    }
}

pub struct GalleryController<D: DisplaySurface, S: Scheduler> {
    settings: GallerySettings,
    initialized: bool,
    total_count: usize,
    current_index: usize,
    playing: bool,
    failed_indices: BTreeSet<usize>,
    autoplay_task: Option<TaskHandle>,
    display_state: DisplayState,
    display: D,
    scheduler: S,
}

impl<D: DisplaySurface, S: Scheduler> GalleryController<D, S> {
    /// Create an uninitialized controller; `activate` or `initialize` must run
    /// before navigation has any effect.
    pub fn new(settings: GallerySettings, display: D, scheduler: S) -> Self {
        Self {
            settings,
            initialized: false,
            total_count: 0,
            current_index: 0,
            playing: false,
            failed_indices: BTreeSet::new(),
            autoplay_task: None,
            display_state: DisplayState::Showing,
            display,
            scheduler,
        }
    }

    /// Reset to the first slide, paused, with no known failures.
    /// Only the first call has an effect.
    pub fn initialize(&mut self, total_count: usize) {
        if self.initialized {
            debug!(total = self.total_count, "Gallery already initialized, ignoring");
            return;
        }
        if total_count == 0 {
            warn!("Refusing to initialize a gallery with no images");
            return;
        }

        self.total_count = total_count;
        self.current_index = 0;
        self.playing = false;
        self.failed_indices.clear();
        self.display_state = DisplayState::Showing;
        self.initialized = true;
        info!(total = total_count, "Gallery initialized");
    }

    /// Gallery view became visible. Returns the indices to preload.
    pub fn activate(&mut self) -> Range<usize> {
        self.initialize(self.settings.total_images);
        if !self.initialized {
            return 0..0;
        }
        self.refresh();
        0..self.settings.preload_count.min(self.total_count)
    }

    /// Gallery view was hidden
    pub fn deactivate(&mut self) {
        if self.playing {
            info!("Gallery hidden, stopping autoplay");
        }
        self.stop_autoplay();
    }

    pub fn next(&mut self) {
        if !self.initialized {
            return;
        }
        self.current_index = (self.current_index + 1) % self.total_count;
        self.show_current();
    }

    pub fn previous(&mut self) {
        if !self.initialized {
            return;
        }
        self.current_index = (self.current_index + self.total_count - 1) % self.total_count;
        self.show_current();
    }

    /// Select a slide directly; out-of-range indices are ignored
    pub fn jump_to(&mut self, index: usize) {
        if !self.initialized || index >= self.total_count {
            debug!(index = index, total = self.total_count, "Ignoring out-of-range jump");
            return;
        }
        self.current_index = index;
        self.show_current();
    }

    pub fn toggle_autoplay(&mut self) {
        if self.playing {
            self.stop_autoplay();
        } else {
            self.start_autoplay();
        }
    }

    fn start_autoplay(&mut self) {
        if let Some(stale) = self.autoplay_task.take() {
            self.scheduler.cancel(stale);
        }
        let handle = self.scheduler.schedule_repeating(self.settings.autoplay_delay);
        self.autoplay_task = Some(handle);
        self.playing = true;
        info!(task = handle.id(), delay_ms = self.settings.autoplay_delay.as_millis() as u64, "Autoplay started");
    }

    /// Cancel autoplay if running. Safe to call in any state.
    pub fn stop_autoplay(&mut self) {
        self.playing = false;
        if let Some(handle) = self.autoplay_task.take() {
            self.scheduler.cancel(handle);
            info!(task = handle.id(), "Autoplay stopped");
        }
    }

    /// Deliver a scheduler tick. Returns whether the slideshow advanced.
    pub fn on_autoplay_tick(&mut self, handle: TaskHandle) -> bool {
        if self.autoplay_task != Some(handle) {
            debug!(task = handle.id(), "Ignoring tick from stale autoplay task");
            return false;
        }
        if self.display_state == DisplayState::Placeholder {
            debug!("Gallery exhausted, autoplay tick suppressed");
            return false;
        }
        self.next();
        true
    }

    /// Interpret a horizontal touch gesture. Right-to-left travel goes forward.
    pub fn on_swipe(&mut self, start_x: i32, end_x: i32) {
        let delta = i64::from(start_x) - i64::from(end_x);
        if delta.unsigned_abs() <= u64::from(self.settings.swipe_threshold_px) {
            return;
        }
        if delta > 0 {
            self.next();
        } else {
            self.previous();
        }
    }

    /// Record a failure without moving (e.g. a preload probe)
    pub fn mark_failed(&mut self, index: usize) {
        if index < self.total_count && self.failed_indices.insert(index) {
            debug!(index = index, "Image marked as failed");
        }
    }

    /// The image at `index` failed to load: skip forward to the next image
    /// not known to fail, or show the placeholder if there is none.
    pub fn on_image_load_failure(&mut self, index: usize) {
        if !self.initialized || index >= self.total_count {
            debug!(index = index, "Ignoring failure for out-of-range image");
            return;
        }
        self.failed_indices.insert(index);
        warn!(index = index, failed = self.failed_indices.len(), "Image failed to load");

        let recovered = (1..=self.total_count)
            .map(|offset| (index + offset) % self.total_count)
            .find(|candidate| !self.failed_indices.contains(candidate));

        match recovered {
            Some(candidate) => {
                info!(from = index, to = candidate, "Skipping to next available image");
                self.current_index = candidate;
                self.show_current();
            }
            None => {
                warn!(total = self.total_count, "Every gallery image failed to load");
                self.display_state = DisplayState::Placeholder;
                self.display.show_placeholder(gallery::PLACEHOLDER_MESSAGE);
            }
        }
    }

    /// The image at `index` loaded; forget any earlier failure for it. An
    /// exhausted gallery resumes showing from that image.
    pub fn on_image_load_success(&mut self, index: usize) {
        if !self.failed_indices.remove(&index) {
            return;
        }
        info!(index = index, "Previously failed image loaded");
        if self.display_state == DisplayState::Placeholder && index < self.total_count {
            info!(index = index, "Leaving placeholder");
            self.current_index = index;
            self.show_current();
        }
    }

    /// Cancel autoplay ahead of discarding the controller
    pub fn destroy(&mut self) {
        self.stop_autoplay();
        debug!("Gallery torn down");
    }

    fn show_current(&mut self) {
        self.display_state = DisplayState::Showing;
        self.refresh();
    }

    fn refresh(&mut self) {
        if self.display_state == DisplayState::Placeholder {
            self.display.show_placeholder(gallery::PLACEHOLDER_MESSAGE);
            return;
        }
        self.display.set_current_image(self.current_index);
        self.display.set_counter_text(self.current_index + 1, self.total_count);
        self.display.set_thumbnail_active(self.current_index);
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    #[cfg(test)]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_exhausted(&self) -> bool {
        self.display_state == DisplayState::Placeholder
    }

    pub fn failed_count(&self) -> usize {
        self.failed_indices.len()
    }

    #[cfg(test)]
    pub fn autoplay_task(&self) -> Option<TaskHandle> {
        self.autoplay_task
    }

    #[cfg(test)]
    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }
}

impl<D: DisplaySurface, S: Scheduler> Drop for GalleryController<D, S> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct RecordingDisplay {
        images: Vec<usize>,
        counters: Vec<(usize, usize)>,
        thumbnails: Vec<usize>,
        placeholders: usize,
    }

    impl DisplaySurface for RecordingDisplay {
        fn set_current_image(&mut self, index: usize) {
            self.images.push(index);
        }

        fn set_counter_text(&mut self, current: usize, total: usize) {
            self.counters.push((current, total));
        }

        fn set_thumbnail_active(&mut self, index: usize) {
            self.thumbnails.push(index);
        }

        fn show_placeholder(&mut self, _message: &str) {
            self.placeholders += 1;
        }
    }

    #[derive(Debug, Default)]
    struct CountingScheduler {
        next_id: u64,
        started: usize,
        cancelled: usize,
        active: BTreeSet<u64>,
    }

    impl Scheduler for CountingScheduler {
        fn schedule_repeating(&mut self, _period: Duration) -> TaskHandle {
            self.next_id += 1;
            self.started += 1;
            self.active.insert(self.next_id);
            TaskHandle::from_id(self.next_id)
        }

        fn cancel(&mut self, handle: TaskHandle) {
            if self.active.remove(&handle.id()) {
                self.cancelled += 1;
            }
        }
    }

    type TestGallery = GalleryController<RecordingDisplay, CountingScheduler>;

    fn gallery(total: usize) -> TestGallery {
        let settings = GallerySettings {
            total_images: total,
            ..GallerySettings::default()
        };
        let mut gallery = GalleryController::new(settings, RecordingDisplay::default(), CountingScheduler::default());
        gallery.activate();
        gallery
    }

    #[test]
    fn test_initialize_sets_defaults() {
        let gallery = gallery(55);
        assert!(gallery.is_initialized());
        assert_eq!(gallery.current_index(), 0);
        assert_eq!(gallery.total_count(), 55);
        assert!(!gallery.is_playing());
        assert_eq!(gallery.failed_count(), 0);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut gallery = gallery(10);
        gallery.next();
        gallery.next();
        gallery.on_image_load_failure(5);
        let index = gallery.current_index();

        gallery.initialize(10);
        gallery.initialize(20);

        assert_eq!(gallery.current_index(), index);
        assert_eq!(gallery.total_count(), 10);
        assert_eq!(gallery.failed_count(), 1);
    }

    #[test]
    fn test_navigation_before_initialize_is_noop() {
        let mut gallery: TestGallery =
            GalleryController::new(GallerySettings::default(), RecordingDisplay::default(), CountingScheduler::default());
        gallery.next();
        gallery.previous();
        gallery.jump_to(3);
        gallery.on_image_load_failure(0);

        assert_eq!(gallery.current_index(), 0);
        assert!(gallery.display().images.is_empty());
    }

    #[test]
    fn test_activate_returns_preload_range() {
        let mut big = gallery(55);
        assert_eq!(big.activate(), 0..5);

        let mut small = gallery(3);
        assert_eq!(small.activate(), 0..3);
    }

    #[test]
    fn test_wrap_around_keeps_index_in_range() {
        let mut gallery = gallery(7);
        // Deterministic pseudo-random walk
        let mut seed: u32 = 0x2545_F491;
        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            if seed % 3 == 0 {
                gallery.previous();
            } else {
                gallery.next();
            }
            assert!(gallery.current_index() < 7);
        }
    }

    #[test]
    fn test_wrap_boundaries() {
        let mut gallery = gallery(55);
        gallery.previous();
        assert_eq!(gallery.current_index(), 54);
        gallery.next();
        assert_eq!(gallery.current_index(), 0);
    }

    #[test]
    fn test_next_then_previous_is_identity() {
        let mut gallery = gallery(55);
        gallery.jump_to(20);
        gallery.next();
        gallery.previous();
        assert_eq!(gallery.current_index(), 20);
        gallery.previous();
        gallery.next();
        assert_eq!(gallery.current_index(), 20);
    }

    #[test]
    fn test_single_image_gallery_wraps_to_itself() {
        let mut gallery = gallery(1);
        gallery.next();
        assert_eq!(gallery.current_index(), 0);
        gallery.previous();
        assert_eq!(gallery.current_index(), 0);
    }

    #[test]
    fn test_navigation_updates_display() {
        let mut gallery = gallery(55);
        gallery.next();

        let display = gallery.display();
        assert_eq!(display.images.last(), Some(&1));
        assert_eq!(display.counters.last(), Some(&(2, 55)));
        assert_eq!(display.thumbnails.last(), Some(&1));
    }

    #[test]
    fn test_jump_to_out_of_range_is_ignored() {
        let mut gallery = gallery(55);
        gallery.jump_to(12);
        let updates = gallery.display().images.len();

        gallery.jump_to(55);
        gallery.jump_to(usize::MAX);

        assert_eq!(gallery.current_index(), 12);
        assert_eq!(gallery.display().images.len(), updates);
    }

    #[test]
    fn test_toggle_twice_restores_state_without_leaking_timers() {
        let mut gallery = gallery(55);
        gallery.toggle_autoplay();
        assert!(gallery.is_playing());
        gallery.toggle_autoplay();
        assert!(!gallery.is_playing());

        gallery.toggle_autoplay();
        gallery.toggle_autoplay();

        let scheduler = gallery.scheduler();
        assert_eq!(scheduler.started, 2);
        assert_eq!(scheduler.cancelled, scheduler.started);
        assert!(scheduler.active.is_empty());
        assert_eq!(gallery.autoplay_task(), None);
    }

    #[test]
    fn test_navigation_does_not_change_play_state() {
        let mut gallery = gallery(55);
        gallery.toggle_autoplay();
        gallery.next();
        gallery.previous();
        gallery.jump_to(9);
        assert!(gallery.is_playing());
        assert_eq!(gallery.scheduler().active.len(), 1);
    }

    #[test]
    fn test_autoplay_tick_advances_only_for_live_task() {
        let mut gallery = gallery(55);
        gallery.toggle_autoplay();
        let live = gallery.autoplay_task().unwrap();

        assert!(gallery.on_autoplay_tick(live));
        assert_eq!(gallery.current_index(), 1);

        gallery.toggle_autoplay();
        assert!(!gallery.on_autoplay_tick(live));
        assert_eq!(gallery.current_index(), 1);
    }

    #[test]
    fn test_destroy_cancels_autoplay() {
        let mut gallery = gallery(55);
        gallery.toggle_autoplay();
        gallery.destroy();
        gallery.destroy();

        assert!(!gallery.is_playing());
        assert_eq!(gallery.scheduler().cancelled, 1);
        assert!(gallery.scheduler().active.is_empty());
    }

    #[test]
    fn test_deactivate_stops_autoplay() {
        let mut gallery = gallery(55);
        gallery.toggle_autoplay();
        gallery.deactivate();
        assert!(!gallery.is_playing());
        assert!(gallery.scheduler().active.is_empty());
    }

    #[test]
    fn test_swipe_left_goes_forward() {
        let mut gallery = gallery(55);
        gallery.on_swipe(100, 40);
        assert_eq!(gallery.current_index(), 1);
    }

    #[test]
    fn test_swipe_right_goes_back() {
        let mut gallery = gallery(55);
        gallery.on_swipe(40, 100);
        assert_eq!(gallery.current_index(), 54);
    }

    #[test]
    fn test_small_swipe_is_a_tap() {
        let mut gallery = gallery(55);
        let updates = gallery.display().images.len();
        gallery.on_swipe(40, 45);
        // Exactly at the threshold is still a tap
        gallery.on_swipe(100, 50);
        assert_eq!(gallery.current_index(), 0);
        assert_eq!(gallery.display().images.len(), updates);
    }

    #[test]
    fn test_failure_skips_to_next_available() {
        let mut gallery = gallery(10);
        gallery.mark_failed(4);
        gallery.jump_to(3);
        gallery.on_image_load_failure(3);
        assert_eq!(gallery.current_index(), 5);
        assert!(!gallery.is_exhausted());
    }

    #[test]
    fn test_failure_probe_wraps_around() {
        let mut gallery = gallery(4);
        gallery.mark_failed(0);
        gallery.jump_to(3);
        gallery.on_image_load_failure(3);
        assert_eq!(gallery.current_index(), 1);
    }

    #[test]
    fn test_all_failed_enters_placeholder_then_recovers() {
        let mut gallery = gallery(55);
        for index in 0..55 {
            gallery.on_image_load_failure(index);
        }
        assert!(gallery.is_exhausted());
        assert_eq!(gallery.display().placeholders, 1);

        gallery.on_image_load_success(3);
        gallery.on_image_load_failure(10);

        assert!(!gallery.is_exhausted());
        assert_eq!(gallery.current_index(), 3);
    }

    #[test]
    fn test_placeholder_suppresses_autoplay() {
        let mut gallery = gallery(2);
        gallery.toggle_autoplay();
        let live = gallery.autoplay_task().unwrap();
        gallery.on_image_load_failure(0);
        gallery.on_image_load_failure(1);
        assert!(gallery.is_exhausted());

        let index = gallery.current_index();
        assert!(!gallery.on_autoplay_tick(live));
        assert_eq!(gallery.current_index(), index);
    }

    #[test]
    fn test_success_leaves_placeholder_and_resumes_autoplay() {
        let mut gallery = gallery(3);
        gallery.toggle_autoplay();
        let live = gallery.autoplay_task().unwrap();
        for index in 0..3 {
            gallery.on_image_load_failure(index);
        }
        assert!(gallery.is_exhausted());

        gallery.on_image_load_success(1);

        assert!(!gallery.is_exhausted());
        assert_eq!(gallery.failed_count(), 2);
        assert_eq!(gallery.current_index(), 1);
        assert_eq!(gallery.display().images.last(), Some(&1));

        assert!(gallery.on_autoplay_tick(live));
        assert_eq!(gallery.current_index(), 2);
    }

    #[test]
    fn test_success_for_unfailed_image_keeps_placeholder_state() {
        let mut gallery = gallery(2);
        gallery.on_image_load_failure(0);
        gallery.on_image_load_failure(1);
        assert!(gallery.is_exhausted());

        // Out of range, never recorded as failed
        gallery.on_image_load_success(5);
        assert!(gallery.is_exhausted());
    }

    #[test]
    fn test_success_clears_failure_record() {
        let mut gallery = gallery(10);
        gallery.mark_failed(2);
        gallery.mark_failed(7);
        gallery.on_image_load_success(2);
        gallery.on_image_load_success(8);
        assert_eq!(gallery.failed_count(), 1);
    }

    #[test]
    fn test_failure_out_of_range_is_ignored() {
        let mut gallery = gallery(10);
        gallery.on_image_load_failure(10);
        gallery.mark_failed(99);
        assert_eq!(gallery.failed_count(), 0);
        assert_eq!(gallery.current_index(), 0);
    }
}
