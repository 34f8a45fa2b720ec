//! Raw input events and their translation into gallery commands
//!
//! Input arrives as text lines on stdin (one event per line), read on a
//! background thread and sent to the main loop over a channel.

use anyhow::{Context, Result};
use std::io::BufRead;
use std::str::FromStr;
use std::sync::mpsc::Sender;
use std::thread;
use tracing::{debug, error, info, warn};

use crate::membership::ApplicantDetails;
use crate::navigation::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Space,
    Escape,
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ArrowLeft" | "left" => Ok(Key::ArrowLeft),
            "ArrowRight" | "right" => Ok(Key::ArrowRight),
            "Space" | "space" => Ok(Key::Space),
            "Escape" | "esc" => Ok(Key::Escape),
            other => Err(format!("unknown key '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    PreviousSlide,
    NextSlide,
    PlayPause,
    Hamburger,
    NavClose,
    NavOverlay,
    ThemeToggle,
}

/// Everything the outside world can do to the site
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Click(Button),
    KeyDown(Key),
    TouchStart { x: i32 },
    TouchEnd { x: i32 },
    ThumbnailClick(usize),
    ImageLoaded(usize),
    ImageFailed(usize),
    PreloadFailed(usize),
    VisibilityChanged { hidden: bool },
    Resize { width: u32 },
    Navigate(Page),
    SelectCategory(String),
    PeekNextId(String),
    Submit(ApplicantDetails),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryCommand {
    Next,
    Previous,
    ToggleAutoplay,
    JumpTo(usize),
    Swipe { start_x: i32, end_x: i32 },
    ImageLoaded(usize),
    ImageFailed(usize),
    PreloadFailed(usize),
}

/// Turns raw events into gallery commands; remembers where a touch began
#[derive(Debug, Default)]
pub struct InputAdapter {
    touch_start_x: Option<i32>,
}

impl InputAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gallery command for `event`, if any. Keyboard shortcuts only apply
    /// while the gallery view is active.
    pub fn translate(&mut self, event: &InputEvent, gallery_active: bool) -> Option<GalleryCommand> {
        match *event {
            InputEvent::Click(Button::PreviousSlide) => Some(GalleryCommand::Previous),
            InputEvent::Click(Button::NextSlide) => Some(GalleryCommand::Next),
            InputEvent::Click(Button::PlayPause) => Some(GalleryCommand::ToggleAutoplay),
            InputEvent::KeyDown(key) if gallery_active => match key {
                Key::ArrowLeft => Some(GalleryCommand::Previous),
                Key::ArrowRight => Some(GalleryCommand::Next),
                Key::Space => Some(GalleryCommand::ToggleAutoplay),
                Key::Escape => None,
            },
            InputEvent::TouchStart { x } => {
                self.touch_start_x = Some(x);
                None
            }
            InputEvent::TouchEnd { x } => match self.touch_start_x.take() {
                Some(start_x) => Some(GalleryCommand::Swipe { start_x, end_x: x }),
                None => {
                    debug!(x = x, "Touch end without a touch start");
                    None
                }
            },
            InputEvent::ThumbnailClick(index) => Some(GalleryCommand::JumpTo(index)),
            InputEvent::ImageLoaded(index) => Some(GalleryCommand::ImageLoaded(index)),
            InputEvent::ImageFailed(index) => Some(GalleryCommand::ImageFailed(index)),
            InputEvent::PreloadFailed(index) => Some(GalleryCommand::PreloadFailed(index)),
            _ => None,
        }
    }
}

/// Parse one line of driver input. Slide numbers are 1-based, as shown on
/// screen.
pub fn parse_line(line: &str) -> Result<InputEvent, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Err("empty input".to_string());
    };
    let rest: Vec<&str> = words.collect();

    let slide = |rest: &[&str]| -> Result<usize, String> {
        let raw = rest.first().ok_or("missing slide number")?;
        let number: usize = raw.parse().map_err(|_| format!("invalid slide number '{raw}'"))?;
        number.checked_sub(1).ok_or_else(|| "slide numbers start at 1".to_string())
    };
    let coordinate = |raw: Option<&&str>| -> Result<i32, String> {
        let raw = raw.ok_or("missing coordinate")?;
        raw.parse().map_err(|_| format!("invalid coordinate '{raw}'"))
    };

    let event = match command {
        "next" => InputEvent::Click(Button::NextSlide),
        "prev" | "previous" => InputEvent::Click(Button::PreviousSlide),
        "play" | "pause" => InputEvent::Click(Button::PlayPause),
        "theme" => InputEvent::Click(Button::ThemeToggle),
        "key" => InputEvent::KeyDown(rest.first().ok_or("missing key name")?.parse()?),
        "touchstart" => InputEvent::TouchStart { x: coordinate(rest.first())? },
        "touchend" => InputEvent::TouchEnd { x: coordinate(rest.first())? },
        "thumb" => InputEvent::ThumbnailClick(slide(rest.as_slice())?),
        "load" => InputEvent::ImageLoaded(slide(rest.as_slice())?),
        "fail" => InputEvent::ImageFailed(slide(rest.as_slice())?),
        "preload" => InputEvent::PreloadFailed(slide(rest.as_slice())?),
        "hide" => InputEvent::VisibilityChanged { hidden: true },
        "show" => InputEvent::VisibilityChanged { hidden: false },
        "resize" => {
            let raw = rest.first().ok_or("missing width")?;
            InputEvent::Resize {
                width: raw.parse().map_err(|_| format!("invalid width '{raw}'"))?,
            }
        }
        "page" => InputEvent::Navigate(rest.first().ok_or("missing page name")?.parse()?),
        "menu" => match rest.first().copied() {
            Some("open") => InputEvent::Click(Button::Hamburger),
            Some("close") => InputEvent::Click(Button::NavClose),
            Some("overlay") => InputEvent::Click(Button::NavOverlay),
            _ => return Err("usage: menu open|close|overlay".to_string()),
        },
        "join" => InputEvent::SelectCategory(rest.first().ok_or("missing category")?.to_string()),
        "peek" => InputEvent::PeekNextId(rest.first().ok_or("missing category")?.to_string()),
        "submit" => {
            // submit <name> <email> <phone> <payment reference>
            let [name, email, phone, payment_reference] = rest.as_slice() else {
                return Err("usage: submit <name> <email> <phone> <payment-ref>".to_string());
            };
            InputEvent::Submit(ApplicantDetails {
                name: name.replace('_', " "),
                email: email.to_string(),
                phone: phone.to_string(),
                payment_reference: payment_reference.to_string(),
            })
        }
        "quit" | "exit" => InputEvent::Quit,
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(event)
}

/// Read stdin on a background thread, sending each parsed line. End of input
/// is sent as `Quit`.
pub fn spawn_stdin_listener(sender: Sender<InputEvent>) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin-input".to_string())
        .spawn(move || {
            info!("Input listener started");
            if let Err(e) = listen_stdin(&sender) {
                error!(error = %e, "Input listener error");
            }
            let _ = sender.send(InputEvent::Quit);
        })
        .context("Failed to spawn input listener thread")
}

fn listen_stdin(sender: &Sender<InputEvent>) -> Result<()> {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read input line")?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Ok(event) => {
                debug!(event = ?event, "Parsed input");
                sender.send(event).context("Main loop stopped receiving input")?;
            }
            Err(e) => warn!(input = %line.trim(), error = %e, "Ignoring input"),
        }
    }
    Ok(())
}
