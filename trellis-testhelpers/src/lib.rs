#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

extern crate alloc;

pub use color_eyre::eyre;
pub use trellis_testhelpers_macros::test;

use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;
use log::{Level, LevelFilter, Log, Metadata, Record};
use owo_colors::{OwoColorize, Style};
use std::io::Write;
use std::sync::Once;

struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        // Create style based on log level
        let level_style = match record.level() {
            Level::Error => Style::new().fg_rgb::<243, 139, 168>(), // Catppuccin red (Maroon)
            Level::Warn => Style::new().fg_rgb::<249, 226, 175>(),  // Catppuccin yellow (Peach)
            Level::Info => Style::new().fg_rgb::<166, 227, 161>(),  // Catppuccin green (Green)
            Level::Debug => Style::new().fg_rgb::<137, 180, 250>(), // Catppuccin blue (Blue)
            Level::Trace => Style::new().fg_rgb::<148, 226, 213>(), // Catppuccin teal (Teal)
        };

        eprintln!(
            "{} - {}: {}",
            record.level().style(level_style),
            record
                .target()
                .style(Style::new().fg_rgb::<137, 180, 250>()),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Installs color-eyre and color-backtrace (except on miri), and sets up a
/// simple logger.
///
/// Tests share a process, so only the first call does anything.
pub fn setup() {
    static SETUP: Once = Once::new();
    SETUP.call_once(install);
}

fn install() {
    #[cfg(not(miri))]
    {
        use color_eyre::config::HookBuilder;
        use regex::Regex;
        use std::sync::LazyLock;

        /// Frames hidden from error and panic backtraces: panic machinery,
        /// the test harness, and closure trampolines.
        static IGNORE_FRAMES: LazyLock<Option<Regex>> = LazyLock::new(|| {
            Regex::new(r"^(std::panic|core::panic|test::run_test|__pthread_cond_wait|std::sys::(pal|backtrace)|std::thread::Builder|core::ops::function|test::__rust_begin_short_backtrace|<core::panic::|<alloc::boxed::Box<F,A> as core::ops::function::FnOnce<Args>>::call_once)")
                .ok()
        });

        fn ignored(name: &str) -> bool {
            IGNORE_FRAMES
                .as_ref()
                .is_some_and(|regex| regex.is_match(name))
        }

        let eyre_filter = move |frames: &mut Vec<&color_eyre::config::Frame>| {
            frames.retain(|frame| {
                frame
                    .name
                    .as_ref()
                    .map(|n| !ignored(&n.to_string()))
                    .unwrap_or(true)
            });
        };

        if let Err(err) = HookBuilder::default()
            .add_frame_filter(Box::new(eyre_filter))
            .install()
        {
            eprintln!("color-eyre was already installed: {err}");
        }

        {
            use color_backtrace::{BacktracePrinter, Frame};

            let filter = move |frames: &mut Vec<&Frame>| {
                frames.retain(|frame| {
                    frame
                        .name
                        .as_ref()
                        .map(|name| !ignored(name))
                        .unwrap_or(true)
                });
            };

            let stderr = color_backtrace::termcolor::StandardStream::stderr(
                color_backtrace::termcolor::ColorChoice::Auto,
            );
            let printer = BacktracePrinter::new().add_frame_filter(Box::new(filter));
            printer.install(Box::new(stderr));
        }
    }

    if log::set_boxed_logger(Box::new(SimpleLogger)).is_ok() {
        log::set_max_level(LevelFilter::Trace);
    }
}

/// One notification seen by a [`Recorder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// Path of the change, relative to the node the listener was added to
    pub path: String,
    /// What happened (`add`, `remove` or `modify`)
    pub operation: String,
    /// The new or removed value, formatted
    pub value: String,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.operation, self.path, self.value)
    }
}

/// Collects notifications in the order they arrive.
///
/// Clones share the same log, so one clone can move into a listener while
/// the test keeps another:
///
/// ```ignore
/// let recorder = Recorder::new();
/// let _token = node.add_child_listener({
///     let recorder = recorder.clone();
///     move |path, op, _, value| recorder.record(path, op, value)
/// });
/// ```
#[derive(Clone, Default)]
pub struct Recorder {
    events: Rc<RefCell<Vec<Event>>>,
}

impl Recorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one notification.
    pub fn record(
        &self,
        path: impl fmt::Display,
        operation: impl fmt::Display,
        value: impl fmt::Display,
    ) {
        let event = Event {
            path: path.to_string(),
            operation: operation.to_string(),
            value: value.to_string(),
        };
        log::trace!("Recorded {}", event.blue());
        self.events.borrow_mut().push(event);
    }

    /// Every notification so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Every notification so far, formatted as `operation path value`.
    pub fn lines(&self) -> Vec<String> {
        self.events.borrow().iter().map(Event::to_string).collect()
    }

    /// The path of every notification so far.
    pub fn paths(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .map(|event| event.path.clone())
            .collect()
    }

    /// Number of notifications so far.
    pub fn count(&self) -> usize {
        self.events.borrow().len()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.lines()).finish()
    }
}
