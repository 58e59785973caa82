//! The interval countdown.
//!
//! [`IntervalTimer`] alternates work and break intervals, counts completed
//! work intervals and announces every finish. It owns no threads or clocks:
//! a [`Scheduler`] delivers generation-tagged ticks, and ticks carrying a
//! generation other than the current one are discarded, so a tick that was
//! already in flight when its source was cancelled can never move the
//! countdown.
//!
//! ```text
//!            start                 pause
//! Paused ──────────▶ Running ──────────▶ Paused
//!   ▲                  │ remaining hits 0
//!   │      finish      ▼
//!   └──────────── next mode (Running again when auto-starting)
//! ```

use std::time::Duration;

use tokio::sync::watch;
use tomato_ipc::{format_clock, Mode, TimerStatus};
use tracing::{debug, info, warn};

use crate::config::Durations;
use crate::notify::NotifyError;
use crate::persistence::StoreError;

const TICK_MS: u64 = 1000;

/// Label of the start/pause control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Start,
    Pause,
    Resume,
}

impl Control {
    pub fn label(&self) -> &'static str {
        match self {
            Control::Start => "start",
            Control::Pause => "pause",
            Control::Resume => "resume",
        }
    }
}

/// Immutable view of the timer handed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub mode: Mode,
    pub remaining_ms: u64,
    pub duration_ms: u64,
    pub running: bool,
    pub completed_work_count: u32,
    pub control: Control,
}

impl Snapshot {
    pub fn clock(&self) -> String {
        format_clock(self.remaining_ms)
    }

    /// Elapsed fraction of the current interval, 0.0 ..= 1.0.
    pub fn progress(&self) -> f64 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        let elapsed = self.duration_ms.saturating_sub(self.remaining_ms);
        (elapsed as f64 / self.duration_ms as f64).clamp(0.0, 1.0)
    }

    pub fn status(&self) -> TimerStatus {
        TimerStatus {
            mode: self.mode,
            running: self.running,
            remaining_ms: self.remaining_ms,
            duration_ms: self.duration_ms,
            completed_work_count: self.completed_work_count,
        }
    }
}

/// Cancels a periodic tick source when cancelled or dropped.
pub struct TickHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TickHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        self.fire();
    }

    fn fire(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.fire();
    }
}

/// Periodic 1 Hz tick source.
pub trait Scheduler: Send {
    /// Begin delivering ticks tagged with `generation` once per second
    /// until the returned handle is cancelled or dropped.
    fn every_second(&mut self, generation: u64) -> TickHandle;
}

/// Audible and visual announcement of a finished interval. Implementations
/// must return without waiting on the platform.
pub trait Notifier: Send {
    fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError>;
    fn play_sound(&self) -> Result<(), NotifyError>;
}

/// Durable home of the completed work interval count.
pub trait CountStore: Send {
    fn load_count(&self) -> Result<u32, StoreError>;
    fn save_count(&self, count: u32) -> Result<(), StoreError>;
}

/// Receives a snapshot after every tick and transition.
pub trait DisplaySink: Send {
    fn show(&self, snapshot: Snapshot);
}

impl DisplaySink for watch::Sender<Snapshot> {
    fn show(&self, snapshot: Snapshot) {
        self.send_replace(snapshot);
    }
}

/// Everything the timer talks to.
pub struct Collaborators {
    pub scheduler: Box<dyn Scheduler>,
    pub notifier: Box<dyn Notifier>,
    pub store: Box<dyn CountStore>,
    pub display: Box<dyn DisplaySink>,
}

pub struct IntervalTimer {
    durations: Durations,
    auto_start_next: bool,
    mode: Mode,
    remaining_ms: u64,
    running: bool,
    completed_work_count: u32,
    control: Control,
    generation: u64,
    ticks: Option<TickHandle>,
    scheduler: Box<dyn Scheduler>,
    notifier: Box<dyn Notifier>,
    store: Box<dyn CountStore>,
    display: Box<dyn DisplaySink>,
}

impl IntervalTimer {
    /// Build a paused timer on a fresh work interval, seeded with the
    /// persisted count. An unreadable store starts the count at zero.
    pub fn new(durations: Durations, auto_start_next: bool, collaborators: Collaborators) -> Self {
        let Collaborators {
            scheduler,
            notifier,
            store,
            display,
        } = collaborators;

        let completed_work_count = match store.load_count() {
            Ok(count) => count,
            Err(e) => {
                warn!("Failed to load completed work count, starting from 0: {}", e);
                0
            }
        };

        let timer = Self {
            durations,
            auto_start_next,
            mode: Mode::Work,
            remaining_ms: durations.millis_of(Mode::Work),
            running: false,
            completed_work_count,
            control: Control::Start,
            generation: 0,
            ticks: None,
            scheduler,
            notifier,
            store,
            display,
        };
        timer.emit();
        timer
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn completed_work_count(&self) -> u32 {
        self.completed_work_count
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            mode: self.mode,
            remaining_ms: self.remaining_ms,
            duration_ms: self.durations.millis_of(self.mode),
            running: self.running,
            completed_work_count: self.completed_work_count,
            control: self.control,
        }
    }

    pub fn start(&mut self) {
        if self.running {
            return;
        }
        if self.remaining_ms == 0 {
            self.remaining_ms = self.durations.millis_of(self.mode);
        }
        self.generation = self.generation.wrapping_add(1);
        self.ticks = Some(self.scheduler.every_second(self.generation));
        self.running = true;
        self.control = Control::Pause;
        debug!(
            "Started {} with {} left (generation {})",
            self.mode,
            format_clock(self.remaining_ms),
            self.generation
        );
        self.emit();
    }

    pub fn pause(&mut self) {
        if !self.running {
            return;
        }
        self.stop_ticking();
        self.control = Control::Resume;
        debug!("Paused {} at {}", self.mode, format_clock(self.remaining_ms));
        self.emit();
    }

    /// The single start/pause button.
    pub fn toggle(&mut self) {
        if self.running {
            self.pause();
        } else {
            self.start();
        }
    }

    pub fn reset(&mut self) {
        self.stop_ticking();
        self.remaining_ms = self.durations.millis_of(self.mode);
        self.control = Control::Start;
        debug!("Reset {}", self.mode);
        self.emit();
    }

    pub fn reset_count(&mut self) {
        self.completed_work_count = 0;
        self.persist_count();
        info!("Completed work count reset");
        self.emit();
    }

    /// Advance the countdown by one second. Ticks from a cancelled schedule
    /// or arriving while paused are ignored.
    pub fn tick(&mut self, generation: u64) {
        if !self.running || generation != self.generation {
            debug!(
                "Dropping stale tick (generation {}, current {})",
                generation, self.generation
            );
            return;
        }
        self.remaining_ms = self.remaining_ms.saturating_sub(TICK_MS);
        if self.remaining_ms == 0 {
            self.finish();
        } else {
            self.emit();
        }
    }

    fn finish(&mut self) {
        self.stop_ticking();

        let finished = self.mode;
        let count_after = match finished {
            Mode::Work => self.completed_work_count.saturating_add(1),
            Mode::ShortBreak | Mode::LongBreak => self.completed_work_count,
        };
        let next = match finished {
            Mode::Work if count_after % self.durations.intervals_before_long_break == 0 => {
                Mode::LongBreak
            }
            Mode::Work => Mode::ShortBreak,
            Mode::ShortBreak | Mode::LongBreak => Mode::Work,
        };
        info!("{} interval finished, next up: {}", finished, next);

        self.announce(finished, next);

        if finished == Mode::Work {
            self.completed_work_count = count_after;
            self.persist_count();
        }

        self.mode = next;
        self.remaining_ms = self.durations.millis_of(next);
        self.control = Control::Start;
        self.emit();

        if self.auto_start_next {
            self.start();
        }
    }

    fn announce(&self, finished: Mode, next: Mode) {
        if let Err(e) = self.notifier.play_sound() {
            warn!("Failed to play sound: {}", e);
        }
        let (title, message) = announcement(finished, next, self.durations.of(next));
        if let Err(e) = self.notifier.notify(&title, &message) {
            warn!("Failed to send notification: {}", e);
        }
    }

    fn persist_count(&self) {
        if let Err(e) = self.store.save_count(self.completed_work_count) {
            warn!(
                "Failed to persist completed work count {}: {}",
                self.completed_work_count, e
            );
        }
    }

    fn stop_ticking(&mut self) {
        if let Some(ticks) = self.ticks.take() {
            ticks.cancel();
        }
        self.running = false;
        self.generation = self.generation.wrapping_add(1);
    }

    fn emit(&self) {
        self.display.show(self.snapshot());
    }
}

/// Notification title and body for the end of `finished`.
pub fn announcement(finished: Mode, next: Mode, next_duration: Duration) -> (String, String) {
    let title = if finished.is_break() {
        "Break is over"
    } else {
        "Work interval complete"
    };
    let length = describe(next_duration);
    let message = match next {
        Mode::Work => format!("Time to focus ({})", length),
        Mode::ShortBreak => format!("Take a short break ({})", length),
        Mode::LongBreak => format!("Take a long break ({})", length),
    };
    (title.to_string(), message)
}

fn describe(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{} s", secs)
    } else {
        format!("{} min", secs / 60)
    }
}
