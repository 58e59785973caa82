//! In-memory collaborators for driving the timer without a clock.

use std::sync::{Arc, Mutex};

use crate::config::Durations;
use crate::notify::NotifyError;
use crate::persistence::StoreError;
use crate::timer::{
    Collaborators, CountStore, DisplaySink, IntervalTimer, Notifier, Scheduler, Snapshot,
    TickHandle,
};

/// Remembers which generation is currently scheduled; the test calls
/// `tick` itself.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    pub active: Arc<Mutex<Option<u64>>>,
    pub scheduled: Arc<Mutex<u32>>,
}

impl Scheduler for ManualScheduler {
    fn every_second(&mut self, generation: u64) -> TickHandle {
        *self.active.lock().unwrap() = Some(generation);
        *self.scheduled.lock().unwrap() += 1;
        let active = self.active.clone();
        TickHandle::new(move || {
            let mut active = active.lock().unwrap();
            if *active == Some(generation) {
                *active = None;
            }
        })
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    pub notes: Arc<Mutex<Vec<(String, String)>>>,
    pub sounds: Arc<Mutex<u32>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        self.notes
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
        if self.fail {
            return Err(NotifyError::Dispatch("notification daemon gone".into()));
        }
        Ok(())
    }

    fn play_sound(&self) -> Result<(), NotifyError> {
        *self.sounds.lock().unwrap() += 1;
        if self.fail {
            return Err(NotifyError::Sound(std::io::Error::other("no tty")));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    pub fail: bool,
    pub initial: u32,
    pub saved: Arc<Mutex<Vec<u32>>>,
}

impl CountStore for MemoryStore {
    fn load_count(&self) -> Result<u32, StoreError> {
        if self.fail {
            return Err(StoreError::NoDataDir);
        }
        Ok(self.initial)
    }

    fn save_count(&self, count: u32) -> Result<(), StoreError> {
        self.saved.lock().unwrap().push(count);
        if self.fail {
            return Err(StoreError::NoDataDir);
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingDisplay {
    pub shown: Arc<Mutex<Vec<Snapshot>>>,
}

impl DisplaySink for RecordingDisplay {
    fn show(&self, snapshot: Snapshot) {
        self.shown.lock().unwrap().push(snapshot);
    }
}

pub struct Harness {
    pub timer: IntervalTimer,
    scheduler: ManualScheduler,
    notifier: RecordingNotifier,
    store: MemoryStore,
    display: RecordingDisplay,
}

#[derive(Default)]
pub struct HarnessBuilder {
    durations: Durations,
    auto_start_next: bool,
    notifier: RecordingNotifier,
    store: MemoryStore,
}

impl HarnessBuilder {
    pub fn durations(mut self, durations: Durations) -> Self {
        self.durations = durations;
        self
    }

    pub fn auto_start_next(mut self) -> Self {
        self.auto_start_next = true;
        self
    }

    pub fn failing_notifier(mut self) -> Self {
        self.notifier.fail = true;
        self
    }

    pub fn failing_store(mut self) -> Self {
        self.store.fail = true;
        self
    }

    pub fn stored_count(mut self, count: u32) -> Self {
        self.store.initial = count;
        self
    }

    pub fn build(self) -> Harness {
        let scheduler = ManualScheduler::default();
        let display = RecordingDisplay::default();
        let timer = IntervalTimer::new(
            self.durations,
            self.auto_start_next,
            Collaborators {
                scheduler: Box::new(scheduler.clone()),
                notifier: Box::new(self.notifier.clone()),
                store: Box::new(self.store.clone()),
                display: Box::new(display.clone()),
            },
        );
        Harness {
            timer,
            scheduler,
            notifier: self.notifier,
            store: self.store,
            display,
        }
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn with_stored_count(count: u32) -> Self {
        Self::builder().stored_count(count).build()
    }

    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    pub fn active_generation(&self) -> Option<u64> {
        *self.scheduler.active.lock().unwrap()
    }

    pub fn schedules(&self) -> u32 {
        *self.scheduler.scheduled.lock().unwrap()
    }

    /// Deliver `secs` ticks from whatever schedule is active at the time.
    pub fn advance(&mut self, secs: u64) {
        for _ in 0..secs {
            if let Some(generation) = self.active_generation() {
                self.timer.tick(generation);
            }
        }
    }

    /// Tick until the current interval finishes.
    pub fn run_out(&mut self) {
        let secs = self.timer.remaining_ms().div_ceil(1000);
        self.advance(secs);
    }

    pub fn shown(&self) -> Vec<Snapshot> {
        self.display.shown.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<(String, String)> {
        self.notifier.notes.lock().unwrap().clone()
    }

    pub fn sounds(&self) -> u32 {
        *self.notifier.sounds.lock().unwrap()
    }

    pub fn saved(&self) -> Vec<u32> {
        self.store.saved.lock().unwrap().clone()
    }
}
