use crate::config::Config;
use crate::timer::Snapshot;
use chrono::{DateTime, Local, TimeDelta};
use crossterm::event::KeyCode;
use ratatui::layout::Rect;
use std::time::Instant;
use tachyonfx::{fx, Duration as FxDuration, EffectManager, Motion};
use tomato_ipc::Command;

/// What a key press asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Send(Command),
    Quit,
}

pub fn key_action(code: KeyCode) -> Option<KeyAction> {
    let command = match code {
        KeyCode::Char(' ') | KeyCode::Enter => Command::Toggle,
        KeyCode::Char('s') => Command::Start,
        KeyCode::Char('p') => Command::Pause,
        KeyCode::Char('r') => Command::Reset,
        KeyCode::Char('c') => Command::ResetCount,
        KeyCode::Char('q') | KeyCode::Esc => return Some(KeyAction::Quit),
        _ => return None,
    };
    Some(KeyAction::Send(command))
}

/// Terminal-side view state. The timer itself lives on the runtime task;
/// this only mirrors its latest snapshot.
pub struct App {
    pub snapshot: Snapshot,
    pub config: Config,
    pub effect_manager: EffectManager<u32>,
    pending_mode_effect: bool,
    last_frame: Instant,
}

impl App {
    pub fn new(config: Config, snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            config,
            effect_manager: EffectManager::default(),
            pending_mode_effect: true,
            last_frame: Instant::now(),
        }
    }

    /// Take a new snapshot; a mode change queues the transition effect.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        if snapshot.mode != self.snapshot.mode {
            self.pending_mode_effect = true;
        }
        self.snapshot = snapshot;
    }

    /// Wall-clock time the running interval ends at. `None` while paused or
    /// when the end lies outside chrono's range.
    pub fn ends_at(&self) -> Option<DateTime<Local>> {
        if !self.snapshot.running {
            return None;
        }
        let millis = i64::try_from(self.snapshot.remaining_ms).ok()?;
        let remaining = TimeDelta::try_milliseconds(millis)?;
        Local::now().checked_add_signed(remaining)
    }

    pub fn take_mode_effect(&mut self) -> bool {
        std::mem::take(&mut self.pending_mode_effect)
    }

    pub fn trigger_mode_change_effect(&mut self, area: Rect) {
        let color = self.config.theme.mode_color(self.snapshot.mode);
        let effect = fx::slide_in(Motion::LeftToRight, 8, 4, color, 300).with_area(area);
        self.effect_manager.add_effect(effect);
    }

    /// Time since the previous frame, for advancing effects.
    pub fn frame_delta(&mut self) -> FxDuration {
        let elapsed = self.last_frame.elapsed();
        self.last_frame = Instant::now();
        FxDuration::from_millis(elapsed.as_millis().min(u32::MAX as u128) as u32)
    }

    pub fn counter_text(&self) -> String {
        format!("Completed: {}", self.snapshot.completed_work_count)
    }
}
