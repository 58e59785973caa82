use anyhow::{Context, Result};
use directories::ProjectDirs;
use ratatui::style::Color;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tomato_ipc::Mode;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub timer: TimerConfig,
    pub notifications: NotificationConfig,
    pub theme: Theme,
    pub icons: Icons,
}

/// Interval lengths and the long-break cadence.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TimerConfig {
    pub work_minutes: u64,
    pub short_break_minutes: u64,
    pub long_break_minutes: u64,
    pub intervals_before_long_break: u32,
    /// Start the next interval as soon as one finishes instead of waiting
    /// for the user.
    pub auto_start_next: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct NotificationConfig {
    pub desktop: bool,
    pub sound: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Theme {
    #[serde(deserialize_with = "hex_to_color")]
    pub background: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub foreground: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub black: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub work: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub short_break: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub long_break: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub accent: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub gray: Color,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Icons {
    pub timer: String,
    pub counter: String,
    pub play: String,
    pub pause: String,
    pub stop: String,
    pub separator: String,
    pub header_left: String,
    pub header_right: String,
}

/// Rejected configuration values. Durations are fixed for the lifetime of
/// the timer, so they are checked once here rather than at runtime.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} duration must be at least one second")]
    ZeroDuration(&'static str),
    #[error("{0} duration must be at most 24 hours")]
    DurationTooLong(&'static str),
    #[error("intervals_before_long_break must be at least 1")]
    ZeroLongBreakInterval,
}

/// Longest accepted interval.
pub const MAX_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Validated interval lengths handed to the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Durations {
    pub work: Duration,
    pub short_break: Duration,
    pub long_break: Duration,
    pub intervals_before_long_break: u32,
}

impl Durations {
    pub fn new(
        work: Duration,
        short_break: Duration,
        long_break: Duration,
        intervals_before_long_break: u32,
    ) -> Result<Self, ConfigError> {
        check_duration("work", work)?;
        check_duration("short break", short_break)?;
        check_duration("long break", long_break)?;
        if intervals_before_long_break == 0 {
            return Err(ConfigError::ZeroLongBreakInterval);
        }
        Ok(Self {
            work,
            short_break,
            long_break,
            intervals_before_long_break,
        })
    }

    pub fn of(&self, mode: Mode) -> Duration {
        match mode {
            Mode::Work => self.work,
            Mode::ShortBreak => self.short_break,
            Mode::LongBreak => self.long_break,
        }
    }

    pub fn millis_of(&self, mode: Mode) -> u64 {
        self.of(mode).as_millis() as u64
    }
}

fn check_duration(name: &'static str, duration: Duration) -> Result<(), ConfigError> {
    // The countdown ticks in whole seconds.
    if duration.as_secs() == 0 {
        return Err(ConfigError::ZeroDuration(name));
    }
    if duration > MAX_DURATION {
        return Err(ConfigError::DurationTooLong(name));
    }
    Ok(())
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            work: Duration::from_secs(25 * 60),
            short_break: Duration::from_secs(5 * 60),
            long_break: Duration::from_secs(15 * 60),
            intervals_before_long_break: 4,
        }
    }
}

impl TimerConfig {
    pub fn durations(&self) -> Result<Durations, ConfigError> {
        let minutes = |m: u64| Duration::from_secs(m.saturating_mul(60));
        Durations::new(
            minutes(self.work_minutes),
            minutes(self.short_break_minutes),
            minutes(self.long_break_minutes),
            self.intervals_before_long_break,
        )
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            intervals_before_long_break: 4,
            auto_start_next: false,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            desktop: true,
            sound: true,
        }
    }
}

impl Theme {
    pub fn mode_color(&self, mode: Mode) -> Color {
        match mode {
            Mode::Work => self.work,
            Mode::ShortBreak => self.short_break,
            Mode::LongBreak => self.long_break,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::Rgb(9, 14, 19),
            foreground: Color::Rgb(197, 201, 199),
            black: Color::Rgb(13, 12, 12),
            work: Color::Rgb(228, 104, 118),
            short_break: Color::Rgb(138, 154, 123),
            long_break: Color::Rgb(127, 180, 202),
            accent: Color::Rgb(230, 195, 132),
            gray: Color::Rgb(164, 167, 164),
        }
    }
}

impl Default for Icons {
    fn default() -> Self {
        Self {
            timer: "◷".to_string(),
            counter: "●".to_string(),
            play: "▶".to_string(),
            pause: "⏸".to_string(),
            stop: "■".to_string(),
            separator: "│".to_string(),
            header_left: "⟪ ".to_string(),
            header_right: " ⟫".to_string(),
        }
    }
}

fn hex_to_color<'de, D>(deserializer: D) -> Result<Color, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = serde::Deserialize::deserialize(deserializer)?;
    if !s.starts_with('#') || s.len() != 7 {
        return Err(serde::de::Error::custom("invalid hex color format"));
    }
    let r = u8::from_str_radix(&s[1..3], 16).map_err(serde::de::Error::custom)?;
    let g = u8::from_str_radix(&s[3..5], 16).map_err(serde::de::Error::custom)?;
    let b = u8::from_str_radix(&s[5..7], 16).map_err(serde::de::Error::custom)?;
    Ok(Color::Rgb(r, g, b))
}

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "tomato", "tomato")
}

pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("tomato.toml"))
}

/// Load the config from `path`, or from the platform config directory when
/// no path is given. A missing default file yields the defaults; a missing
/// explicit file is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => parse_file(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => parse_file(&path)?,
            _ => Config::default(),
        },
    };
    config
        .timer
        .durations()
        .context("Invalid [timer] configuration")?;
    Ok(config)
}

fn parse_file(path: &Path) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {:?}", path))?;
    toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse config file at {:?}", path))
}
