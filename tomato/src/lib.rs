//! Pomodoro interval timer with a terminal front end.
//!
//! [`timer::IntervalTimer`] holds the countdown; [`runtime`] gives it a
//! tokio task to live on. Everything else is plumbing around it: the
//! notifier, the count store, the terminal UI and the control socket.

pub mod app;
pub mod config;
pub mod ipc;
pub mod notify;
pub mod persistence;
pub mod runtime;
pub mod timer;
pub mod ui;

#[cfg(test)]
mod testing;
