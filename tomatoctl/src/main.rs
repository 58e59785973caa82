use anyhow::Result;
use chrono::{DateTime, Local, TimeDelta};
use clap::{Parser, Subcommand};
use tomato_ipc::{request, Command, Response, TimerStatus, SOCKET_PATH};

#[derive(Parser)]
#[command(name = "tomatoctl")]
#[command(about = "Control a running tomato timer", long_about = None)]
struct Cli {
    /// Control socket path
    #[arg(long, default_value = SOCKET_PATH)]
    socket: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start (or resume) the current interval
    Start,
    /// Pause the current interval
    Pause,
    /// Start if paused, pause if running
    Toggle,
    /// Restart the current interval from its full length
    Reset,
    /// Set the completed work counter back to zero
    ResetCount,
    /// Show mode, time left and completed intervals
    Status,
    /// Stop the tomato process
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Convert CLI command to IPC command
    let command = match cli.command {
        Commands::Start => Command::Start,
        Commands::Pause => Command::Pause,
        Commands::Toggle => Command::Toggle,
        Commands::Reset => Command::Reset,
        Commands::ResetCount => Command::ResetCount,
        Commands::Status => Command::Status,
        Commands::Quit => Command::Shutdown,
    };

    match request(&cli.socket, &command).await? {
        Response::Ok => println!("OK"),
        Response::Status(status) => println!("{}", status_line(&status)),
        Response::Error(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn status_line(status: &TimerStatus) -> String {
    let state = if status.running { "running" } else { "paused" };
    let mut line = format!(
        "{} {} {}, completed {}",
        status.mode,
        status.clock(),
        state,
        status.completed_work_count
    );
    if status.running {
        if let Some(ends) = ends_at(status.remaining_ms) {
            line.push_str(&format!(", ends {}", ends.format("%H:%M")));
        }
    }
    line
}

fn ends_at(remaining_ms: u64) -> Option<DateTime<Local>> {
    let remaining = TimeDelta::try_milliseconds(i64::try_from(remaining_ms).ok()?)?;
    Local::now().checked_add_signed(remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tomato_ipc::Mode;

    #[test]
    fn paused_status_line() {
        let status = TimerStatus {
            mode: Mode::Work,
            running: false,
            remaining_ms: 24 * 60_000 + 13_000,
            duration_ms: 25 * 60_000,
            completed_work_count: 3,
        };
        assert_eq!(status_line(&status), "Work 24:13 paused, completed 3");
    }

    #[test]
    fn running_status_line_has_end_time() {
        let status = TimerStatus {
            mode: Mode::LongBreak,
            running: true,
            remaining_ms: 60_000,
            duration_ms: 15 * 60_000,
            completed_work_count: 4,
        };
        let line = status_line(&status);
        assert!(line.starts_with("Long Break 01:00 running, completed 4, ends "));
    }

    #[test]
    fn out_of_range_end_time_is_left_out() {
        let status = TimerStatus {
            mode: Mode::Work,
            running: true,
            remaining_ms: u64::MAX,
            duration_ms: u64::MAX,
            completed_work_count: 0,
        };
        let line = status_line(&status);
        assert!(line.ends_with("running, completed 0"));
        assert!(!line.contains("ends"));
    }
}
