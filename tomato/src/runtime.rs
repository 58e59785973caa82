//! Single-owner task around [`IntervalTimer`].
//!
//! Key presses, IPC requests and scheduler ticks all arrive on one queue,
//! so the timer has exactly one mutator and needs no lock. Snapshots go
//! out on a `watch` channel for whoever renders them.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tomato_ipc::{Command, Mode, Response};
use tracing::{debug, info};

use crate::config::Durations;
use crate::timer::{
    Collaborators, Control, CountStore, IntervalTimer, Notifier, Scheduler, Snapshot, TickHandle,
};

enum Input {
    Command {
        command: Command,
        reply: oneshot::Sender<Response>,
    },
    Tick(u64),
}

/// Ticks once per second on the tokio clock by feeding the timer's queue.
///
/// Holds only a weak sender, so a running schedule never keeps the timer
/// task alive after every [`TimerHandle`] is gone.
pub struct TokioScheduler {
    tx: mpsc::WeakUnboundedSender<Input>,
}

impl Scheduler for TokioScheduler {
    fn every_second(&mut self, generation: u64) -> TickHandle {
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            let period = Duration::from_secs(1);
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(tx) = tx.upgrade() else { break };
                if tx.send(Input::Tick(generation)).is_err() {
                    break;
                }
            }
        });
        TickHandle::new(move || task.abort())
    }
}

/// Cloneable front door to the timer task.
#[derive(Clone)]
pub struct TimerHandle {
    tx: mpsc::UnboundedSender<Input>,
    snapshots: watch::Receiver<Snapshot>,
}

impl TimerHandle {
    /// Run `command` on the timer task and wait for its answer.
    pub async fn send(&self, command: Command) -> Response {
        let (reply, answer) = oneshot::channel();
        if self.tx.send(Input::Command { command, reply }).is_err() {
            return Response::Error("timer is not running".to_string());
        }
        answer
            .await
            .unwrap_or_else(|_| Response::Error("timer stopped before answering".to_string()))
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    pub fn latest(&self) -> Snapshot {
        *self.snapshots.borrow()
    }

    /// Resolves once the timer task has exited.
    pub async fn stopped(&self) {
        self.tx.closed().await
    }
}

/// Build the timer and spawn the task that owns it. Must be called from
/// within a tokio runtime.
pub fn spawn(
    durations: Durations,
    auto_start_next: bool,
    notifier: Box<dyn Notifier>,
    store: Box<dyn CountStore>,
) -> TimerHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let (snap_tx, snap_rx) = watch::channel(Snapshot {
        mode: Mode::Work,
        remaining_ms: durations.millis_of(Mode::Work),
        duration_ms: durations.millis_of(Mode::Work),
        running: false,
        completed_work_count: 0,
        control: Control::Start,
    });

    let timer = IntervalTimer::new(
        durations,
        auto_start_next,
        Collaborators {
            scheduler: Box::new(TokioScheduler { tx: tx.downgrade() }),
            notifier,
            store,
            display: Box::new(snap_tx),
        },
    );
    tokio::spawn(run(timer, rx));

    TimerHandle {
        tx,
        snapshots: snap_rx,
    }
}

async fn run(mut timer: IntervalTimer, mut rx: mpsc::UnboundedReceiver<Input>) {
    info!(
        "Timer task started ({} completed work intervals)",
        timer.completed_work_count()
    );
    while let Some(input) = rx.recv().await {
        match input {
            Input::Tick(generation) => timer.tick(generation),
            Input::Command { command, reply } => {
                debug!("Command: {:?}", command);
                let shutdown = command == Command::Shutdown;
                let response = apply(&mut timer, command);
                let _ = reply.send(response);
                if shutdown {
                    break;
                }
            }
        }
    }
    info!("Timer task stopped");
}

fn apply(timer: &mut IntervalTimer, command: Command) -> Response {
    match command {
        Command::Start => timer.start(),
        Command::Pause => timer.pause(),
        Command::Toggle => timer.toggle(),
        Command::Reset => timer.reset(),
        Command::ResetCount => timer.reset_count(),
        Command::Status => return Response::Status(timer.snapshot().status()),
        Command::Shutdown => {}
    }
    Response::Ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryStore, RecordingNotifier};
    use tokio::time::sleep;

    fn short_durations() -> Durations {
        Durations::new(
            Duration::from_secs(3),
            Duration::from_secs(2),
            Duration::from_secs(4),
            2,
        )
        .unwrap()
    }

    fn spawn_with(store: MemoryStore, notifier: RecordingNotifier, auto: bool) -> TimerHandle {
        spawn(short_durations(), auto, Box::new(notifier), Box::new(store))
    }

    async fn status(handle: &TimerHandle) -> tomato_ipc::TimerStatus {
        match handle.send(Command::Status).await {
            Response::Status(status) => status,
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn work_interval_finishes_on_the_clock() {
        let store = MemoryStore::default();
        let notifier = RecordingNotifier::default();
        let handle = spawn_with(store.clone(), notifier.clone(), false);
        let mut snapshots = handle.subscribe();

        assert_eq!(handle.send(Command::Start).await, Response::Ok);
        sleep(Duration::from_millis(3500)).await;

        let status = status(&handle).await;
        assert_eq!(status.mode, Mode::ShortBreak);
        assert_eq!(status.remaining_ms, 2000);
        assert_eq!(status.completed_work_count, 1);
        assert!(!status.running);
        assert_eq!(*notifier.sounds.lock().unwrap(), 1);
        assert_eq!(*store.saved.lock().unwrap(), vec![1]);

        let latest = *snapshots.borrow_and_update();
        assert_eq!(latest.mode, Mode::ShortBreak);
        assert_eq!(latest.control, Control::Start);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_the_countdown() {
        let handle = spawn_with(MemoryStore::default(), RecordingNotifier::default(), false);
        handle.send(Command::Start).await;
        sleep(Duration::from_millis(1500)).await;
        handle.send(Command::Pause).await;
        let paused = status(&handle).await;
        assert_eq!(paused.remaining_ms, 2000);

        sleep(Duration::from_secs(10)).await;
        assert_eq!(status(&handle).await, paused);

        handle.send(Command::Toggle).await;
        sleep(Duration::from_millis(1100)).await;
        assert_eq!(status(&handle).await.remaining_ms, 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_start_keeps_cycling() {
        let handle = spawn_with(MemoryStore::default(), RecordingNotifier::default(), true);
        handle.send(Command::Start).await;
        // Work (3s) then short break (2s), then work again.
        sleep(Duration::from_millis(5500)).await;
        let status = status(&handle).await;
        assert_eq!(status.mode, Mode::Work);
        assert!(status.running);
        assert_eq!(status.completed_work_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn second_work_interval_earns_long_break() {
        let handle = spawn_with(MemoryStore::default(), RecordingNotifier::default(), true);
        handle.send(Command::Start).await;
        // Work, short break, work.
        sleep(Duration::from_millis(8500)).await;
        let status = status(&handle).await;
        assert_eq!(status.mode, Mode::LongBreak);
        assert_eq!(status.completed_work_count, 2);
    }

    #[tokio::test]
    async fn reset_count_goes_through_the_store() {
        let store = MemoryStore {
            initial: 9,
            ..MemoryStore::default()
        };
        let handle = spawn_with(store.clone(), RecordingNotifier::default(), false);
        assert_eq!(handle.latest().completed_work_count, 9);

        handle.send(Command::ResetCount).await;
        assert_eq!(status(&handle).await.completed_work_count, 0);
        assert_eq!(*store.saved.lock().unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn shutdown_stops_the_task() {
        let handle = spawn_with(MemoryStore::default(), RecordingNotifier::default(), false);
        handle.send(Command::Start).await;
        assert_eq!(handle.send(Command::Shutdown).await, Response::Ok);
        handle.stopped().await;
        assert!(matches!(
            handle.send(Command::Status).await,
            Response::Error(_)
        ));
    }
}
