use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver};

use super::commands::EngineCmd;
use super::stats::QueueStats;
use crate::engine::Engine;

enum Wake<E> {
    Cmd(Option<EngineCmd<E>>),
    TickDue,
}

/// The consumer side: owns the engine and runs tasks one at a time,
/// interleaved with engine ticks.
pub(crate) struct EngineThread<E: Engine> {
    engine: E,
    rx: Receiver<EngineCmd<E>>,
    closed: Arc<AtomicBool>,
    stats: Arc<QueueStats>,
    /// Zero disables ticking.
    tick_interval: Duration,
    last_tick: Instant,
}

impl<E: Engine> EngineThread<E> {
    pub(crate) fn new(
        engine: E,
        rx: Receiver<EngineCmd<E>>,
        closed: Arc<AtomicBool>,
        stats: Arc<QueueStats>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            engine,
            rx,
            closed,
            stats,
            tick_interval,
            last_tick: Instant::now(),
        }
    }

    /// Runs until shutdown, then hands the engine back.
    pub(crate) fn run(mut self) -> E {
        log::debug!(target: "engine", "engine thread started");

        loop {
            if self.closed.load(Ordering::Acquire) {
                break;
            }

            let msg = if self.tick_interval.is_zero() {
                self.rx.recv().ok()
            } else {
                let remaining = self.tick_interval.saturating_sub(self.last_tick.elapsed());
                let wake = select! {
                    recv(self.rx) -> msg => Wake::Cmd(msg.ok()),
                    default(remaining) => Wake::TickDue,
                };
                match wake {
                    Wake::Cmd(msg) => msg,
                    Wake::TickDue => {
                        self.tick();
                        continue;
                    }
                }
            };

            match msg {
                Some(EngineCmd::Run(task)) => {
                    if self.closed.load(Ordering::Acquire) {
                        self.stats.record_dropped(1);
                        break;
                    }
                    self.run_task(task);
                }
                Some(EngineCmd::Shutdown) | None => break,
            }

            if !self.tick_interval.is_zero() && self.last_tick.elapsed() >= self.tick_interval {
                self.tick();
            }
        }

        let pending = self
            .rx
            .try_iter()
            .filter(|cmd| matches!(cmd, EngineCmd::Run(_)))
            .count();
        if pending > 0 {
            self.stats.record_dropped(pending as u64);
        }
        let dropped = self.stats.snapshot().dropped;
        if dropped > 0 {
            log::warn!(target: "engine", "engine thread stopped, {} pending task(s) dropped", dropped);
        } else {
            log::debug!(target: "engine", "engine thread stopped");
        }
        self.engine
    }

    fn run_task(&mut self, task: super::Task<E>) {
        let engine = &mut self.engine;
        match panic::catch_unwind(AssertUnwindSafe(move || task(engine))) {
            Ok(()) => self.stats.record_executed(),
            Err(payload) => {
                self.stats.record_panicked();
                log::error!(target: "engine", "task panicked: {}", panic_message(payload.as_ref()));
            }
        }
    }

    fn tick(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick);
        self.last_tick = now;
        let engine = &mut self.engine;
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || engine.tick(elapsed))) {
            log::error!(target: "engine", "engine tick panicked: {}", panic_message(payload.as_ref()));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
