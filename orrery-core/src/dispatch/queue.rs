//! TaskDispatchQueue: the only way for other threads to touch the engine.
//!
//! Owns the command channel and the engine thread's join handle. Producers
//! clone a [`TaskSubmitter`]; the engine itself lives on the engine thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use orrery_types::DispatchError;

use super::commands::{EngineCmd, Task};
use super::engine_thread::EngineThread;
use super::stats::{QueueStats, QueueStatsSnapshot};
use crate::engine::Engine;

/// Cloneable producer handle. `submit` never blocks.
pub struct TaskSubmitter<E> {
    tx: Sender<EngineCmd<E>>,
    closed: Arc<AtomicBool>,
}

impl<E> Clone for TaskSubmitter<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            closed: Arc::clone(&self.closed),
        }
    }
}

impl<E: Engine> TaskSubmitter<E> {
    pub fn try_submit(&self, task: impl FnOnce(&mut E) + Send + 'static) -> Result<(), DispatchError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DispatchError::Closed);
        }
        let task: Task<E> = Box::new(task);
        self.tx
            .send(EngineCmd::Run(task))
            .map_err(|_| DispatchError::Closed)
    }

    /// Fire-and-forget: enqueue `task`, logging if the queue is closed.
    pub fn submit(&self, task: impl FnOnce(&mut E) + Send + 'static) {
        if let Err(e) = self.try_submit(task) {
            log::warn!(target: "engine", "task dropped: {}", e);
        }
    }

    /// Enqueue `f` and get its result on a single-shot channel. The
    /// receiver disconnects without a value if the task panics or is
    /// dropped at shutdown.
    pub fn submit_with_reply<R: Send + 'static>(
        &self,
        f: impl FnOnce(&mut E) -> R + Send + 'static,
    ) -> Result<Receiver<R>, DispatchError> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.try_submit(move |engine| {
            let _ = reply_tx.send(f(engine));
        })?;
        Ok(reply_rx)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

pub struct TaskDispatchQueue<E: Engine> {
    submitter: TaskSubmitter<E>,
    stats: Arc<QueueStats>,
    join_handle: Option<JoinHandle<E>>,
}

impl<E: Engine> TaskDispatchQueue<E> {
    /// Move `engine` onto a new engine thread. `tick_interval` paces
    /// `Engine::tick`; zero disables ticking.
    pub fn spawn(engine: E, tick_interval: Duration) -> std::io::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let closed = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(QueueStats::default());

        let thread_closed = Arc::clone(&closed);
        let thread_stats = Arc::clone(&stats);
        let join_handle = thread::Builder::new()
            .name("engine".into())
            .spawn(move || {
                EngineThread::new(engine, rx, thread_closed, thread_stats, tick_interval).run()
            })?;

        Ok(Self {
            submitter: TaskSubmitter { tx, closed },
            stats,
            join_handle: Some(join_handle),
        })
    }

    pub fn submitter(&self) -> TaskSubmitter<E> {
        self.submitter.clone()
    }

    pub fn submit(&self, task: impl FnOnce(&mut E) + Send + 'static) {
        self.submitter.submit(task);
    }

    pub fn try_submit(&self, task: impl FnOnce(&mut E) + Send + 'static) -> Result<(), DispatchError> {
        self.submitter.try_submit(task)
    }

    pub fn submit_with_reply<R: Send + 'static>(
        &self,
        f: impl FnOnce(&mut E) -> R + Send + 'static,
    ) -> Result<Receiver<R>, DispatchError> {
        self.submitter.submit_with_reply(f)
    }

    pub fn stats(&self) -> QueueStatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop accepting tasks, let the in-flight task finish, drop the rest
    /// and join the engine thread. Returns the engine the first time.
    pub fn shutdown(&mut self) -> Option<E> {
        self.submitter.closed.store(true, Ordering::Release);
        let handle = self.join_handle.take()?;
        let _ = self.submitter.tx.send(EngineCmd::Shutdown);
        match handle.join() {
            Ok(engine) => Some(engine),
            Err(_) => {
                log::error!(target: "engine", "engine thread panicked outside a task");
                None
            }
        }
    }
}

impl<E: Engine> Drop for TaskDispatchQueue<E> {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
