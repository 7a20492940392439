//! Single-writer dispatch.
//!
//! The document model is not thread-safe, so only one execution context may
//! ever touch it. [`channel`] splits that into two halves:
//!
//! - [`Dispatcher`]: a cloneable, `Send` handle. Network tasks enqueue a
//!   [`Command`] and await its result.
//! - [`Executor`]: owns the [`Host`] and drains the queue one job at a time,
//!   in arrival order. It is the only code with access to the host.
//!
//! The executor can run on a dedicated thread ([`Executor::spawn`]), block
//! the current thread ([`Executor::run`]), or be pumped from the host's own
//! event loop ([`Executor::pump`]) when the engine insists on a specific
//! thread.

use std::io;
use std::thread::{self, JoinHandle};

use tokio::sync::{mpsc, oneshot};

use crate::bridge::command::{Command, Outcome};
use crate::engine::Host;
use crate::error::{CommandResult, DispatchError};

/// Maximum number of queued, not yet executed jobs.
pub const QUEUE_CAPACITY: usize = 64;

/// Name of the thread started by [`Executor::spawn`].
pub const EXECUTOR_THREAD_NAME: &str = "cad-bridge-executor";

/// One queued command and where to send its result.
struct Job {
    command: Command,
    reply: oneshot::Sender<CommandResult<Outcome>>,
}

/// Creates a dispatcher/executor pair around `host`.
pub fn channel<H: Host>(host: H) -> (Dispatcher, Executor<H>) {
    let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
    (
        Dispatcher { tx },
        Executor {
            host,
            rx,
            executed: 0,
        },
    )
}

/// Handle for submitting commands to the executor.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<Job>,
}

impl Dispatcher {
    /// Queues `command` and waits for the executor to run it.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ExecutorClosed`] if the executor has stopped
    /// before or while the command was queued.
    pub async fn call(&self, command: Command) -> Result<CommandResult<Outcome>, DispatchError> {
        let (reply, result) = oneshot::channel();
        self.tx
            .send(Job { command, reply })
            .await
            .map_err(|_| DispatchError::ExecutorClosed)?;
        result.await.map_err(|_| DispatchError::ExecutorClosed)
    }

    /// Returns `true` once the executor has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The sole owner of the host; runs queued commands serially.
pub struct Executor<H> {
    host: H,
    rx: mpsc::Receiver<Job>,
    executed: u64,
}

impl<H: Host> Executor<H> {
    /// Runs jobs until every [`Dispatcher`] has been dropped, then returns
    /// the host.
    ///
    /// Blocks the current thread. Must not be called from async code.
    pub fn run(mut self) -> H {
        tracing::debug!("Command executor started");
        while let Some(job) = self.rx.blocking_recv() {
            self.execute(job);
        }
        tracing::debug!(executed = self.executed, "Command executor finished");
        self.host
    }

    /// Runs every job that is already queued and returns how many ran.
    ///
    /// Never blocks, so it can be called from a host idle or timer callback.
    pub fn pump(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            self.execute(job);
            ran += 1;
        }
        ran
    }

    /// Returns the number of jobs executed so far.
    #[must_use]
    pub const fn executed(&self) -> u64 {
        self.executed
    }

    /// Returns the host for inspection.
    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    fn execute(&mut self, job: Job) {
        let method = job.command.method();
        tracing::debug!(%method, "Executing command");

        let result = job.command.execute(&mut self.host);
        self.executed += 1;

        match &result {
            Ok(outcome) => tracing::debug!(%method, ?outcome, "Command succeeded"),
            Err(e) => tracing::info!(%method, error = %e, "Command failed"),
        }

        if job.reply.send(result).is_err() {
            tracing::debug!(%method, "Caller went away before the result was ready");
        }
    }
}

impl<H: Host + Send + 'static> Executor<H> {
    /// Runs the executor on a dedicated thread.
    ///
    /// The thread ends when every [`Dispatcher`] is dropped; joining it
    /// returns the host.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(self) -> io::Result<JoinHandle<H>> {
        thread::Builder::new()
            .name(EXECUTOR_THREAD_NAME.to_string())
            .spawn(move || self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Component, Design, MemoryHost};
    use crate::error::ErrorKind;
    use std::thread::ThreadId;
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn pump_runs_queued_jobs() {
        let (dispatcher, mut executor) = channel(MemoryHost::with_empty_design());

        let mut call = task::spawn(dispatcher.call(Command::Ping));
        assert_pending!(call.poll());

        assert_eq!(executor.pump(), 1);
        let result = assert_ready!(call.poll()).unwrap();
        assert_eq!(result.unwrap(), Outcome::Pong);
        assert_eq!(executor.executed(), 1);
        assert_eq!(executor.pump(), 0);
    }

    #[test]
    fn jobs_run_in_arrival_order() {
        let (dispatcher, mut executor) = channel(MemoryHost::with_empty_design());

        let mut extrude = task::spawn(dispatcher.call(Command::ExtrudeProfile {
            sketch_name: "Base".to_string(),
            distance: 1.0,
        }));
        assert_pending!(extrude.poll());
        let mut sketch = task::spawn(dispatcher.call(Command::CreateSketchCircle {
            plane: "xy".to_string(),
            coords: vec![0.0, 0.0, 0.0],
            radius: 1.0,
            name: Some("Base".to_string()),
        }));
        assert_pending!(sketch.poll());

        assert_eq!(executor.pump(), 2);

        // The extrude was queued first, so it ran before the sketch existed.
        let err = assert_ready!(extrude.poll()).unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(assert_ready!(sketch.poll()).unwrap().is_ok());
        assert_eq!(executor.host().design().unwrap().root().body_count(), 0);
    }

    #[test]
    fn closed_executor_is_reported() {
        let (dispatcher, executor) = channel(MemoryHost::with_empty_design());
        drop(executor);

        assert!(dispatcher.is_closed());
        let result = tokio_test::block_on(dispatcher.call(Command::Ping));
        assert_eq!(result.unwrap_err(), DispatchError::ExecutorClosed);
    }

    /// Records which thread touches the design.
    struct ThreadRecorder {
        design: crate::engine::MemoryDesign,
        seen: Vec<ThreadId>,
    }

    impl Host for ThreadRecorder {
        fn active_design(&mut self) -> Option<&mut dyn Design> {
            self.seen.push(thread::current().id());
            Some(&mut self.design)
        }
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_executor_thread() {
        let recorder = ThreadRecorder {
            design: crate::engine::MemoryDesign::new(),
            seen: Vec::new(),
        };
        let (dispatcher, executor) = channel(recorder);
        let handle = executor.spawn().unwrap();

        let calls: Vec<_> = (0..16)
            .map(|_| {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    dispatcher
                        .call(Command::CreateCylinder {
                            center: crate::engine::Point3::default(),
                            radius: 1.0,
                            height: 2.0,
                        })
                        .await
                })
            })
            .collect();
        for call in calls {
            assert!(call.await.unwrap().unwrap().is_ok());
        }
        drop(dispatcher);

        let recorder = tokio::task::spawn_blocking(move || handle.join().unwrap())
            .await
            .unwrap();
        assert_eq!(recorder.seen.len(), 16);
        assert!(recorder.seen.iter().all(|id| *id == recorder.seen[0]));
        assert_ne!(recorder.seen[0], thread::current().id());
        assert_eq!(recorder.design.root().body_count(), 16);
    }
}
