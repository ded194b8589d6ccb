//! Ordered background delivery of queued secondary writes.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use modernizr_core::storage::{RepositoryError, Result};

use super::{settle, MirrorContext};
use crate::storage::journal::ReplicationJournal;

enum Job {
    Mirror {
        context: MirrorContext,
        pending: BoxFuture<'static, Result<bool>>,
    },
    Flush(oneshot::Sender<()>),
}

enum State {
    Idle,
    Running {
        sender: mpsc::UnboundedSender<Job>,
        worker: JoinHandle<()>,
    },
    Closed,
}

/// Single-worker FIFO for [`WritePolicy::QueuedSecondary`] mirrors.
///
/// Mirrors run one at a time in the order they were queued, so a mirrored
/// update never overtakes the create it depends on. The worker starts on the
/// first queued mirror. [`flush`](Self::flush) waits for everything queued so
/// far; [`shutdown`](Self::shutdown) drains the queue and stops the worker.
///
/// [`WritePolicy::QueuedSecondary`]: modernizr_core::migration::WritePolicy::QueuedSecondary
pub struct MirrorQueue {
    journal: Arc<ReplicationJournal>,
    state: Mutex<State>,
}

impl MirrorQueue {
    pub fn new(journal: Arc<ReplicationJournal>) -> Self {
        Self {
            journal,
            state: Mutex::new(State::Idle),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a mirror behind every mirror queued before it.
    ///
    /// After shutdown the mirror is not run; it is journaled as failed.
    pub(crate) fn enqueue(
        &self,
        context: MirrorContext,
        pending: BoxFuture<'static, Result<bool>>,
    ) {
        let job = Job::Mirror { context, pending };
        let rejected = match self.sender() {
            Some(sender) => sender.send(job).err().map(|err| err.0),
            None => Some(job),
        };

        if let Some(Job::Mirror { context, .. }) = rejected {
            let closed = RepositoryError::QueryFailed("mirror queue is shut down".to_string());
            let _ = settle(&self.journal, context, Err(closed));
        }
    }

    /// Returns the worker's sender, starting the worker if needed.
    fn sender(&self) -> Option<mpsc::UnboundedSender<Job>> {
        let mut state = self.state();
        if matches!(*state, State::Idle) {
            let (sender, receiver) = mpsc::unbounded_channel();
            let worker = tokio::spawn(run(Arc::clone(&self.journal), receiver));
            *state = State::Running { sender, worker };
        }
        match &*state {
            State::Running { sender, .. } => Some(sender.clone()),
            State::Idle | State::Closed => None,
        }
    }

    fn running_sender(&self) -> Option<mpsc::UnboundedSender<Job>> {
        match &*self.state() {
            State::Running { sender, .. } => Some(sender.clone()),
            State::Idle | State::Closed => None,
        }
    }

    /// Waits until every mirror queued before this call has settled.
    pub async fn flush(&self) {
        let Some(sender) = self.running_sender() else {
            return;
        };
        let (done, wait) = oneshot::channel();
        if sender.send(Job::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Runs the remaining mirrors, then stops the worker.
    pub async fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.state(), State::Closed);
        let State::Running { sender, worker } = previous else {
            return;
        };
        drop(sender);
        if let Err(err) = worker.await {
            tracing::error!(error = %err, "Mirror worker stopped abnormally");
        }
    }
}

async fn run(journal: Arc<ReplicationJournal>, mut receiver: mpsc::UnboundedReceiver<Job>) {
    tracing::debug!("Mirror worker started");

    while let Some(job) = receiver.recv().await {
        match job {
            Job::Mirror { context, pending } => {
                let _ = settle(&journal, context, pending.await);
            }
            Job::Flush(done) => {
                // Receiver may have stopped waiting.
                let _ = done.send(());
            }
        }
    }

    tracing::debug!("Mirror worker stopped");
}
