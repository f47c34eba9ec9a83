//! Task Scope
//!
//! A [`TaskScope`] groups the tasks of one shared renderer. Every task runs
//! until it finishes or the scope is cancelled. The first task to fail
//! records its error and cancels the rest, and [`TaskScope::wait`] returns
//! that error once every task has ended.
//!
//! Finished tasks are reaped whenever the scope is touched, so a scope that
//! outlives many short tasks only holds the ones still running.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::RenderError;

#[derive(Default)]
struct ScopeInner {
    token: CancellationToken,
    tasks: Mutex<JoinSet<()>>,
    first_error: Mutex<Option<RenderError>>,
}

impl ScopeInner {
    fn fail(&self, err: RenderError) {
        {
            let mut first = self.first_error.lock();
            if first.is_none() {
                *first = Some(err);
            }
        }
        self.token.cancel();
    }

    fn collect(&self, result: Result<(), JoinError>) {
        if let Err(err) = result {
            if err.is_panic() {
                error!(error = %err, "task panicked, cancelling scope");
                self.fail(RenderError::TaskFailed(err.to_string()));
            }
        }
    }

    fn reap(&self, tasks: &mut JoinSet<()>) {
        while let Some(result) = tasks.try_join_next() {
            self.collect(result);
        }
    }
}

#[derive(Clone, Default)]
pub struct TaskScope {
    inner: Arc<ScopeInner>,
}

impl TaskScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` into the scope. It is dropped when the scope is
    /// cancelled; an error cancels the scope.
    pub fn spawn<F>(&self, name: impl Into<String>, task: F)
    where
        F: Future<Output = Result<(), RenderError>> + Send + 'static,
    {
        let name = name.into();
        let inner = Arc::clone(&self.inner);
        let mut tasks = self.inner.tasks.lock();
        self.inner.reap(&mut tasks);
        tasks.spawn(async move {
            let result = tokio::select! {
                _ = inner.token.cancelled() => {
                    debug!(task = %name, "task cancelled with its scope");
                    Ok(())
                }
                result = task => result,
            };
            if let Err(err) = result {
                error!(task = %name, error = %err, "task failed, cancelling scope");
                inner.fail(err);
            }
        });
    }

    /// Record `err` as the scope's outcome (unless one is already recorded)
    /// and cancel every task.
    pub fn fail(&self, err: RenderError) {
        self.inner.fail(err);
    }

    pub fn cancel(&self) {
        self.inner.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// A token cancelled together with the scope.
    pub fn token(&self) -> CancellationToken {
        self.inner.token.child_token()
    }

    /// Number of tasks still running.
    pub fn task_count(&self) -> usize {
        let mut tasks = self.inner.tasks.lock();
        self.inner.reap(&mut tasks);
        tasks.len()
    }

    /// Wait for every task, including ones spawned while waiting, and
    /// return the first recorded failure.
    pub async fn wait(&self) -> Result<(), RenderError> {
        loop {
            let mut tasks = std::mem::take(&mut *self.inner.tasks.lock());
            if tasks.is_empty() {
                break;
            }
            while let Some(result) = tasks.join_next().await {
                self.inner.collect(result);
            }
        }
        match self.inner.first_error.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
