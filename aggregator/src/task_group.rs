//! Structured fan-out for upstream sub-calls.
//!
//! A [`TaskGroup`] spawns every sub-call of one operation onto a tokio
//! `JoinSet`, then joins them under a single deadline:
//!
//! - A **fatal** task that fails ends the join immediately with its error and
//!   aborts every sibling still running.
//! - A **degradable** task that fails is collected into
//!   [`Settled::degraded`] and the join carries on.
//! - When the deadline fires, everything still running is aborted. Pending
//!   degradable tasks become `DeadlineExceeded` entries in `degraded`; a
//!   pending fatal task fails the whole join with `DeadlineExceeded`.
//!
//! Results come back tagged with the key they were spawned under, so callers
//! place them by key rather than by completion order.

use crate::errors::GatewayError;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};
use tokio::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Criticality {
    /// Failure aborts the group.
    Fatal,
    /// Failure is recorded and the group continues.
    Degradable,
}

/// Outcome of a join in which no fatal task failed.
#[derive(Debug)]
pub struct Settled<K, T> {
    /// Successful results in completion order.
    pub completed: Vec<(K, T)>,
    /// Degradable tasks that failed, panicked or missed the deadline.
    pub degraded: Vec<(K, GatewayError)>,
}

impl<K, T> Default for Settled<K, T> {
    fn default() -> Self {
        Self {
            completed: Vec::new(),
            degraded: Vec::new(),
        }
    }
}

pub struct TaskGroup<K, T> {
    join_set: JoinSet<(K, Result<T, GatewayError>)>,
    /// Tasks not yet joined, with the key and criticality they were spawned with
    pending: HashMap<Id, (K, Criticality)>,
    deadline: Instant,
    limiter: Option<Arc<Semaphore>>,
}

impl<K, T> TaskGroup<K, T>
where
    K: Clone + Debug + Send + 'static,
    T: Send + 'static,
{
    pub fn new(deadline: Instant) -> Self {
        Self {
            join_set: JoinSet::new(),
            pending: HashMap::new(),
            deadline,
            limiter: None,
        }
    }

    /// Caps how many tasks of this group run at once. `None` leaves it unbounded.
    pub fn with_concurrency_limit(mut self, limit: Option<usize>) -> Self {
        self.limiter = limit.map(|permits| Arc::new(Semaphore::new(permits)));
        self
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn spawn<F>(&mut self, key: K, criticality: Criticality, task: F)
    where
        F: Future<Output = Result<T, GatewayError>> + Send + 'static,
    {
        let limiter = self.limiter.clone();
        let task_key = key.clone();

        let abort_handle = self.join_set.spawn(async move {
            // Held for the lifetime of the task when the group is bounded
            let _permit = match limiter {
                Some(semaphore) => match semaphore.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        return (
                            task_key,
                            Err(GatewayError::InternalError("task limiter closed".into())),
                        );
                    }
                },
                None => None,
            };
            (task_key, task.await)
        });

        self.pending.insert(abort_handle.id(), (key, criticality));
    }

    /// Waits for every task or the deadline, whichever comes first.
    pub async fn join(self) -> Result<Settled<K, T>, GatewayError> {
        let TaskGroup {
            mut join_set,
            mut pending,
            deadline,
            limiter: _,
        } = self;
        let mut settled = Settled::default();

        let timeout = tokio::time::sleep_until(deadline);
        tokio::pin!(timeout);

        while !join_set.is_empty() {
            tokio::select! {
                Some(join_result) = join_set.join_next_with_id() => {
                    let (key, criticality, result) = match take_result(join_result, &mut pending) {
                        Some(joined) => joined,
                        None => continue,
                    };

                    match (result, criticality) {
                        (Ok(value), _) => settled.completed.push((key, value)),
                        (Err(e), Criticality::Degradable) => settled.degraded.push((key, e)),
                        (Err(e), Criticality::Fatal) => {
                            tracing::debug!(
                                task = ?key,
                                remaining = join_set.len(),
                                "Fatal task failed, aborting remaining tasks"
                            );
                            join_set.abort_all();
                            return Err(e);
                        }
                    }
                }
                _ = &mut timeout => {
                    tracing::debug!(
                        remaining = join_set.len(),
                        "Deadline reached, aborting remaining tasks"
                    );
                    join_set.abort_all();

                    let mut fatal = None;
                    for (_, (key, criticality)) in pending.drain() {
                        let error = GatewayError::DeadlineExceeded(format!("{key:?}"));
                        match criticality {
                            Criticality::Degradable => settled.degraded.push((key, error)),
                            Criticality::Fatal => fatal = fatal.or(Some(error)),
                        }
                    }
                    return match fatal {
                        Some(error) => Err(error),
                        None => Ok(settled),
                    };
                }
            }
        }

        Ok(settled)
    }
}

/// Matches a joined task back to its key, turning a panic into a `TaskFailed` error.
fn take_result<K, T>(
    join_result: Result<(Id, (K, Result<T, GatewayError>)), JoinError>,
    pending: &mut HashMap<Id, (K, Criticality)>,
) -> Option<(K, Criticality, Result<T, GatewayError>)> {
    match join_result {
        Ok((id, (key, result))) => {
            let criticality = pending
                .remove(&id)
                .map(|(_, criticality)| criticality)
                .unwrap_or(Criticality::Fatal);
            Some((key, criticality, result))
        }
        Err(e) => {
            tracing::error!("Task panicked: {e}");
            let (key, criticality) = pending.remove(&e.id())?;
            Some((key, criticality, Err(GatewayError::TaskFailed(e.to_string()))))
        }
    }
}
