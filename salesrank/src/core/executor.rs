use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::StageError;

/// Runs the tasks of one stage step on blocking threads, at most `parallelism`
/// at a time.
#[derive(Clone, Debug)]
pub struct Executor {
    semaphore: Arc<Semaphore>,
}

impl Executor {
    pub fn new(parallelism: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(parallelism.max(1))),
        }
    }

    /// Runs `task(i, inputs[i])` for every input and returns the outputs in
    /// input order.
    ///
    /// The first failing task flips a shared cancellation flag; tasks that
    /// haven't started yet bail out with [`StageError::Cancelled`]. The error
    /// returned is the one that caused the cancellation.
    pub async fn run_tasks<I, O, F>(&self, inputs: Vec<I>, task: F) -> Result<Vec<O>, StageError>
    where
        I: Send + 'static,
        O: Send + 'static,
        F: Fn(usize, I) -> Result<O, StageError> + Send + Sync + 'static,
    {
        let task = Arc::new(task);
        let cancelled = Arc::new(AtomicBool::new(false));

        let handles: Vec<_> = inputs
            .into_iter()
            .enumerate()
            .map(|(task_id, input)| {
                let semaphore = self.semaphore.clone();
                let task = task.clone();
                let cancelled = cancelled.clone();
                tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| StageError::Cancelled)?;
                    if cancelled.load(Ordering::Acquire) {
                        return Err(StageError::Cancelled);
                    }

                    debug!(task_id, "task started");
                    let flag = cancelled.clone();
                    let result = tokio::task::spawn_blocking(move || {
                        if flag.load(Ordering::Acquire) {
                            return Err(StageError::Cancelled);
                        }
                        task(task_id, input)
                    })
                    .await
                    .unwrap_or_else(|e| Err(StageError::WorkerCrashed(format!("task {task_id}: {e}"))));

                    match &result {
                        Ok(_) => debug!(task_id, "task finished"),
                        Err(StageError::Cancelled) => debug!(task_id, "task cancelled"),
                        Err(e) => {
                            warn!(task_id, error = %e, "task failed, cancelling the rest");
                            cancelled.store(true, Ordering::Release);
                        }
                    }
                    result
                })
            })
            .collect();

        let mut outputs = Vec::with_capacity(handles.len());
        let mut failure: Option<StageError> = None;
        for joined in join_all(handles).await {
            let result = joined.unwrap_or_else(|e| Err(StageError::WorkerCrashed(e.to_string())));
            match result {
                Ok(output) => outputs.push(output),
                // keep the root cause rather than a follow-up cancellation
                Err(e) => match failure {
                    None => failure = Some(e),
                    Some(StageError::Cancelled) if !matches!(e, StageError::Cancelled) => {
                        failure = Some(e)
                    }
                    Some(_) => {}
                },
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(outputs),
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}
