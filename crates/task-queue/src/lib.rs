//! A queue of blocking [`Task`]s drained by a bounded pool of
//! [`spawn_blocking`](tokio::task::spawn_blocking) workers.
//!
//! Grounded on `pacquet-task-queue`'s `TaskQueue<Task>`/`Task` shape (a
//! command channel feeding a dedicated worker), generalized so that up to
//! `concurrency` tasks run at once instead of one at a time — post-install
//! hook scripts have no specified order or parallelism, so serializing them
//! behind a single worker would be an unnecessary restriction this rewrite
//! doesn't need to impose.

use std::fmt::Debug;
use tokio::{
    sync::{
        mpsc::{self, error::SendError as MpscSendError},
        oneshot, Semaphore,
    },
    task::{spawn, JoinHandle},
};

/// Task to be sent to a [`TaskQueue`]. `run` executes on a blocking thread.
pub trait Task: Send + 'static {
    type Output: Send + 'static;
    fn run(self) -> Self::Output;
}

type Command<T> = (T, oneshot::Sender<<T as Task>::Output>);

/// Error returned when the queue's worker loop has already shut down.
pub type SendError<T> = MpscSendError<Command<T>>;

/// Handle of a blocking task queue.
#[derive(Debug)]
pub struct TaskQueue<T: Task> {
    handle: JoinHandle<()>,
    command_sender: mpsc::UnboundedSender<Command<T>>,
}

impl<T: Task> TaskQueue<T>
where
    T::Output: Debug,
{
    /// Spawn a new task queue backed by up to `concurrency` concurrent
    /// blocking workers.
    pub fn spawn(concurrency: usize) -> Self {
        let (command_sender, mut command_receiver) = mpsc::unbounded_channel::<Command<T>>();
        let semaphore = std::sync::Arc::new(Semaphore::new(concurrency.max(1)));
        let handle = spawn(async move {
            while let Some((task, response_sender)) = command_receiver.recv().await {
                let semaphore = semaphore.clone();
                spawn(async move {
                    let permit = semaphore
                        .acquire_owned()
                        .await
                        .expect("semaphore is never closed for the lifetime of a TaskQueue");
                    let output = tokio::task::spawn_blocking(move || task.run())
                        .await
                        .expect("blocking task panicked");
                    drop(permit);
                    // The receiver may have been dropped if the caller stopped waiting.
                    let _ = response_sender.send(output);
                });
            }
        });
        TaskQueue { handle, command_sender }
    }

    /// Submit a task, returning a receiver for its eventual output.
    pub fn submit(&self, task: T) -> Result<oneshot::Receiver<T::Output>, SendError<T>> {
        let (response_sender, response_receiver) = oneshot::channel();
        self.command_sender.send((task, response_sender))?;
        Ok(response_receiver)
    }

    /// Stop accepting new tasks and wait for the worker loop to drain.
    pub async fn shutdown(self) {
        drop(self.command_sender);
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Double(u32);
    impl Task for Double {
        type Output = u32;
        fn run(self) -> u32 {
            self.0 * 2
        }
    }

    #[tokio::test]
    async fn runs_submitted_tasks() {
        let queue = TaskQueue::spawn(4);
        let mut receivers = Vec::new();
        for n in 0..10 {
            receivers.push(queue.submit(Double(n)).unwrap());
        }
        let mut outputs = Vec::new();
        for receiver in receivers {
            outputs.push(receiver.await.unwrap());
        }
        assert_eq!(outputs, (0..10).map(|n| n * 2).collect::<Vec<_>>());
        queue.shutdown().await;
    }
}
