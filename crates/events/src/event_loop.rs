//! Queued delivery context (the owning context's processing loop).
//!
//! Work posted through a [`LoopHandle`] runs when the owner of the
//! [`EventLoop`] calls [`EventLoop::process_events`]. One call is one *turn*:
//! it runs exactly the tasks that were queued when the turn started, in FIFO
//! order. Anything posted while the turn runs waits for the next turn, so a
//! queued task can never re-enter the code that posted it.
//!
//! The handle is `Send + Sync`; engines doing work on other threads post
//! their notifications here and the owning context delivers them.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Task = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct Queue {
    tasks: Mutex<VecDeque<Task>>,
}

impl Queue {
    fn lock(&self) -> MutexGuard<'_, VecDeque<Task>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable posting side of an [`EventLoop`].
#[derive(Clone)]
pub struct LoopHandle {
    queue: Arc<Queue>,
}

impl LoopHandle {
    /// Enqueue a task for a later turn.
    pub fn post<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue.lock().push_back(Box::new(task));
    }

    /// Release `value` on the next turn instead of now.
    ///
    /// Use this for reply handles inside their own completion callbacks.
    pub fn delete_later<T>(&self, value: T)
    where
        T: Send + 'static,
    {
        self.post(move || drop(value));
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}

impl core::fmt::Debug for LoopHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoopHandle")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Owner of a task queue; drains it turn by turn.
#[derive(Debug)]
pub struct EventLoop {
    handle: LoopHandle,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    pub fn pending(&self) -> usize {
        self.handle.pending()
    }

    /// Run one turn. Returns the number of tasks executed.
    pub fn process_events(&self) -> usize {
        let batch = std::mem::take(&mut *self.handle.queue.lock());
        let count = batch.len();
        if count > 0 {
            tracing::debug!(tasks = count, "processing queued events");
        }
        for task in batch {
            task();
        }
        count
    }

    /// Run turns until the queue is empty or `max_turns` turns have run.
    /// Returns the total number of tasks executed.
    pub fn run_until_idle(&self, max_turns: usize) -> usize {
        let mut total = 0;
        for _ in 0..max_turns {
            if self.pending() == 0 {
                break;
            }
            total += self.process_events();
        }
        total
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self {
            handle: LoopHandle {
                queue: Arc::new(Queue::default()),
            },
        }
    }
}
