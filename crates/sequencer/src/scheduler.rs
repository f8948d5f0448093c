use std::{
    ops::ControlFlow,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::debug;

struct Slot<S> {
    generation: u64,
    state: S,
}

/// Owns a piece of sequencer state and the timers that mutate it.
///
/// Every scheduled effect captures the generation current at scheduling time
/// and runs only if it still matches once it holds the state lock, so
/// [`Scheduler::invalidate`] makes all outstanding effects inert even if their
/// task has already woken up. Effects run synchronously under the lock and
/// never overlap.
pub struct Scheduler<S> {
    slot: Arc<Mutex<Slot<S>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: Send + 'static> Scheduler<S> {
    pub fn new(state: S) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                generation: 0,
                state,
            })),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut lock(&self.slot).state)
    }

    pub fn generation(&self) -> u64 {
        lock(&self.slot).generation
    }

    /// Bumps the generation and aborts every pending task.
    pub fn invalidate(&self) -> u64 {
        let generation = {
            let mut slot = lock(&self.slot);
            slot.generation += 1;
            slot.generation
        };
        let tasks = std::mem::take(&mut *lock(&self.tasks));
        let cancelled = tasks.iter().filter(|task| !task.is_finished()).count();
        for task in tasks {
            task.abort();
        }
        if cancelled > 0 {
            debug!(generation, cancelled, "cancelled pending sequencer tasks");
        }
        generation
    }

    /// Tasks still waiting to fire.
    pub fn pending(&self) -> usize {
        let mut tasks = lock(&self.tasks);
        tasks.retain(|task| !task.is_finished());
        tasks.len()
    }

    pub fn schedule_at(&self, deadline: Instant, effect: impl FnOnce(&mut S) + Send + 'static) {
        let slot = Arc::clone(&self.slot);
        let generation = self.generation();
        let task = tokio::spawn(async move {
            time::sleep_until(deadline).await;
            let mut guard = lock(&slot);
            if guard.generation == generation {
                effect(&mut guard.state);
            }
        });
        self.track(task);
    }

    pub fn schedule_after(&self, delay: Duration, effect: impl FnOnce(&mut S) + Send + 'static) {
        self.schedule_at(Instant::now() + delay, effect);
    }

    /// Runs `effect` every `period`, first one period from now, until it
    /// breaks or the generation moves on.
    pub fn schedule_every(
        &self,
        period: Duration,
        mut effect: impl FnMut(&mut S) -> ControlFlow<()> + Send + 'static,
    ) {
        let slot = Arc::clone(&self.slot);
        let generation = self.generation();
        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let mut guard = lock(&slot);
                if guard.generation != generation || effect(&mut guard.state).is_break() {
                    break;
                }
            }
        });
        self.track(task);
    }

    fn track(&self, task: JoinHandle<()>) {
        let mut tasks = lock(&self.tasks);
        tasks.retain(|task| !task.is_finished());
        tasks.push(task);
    }
}

impl<S> Drop for Scheduler<S> {
    fn drop(&mut self) {
        lock(&self.slot).generation += 1;
        for task in lock(&self.tasks).drain(..) {
            task.abort();
        }
    }
}
