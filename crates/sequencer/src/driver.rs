use std::ops::ControlFlow;

use shared::domain::{NodeId, ServiceStatus};
use tokio::{sync::broadcast, time::Instant};
use tracing::info;

use crate::{
    cascade::{Cascade, CascadeEvent, CascadePhase},
    scheduler::Scheduler,
    timeline::{PlaybackState, Timeline, TimelineEvent},
};

const EVENT_CAPACITY: usize = 256;

fn publish<E: Clone>(events: &broadcast::Sender<E>, batch: Vec<E>) {
    for event in batch {
        // no subscribers is fine
        let _ = events.send(event);
    }
}

/// Runs a [`Timeline`] on a recurring tick.
pub struct PlaybackDriver<P> {
    scheduler: Scheduler<Timeline<P>>,
    events: broadcast::Sender<TimelineEvent>,
}

impl<P: Send + 'static> PlaybackDriver<P> {
    pub fn new(timeline: Timeline<P>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            scheduler: Scheduler::new(timeline),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimelineEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> PlaybackState {
        self.scheduler.with(|timeline| timeline.state())
    }

    /// Reads the timeline under the state lock.
    pub fn inspect<R>(&self, f: impl FnOnce(&Timeline<P>) -> R) -> R {
        self.scheduler.with(|timeline| f(timeline))
    }

    pub fn start(&self) {
        let started = self.scheduler.with(Timeline::start);
        if started.is_empty() {
            return;
        }
        self.scheduler.invalidate();
        publish(&self.events, started);
        self.schedule_tick();
    }

    pub fn pause(&self) {
        let paused = self.scheduler.with(Timeline::pause);
        self.scheduler.invalidate();
        publish(&self.events, paused);
    }

    pub fn go_to_beat(&self, n: usize) {
        let changed = self.scheduler.with(|timeline| timeline.go_to_beat(n));
        publish(&self.events, changed);
    }

    pub fn replay(&self) {
        self.scheduler.invalidate();
        let events = self.scheduler.with(Timeline::replay);
        publish(&self.events, events);
        self.schedule_tick();
    }

    /// Stops playback and cancels the tick; the state stays readable and a
    /// later `start` resumes from the same position.
    pub fn teardown(&self) {
        let paused = self.scheduler.with(Timeline::pause);
        let generation = self.scheduler.invalidate();
        publish(&self.events, paused);
        info!(generation, "playback torn down");
    }

    fn schedule_tick(&self) {
        let period = self.scheduler.with(|timeline| timeline.config().tick_interval);
        let events = self.events.clone();
        self.scheduler.schedule_every(period, move |timeline| {
            publish(&events, timeline.tick());
            if timeline.state().is_playing {
                ControlFlow::Continue(())
            } else {
                ControlFlow::Break(())
            }
        });
    }
}

/// Runs a [`Cascade`]: every wave on its own timer, measured from the latest
/// `run_cascade` call.
pub struct CascadeDriver {
    scheduler: Scheduler<Cascade>,
    events: broadcast::Sender<CascadeEvent>,
}

impl CascadeDriver {
    pub fn new(cascade: Cascade) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            scheduler: Scheduler::new(cascade),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CascadeEvent> {
        self.events.subscribe()
    }

    pub fn phase(&self) -> CascadePhase {
        self.scheduler.with(|cascade| cascade.phase())
    }

    pub fn is_animating(&self) -> bool {
        self.scheduler.with(|cascade| cascade.is_animating())
    }

    pub fn status_of(&self, node: &NodeId) -> ServiceStatus {
        self.scheduler.with(|cascade| cascade.status_of(node))
    }

    pub fn is_revealed(&self, node: &NodeId) -> bool {
        self.scheduler.with(|cascade| cascade.is_revealed(node))
    }

    pub fn run_cascade(&self) {
        let started = Instant::now();
        let generation = self.scheduler.invalidate();
        let (restarted, waves, config) = self.scheduler.with(|cascade| {
            (cascade.restart(), cascade.waves().len(), *cascade.config())
        });
        info!(generation, waves, "cascade run scheduled");
        publish(&self.events, vec![restarted]);

        for index in 0..waves {
            let events = self.events.clone();
            self.scheduler
                .schedule_at(started + config.wave_delay(index), move |cascade| {
                    publish(&events, cascade.reveal(index).into_iter().collect());
                });
        }
        let events = self.events.clone();
        self.scheduler
            .schedule_at(started + config.settle_at(waves), move |cascade| {
                publish(&events, cascade.settle().into_iter().collect());
            });
    }

    pub fn teardown(&self) {
        let generation = self.scheduler.invalidate();
        info!(generation, "cascade torn down");
    }
}

#[cfg(test)]
#[path = "tests/driver_tests.rs"]
mod tests;
