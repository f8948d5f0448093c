use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use search_client::SearchClient;
use serde::Serialize;
use shared::error::DataNotice;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::Resource;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot<T> {
    pub data: T,
    pub loading: bool,
    pub error: Option<DataNotice>,
    pub is_live: bool,
}

/// One resource plus its last-known rows.
///
/// `fetch` never fails: a backend error leaves `data` untouched and fills in
/// `error` instead. In mock mode the fallback is the only data ever served.
///
/// Overlapping fetches are numbered; a response older than one already
/// applied is dropped, and `loading` stays set until the newest one lands.
pub struct DataFeed<R: Resource> {
    resource: R,
    client: Option<SearchClient>,
    state: watch::Sender<Snapshot<R::Data>>,
    issued: AtomicU64,
    applied: AtomicU64,
}

impl<R: Resource> DataFeed<R> {
    pub fn new(resource: R, client: Option<SearchClient>) -> Self {
        let is_live = client.is_some();
        let (state, _) = watch::channel(Snapshot {
            data: resource.fallback(),
            loading: is_live,
            error: None,
            is_live,
        });
        Self {
            resource,
            client,
            state,
            issued: AtomicU64::new(0),
            applied: AtomicU64::new(0),
        }
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    pub fn is_live(&self) -> bool {
        self.client.is_some()
    }

    pub fn snapshot(&self) -> Snapshot<R::Data> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<R::Data>> {
        self.state.subscribe()
    }

    pub async fn fetch(&self) -> Snapshot<R::Data> {
        let Some(client) = &self.client else {
            return self.snapshot();
        };
        let name = self.resource.name();

        let request = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|snapshot| {
            snapshot.loading = true;
            snapshot.error = None;
        });
        debug!(resource = name, request, "fetching live data");

        let outcome = self.resource.fetch_live(client).await;
        if let Err(err) = &outcome {
            warn!(
                resource = name,
                request,
                error = %err,
                "live fetch failed, keeping last-known data"
            );
        }

        let applied = self.state.send_if_modified(|snapshot| {
            if request < self.applied.load(Ordering::SeqCst) {
                return false;
            }
            self.applied.store(request, Ordering::SeqCst);
            match outcome {
                Ok(data) => {
                    snapshot.data = data;
                    snapshot.error = None;
                }
                Err(err) => snapshot.error = Some(err.notice()),
            }
            snapshot.loading = request < self.issued.load(Ordering::SeqCst);
            true
        });
        if !applied {
            debug!(resource = name, request, "stale response dropped");
        }
        self.snapshot()
    }

    pub async fn refresh(&self) -> Snapshot<R::Data> {
        self.fetch().await
    }

    /// Re-fetches every refresh interval until the returned handle is dropped.
    /// `None` in mock mode or for resources that do not poll.
    pub fn spawn_polling(self: &Arc<Self>) -> Option<PollHandle> {
        if !self.is_live() {
            return None;
        }
        let period = self.resource.refresh_interval()?;
        let feed = Arc::clone(self);
        let name = self.resource.name();
        info!(resource = name, period_ms = period.as_millis() as u64, "polling started");

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                feed.fetch().await;
            }
        });
        Some(PollHandle {
            resource: name,
            task,
        })
    }

    /// Initial fetch followed by polling, the way a view mounts a resource.
    pub async fn mount(self: &Arc<Self>) -> Option<PollHandle> {
        self.fetch().await;
        self.spawn_polling()
    }
}

/// Polling task of one feed. Dropping the handle stops polling.
pub struct PollHandle {
    resource: &'static str,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
        debug!(resource = self.resource, "polling stopped");
    }
}
