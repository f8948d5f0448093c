use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use search_client::SearchClient;
use shared::error::{DataError, ErrorCode};
use tokio::sync::oneshot;
use url::Url;

use crate::{DataFeed, FacadeError, Resource};

/// Resource whose live fetch replays queued outcomes and never touches the
/// network; an empty queue yields the call count.
#[derive(Clone, Default)]
struct Scripted {
    calls: Arc<AtomicUsize>,
    outcomes: Arc<Mutex<VecDeque<Result<Vec<u32>, ErrorCode>>>>,
    interval: Option<Duration>,
}

impl Scripted {
    fn polling(every: Duration) -> Self {
        Self {
            interval: Some(every),
            ..Self::default()
        }
    }

    fn queue(&self, outcome: Result<Vec<u32>, ErrorCode>) {
        self.outcomes.lock().expect("outcomes").push_back(outcome);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Resource for Scripted {
    type Data = Vec<u32>;

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn fallback(&self) -> Self::Data {
        vec![1, 2, 3]
    }

    fn refresh_interval(&self) -> Option<Duration> {
        self.interval
    }

    async fn fetch_live(&self, _client: &SearchClient) -> Result<Self::Data, FacadeError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let next = self.outcomes.lock().expect("outcomes").pop_front();
        match next {
            Some(Ok(rows)) => Ok(rows),
            Some(Err(code)) => Err(DataError::new(code, "scripted failure").into()),
            None => Ok(vec![call as u32]),
        }
    }
}

/// Resource whose live fetches wait until the test releases them, one gate
/// per call in call order.
#[derive(Clone, Default)]
struct Gated {
    gates: Arc<Mutex<VecDeque<oneshot::Receiver<Vec<u32>>>>>,
}

impl Gated {
    fn gate(&self) -> oneshot::Sender<Vec<u32>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().expect("gates").push_back(rx);
        tx
    }

    fn waiting(&self) -> usize {
        self.gates.lock().expect("gates").len()
    }

    async fn until_waiting(&self, remaining: usize) {
        while self.waiting() > remaining {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl Resource for Gated {
    type Data = Vec<u32>;

    fn name(&self) -> &'static str {
        "gated"
    }

    fn fallback(&self) -> Self::Data {
        vec![0]
    }

    async fn fetch_live(&self, _client: &SearchClient) -> Result<Self::Data, FacadeError> {
        let gate = self.gates.lock().expect("gates").pop_front();
        match gate {
            Some(rx) => rx
                .await
                .map_err(|_| FacadeError::from(DataError::new(ErrorCode::Internal, "gate dropped"))),
            None => Ok(Vec::new()),
        }
    }
}

fn offline_client() -> SearchClient {
    SearchClient::new(
        Url::parse("http://127.0.0.1:9").expect("url"),
        None,
        Duration::from_secs(1),
    )
    .expect("client")
}

#[tokio::test]
async fn mock_feed_serves_fallback_and_never_fetches() {
    let resource = Scripted::polling(Duration::from_secs(1));
    let feed = Arc::new(DataFeed::new(resource.clone(), None));

    let initial = feed.snapshot();
    assert_eq!(initial.data, vec![1, 2, 3]);
    assert!(!initial.loading);
    assert!(!initial.is_live);

    let after = feed.fetch().await;
    assert_eq!(after, initial);
    assert_eq!(resource.calls(), 0);
    assert!(feed.spawn_polling().is_none());
}

#[tokio::test]
async fn live_feed_starts_loading_then_replaces_data() {
    let resource = Scripted::default();
    resource.queue(Ok(vec![42]));
    let feed = DataFeed::new(resource.clone(), Some(offline_client()));

    let initial = feed.snapshot();
    assert!(initial.loading);
    assert!(initial.is_live);
    assert_eq!(initial.data, vec![1, 2, 3]);

    let snapshot = feed.fetch().await;
    assert_eq!(snapshot.data, vec![42]);
    assert!(!snapshot.loading);
    assert_eq!(snapshot.error, None);
}

#[tokio::test]
async fn failure_keeps_last_known_data_and_clears_on_success() {
    let resource = Scripted::default();
    resource.queue(Ok(vec![7]));
    resource.queue(Err(ErrorCode::Unreachable));
    resource.queue(Ok(vec![8]));
    let feed = DataFeed::new(resource.clone(), Some(offline_client()));

    feed.fetch().await;
    let failed = feed.fetch().await;
    assert_eq!(failed.data, vec![7]);
    assert!(!failed.loading);
    let notice = failed.error.expect("notice");
    assert_eq!(notice.code, ErrorCode::Unreachable);
    assert!(notice.message.contains("scripted failure"));

    let recovered = feed.refresh().await;
    assert_eq!(recovered.data, vec![8]);
    assert_eq!(recovered.error, None);
}

#[tokio::test]
async fn first_failure_keeps_the_fallback() {
    let resource = Scripted::default();
    resource.queue(Err(ErrorCode::Malformed));
    let feed = DataFeed::new(resource, Some(offline_client()));

    let snapshot = feed.fetch().await;
    assert_eq!(snapshot.data, vec![1, 2, 3]);
    assert_eq!(snapshot.error.map(|n| n.code), Some(ErrorCode::Malformed));
}

#[tokio::test]
async fn subscribers_see_each_update() {
    let resource = Scripted::default();
    resource.queue(Ok(vec![5]));
    let feed = DataFeed::new(resource, Some(offline_client()));
    let mut rx = feed.subscribe();

    feed.fetch().await;

    rx.changed().await.expect("changed");
    assert_eq!(rx.borrow_and_update().data, vec![5]);
}

#[tokio::test(start_paused = true)]
async fn polling_refetches_every_interval_after_the_first_period() {
    let resource = Scripted::polling(Duration::from_secs(10));
    let feed = Arc::new(DataFeed::new(resource.clone(), Some(offline_client())));

    let handle = feed.spawn_polling().expect("polls");
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(resource.calls(), 0);

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(resource.calls(), 2);
    assert_eq!(feed.snapshot().data, vec![2]);
    assert!(!handle.is_finished());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_poll_handle_stops_polling() {
    let resource = Scripted::polling(Duration::from_secs(10));
    let feed = Arc::new(DataFeed::new(resource.clone(), Some(offline_client())));

    let handle = feed.mount().await.expect("polls");
    assert_eq!(resource.calls(), 1);
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(resource.calls(), 2);

    drop(handle);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(resource.calls(), 2);
}

#[tokio::test]
async fn resources_without_interval_do_not_poll() {
    let feed = Arc::new(DataFeed::new(Scripted::default(), Some(offline_client())));
    assert!(feed.spawn_polling().is_none());
}

#[tokio::test]
async fn older_response_never_overwrites_newer_data() {
    let resource = Gated::default();
    let first = resource.gate();
    let second = resource.gate();
    let feed = Arc::new(DataFeed::new(resource.clone(), Some(offline_client())));

    let slow = tokio::spawn({
        let feed = Arc::clone(&feed);
        async move { feed.fetch().await }
    });
    resource.until_waiting(1).await;
    let fast = tokio::spawn({
        let feed = Arc::clone(&feed);
        async move { feed.fetch().await }
    });
    resource.until_waiting(0).await;

    second.send(vec![2]).expect("second gate");
    let newest = fast.await.expect("fast fetch");
    assert_eq!(newest.data, vec![2]);
    assert!(!newest.loading);

    first.send(vec![1]).expect("first gate");
    let stale = slow.await.expect("slow fetch");
    assert_eq!(stale.data, vec![2]);
    assert_eq!(feed.snapshot().data, vec![2]);
    assert!(!feed.snapshot().loading);
}

#[tokio::test]
async fn loading_stays_set_until_the_newest_fetch_lands() {
    let resource = Gated::default();
    let first = resource.gate();
    let second = resource.gate();
    let feed = Arc::new(DataFeed::new(resource.clone(), Some(offline_client())));

    let earlier = tokio::spawn({
        let feed = Arc::clone(&feed);
        async move { feed.fetch().await }
    });
    resource.until_waiting(1).await;
    let later = tokio::spawn({
        let feed = Arc::clone(&feed);
        async move { feed.fetch().await }
    });
    resource.until_waiting(0).await;

    first.send(vec![1]).expect("first gate");
    let partial = earlier.await.expect("earlier fetch");
    assert_eq!(partial.data, vec![1]);
    assert!(partial.loading);

    second.send(vec![2]).expect("second gate");
    let done = later.await.expect("later fetch");
    assert_eq!(done.data, vec![2]);
    assert!(!done.loading);
}
