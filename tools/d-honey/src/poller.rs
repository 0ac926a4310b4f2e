use crate::api::client::HoneyClient;
use crate::ui::app::Update;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_PERIOD: Duration = Duration::from_millis(2000);

/// Периодический опрос `/api/log`.
///
/// Первый запрос уходит сразу после `start`, дальше раз в `period`.
/// Ошибки только логируются, опрос не останавливается. После `stop`
/// (или drop) ни один запрос не уходит и ни один результат не доставляется.
pub struct Poller {
    active: Arc<AtomicBool>,
    refresh_tx: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

/// Запрос внепланового опроса. Несколько запросов подряд схлопываются в один.
#[derive(Clone)]
pub struct Refresher(mpsc::Sender<()>);

impl Refresher {
    pub fn trigger(&self) {
        let _ = self.0.try_send(());
    }
}

impl Poller {
    pub fn start(client: HoneyClient, period: Duration, updates: mpsc::Sender<Update>) -> Self {
        let active = Arc::new(AtomicBool::new(true));
        let (refresh_tx, mut refresh_rx) = mpsc::channel::<()>(1);
        let flag = active.clone();

        let handle = tokio::spawn(async move {
            info!("log poller started ({} ms, {})", period.as_millis(), client.base_url());
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    Some(()) = refresh_rx.recv() => debug!("manual refresh"),
                }
                if !poll_once(&client, &flag, &updates).await {
                    break;
                }
            }
            debug!("log poller loop finished");
        });

        Poller {
            active,
            refresh_tx,
            handle: Some(handle),
        }
    }

    pub fn refresher(&self) -> Refresher {
        Refresher(self.refresh_tx.clone())
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn stop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("log poller stopped");
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

// false = дальше опрашивать некому
async fn poll_once(client: &HoneyClient, active: &AtomicBool, updates: &mpsc::Sender<Update>) -> bool {
    match client.fetch_log().await {
        Ok(rows) => {
            if !active.load(Ordering::SeqCst) {
                debug!("dropping log response that arrived after stop");
                return false;
            }
            updates.send(Update::Snapshot(rows)).await.is_ok()
        }
        Err(e) if e.is_network() => {
            warn!("backend unreachable, keeping previous snapshot: {}", e);
            true
        }
        Err(e) => {
            warn!("{} poll rejected, keeping previous snapshot: {}", e.endpoint(), e);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{row, FakeBackend};

    const WAIT: Duration = Duration::from_secs(2);

    fn client_for(fake: &FakeBackend) -> HoneyClient {
        HoneyClient::new(&fake.base_url(), Duration::from_secs(2)).unwrap()
    }

    async fn next_snapshot(rx: &mut mpsc::Receiver<Update>) -> Vec<crate::api::model::ConnectionRecord> {
        match tokio::time::timeout(WAIT, rx.recv()).await {
            Ok(Some(Update::Snapshot(rows))) => rows,
            Ok(other) => panic!("unexpected update: {other:?}"),
            Err(_) => panic!("no snapshot within {WAIT:?}"),
        }
    }

    #[tokio::test]
    async fn fetches_immediately_on_start() {
        let fake = FakeBackend::start().await;
        fake.push(row("1.1.1.1", 22, "2024-03-01T10:00:15Z"));
        let (tx, mut rx) = mpsc::channel(16);

        let _poller = Poller::start(client_for(&fake), Duration::from_secs(60), tx);

        let rows = next_snapshot(&mut rx).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(fake.log_hits(), 1);
    }

    #[tokio::test]
    async fn keeps_polling_on_period() {
        let fake = FakeBackend::start().await;
        let (tx, mut rx) = mpsc::channel(16);

        let _poller = Poller::start(client_for(&fake), Duration::from_millis(30), tx);

        for _ in 0..3 {
            next_snapshot(&mut rx).await;
        }
        assert!(fake.log_hits() >= 3);
    }

    #[tokio::test]
    async fn failures_are_silent_and_polling_continues() {
        let fake = FakeBackend::start().await;
        fake.with(|s| s.log_status = 500);
        let (tx, mut rx) = mpsc::channel(16);

        let poller = Poller::start(client_for(&fake), Duration::from_millis(30), tx);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(fake.log_hits() >= 3);
        assert!(rx.try_recv().is_err());
        assert!(poller.is_active());

        fake.with(|s| s.log_status = 200);
        fake.push(row("2.2.2.2", 80, "2024-03-01T10:00:15Z"));
        assert_eq!(next_snapshot(&mut rx).await.len(), 1);
    }

    #[tokio::test]
    async fn refresher_triggers_unscheduled_poll() {
        let fake = FakeBackend::start().await;
        let (tx, mut rx) = mpsc::channel(16);

        let poller = Poller::start(client_for(&fake), Duration::from_secs(60), tx);
        assert!(next_snapshot(&mut rx).await.is_empty());

        fake.push(row("1.1.1.1", 22, "2024-03-01T10:00:15Z"));
        let refresher = poller.refresher();
        refresher.trigger();
        refresher.trigger();

        assert_eq!(next_snapshot(&mut rx).await.len(), 1);
    }

    #[tokio::test]
    async fn no_requests_after_stop() {
        let fake = FakeBackend::start().await;
        let (tx, mut rx) = mpsc::channel(16);

        let mut poller = Poller::start(client_for(&fake), Duration::from_millis(30), tx);
        next_snapshot(&mut rx).await;

        poller.stop();
        assert!(!poller.is_active());
        // запрос, уже ушедший в сокет, сервер ещё может досчитать
        tokio::time::sleep(Duration::from_millis(100)).await;
        while rx.try_recv().is_ok() {}

        let hits = fake.log_hits();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fake.log_hits(), hits);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn in_flight_response_is_dropped_after_stop() {
        let fake = FakeBackend::start().await;
        fake.push(row("1.1.1.1", 22, "2024-03-01T10:00:15Z"));
        fake.with(|s| s.log_delay = Some(Duration::from_millis(200)));
        let (tx, mut rx) = mpsc::channel(16);

        let poller = Poller::start(client_for(&fake), Duration::from_secs(60), tx);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fake.log_hits(), 1);
        drop(poller);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(rx.try_recv().is_err());
    }
}
