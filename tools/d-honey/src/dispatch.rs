use crate::api::client::HoneyClient;
use crate::export::export_csv;
use crate::poller::Refresher;
use crate::ui::app::Update;
use bytesize::ByteSize;
use log::{error, info};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const EXPORT_PENDING: &str = "Downloading CSV...";
pub const READY: &str = "Ready";

/// Действия пользователя. Каждое уходит в отдельную задачу, результат
/// возвращается в UI-цикл через канал обновлений. Ошибки только в лог.
#[derive(Clone)]
pub struct Dispatcher {
    client: HoneyClient,
    updates: mpsc::Sender<Update>,
    refresher: Refresher,
    export_dir: PathBuf,
}

impl Dispatcher {
    pub fn new(
        client: HoneyClient,
        updates: mpsc::Sender<Update>,
        refresher: Refresher,
        export_dir: PathBuf,
    ) -> Self {
        Self { client, updates, refresher, export_dir }
    }

    pub fn simulate(&self, dst_port: u16) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            match this.client.simulate_attack(dst_port).await {
                Ok(()) => {
                    info!("simulated attack on port {}", dst_port);
                    this.refresher.trigger();
                    let _ = this
                        .updates
                        .send(Update::Status(format!("Simulated attack on port {}", dst_port)))
                        .await;
                }
                Err(e) => error!("simulate attack on port {} failed: {}", dst_port, e),
            }
        })
    }

    pub fn set_listening(&self, enabled: bool) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            match this.client.set_listening(enabled).await {
                Ok(now) => {
                    info!("listening set to {} (requested {})", now, enabled);
                    let _ = this.updates.send(Update::Listening(now)).await;
                }
                Err(e) => error!("toggle listening to {} failed: {}", enabled, e),
            }
        })
    }

    pub fn export(&self) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            match export_csv(&this.client, &this.export_dir).await {
                Ok(saved) => {
                    info!("exported {} ({} bytes)", saved.path.display(), saved.size);
                    let msg = format!("Saved to {} ({})", saved.path.display(), ByteSize(saved.size));
                    let _ = this.updates.send(Update::Status(msg)).await;
                }
                Err(e) => {
                    error!("CSV export failed: {:#}", e);
                    // убрать "Downloading CSV..." без показа ошибки
                    let _ = this.updates.send(Update::Status(READY.to_string())).await;
                }
            }
        })
    }

    /// Порты ханипота и текущее состояние прослушивания, если бэкенд их отдаёт.
    pub fn load_backend_info(&self) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            match this.client.fetch_backend_config().await {
                Ok(cfg) => {
                    let _ = this.updates.send(Update::Backend(cfg)).await;
                }
                Err(e) => info!("backend config unavailable: {}", e),
            }
        })
    }

    pub fn refresh(&self) {
        self.refresher.trigger();
    }
}
