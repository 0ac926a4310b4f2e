use crate::api::error::{FetchError, Result};
use crate::api::model::{
    BackendConfig, ConnectionRecord, ListenRequest, ListenResponse, LogResponse, SimulateRequest,
};
use bytes::Bytes;
use log::debug;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

const LOG_PATH: &str = "api/log";
const SIMULATE_PATH: &str = "api/simulate";
const LISTEN_PATH: &str = "api/listen";
const DOWNLOAD_PATH: &str = "api/download";
const CONFIG_PATH: &str = "api/config";

/// HTTP-клиент бэкенда ханипота. Все пути резолвятся относительно `base`.
#[derive(Clone)]
pub struct HoneyClient {
    http: Client,
    base: Url,
}

impl HoneyClient {
    pub fn new(base: &Url, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base: normalize_base(base) })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn endpoint_url(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    /// Полный снимок лога. Отсутствующее поле `rows` = пустой список.
    pub async fn fetch_log(&self) -> Result<Vec<ConnectionRecord>> {
        let req = self.http.get(self.endpoint_url(LOG_PATH)?);
        let body = self.send("/api/log", req).await?;
        let parsed: LogResponse = decode("/api/log", &body)?;
        Ok(parsed.rows.unwrap_or_default())
    }

    pub async fn simulate_attack(&self, dst_port: u16) -> Result<()> {
        let req = self
            .http
            .post(self.endpoint_url(SIMULATE_PATH)?)
            .json(&SimulateRequest { dst_port });
        self.send("/api/simulate", req).await?;
        Ok(())
    }

    /// Возвращает новое значение флага. Если бэкенд прислал `listen` в ответе,
    /// берём его, иначе считаем, что запрос принят как есть.
    pub async fn set_listening(&self, enabled: bool) -> Result<bool> {
        let req = self
            .http
            .post(self.endpoint_url(LISTEN_PATH)?)
            .json(&ListenRequest { listen: enabled });
        let body = self.send("/api/listen", req).await?;
        let confirmed = serde_json::from_slice::<ListenResponse>(&body)
            .ok()
            .and_then(|r| r.listen);
        if let Some(actual) = confirmed {
            if actual != enabled {
                debug!("backend kept listen={} (requested {})", actual, enabled);
            }
        }
        Ok(confirmed.unwrap_or(enabled))
    }

    pub async fn download_export(&self) -> Result<Bytes> {
        let req = self.http.get(self.endpoint_url(DOWNLOAD_PATH)?);
        self.send("/api/download", req).await
    }

    pub async fn fetch_backend_config(&self) -> Result<BackendConfig> {
        let req = self.http.get(self.endpoint_url(CONFIG_PATH)?);
        let body = self.send("/api/config", req).await?;
        decode("/api/config", &body)
    }

    async fn send(&self, endpoint: &'static str, req: RequestBuilder) -> Result<Bytes> {
        let resp = req
            .send()
            .await
            .map_err(|source| FetchError::Network { endpoint, source })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { endpoint, status });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|source| FetchError::Network { endpoint, source })?;
        debug!("{} -> {} ({} bytes)", endpoint, status, body.len());
        Ok(body)
    }
}

fn decode<T: DeserializeOwned>(endpoint: &'static str, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|source| FetchError::Decode { endpoint, source })
}

// Без завершающего слэша `join` заменит последний сегмент пути
fn normalize_base(base: &Url) -> Url {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}
