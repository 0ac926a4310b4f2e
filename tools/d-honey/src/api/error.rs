//! Ошибки обращения к бэкенду ханипота.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    /// Соединение не установлено, таймаут, DNS
    #[error("network error on {endpoint}: {source}")]
    Network {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Бэкенд ответил не-2xx
    #[error("{endpoint} returned {status}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
    },

    /// Тело ответа не разбирается как ожидаемый JSON
    #[error("malformed response from {endpoint}: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid backend url: {0}")]
    Url(#[from] url::ParseError),
}

impl FetchError {
    pub fn is_network(&self) -> bool {
        matches!(self, FetchError::Network { .. })
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            FetchError::Network { endpoint, .. }
            | FetchError::Status { endpoint, .. }
            | FetchError::Decode { endpoint, .. } => *endpoint,
            FetchError::Url(_) => "-",
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
