use crate::poller::DEFAULT_PERIOD;
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "d-honey.yaml";
pub const MAX_TOP_N: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Адрес бэкенда, от него считаются все /api/* пути
    #[serde(alias = "backendBaseUrl")]
    pub backend_base_url: String,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    pub top_n: usize,
    pub export_dir: PathBuf,
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend_base_url: "http://localhost:5000".to_string(),
            poll_interval_ms: DEFAULT_PERIOD.as_millis() as u64,
            request_timeout_secs: 5,
            top_n: 5,
            export_dir: PathBuf::from("."),
            log_file: PathBuf::from("d-honey.log"),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Явно указанный файл обязан существовать, файл по умолчанию нет.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::load(default)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.backend_url()?;
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than zero");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        if self.top_n == 0 || self.top_n > MAX_TOP_N {
            bail!("top_n must be between 1 and {}, got {}", MAX_TOP_N, self.top_n);
        }
        Ok(())
    }

    pub fn backend_url(&self) -> Result<Url> {
        let url = Url::parse(&self.backend_base_url)
            .with_context(|| format!("invalid backend url {:?}", self.backend_base_url))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(anyhow!("unsupported backend scheme {:?}", other)),
        }
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
