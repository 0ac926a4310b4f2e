use crate::api::client::HoneyClient;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub struct SavedExport {
    pub path: PathBuf,
    pub size: u64,
}

/// Скачивает CSV бэкенда и кладёт его в `dir` как `attempts_HH-MM-SS.csv`.
pub async fn export_csv(client: &HoneyClient, dir: &Path) -> Result<SavedExport> {
    let body = client.download_export().await?;
    let name = format!("attempts_{}.csv", chrono::Local::now().format("%H-%M-%S"));
    write_export(dir, &name, &body)
}

// Пишем во временный файл рядом и переименовываем, чтобы не оставить
// обрезанный CSV при ошибке
pub fn write_export(dir: &Path, name: &str, body: &[u8]) -> Result<SavedExport> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(body)?;
    tmp.flush()?;

    let path = dir.join(name);
    tmp.persist(&path)
        .with_context(|| format!("saving {}", path.display()))?;

    Ok(SavedExport {
        path,
        size: body.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use std::time::Duration;

    #[test]
    fn writes_file_into_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("exports");

        let saved = write_export(&dir, "attempts_test.csv", b"a,b\n1,2\n").unwrap();

        assert_eq!(saved.path, dir.join("attempts_test.csv"));
        assert_eq!(saved.size, 8);
        assert_eq!(fs::read_to_string(&saved.path).unwrap(), "a,b\n1,2\n");
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn downloads_backend_csv_verbatim() {
        let fake = FakeBackend::start().await;
        let csv = "timestamp,src_ip,src_port,dst_port,recv_preview,banner_sent\n\
                   2024-03-01T10:00:15Z,1.1.1.1,40000,2222,,SSH-2.0\n";
        fake.with(|s| s.csv = csv.to_string());
        let client = HoneyClient::new(&fake.base_url(), Duration::from_secs(2)).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let saved = export_csv(&client, dir.path()).await.unwrap();

        let name = saved.path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("attempts_") && name.ends_with(".csv"), "{name}");
        assert_eq!(fs::read_to_string(&saved.path).unwrap(), csv);
    }

    #[tokio::test]
    async fn missing_backend_file_is_an_error() {
        let fake = FakeBackend::start().await;
        let base = fake.base_url().join("nowhere/").unwrap();
        let client = HoneyClient::new(&base, Duration::from_secs(2)).unwrap();
        let dir = tempfile::tempdir().unwrap();

        assert!(export_csv(&client, dir.path()).await.is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
