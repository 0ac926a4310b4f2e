use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// Одна попытка подключения к ханипоту, как её отдаёт бэкенд
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub timestamp: String,
    pub src_ip: String,
    pub src_port: u16,
    pub dst_port: u16,
    #[serde(default)]
    pub recv_preview: Option<String>,
}

impl ConnectionRecord {
    /// Время записи в UTC. Бэкенд пишет `isoformat() + "Z"`, но наивные
    /// строки без зоны тоже принимаем как UTC.
    pub fn parsed_time(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive))
    }

    pub fn preview(&self) -> &str {
        match self.recv_preview.as_deref() {
            Some(p) if !p.is_empty() => p,
            _ => "EMPTY",
        }
    }
}

// GET /api/log
#[derive(Debug, Default, Deserialize)]
pub struct LogResponse {
    #[serde(default)]
    pub rows: Option<Vec<ConnectionRecord>>,
}

// POST /api/simulate
#[derive(Debug, Serialize)]
pub struct SimulateRequest {
    pub dst_port: u16,
}

// POST /api/listen
#[derive(Debug, Serialize)]
pub struct ListenRequest {
    pub listen: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListenResponse {
    #[serde(default)]
    pub listen: Option<bool>,
}

// GET /api/config (есть не у всех бэкендов)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub ports: Vec<u16>,
    #[serde(default)]
    pub listening: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_timestamp_with_micros_and_z() {
        let rec = record("2024-03-01T10:00:15.123456Z");
        let t = rec.parsed_time().unwrap();
        assert_eq!(t.to_rfc3339(), "2024-03-01T10:00:15.123456+00:00");
    }

    #[test]
    fn naive_timestamp_is_treated_as_utc() {
        let rec = record("2024-03-01T10:00:15");
        assert_eq!(
            rec.parsed_time().unwrap().format("%H:%M:%S").to_string(),
            "10:00:15"
        );
    }

    #[test]
    fn garbage_timestamp_does_not_parse() {
        assert!(record("yesterday").parsed_time().is_none());
    }

    #[test]
    fn missing_rows_field_is_none_and_extra_fields_are_ignored() {
        let empty: LogResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.rows.is_none());

        let body = r#"{"rows":[{"timestamp":"2024-03-01T10:00:15Z","src_ip":"1.1.1.1",
            "src_port":40000,"dst_port":22,"banner_sent":"SSH-2.0"}]}"#;
        let parsed: LogResponse = serde_json::from_str(body).unwrap();
        let rows = parsed.rows.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].recv_preview, None);
        assert_eq!(rows[0].preview(), "EMPTY");
    }

    fn record(ts: &str) -> ConnectionRecord {
        ConnectionRecord {
            timestamp: ts.to_string(),
            src_ip: "10.0.0.1".into(),
            src_port: 5000,
            dst_port: 22,
            recv_preview: Some(String::new()),
        }
    }
}
