use crate::analysis::aggregate::Aggregates;
use crate::api::model::{BackendConfig, ConnectionRecord};
use crate::store::{RowStore, StoredRecord};
use log::debug;
use ratatui::widgets::TableState;

/// Всё, что фоновые задачи присылают в UI-цикл.
#[derive(Debug)]
pub enum Update {
    Snapshot(Vec<ConnectionRecord>),
    Listening(bool),
    Backend(BackendConfig),
    Status(String),
}

pub struct App {
    pub store: RowStore,
    pub stats: Aggregates,
    stats_generation: u64,
    pub top_n: usize,

    pub backend_label: String,
    pub honeypot_ports: Vec<u16>,

    // Таблица логов рисуется от новых к старым
    pub table_state: TableState,
    pub auto_scroll: bool,
    selected_seq: Option<u64>,

    pub status_msg: String,
}

impl App {
    pub fn new(top_n: usize, backend_label: String) -> App {
        App {
            store: RowStore::new(),
            stats: Aggregates::default(),
            stats_generation: 0,
            top_n,
            backend_label,
            honeypot_ports: Vec::new(),
            table_state: TableState::default(),
            auto_scroll: true,
            selected_seq: None,
            status_msg: "Waiting for backend...".to_string(),
        }
    }

    pub fn apply(&mut self, update: Update) {
        match update {
            Update::Snapshot(rows) => self.on_snapshot(rows),
            Update::Listening(listening) => {
                self.store.set_listening(listening);
                self.status_msg = if listening {
                    "Listening enabled".to_string()
                } else {
                    "Listening paused".to_string()
                };
            }
            Update::Backend(cfg) => {
                debug!("backend config: {:?}", cfg);
                self.honeypot_ports = cfg.ports;
                if let Some(listening) = cfg.listening {
                    self.store.set_listening(listening);
                }
            }
            Update::Status(msg) => self.status_msg = msg,
        }
    }

    fn on_snapshot(&mut self, rows: Vec<ConnectionRecord>) {
        self.store.replace(rows);
        self.refresh_stats();
        self.restore_selection();
    }

    fn refresh_stats(&mut self) {
        if self.stats_generation == self.store.generation() {
            return;
        }
        self.stats = Aggregates::compute(self.store.records(), self.top_n);
        self.stats_generation = self.store.generation();
    }

    /// Строки в порядке отображения (новые сверху).
    pub fn visible_rows(&self) -> impl Iterator<Item = &StoredRecord> {
        self.store.rows().iter().rev()
    }

    pub fn selected(&self) -> Option<&StoredRecord> {
        let idx = self.table_state.selected()?;
        self.visible_rows().nth(idx)
    }

    fn display_index(&self, seq: u64) -> Option<usize> {
        let pos = self.store.position_of(seq)?;
        Some(self.store.len() - 1 - pos)
    }

    fn restore_selection(&mut self) {
        if self.store.is_empty() {
            self.table_state.select(None);
            self.selected_seq = None;
            return;
        }
        if self.auto_scroll {
            self.select(0);
            return;
        }
        let idx = self.selected_seq.and_then(|seq| self.display_index(seq));
        match idx {
            Some(idx) => self.table_state.select(Some(idx)),
            // Выбранная строка ушла из окна бэкенда
            None => self.select(0),
        }
    }

    fn select(&mut self, idx: usize) {
        self.table_state.select(Some(idx));
        let seq = self.visible_rows().nth(idx).map(|r| r.seq);
        self.selected_seq = seq;
    }

    pub fn next(&mut self) {
        if self.store.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) => if i >= self.store.len().saturating_sub(1) { i } else { i + 1 },
            None => 0,
        };
        self.auto_scroll = false;
        self.select(i);
    }

    pub fn previous(&mut self) {
        if self.store.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.auto_scroll = false;
        self.select(i);
    }

    pub fn follow(&mut self) {
        self.auto_scroll = true;
        self.restore_selection();
        self.status_msg = "Following new traffic".to_string();
    }
}
