use crate::api::model::ConnectionRecord;
use log::debug;

/// Запись снимка со стабильным синтетическим id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub seq: u64,
    pub record: ConnectionRecord,
}

/// Единственный источник правды для дашборда: последний снимок лога
/// и флаг прослушивания.
///
/// Снимок всегда заменяется целиком. Бэкенд отдаёт скользящее окно
/// (последние N строк), поэтому при замене новый снимок выравнивается
/// по старому: совпавший хвост старого снимка сохраняет свои `seq`,
/// остальные записи получают новые.
#[derive(Debug)]
pub struct RowStore {
    rows: Vec<StoredRecord>,
    next_seq: u64,
    generation: u64,
    listening: bool,
}

impl Default for RowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RowStore {
    pub fn new() -> Self {
        RowStore {
            rows: Vec::new(),
            next_seq: 0,
            generation: 0,
            listening: true,
        }
    }

    pub fn rows(&self) -> &[StoredRecord] {
        &self.rows
    }

    pub fn records(&self) -> impl Iterator<Item = &ConnectionRecord> + Clone {
        self.rows.iter().map(|r| &r.record)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Растёт на каждую замену снимка.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn listening(&self) -> bool {
        self.listening
    }

    pub fn set_listening(&mut self, listening: bool) {
        self.listening = listening;
    }

    pub fn position_of(&self, seq: u64) -> Option<usize> {
        self.rows.iter().position(|r| r.seq == seq)
    }

    pub fn replace(&mut self, snapshot: Vec<ConnectionRecord>) {
        let (start, overlap) = self.align(&snapshot);
        let mut rows = Vec::with_capacity(snapshot.len());
        for (i, record) in snapshot.into_iter().enumerate() {
            let seq = if i < overlap {
                self.rows[start + i].seq
            } else {
                let s = self.next_seq;
                self.next_seq += 1;
                s
            };
            rows.push(StoredRecord { seq, record });
        }

        debug!(
            "snapshot gen {}: {} rows, {} kept ids",
            self.generation + 1,
            rows.len(),
            overlap
        );
        self.rows = rows;
        self.generation += 1;
    }

    // Ищем самый длинный хвост старого снимка, который является
    // префиксом нового. Возвращает (начало хвоста, длина).
    fn align(&self, snapshot: &[ConnectionRecord]) -> (usize, usize) {
        let Some(first) = snapshot.first() else {
            return (0, 0);
        };
        for start in 0..self.rows.len() {
            let tail = &self.rows[start..];
            if tail.len() > snapshot.len() || tail[0].record != *first {
                continue;
            }
            if tail.iter().zip(snapshot).all(|(old, new)| old.record == *new) {
                return (start, tail.len());
            }
        }
        (0, 0)
    }
}
