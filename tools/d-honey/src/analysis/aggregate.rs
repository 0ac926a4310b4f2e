use crate::api::model::ConnectionRecord;
use chrono::{DateTime, Timelike, Utc};
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

pub const TOP_PORTS: usize = 5;

// Формат ключа минутной корзины: 2024-03-01T10:00:00.000Z
const BUCKET_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpCount {
    pub ip: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCount {
    pub port: u16,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeBucket {
    pub time: String,
    pub attempts: usize,
}

/// Всё, что рисует дашборд, посчитанное по одному снимку.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregates {
    pub total: usize,
    pub top_ips: Vec<IpCount>,
    pub top_ports: Vec<PortCount>,
    pub timeline: Vec<TimeBucket>,
}

impl Aggregates {
    pub fn compute<'a, I>(rows: I, top_n: usize) -> Self
    where
        I: IntoIterator<Item = &'a ConnectionRecord> + Clone,
    {
        Aggregates {
            total: rows.clone().into_iter().count(),
            top_ips: top_ips(rows.clone(), top_n),
            top_ports: top_ports(rows.clone()),
            timeline: time_buckets(rows),
        }
    }
}

/// Самые активные источники. При равенстве раньше идёт тот IP,
/// который встретился в снимке первым.
pub fn top_ips<'a>(rows: impl IntoIterator<Item = &'a ConnectionRecord>, n: usize) -> Vec<IpCount> {
    ranked(rows.into_iter().map(|r| r.src_ip.clone()), n)
        .into_iter()
        .map(|(ip, count)| IpCount { ip, count })
        .collect()
}

pub fn top_ports<'a>(rows: impl IntoIterator<Item = &'a ConnectionRecord>) -> Vec<PortCount> {
    ranked(rows.into_iter().map(|r| r.dst_port), TOP_PORTS)
        .into_iter()
        .map(|(port, count)| PortCount { port, count })
        .collect()
}

/// Попытки по минутам, по возрастанию времени. Записи с битым
/// timestamp пропускаются.
pub fn time_buckets<'a>(rows: impl IntoIterator<Item = &'a ConnectionRecord>) -> Vec<TimeBucket> {
    let mut buckets: BTreeMap<String, usize> = BTreeMap::new();
    for r in rows {
        match r.parsed_time().and_then(truncate_to_minute) {
            Some(minute) => *buckets.entry(minute.format(BUCKET_FORMAT).to_string()).or_insert(0) += 1,
            None => debug!("skipping unparseable timestamp {:?} from {}", r.timestamp, r.src_ip),
        }
    }
    buckets
        .into_iter()
        .map(|(time, attempts)| TimeBucket { time, attempts })
        .collect()
}

pub fn truncate_to_minute(t: DateTime<Utc>) -> Option<DateTime<Utc>> {
    t.with_second(0)?.with_nanosecond(0)
}

fn ranked<K: Eq + Hash + Clone>(keys: impl Iterator<Item = K>, n: usize) -> Vec<(K, usize)> {
    // Порядок первого появления + индекс для подсчёта
    let mut order: Vec<(K, usize)> = Vec::new();
    let mut index: HashMap<K, usize> = HashMap::new();
    for key in keys {
        match index.get(&key) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(key.clone(), order.len());
                order.push((key, 1));
            }
        }
    }
    // sort_by стабильный, ничьи остаются в порядке появления
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order.truncate(n);
    order
}
