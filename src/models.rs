use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

/// One bucket of the clones or views series as GitHub reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct TrafficSample {
    pub timestamp: DateTime<Utc>,
    pub count: u64,
    pub uniques: u64,
}

#[derive(Debug, Deserialize)]
pub struct ClonesResponse {
    #[serde(default)]
    pub clones: Vec<TrafficSample>,
}

#[derive(Debug, Deserialize)]
pub struct ViewsResponse {
    #[serde(default)]
    pub views: Vec<TrafficSample>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReferrerRecord {
    pub referrer: String,
    pub count: u64,
    pub uniques: u64,
}

/// Everything a run fetches, gathered before any local state changes.
#[derive(Debug, Clone, Default)]
pub struct TrafficSnapshot {
    pub clones: Vec<TrafficSample>,
    pub views: Vec<TrafficSample>,
    pub referrers: Vec<ReferrerRecord>,
}

/// One persisted row. `None` means the source did not report the metric for
/// that date, which is different from a reported zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficRecord {
    pub date: NaiveDate,
    pub clones: Option<u64>,
    pub clones_uniques: Option<u64>,
    pub views: Option<u64>,
    pub views_uniques: Option<u64>,
}

impl TrafficRecord {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            clones: None,
            clones_uniques: None,
            views: None,
            views_uniques: None,
        }
    }
}

/// Date-indexed traffic history, ascending by date with one row per date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrafficDataset {
    days: BTreeMap<NaiveDate, TrafficRecord>,
}

impl TrafficDataset {
    /// Inserts `record` only if its date is not present yet. Returns whether
    /// the row was added.
    pub fn insert_new(&mut self, record: TrafficRecord) -> bool {
        if self.days.contains_key(&record.date) {
            return false;
        }
        self.days.insert(record.date, record);
        true
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.days.contains_key(date)
    }

    pub fn get(&self, date: &NaiveDate) -> Option<&TrafficRecord> {
        self.days.get(date)
    }

    pub fn records(&self) -> impl Iterator<Item = &TrafficRecord> {
        self.days.values()
    }

    pub fn dates(&self) -> impl DoubleEndedIterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub(crate) fn entry(&mut self, date: NaiveDate) -> &mut TrafficRecord {
        self.days
            .entry(date)
            .or_insert_with(|| TrafficRecord::empty(date))
    }
}

impl FromIterator<TrafficRecord> for TrafficDataset {
    /// Keeps the first record seen for each date.
    fn from_iter<I: IntoIterator<Item = TrafficRecord>>(iter: I) -> Self {
        let mut dataset = Self::default();
        for record in iter {
            dataset.insert_new(record);
        }
        dataset
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Created { rows: usize },
    Appended { rows: usize },
    Unchanged,
}

impl MergeOutcome {
    pub fn needs_write(&self) -> bool {
        !matches!(self, MergeOutcome::Unchanged)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrafficSummary {
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub days: usize,
    pub total_clones: u64,
    pub total_clones_uniques: u64,
    pub total_views: u64,
    pub total_views_uniques: u64,
}
