use crate::models::{MergeOutcome, TrafficDataset, TrafficSample};
use tracing::debug;

/// Full outer join of the clones and views series on calendar date.
///
/// Timestamps are reduced to their UTC date. A date reported by only one
/// series keeps the other side's metrics as `None`. When a series carries the
/// same date twice, the later sample wins.
pub fn join_series(clones: &[TrafficSample], views: &[TrafficSample]) -> TrafficDataset {
    let mut dataset = TrafficDataset::default();

    for sample in clones {
        let row = dataset.entry(sample.timestamp.date_naive());
        row.clones = Some(sample.count);
        row.clones_uniques = Some(sample.uniques);
    }

    for sample in views {
        let row = dataset.entry(sample.timestamp.date_naive());
        row.views = Some(sample.count);
        row.views_uniques = Some(sample.uniques);
    }

    debug!(
        clones = clones.len(),
        views = views.len(),
        rows = dataset.len(),
        "joined fetched series"
    );
    dataset
}

/// Folds freshly fetched rows into the persisted history.
///
/// Only dates missing from `existing` are appended; rows already persisted are
/// kept as they are even when the fresh window reports other numbers.
pub fn reconcile(
    existing: Option<TrafficDataset>,
    fresh: TrafficDataset,
) -> (TrafficDataset, MergeOutcome) {
    let Some(mut dataset) = existing else {
        if fresh.is_empty() {
            debug!("no traffic data returned and no history on disk");
            return (fresh, MergeOutcome::Unchanged);
        }
        let rows = fresh.len();
        debug!(rows, "starting a new dataset");
        return (fresh, MergeOutcome::Created { rows });
    };

    let mut appended = 0;
    for record in fresh.records() {
        if dataset.insert_new(record.clone()) {
            appended += 1;
        }
    }

    if appended == 0 {
        debug!("no new data to add");
        (dataset, MergeOutcome::Unchanged)
    } else {
        debug!(rows = appended, "appending new dates");
        (dataset, MergeOutcome::Appended { rows: appended })
    }
}
