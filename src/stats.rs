use crate::models::{TrafficDataset, TrafficSummary};

/// Totals over the whole persisted history. Unreported metrics add nothing.
pub fn build_summary(dataset: &TrafficDataset) -> TrafficSummary {
    let mut summary = TrafficSummary {
        first_date: dataset.dates().next(),
        last_date: dataset.dates().next_back(),
        days: dataset.len(),
        ..TrafficSummary::default()
    };

    for record in dataset.records() {
        summary.total_clones = summary.total_clones.saturating_add(record.clones.unwrap_or(0));
        summary.total_clones_uniques = summary
            .total_clones_uniques
            .saturating_add(record.clones_uniques.unwrap_or(0));
        summary.total_views = summary.total_views.saturating_add(record.views.unwrap_or(0));
        summary.total_views_uniques = summary
            .total_views_uniques
            .saturating_add(record.views_uniques.unwrap_or(0));
    }

    summary
}
