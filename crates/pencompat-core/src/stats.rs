//! Visible/total counts shown next to the matrix

use serde::Serialize;
use std::collections::BTreeSet;

use crate::dataset::Dataset;
use crate::view::DisplayRow;

/// Counts for one filter pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Rows left after filtering
    pub visible_rows: usize,
    /// Distinct tablets in the visible rows
    pub visible_tablets: usize,
    /// Distinct tablets in the whole dataset
    pub total_tablets: usize,
    /// Distinct pens in the visible rows
    pub visible_pens: usize,
    /// Distinct pens in the whole dataset
    pub total_pens: usize,
}

impl Stats {
    /// Count the filtered rows against the full dataset
    pub fn compute(visible: &[DisplayRow], dataset: &Dataset) -> Self {
        let tablets: BTreeSet<&str> = visible
            .iter()
            .flat_map(|r| r.tablets.iter().map(String::as_str))
            .collect();
        let pens: BTreeSet<&str> = visible
            .iter()
            .flat_map(|r| r.pens.iter().map(String::as_str))
            .collect();

        Self {
            visible_rows: visible.len(),
            visible_tablets: tablets.len(),
            total_tablets: dataset.distinct_tablets().len(),
            visible_pens: pens.len(),
            total_pens: dataset.distinct_pens().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::EffectiveRow;
    use crate::search::filter_rows;
    use crate::view::{project, ViewMode};

    #[test]
    fn test_stats_after_filter() {
        let mut ds = Dataset::new();
        ds.rows.push(EffectiveRow::new(["T1", "T2"], ["P1"]));
        ds.rows.push(EffectiveRow::new(["T3"], ["P1", "P2"]));

        let rows = project(&ds, ViewMode::Ungrouped);
        let all = Stats::compute(&rows, &ds);
        assert_eq!(all.visible_rows, 4);
        assert_eq!(all.visible_tablets, 3);
        assert_eq!(all.total_tablets, 3);
        assert_eq!(all.visible_pens, 2);
        assert_eq!(all.total_pens, 2);

        let visible = filter_rows(&rows, "T3", &ds).unwrap();
        let stats = Stats::compute(&visible, &ds);
        assert_eq!(
            stats,
            Stats {
                visible_rows: 2,
                visible_tablets: 1,
                total_tablets: 3,
                visible_pens: 2,
                total_pens: 2,
            }
        );
    }

    #[test]
    fn test_stats_no_match() {
        let mut ds = Dataset::new();
        ds.rows.push(EffectiveRow::new(["T1"], ["P1"]));
        let stats = Stats::compute(&[], &ds);
        assert_eq!(stats.visible_rows, 0);
        assert_eq!(stats.total_tablets, 1);
    }
}
