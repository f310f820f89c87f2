//! View projection of effective rows into display rows

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::dataset::{Dataset, DefTable, EffectiveRow};
use crate::format::{compare_device_ids, sort_device_ids};

/// How compatibility rows are shaped for display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    /// One row per authored compatibility row
    #[default]
    Grouped,
    /// One row per (tablet, pen) pair
    Ungrouped,
    /// One row per pen listing every tablet it works with
    ByPen,
    /// One row per tablet listing every pen it works with
    ByTablet,
}

impl ViewMode {
    pub const ALL: [ViewMode; 4] = [
        ViewMode::Grouped,
        ViewMode::Ungrouped,
        ViewMode::ByPen,
        ViewMode::ByTablet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Grouped => "grouped",
            ViewMode::Ungrouped => "ungrouped",
            ViewMode::ByPen => "by-pen",
            ViewMode::ByTablet => "by-tablet",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown view mode: {}", s))
    }
}

/// Unit handed to rendering: ordered tablets and pens
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRow {
    pub tablets: Vec<String>,
    pub pens: Vec<String>,
}

fn sorted<'a>(ids: impl IntoIterator<Item = &'a String>, defs: &DefTable) -> Vec<String> {
    let mut out: Vec<String> = ids.into_iter().cloned().collect();
    sort_device_ids(&mut out, defs);
    out
}

/// Project the dataset's rows into display rows for a view mode
pub fn project(dataset: &Dataset, mode: ViewMode) -> Vec<DisplayRow> {
    let rows = &dataset.rows;
    let tablet_defs = &dataset.tablet_defs;
    let pen_defs = &dataset.pen_defs;

    match mode {
        ViewMode::Grouped => rows
            .iter()
            .map(|row| DisplayRow {
                tablets: sorted(&row.tablets, tablet_defs),
                pens: sorted(&row.pens, pen_defs),
            })
            .collect(),
        ViewMode::Ungrouped => {
            let mut out = Vec::new();
            for row in rows {
                let tablets = sorted(&row.tablets, tablet_defs);
                let pens = sorted(&row.pens, pen_defs);
                for tablet in &tablets {
                    for pen in &pens {
                        out.push(DisplayRow {
                            tablets: vec![tablet.clone()],
                            pens: vec![pen.clone()],
                        });
                    }
                }
            }
            out
        }
        ViewMode::ByPen => aggregate(rows, |r| &r.pens, |r| &r.tablets, pen_defs, tablet_defs)
            .into_iter()
            .map(|(pen, tablets)| DisplayRow {
                tablets,
                pens: vec![pen],
            })
            .collect(),
        ViewMode::ByTablet => {
            aggregate(rows, |r| &r.tablets, |r| &r.pens, tablet_defs, pen_defs)
                .into_iter()
                .map(|(tablet, pens)| DisplayRow {
                    tablets: vec![tablet],
                    pens,
                })
                .collect()
        }
    }
}

/// For every key id, union the partner ids of each row containing it.
///
/// Returns `(key, sorted partners)` ordered by the key definitions.
fn aggregate<'a>(
    rows: &'a [EffectiveRow],
    keys: impl Fn(&'a EffectiveRow) -> &'a BTreeSet<String>,
    partners: impl Fn(&'a EffectiveRow) -> &'a BTreeSet<String>,
    key_defs: &DefTable,
    partner_defs: &DefTable,
) -> Vec<(String, Vec<String>)> {
    let mut union: HashMap<&'a String, BTreeSet<&'a String>> = HashMap::new();
    for row in rows {
        let row_partners = partners(row);
        for key in keys(row) {
            union.entry(key).or_default().extend(row_partners.iter());
        }
    }

    let mut out: Vec<(String, Vec<String>)> = union
        .into_iter()
        .map(|(key, set)| (key.clone(), sorted(set, partner_defs)))
        .collect();
    out.sort_by(|a, b| compare_device_ids(&a.0, &b.0, key_defs));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DeviceDef;

    fn sample() -> Dataset {
        let mut ds = Dataset::new();
        ds.tablet_defs.insert("T1".into(), DeviceDef::new("T1", "One", "B"));
        ds.tablet_defs.insert("T2".into(), DeviceDef::new("T2", "Two", "A"));
        ds.pen_defs.insert("P2".into(), DeviceDef::new("P2", "Pen 2", "A"));
        ds.rows.push(EffectiveRow::new(["T1", "T2"], ["P1", "P2"]));
        ds.rows.push(EffectiveRow::new(["T3"], ["P1"]));
        ds.rows.push(EffectiveRow::new(["T1"], Vec::<String>::new()));
        ds
    }

    fn strings(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_view_mode_parse() {
        assert_eq!("by-pen".parse::<ViewMode>(), Ok(ViewMode::ByPen));
        assert_eq!("Grouped".parse::<ViewMode>(), Ok(ViewMode::Grouped));
        assert!("sideways".parse::<ViewMode>().is_err());
        for mode in ViewMode::ALL {
            assert_eq!(mode.to_string().parse::<ViewMode>(), Ok(mode));
        }
        assert_eq!(ViewMode::default(), ViewMode::Grouped);
        assert_eq!(serde_json::to_string(&ViewMode::ByTablet).unwrap(), "\"by-tablet\"");
    }

    #[test]
    fn test_grouped() {
        let rows = project(&sample(), ViewMode::Grouped);
        assert_eq!(rows.len(), 3);
        // T2 is in family A, T1 in family B
        assert_eq!(rows[0].tablets, strings(&["T2", "T1"]));
        // P1 is undefined so it sorts first
        assert_eq!(rows[0].pens, strings(&["P1", "P2"]));
    }

    #[test]
    fn test_ungrouped_cardinality() {
        let ds = sample();
        let rows = project(&ds, ViewMode::Ungrouped);
        let expected: usize = ds.rows.iter().map(|r| r.tablets.len() * r.pens.len()).sum();
        assert_eq!(rows.len(), expected);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], DisplayRow { tablets: strings(&["T2"]), pens: strings(&["P1"]) });
        assert!(rows.iter().all(|r| r.tablets.len() == 1 && r.pens.len() == 1));
    }

    #[test]
    fn test_by_pen() {
        let rows = project(&sample(), ViewMode::ByPen);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].pens, strings(&["P1"]));
        assert_eq!(rows[0].tablets, strings(&["T3", "T2", "T1"]));
        assert_eq!(rows[1].pens, strings(&["P2"]));
        assert_eq!(rows[1].tablets, strings(&["T2", "T1"]));
    }

    #[test]
    fn test_by_tablet_is_complete() {
        let ds = sample();
        let rows = project(&ds, ViewMode::ByTablet);

        let projected: BTreeSet<&str> = rows
            .iter()
            .flat_map(|r| r.tablets.iter().map(String::as_str))
            .collect();
        assert_eq!(projected, ds.distinct_tablets());

        let order: Vec<&str> = rows.iter().map(|r| r.tablets[0].as_str()).collect();
        assert_eq!(order, vec!["T3", "T2", "T1"]);
        assert_eq!(rows[2].pens, strings(&["P1", "P2"]));
        assert_eq!(rows[0].pens, strings(&["P1"]));
    }

    #[test]
    fn test_empty_dataset() {
        let ds = Dataset::new();
        for mode in ViewMode::ALL {
            assert!(project(&ds, mode).is_empty());
        }
    }
}
