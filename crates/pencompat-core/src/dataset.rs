//! Dataset types: device and family definitions plus effective compatibility rows

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A tablet or pen definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDef {
    /// Device identifier as used in compatibility rows
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Family the device belongs to ("" when it has none)
    #[serde(default)]
    pub family_id: String,
}

impl DeviceDef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, family_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            family_id: family_id.into(),
        }
    }
}

/// A tablet family or pen family label
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyDef {
    pub id: String,
    pub name: String,
}

/// Device definitions keyed by device id
pub type DefTable = HashMap<String, DeviceDef>;

/// Family labels keyed by family id
pub type FamilyTable = HashMap<String, FamilyDef>;

/// One compatibility fact with every family reference resolved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveRow {
    pub tablets: BTreeSet<String>,
    pub pens: BTreeSet<String>,
}

impl EffectiveRow {
    pub fn new<T, P>(tablets: T, pens: P) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            tablets: tablets.into_iter().map(Into::into).collect(),
            pens: pens.into_iter().map(Into::into).collect(),
        }
    }
}

/// A fully expanded dataset, owned independently of any source it was built from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub rows: Vec<EffectiveRow>,
    pub tablet_defs: DefTable,
    pub pen_defs: DefTable,
    pub tablet_family_defs: FamilyTable,
    pub pen_family_defs: FamilyTable,
}

impl Dataset {
    /// Create an empty dataset
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a tablet definition
    pub fn tablet(&self, id: &str) -> Option<&DeviceDef> {
        self.tablet_defs.get(id)
    }

    /// Look up a pen definition
    pub fn pen(&self, id: &str) -> Option<&DeviceDef> {
        self.pen_defs.get(id)
    }

    /// All distinct tablet ids referenced by rows
    pub fn distinct_tablets(&self) -> BTreeSet<&str> {
        self.rows
            .iter()
            .flat_map(|r| r.tablets.iter().map(String::as_str))
            .collect()
    }

    /// All distinct pen ids referenced by rows
    pub fn distinct_pens(&self) -> BTreeSet<&str> {
        self.rows
            .iter()
            .flat_map(|r| r.pens.iter().map(String::as_str))
            .collect()
    }

    /// Fold another dataset into this one: definitions last-write-wins, rows appended
    pub fn absorb(&mut self, other: &Dataset) {
        self.rows.extend(other.rows.iter().cloned());
        for (id, def) in &other.tablet_defs {
            self.tablet_defs.insert(id.clone(), def.clone());
        }
        for (id, def) in &other.pen_defs {
            self.pen_defs.insert(id.clone(), def.clone());
        }
        for (id, def) in &other.tablet_family_defs {
            self.tablet_family_defs.insert(id.clone(), def.clone());
        }
        for (id, def) in &other.pen_family_defs {
            self.pen_family_defs.insert(id.clone(), def.clone());
        }
    }
}

/// Merge datasets in load order into a fresh dataset.
///
/// Definitions sharing an id are resolved last-write-wins without a conflict
/// diagnostic. Rows are concatenated as-is and never deduplicated, so merging
/// a dataset with itself yields every row twice.
pub fn merge_datasets(datasets: &[Dataset]) -> Dataset {
    let mut merged = Dataset::new();
    for dataset in datasets {
        merged.absorb(dataset);
    }
    tracing::debug!(
        sources = datasets.len(),
        rows = merged.rows.len(),
        tablets = merged.tablet_defs.len(),
        pens = merged.pen_defs.len(),
        "Merged datasets"
    );
    merged
}
