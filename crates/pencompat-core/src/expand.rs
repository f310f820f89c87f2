//! Family expansion and definition checks
//!
//! Rows may name whole families (`<tabletfamily>`, `<penfamily>`) instead of
//! listing every device. Expansion replaces each family reference with the
//! devices whose `familyid` points at it.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::dataset::{Dataset, DefTable, EffectiveRow};
use crate::diagnostics::{DeviceKind, Diagnostics, ValidationWarning};
use crate::parse::{CompatFact, RawDataset};

/// Reverse index from family id to member device ids
#[derive(Debug, Clone, Default)]
pub struct FamilyIndex {
    members: HashMap<String, BTreeSet<String>>,
}

impl FamilyIndex {
    /// Build the index from the `family_id` of each definition.
    /// Definitions without a family are not indexed.
    pub fn from_defs(defs: &DefTable) -> Self {
        let mut members: HashMap<String, BTreeSet<String>> = HashMap::new();
        for def in defs.values() {
            if def.family_id.is_empty() {
                continue;
            }
            members
                .entry(def.family_id.clone())
                .or_default()
                .insert(def.id.clone());
        }
        Self { members }
    }

    /// Members of a family, if any definition belongs to it
    pub fn members(&self, family_id: &str) -> Option<&BTreeSet<String>> {
        self.members.get(family_id)
    }
}

/// Union direct ids with the members of each referenced family.
/// Unknown families contribute nothing and are collected into `unknown`.
fn expand_side(
    direct: BTreeSet<String>,
    families: &BTreeSet<String>,
    index: &FamilyIndex,
    unknown: &mut BTreeSet<String>,
) -> BTreeSet<String> {
    let mut ids = direct;
    for family in families {
        match index.members(family) {
            Some(members) => ids.extend(members.iter().cloned()),
            None => {
                unknown.insert(family.clone());
            }
        }
    }
    ids
}

/// Turn raw facts into effective rows, moving the definition tables into the dataset
pub fn expand_facts(raw: RawDataset, diagnostics: &mut Diagnostics) -> Dataset {
    let tablet_index = FamilyIndex::from_defs(&raw.tablet_defs);
    let pen_index = FamilyIndex::from_defs(&raw.pen_defs);

    let mut unknown_tablet_families = BTreeSet::new();
    let mut unknown_pen_families = BTreeSet::new();

    let rows = raw
        .facts
        .into_iter()
        .map(|fact| {
            let CompatFact {
                tablet_ids,
                pen_ids,
                tablet_families,
                pen_families,
            } = fact;
            EffectiveRow {
                tablets: expand_side(
                    tablet_ids,
                    &tablet_families,
                    &tablet_index,
                    &mut unknown_tablet_families,
                ),
                pens: expand_side(pen_ids, &pen_families, &pen_index, &mut unknown_pen_families),
            }
        })
        .collect();

    for id in unknown_tablet_families {
        diagnostics.push(ValidationWarning::UnknownFamily {
            device: DeviceKind::Tablet,
            id,
        });
    }
    for id in unknown_pen_families {
        diagnostics.push(ValidationWarning::UnknownFamily {
            device: DeviceKind::Pen,
            id,
        });
    }

    Dataset {
        rows,
        tablet_defs: raw.tablet_defs,
        pen_defs: raw.pen_defs,
        tablet_family_defs: raw.tablet_family_defs,
        pen_family_defs: raw.pen_family_defs,
    }
}

/// Report ids used by rows without a definition, and definitions no row uses.
///
/// Missing pens carry the tablets of every row they appeared in, since pen
/// ids usually arrive through rows written from the tablet side.
pub fn check_definitions(dataset: &Dataset, diagnostics: &mut Diagnostics) {
    let mut missing_tablets = BTreeSet::new();
    let mut missing_pens: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for row in &dataset.rows {
        for tablet in &row.tablets {
            if !dataset.tablet_defs.contains_key(tablet) {
                missing_tablets.insert(tablet.as_str());
            }
        }
        for pen in &row.pens {
            if !dataset.pen_defs.contains_key(pen) {
                missing_pens
                    .entry(pen.clone())
                    .or_default()
                    .extend(row.tablets.iter().cloned());
            }
        }
    }

    diagnostics.missing_tablets(missing_tablets);
    diagnostics.missing_pens(missing_pens);

    let used_tablets = dataset.distinct_tablets();
    let used_pens = dataset.distinct_pens();

    let mut unused_tablets: Vec<&String> = dataset
        .tablet_defs
        .keys()
        .filter(|id| !used_tablets.contains(id.as_str()))
        .collect();
    unused_tablets.sort();
    for id in unused_tablets {
        diagnostics.push(ValidationWarning::UnusedDefinition {
            device: DeviceKind::Tablet,
            id: id.clone(),
        });
    }

    let mut unused_pens: Vec<&String> = dataset
        .pen_defs
        .keys()
        .filter(|id| !used_pens.contains(id.as_str()))
        .collect();
    unused_pens.sort();
    for id in unused_pens {
        diagnostics.push(ValidationWarning::UnusedDefinition {
            device: DeviceKind::Pen,
            id: id.clone(),
        });
    }
}
