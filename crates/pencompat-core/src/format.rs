//! Device ordering and text rendering of display rows

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::dataset::{Dataset, DefTable, FamilyTable};
use crate::view::DisplayRow;

/// Label of the bucket holding devices without a family
pub const OTHER_FAMILY_LABEL: &str = "Other";

/// Separator used by the plain-text (copy) rendering
pub const PLAIN_TEXT_SEPARATOR: &str = ", ";

/// Order two device ids by (family id, id).
///
/// An id without a definition sorts as if its family id were empty, so it
/// lands before every device that has a family.
pub fn compare_device_ids(a: &str, b: &str, defs: &DefTable) -> Ordering {
    (family_of(a, defs), a).cmp(&(family_of(b, defs), b))
}

/// Family id of a device, "" when undefined or family-less
pub fn family_of<'a>(id: &str, defs: &'a DefTable) -> &'a str {
    defs.get(id).map(|d| d.family_id.as_str()).unwrap_or("")
}

/// Sort ids in place by [`compare_device_ids`]
pub fn sort_device_ids(ids: &mut [String], defs: &DefTable) {
    ids.sort_by(|a, b| compare_device_ids(a, b, defs));
}

/// Render one device id: `"{name} ({id})"` when names are shown and known, the raw id otherwise
pub fn display_text(id: &str, defs: &DefTable, show_names: bool) -> String {
    match defs.get(id) {
        Some(def) if show_names && !def.name.is_empty() => format!("{} ({})", def.name, id),
        _ => id.to_string(),
    }
}

/// Display switches coming from the UI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOptions {
    #[serde(default)]
    pub show_names: bool,
    #[serde(default)]
    pub one_per_line: bool,
    #[serde(default)]
    pub organize_by_family: bool,
}

impl FormatOptions {
    /// Separator between items in the structured view
    pub fn separator(&self) -> &'static str {
        if self.one_per_line {
            "\n"
        } else {
            ""
        }
    }
}

/// Devices of one family within a cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyGroup {
    /// Family id ("" for the Other bucket)
    pub family_id: String,
    /// Family name, falling back to the raw family id
    pub label: String,
    /// Rendered devices
    pub items: Vec<String>,
    /// Items joined with the structured separator
    pub text: String,
}

/// Partition ids by family, buckets ordered by family id.
/// Ids keep their relative order inside a bucket.
pub fn group_by_family(
    ids: &[String],
    defs: &DefTable,
    families: &FamilyTable,
    options: &FormatOptions,
) -> Vec<FamilyGroup> {
    let mut buckets: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for id in ids {
        buckets
            .entry(family_of(id, defs))
            .or_default()
            .push(display_text(id, defs, options.show_names));
    }

    buckets
        .into_iter()
        .map(|(family_id, items)| {
            let label = if family_id.is_empty() {
                OTHER_FAMILY_LABEL.to_string()
            } else {
                families
                    .get(family_id)
                    .map(|f| f.name.clone())
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| family_id.to_string())
            };
            FamilyGroup {
                family_id: family_id.to_string(),
                label,
                text: items.join(options.separator()),
                items,
            }
        })
        .collect()
}

/// One side of a rendered row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "layout", rename_all = "lowercase")]
pub enum FormattedCell {
    Flat { items: Vec<String>, text: String },
    Grouped { groups: Vec<FamilyGroup> },
}

impl FormattedCell {
    fn build(ids: &[String], defs: &DefTable, families: &FamilyTable, options: &FormatOptions) -> Self {
        if options.organize_by_family {
            FormattedCell::Grouped {
                groups: group_by_family(ids, defs, families, options),
            }
        } else {
            let items: Vec<String> = ids
                .iter()
                .map(|id| display_text(id, defs, options.show_names))
                .collect();
            FormattedCell::Flat {
                text: items.join(options.separator()),
                items,
            }
        }
    }

    /// Every rendered item, in display order
    pub fn items(&self) -> Vec<&str> {
        match self {
            FormattedCell::Flat { items, .. } => items.iter().map(String::as_str).collect(),
            FormattedCell::Grouped { groups } => groups
                .iter()
                .flat_map(|g| g.items.iter().map(String::as_str))
                .collect(),
        }
    }

    /// Items joined for copying
    pub fn plain_text(&self) -> String {
        self.items().join(PLAIN_TEXT_SEPARATOR)
    }
}

/// A display row rendered for output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedRow {
    pub tablets: FormattedCell,
    pub pens: FormattedCell,
}

impl FormattedRow {
    /// Copy payload for this row: tablets and pens separated by a tab
    pub fn to_plain_text(&self) -> String {
        format!("{}\t{}", self.tablets.plain_text(), self.pens.plain_text())
    }
}

/// Render a display row with the dataset's definitions
pub fn format_row(row: &DisplayRow, dataset: &Dataset, options: &FormatOptions) -> FormattedRow {
    FormattedRow {
        tablets: FormattedCell::build(
            &row.tablets,
            &dataset.tablet_defs,
            &dataset.tablet_family_defs,
            options,
        ),
        pens: FormattedCell::build(&row.pens, &dataset.pen_defs, &dataset.pen_family_defs, options),
    }
}
