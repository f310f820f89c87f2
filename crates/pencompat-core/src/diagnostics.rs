//! Validation diagnostics collected while loading a dataset
//!
//! None of these are errors: the ids in question still appear in the
//! output and render as their raw id.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};

/// Which device table a diagnostic refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Tablet,
    Pen,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Tablet => write!(f, "tablet"),
            DeviceKind::Pen => write!(f, "pen"),
        }
    }
}

/// A single non-fatal finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// A row references a tablet with no `tabletdef`
    MissingTabletDefinition { id: String },
    /// A row references a pen with no `pendef`; `referenced_by` lists the
    /// tablets of the rows it appeared in
    MissingPenDefinition {
        id: String,
        referenced_by: BTreeSet<String>,
    },
    /// A row references a family no definition belongs to
    UnknownFamily { device: DeviceKind, id: String },
    /// A definition is never referenced by any row
    UnusedDefinition { device: DeviceKind, id: String },
    /// A definition element carries no `id` attribute and was skipped
    DefinitionWithoutId { element: String },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::MissingTabletDefinition { id } => {
                write!(f, "missing tablet definition: {}", id)
            }
            ValidationWarning::MissingPenDefinition { id, referenced_by } => {
                let tablets: Vec<&str> = referenced_by.iter().map(String::as_str).collect();
                write!(f, "missing pen definition: {} (referenced by {})", id, tablets.join(", "))
            }
            ValidationWarning::UnknownFamily { device, id } => {
                write!(f, "unknown {} family: {}", device, id)
            }
            ValidationWarning::UnusedDefinition { device, id } => {
                write!(f, "unused {} definition: {}", device, id)
            }
            ValidationWarning::DefinitionWithoutId { element } => {
                write!(f, "<{}> without id attribute skipped", element)
            }
        }
    }
}

/// Structured side-channel report returned alongside a parsed dataset
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    warnings: Vec<ValidationWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[ValidationWarning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Emit every warning through `tracing`; unused definitions only at debug level
    pub fn log(&self, source: &str) {
        for warning in &self.warnings {
            match warning {
                ValidationWarning::UnusedDefinition { .. } => {
                    debug!(source, %warning, "Dataset diagnostic")
                }
                _ => warn!(source, %warning, "Dataset diagnostic"),
            }
        }
    }

    /// Record missing tablet definitions, one warning per id
    pub fn missing_tablets<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            self.push(ValidationWarning::MissingTabletDefinition { id: id.to_string() });
        }
    }

    /// Record missing pen definitions along with the tablets that referenced them
    pub fn missing_pens(&mut self, pens: BTreeMap<String, BTreeSet<String>>) {
        for (id, referenced_by) in pens {
            self.push(ValidationWarning::MissingPenDefinition { id, referenced_by });
        }
    }

    /// Ids of all missing tablet definitions
    pub fn missing_tablet_ids(&self) -> Vec<&str> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                ValidationWarning::MissingTabletDefinition { id } => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Missing pen ids with the tablets that referenced them
    pub fn missing_pen_ids(&self) -> Vec<(&str, &BTreeSet<String>)> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                ValidationWarning::MissingPenDefinition { id, referenced_by } => {
                    Some((id.as_str(), referenced_by))
                }
                _ => None,
            })
            .collect()
    }

    /// Family ids of the given kind that resolved to nothing
    pub fn unknown_families(&self, kind: DeviceKind) -> Vec<&str> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                ValidationWarning::UnknownFamily { device, id } if *device == kind => {
                    Some(id.as_str())
                }
                _ => None,
            })
            .collect()
    }

    /// Element names of definitions skipped for lacking an id
    pub fn without_id(&self) -> Vec<&str> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                ValidationWarning::DefinitionWithoutId { element } => Some(element.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Definitions of the given kind never referenced by a row
    pub fn unused(&self, kind: DeviceKind) -> Vec<&str> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                ValidationWarning::UnusedDefinition { device, id } if *device == kind => {
                    Some(id.as_str())
                }
                _ => None,
            })
            .collect()
    }
}
