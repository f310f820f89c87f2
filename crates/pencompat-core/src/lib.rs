//! Pencompat Core - Dataset parsing, family expansion, views and search
//!
//! This crate provides the pure pipeline behind the tablet/pen compatibility matrix:
//! - XML dataset parsing into definition tables and compatibility facts
//! - Family expansion of compatibility facts into concrete device sets
//! - Merging of datasets loaded from several sources
//! - View projection (grouped, ungrouped, by pen, by tablet)
//! - Glob search filtering, device ordering and text formatting
//! - Visible/total statistics for a filtered view

pub mod dataset;
pub mod diagnostics;
pub mod expand;
pub mod format;
pub mod parse;
pub mod search;
pub mod stats;
pub mod view;

pub use dataset::{merge_datasets, Dataset, DefTable, DeviceDef, EffectiveRow, FamilyDef, FamilyTable};
pub use diagnostics::{DeviceKind, Diagnostics, ValidationWarning};
pub use expand::{check_definitions, expand_facts, FamilyIndex};
pub use format::{
    compare_device_ids, display_text, family_of, format_row, group_by_family, sort_device_ids,
    FamilyGroup, FormatOptions, FormattedCell, FormattedRow,
};
pub use parse::{load_dataset, parse_dataset, CompatFact, DatasetError, Loaded, RawDataset};
pub use search::{compile_token, filter_rows, tokenize, SearchError, SearchFilter};
pub use stats::Stats;
pub use view::{project, DisplayRow, ViewMode};
