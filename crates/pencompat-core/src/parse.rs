//! XML dataset parsing
//!
//! The dataset is a flat XML document holding device definitions, family
//! labels and compatibility rows in any order:
//!
//! ```xml
//! <compat>
//!   <tabletdef id="T1" name="Pro" familyid="F"/>
//!   <pendef id="P1" name="Pen"/>
//!   <tabletfamilydef id="F" name="Pro family"/>
//!   <compatrow>
//!     <tablet>T1 T2</tablet>
//!     <pen>P1</pen>
//!     <penfamily>PF</penfamily>
//!   </compatrow>
//! </compat>
//! ```

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::info;

use crate::dataset::{Dataset, DefTable, DeviceDef, FamilyDef, FamilyTable};
use crate::diagnostics::{Diagnostics, ValidationWarning};
use crate::expand::{check_definitions, expand_facts};

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to parse dataset at byte {position}: {message}")]
    Parse { position: u64, message: String },
}

impl DatasetError {
    fn parse(position: u64, message: impl Into<String>) -> Self {
        DatasetError::Parse {
            position,
            message: message.into(),
        }
    }
}

/// One `<compatrow>` as authored, before family expansion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompatFact {
    pub tablet_ids: BTreeSet<String>,
    pub pen_ids: BTreeSet<String>,
    pub tablet_families: BTreeSet<String>,
    pub pen_families: BTreeSet<String>,
}

/// Definitions and raw facts exactly as found in one document
#[derive(Debug, Clone, Default, Serialize)]
pub struct RawDataset {
    pub facts: Vec<CompatFact>,
    pub tablet_defs: DefTable,
    pub pen_defs: DefTable,
    pub tablet_family_defs: FamilyTable,
    pub pen_family_defs: FamilyTable,
}

/// A loaded dataset together with everything noticed while loading it
#[derive(Debug, Clone, Default, Serialize)]
pub struct Loaded {
    pub dataset: Dataset,
    pub diagnostics: Diagnostics,
}

/// Parse, expand and validate one XML document.
///
/// Fails only when the document is not well-formed XML. Missing or unused
/// definitions and unknown families are reported in `Loaded::diagnostics`
/// and logged, but never change the returned data.
pub fn load_dataset(xml: &str) -> Result<Loaded, DatasetError> {
    let Loaded {
        dataset,
        mut diagnostics,
    } = parse_dataset(xml)?;
    check_definitions(&dataset, &mut diagnostics);
    diagnostics.log("document");

    info!(
        rows = dataset.rows.len(),
        tablets = dataset.tablet_defs.len(),
        pens = dataset.pen_defs.len(),
        warnings = diagnostics.len(),
        "Loaded dataset"
    );

    Ok(Loaded {
        dataset,
        diagnostics,
    })
}

/// Parse and expand one XML document without checking definitions.
///
/// Used when several documents are merged and definitions are only
/// meaningful across all of them. The diagnostics hold only what a single
/// document can tell: unknown families and definitions without an id.
pub fn parse_dataset(xml: &str) -> Result<Loaded, DatasetError> {
    let (raw, mut diagnostics) = RawDataset::from_xml(xml)?;
    let dataset = expand_facts(raw, &mut diagnostics);
    Ok(Loaded {
        dataset,
        diagnostics,
    })
}

/// Child list of a `<compatrow>` currently being read
#[derive(Debug, Clone, Copy)]
enum RowList {
    Tablet,
    Pen,
    TabletFamily,
    PenFamily,
}

impl RowList {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"tablet" => Some(RowList::Tablet),
            b"pen" => Some(RowList::Pen),
            b"tabletfamily" => Some(RowList::TabletFamily),
            b"penfamily" => Some(RowList::PenFamily),
            _ => None,
        }
    }
}

impl CompatFact {
    fn list_mut(&mut self, list: RowList) -> &mut BTreeSet<String> {
        match list {
            RowList::Tablet => &mut self.tablet_ids,
            RowList::Pen => &mut self.pen_ids,
            RowList::TabletFamily => &mut self.tablet_families,
            RowList::PenFamily => &mut self.pen_families,
        }
    }

    /// Add whitespace-separated tokens of a list's whole text content
    fn add_tokens(&mut self, list: RowList, text: &str) {
        self.list_mut(list)
            .extend(text.split_whitespace().map(str::to_string));
    }
}

impl RawDataset {
    /// Parse an XML document without expanding families
    pub fn from_xml(xml: &str) -> Result<(Self, Diagnostics), DatasetError> {
        // Whitespace is significant between nested text inside a list
        let mut reader = Reader::from_str(xml);

        let mut raw = RawDataset::default();
        let mut diagnostics = Diagnostics::new();

        let mut depth = 0usize;
        let mut seen_root = false;
        let mut row: Option<CompatFact> = None;
        // Open list with the depth of its element, and its text so far
        let mut list: Option<(RowList, usize)> = None;
        let mut text = String::new();

        loop {
            let position = reader.buffer_position() as u64;
            let event = reader
                .read_event()
                .map_err(|e| DatasetError::parse(position, e.to_string()))?;

            match event {
                Event::Start(ref e) => {
                    if depth == 0 {
                        if seen_root {
                            return Err(DatasetError::parse(position, "multiple root elements"));
                        }
                        seen_root = true;
                    }
                    depth += 1;

                    if list.is_some() {
                        // Markup inside a list only contributes its text
                        continue;
                    }

                    let name = e.name();
                    match name.as_ref() {
                        b"compatrow" => row = Some(CompatFact::default()),
                        other => {
                            if row.is_some() {
                                if let Some(kind) = RowList::from_name(other) {
                                    list = Some((kind, depth));
                                    text.clear();
                                    continue;
                                }
                            }
                            raw.read_definition(e, &mut diagnostics, position)?;
                        }
                    }
                }
                Event::Empty(ref e) => {
                    if depth == 0 {
                        if seen_root {
                            return Err(DatasetError::parse(position, "multiple root elements"));
                        }
                        seen_root = true;
                    }
                    if list.is_some() {
                        continue;
                    }
                    if e.name().as_ref() == b"compatrow" {
                        raw.facts.push(CompatFact::default());
                    } else {
                        raw.read_definition(e, &mut diagnostics, position)?;
                    }
                }
                Event::End(ref e) => {
                    match list {
                        Some((kind, open_depth)) if open_depth == depth => {
                            if let Some(fact) = row.as_mut() {
                                fact.add_tokens(kind, &text);
                            }
                            list = None;
                        }
                        Some(_) => {}
                        None => {
                            if e.name().as_ref() == b"compatrow" {
                                if let Some(fact) = row.take() {
                                    raw.facts.push(fact);
                                }
                            }
                        }
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Text(ref t) => {
                    let content = t
                        .unescape()
                        .map_err(|e| DatasetError::parse(position, e.to_string()))?;
                    if depth == 0 {
                        if !content.trim().is_empty() {
                            return Err(DatasetError::parse(position, "text outside root element"));
                        }
                    } else if list.is_some() {
                        text.push_str(&content);
                    }
                }
                Event::CData(ref c) => {
                    if list.is_some() {
                        text.push_str(&String::from_utf8_lossy(c));
                    }
                }
                Event::Eof => {
                    if depth > 0 {
                        return Err(DatasetError::parse(position, "unexpected end of document"));
                    }
                    if !seen_root {
                        return Err(DatasetError::parse(position, "no root element"));
                    }
                    break;
                }
                _ => {}
            }
        }

        Ok((raw, diagnostics))
    }

    fn read_definition(
        &mut self,
        e: &BytesStart,
        diagnostics: &mut Diagnostics,
        position: u64,
    ) -> Result<(), DatasetError> {
        let name = e.name();
        let element = name.as_ref();
        let is_device = matches!(element, b"tabletdef" | b"pendef");
        let is_family = matches!(element, b"tabletfamilydef" | b"penfamilydef");
        if !is_device && !is_family {
            return Ok(());
        }

        let Some(id) = attribute(e, b"id", position)? else {
            diagnostics.push(ValidationWarning::DefinitionWithoutId {
                element: String::from_utf8_lossy(element).into_owned(),
            });
            return Ok(());
        };
        let label = attribute(e, b"name", position)?.unwrap_or_default();

        match element {
            b"tabletdef" | b"pendef" => {
                let family_id = attribute(e, b"familyid", position)?.unwrap_or_default();
                let table = if element == b"tabletdef" {
                    &mut self.tablet_defs
                } else {
                    &mut self.pen_defs
                };
                table.insert(id.clone(), DeviceDef::new(id, label, family_id));
            }
            _ => {
                let table = if element == b"tabletfamilydef" {
                    &mut self.tablet_family_defs
                } else {
                    &mut self.pen_family_defs
                };
                table.insert(id.clone(), FamilyDef { id, name: label });
            }
        }
        Ok(())
    }
}

/// Read and unescape an attribute value
fn attribute(e: &BytesStart, key: &[u8], position: u64) -> Result<Option<String>, DatasetError> {
    let attr = e
        .try_get_attribute(key)
        .map_err(|err| DatasetError::parse(position, err.to_string()))?;
    match attr {
        Some(a) => {
            let value = a
                .unescape_value()
                .map_err(|err| DatasetError::parse(position, err.to_string()))?;
            Ok(Some(value.into_owned()))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<compat>
    <tabletdef id="T1" name="Pro" familyid="F"/>
    <tabletdef id="T2" name="Pro Large" familyid="F"></tabletdef>
    <pendef id="P1" name="Pen"/>
    <tabletfamilydef id="F" name="Pro family"/>
    <penfamilydef id="PF" name="Pen family"/>
    <compatrow>
        <tablet>T1
            T2</tablet>
        <pen>P1</pen>
        <penfamily>PF</penfamily>
    </compatrow>
    <compatrow>
        <tabletfamily>  F  </tabletfamily>
        <pen>P2 P2</pen>
    </compatrow>
</compat>"#;

    #[test]
    fn test_parse_definitions() {
        let (raw, diag) = RawDataset::from_xml(SAMPLE).unwrap();
        assert!(diag.is_empty());

        assert_eq!(raw.tablet_defs.len(), 2);
        assert_eq!(raw.tablet_defs["T1"], DeviceDef::new("T1", "Pro", "F"));
        assert_eq!(raw.tablet_defs["T2"].name, "Pro Large");
        assert_eq!(raw.pen_defs["P1"].family_id, "");
        assert_eq!(raw.tablet_family_defs["F"].name, "Pro family");
        assert_eq!(raw.pen_family_defs["PF"].name, "Pen family");
    }

    #[test]
    fn test_parse_rows() {
        let (raw, _) = RawDataset::from_xml(SAMPLE).unwrap();
        assert_eq!(raw.facts.len(), 2);

        let first = &raw.facts[0];
        assert_eq!(first.tablet_ids.iter().collect::<Vec<_>>(), vec!["T1", "T2"]);
        assert_eq!(first.pen_ids.iter().collect::<Vec<_>>(), vec!["P1"]);
        assert_eq!(first.pen_families.iter().collect::<Vec<_>>(), vec!["PF"]);
        assert!(first.tablet_families.is_empty());

        let second = &raw.facts[1];
        assert_eq!(second.tablet_families.iter().collect::<Vec<_>>(), vec!["F"]);
        assert_eq!(second.pen_ids.len(), 1);
    }

    #[test]
    fn test_repeated_child_lists_accumulate() {
        let xml = "<c><compatrow><tablet>A</tablet><pen>X</pen><tablet>B</tablet></compatrow></c>";
        let (raw, _) = RawDataset::from_xml(xml).unwrap();
        assert_eq!(raw.facts[0].tablet_ids.len(), 2);
    }

    #[test]
    fn test_nested_markup_in_lists_keeps_text() {
        let xml = "<c><compatrow><tablet><b>T1</b> T2</tablet><pen>P</pen></compatrow></c>";
        let (raw, diag) = RawDataset::from_xml(xml).unwrap();
        assert!(diag.is_empty());
        assert_eq!(raw.facts[0].tablet_ids.iter().collect::<Vec<_>>(), vec!["T1", "T2"]);
        assert_eq!(raw.facts[0].pen_ids.iter().collect::<Vec<_>>(), vec!["P"]);

        let xml = "<c><compatrow><pen>P1<i>P2</i>P3<br/> P4</pen></compatrow></c>";
        let (raw, _) = RawDataset::from_xml(xml).unwrap();
        assert_eq!(
            raw.facts[0].pen_ids.iter().collect::<Vec<_>>(),
            vec!["P1P2P3", "P4"]
        );
    }

    #[test]
    fn test_list_text_is_split_once() {
        let xml = "<c><compatrow><tablet>T1<!-- x -->T2 <![CDATA[T3]]></tablet></compatrow></c>";
        let (raw, _) = RawDataset::from_xml(xml).unwrap();
        assert_eq!(raw.facts[0].tablet_ids.iter().collect::<Vec<_>>(), vec!["T1T2", "T3"]);
    }

    #[test]
    fn test_parse_dataset_skips_definition_checks() {
        let xml = r#"<c><tabletdef id="T9"/><compatrow><tablet>T1</tablet><tabletfamily>F</tabletfamily></compatrow></c>"#;
        let loaded = parse_dataset(xml).unwrap();
        assert!(loaded.diagnostics.missing_tablet_ids().is_empty());
        assert!(loaded.diagnostics.unused(crate::DeviceKind::Tablet).is_empty());
        assert_eq!(loaded.diagnostics.unknown_families(crate::DeviceKind::Tablet), vec!["F"]);

        let loaded = load_dataset(xml).unwrap();
        assert_eq!(loaded.diagnostics.missing_tablet_ids(), vec!["T1"]);
        assert_eq!(loaded.diagnostics.unused(crate::DeviceKind::Tablet), vec!["T9"]);
    }

    #[test]
    fn test_entities_in_names() {
        let xml = r#"<c><pendef id="P&amp;1" name="Pen &quot;Pro&quot;"/></c>"#;
        let (raw, _) = RawDataset::from_xml(xml).unwrap();
        assert_eq!(raw.pen_defs["P&1"].name, "Pen \"Pro\"");
    }

    #[test]
    fn test_definition_without_id_is_skipped() {
        let xml = r#"<c><tabletdef name="Nameless"/><tabletdef id="T1"/></c>"#;
        let (raw, diag) = RawDataset::from_xml(xml).unwrap();
        assert_eq!(raw.tablet_defs.len(), 1);
        assert_eq!(raw.tablet_defs["T1"].name, "");
        assert_eq!(
            diag.warnings(),
            &[ValidationWarning::DefinitionWithoutId {
                element: "tabletdef".to_string()
            }]
        );
    }

    #[test]
    fn test_malformed_xml_fails() {
        assert!(matches!(
            RawDataset::from_xml("<c><compatrow></c>"),
            Err(DatasetError::Parse { .. })
        ));
        assert!(RawDataset::from_xml("<c><tablet>T1</tablet>").is_err());
        assert!(RawDataset::from_xml("").is_err());
        assert!(RawDataset::from_xml("<a/><b/>").is_err());
        assert!(RawDataset::from_xml("<c><tabletdef id=T1/></c>").is_err());
    }

    #[test]
    fn test_load_dataset_scenario() {
        let xml = r#"<compat>
            <tabletdef id="T1" name="Pro" familyid="F"/>
            <pendef id="P1" name="Pen"/>
            <compatrow><tablet>T1</tablet><pen>P1</pen></compatrow>
        </compat>"#;

        let loaded = load_dataset(xml).unwrap();
        assert!(loaded.diagnostics.is_empty());
        assert_eq!(loaded.dataset.rows.len(), 1);
        assert!(loaded.dataset.rows[0].tablets.contains("T1"));
        assert!(loaded.dataset.rows[0].pens.contains("P1"));
    }

    #[test]
    fn test_load_dataset_keeps_undefined_ids() {
        let xml = "<c><compatrow><tablet>T1</tablet><pen>P1</pen></compatrow></c>";
        let loaded = load_dataset(xml).unwrap();

        assert_eq!(loaded.dataset.rows[0].tablets.len(), 1);
        assert_eq!(loaded.dataset.rows[0].pens.len(), 1);
        assert_eq!(loaded.diagnostics.missing_tablet_ids(), vec!["T1"]);
        assert_eq!(loaded.diagnostics.missing_pen_ids().len(), 1);
    }
}
