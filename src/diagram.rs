// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! BPMN diagram documents and embedded KPI tags
//!
//! Layout and drawing belong to the external viewer (see [`crate::render`]).
//! This module only keeps the XML as fetched and scans it for
//! `camunda:property` blocks so elements can be joined to KPI rows.

use crate::error::DashboardError;
use crate::kpi::{KpiRecord, KpiTable};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};

/// BPMN 2.0 model namespace
pub const BPMN_NS: &str = "http://www.omg.org/spec/BPMN/20100524/MODEL";

/// Camunda extension namespace
pub const CAMUNDA_NS: &str = "http://camunda.org/schema/1.0/bpmn";

/// Property name that links an element to a KPI row
pub const KPI_KEY_PROPERTY: &str = "kpi_key";

/// Element kind of a sequence flow
pub const SEQUENCE_FLOW: &str = "sequenceFlow";

// =============================================================================
// Document
// =============================================================================

/// Raw diagram XML exactly as fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramDocument {
    xml: String,
    digest: String,
}

impl DiagramDocument {
    /// Wrap fetched bytes; fails only when they are not UTF-8
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, DashboardError> {
        let xml = String::from_utf8(bytes)
            .map_err(|e| DashboardError::Parse(format!("diagram is not UTF-8: {e}")))?;
        Ok(Self::from_xml(xml))
    }

    /// Wrap XML text
    #[must_use]
    pub fn from_xml(xml: String) -> Self {
        let digest = hex::encode(Sha256::digest(xml.as_bytes()));
        Self { xml, digest }
    }

    /// The XML, unmodified
    #[must_use]
    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// Hex SHA-256 of the XML
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// First 12 digest characters, for display
    #[must_use]
    pub fn short_digest(&self) -> &str {
        &self.digest[..12]
    }

    /// Scan the document for process elements and their properties
    pub fn scan(&self) -> Result<Vec<DiagramElement>, DashboardError> {
        scan_elements(&self.xml)
    }
}

// =============================================================================
// Elements
// =============================================================================

/// An `id`-bearing BPMN element inside a process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramElement {
    /// Element id
    pub id: String,
    /// Local tag name, e.g. `task`, `startEvent`, `sequenceFlow`
    pub kind: String,
    /// Display name, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `camunda:property` name/value pairs attached to this element
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    /// Source node (sequence flows only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
    /// Target node (sequence flows only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<String>,
}

impl DiagramElement {
    /// The element's KPI key, trimmed, when tagged with a non-empty one
    #[must_use]
    pub fn kpi_key(&self) -> Option<&str> {
        self.property(KPI_KEY_PROPERTY).map(str::trim).filter(|k| !k.is_empty())
    }

    /// Value of an embedded property
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Whether this element is a sequence flow
    #[must_use]
    pub fn is_flow(&self) -> bool {
        self.kind == SEQUENCE_FLOW
    }

    /// Name, or id when unnamed
    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Scan BPMN XML for `id`-bearing elements below every `bpmn:process`.
///
/// A `camunda:property` belongs to its nearest `id`-bearing ancestor;
/// repeated property names on one element keep the last value.
pub fn scan_elements(xml: &str) -> Result<Vec<DiagramElement>, DashboardError> {
    let doc = roxmltree::Document::parse(xml)?;

    let mut elements: Vec<DiagramElement> = Vec::new();
    let mut index: BTreeMap<String, usize> = BTreeMap::new();

    let processes = doc
        .descendants()
        .filter(|n| n.has_tag_name((BPMN_NS, "process")));

    for process in processes {
        for node in process.descendants().skip(1) {
            if !node.is_element() {
                continue;
            }

            if node.has_tag_name((CAMUNDA_NS, "property")) {
                let Some(owner) = owning_id(node, process) else {
                    continue;
                };
                if let Some(&i) = index.get(owner) {
                    let name = node.attribute("name").unwrap_or_default();
                    let value = node.attribute("value").unwrap_or_default();
                    elements[i].properties.insert(name.to_string(), value.to_string());
                }
                continue;
            }

            if node.tag_name().namespace() != Some(BPMN_NS) {
                continue;
            }
            let Some(id) = node.attribute("id") else {
                continue;
            };

            let element = DiagramElement {
                id: id.to_string(),
                kind: node.tag_name().name().to_string(),
                name: node
                    .attribute("name")
                    .or_else(|| node.attribute((BPMN_NS, "name")))
                    .filter(|n| !n.is_empty())
                    .map(str::to_string),
                properties: BTreeMap::new(),
                source_ref: node.attribute("sourceRef").map(str::to_string),
                target_ref: node.attribute("targetRef").map(str::to_string),
            };

            match index.get(id) {
                Some(&i) => elements[i] = element,
                None => {
                    index.insert(id.to_string(), elements.len());
                    elements.push(element);
                }
            }
        }
    }

    Ok(elements)
}

/// Nearest `id`-bearing ancestor of `node` strictly inside `process`
fn owning_id<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    process: roxmltree::Node<'a, 'input>,
) -> Option<&'a str> {
    node.ancestors()
        .skip(1)
        .take_while(|a| *a != process)
        .find_map(|a| a.attribute("id"))
}

/// Element names in document order, each once
#[must_use]
pub fn named_tasks(elements: &[DiagramElement]) -> Vec<String> {
    let mut seen = HashSet::new();
    elements
        .iter()
        .filter(|e| !e.is_flow())
        .filter_map(|e| e.name.clone())
        .filter(|n| seen.insert(n.clone()))
        .collect()
}

// =============================================================================
// KPI Links
// =============================================================================

/// How an element relates to the KPI table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KpiLink<'a> {
    /// Tagged and found in the table
    Matched(&'a KpiRecord),
    /// Tagged with a key the table does not have (or no table loaded)
    Unmatched(&'a str),
    /// No `kpi_key` property
    Untagged,
}

impl<'a> KpiLink<'a> {
    /// Resolve one element against an optional table
    #[must_use]
    pub fn resolve(element: &'a DiagramElement, table: Option<&'a KpiTable>) -> Self {
        match element.kpi_key() {
            None => Self::Untagged,
            Some(key) => match table.and_then(|t| t.get(key)) {
                Some(record) => Self::Matched(record),
                None => Self::Unmatched(key),
            },
        }
    }

    /// The matched record, if any
    #[must_use]
    pub fn record(&self) -> Option<&'a KpiRecord> {
        match self {
            Self::Matched(r) => Some(r),
            _ => None,
        }
    }
}

/// An element paired with its KPI link
#[derive(Debug, Clone, Copy)]
pub struct ElementLink<'a> {
    /// The diagram element
    pub element: &'a DiagramElement,
    /// Its resolved link
    pub link: KpiLink<'a>,
}

/// Resolve every tagged element against the table, in document order
#[must_use]
pub fn resolve_links<'a>(
    elements: &'a [DiagramElement],
    table: Option<&'a KpiTable>,
) -> Vec<ElementLink<'a>> {
    elements
        .iter()
        .map(|element| ElementLink { element, link: KpiLink::resolve(element, table) })
        .filter(|l| l.link != KpiLink::Untagged)
        .collect()
}

/// Row of the element → KPI tag mapping shown when no KPI file is available
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRow {
    /// Element id
    pub element_id: String,
    /// Element name
    pub element_name: String,
    /// `kpi_key` property
    pub kpi_key: String,
    /// `kpi_target` property
    pub kpi_target: String,
    /// `owner` property
    pub owner: String,
}

impl TagRow {
    /// Column headers in display order
    pub const HEADERS: [&'static str; 5] = ["element_id", "element_name", "kpi_key", "kpi_target", "owner"];

    /// Cells in header order
    #[must_use]
    pub fn cells(&self) -> [&str; 5] {
        [
            self.element_id.as_str(),
            self.element_name.as_str(),
            self.kpi_key.as_str(),
            self.kpi_target.as_str(),
            self.owner.as_str(),
        ]
    }
}

/// Tag rows for every element that carries embedded properties
#[must_use]
pub fn tag_rows(elements: &[DiagramElement]) -> Vec<TagRow> {
    elements
        .iter()
        .filter(|e| !e.properties.is_empty())
        .map(|e| TagRow {
            element_id: e.id.clone(),
            element_name: e.name.clone().unwrap_or_default(),
            kpi_key: e.kpi_key().unwrap_or_default().to_string(),
            kpi_target: e.property("kpi_target").unwrap_or_default().to_string(),
            owner: e.property("owner").unwrap_or_default().to_string(),
        })
        .collect()
}
