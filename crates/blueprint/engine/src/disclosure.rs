//! Selective disclosure: per-participant projection of action data
//!
//! A data pointer looks like a JSON pointer (`/orderId`, `#/orderId`).
//! Only its first segment is used at projection time: the named top-level
//! field is copied whole, nested structure included. `/*` and `#/*`
//! disclose every field; a bare `*` is an ordinary field name.

use blueprint_types::{DataMap, Disclosure, DisclosureResult};
use tracing::trace;

const WILDCARD: &str = "/*";

/// A parsed data pointer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataPointer {
    /// Every top-level field
    All,
    /// A top-level field, with any deeper segments kept for reference
    Field { name: String, rest: Vec<String> },
}

impl DataPointer {
    /// Parse a pointer. Blank pointers and the bare root yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let path = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if path == WILDCARD {
            return Some(DataPointer::All);
        }
        let path = path.strip_prefix('/').unwrap_or(path);
        if path.is_empty() {
            return None;
        }

        let mut segments = path.split('/').map(unescape);
        let name = segments.next()?;
        Some(DataPointer::Field {
            name,
            rest: segments.collect(),
        })
    }

    /// Top-level field this pointer names, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            DataPointer::All => None,
            DataPointer::Field { name, .. } => Some(name),
        }
    }
}

// `~1` must be replaced before `~0` so that `~01` decodes to `~1`.
fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Project `data` down to the fields one disclosure grants
pub fn apply_disclosure(data: &DataMap, disclosure: &Disclosure) -> DataMap {
    let mut projected = DataMap::new();

    for raw in &disclosure.data_pointers {
        match DataPointer::parse(raw) {
            Some(DataPointer::All) => return data.clone(),
            Some(DataPointer::Field { name, .. }) => {
                if projected.contains_key(&name) {
                    continue;
                }
                if let Some(value) = data.get(&name) {
                    projected.insert(name, value.clone());
                } else {
                    trace!(
                        participant = %disclosure.participant_address,
                        field = %name,
                        "Disclosed field absent"
                    );
                }
            }
            None => {}
        }
    }

    projected
}

/// One disclosure result per disclosure entry, in declaration order
pub fn create_disclosures(data: &DataMap, disclosures: &[Disclosure]) -> Vec<DisclosureResult> {
    disclosures
        .iter()
        .map(|disclosure| DisclosureResult {
            participant_address: disclosure.participant_address.clone(),
            disclosed_data: apply_disclosure(data, disclosure),
        })
        .collect()
}
