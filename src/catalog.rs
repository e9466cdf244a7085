//! The `outputvar` catalog of legal output identifiers.
//!
//! The catalog is split off the descriptor when it is loaded and handed out
//! by shared reference only, so no configuration operation can change it.
//! It is written back unchanged, at its original position, when the
//! descriptor is serialized.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{ConfigResult, ValidationError};
use crate::node::ConfigNode;
use crate::output::Resolution;

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputVar {
    /// Output id, as used in `output` entries.
    pub name: String,
    /// Human-readable description.
    pub descr: Option<String>,
    /// Default temporal resolution, if the catalog declares a valid one.
    pub timestep: Option<Resolution>,
    /// Display index: the entry's numeric `id` if present, else its position.
    pub index: usize,
}

/// Read-only catalog of output variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputCatalog {
    vars: Vec<OutputVar>,
    by_name: HashMap<String, usize>,
    raw: Vec<ConfigNode>,
}

impl OutputCatalog {
    /// Parses the `outputvar` list.
    ///
    /// # Errors
    ///
    /// `ValidationError::FieldType` if the node is not a list of records and
    /// `ValidationError::MissingField` if an entry has no `name`.
    pub fn from_node(node: &ConfigNode) -> ConfigResult<Self> {
        let entries = node.as_list().ok_or_else(|| ValidationError::FieldType {
            field: "outputvar".to_string(),
            expected: "list",
        })?;

        let mut vars = Vec::with_capacity(entries.len());
        let mut by_name = HashMap::with_capacity(entries.len());
        for (pos, entry) in entries.iter().enumerate() {
            if !entry.is_map() {
                return Err(ValidationError::FieldType {
                    field: format!("outputvar[{pos}]"),
                    expected: "map",
                }
                .into());
            }
            let name = entry
                .get("name")
                .and_then(ConfigNode::as_str)
                .ok_or_else(|| ValidationError::MissingField {
                    field: format!("outputvar[{pos}].name"),
                })?
                .to_string();
            let descr = entry.get("descr").and_then(ConfigNode::as_str).map(str::to_string);
            let timestep = entry
                .get("timestep")
                .and_then(ConfigNode::as_str)
                .and_then(|s| s.parse::<Resolution>().ok());
            let index = entry
                .get("id")
                .and_then(ConfigNode::as_int)
                .and_then(|id| usize::try_from(id).ok())
                .unwrap_or(pos);

            by_name.entry(name.clone()).or_insert(vars.len());
            vars.push(OutputVar {
                name,
                descr,
                timestep,
                index,
            });
        }

        Ok(Self {
            vars,
            by_name,
            raw: entries.to_vec(),
        })
    }

    /// Looks up an entry by output id.
    pub fn get(&self, name: &str) -> Option<&OutputVar> {
        self.by_name.get(name).map(|&i| &self.vars[i])
    }

    /// Returns true if `name` is a catalog id.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Display index of an output id.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.get(name).map(|var| var.index)
    }

    /// Entries in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &OutputVar> {
        self.vars.iter()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns true for an empty catalog.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Ids from `ids` that are not in the catalog, in request order and
    /// without repeats.
    pub fn unknown<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        for id in ids {
            if !self.contains(id) && !missing.iter().any(|m| m == id) {
                missing.push(id.to_string());
            }
        }
        missing
    }

    /// Catalog names mapped to their descriptions, in catalog order.
    #[must_use]
    pub fn descriptions(&self) -> IndexMap<String, String> {
        self.vars
            .iter()
            .map(|var| (var.name.clone(), var.descr.clone().unwrap_or_default()))
            .collect()
    }

    /// The catalog as it was loaded.
    #[must_use]
    pub fn to_node(&self) -> ConfigNode {
        ConfigNode::List(self.raw.clone())
    }
}
