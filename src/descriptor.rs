//! The run descriptor: the complete configuration of one simulation run.
//!
//! A `RunDescriptor` is created once per phase invocation, mutated by the
//! configuration operations in [`crate::operations`], and finally persisted
//! as `config_<sim_name>.json`. After that the external program owns the
//! persisted form.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::catalog::OutputCatalog;
use crate::error::{ConfigError, ConfigResult, ExternalError, ValidationError};
use crate::input::InputDescriptor;
use crate::node::{ConfigNode, Fields};
use crate::output::OutputDescriptor;

/// Key of the read-only output catalog.
pub const CATALOG_KEY: &str = "outputvar";
/// Key of the output sequence.
pub const OUTPUT_KEY: &str = "output";
/// Key of the input map.
pub const INPUT_KEY: &str = "input";
/// Extension of persisted descriptors.
pub const SERIALIZED_EXTENSION: &str = "json";

/// Top-level run descriptor.
///
/// The `outputvar` catalog is held apart from the mutable fields and is only
/// reachable through [`RunDescriptor::catalog`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunDescriptor {
    fields: Fields,
    catalog: OutputCatalog,
    catalog_slot: Option<usize>,
}

impl RunDescriptor {
    /// Wraps a tree. The root must be a record.
    ///
    /// # Errors
    ///
    /// `ValidationError::FieldType` if the root or the catalog has the
    /// wrong shape.
    pub fn from_node(node: ConfigNode) -> ConfigResult<Self> {
        let ConfigNode::Map(mut fields) = node else {
            return Err(ValidationError::FieldType {
                field: "<root>".to_string(),
                expected: "map",
            }
            .into());
        };

        let (catalog, catalog_slot) = match fields.shift_remove_full(CATALOG_KEY) {
            Some((slot, _, node)) => (OutputCatalog::from_node(&node)?, Some(slot)),
            None => (OutputCatalog::default(), None),
        };

        Ok(Self {
            fields,
            catalog,
            catalog_slot,
        })
    }

    /// Builds a descriptor from a JSON mapping.
    pub fn from_mapping(raw: serde_json::Value) -> ConfigResult<Self> {
        Self::from_node(ConfigNode::from_mapping(raw))
    }

    /// The full tree, catalog included at its original position.
    #[must_use]
    pub fn to_node(&self) -> ConfigNode {
        let mut fields = self.fields.clone();
        if let Some(slot) = self.catalog_slot {
            let slot = slot.min(fields.len());
            fields.shift_insert(slot, CATALOG_KEY.to_string(), self.catalog.to_node());
        }
        ConfigNode::Map(fields)
    }

    /// The full tree as a JSON mapping, without private fields.
    #[must_use]
    pub fn to_mapping(&self) -> serde_json::Value {
        self.to_node().to_mapping()
    }

    /// Pretty-printed JSON with two-space indentation.
    pub fn to_json_pretty(&self) -> ConfigResult<String> {
        serde_json::to_string_pretty(&self.to_mapping())
            .map_err(|e| ConfigError::internal(format!("serialize descriptor: {e}")))
    }

    /// Path the descriptor is persisted to below `destination`.
    ///
    /// # Errors
    ///
    /// `MissingField` without a `sim_name`, `InvalidSimName` if it contains
    /// a path separator or a NUL byte.
    pub fn serialized_path(&self, destination: impl AsRef<Path>) -> ConfigResult<PathBuf> {
        let sim_name = self.sim_name().ok_or_else(|| ValidationError::MissingField {
            field: "sim_name".to_string(),
        })?;
        if sim_name.contains(['/', '\\', '\0']) {
            return Err(ValidationError::InvalidSimName {
                value: sim_name.to_string(),
            }
            .into());
        }
        Ok(destination
            .as_ref()
            .join(format!("config_{sim_name}.{SERIALIZED_EXTENSION}")))
    }

    /// Writes `config_<sim_name>.json` into `destination` and returns its path.
    ///
    /// # Errors
    ///
    /// `ExternalError::FileWrite` if `destination` is not an existing
    /// directory or the file cannot be written.
    pub fn to_serialized(&self, destination: impl AsRef<Path>) -> ConfigResult<PathBuf> {
        let dir = destination.as_ref();
        let path = self.serialized_path(dir)?;
        if !dir.is_dir() {
            return Err(ExternalError::FileWrite {
                path,
                message: "destination directory does not exist".to_string(),
            }
            .into());
        }

        let mut text = self.to_json_pretty()?;
        text.push('\n');
        fs::write(&path, text).map_err(|e| ExternalError::FileWrite {
            path: path.clone(),
            message: e.to_string(),
        })?;

        tracing::info!(path = %path.display(), "wrote run descriptor");
        Ok(path)
    }

    /// The read-only output catalog.
    #[must_use]
    pub const fn catalog(&self) -> &OutputCatalog {
        &self.catalog
    }

    /// Top-level keys in document order.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        if let Some(slot) = self.catalog_slot {
            keys.insert(slot.min(keys.len()), CATALOG_KEY);
        }
        keys
    }

    /// A top-level field. The catalog is not reachable this way.
    pub fn get(&self, key: &str) -> Option<&ConfigNode> {
        self.fields.get(key)
    }

    /// Sets a top-level field and returns the previous value.
    ///
    /// # Errors
    ///
    /// `ValidationError::ReadOnlyField` for the catalog key.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ConfigNode>,
    ) -> ConfigResult<Option<ConfigNode>> {
        let key = key.into();
        if key == CATALOG_KEY {
            return Err(ValidationError::ReadOnlyField { field: key }.into());
        }
        Ok(self.fields.insert(key, value.into()))
    }

    pub(crate) fn set_field(&mut self, key: &str, value: impl Into<ConfigNode>) {
        self.fields.insert(key.to_string(), value.into());
    }

    /// The simulation name, which also names the persisted file.
    pub fn sim_name(&self) -> Option<&str> {
        self.get("sim_name").and_then(ConfigNode::as_str)
    }

    /// A required integer field.
    pub fn int_field(&self, key: &str) -> ConfigResult<i64> {
        match self.get(key) {
            Some(ConfigNode::Int(v)) => Ok(*v),
            Some(_) => Err(ValidationError::FieldType {
                field: key.to_string(),
                expected: "int",
            }
            .into()),
            None => Err(ValidationError::MissingField {
                field: key.to_string(),
            }
            .into()),
        }
    }

    /// First simulated year.
    pub fn firstyear(&self) -> ConfigResult<i64> {
        self.int_field("firstyear")
    }

    /// Last simulated year.
    pub fn lastyear(&self) -> ConfigResult<i64> {
        self.int_field("lastyear")
    }

    /// First year outputs are written for.
    pub fn outputyear(&self) -> ConfigResult<i64> {
        self.int_field("outputyear")
    }

    /// Number of spin-up years.
    pub fn nspinup(&self) -> ConfigResult<i64> {
        self.int_field("nspinup")
    }

    /// Year the restart file is written for.
    pub fn restart_year(&self) -> ConfigResult<i64> {
        self.int_field("restart_year")
    }

    /// Where the run reads its initial state from.
    pub fn restart_filename(&self) -> Option<&str> {
        self.get("restart_filename").and_then(ConfigNode::as_str)
    }

    /// Where the run writes its final state to.
    pub fn write_restart_filename(&self) -> Option<&str> {
        self.get("write_restart_filename").and_then(ConfigNode::as_str)
    }

    /// Typed copy of the output sequence. A missing sequence reads as empty.
    pub fn output_descriptors(&self) -> ConfigResult<Vec<OutputDescriptor>> {
        match self.get(OUTPUT_KEY) {
            None | Some(ConfigNode::Null) => Ok(Vec::new()),
            Some(ConfigNode::List(items)) => items
                .iter()
                .enumerate()
                .map(|(pos, item)| OutputDescriptor::from_node(item, pos))
                .collect(),
            Some(_) => Err(ValidationError::FieldType {
                field: OUTPUT_KEY.to_string(),
                expected: "list",
            }
            .into()),
        }
    }

    pub(crate) fn replace_outputs(&mut self, outputs: Vec<OutputDescriptor>) {
        let items = outputs.into_iter().map(OutputDescriptor::into_node).collect();
        self.set_field(OUTPUT_KEY, ConfigNode::List(items));
    }

    /// Ids of the configured outputs, in sequence order.
    pub fn get_outputs(&self) -> ConfigResult<Vec<String>> {
        Ok(self.output_descriptors()?.into_iter().map(|out| out.id).collect())
    }

    /// Catalog output names mapped to their descriptions.
    #[must_use]
    pub fn get_outputs_avail(&self) -> IndexMap<String, String> {
        self.catalog.descriptions()
    }

    /// Input identifiers, optionally restricted to those in `filter`.
    #[must_use]
    pub fn get_inputs(&self, filter: Option<&[&str]>) -> Vec<String> {
        let Some(inputs) = self.get(INPUT_KEY).and_then(ConfigNode::as_map) else {
            return Vec::new();
        };
        inputs
            .keys()
            .filter(|key| filter.map_or(true, |wanted| wanted.contains(&key.as_str())))
            .cloned()
            .collect()
    }

    /// Typed view of `input.<key>`.
    ///
    /// # Errors
    ///
    /// `ValidationError::UnknownInput` if the key is not in the input map.
    pub fn input_descriptor(&self, key: &str) -> ConfigResult<InputDescriptor> {
        let node = self.input_node(key)?;
        InputDescriptor::from_node(key, node)
    }

    /// Typed view of the whole input map, in document order.
    pub fn get_input_map(&self) -> ConfigResult<IndexMap<String, InputDescriptor>> {
        let Some(node) = self.get(INPUT_KEY) else {
            return Ok(IndexMap::new());
        };
        let inputs = node.as_map().ok_or_else(|| ValidationError::FieldType {
            field: INPUT_KEY.to_string(),
            expected: "map",
        })?;
        inputs
            .iter()
            .map(|(key, node)| InputDescriptor::from_node(key, node).map(|input| (key.clone(), input)))
            .collect()
    }

    pub(crate) fn input_node(&self, key: &str) -> ConfigResult<&ConfigNode> {
        self.get(INPUT_KEY)
            .and_then(|inputs| inputs.get(key))
            .ok_or_else(|| {
                ValidationError::UnknownInput {
                    input: key.to_string(),
                }
                .into()
            })
    }

    pub(crate) fn input_node_mut(&mut self, key: &str) -> ConfigResult<&mut ConfigNode> {
        self.fields
            .get_mut(INPUT_KEY)
            .and_then(|inputs| inputs.get_mut(key))
            .ok_or_else(|| {
                ValidationError::UnknownInput {
                    input: key.to_string(),
                }
                .into()
            })
    }
}
