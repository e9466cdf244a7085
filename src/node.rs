//! Generic descriptor tree.
//!
//! A descriptor is an arbitrarily nested record: every field is either a
//! scalar, a list of nodes or another record. The container enforces no
//! schema; the components that read specific fields do.
//!
//! Keys beginning with [`PRIVATE_PREFIX`] are implementation-private and are
//! dropped by [`ConfigNode::to_mapping`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered field map of a record node. Key order follows the source document.
pub type Fields = IndexMap<String, ConfigNode>;

/// Leading character marking a key as implementation-private.
pub const PRIVATE_PREFIX: char = '_';

/// One node of a descriptor tree.
///
/// # Examples
///
/// ```
/// use lpjml_config::ConfigNode;
///
/// let node = ConfigNode::from_mapping(serde_json::json!({
///     "sim_name": "spinup",
///     "nspinup": 5000,
///     "output": [{"id": "grid"}]
/// }));
///
/// assert_eq!(node.get("sim_name").and_then(ConfigNode::as_str), Some("spinup"));
/// assert_eq!(node.get("nspinup").and_then(ConfigNode::as_int), Some(5000));
/// assert!(node.get("output").is_some_and(ConfigNode::is_list));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigNode {
    /// Explicit `null`.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Integer that fits `i64`.
    Int(i64),
    /// Integer above `i64::MAX`.
    UInt(u64),
    /// Any other number.
    Float(f64),
    /// String scalar.
    String(String),
    /// Ordered list of nodes.
    List(Vec<ConfigNode>),
    /// Record with ordered fields.
    Map(Fields),
}

impl ConfigNode {
    /// Creates an empty record node.
    #[must_use]
    pub fn map() -> Self {
        Self::Map(Fields::new())
    }

    /// Builds a tree from a JSON mapping, preserving key order.
    #[must_use]
    pub fn from_mapping(raw: serde_json::Value) -> Self {
        match raw {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(v) => Self::Bool(v),
            serde_json::Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Self::Int(v)
                } else if let Some(v) = n.as_u64() {
                    Self::UInt(v)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(v) => Self::String(v),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from_mapping).collect())
            }
            serde_json::Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Self::from_mapping(v)))
                    .collect(),
            ),
        }
    }

    /// Converts the tree back into a JSON mapping.
    ///
    /// This is the structural inverse of [`ConfigNode::from_mapping`] except
    /// that private keys are skipped at every level. Non-finite floats have
    /// no JSON form and become `null`.
    #[must_use]
    pub fn to_mapping(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(v) => serde_json::Value::Bool(*v),
            Self::Int(v) => serde_json::Value::from(*v),
            Self::UInt(v) => serde_json::Value::from(*v),
            Self::Float(v) => serde_json::Number::from_f64(*v)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::String(v) => serde_json::Value::String(v.clone()),
            Self::List(items) => {
                serde_json::Value::Array(items.iter().map(Self::to_mapping).collect())
            }
            Self::Map(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .filter(|(k, _)| !is_private_key(k))
                    .map(|(k, v)| (k.clone(), v.to_mapping()))
                    .collect(),
            ),
        }
    }

    /// Returns true for `null`.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true for record nodes.
    pub const fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    /// Returns true for list nodes.
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Returns the flag of a boolean node.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value of an integer node that fits `i64`.
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text of a string node.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the items of a list node.
    pub fn as_list(&self) -> Option<&[ConfigNode]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    /// Mutable access to the items of a list node.
    pub fn as_list_mut(&mut self) -> Option<&mut Vec<ConfigNode>> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the fields of a record node.
    pub const fn as_map(&self) -> Option<&Fields> {
        match self {
            Self::Map(v) => Some(v),
            _ => None,
        }
    }

    /// Mutable access to the fields of a record node.
    pub fn as_map_mut(&mut self) -> Option<&mut Fields> {
        match self {
            Self::Map(v) => Some(v),
            _ => None,
        }
    }

    /// Looks up a field of a record node.
    pub fn get(&self, key: &str) -> Option<&ConfigNode> {
        self.as_map().and_then(|fields| fields.get(key))
    }

    /// Mutable lookup of a field of a record node.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut ConfigNode> {
        self.as_map_mut().and_then(|fields| fields.get_mut(key))
    }

    /// Resolves a `/`-separated path of keys and list indices.
    ///
    /// ```
    /// use lpjml_config::ConfigNode;
    ///
    /// let node = ConfigNode::from_mapping(serde_json::json!({
    ///     "output": [{"id": "grid", "file": {"fmt": "raw"}}]
    /// }));
    /// let fmt = node.lookup("output/0/file/fmt").and_then(ConfigNode::as_str);
    /// assert_eq!(fmt, Some("raw"));
    /// ```
    pub fn lookup(&self, path: &str) -> Option<&ConfigNode> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| match node {
                Self::Map(fields) => fields.get(segment),
                Self::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::UInt(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

/// Returns true for keys that must not leave the process.
pub fn is_private_key(key: &str) -> bool {
    key.starts_with(PRIVATE_PREFIX)
}

impl Default for ConfigNode {
    fn default() -> Self {
        Self::Null
    }
}

impl std::fmt::Display for ConfigNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_mapping())
    }
}

impl From<bool> for ConfigNode {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for ConfigNode {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for ConfigNode {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for ConfigNode {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(Self::UInt(v), Self::Int)
    }
}

impl From<f64> for ConfigNode {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for ConfigNode {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for ConfigNode {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Vec<ConfigNode>> for ConfigNode {
    fn from(v: Vec<ConfigNode>) -> Self {
        Self::List(v)
    }
}

impl From<Fields> for ConfigNode {
    fn from(v: Fields) -> Self {
        Self::Map(v)
    }
}

impl From<serde_json::Value> for ConfigNode {
    fn from(v: serde_json::Value) -> Self {
        Self::from_mapping(v)
    }
}
