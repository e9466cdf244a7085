//! Input descriptors: the values of the descriptor's `input` map.
//!
//! The map keys form the fixed catalog of input identifiers. Only the
//! format and file name of an entry are ever changed by this crate.

use crate::error::{ConfigResult, ValidationError};
use crate::node::{ConfigNode, Fields};

/// Format value marking an input as read from the coupling channel.
pub const SOCKET_FORMAT: &str = "sock";

/// Source format of an input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InputFormat {
    /// Read from the coupling channel.
    Sock,
    /// Read from a file in the named format (`clm`, `cdf`, `raw`, `meta`, ...).
    File(String),
}

impl InputFormat {
    /// The value stored in `fmt`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Sock => SOCKET_FORMAT,
            Self::File(fmt) => fmt,
        }
    }
}

impl From<&str> for InputFormat {
    fn from(s: &str) -> Self {
        if s == SOCKET_FORMAT {
            Self::Sock
        } else {
            Self::File(s.to_string())
        }
    }
}

/// Typed view of one `input` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct InputDescriptor {
    /// Channel identifier. Required for socket wiring.
    pub id: Option<String>,
    /// Absent if the entry does not set one.
    pub fmt: Option<InputFormat>,
    /// Present unless `fmt` is [`InputFormat::Sock`].
    pub name: Option<String>,
    rest: Fields,
}

impl InputDescriptor {
    /// Reads the entry stored under `input.<key>`.
    pub fn from_node(key: &str, node: &ConfigNode) -> ConfigResult<Self> {
        let at = format!("input.{key}");
        let fields = node.as_map().ok_or_else(|| ValidationError::FieldType {
            field: at.clone(),
            expected: "map",
        })?;
        let id = optional_string(fields, &at, "id")?;
        let fmt = optional_string(fields, &at, "fmt")?;
        let name = optional_string(fields, &at, "name")?;
        Ok(Self {
            id,
            fmt: fmt.as_deref().map(InputFormat::from),
            name,
            rest: fields.clone(),
        })
    }

    /// Writes the entry back into tree form.
    #[must_use]
    pub fn into_node(self) -> ConfigNode {
        let mut fields = self.rest;
        if let Some(id) = self.id {
            fields.insert("id".to_string(), id.into());
        }
        if let Some(fmt) = self.fmt {
            fields.insert("fmt".to_string(), fmt.as_str().into());
        }
        match self.name {
            Some(name) => {
                fields.insert("name".to_string(), name.into());
            }
            None => {
                fields.shift_remove("name");
            }
        }
        ConfigNode::Map(fields)
    }

    /// Returns true if the input is read from the coupling channel.
    #[must_use]
    pub fn is_socket(&self) -> bool {
        self.fmt == Some(InputFormat::Sock)
    }
}

fn optional_string(fields: &Fields, at: &str, key: &str) -> ConfigResult<Option<String>> {
    match fields.get(key) {
        Some(ConfigNode::String(s)) => Ok(Some(s.clone())),
        None | Some(ConfigNode::Null) => Ok(None),
        Some(_) => Err(ValidationError::FieldType {
            field: format!("{at}.{key}"),
            expected: "string",
        }
        .into()),
    }
}
