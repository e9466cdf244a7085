//! Output descriptors: one entry of the descriptor's `output` sequence.
//!
//! Entries are read from and written back to the tree explicitly. Keys this
//! crate does not model are carried along untouched and keep their position,
//! so rewriting an entry never reorders the persisted file.

use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigResult, ValidationError};
use crate::node::{ConfigNode, Fields};

/// Id of the grid output. It must exist whenever outputs are configured.
pub const GRID_OUTPUT: &str = "grid";

/// Outputs that are not per-cell variables. They keep their own format and
/// file extension when outputs are rewritten.
pub const NONVARIABLE_OUTPUTS: &[&str] = &["globalflux"];

/// Returns true if `id` names a non-variable output.
pub fn is_nonvariable(id: &str) -> bool {
    NONVARIABLE_OUTPUTS.contains(&id)
}

/// Temporal resolution of an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Resolution {
    #[default]
    Annual,
    Monthly,
    Daily,
}

impl Resolution {
    /// The value stored in `timestep`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Monthly => "monthly",
            Self::Daily => "daily",
        }
    }
}

impl FromStr for Resolution {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "annual" => Ok(Self::Annual),
            "monthly" => Ok(Self::Monthly),
            "daily" => Ok(Self::Daily),
            other => Err(ValidationError::InvalidResolution {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File format of an output.
///
/// `Raw`, `Clm` and `Cdf` are the formats outputs can be written in. `Sock`
/// marks a channel-only output without a file, `Txt` is used by the
/// non-variable outputs. Formats found in a descriptor that none of these
/// cover are kept verbatim as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    #[default]
    Raw,
    Clm,
    Cdf,
    Sock,
    Txt,
    Other(String),
}

impl OutputFormat {
    /// The value stored in `fmt`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Raw => "raw",
            Self::Clm => "clm",
            Self::Cdf => "cdf",
            Self::Sock => "sock",
            Self::Txt => "txt",
            Self::Other(fmt) => fmt,
        }
    }

    /// Reads a stored format, keeping values this crate does not model.
    #[must_use]
    pub fn from_stored(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| Self::Other(s.to_string()))
    }

    /// File extension used for outputs written in this format.
    #[must_use]
    pub const fn extension(&self) -> Option<&'static str> {
        match self {
            Self::Raw => Some("bin"),
            Self::Clm => Some("clm"),
            Self::Cdf => Some("nc4"),
            Self::Txt => Some("txt"),
            Self::Sock | Self::Other(_) => None,
        }
    }

    /// Returns the extension if outputs may be configured to this format.
    ///
    /// # Errors
    ///
    /// `ValidationError::InvalidFormat` for anything but `raw`, `clm` and
    /// `cdf`.
    pub fn write_extension(&self) -> Result<&'static str, ValidationError> {
        match self {
            Self::Raw | Self::Clm | Self::Cdf => Ok(self.extension().unwrap_or_default()),
            Self::Sock | Self::Txt | Self::Other(_) => Err(ValidationError::InvalidFormat {
                value: self.as_str().to_string(),
            }),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Self::Raw),
            "clm" => Ok(Self::Clm),
            "cdf" => Ok(Self::Cdf),
            "sock" => Ok(Self::Sock),
            "txt" => Ok(Self::Txt),
            other => Err(ValidationError::InvalidFormat {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `file` record of an output descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFile {
    /// File format.
    pub fmt: OutputFormat,
    /// Also send the output over the coupling channel.
    pub socket: bool,
    /// `None` also when the stored value is not a known resolution. That
    /// value then stays in the record until a resolution is set.
    pub timestep: Option<Resolution>,
    /// Present unless the output is channel-only (`fmt == sock`).
    pub name: Option<String>,
    rest: Fields,
}

impl OutputFile {
    /// Creates a file-backed record.
    #[must_use]
    pub fn file(fmt: OutputFormat, timestep: Option<Resolution>, name: impl Into<String>) -> Self {
        Self {
            fmt,
            socket: false,
            timestep,
            name: Some(name.into()),
            rest: Fields::new(),
        }
    }

    /// Creates a channel-only record. It has no file name.
    #[must_use]
    pub fn channel() -> Self {
        Self {
            fmt: OutputFormat::Sock,
            socket: true,
            timestep: Some(Resolution::Annual),
            name: None,
            rest: Fields::new(),
        }
    }

    /// Extension of the current file name, if any.
    pub fn name_extension(&self) -> Option<&str> {
        let name = self.name.as_deref()?;
        let base = basename(name);
        base.rfind('.').map(|dot| &base[dot + 1..]).filter(|ext| !ext.is_empty())
    }

    fn from_node(node: &ConfigNode, at: &str) -> ConfigResult<Self> {
        let fields = node.as_map().ok_or_else(|| ValidationError::FieldType {
            field: at.to_string(),
            expected: "map",
        })?;

        let fmt = match fields.get("fmt") {
            Some(ConfigNode::String(s)) => OutputFormat::from_stored(s),
            Some(_) => return Err(field_type(at, "fmt", "string")),
            None => {
                return Err(ValidationError::MissingField {
                    field: format!("{at}.fmt"),
                }
                .into())
            }
        };
        let socket = match fields.get("socket") {
            Some(ConfigNode::Bool(v)) => *v,
            None | Some(ConfigNode::Null) => false,
            Some(_) => return Err(field_type(at, "socket", "bool")),
        };
        let timestep = match fields.get("timestep") {
            Some(ConfigNode::String(s)) => s.parse::<Resolution>().ok(),
            None | Some(ConfigNode::Null) => None,
            Some(_) => return Err(field_type(at, "timestep", "string")),
        };
        let name = match fields.get("name") {
            Some(ConfigNode::String(s)) => Some(s.clone()),
            None | Some(ConfigNode::Null) => None,
            Some(_) => return Err(field_type(at, "name", "string")),
        };

        Ok(Self {
            fmt,
            socket,
            timestep,
            name,
            rest: fields.clone(),
        })
    }

    fn into_node(self) -> ConfigNode {
        let mut fields = self.rest;
        fields.insert("fmt".to_string(), self.fmt.as_str().into());
        fields.insert("socket".to_string(), self.socket.into());
        if let Some(t) = self.timestep {
            fields.insert("timestep".to_string(), t.as_str().into());
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
}

/// One entry of the descriptor's `output` sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDescriptor {
    /// Catalog id of the output.
    pub id: String,
    /// Where and how the output is written.
    pub file: OutputFile,
    rest: Fields,
}

impl OutputDescriptor {
    /// Creates an entry without extra keys.
    #[must_use]
    pub fn new(id: impl Into<String>, file: OutputFile) -> Self {
        Self {
            id: id.into(),
            file,
            rest: Fields::new(),
        }
    }

    /// Reads the entry at `output[position]`.
    pub fn from_node(node: &ConfigNode, position: usize) -> ConfigResult<Self> {
        let at = format!("output[{position}]");
        let fields = node.as_map().ok_or_else(|| ValidationError::FieldType {
            field: at.clone(),
            expected: "map",
        })?;
        let id = match fields.get("id") {
            Some(ConfigNode::String(s)) => s.clone(),
            Some(_) => return Err(field_type(&at, "id", "string")),
            None => {
                return Err(ValidationError::MissingField {
                    field: format!("{at}.id"),
                }
                .into())
            }
        };
        let file = match fields.get("file") {
            Some(file) => OutputFile::from_node(file, &format!("{at}.file"))?,
            None => {
                return Err(ValidationError::MissingField {
                    field: format!("{at}.file"),
                }
                .into())
            }
        };
        Ok(Self {
            id,
            file,
            rest: fields.clone(),
        })
    }

    /// Writes the entry back into tree form.
    #[must_use]
    pub fn into_node(self) -> ConfigNode {
        let mut fields = self.rest;
        fields.insert("id".to_string(), self.id.into());
        fields.insert("file".to_string(), self.file.into_node());
        ConfigNode::Map(fields)
    }

    /// Returns true if the entry is wired to the coupling channel.
    #[must_use]
    pub const fn is_socket(&self) -> bool {
        self.file.socket
    }
}

/// Last `/`-separated component of a path string.
pub(crate) fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn field_type(at: &str, field: &str, expected: &'static str) -> crate::error::ConfigError {
    ValidationError::FieldType {
        field: format!("{at}.{field}"),
        expected,
    }
    .into()
}
