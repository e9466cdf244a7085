//! Loading base descriptors.
//!
//! A source is either an already serialized descriptor or a template that
//! needs macro expansion first. [`ConfigLoader::load`] tries the former and
//! falls back to the preprocessor.

mod preprocess;

use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::descriptor::RunDescriptor;
use crate::error::{ConfigError, ConfigResult, ExternalError, ValidationError};

pub use preprocess::{CommandPreprocessor, Preprocessor};

/// Macro telling templates to start from a restart file.
pub const RESTART_MACRO: &str = "-DFROM_RESTART";

const MACRO_PATTERN: &str = r"^-D[A-Za-z_][A-Za-z0-9_]*(=.*)?$";
static MACRO_REGEX: OnceLock<Regex> = OnceLock::new();

/// Preprocessor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Preprocessor executable.
    pub program: String,
    /// Arguments placed before the macros.
    pub args: Vec<String>,
    /// Macro added unless the descriptor is loaded for a spin-up.
    pub restart_macro: String,
    /// Preprocessor time limit. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            program: "cpp".to_string(),
            args: vec!["-P".to_string()],
            restart_macro: RESTART_MACRO.to_string(),
            timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl LoaderConfig {
    /// Checks the configuration and returns it unchanged.
    pub fn validate(self) -> ConfigResult<Self> {
        if self.program.trim().is_empty() {
            return Err(ValidationError::InvalidConfig {
                reason: "preprocessor program must not be empty".to_string(),
            }
            .into());
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(ValidationError::InvalidConfig {
                reason: "preprocessor timeout must be positive".to_string(),
            }
            .into());
        }
        validate_macro(&self.restart_macro)?;
        Ok(self)
    }
}

/// Per-call options of [`ConfigLoader::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Load for a spin-up run: the restart macro is left out.
    pub spin_up: bool,
    /// Extra `-D` macros, passed after the restart macro.
    pub macros: Vec<String>,
    /// Try to parse the source directly before preprocessing it.
    pub assume_pre_expanded: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            spin_up: false,
            macros: Vec::new(),
            assume_pre_expanded: true,
        }
    }
}

impl LoadOptions {
    /// Options for a transient run from a templated source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the descriptor for a spin-up run, without `-DFROM_RESTART`.
    #[must_use]
    pub const fn spin_up(mut self, spin_up: bool) -> Self {
        self.spin_up = spin_up;
        self
    }

    /// Adds a macro definition (`-DNAME` or `-DNAME=VALUE`).
    #[must_use]
    pub fn macro_def(mut self, def: impl Into<String>) -> Self {
        self.macros.push(def.into());
        self
    }

    /// Tries to parse the source as JSON before running the preprocessor.
    #[must_use]
    pub const fn assume_pre_expanded(mut self, yes: bool) -> Self {
        self.assume_pre_expanded = yes;
        self
    }
}

/// Loads base descriptors, expanding templates through a [`Preprocessor`].
#[derive(Debug, Clone)]
pub struct ConfigLoader<P: Preprocessor = CommandPreprocessor> {
    config: LoaderConfig,
    preprocessor: P,
}

impl ConfigLoader<CommandPreprocessor> {
    /// A loader that runs the configured preprocessor program.
    pub fn new(config: LoaderConfig) -> ConfigResult<Self> {
        let config = config.validate()?;
        let preprocessor = CommandPreprocessor::new(&config);
        Ok(Self {
            config,
            preprocessor,
        })
    }
}

impl<P: Preprocessor> ConfigLoader<P> {
    /// Creates a loader that expands sources with `preprocessor`.
    pub fn with_preprocessor(config: LoaderConfig, preprocessor: P) -> ConfigResult<Self> {
        Ok(Self {
            config: config.validate()?,
            preprocessor,
        })
    }

    /// The validated loader configuration.
    #[must_use]
    pub const fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Macros handed to the preprocessor for `options`.
    pub fn macros_for(&self, options: &LoadOptions) -> ConfigResult<Vec<String>> {
        let mut macros = Vec::with_capacity(options.macros.len() + 1);
        if !options.spin_up {
            macros.push(self.config.restart_macro.clone());
        }
        for def in &options.macros {
            validate_macro(def)?;
            macros.push(def.clone());
        }
        Ok(macros)
    }

    /// Loads the descriptor at `source`.
    ///
    /// # Errors
    ///
    /// - `InvalidMacro` for malformed macros
    /// - `DescriptorParse` if the source is missing or neither it nor the
    ///   preprocessor output is a serialized descriptor
    /// - `Preprocess` / `PreprocessTimeout` if expansion fails
    pub fn load(&self, source: impl AsRef<Path>, options: &LoadOptions) -> ConfigResult<RunDescriptor> {
        let source = source.as_ref();
        let macros = self.macros_for(options)?;

        let text = fs::read_to_string(source).map_err(|e| ExternalError::DescriptorParse {
            source_path: source.to_path_buf(),
            message: e.to_string(),
        })?;

        if options.assume_pre_expanded {
            match parse_descriptor(&text, source) {
                Ok(descriptor) => {
                    tracing::debug!(source = %source.display(), "loaded serialized descriptor");
                    return Ok(descriptor);
                }
                Err(e) => {
                    tracing::debug!(source = %source.display(), error = %e, "source is not serialized, expanding");
                }
            }
        }

        let expanded = self.preprocessor.expand(source, &macros)?;
        let descriptor = parse_descriptor(&expanded, source)?;
        tracing::info!(
            source = %source.display(),
            sim_name = descriptor.sim_name().unwrap_or_default(),
            "loaded expanded descriptor"
        );
        Ok(descriptor)
    }
}

/// Parses serialized descriptor text. `source` names the origin in errors.
///
/// # Errors
///
/// `DescriptorParse` if the text is not a JSON object.
pub fn parse_descriptor(text: &str, source: &Path) -> ConfigResult<RunDescriptor> {
    let parse_error = |message: String| ExternalError::DescriptorParse {
        source_path: source.to_path_buf(),
        message,
    };
    let raw: serde_json::Value = serde_json::from_str(text).map_err(|e| parse_error(e.to_string()))?;
    if !raw.is_object() {
        return Err(parse_error("top level is not an object".to_string()).into());
    }
    RunDescriptor::from_mapping(raw)
}

/// Reads a serialized descriptor, such as one written by
/// [`RunDescriptor::to_serialized`]. No preprocessing is attempted.
pub fn read_descriptor(path: impl AsRef<Path>) -> ConfigResult<RunDescriptor> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| ExternalError::DescriptorParse {
        source_path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_descriptor(&text, path)
}

fn macro_regex() -> ConfigResult<&'static Regex> {
    if let Some(re) = MACRO_REGEX.get() {
        return Ok(re);
    }
    let re = Regex::new(MACRO_PATTERN)
        .map_err(|e| ConfigError::internal(format!("invalid macro pattern: {e}")))?;
    Ok(MACRO_REGEX.get_or_init(|| re))
}

fn validate_macro(def: &str) -> ConfigResult<()> {
    if macro_regex()?.is_match(def) {
        Ok(())
    } else {
        Err(ValidationError::InvalidMacro {
            value: def.to_string(),
        }
        .into())
    }
}
