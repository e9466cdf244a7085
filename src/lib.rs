//! # lpjml-config - Run configuration for phased LPJmL simulations
//!
//! An LPJmL simulation is run as three separately launched phases: a
//! spin-up, a historic replay and a run coupled to an external model over a
//! socket channel. Each phase needs its own variant of one large run
//! descriptor. This crate loads a base descriptor, shapes it for a phase and
//! writes it out for the simulation program.
//!
//! ## Core Concepts
//!
//! - **RunDescriptor**: the descriptor tree with typed access to its outputs,
//!   inputs and the read-only `outputvar` catalog
//! - **Output set**: which outputs are written, in which format and at which
//!   temporal resolution
//! - **Socket wiring**: inputs and outputs redirected from files to the
//!   coupling channel
//! - **Restart chain**: the file one phase writes its final state to and the
//!   next phase reads its initial state from
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lpjml_config::{ConfigLoader, HistoricOptions, LoadOptions, LoaderConfig};
//!
//! # fn main() -> lpjml_config::ConfigResult<()> {
//! let loader = ConfigLoader::new(LoaderConfig::default())?;
//! let mut config = loader.load("lpjml.js", &LoadOptions::new())?;
//!
//! let options = HistoricOptions::new().write_outputs(["prec", "evap"]);
//! config.configure_historic("/run", 1901, 2017, &options)?;
//! config.to_serialized("/run")?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Descriptor model
pub mod catalog;
pub mod descriptor;
pub mod error;
pub mod input;
pub mod node;
pub mod output;

// Mutators and I/O
pub mod collab;
pub mod loader;
pub mod operations;
pub mod workspace;

pub use catalog::{OutputCatalog, OutputVar};
pub use collab::{submit, CouplingChannel, CouplingTransport, ModelLauncher};
pub use descriptor::RunDescriptor;
pub use error::{ConfigError, ConfigResult, ExternalError, ValidationError};
pub use input::{InputDescriptor, InputFormat};
pub use loader::{
    parse_descriptor, read_descriptor, CommandPreprocessor, ConfigLoader, LoadOptions,
    LoaderConfig, Preprocessor,
};
pub use node::{ConfigNode, Fields};
pub use operations::{
    CoupledOptions, HistoricOptions, OutputSettings, Phase, ResolutionSpec, RestartTarget,
    SocketOutput,
};
pub use output::{OutputDescriptor, OutputFile, OutputFormat, Resolution};
pub use workspace::create_subdirs;
