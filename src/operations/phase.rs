//! Phase configurators.
//!
//! A simulation runs as `spinup -> historic -> coupled`. Each configurator
//! shapes a descriptor for one phase and returns the directory the phase
//! writes its outputs to. Phases started from the same `sim_root` chain
//! through their restart files.

use std::fmt;

use crate::descriptor::RunDescriptor;
use crate::error::ConfigResult;
use crate::node::ConfigNode;
use crate::output::OutputFormat;

use super::outputs::{OutputSettings, ResolutionSpec};
use super::restart::RestartTarget;
use super::join_path;

/// Peer recorded in `coupled_model` when none is given.
pub const DEFAULT_PEER_NAME: &str = "copan:CORE";
/// Default first simulation year of [`RunDescriptor::set_timerange`] callers.
pub const DEFAULT_FIRST_YEAR: i64 = 1901;
/// Default last simulation year of [`RunDescriptor::set_timerange`] callers.
pub const DEFAULT_LAST_YEAR: i64 = 2017;

/// Invocation mode of the simulation program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Spinup,
    Historic,
    Coupled,
}

impl Phase {
    /// The `sim_name` of descriptors configured for this phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spinup => "spinup",
            Self::Historic => "historic",
            Self::Coupled => "coupled",
        }
    }

    /// `<sim_root>/output/<phase>`.
    #[must_use]
    pub fn output_dir(self, sim_root: &str) -> String {
        join_path(&join_path(sim_root, "output"), self.as_str())
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options of the historic phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricOptions {
    /// First year outputs are written for; defaults to the start year.
    pub write_start_year: Option<i64>,
    /// Outputs written to files, besides the configured ones.
    pub write_outputs: Vec<String>,
    /// Temporal resolution of the written outputs.
    pub resolution: ResolutionSpec,
    /// Keep the configured outputs instead of replacing them.
    pub append: bool,
}

impl Default for HistoricOptions {
    fn default() -> Self {
        Self {
            write_start_year: None,
            write_outputs: Vec::new(),
            resolution: ResolutionSpec::Catalog,
            append: true,
        }
    }
}

impl HistoricOptions {
    /// Options with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the first year outputs are written for.
    #[must_use]
    pub const fn write_start_year(mut self, year: i64) -> Self {
        self.write_start_year = Some(year);
        self
    }

    /// Sets the outputs written to files.
    #[must_use]
    pub fn write_outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write_outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the temporal resolution of the written outputs.
    #[must_use]
    pub fn resolution(mut self, resolution: impl Into<ResolutionSpec>) -> Self {
        self.resolution = resolution.into();
        self
    }

    /// Appends to or replaces the configured outputs.
    #[must_use]
    pub const fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }
}

/// Options of the coupled phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoupledOptions {
    /// Outputs written to files, besides the configured ones.
    pub write_outputs: Vec<String>,
    /// Temporal resolution of the written outputs.
    pub resolution: ResolutionSpec,
    /// Keep the configured outputs instead of replacing them.
    pub append: bool,
    /// Name of the coupled program, stored in `coupled_model`.
    pub peer_name: String,
}

impl Default for CoupledOptions {
    fn default() -> Self {
        Self {
            write_outputs: Vec::new(),
            resolution: ResolutionSpec::Catalog,
            append: true,
            peer_name: DEFAULT_PEER_NAME.to_string(),
        }
    }
}

impl CoupledOptions {
    /// Options with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the outputs written to files.
    #[must_use]
    pub fn write_outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write_outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the temporal resolution of the written outputs.
    #[must_use]
    pub fn resolution(mut self, resolution: impl Into<ResolutionSpec>) -> Self {
        self.resolution = resolution.into();
        self
    }

    /// Appends to or replaces the configured outputs.
    #[must_use]
    pub const fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// Sets the name of the coupled program.
    #[must_use]
    pub fn peer_name(mut self, name: impl Into<String>) -> Self {
        self.peer_name = name.into();
        self
    }
}

impl RunDescriptor {
    /// Sets `firstyear`, `lastyear` and `outputyear`. Outputs start with the
    /// simulation unless `write_start_year` is given.
    pub fn set_timerange(&mut self, start_year: i64, end_year: i64, write_start_year: Option<i64>) {
        self.set_field("firstyear", start_year);
        self.set_field("lastyear", end_year);
        self.set_field("outputyear", write_start_year.unwrap_or(start_year));
    }

    /// Puts the run into coupled mode: no spin-up, no restart file written,
    /// float grid, and the given inputs and outputs wired to the channel.
    pub fn set_coupler<I, O>(&mut self, inputs: &[I], outputs: &[O], peer_name: &str) -> ConfigResult<()>
    where
        I: AsRef<str>,
        O: AsRef<str>,
    {
        let mut next = self.clone();
        next.set_field("write_restart", false);
        next.set_field("nspinup", 0);
        next.set_field("float_grid", true);
        next.set_field("coupled_model", ConfigNode::from(peer_name));
        next.set_input_sockets(inputs)?;
        next.set_output_sockets(outputs)?;
        *self = next;
        Ok(())
    }

    /// Configures the spin-up phase. Outputs keep their format and move to
    /// `<sim_root>/output/spinup`; the final state is written to `sim_root`.
    pub fn configure_spinup(&mut self, sim_root: &str) -> ConfigResult<String> {
        let phase = Phase::Spinup;
        let output_dir = phase.output_dir(sim_root);

        let mut next = self.clone();
        next.set_field("sim_name", phase.as_str());
        next.set_output_path(&output_dir)?;
        next.set_restart(RestartTarget::dir(sim_root))?;
        *self = next;

        tracing::info!(%phase, sim_root, %output_dir, "configured phase");
        Ok(output_dir)
    }

    /// Configures the historic phase: the given time range, `cdf` outputs
    /// below `<sim_root>/output/historic`, and a restart chain that reads
    /// from and writes to `sim_root`.
    pub fn configure_historic(
        &mut self,
        sim_root: &str,
        start_year: i64,
        end_year: i64,
        options: &HistoricOptions,
    ) -> ConfigResult<String> {
        let phase = Phase::Historic;
        let output_dir = phase.output_dir(sim_root);
        let settings = OutputSettings::new()
            .file_format(OutputFormat::Cdf)
            .resolution(options.resolution.clone())
            .append(options.append);

        let mut next = self.clone();
        next.set_field("sim_name", phase.as_str());
        next.set_timerange(start_year, end_year, options.write_start_year);
        next.set_outputs(&output_dir, options.write_outputs.as_slice(), &settings)?;
        next.set_startfrom(RestartTarget::dir(sim_root))?;
        next.set_restart(RestartTarget::dir(sim_root))?;
        *self = next;

        tracing::info!(%phase, sim_root, start_year, end_year, %output_dir, "configured phase");
        Ok(output_dir)
    }

    /// Configures the coupled phase.
    ///
    /// Writes `options.write_outputs` plus any coupled output not among them
    /// as `cdf` files, wires `couple_inputs` and `couple_outputs` to the
    /// channel, and reads the initial state from `sim_root`.
    pub fn configure_coupled<I, O>(
        &mut self,
        sim_root: &str,
        start_year: i64,
        end_year: i64,
        couple_inputs: &[I],
        couple_outputs: &[O],
        options: &CoupledOptions,
    ) -> ConfigResult<String>
    where
        I: AsRef<str>,
        O: AsRef<str>,
    {
        let phase = Phase::Coupled;
        let output_dir = phase.output_dir(sim_root);
        let settings = OutputSettings::new()
            .file_format(OutputFormat::Cdf)
            .resolution(options.resolution.clone())
            .append(options.append);

        let mut write_outputs: Vec<&str> = options.write_outputs.iter().map(String::as_str).collect();
        for id in couple_outputs {
            let id = id.as_ref();
            if !write_outputs.contains(&id) {
                write_outputs.push(id);
            }
        }

        let mut next = self.clone();
        next.set_field("sim_name", phase.as_str());
        next.set_timerange(start_year, end_year, None);
        next.set_outputs(&output_dir, write_outputs.as_slice(), &settings)?;
        next.set_coupler(couple_inputs, couple_outputs, &options.peer_name)?;
        next.set_startfrom(RestartTarget::dir(sim_root))?;
        *self = next;

        tracing::info!(
            %phase,
            sim_root,
            start_year,
            end_year,
            %output_dir,
            peer = %options.peer_name,
            "configured phase"
        );
        Ok(output_dir)
    }
}
