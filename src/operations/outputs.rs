//! Output set editing.
//!
//! `set_outputs` builds a fresh output sequence from the current one and the
//! request, then swaps it in. Nothing is written if validation fails.

use std::collections::HashSet;

use crate::descriptor::RunDescriptor;
use crate::error::{ConfigResult, ValidationError};
use crate::output::{
    basename, is_nonvariable, OutputDescriptor, OutputFile, OutputFormat, Resolution, GRID_OUTPUT,
};

use super::join_path;

/// Temporal resolution requested for `set_outputs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionSpec {
    /// Each new output takes its catalog default; existing outputs keep theirs.
    Catalog,
    /// One resolution for every output, existing ones included.
    Uniform(String),
    /// One resolution per requested output, in request order. Existing
    /// outputs keep theirs.
    PerOutput(Vec<String>),
}

impl ResolutionSpec {
    /// One resolution for every output.
    pub fn uniform(resolution: impl Into<String>) -> Self {
        Self::Uniform(resolution.into())
    }

    /// One resolution per requested output.
    pub fn per_output<I, S>(resolutions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::PerOutput(resolutions.into_iter().map(Into::into).collect())
    }
}

impl Default for ResolutionSpec {
    fn default() -> Self {
        Self::Uniform(Resolution::Annual.as_str().to_string())
    }
}

impl From<Resolution> for ResolutionSpec {
    fn from(r: Resolution) -> Self {
        Self::Uniform(r.as_str().to_string())
    }
}

impl From<Option<Resolution>> for ResolutionSpec {
    fn from(r: Option<Resolution>) -> Self {
        r.map_or(Self::Catalog, Self::from)
    }
}

/// How `set_outputs` writes the requested outputs.
///
/// Defaults to `raw` files, `annual` resolution, appended to the existing
/// sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    /// Format of rewritten and added outputs.
    pub file_format: OutputFormat,
    /// Temporal resolution of the outputs.
    pub resolution: ResolutionSpec,
    /// Keep the configured outputs instead of replacing them.
    pub append: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            file_format: OutputFormat::Raw,
            resolution: ResolutionSpec::default(),
            append: true,
        }
    }
}

impl OutputSettings {
    /// Settings with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the output format.
    #[must_use]
    pub fn file_format(mut self, format: OutputFormat) -> Self {
        self.file_format = format;
        self
    }

    /// Sets the temporal resolution.
    #[must_use]
    pub fn resolution(mut self, resolution: impl Into<ResolutionSpec>) -> Self {
        self.resolution = resolution.into();
        self
    }

    /// Appends to or replaces the configured outputs.
    #[must_use]
    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }
}

/// Resolutions after validation.
enum Resolved {
    Catalog,
    Uniform(Resolution),
    PerOutput(Vec<Resolution>),
}

impl RunDescriptor {
    /// Configures the outputs written by the run.
    ///
    /// `grid` is always added to `outputs`. With `append`, existing entries
    /// are switched to file output in `settings.file_format` below
    /// `output_path`; non-variable outputs only move and keep their
    /// extension. Requested ids that are not configured yet are added from
    /// the catalog.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` if `settings.file_format` is not `raw`, `clm` or `cdf`
    /// - `LengthMismatch` if per-output resolutions do not line up with
    ///   `outputs` plus the implicit `grid`
    /// - `InvalidResolution` for resolutions other than annual/monthly/daily
    /// - `UnknownOutput` listing every requested id missing from the catalog
    pub fn set_outputs<S: AsRef<str>>(
        &mut self,
        output_path: &str,
        outputs: &[S],
        settings: &OutputSettings,
    ) -> ConfigResult<()> {
        let extension = settings.file_format.write_extension()?;

        let mut requested: Vec<&str> = outputs.iter().map(AsRef::as_ref).collect();
        let mut spec = settings.resolution.clone();
        if !requested.contains(&GRID_OUTPUT) {
            requested.push(GRID_OUTPUT);
            if let ResolutionSpec::PerOutput(list) = &mut spec {
                list.push(Resolution::Annual.as_str().to_string());
            }
        }
        let resolved = resolve(&spec, requested.len())?;

        let unknown = self.catalog().unknown(requested.iter().copied());
        if !unknown.is_empty() {
            return Err(ValidationError::UnknownOutput { ids: unknown }.into());
        }

        let mut next = if settings.append {
            self.output_descriptors()?
        } else {
            Vec::new()
        };

        for out in &mut next {
            out.file.socket = false;
            if let Resolved::Uniform(r) = &resolved {
                out.file.timestep = Some(*r);
            }
            if is_nonvariable(&out.id) {
                let file_name = match out.file.name_extension() {
                    Some(ext) => format!("{}.{ext}", out.id),
                    None => out.id.clone(),
                };
                out.file.name = Some(join_path(output_path, &file_name));
            } else {
                out.file.fmt = settings.file_format.clone();
                out.file.name = Some(join_path(output_path, &format!("{}.{extension}", out.id)));
            }
            tracing::debug!(id = %out.id, name = ?out.file.name, "rewrote output");
        }

        let mut present: HashSet<String> = next.iter().map(|out| out.id.clone()).collect();
        for (pos, id) in requested.iter().enumerate() {
            if !present.insert((*id).to_string()) {
                continue;
            }
            let timestep = match &resolved {
                Resolved::Catalog => self.catalog().get(id).and_then(|var| var.timestep),
                Resolved::Uniform(r) => Some(*r),
                Resolved::PerOutput(list) => Some(list[pos]),
            };
            let name = join_path(output_path, &format!("{id}.{extension}"));
            tracing::debug!(id = %id, %name, "added output");
            next.push(OutputDescriptor::new(
                *id,
                OutputFile::file(settings.file_format.clone(), timestep, name),
            ));
        }

        self.replace_outputs(next);
        Ok(())
    }

    /// Moves every output file to `output_path`, keeping its file name.
    pub fn set_output_path(&mut self, output_path: &str) -> ConfigResult<()> {
        let mut next = self.output_descriptors()?;
        for out in &mut next {
            if let Some(name) = &out.file.name {
                out.file.name = Some(join_path(output_path, basename(name)));
            }
        }
        self.replace_outputs(next);
        Ok(())
    }
}

fn resolve(spec: &ResolutionSpec, outputs: usize) -> Result<Resolved, ValidationError> {
    match spec {
        ResolutionSpec::Catalog => Ok(Resolved::Catalog),
        ResolutionSpec::Uniform(r) => Ok(Resolved::Uniform(r.parse()?)),
        ResolutionSpec::PerOutput(list) => {
            if list.len() != outputs {
                return Err(ValidationError::LengthMismatch {
                    outputs,
                    resolutions: list.len(),
                });
            }
            let parsed = list
                .iter()
                .map(|r| r.parse::<Resolution>())
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Resolved::PerOutput(parsed))
        }
    }
}
