//! The restart chain between phases.
//!
//! `restart_filename` is where a run reads its initial state from,
//! `write_restart_filename` where it writes its final state to. A phase
//! started from directory `d` reads `d/restart_<firstyear-1>.lpj`, which is
//! what the previous phase wrote when its restart target was `d`.

use crate::descriptor::RunDescriptor;
use crate::error::{ConfigResult, ValidationError};
use crate::output::basename;

use super::join_path;

/// Extension of restart files.
pub const RESTART_EXTENSION: &str = "lpj";

/// Below this many spin-up years the read path is derived from `firstyear`.
pub const STARTFROM_SPINUP_THRESHOLD: i64 = 1;

/// Below this many spin-up years the write path is derived from `lastyear`.
pub const RESTART_SPINUP_THRESHOLD: i64 = 500;

/// Where a restart file is read from or written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartTarget {
    /// A directory; the file name is derived or kept.
    Dir(String),
    /// An explicit `*.lpj` file. Other extensions are ignored.
    File(String),
}

impl RestartTarget {
    /// A directory target.
    pub fn dir(path: impl Into<String>) -> Self {
        Self::Dir(path.into())
    }

    /// An explicit file target.
    pub fn file(name: impl Into<String>) -> Self {
        Self::File(name.into())
    }

    /// Picks a target from optional arguments. A path wins over a file name.
    ///
    /// # Errors
    ///
    /// `MissingArgument` naming `operation` if neither is given.
    pub fn from_parts(
        operation: &'static str,
        path: Option<&str>,
        file_name: Option<&str>,
    ) -> Result<Self, ValidationError> {
        match (path, file_name) {
            (Some(path), _) => Ok(Self::dir(path)),
            (None, Some(name)) => Ok(Self::file(name)),
            (None, None) => Err(ValidationError::MissingArgument { operation }),
        }
    }
}

impl RunDescriptor {
    /// Sets where the run reads its initial state from.
    ///
    /// For a directory: without spin-up the file is
    /// `restart_<firstyear - 1>.lpj`, otherwise the current file name is
    /// kept and moved below the directory.
    pub fn set_startfrom(&mut self, target: RestartTarget) -> ConfigResult<()> {
        match target {
            RestartTarget::Dir(path) => {
                let filename = if self.nspinup()? < STARTFROM_SPINUP_THRESHOLD {
                    let firstyear = self.firstyear()?;
                    let year = firstyear.checked_sub(1).ok_or(ValidationError::YearOutOfRange {
                        field: "firstyear",
                        value: firstyear,
                    })?;
                    join_path(&path, &format!("restart_{year}.{RESTART_EXTENSION}"))
                } else {
                    join_path(&path, basename(self.required_path("restart_filename")?))
                };
                tracing::debug!(%filename, "set startfrom");
                self.set_field("restart_filename", filename);
            }
            RestartTarget::File(name) => {
                if has_restart_extension(&name) {
                    self.set_field("restart_filename", name);
                } else {
                    tracing::warn!(file = %name, "ignoring startfrom file without .{RESTART_EXTENSION} extension");
                }
            }
        }
        Ok(())
    }

    /// Where the run reads its initial state from.
    pub fn get_startfrom(&self) -> Option<&str> {
        self.restart_filename()
    }

    /// Sets where the run writes its final state to.
    ///
    /// For a directory: below 500 spin-up years the file is
    /// `restart_<lastyear>.lpj`, otherwise the current file name is kept and
    /// moved below the directory. `restart_year` becomes `lastyear` either
    /// way.
    pub fn set_restart(&mut self, target: RestartTarget) -> ConfigResult<()> {
        match target {
            RestartTarget::Dir(path) => {
                let lastyear = self.lastyear()?;
                let filename = if self.nspinup()? < RESTART_SPINUP_THRESHOLD {
                    join_path(&path, &format!("restart_{lastyear}.{RESTART_EXTENSION}"))
                } else {
                    join_path(&path, basename(self.required_path("write_restart_filename")?))
                };
                tracing::debug!(%filename, restart_year = lastyear, "set restart");
                self.set_field("write_restart_filename", filename);
                self.set_field("restart_year", lastyear);
            }
            RestartTarget::File(name) => {
                if has_restart_extension(&name) {
                    self.set_field("write_restart_filename", name);
                } else {
                    tracing::warn!(file = %name, "ignoring restart file without .{RESTART_EXTENSION} extension");
                }
            }
        }
        Ok(())
    }

    /// Where the run writes its final state to.
    pub fn get_restart(&self) -> Option<&str> {
        self.write_restart_filename()
    }

    fn required_path(&self, key: &str) -> ConfigResult<&str> {
        self.get(key)
            .and_then(crate::node::ConfigNode::as_str)
            .ok_or_else(|| {
                ValidationError::MissingField {
                    field: key.to_string(),
                }
                .into()
            })
    }
}

fn has_restart_extension(name: &str) -> bool {
    name.rsplit('.').next() == Some(RESTART_EXTENSION)
}
