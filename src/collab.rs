//! Interfaces of the programs a configured descriptor is handed to.
//!
//! Building and launching the simulation program and the per-year data
//! exchange of a coupled run live outside this crate. These traits are the
//! seams they plug into.

use std::path::{Path, PathBuf};

use crate::descriptor::RunDescriptor;
use crate::error::ConfigResult;

/// Starts the simulation program on a persisted descriptor.
pub trait ModelLauncher {
    /// Handle of the running program.
    type Handle;

    fn launch(&self, descriptor_path: &Path) -> ConfigResult<Self::Handle>;
}

/// Opens the data channel of a coupled run.
pub trait CouplingTransport {
    type Channel: CouplingChannel;

    fn open_channel(&self, descriptor_path: &Path) -> ConfigResult<Self::Channel>;
}

/// Per-year exchange with a running coupled simulation.
pub trait CouplingChannel {
    /// Sends the values of one socket input for `year`.
    fn send(&mut self, values: &[f64], year: i64) -> ConfigResult<()>;

    /// Receives the values of one socket output for `year`.
    fn receive(&mut self, year: i64) -> ConfigResult<Vec<f64>>;

    fn close(self) -> ConfigResult<()>
    where
        Self: Sized;
}

/// Persists `descriptor` into `destination` and launches it.
///
/// Returns the descriptor path and the launcher's handle.
pub fn submit<L: ModelLauncher>(
    descriptor: &RunDescriptor,
    destination: impl AsRef<Path>,
    launcher: &L,
) -> ConfigResult<(PathBuf, L::Handle)> {
    let path = descriptor.to_serialized(destination)?;
    tracing::info!(path = %path.display(), sim_name = descriptor.sim_name().unwrap_or_default(), "launching model");
    let handle = launcher.launch(&path)?;
    Ok((path, handle))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use crossbeam_channel::{unbounded, Receiver, Sender};
    use serde_json::json;

    use super::*;
    use crate::error::{ConfigError, ExternalError};

    #[derive(Default)]
    struct RecordingLauncher {
        launched: RefCell<Vec<PathBuf>>,
    }

    impl ModelLauncher for RecordingLauncher {
        type Handle = usize;

        fn launch(&self, descriptor_path: &Path) -> ConfigResult<usize> {
            let mut launched = self.launched.borrow_mut();
            launched.push(descriptor_path.to_path_buf());
            Ok(launched.len())
        }
    }

    struct FailingLauncher;

    impl ModelLauncher for FailingLauncher {
        type Handle = ();

        fn launch(&self, _: &Path) -> ConfigResult<()> {
            Err(ExternalError::Launch {
                message: "lpjml not compiled".to_string(),
            }
            .into())
        }
    }

    /// Echoes sent values back, tagged with their year.
    struct Loopback {
        tx: Sender<(i64, Vec<f64>)>,
        rx: Receiver<(i64, Vec<f64>)>,
    }

    impl CouplingChannel for Loopback {
        fn send(&mut self, values: &[f64], year: i64) -> ConfigResult<()> {
            self.tx.send((year, values.to_vec())).map_err(|e| {
                ExternalError::Channel {
                    message: e.to_string(),
                }
                .into()
            })
        }

        fn receive(&mut self, year: i64) -> ConfigResult<Vec<f64>> {
            let (sent_year, values) = self.rx.try_recv().map_err(|e| ExternalError::Channel {
                message: e.to_string(),
            })?;
            if sent_year != year {
                return Err(ExternalError::Channel {
                    message: format!("expected year {year}, got {sent_year}"),
                }
                .into());
            }
            Ok(values)
        }

        fn close(self) -> ConfigResult<()> {
            Ok(())
        }
    }

    struct LoopbackTransport;

    impl CouplingTransport for LoopbackTransport {
        type Channel = Loopback;

        fn open_channel(&self, _: &Path) -> ConfigResult<Loopback> {
            let (tx, rx) = unbounded();
            Ok(Loopback { tx, rx })
        }
    }

    fn descriptor() -> RunDescriptor {
        RunDescriptor::from_mapping(json!({"sim_name": "coupled", "outputvar": []})).unwrap()
    }

    #[test]
    fn test_submit_persists_then_launches() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = RecordingLauncher::default();
        let (path, handle) = submit(&descriptor(), dir.path(), &launcher).unwrap();

        assert_eq!(path, dir.path().join("config_coupled.json"));
        assert!(path.is_file());
        assert_eq!(handle, 1);
        assert_eq!(launcher.launched.borrow().as_slice(), &[path]);
    }

    #[test]
    fn test_submit_does_not_launch_unwritten_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = RecordingLauncher::default();
        assert!(submit(&descriptor(), dir.path().join("missing"), &launcher).is_err());
        assert!(launcher.launched.borrow().is_empty());
    }

    #[test]
    fn test_launch_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let err = submit(&descriptor(), dir.path(), &FailingLauncher).unwrap_err();
        assert!(matches!(err, ConfigError::External(ExternalError::Launch { .. })));
    }

    #[test]
    fn test_channel_exchange() {
        let mut channel = LoopbackTransport.open_channel(Path::new("config_coupled.json")).unwrap();
        channel.send(&[0.5, 1.5], 2001).unwrap();
        assert_eq!(channel.receive(2001).unwrap(), vec![0.5, 1.5]);

        channel.send(&[2.0], 2002).unwrap();
        assert!(channel.receive(2003).is_err());
        channel.close().unwrap();
    }
}
