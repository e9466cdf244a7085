//! Socket wiring: redirecting inputs and outputs to the coupling channel.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::descriptor::RunDescriptor;
use crate::error::{ConfigError, ConfigResult, ValidationError};
use crate::input::{InputDescriptor, InputFormat};
use crate::output::{OutputDescriptor, OutputFile, Resolution, GRID_OUTPUT};

/// A socket-wired output together with its catalog index.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketOutput {
    /// Index of the output in the `outputvar` catalog, as the coupled
    /// program addresses it on the channel.
    pub index: usize,
    /// The output entry itself.
    pub descriptor: OutputDescriptor,
}

impl RunDescriptor {
    /// Switches the given inputs to be read from the coupling channel.
    ///
    /// # Errors
    ///
    /// `UnknownInput` if an identifier is not in the input map and
    /// `MissingId` if its entry has no `id`. Nothing is changed on error.
    pub fn set_input_sockets<S: AsRef<str>>(&mut self, inputs: &[S]) -> ConfigResult<()> {
        let mut wired = Vec::with_capacity(inputs.len());
        for key in inputs {
            let key = key.as_ref();
            let mut input = self.input_descriptor(key)?;
            if input.id.is_none() {
                return Err(ValidationError::MissingId {
                    input: key.to_string(),
                }
                .into());
            }
            input.fmt = Some(InputFormat::Sock);
            input.name = None;
            wired.push((key, input));
        }

        for (key, input) in wired {
            *self.input_node_mut(key)? = input.into_node();
            tracing::debug!(input = key, "wired input to socket");
        }
        Ok(())
    }

    /// Switches the given outputs, and `grid`, to be sent over the coupling
    /// channel at annual cadence.
    ///
    /// Existing entries keep their file; requested outputs that are not
    /// configured yet are added as channel-only entries.
    ///
    /// # Errors
    ///
    /// `UnknownOutput` listing every requested id missing from the catalog.
    pub fn set_output_sockets<S: AsRef<str>>(&mut self, outputs: &[S]) -> ConfigResult<()> {
        let mut requested: Vec<&str> = outputs.iter().map(AsRef::as_ref).collect();
        if !requested.contains(&GRID_OUTPUT) {
            requested.push(GRID_OUTPUT);
        }

        let unknown = self.catalog().unknown(requested.iter().copied());
        if !unknown.is_empty() {
            return Err(ValidationError::UnknownOutput { ids: unknown }.into());
        }
        let valid: HashSet<&str> = requested.iter().copied().collect();

        let mut next = self.output_descriptors()?;
        let mut present = HashSet::with_capacity(next.len());
        for out in &mut next {
            if valid.contains(out.id.as_str()) {
                out.file.socket = true;
                out.file.timestep = Some(Resolution::Annual);
                tracing::debug!(id = %out.id, "wired output to socket");
            }
            present.insert(out.id.clone());
        }
        for id in requested {
            if present.insert(id.to_string()) {
                tracing::debug!(id, "added channel-only output");
                next.push(OutputDescriptor::new(id, OutputFile::channel()));
            }
        }

        self.replace_outputs(next);
        Ok(())
    }

    /// Inputs currently read from the coupling channel, keyed by input id.
    pub fn get_input_sockets(&self) -> ConfigResult<IndexMap<String, InputDescriptor>> {
        let mut sockets = IndexMap::new();
        for (key, input) in self.get_input_map()? {
            if input.is_socket() {
                sockets.insert(key, input);
            }
        }
        Ok(sockets)
    }

    /// Outputs currently sent over the coupling channel, keyed by output id.
    ///
    /// # Errors
    ///
    /// `UnknownOutput` if a socket output is not in the catalog, since it
    /// could not be addressed on the channel.
    pub fn get_output_sockets(&self) -> ConfigResult<IndexMap<String, SocketOutput>> {
        let socket_outputs: Vec<OutputDescriptor> = self
            .output_descriptors()?
            .into_iter()
            .filter(OutputDescriptor::is_socket)
            .collect();

        let unknown = self
            .catalog()
            .unknown(socket_outputs.iter().map(|out| out.id.as_str()));
        if !unknown.is_empty() {
            return Err(ValidationError::UnknownOutput { ids: unknown }.into());
        }

        socket_outputs
            .into_iter()
            .map(|out| -> ConfigResult<(String, SocketOutput)> {
                let index = self.catalog().index_of(&out.id).ok_or_else(|| {
                    ConfigError::internal(format!("catalog lost output '{}'", out.id))
                })?;
                Ok((
                    out.id.clone(),
                    SocketOutput {
                        index,
                        descriptor: out,
                    },
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::fixtures::base_descriptor;
    use crate::output::OutputFormat;

    #[test]
    fn test_input_socket_drops_name() {
        let mut desc = base_descriptor();
        desc.set_input_sockets(&["landuse"]).unwrap();

        let landuse = desc.input_descriptor("landuse").unwrap();
        assert_eq!(landuse.fmt, Some(InputFormat::Sock));
        assert_eq!(landuse.id.as_deref(), Some("landuse"));
        assert_eq!(landuse.name, None);
        assert!(desc.input_node("landuse").unwrap().get("name").is_none());
    }

    #[test]
    fn test_input_without_fmt_is_wired() {
        let mut desc = RunDescriptor::from_mapping(serde_json::json!({
            "input": {"landuse": {"id": "landuse", "name": "landuse.clm"}},
            "outputvar": []
        }))
        .unwrap();
        desc.set_input_sockets(&["landuse"]).unwrap();

        assert_eq!(
            desc.to_mapping()["input"]["landuse"],
            serde_json::json!({"id": "landuse", "fmt": "sock"})
        );
        assert!(desc.get_input_sockets().unwrap().contains_key("landuse"));
    }

    #[test]
    fn test_input_without_id_cannot_be_wired() {
        let mut desc = base_descriptor();
        let before = desc.clone();
        let err = desc.set_input_sockets(&["landuse", "co2"]).unwrap_err();
        assert!(matches!(
            err.as_validation(),
            Some(ValidationError::MissingId { input }) if input == "co2"
        ));
        assert_eq!(desc, before);
    }

    #[test]
    fn test_unknown_input() {
        let mut desc = base_descriptor();
        let err = desc.set_input_sockets(&["wateruse"]).unwrap_err();
        assert!(matches!(err.as_validation(), Some(ValidationError::UnknownInput { .. })));
    }

    #[test]
    fn test_output_sockets_force_annual_and_include_grid() {
        let mut desc = base_descriptor();
        desc.set_output_sockets(&["fpc"]).unwrap();

        let outs = desc.output_descriptors().unwrap();
        for id in ["fpc", "grid"] {
            let out = outs.iter().find(|o| o.id == id).unwrap();
            assert!(out.file.socket, "{id} should be a socket");
            assert_eq!(out.file.timestep, Some(Resolution::Annual));
        }
        let flux = outs.iter().find(|o| o.id == "globalflux").unwrap();
        assert!(!flux.file.socket);
    }

    #[test]
    fn test_output_sockets_add_missing_as_channel_only() {
        let mut desc = base_descriptor();
        desc.set_output_sockets(&["cftfrac"]).unwrap();

        let outs = desc.output_descriptors().unwrap();
        let cft = outs.iter().find(|o| o.id == "cftfrac").unwrap();
        assert_eq!(cft.file.fmt, OutputFormat::Sock);
        assert!(cft.file.socket);
        assert_eq!(cft.file.timestep, Some(Resolution::Annual));
        assert_eq!(cft.file.name, None);
    }

    #[test]
    fn test_output_sockets_report_all_unknown() {
        let mut desc = base_descriptor();
        let before = desc.clone();
        let err = desc.set_output_sockets(&["bogus", "fpc", "nope"]).unwrap_err();
        assert!(matches!(
            err.as_validation(),
            Some(ValidationError::UnknownOutput { ids }) if ids.len() == 2
        ));
        assert_eq!(desc, before);
    }

    #[test]
    fn test_socket_accessors() {
        let mut desc = base_descriptor();
        assert!(desc.get_input_sockets().unwrap().is_empty());
        assert!(desc.get_output_sockets().unwrap().is_empty());

        desc.set_input_sockets(&["landuse", "fertilizer_nr"]).unwrap();
        desc.set_output_sockets(&["cftfrac", "pft_harvestc"]).unwrap();

        let inputs = desc.get_input_sockets().unwrap();
        assert_eq!(inputs.keys().collect::<Vec<_>>(), vec!["landuse", "fertilizer_nr"]);

        let outputs = desc.get_output_sockets().unwrap();
        assert_eq!(
            outputs.keys().collect::<Vec<_>>(),
            vec!["grid", "cftfrac", "pft_harvestc"]
        );
        assert_eq!(outputs["grid"].index, 0);
        assert_eq!(outputs["cftfrac"].index, 5);
        assert_eq!(outputs["pft_harvestc"].index, 6);
    }
}
