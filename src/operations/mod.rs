//! Configuration operations on a [`RunDescriptor`](crate::RunDescriptor).
//!
//! Each submodule adds one group of methods to the descriptor:
//! - `outputs`: output set editing (formats, resolutions, paths)
//! - `sockets`: file vs. channel wiring of inputs and outputs
//! - `restart`: the read/write restart chain between phases
//! - `phase`: the spinup / historic / coupled configurators
//!
//! Operations validate everything before they mutate. A failed call leaves
//! the descriptor unchanged.

mod outputs;
mod phase;
mod restart;
mod sockets;

pub use outputs::{OutputSettings, ResolutionSpec};
pub use phase::{
    CoupledOptions, HistoricOptions, Phase, DEFAULT_FIRST_YEAR, DEFAULT_LAST_YEAR,
    DEFAULT_PEER_NAME,
};
pub use restart::{
    RestartTarget, RESTART_EXTENSION, RESTART_SPINUP_THRESHOLD, STARTFROM_SPINUP_THRESHOLD,
};
pub use sockets::SocketOutput;

/// Joins a directory and a file name with `/`, the separator the simulation
/// program expects in descriptor paths.
pub(crate) fn join_path(dir: &str, file: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), file)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::json;

    use crate::descriptor::RunDescriptor;

    /// A small descriptor with the fields every phase touches.
    pub(crate) fn base_descriptor() -> RunDescriptor {
        RunDescriptor::from_mapping(json!({
            "sim_name": "default",
            "firstyear": 1901,
            "lastyear": 2017,
            "outputyear": 1901,
            "nspinup": 0,
            "restart_year": 2011,
            "restart_filename": "restart/restart_1840_nv_stdfire.lpj",
            "write_restart_filename": "restart/restart_1900_crop_stdfire.lpj",
            "write_restart": true,
            "float_grid": false,
            "coupled_model": null,
            "outputvar": [
                {"id": 0, "name": "grid", "descr": "grid", "timestep": "annual"},
                {"id": 1, "name": "fpc", "descr": "foliar projective cover", "timestep": "annual"},
                {"id": 2, "name": "prec", "descr": "precipitation", "timestep": "monthly"},
                {"id": 3, "name": "evap", "descr": "evaporation", "timestep": "monthly"},
                {"id": 4, "name": "globalflux", "descr": "global fluxes", "timestep": "annual"},
                {"id": 5, "name": "cftfrac", "descr": "CFT fraction", "timestep": "annual"},
                {"id": 6, "name": "pft_harvestc", "descr": "harvested carbon", "timestep": "annual"}
            ],
            "output": [
                {"id": "grid", "file": {"fmt": "raw", "name": "output/grid.bin"}},
                {"id": "globalflux", "file": {"fmt": "txt", "name": "output/globalflux.txt"}},
                {"id": "fpc", "file": {"fmt": "raw", "timestep": "annual", "name": "output/fpc.bin"}}
            ],
            "input": {
                "landuse": {"id": "landuse", "fmt": "clm", "name": "input/landuse.clm"},
                "fertilizer_nr": {"id": "fertilizer_nr", "fmt": "clm", "name": "input/fert.clm"},
                "co2": {"fmt": "txt", "name": "input/co2.dat"}
            }
        }))
        .expect("fixture descriptor is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::join_path;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/run", "restart_1900.lpj"), "/run/restart_1900.lpj");
        assert_eq!(join_path("/run/", "x.bin"), "/run/x.bin");
        assert_eq!(join_path("out", "x.bin"), "out/x.bin");
    }
}
