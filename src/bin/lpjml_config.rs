//! lpjml-config CLI
//!
//! Shapes a base descriptor for one simulation phase and writes
//! `config_<phase>.json`.

use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use lpjml_config::{
    create_subdirs, ConfigLoader, ConfigResult, CoupledOptions, HistoricOptions, LoadOptions,
    LoaderConfig, ResolutionSpec, RunDescriptor,
};

#[derive(Parser, Debug)]
#[command(name = "lpjml-config", version, about = "Configure LPJmL runs for spinup, historic and coupled phases")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configure a spin-up run
    Spinup {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Configure a historic run
    Historic {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        years: YearArgs,
        /// First year outputs are written for
        #[arg(long)]
        write_start: Option<i64>,
        #[command(flatten)]
        outputs: OutputArgs,
    },
    /// Configure a run coupled to an external model
    Coupled {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        years: YearArgs,
        /// Inputs read from the coupling channel
        #[arg(long = "couple-input", value_delimiter = ',')]
        couple_inputs: Vec<String>,
        /// Outputs sent over the coupling channel
        #[arg(long = "couple-output", value_delimiter = ',')]
        couple_outputs: Vec<String>,
        /// Name of the coupled model
        #[arg(long, default_value = lpjml_config::operations::DEFAULT_PEER_NAME)]
        peer: String,
        #[command(flatten)]
        outputs: OutputArgs,
    },
    /// List the outputs the descriptor can write
    Outputs {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Base descriptor, serialized or templated
    #[arg(short, long, default_value = "lpjml.js")]
    config: PathBuf,
    /// Extra preprocessor macros (-DNAME or -DNAME=VALUE)
    #[arg(long = "macro", value_name = "MACRO", allow_hyphen_values = true)]
    macros: Vec<String>,
    /// Preprocessor timeout in seconds; no limit when left out
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Run directory the phases chain through
    #[arg(long)]
    sim_root: PathBuf,
    /// Where to write the descriptor (defaults to the run directory)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,
    /// Create input/, output/ and restart/ below the run directory
    #[arg(long)]
    create_dirs: bool,
}

#[derive(Args, Debug)]
struct YearArgs {
    /// First simulation year
    #[arg(long, default_value_t = lpjml_config::operations::DEFAULT_FIRST_YEAR)]
    start: i64,
    /// Last simulation year
    #[arg(long, default_value_t = lpjml_config::operations::DEFAULT_LAST_YEAR)]
    end: i64,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Outputs to write
    #[arg(long = "output", value_delimiter = ',')]
    outputs: Vec<String>,
    /// One resolution for all outputs, or one per output
    #[arg(long, value_delimiter = ',')]
    resolution: Vec<String>,
    /// Replace the configured outputs instead of appending
    #[arg(long)]
    replace: bool,
}

impl OutputArgs {
    fn resolution_spec(&self) -> ResolutionSpec {
        match self.resolution.as_slice() {
            [] => ResolutionSpec::Catalog,
            [one] => ResolutionSpec::uniform(one.clone()),
            many => ResolutionSpec::per_output(many.iter().cloned()),
        }
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "lpjml_config=info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

impl SourceArgs {
    fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            timeout: self.timeout.map(Duration::from_secs),
            ..LoaderConfig::default()
        }
    }
}

fn load(source: &SourceArgs, spin_up: bool) -> ConfigResult<RunDescriptor> {
    let config = source.loader_config();
    let loader = ConfigLoader::new(config)?;
    let mut options = LoadOptions::new().spin_up(spin_up);
    for def in &source.macros {
        options = options.macro_def(def.clone());
    }
    loader.load(&source.config, &options)
}

fn finish(descriptor: &RunDescriptor, run: &RunArgs, output_dir: &str) -> ConfigResult<()> {
    if run.create_dirs {
        create_subdirs(&run.sim_root)?;
    }
    let destination = run.out_dir.as_deref().unwrap_or(&run.sim_root);
    let path = descriptor.to_serialized(destination)?;
    println!("{}", path.display());
    tracing::info!(output_dir, "outputs will be written below");
    Ok(())
}

fn sim_root(run: &RunArgs) -> String {
    run.sim_root.to_string_lossy().into_owned()
}

fn run(command: Commands) -> ConfigResult<()> {
    match command {
        Commands::Spinup { source, run } => {
            let mut descriptor = load(&source, true)?;
            let output_dir = descriptor.configure_spinup(&sim_root(&run))?;
            finish(&descriptor, &run, &output_dir)
        }
        Commands::Historic {
            source,
            run,
            years,
            write_start,
            outputs,
        } => {
            let mut descriptor = load(&source, false)?;
            let mut options = HistoricOptions::new()
                .write_outputs(outputs.outputs.iter().cloned())
                .resolution(outputs.resolution_spec())
                .append(!outputs.replace);
            if let Some(year) = write_start {
                options = options.write_start_year(year);
            }
            let output_dir = descriptor.configure_historic(&sim_root(&run), years.start, years.end, &options)?;
            finish(&descriptor, &run, &output_dir)
        }
        Commands::Coupled {
            source,
            run,
            years,
            couple_inputs,
            couple_outputs,
            peer,
            outputs,
        } => {
            let mut descriptor = load(&source, false)?;
            let options = CoupledOptions::new()
                .write_outputs(outputs.outputs.iter().cloned())
                .resolution(outputs.resolution_spec())
                .append(!outputs.replace)
                .peer_name(peer);
            let output_dir = descriptor.configure_coupled(
                &sim_root(&run),
                years.start,
                years.end,
                couple_inputs.as_slice(),
                couple_outputs.as_slice(),
                &options,
            )?;
            finish(&descriptor, &run, &output_dir)
        }
        Commands::Outputs { source } => {
            let descriptor = load(&source, false)?;
            print_outputs(&descriptor, &source.config);
            Ok(())
        }
    }
}

fn print_outputs(descriptor: &RunDescriptor, source: &Path) {
    let catalog = descriptor.catalog();
    println!("{} outputs available in {}", catalog.len(), source.display());
    for var in catalog.iter() {
        let timestep = var.timestep.map_or("-", |t| t.as_str());
        println!(
            "{:>4}  {:<24} {:<8} {}",
            var.index,
            var.name,
            timestep,
            var.descr.as_deref().unwrap_or("")
        );
    }
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
