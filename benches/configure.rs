use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use serde_json::json;

use lpjml_config::{CoupledOptions, HistoricOptions, RunDescriptor};

const CATALOG_SIZE: usize = 400;

/// A descriptor with a catalog about the size of a full LPJmL `outputvar`.
fn make_descriptor() -> RunDescriptor {
    let outputvar: Vec<serde_json::Value> = (0..CATALOG_SIZE)
        .map(|i| {
            let name = if i == 0 { "grid".to_string() } else { format!("out_{i}") };
            json!({"id": i, "name": name, "descr": format!("output {i}"), "timestep": "annual"})
        })
        .collect();
    let output: Vec<serde_json::Value> = (0..60)
        .map(|i| {
            let id = if i == 0 { "grid".to_string() } else { format!("out_{i}") };
            json!({"id": id, "file": {"fmt": "raw", "name": format!("output/{id}.bin")}})
        })
        .collect();
    let input: serde_json::Map<String, serde_json::Value> = (0..40)
        .map(|i| {
            let key = format!("in_{i}");
            (key.clone(), json!({"id": key, "fmt": "clm", "name": format!("input/{key}.clm")}))
        })
        .collect();

    RunDescriptor::from_mapping(json!({
        "sim_name": "lpjml",
        "firstyear": 1901,
        "lastyear": 2017,
        "outputyear": 1901,
        "nspinup": 0,
        "restart_year": 2017,
        "restart_filename": "restart/restart_1900.lpj",
        "write_restart_filename": "restart/restart_2017.lpj",
        "write_restart": true,
        "float_grid": false,
        "coupled_model": null,
        "input": input,
        "outputvar": outputvar,
        "output": output
    }))
    .unwrap()
}

fn bench_phases(c: &mut Criterion) {
    let base = make_descriptor();
    let write_outputs: Vec<String> = (100..140).map(|i| format!("out_{i}")).collect();
    let couple_outputs: Vec<String> = (200..220).map(|i| format!("out_{i}")).collect();
    let couple_inputs: Vec<String> = (0..10).map(|i| format!("in_{i}")).collect();

    let mut group = c.benchmark_group("configure");
    group.throughput(Throughput::Elements(1));

    group.bench_function("spinup", |b| {
        b.iter(|| {
            let mut desc = base.clone();
            desc.configure_spinup("/run").unwrap()
        });
    });

    let historic = HistoricOptions::new().write_outputs(write_outputs.iter().cloned());
    group.bench_function("historic", |b| {
        b.iter(|| {
            let mut desc = base.clone();
            desc.configure_historic("/run", 1901, 2000, &historic).unwrap()
        });
    });

    let coupled = CoupledOptions::new().write_outputs(write_outputs.iter().cloned());
    group.bench_function("coupled", |b| {
        b.iter(|| {
            let mut desc = base.clone();
            desc.configure_coupled(
                "/run",
                2001,
                2050,
                couple_inputs.as_slice(),
                couple_outputs.as_slice(),
                &coupled,
            )
            .unwrap()
        });
    });

    group.bench_function("serialize", |b| {
        b.iter(|| base.to_json_pretty().unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_phases);
criterion_main!(benches);
