mod cache;
mod config;
mod memory;
mod replace;
mod trace;

use std::{fs, io};

use log::info;

use crate::{
    cache::IsCache,
    config::Config,
    trace::{Op, Trace},
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = pico_args::Arguments::from_env();
    let n_warm: u64 = args
        .opt_value_from_str("-w")
        .expect("-w should be an integer")
        .unwrap_or(0);
    let heartbeat_int: u64 = args
        .opt_value_from_str("--heartbeat")
        .expect("--heartbeat should be an integer")
        .unwrap_or(0);

    let config_str: String = if let Some(config_str) = args.opt_value_from_str("--config").unwrap()
    {
        config_str
    } else {
        let config_path: String = args
            .opt_value_from_str("-p")
            .unwrap()
            .expect("Must provide a config with --config <json> or -p <path>");
        fs::read_to_string(config_path).expect("Could not find config file")
    };
    let config: Config = serde_json::from_str(&config_str).expect("Malformed config");
    let mut cache = config.build().unwrap_or_else(|err| panic!("Bad config: {err}"));

    let stats_path: Option<String> = args.opt_value_from_str("--json").unwrap();
    let mut next_heartbeat = heartbeat_int;

    let trace_path: Option<String> = args.opt_value_from_str("-t").unwrap();
    let synth_count: Option<u64> = args
        .opt_value_from_str("--synth")
        .expect("--synth should be an integer");
    let synth_seed: u64 = args
        .opt_value_from_str("--seed")
        .expect("--seed should be an integer")
        .unwrap_or(0);
    let per_batch: usize = args
        .opt_value_from_str("--buffer-size")
        .expect("--buffer-size must be an integer")
        .unwrap_or(1024 * 16);
    let batches_per_queue: usize = args
        .opt_value_from_str("--queue-size")
        .expect("--queue-size must be an integer")
        .unwrap_or(32);

    let trace = match (trace_path, synth_count) {
        (Some(path), _) => {
            Trace::read(path.into(), per_batch, batches_per_queue).expect("Could not open trace")
        }
        (None, Some(count)) => Trace::synthetic(
            count,
            config.memory_bytes,
            synth_seed,
            per_batch,
            batches_per_queue,
        ),
        (None, None) => panic!("Must provide a trace with -t <path> or --synth <count>"),
    };

    info!(
        "cache `{}`: {} bytes, {}-byte blocks, {}-way",
        config.name, config.cache_bytes, config.block_size, config.associativity
    );

    let mut replayed: u64 = 0;
    let mut warming = n_warm > 0;
    loop {
        let batch = match trace.rec.recv() {
            Ok(batch) => batch.unwrap_or_else(|err| panic!("Trace replay failed: {err}")),
            Err(_) => break,
        };
        for access in &batch {
            match access.op {
                Op::Read => {
                    cache.read(access.addr);
                }
                Op::Write(value) => cache.write(access.addr, value),
            }
        }
        replayed += batch.len() as u64;

        if warming && replayed >= n_warm {
            cache.clear_stats();
            warming = false;
            info!("finished warmup after {replayed} accesses");
        }
        if heartbeat_int != 0 && replayed > next_heartbeat {
            info!("replayed {replayed} accesses");
            while next_heartbeat < replayed {
                next_heartbeat += heartbeat_int;
            }
        }
    }
    info!(
        "replayed {replayed} accesses: {} misses in {} counted",
        cache.miss_count(),
        cache.access_count()
    );

    let stats = cache.make_stats();
    match stats_path {
        Some(path) => {
            let stats_file = fs::File::create(path).expect("Cannot open output file");
            serde_json::to_writer_pretty(stats_file, &stats).unwrap();
        }
        None => {
            serde_json::to_writer_pretty(io::stdout().lock(), &stats).unwrap();
            println!();
        }
    }
}
