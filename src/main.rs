//! CLI entry point for the Steiner Tree Problem in Graphs solver: parses
//! arguments, installs cooperative cancellation, reads a PACE `.gr`
//! instance, and runs the three algorithmic layers (reductions, star
//! contraction, local search) under a shared wall-clock budget.
//!
//! Grounded in `original_source/src/MST.cpp`'s `main` (signal
//! registration, `graph_from_file(stdin)`, `greedy_2approx` fallback,
//! `print_solution`), with the CLI surface built from `clap::App`/`Arg`
//! and `crate_version!()`, single-command rather than per-verb `SubCommand`.

mod bridges;
mod config;
mod dreyfus_wagner;
mod error;
mod graph;
mod heap;
mod local_search;
mod mehlhorn;
mod pace;
mod reductions;
mod signal;
mod star;
mod traverse;
mod union_find;

use std::fs::File;
use std::io::{BufReader, Read, Write};

use clap::{crate_version, App, Arg};

use config::{Budget, Config};
use signal::StopSignal;

fn parse_flag<T: std::str::FromStr>(matches: &clap::ArgMatches, name: &str, default: T) -> T {
    matches.value_of(name).map(|s| s.parse().unwrap_or_else(|_| panic!("--{} must be a valid number", name))).unwrap_or(default)
}

fn build_config(matches: &clap::ArgMatches) -> Config {
    let defaults = Config::default();
    let destroy_sizes = matches
        .value_of("destroy-sizes")
        .map(|s| {
            s.split(',')
                .map(|tok| tok.trim().parse::<usize>().unwrap_or_else(|_| panic!("--destroy-sizes must be a comma-separated list of integers")))
                .collect()
        })
        .unwrap_or(defaults.destroy_sizes);

    Config {
        budget_secs: parse_flag(matches, "budget-secs", defaults.budget_secs),
        terminal_floor: parse_flag(matches, "terminal-floor", defaults.terminal_floor),
        seed: parse_flag(matches, "seed", defaults.seed),
        pool_cap: parse_flag(matches, "pool-cap", defaults.pool_cap),
        dw_cap: parse_flag(matches, "dw-cap", defaults.dw_cap),
        destroy_sizes,
    }
}

fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"));

    let matches = App::new("stpg-solver")
        .version(crate_version!())
        .about("Heuristic solver for the Steiner Tree Problem in Graphs (PACE-style)")
        .arg(Arg::with_name("input").takes_value(true).index(1).help("PACE .gr instance (reads stdin if omitted)"))
        .arg(Arg::with_name("budget-secs").long("budget-secs").takes_value(true).help("Wall-clock budget in seconds (default 280)"))
        .arg(Arg::with_name("terminal-floor").long("terminal-floor").takes_value(true).help("Star contraction stops once this many terminals remain"))
        .arg(Arg::with_name("seed").long("seed").takes_value(true).help("Local search PRNG seed"))
        .arg(Arg::with_name("pool-cap").long("pool-cap").takes_value(true).help("Local search solution pool cap"))
        .arg(Arg::with_name("dw-cap").long("dw-cap").takes_value(true).help("Dreyfus-Wagner |structure|*|V| guardrail"))
        .arg(Arg::with_name("destroy-sizes").long("destroy-sizes").takes_value(true).help("Comma-separated destroy-size multiset, e.g. 0,3,7,13"))
        .get_matches();

    let config = build_config(&matches);
    let stop = StopSignal::install()?;

    let mut input = String::new();
    match matches.value_of("input") {
        Some(path) => {
            BufReader::new(File::open(path)?).read_to_string(&mut input)?;
        }
        None => {
            std::io::stdin().read_to_string(&mut input)?;
        }
    }

    let mut g = match pace::read_pace(input.as_bytes()) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("malformed instance: {}", e);
            std::process::exit(1);
        }
    };
    log::info!("loaded instance: |V|={} |E|={} |R|={}", g.vertex_count(), g.edge_count(), g.terminal_count());

    let budget = Budget::from_secs(config.budget_secs);

    reductions::run_cheap_heuristics(&mut g);
    g.compress_graph();
    reductions::run_all_heuristics(&mut g);
    log::info!("after reductions: |V|={} |E|={} |R|={}", g.vertex_count(), g.edge_count(), g.terminal_count());

    g.save_orig_graph();
    star::contract_till_the_bitter_end(&mut g, &config, budget, &stop);
    log::info!("after star contraction: weight so far {}", g.partial_solution_weight());

    let solved = if stop.triggered() || budget.expired() { g.solution_graph() } else { local_search::run(&g, &config, budget, &stop) };

    let weight = solved.partial_solution_weight();
    let edges = solved.expand_to_original_pairs(solved.partial_solution());
    log::info!("final solution weight {} ({} original edges)", weight, edges.len());

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    pace::write_solution(&mut handle, weight, &edges)?;
    handle.flush()
}
