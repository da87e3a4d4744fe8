//! Pig iron balance entry point: CLI wiring and scenario execution.

use std::process;

use pig_iron_balance::cli::{self, ScenarioSource};
use pig_iron_balance::config::ScenarioConfig;
use pig_iron_balance::io::export::export_trajectory_csv;
use pig_iron_balance::logging;
use pig_iron_balance::runner::{RunResult, run_scenario};
use pig_iron_balance::scenario;
use pig_iron_balance::sim::types::TIME_FORMAT;

fn load(source: &ScenarioSource) -> Result<ScenarioConfig, String> {
    match source {
        ScenarioSource::File(path) => ScenarioConfig::from_file(path).map_err(|e| e.to_string()),
        ScenarioSource::Generated(seed) => Ok(scenario::generate(*seed)),
    }
}

fn print_result(result: &RunResult) -> Result<(), String> {
    let simulation = result.simulation().map_err(|e| e.to_string())?;

    println!("Trajectory:");
    for s in simulation.trajectory() {
        println!("  {s}");
    }

    println!("\nSpills:");
    for s in simulation.spills() {
        println!("  {} ({:?})", s.time.format(TIME_FORMAT), s.origin);
    }

    println!("\nConverters:");
    for c in result.balance.converters() {
        println!(
            "  #{:<3} {} {:<6} hmr {:.4}",
            c.index,
            c.time.format(TIME_FORMAT),
            c.line_id,
            c.hmr
        );
    }

    if let Some(opt) = &result.optimization {
        println!(
            "\nOptimizer: {} iterations, {} -> {} spills, final value {:.2} -> {:.2}",
            opt.iterations, opt.baseline_spills, opt.final_spills, opt.baseline_value, opt.final_value
        );
    }

    println!("\n{}", result.report);
    Ok(())
}

fn main() {
    let options = match cli::parse_args() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_usage();
            process::exit(1);
        }
    };
    if options.help {
        cli::print_usage();
        return;
    }

    logging::init();

    let mut scenario = match load(&options.source) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };
    if options.optimize {
        scenario.optimize_hmr = true;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let result = match run_scenario(&scenario) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = print_result(&result) {
        eprintln!("error: {e}");
        process::exit(1);
    }

    if let Some(path) = &options.trajectory_out {
        let written = result
            .simulation()
            .map_err(|e| e.to_string())
            .and_then(|sim| export_trajectory_csv(sim, path).map_err(|e| e.to_string()));
        if let Err(e) = written {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Trajectory written to {}", path.display());
    }
}
