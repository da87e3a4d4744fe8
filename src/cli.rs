use std::env;
use std::path::PathBuf;

/// Seed used when neither `--scenario` nor `--generate` is given.
pub const DEFAULT_SEED: u64 = 42;

/// Where the scenario comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioSource {
    /// TOML or JSON file, chosen by extension.
    File(PathBuf),
    /// Random two-line schedule for a seed.
    Generated(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub source: ScenarioSource,
    /// Force the HMR optimizer on regardless of the scenario flag.
    pub optimize: bool,
    pub trajectory_out: Option<PathBuf>,
    pub help: bool,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(&args)
}

pub fn parse_args_from(args: &[String]) -> Result<CliOptions, String> {
    let mut i = 0usize;
    let mut scenario = None;
    let mut seed = None;
    let mut optimize = false;
    let mut trajectory_out = None;

    while i < args.len() {
        match args[i].as_str() {
            "--scenario" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --scenario (expected a TOML or JSON file path)",
                )?;
                if scenario.replace(PathBuf::from(path)).is_some() {
                    return Err("--scenario provided more than once".to_string());
                }
            }
            "--generate" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --generate (expected a u64 seed)")?;
                let value = raw
                    .parse::<u64>()
                    .map_err(|_| format!("--generate value \"{raw}\" is not a valid u64"))?;
                if seed.replace(value).is_some() {
                    return Err("--generate provided more than once".to_string());
                }
            }
            "--optimize" => optimize = true,
            "--trajectory-out" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --trajectory-out (expected a file path)",
                )?;
                if trajectory_out.replace(PathBuf::from(path)).is_some() {
                    return Err("--trajectory-out provided more than once".to_string());
                }
            }
            "--help" | "-h" => {
                return Ok(CliOptions {
                    source: ScenarioSource::Generated(DEFAULT_SEED),
                    optimize,
                    trajectory_out,
                    help: true,
                });
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    let source = match (scenario, seed) {
        (Some(_), Some(_)) => {
            return Err(
                "arguments `--scenario` and `--generate` are mutually exclusive; choose one source"
                    .to_string(),
            );
        }
        (Some(path), None) => ScenarioSource::File(path),
        (None, Some(seed)) => ScenarioSource::Generated(seed),
        (None, None) => ScenarioSource::Generated(DEFAULT_SEED),
    };

    Ok(CliOptions {
        source,
        optimize,
        trajectory_out,
        help: false,
    })
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("pig-iron-balance: transfer station pig iron balance simulator");
    eprintln!();
    eprintln!("Usage:");
    eprintln!(
        "  pig-iron-balance [--scenario <path> | --generate <seed>] [--optimize] [--trajectory-out <path>]"
    );
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from a TOML or JSON file");
    eprintln!("  --generate <u64>         Generate a random two-line scenario");
    eprintln!("  --optimize               Run the HMR optimizer after the baseline pass");
    eprintln!("  --trajectory-out <path>  Export the final trajectory to CSV");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("Without --scenario or --generate, seed {DEFAULT_SEED} is generated.");
}
