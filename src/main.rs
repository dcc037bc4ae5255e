//! jobflow CLI Entry Point
//!
//! Runs the jobs of a flow file as local processes.
//!
//! # Usage
//!
//! ```bash
//! # Run a flow
//! jobflow flow.yaml
//!
//! # Print job reports as JSON
//! jobflow flow.yaml --json
//!
//! # With debug logging
//! jobflow flow.yaml --verbose
//! ```

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use colored::Colorize;
use log::{error, info};

use jobflow::execution::{Engine, JobReport, ProcessBackend};
use jobflow::workflow::load_flow;
use jobflow::{APP_NAME, VERSION};

/// Default flow file used when none is specified.
const DEFAULT_FLOW: &str = "flow.yaml";

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    flow_path: String,
    json: bool,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flow_path: DEFAULT_FLOW.to_string(),
            json: false,
            verbose: false,
        }
    }
}

/// What the command line asks for.
#[derive(Debug)]
enum Invocation {
    Run(Config),
    Help,
    Version,
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME, VERSION);
    println!("Fluent Job Orchestration");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: jobflow [OPTIONS] <FLOW_FILE>");
    println!();
    println!("Arguments:");
    println!("  <FLOW_FILE>   Path to flow YAML file (default: {})", DEFAULT_FLOW);
    println!();
    println!("Options:");
    println!("  --json        Print job reports as JSON");
    println!("  --verbose     Enable debug logging");
    println!("  --help        Show this help message");
    println!("  --version     Show version information");
    println!();
    println!("Examples:");
    println!("  jobflow pipeline.yaml");
    println!("  jobflow pipeline.yaml --json");
}

/// Parses command-line arguments.
fn parse_arguments(args: &[String]) -> Result<Invocation, String> {
    let mut config = Config::default();
    let mut positional_index = 0;

    // Skip program name
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => return Ok(Invocation::Help),
            "--version" | "-V" => return Ok(Invocation::Version),
            "--json" => config.json = true,
            "--verbose" | "-v" => config.verbose = true,
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                if positional_index > 0 {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                config.flow_path = arg.clone();
                positional_index += 1;
            }
        }
    }

    Ok(Invocation::Run(config))
}

/// Prints one line per task and a status line per job.
fn print_reports(reports: &[JobReport]) {
    println!();
    for report in reports {
        let status = if report.success {
            "done".green().bold()
        } else if report.error.is_some() {
            "error".red().bold()
        } else {
            report.state.to_string().red().bold()
        };

        println!(
            "{} {} ({} tasks, after {} ms)",
            format!("[{}]", report.tag).bold(),
            status,
            report.tasks.len(),
            report.finished_after_ms
        );
        for task in &report.tasks {
            println!(
                "    {} {} {}",
                task.submitted_at.format("%H:%M:%S%.3f").to_string().dimmed(),
                task.command,
                task.args.join(" ")
            );
        }
        if let Some(ref e) = report.error {
            println!("    {}", e.red());
        }
        if let Some(code) = report.exit_status.filter(|code| *code != 0) {
            println!("    exit status {}", code);
        }
    }
    println!();
}

/// Main application entry point. Returns true if every job succeeded.
fn run(config: Config) -> Result<bool, Box<dyn std::error::Error>> {
    setup_logging(config.verbose);

    if !config.json {
        print_banner();
    }

    let flow = load_flow(&config.flow_path).map_err(|e| {
        error!("Failed to load flow: {}", e);
        format!("Could not load flow from '{}': {}", config.flow_path, e)
    })?;

    info!("Flow loaded: {} jobs", flow.jobs.len());

    let engine = Engine::from_flow(flow, Arc::new(ProcessBackend::new()))?;
    let reports = engine.run();

    if config.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        print_reports(&reports);
    }

    Ok(reports.iter().all(|r| r.success))
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    let config = match parse_arguments(&args) {
        Ok(Invocation::Run(config)) => config,
        Ok(Invocation::Help) => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        Ok(Invocation::Version) => {
            println!("{} {}", APP_NAME, VERSION);
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match run(config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("jobflow")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_defaults() {
        match parse_arguments(&args(&[])).unwrap() {
            Invocation::Run(config) => {
                assert_eq!(config.flow_path, DEFAULT_FLOW);
                assert!(!config.json);
                assert!(!config.verbose);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_flags_and_path() {
        match parse_arguments(&args(&["pipeline.yaml", "--json", "-v"])).unwrap() {
            Invocation::Run(config) => {
                assert_eq!(config.flow_path, "pipeline.yaml");
                assert!(config.json);
                assert!(config.verbose);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_help_and_version() {
        assert!(matches!(parse_arguments(&args(&["--help"])), Ok(Invocation::Help)));
        assert!(matches!(parse_arguments(&args(&["-V"])), Ok(Invocation::Version)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_arguments(&args(&["--parallel"])).is_err());
        assert!(parse_arguments(&args(&["a.yaml", "b.yaml"])).is_err());
    }
}
