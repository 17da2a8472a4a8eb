mod common;
mod logic;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use lifepath_engine::JourneyKind;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use common::{TesterAssets, resolve_seeds, split_csv};
use logic::{LogicTester, ScenarioResult, parse_strategies};

#[derive(Debug, Parser)]
#[command(name = "lifepath-tester", version)]
#[command(about = "Automated playthroughs for Lifepath journeys, checking engine invariants")]
struct Args {
    /// Bundled journeys to run (comma-separated, `all` or `none`)
    #[arg(long, default_value = "all")]
    journeys: String,

    /// Extra journey definition files (JSON), may be repeated
    #[arg(long = "definition")]
    definitions: Vec<PathBuf>,

    /// List bundled journeys and exit
    #[arg(long)]
    list_journeys: bool,

    /// Strategies to run (comma-separated: cautious,growth,balanced,random or all)
    #[arg(long, default_value = "all")]
    strategies: String,

    /// Seeds to run (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per journey, strategy and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console", "csv"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_journeys(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let results = run_journeys(&args)?;
    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_journeys(args: &Args) -> Result<bool> {
    if !args.list_journeys {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available journeys:")?;
    for kind in JourneyKind::ALL {
        writeln!(output_target.writer(), "  {:16} - {}", kind.id(), kind.label())?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🧭 Lifepath Journey Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn run_journeys(args: &Args) -> Result<Vec<ScenarioResult>> {
    let journey_ids = split_csv(&args.journeys);
    let assets = TesterAssets::load(&journey_ids, &args.definitions)?;
    let strategies = parse_strategies(&split_csv(&args.strategies))?;
    let seeds = resolve_seeds(&split_csv(&args.seeds))?;

    log::info!(
        "running {} journey(s) x {} strategy(ies) x {} seed(s), {} iteration(s) each",
        assets.journeys.len(),
        strategies.len(),
        seeds.len(),
        args.iterations
    );
    println!("{}", "🧠 Running Journey Playthroughs".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let tester = LogicTester::new(args.verbose);
    Ok(tester.run_matrix(&assets.journeys, &strategies, &seeds, args.iterations))
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => logic::reports::generate_json_report(&mut output_target, results)?,
        "csv" => logic::reports::generate_csv_report(&mut output_target, results)?,
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Lifepath Journey Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        _ => {
            if results.is_empty() {
                writeln!(&mut output_target, "No journey scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            }
            writeln!(&mut output_target)?;
            writeln!(
                &mut output_target,
                "🏁 Total time: {:?}",
                start_time.elapsed()
            )?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            journeys: "homebuyer".to_string(),
            definitions: Vec::new(),
            list_journeys: false,
            strategies: "growth".to_string(),
            seeds: "1337".to_string(),
            iterations: 1,
            report: "json".to_string(),
            verbose: false,
            output: None,
        }
    }

    fn temp_output(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "lifepath-tester-{label}-{}.out",
            std::process::id()
        ))
    }

    #[test]
    fn args_parse_from_cli() {
        let args = Args::try_parse_from([
            "lifepath-tester",
            "--journeys",
            "homebuyer,mid-career",
            "--definition",
            "a.json",
            "--definition",
            "b.json",
            "--report",
            "csv",
            "-v",
        ])
        .unwrap();
        assert_eq!(args.definitions.len(), 2);
        assert_eq!(args.report, "csv");
        assert!(args.verbose);
        assert_eq!(args.iterations, 10);
        assert!(Args::try_parse_from(["lifepath-tester", "--report", "xml"]).is_err());
    }

    #[test]
    fn run_journeys_builds_the_requested_matrix() {
        let mut args = base_args();
        args.strategies = "cautious,growth".to_string();
        args.seeds = "1,2".to_string();
        let results = run_journeys(&args).unwrap();
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.passed));
    }

    #[test]
    fn run_journeys_rejects_bad_inputs() {
        let mut args = base_args();
        args.strategies = "reckless".to_string();
        assert!(run_journeys(&args).is_err());

        let mut args = base_args();
        args.journeys = "moon-base".to_string();
        assert!(run_journeys(&args).is_err());
    }

    #[test]
    fn write_reports_targets_output_file() {
        let path = temp_output("json");
        let mut args = base_args();
        args.output = Some(path.clone());
        let results = run_journeys(&args).unwrap();
        write_reports(&args, &results, Instant::now()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["scenario_name"], "homebuyer/growth");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn list_journeys_writes_catalog() {
        let path = temp_output("list");
        let mut args = base_args();
        args.list_journeys = true;
        args.output = Some(path.clone());
        assert!(maybe_list_journeys(&args).unwrap());
        let text = std::fs::read_to_string(&path).unwrap();
        for kind in JourneyKind::ALL {
            assert!(text.contains(kind.id()));
        }
        let _ = std::fs::remove_file(path);

        assert!(!maybe_list_journeys(&base_args()).unwrap());
    }
}
