use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use r2audit_policy::{
    ComplianceRunner, EnvironmentCidrs, NetworkAnalyzer, PolicyConfig, DEFAULT_REPORT_PATH,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

const EXIT_LOAD_FAILURE: u8 = 2;
const EXIT_WRITE_FAILURE: u8 = 3;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "r2audit: compliance checks for synthesized Terraform JSON stacks"
)]
struct Cli {
    /// Debug-level logs on stderr
    #[arg(short, long, default_value_t=false, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Analyze a synthesized stack and write the compliance report
    Check {
        /// Synthesized stack (JSON with a top-level `resource` map)
        #[arg(short, long)]
        file: PathBuf,

        /// Report output path
        #[arg(short, long, default_value=DEFAULT_REPORT_PATH)]
        out: PathBuf,

        /// Policy overrides (YAML)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Check that per-environment address ranges do not overlap
    Environments {
        /// YAML or JSON list of `{name, cidrs}`
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let outcome = match cli.cmd {
        Cmd::Check { file, out, config } => check(file, out, config),
        Cmd::Environments { file } => environments(file),
    };
    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_LOAD_FAILURE)
        }
    }
}

fn check(file: PathBuf, out: PathBuf, config: Option<PathBuf>) -> Result<ExitCode> {
    let config = match config {
        Some(path) => PolicyConfig::load(&path)?,
        None => PolicyConfig::default(),
    };
    let mut runner = ComplianceRunner::new(file).with_config(config);
    if !runner.load_synthesized_stack() {
        return Ok(ExitCode::from(EXIT_LOAD_FAILURE));
    }
    let report = runner.run_analysis()?;
    match runner.write_and_display_report(&report, &out) {
        Ok(true) => Ok(ExitCode::SUCCESS),
        Ok(false) => Ok(ExitCode::FAILURE),
        Err(e) => {
            tracing::error!(path = %out.display(), error = %e, "failed to save compliance report");
            eprintln!("Error: {e}");
            Ok(ExitCode::from(EXIT_WRITE_FAILURE))
        }
    }
}

fn environments(file: PathBuf) -> Result<ExitCode> {
    let text = std::fs::read_to_string(&file).with_context(|| format!("read {}", file.display()))?;
    let envs: Vec<EnvironmentCidrs> =
        serde_yaml::from_str(&text)
            .with_context(|| format!("parse environments {}", file.display()))?;

    let violations = NetworkAnalyzer::new().validate_multi_environment(&envs);
    for v in &violations {
        println!(
            "[{}] {} {}: {}",
            v.severity, v.violation_type, v.resource_name, v.details["overlaps"]
        );
    }
    if violations.is_empty() {
        println!("No overlapping address ranges across {} environments", envs.len());
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{}", serde_json::to_string_pretty(&violations)?);
        Ok(ExitCode::FAILURE)
    }
}
