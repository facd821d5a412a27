use std::{fs, path::Path};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use potcheck::{
    checks,
    config::load_config,
    core::{
        error::PotcheckError,
        output::{write_report, OutputFormat},
        platform::TestPlatform,
        snapshot::TargetSnapshot,
    },
    probes::{
        nmap::{NmapRecon, NmapScriptProbe},
        web::HttpClient,
        wire::TcpWire,
        ReconScanner, ScanOptions,
    },
};

#[derive(Parser, Debug)]
#[command(
    name = "potcheck",
    about = "Honeypot detector - heuristic test battery with karma scoring"
)]
struct Cli {
    /// Target address to check
    target: String,
    /// Fingerprint the OS (usually requires elevated privileges)
    #[arg(short = 'O', long)]
    os_scan: bool,
    /// Maximum scanning level (1 = passive fingerprints, 2 = active probes)
    #[arg(short, long, default_value_t = 2)]
    level: u8,
    /// Scan a specific port range, e.g. 20-100; use `-` for all ports
    #[arg(short, long)]
    ports: Option<String>,
    /// Use -Pn and -T5 for faster scans on local connections
    #[arg(short, long)]
    fast: bool,
    /// Hide NOT APPLICABLE results for shorter output
    #[arg(short, long)]
    brief: bool,
    /// Path to config file (TOML). Default: config/potcheck.toml
    #[arg(long)]
    config: Option<String>,
    /// Write the report to this path as well
    #[arg(long)]
    output: Option<String>,
    /// Report file format
    #[arg(long, default_value = "jsonl", value_enum)]
    format: FormatArg,
    /// Increase verbosity (info, debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Optional log file path
    #[arg(long, default_value = "data/potcheck.log")]
    log_file: String,
}

#[derive(ValueEnum, Clone, Debug)]
enum FormatArg {
    Jsonl,
    Md,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Jsonl => OutputFormat::Jsonl,
            FormatArg::Md => OutputFormat::Markdown,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli)?;

    let config = load_config(cli.config.as_deref())?;

    let mut snapshot = TargetSnapshot::new(
        cli.target.clone(),
        Box::new(TcpWire),
        Box::new(HttpClient::new(&config)?),
        Box::new(NmapScriptProbe),
        config.http_timeout(),
    );

    let options = ScanOptions {
        os_scan: cli.os_scan,
        port_range: cli.ports.clone(),
        fast: cli.fast,
    };

    println!("Running scan on {} ...\n", cli.target);

    let data = NmapRecon
        .scan(&cli.target, &options)
        .with_context(|| format!("scan of {} failed", cli.target))?;
    snapshot.populate(data);

    let battery = checks::battery(cli.level, cli.os_scan, &config);
    let platform = TestPlatform::new(battery, &snapshot);
    let report = platform.run(true, cli.brief)?;

    if let Some(output) = &cli.output {
        let path = Path::new(output);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| PotcheckError::Config(e.to_string()))?;
        }
        write_report(&report, cli.format.into(), path)?;
        tracing::info!("report written to {}", path.display());
    }

    Ok(())
}

fn init_tracing(cli: &Cli) -> Result<(), PotcheckError> {
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let log_path = Path::new(&cli.log_file);
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).map_err(|e| PotcheckError::Config(e.to_string()))?;
    }
    if log_path.exists() {
        if let Ok(meta) = fs::metadata(log_path) {
            if meta.len() > 1_000_000 {
                let rotated = log_path.with_extension("log.1");
                let _ = fs::rename(log_path, rotated);
            }
        }
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|e| PotcheckError::Config(e.to_string()))?;

    let file_layer = fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(false);

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| PotcheckError::Config(e.to_string()))
}
