use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use ui_probe::config::{self, Config};
use ui_probe::harness::{Scenario, run_scenario};
use ui_probe::runner::RunResult;
use ui_probe::session::{Session, cleanup_old_sessions, list_sessions};
use ui_probe::snapshot::SnapshotConfig;

/// UI Probe - browser-driven UI verification with a mocked request boundary
#[derive(Parser, Debug)]
#[command(
    name = "ui-probe",
    about = "Run UI verification scenarios against a headless browser and collect screenshot evidence",
    after_help = "ENVIRONMENT VARIABLES:\n\
        UI_PROBE_BASE_URL          Override every scenario's target URL\n\
        UI_PROBE_HEADLESS          Run without a browser window (default: true)\n\
        UI_PROBE_TIMEOUT_MS        Default step timeout in ms (default: 10000)\n\
        UI_PROBE_POLL_INTERVAL_MS  Condition polling interval in ms (default: 50)\n\
        UI_PROBE_SCREENSHOT_DIR    Base directory for run evidence\n\
        UI_PROBE_CHROME_PATH       Chromium/Chrome executable\n\
        UI_PROBE_VIEWPORT          Viewport size as WxH (default: 1280x800)\n\
        RUST_LOG                   Log filter (default: info)"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run scenario files (directories are expanded to their *.json files)
    Run {
        /// Scenario files or directories
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Load this URL instead of each scenario's target URL
        #[arg(long, env = "UI_PROBE_BASE_URL")]
        base_url: Option<String>,

        /// Show the browser window
        #[arg(long)]
        headed: bool,

        /// Default timeout for navigation and every locating/asserting step (ms)
        #[arg(long, env = "UI_PROBE_TIMEOUT_MS")]
        timeout_ms: Option<u64>,

        /// Base directory for screenshots and run reports
        #[arg(long, env = "UI_PROBE_SCREENSHOT_DIR")]
        screenshot_dir: Option<PathBuf>,

        /// Chromium/Chrome executable
        #[arg(long, env = "UI_PROBE_CHROME_PATH")]
        chrome_path: Option<PathBuf>,

        /// Write only PNG files, without per-screenshot manifests and descriptions
        #[arg(long)]
        images_only: bool,

        /// Print run results as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Run all scenarios concurrently, each in its own browser
        #[arg(long)]
        parallel: bool,
    },

    /// Parse scenario files and print their step plans without launching a browser
    Validate {
        /// Scenario files or directories
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Inspect or prune run evidence directories
    Sessions {
        #[command(subcommand)]
        action: SessionCommands,
    },
}

#[derive(Subcommand, Debug)]
enum SessionCommands {
    /// List run directories
    List {
        /// Evidence base directory (default: configured screenshot dir)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Delete run directories older than the given age
    Prune {
        #[arg(long)]
        max_age_hours: u64,

        /// Evidence base directory (default: configured screenshot dir)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Some(Commands::Run {
            files,
            base_url,
            headed,
            timeout_ms,
            screenshot_dir,
            chrome_path,
            images_only,
            json,
            parallel,
        }) => {
            let scenarios = load_scenarios(&files)?;

            let mut options = config::get().run_options();
            if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
                options = options.base_url(url);
            }
            if headed {
                options = options.headless(false);
            }
            if let Some(ms) = timeout_ms {
                options = options.timeout_ms(ms);
            }
            if let Some(dir) = screenshot_dir {
                options = options.screenshot_dir(dir);
            }
            if chrome_path.is_some() {
                options.chrome_path = chrome_path;
            }
            if images_only {
                options = options.snapshot(SnapshotConfig::images_only());
            }

            let results: Vec<RunResult> = if parallel {
                futures_util::future::join_all(scenarios.iter().map(|s| run_scenario(s, &options))).await
            } else {
                let mut results = Vec::with_capacity(scenarios.len());
                for scenario in &scenarios {
                    results.push(run_scenario(scenario, &options).await);
                }
                results
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_results(&results);
            }

            let failed = results.iter().filter(|r| !r.success).count();
            if failed > 0 {
                eprintln!("{} of {} scenario(s) failed", failed, results.len());
                return Ok(ExitCode::FAILURE);
            }
        }

        Some(Commands::Validate { files }) => {
            let scenarios = load_scenarios(&files)?;
            for scenario in &scenarios {
                println!("{} -> {}", scenario.name, scenario.target_url);
                if let Some(description) = &scenario.description {
                    println!("  {}", description);
                }
                if let Some(mock) = &scenario.mock {
                    println!(
                        "  mock: {} ({} rule(s){})",
                        mock.boundary(),
                        mock.rules.len(),
                        if mock.fallback.is_some() { ", fallback" } else { "" }
                    );
                }
                for (index, step) in scenario.steps.iter().enumerate() {
                    println!("  {:>2}. {}", index, step);
                }
            }
            println!("{} scenario(s) valid", scenarios.len());
        }

        Some(Commands::Sessions { action }) => match action {
            SessionCommands::List { dir } => {
                let base = dir.unwrap_or_else(config::screenshot_dir);
                let sessions = list_sessions(&base)?;
                if sessions.is_empty() {
                    println!("No runs under {}", base.display());
                }
                for dir in sessions {
                    let captures = Session::in_dir(&dir).list_captures()?;
                    println!("{} ({} screenshot(s))", dir.display(), captures.len());
                }
            }
            SessionCommands::Prune { max_age_hours, dir } => {
                let base = dir.unwrap_or_else(config::screenshot_dir);
                let removed = cleanup_old_sessions(&base, Duration::from_secs(max_age_hours * 3600))?;
                println!("Removed {} run(s) older than {}h from {}", removed, max_age_hours, base.display());
            }
        },

        None => {
            let config = Config::from_env();
            println!("UI Probe - browser-driven UI verification");
            println!();
            println!("Usage: ui-probe <COMMAND>");
            println!();
            println!("Commands:");
            println!("  run       Run scenario files against a headless browser");
            println!("  validate  Check scenario files without launching a browser");
            println!("  sessions  List or prune run evidence directories");
            println!();
            println!("Evidence directory: {}", config.evidence.screenshot_dir.display());
            println!("Run with --help for more information.");
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Load scenario files, expanding directories to their `*.json` entries
fn load_scenarios(paths: &[PathBuf]) -> Result<Vec<Scenario>, Box<dyn Error>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(json_files_in(path)?);
        } else {
            files.push(path.clone());
        }
    }
    if files.is_empty() {
        return Err("no scenario files found".into());
    }

    let mut scenarios = Vec::with_capacity(files.len());
    for file in files {
        scenarios.push(Scenario::load(&file)?);
    }
    Ok(scenarios)
}

fn json_files_in(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn print_results(results: &[RunResult]) {
    for result in results {
        println!("{}", result.summary());
        for step in &result.steps {
            let marker = if step.error.is_some() { "x" } else { "ok" };
            println!("  [{:>2}] {:>2}. {} ({}ms)", marker, step.index, step.description, step.duration_ms);
        }
        for screenshot in &result.screenshots {
            println!("  screenshot: {}", screenshot.display());
        }
        if let Some(failure) = &result.failure {
            eprintln!("{}: {} [{}]", result.scenario, failure, failure.kind());
            if let Some(path) = &result.error_screenshot {
                eprintln!("  error screenshot: {}", path.display());
            }
        }
        println!("  evidence: {}", result.evidence_dir.display());
    }
}
