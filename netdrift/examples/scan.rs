//! Drift scan example
//!
//! Scans a set of console-attached routers against a stable baseline
//! snapshot, prints every problem found and, with `--fix`, offers each fix
//! for approval on stdin, most urgent first. Ctrl-C stops the scan and
//! still closes every session.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example scan -- --baseline stable.txt \
//!     --device R1=192.168.56.10:5001 --device R2=192.168.56.10:5002
//! ```
//!
//! Interactive fixing, then a fresh snapshot of the fixed devices:
//! ```bash
//! cargo run --example scan -- --config netdrift.toml --baseline stable.txt \
//!     --device R1=192.168.56.10:5001 --fix --snapshot stable-new.txt
//! ```

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use netdrift::baseline::{BaselineStore, SnapshotFile};
use netdrift::orchestrator::{DeviceTarget, FixOutcome, Orchestrator};
use netdrift::{Decision, DriftConfig, Endpoint, FixPlan, Problem};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.devices.is_empty() {
        eprintln!("Error: at least one --device NAME=HOST:PORT is required");
        std::process::exit(1);
    }

    println!("=== netdrift scan ===\n");

    let config = match &args.config {
        Some(path) => DriftConfig::from_path(path)?,
        None => DriftConfig::default(),
    };
    let store = BaselineStore::new(config.defaults.clone(), config.participation.clone());
    let loaded = store.load_from(&SnapshotFile(args.baseline.clone()))?;
    println!("Loaded baselines for {} device(s)\n", loaded);

    let mut orchestrator = Orchestrator::new(config, Arc::new(store));

    // Ctrl-C stops the workers; they hand their sessions back first
    let shutdown = orchestrator.shutdown_token();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nInterrupted, closing sessions...");
                shutdown.cancel();
            }
        }
    });

    let outcome = drive(&mut orchestrator, &args, &shutdown).await;
    orchestrator.close_all().await;
    outcome
}

/// Scan, optionally fix and snapshot. Sessions are closed by the caller
/// whatever this returns.
async fn drive(
    orchestrator: &mut Orchestrator,
    args: &Args,
    shutdown: &CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = orchestrator.scan(&args.devices).await;
    println!("{}\n", report);

    if args.fix && report.problem_count() > 0 && !shutdown.is_cancelled() {
        let mut approval = ask_operator;
        let records = orchestrator.fix(&report, &mut approval).await;

        println!("\n--- Fix summary ---");
        for record in &records {
            println!("{}", record);
        }
        let applied = records.iter().filter(|r| r.outcome.is_applied()).count();
        let manual = records
            .iter()
            .filter(|r| matches!(r.outcome, FixOutcome::Manual(_)))
            .count();
        println!("{} applied, {} need manual intervention", applied, manual);
    }

    if let Some(path) = &args.snapshot {
        if shutdown.is_cancelled() {
            println!("\nInterrupted, snapshot not written");
            return Ok(());
        }
        let snapshot = orchestrator.capture_snapshot(&timestamp()).await;
        std::fs::write(path, &snapshot)?;
        println!("\nSnapshot written to {}", path.display());
    }
    Ok(())
}

/// Show the plan and read y / n / s from stdin.
fn ask_operator(problem: &Problem, plan: &FixPlan) -> Decision {
    println!("\n{}", problem);
    println!("  evidence: {}", problem.evidence());
    println!("  proposed fix:\n{}", plan);

    loop {
        print!("Apply? [y]es / [n]o / [s]kip device: ");
        let _ = io::stdout().flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).unwrap_or(0) == 0 {
            return Decision::SkipDevice;
        }
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Decision::Apply,
            "n" | "no" => return Decision::Decline,
            "s" | "skip" => return Decision::SkipDevice,
            _ => println!("Please answer y, n or s"),
        }
    }
}

/// Seconds since the epoch; good enough to order snapshots.
fn timestamp() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("{}", secs)
}

struct Args {
    config: Option<PathBuf>,
    baseline: PathBuf,
    devices: Vec<DeviceTarget>,
    fix: bool,
    snapshot: Option<PathBuf>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut config = None;
        let mut baseline = PathBuf::from("stable.txt");
        let mut devices = Vec::new();
        let mut fix = false;
        let mut snapshot = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--config" | "-c" => {
                    i += 1;
                    if i < args.len() {
                        config = Some(PathBuf::from(&args[i]));
                    }
                }
                "--baseline" | "-b" => {
                    i += 1;
                    if i < args.len() {
                        baseline = PathBuf::from(&args[i]);
                    }
                }
                "--device" | "-d" => {
                    i += 1;
                    if i < args.len() {
                        match parse_device(&args[i]) {
                            Some(device) => devices.push(device),
                            None => eprintln!("Ignoring malformed device '{}'", args[i]),
                        }
                    }
                }
                "--fix" => fix = true,
                "--snapshot" | "-s" => {
                    i += 1;
                    if i < args.len() {
                        snapshot = Some(PathBuf::from(&args[i]));
                    }
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                _ => {}
            }
            i += 1;
        }

        Self {
            config,
            baseline,
            devices,
            fix,
            snapshot,
        }
    }
}

/// `R1=192.168.56.10:5001`
fn parse_device(arg: &str) -> Option<DeviceTarget> {
    let (name, address) = arg.split_once('=')?;
    let (host, port) = address.rsplit_once(':')?;
    Some(DeviceTarget::new(name, Endpoint::telnet(host, port.parse().ok()?)))
}

fn print_help() {
    println!("netdrift scan example\n");
    println!("Usage: scan [OPTIONS] --device NAME=HOST:PORT...\n");
    println!("Options:");
    println!("  -c, --config <PATH>          TOML configuration file");
    println!("  -b, --baseline <PATH>        Stable snapshot [default: stable.txt]");
    println!("  -d, --device <NAME=HOST:PORT> Device console (repeatable)");
    println!("      --fix                    Offer fixes for approval");
    println!("  -s, --snapshot <PATH>        Write a new snapshot after the run");
    println!("      --help                   Print help");
}
