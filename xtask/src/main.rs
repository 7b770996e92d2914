use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the ride lifecycle workspace",
    long_about = "A unified CLI for running the rider and driver demos, benchmarks,\n\
                  and CI checks in the ride lifecycle workspace."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the rider trip demo (booking through completion)
    Rider {
        /// Log filter passed to the demo as RUST_LOG
        #[arg(long, env = "RUST_LOG", default_value = "ride_core=info")]
        log: String,
    },
    /// Run the driver shift demo (timeout, decline, accepted ride)
    Driver {
        /// Log filter passed to the demo as RUST_LOG
        #[arg(long, env = "RUST_LOG", default_value = "ride_core=info")]
        log: String,
    },
    /// Run Criterion benchmarks
    Bench,
    /// Run CI checks (fmt, clippy, tests, examples, benchmarks)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Build and run the demos
    Examples,
    /// Compile benchmarks without running them
    Bench,
    /// Run check + examples + bench
    All,
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str], envs: &[(&str, &str)]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    match Command::new("cargo")
        .args(args)
        .envs(envs.iter().copied())
        .status()
    {
        Ok(status) => status,
        Err(error) => {
            eprintln!("failed to execute cargo: {error}");
            exit(1);
        }
    }
}

fn run_cargo(args: &[&str]) {
    run_cargo_with_env(args, &[]);
}

fn run_cargo_with_env(args: &[&str], envs: &[(&str, &str)]) {
    let status = cargo(args, envs);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn run_example(name: &str, log: &str) {
    run_cargo_with_env(
        &["run", "-p", "ride_core", "--example", name],
        &[("RUST_LOG", log)],
    );
}

fn ci_check() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    step("Test ride_core");
    run_cargo(&["test", "-p", "ride_core"]);
}

fn ci_examples() {
    for example in ["rider_trip", "driver_shift"] {
        step(&format!("Run example {example}"));
        run_example(example, "warn");
    }
}

fn ci_bench() {
    step("Compile benchmarks");
    run_cargo(&["bench", "--package", "ride_core", "--no-run"]);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Rider { log } => run_example("rider_trip", &log),
        Commands::Driver { log } => run_example("driver_shift", &log),
        Commands::Bench => {
            run_cargo(&["bench", "--package", "ride_core", "--bench", "performance"]);
        }
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check(),
                CiJob::Examples => ci_examples(),
                CiJob::Bench => ci_bench(),
                CiJob::All => {
                    ci_check();
                    ci_examples();
                    ci_bench();
                }
            }
            eprintln!("\nCI job passed.");
        }
    }
}
