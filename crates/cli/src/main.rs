use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use bayestree_core::config::DEFAULT_PIVOT_TOL;
use bayestree_core::{GaussianBayesNet, SolveSettings, VectorValues};

mod input;

use input::load_bayes_net;

#[derive(Parser)]
#[command(name = "bayestree")]
#[command(version)]
#[command(about = "Solve and inspect eliminated linear-Gaussian systems")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Back-substitute a Gaussian Bayes net for its most likely assignment
    Solve {
        /// Path to the Bayes net JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Pivots at or below this magnitude are treated as zero
        #[arg(long, default_value_t = DEFAULT_PIVOT_TOL)]
        pivot_tol: f64,

        /// Output format: "text" (default) or "json"
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Compute the log-determinant and determinant of the whitened system
    Logdet {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long, default_value_t = DEFAULT_PIVOT_TOL)]
        pivot_tol: f64,

        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Print the dense upper-triangular matrix and right-hand side
    Matrix {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Check that the conditionals are in a valid elimination order
    Check {
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            input,
            pivot_tol,
            format,
        } => cmd_solve(&input, pivot_tol, &format),
        Commands::Logdet {
            input,
            pivot_tol,
            format,
        } => cmd_logdet(&input, pivot_tol, &format),
        Commands::Matrix { input, format } => cmd_matrix(&input, &format),
        Commands::Check { input } => cmd_check(&input),
    }
}

fn load(path: &Path) -> Result<GaussianBayesNet> {
    let net = load_bayes_net(path)?;
    log::info!(
        "Loaded {} conditionals over {} variables (dimension {}) from '{}'",
        net.len(),
        net.frontal_keys().len(),
        net.dim(),
        path.display()
    );
    Ok(net)
}

fn cmd_solve(path: &Path, pivot_tol: f64, output_format: &str) -> Result<()> {
    let net = load(path)?;
    let settings = SolveSettings::new().pivot_tolerance(pivot_tol);
    let solution = net
        .optimize_with(&settings)
        .context("Back-substitution failed")?;

    match output_format.to_lowercase().as_str() {
        "json" => print_json(&values_json(&solution))?,
        _ => print!("{}", solution),
    }
    Ok(())
}

fn cmd_logdet(path: &Path, pivot_tol: f64, output_format: &str) -> Result<()> {
    let net = load(path)?;
    let settings = SolveSettings::new().pivot_tolerance(pivot_tol);
    let log_det = net
        .log_determinant_with(&settings)
        .context("Log-determinant failed")?;

    match output_format.to_lowercase().as_str() {
        "json" => print_json(&serde_json::json!({
            "log_determinant": log_det,
            "determinant": log_det.exp(),
        }))?,
        _ => {
            println!("log-determinant: {:.6}", log_det);
            println!("determinant:     {:.6e}", log_det.exp());
        }
    }
    Ok(())
}

fn cmd_matrix(path: &Path, output_format: &str) -> Result<()> {
    let net = load(path)?;
    let (r, d) = net.matrix().context("Failed to assemble the dense system")?;

    match output_format.to_lowercase().as_str() {
        "json" => {
            let rows: Vec<Vec<f64>> = r
                .row_iter()
                .map(|row| row.iter().copied().collect())
                .collect();
            let ordering: Vec<serde_json::Value> = net
                .ordering()
                .iter()
                .map(|b| serde_json::json!({"key": b.key, "offset": b.offset, "dim": b.dim}))
                .collect();
            print_json(&serde_json::json!({
                "ordering": ordering,
                "R": rows,
                "d": d.as_slice(),
            }))?;
        }
        _ => {
            let columns: Vec<String> = net
                .ordering()
                .iter()
                .map(|b| format!("{}[{}]", b.key, b.dim))
                .collect();
            println!("columns: {}", columns.join(" "));
            println!("R ={}", r);
            println!("d ={}", d);
        }
    }
    Ok(())
}

fn cmd_check(path: &Path) -> Result<()> {
    let net = load(path)?;
    net.validate()
        .with_context(|| format!("'{}' is not a valid elimination order", path.display()))?;
    println!("ok: {} conditionals", net.len());
    Ok(())
}

fn values_json(values: &VectorValues) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = values
        .iter()
        .map(|(key, v)| serde_json::json!({"key": key, "value": v.as_slice()}))
        .collect();
    serde_json::json!({ "values": entries })
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    let json_str = serde_json::to_string_pretty(value)?;
    println!("{}", json_str);
    Ok(())
}
