use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use airdrop_engine::{
    evaluate, quick_stability_check, run_monte_carlo, run_monte_carlo_with_threads, run_risk_analyses,
    with_thread_pool, AnalysisMode, Decision, Doctrine, EvaluationConfig, EvaluationSnapshot, MonteCarloParams,
    PolicyMode, ThresholdPolicy,
};

#[derive(Parser)]
#[command(name = "airdrop")]
#[command(version)]
#[command(about = "Monte Carlo payload drop evaluation and drop / no-drop decision", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Mission overrides shared by the simulation commands
#[derive(clap::Args)]
struct MissionArgs {
    /// Mission config JSON (defaults to the reference mission)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Number of Monte Carlo samples
    #[arg(short = 'n', long)]
    samples: Option<usize>,

    /// Random seed
    #[arg(short = 's', long)]
    seed: Option<u64>,

    /// Worker threads for the sampler (defaults to all cores)
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the drop decision for a mission
    Evaluate {
        #[command(flatten)]
        mission: MissionArgs,

        /// Doctrine (strict, balanced, aggressive)
        #[arg(short = 'd', long)]
        doctrine: Option<String>,

        /// Decision threshold (percent)
        #[arg(short = 't', long, conflicts_with = "policy")]
        threshold: Option<f64>,

        /// Named threshold policy (conservative, balanced, aggressive)
        #[arg(long)]
        policy: Option<String>,

        /// Risk analyses to attach (fast, thorough)
        #[arg(short = 'a', long)]
        analysis: Option<String>,

        /// Previous final decision, for hysteresis (drop, no-drop)
        #[arg(long)]
        previous_decision: Option<String>,

        /// Output format
        #[arg(short = 'o', long, default_value = "table")]
        output: EvaluateOutput,
    },

    /// Run the sampler and print the impact points
    MonteCarlo {
        #[command(flatten)]
        mission: MissionArgs,

        /// Output format
        #[arg(short = 'o', long, default_value = "csv")]
        output: MonteCarloOutput,
    },

    /// Check CEP50 convergence when the time step is halved
    StabilityCheck {
        #[command(flatten)]
        mission: MissionArgs,
    },

    /// Display engine information
    Info,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EvaluateOutput {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MonteCarloOutput {
    Csv,
    Json,
}

#[derive(Debug, Serialize)]
struct ImpactRecord {
    x: f64,
    y: f64,
    speed: f64,
}

#[derive(Debug, Serialize)]
struct MonteCarloReport {
    n_samples: usize,
    random_seed: u64,
    fallback_count: usize,
    impacts: Vec<ImpactRecord>,
}

const DEFAULT_CHECK_SAMPLES: usize = 50;

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Evaluate {
            mission,
            doctrine,
            threshold,
            policy,
            analysis,
            previous_decision,
            output,
        } => {
            let mut config = load_config(&mission)?;
            if let Some(doctrine) = doctrine {
                config.decision.doctrine = doctrine.parse::<Doctrine>()?;
            }
            if let Some(pct) = threshold {
                config.decision.policy = ThresholdPolicy::Fraction(pct / 100.0);
            }
            if let Some(policy) = policy {
                config.decision.policy = ThresholdPolicy::Named(policy.parse::<PolicyMode>()?);
            }
            config.validate()?;

            let mode = analysis.map(|m| m.parse::<AnalysisMode>()).transpose()?;
            let previous = previous_decision.map(|d| d.parse::<Decision>()).transpose()?;

            let snapshot = on_pool(mission.threads, || {
                let snapshot = evaluate(&config, previous)?;
                match mode {
                    Some(mode) => Ok(run_risk_analyses(snapshot, &config, mode, None)?.0),
                    None => Ok(snapshot),
                }
            })?;

            match output {
                EvaluateOutput::Json => println!("{}", snapshot.to_json_pretty()?),
                EvaluateOutput::Table => display_snapshot(&snapshot),
            }
        }

        Commands::MonteCarlo { mission, output } => {
            let config = load_config(&mission)?;
            let params = MonteCarloParams::from_config(&config)?;
            let results = match mission.threads {
                Some(threads) => run_monte_carlo_with_threads(&params, threads)?,
                None => run_monte_carlo(&params)?,
            };

            match output {
                MonteCarloOutput::Csv => {
                    println!("x,y,speed");
                    for (p, speed) in results.impact_points.iter().zip(&results.impact_speeds) {
                        println!("{:.4},{:.4},{:.4}", p.x, p.y, speed);
                    }
                }
                MonteCarloOutput::Json => {
                    let report = MonteCarloReport {
                        n_samples: results.len(),
                        random_seed: config.simulation.random_seed,
                        fallback_count: results.fallback_count,
                        impacts: results
                            .impact_points
                            .iter()
                            .zip(&results.impact_speeds)
                            .map(|(p, speed)| ImpactRecord { x: p.x, y: p.y, speed: *speed })
                            .collect(),
                    };
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
            }
        }

        Commands::StabilityCheck { mission } => {
            let samples = mission.samples.unwrap_or(DEFAULT_CHECK_SAMPLES);
            let config = load_config(&mission)?;
            let check = on_pool(mission.threads, || quick_stability_check(&config, samples))?;

            println!("╔════════════════════════════════════════╗");
            println!("║      NUMERICAL STABILITY CHECK         ║");
            println!("╠════════════════════════════════════════╣");
            println!("║ Method:        {:>20}    ║", check.integration_method);
            println!("║ dt:                {:>8.4} s          ║", check.dt);
            println!("║ Samples:           {:>8}            ║", check.samples);
            println!("║ CEP50 @ dt:        {:>8.3} m          ║", check.cep50_dt);
            println!("║ CEP50 @ dt/2:      {:>8.3} m          ║", check.cep50_half_dt);
            println!("║ Relative error:    {:>8.3} %          ║", check.relative_error * 100.0);
            println!("║ Status:            {:>8}            ║", check.status.to_string());
            println!("╚════════════════════════════════════════╝");
        }

        Commands::Info => {
            println!("╔════════════════════════════════════════╗");
            println!("║      AIRDROP ENGINE v{:<8}          ║", env!("CARGO_PKG_VERSION"));
            println!("╠════════════════════════════════════════╣");
            println!("║ Monte Carlo payload drop evaluation    ║");
            println!("║ with a drop / no-drop decision layer.  ║");
            println!("╠════════════════════════════════════════╣");
            println!("║ Features:                              ║");
            println!("║ • Explicit Euler point-mass propagator ║");
            println!("║ • Seeded, reproducible wind sampling   ║");
            println!("║ • Wilson interval hit probability      ║");
            println!("║ • STRICT / BALANCED / AGGRESSIVE       ║");
            println!("║ • Hysteresis and robustness grading    ║");
            println!("║ • Sensitivity, corridor, topology      ║");
            println!("╚════════════════════════════════════════╝");
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &MissionArgs) -> Result<EvaluationConfig, Box<dyn Error>> {
    let mut config = match args.config.as_deref() {
        Some(path) => read_config(path)?,
        None => EvaluationConfig::default(),
    };
    if let Some(samples) = args.samples {
        config = config.with_sample_count(samples);
    }
    if let Some(seed) = args.seed {
        config.simulation.random_seed = seed;
    }
    config.validate()?;
    Ok(config)
}

/// Run `job` on a pool of `threads` workers, or on rayon's global pool
fn on_pool<T, F>(threads: Option<usize>, job: F) -> airdrop_engine::Result<T>
where
    T: Send,
    F: FnOnce() -> airdrop_engine::Result<T> + Send,
{
    match threads {
        Some(threads) => with_thread_pool(threads, job),
        None => job(),
    }
}

fn read_config(path: &Path) -> Result<EvaluationConfig, Box<dyn Error>> {
    EvaluationConfig::from_json_file(path).map_err(|e| format!("{}: {e}", path.display()).into())
}

fn display_snapshot(snapshot: &EvaluationSnapshot) {
    println!("╔════════════════════════════════════════╗");
    println!("║         DROP EVALUATION                ║");
    println!("╠════════════════════════════════════════╣");
    println!("║ Samples:           {:>8}            ║", snapshot.n_samples);
    println!("║ Hits:              {:>8}            ║", snapshot.hits);
    println!("║ P(hit):            {:>8.2} %          ║", snapshot.p_hit * 100.0);
    if let Some(ci) = snapshot.confidence {
        println!("║ 95% CI:      {:>6.2} % – {:>6.2} %        ║", ci.low * 100.0, ci.high * 100.0);
    }
    println!("║ CEP50:             {:>8.2} m          ║", snapshot.cep50);
    println!("║ Impact speed:      {:>8.2} m/s        ║", snapshot.impact_velocity.mean);
    println!("║ Impact speed p95:  {:>8.2} m/s        ║", snapshot.impact_velocity.p95);
    println!("╠════════════════════════════════════════╣");
    println!("║ Doctrine:          {:>10}          ║", snapshot.doctrine.to_string());
    println!("║ Threshold:         {:>8.1} %          ║", snapshot.threshold_pct);
    println!("║ Decision:          {:>10}          ║", snapshot.decision.to_string());
    println!("║ Robustness:        {:>15}     ║", snapshot.robustness.to_string());
    println!("║ Stability index:   {:>8.2}            ║", snapshot.stability_index);
    println!("║ Confidence index:  {:>8.2}            ║", snapshot.confidence_index);
    println!("╚════════════════════════════════════════╝");
    println!("Reason: {}", snapshot.decision_reason);
    if snapshot.hysteresis_applied {
        println!("Hysteresis held the previous decision ({} raw).", snapshot.raw_decision);
    }

    let analyses = &snapshot.analyses;
    if analyses.is_empty() {
        return;
    }
    println!("\nRisk analyses ({} re-runs):", analyses.probe_runs);
    if let Some(live) = &analyses.sensitivity_live {
        println!("  Wind sensitivity:   {:+.4} /(m/s) ({})", live.wind_gradient_smoothed, live.level);
    }
    if let Some(matrix) = &analyses.sensitivity_matrix {
        println!(
            "  Gradients:          wind {:+.4}, altitude {:+.4}, velocity {:+.4}",
            matrix.wind, matrix.altitude, matrix.velocity
        );
    }
    if let Some(dominant) = analyses.dominant_risk_factor {
        println!("  Dominant factor:    {dominant}");
    }
    if let Some(fragility) = &analyses.fragility {
        println!("  Fragility:          {} (margin {:+.2} pts)", fragility.zone, fragility.margin_pct);
    }
    if let Some(corridor) = &analyses.corridor_live {
        println!("  Release corridor:   {:.1} m", corridor.corridor_width_m);
    }
    if let Some(sweep) = &analyses.corridor_sweep {
        println!("  Release corridor:   {}", sweep.corridor_width);
    }
    if let Some(topology) = &analyses.topology_live {
        println!("  Drift axis:         {}", topology.drift_axis);
    }
    if let Some(topology) = &analyses.topology_matrix {
        println!(
            "  Dispersion shape:   {} (eccentricity {:.2})",
            topology.shape, topology.eccentricity_ratio
        );
    }
}
