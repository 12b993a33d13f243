//! Runs CA memory experiments and prints JSON reports.
//!
//! Run from repo root:
//!   `cargo run -p mnemo-lab -- recall --rule B01/S3 --noise 0.05 --trials 100`
//!   `cargo run -p mnemo-lab -- scan --rule B01/S3 --runs 40 --noise 0.1`
//!   `cargo run -p mnemo-lab -- ensemble --trials 20 --train`
//!   `cargo run -p mnemo-lab -- evaluate --rule B01/S34 --runs 30`
//!   `cargo run -p mnemo-lab -- capacity --model Hopfield --size 16`
//!
//! Every command takes `--seed N` for a reproducible run. Reports go to
//! stdout, logs to stderr (`RUST_LOG=debug` shows every recall).

use std::env;
use std::fmt::Display;
use std::process;
use std::str::FromStr;

use mnemo_automata::{Rule, ScanConfig, add_noise_with_rng, presets, scan_attractors_with_rng};
use mnemo_memory::{
    BenchmarkConfig, CaEngineConfig, CaMemoryEngine, CapacityConfig, EngineId, EnsembleOptions,
    EvaluationConfig, MemoryAi, MemoryAiConfig, MemoryEngine, RecallClass, RecallOptions,
    SelectorBenchmark, benchmark_selector, builtin, capacity_with_rng, evaluate_rule_with_rng,
    grids,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: mnemo-lab <recall|scan|ensemble|evaluate|capacity> [--seed N] [options]

  recall    --rule B01/S3 --noise 0.05 --trials 100 --steps 80 --size 32
  scan      --rule B01/S3 --runs 40 --noise 0.1 --steps 80 --size 32
  ensemble  --trials 20 [--train]
  evaluate  --rule B01/S3 --steps 160 --runs 60
  capacity  --model B01/S3|Hopfield --size 32 --runs 40 --steps 80";

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

struct Args {
    command: String,
    flags: Vec<String>,
}

impl Args {
    fn from_env() -> Option<Self> {
        let mut args = env::args().skip(1);
        let command = args.next()?;
        Some(Self {
            command,
            flags: args.collect(),
        })
    }

    fn value(&self, name: &str) -> Option<&str> {
        let at = self.flags.iter().position(|a| a == name)?;
        self.flags.get(at + 1).map(String::as_str)
    }

    fn has(&self, name: &str) -> bool {
        self.flags.iter().any(|a| a == name)
    }

    fn get<T>(&self, name: &str, default: T) -> CliResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.value(name) {
            None => Ok(default),
            Some(raw) => raw
                .parse()
                .map_err(|e| format!("invalid {name} {raw:?}: {e}").into()),
        }
    }

    fn rule(&self) -> CliResult<Rule> {
        self.get("--rule", presets::B01_S3)
    }

    fn rng(&self) -> CliResult<StdRng> {
        Ok(match self.value("--seed") {
            Some(_) => StdRng::seed_from_u64(self.get("--seed", 0u64)?),
            None => StdRng::from_os_rng(),
        })
    }
}

/// Top-left corner of a centred 2x2 block.
fn centre(size: usize) -> usize {
    (size / 2).saturating_sub(1)
}

fn print_json<T: Serialize>(report: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

#[derive(Serialize)]
struct RecallReport {
    rule: Rule,
    size: usize,
    noise: f64,
    steps: usize,
    trials: usize,
    successes: usize,
    rate: f64,
    class: RecallClass,
    mean_distance: f64,
}

fn recall(args: &Args, rng: &mut StdRng) -> CliResult<()> {
    let size = args.get("--size", 32usize)?;
    let noise = args.get("--noise", 0.05f64)?;
    let trials = args.get("--trials", 100usize)?;
    let steps = args.get("--steps", 80usize)?;
    let rule = args.rule()?;

    let mut engine = CaMemoryEngine::create(CaEngineConfig {
        rule,
        width: size,
        height: size,
        steps,
    })?;
    let block = builtin::block(size, size, centre(size), centre(size))?;
    engine.store(std::slice::from_ref(&block))?;

    let mut successes = 0;
    let mut distance_sum = 0;
    for _ in 0..trials {
        let probe = add_noise_with_rng(&block, noise, rng);
        let recall = engine.recall_with_rng(&probe, &RecallOptions::default(), rng)?;
        successes += recall.success as usize;
        distance_sum += recall.distance.unwrap_or(block.len());
    }

    let rate = successes as f64 / trials.max(1) as f64;
    print_json(&RecallReport {
        rule,
        size,
        noise,
        steps,
        trials,
        successes,
        rate,
        class: RecallClass::from_rate(rate),
        mean_distance: distance_sum as f64 / trials.max(1) as f64,
    })
}

#[derive(Serialize)]
struct AttractorSummary {
    hash: String,
    count: usize,
    frequency: f64,
    population: usize,
}

#[derive(Serialize)]
struct ScanSummary {
    rule: Rule,
    runs: usize,
    steps: usize,
    noise: f64,
    total_attractors: usize,
    attractors: Vec<AttractorSummary>,
}

fn scan(args: &Args, rng: &mut StdRng) -> CliResult<()> {
    let size = args.get("--size", 32usize)?;
    let config = ScanConfig::default()
        .with_runs(args.get("--runs", 40)?)
        .with_noise(args.get("--noise", 0.1)?)
        .with_steps(args.get("--steps", 80)?);
    let rule = args.rule()?;
    let base = builtin::block(size, size, centre(size), centre(size))?;

    let report = scan_attractors_with_rng(&rule, &base, &config, rng);
    print_json(&ScanSummary {
        rule: report.rule,
        runs: report.runs,
        steps: report.steps,
        noise: report.noise,
        total_attractors: report.total_attractors,
        attractors: report
            .attractors
            .into_iter()
            .map(|a| AttractorSummary {
                population: a.sample.population(),
                hash: a.hash,
                count: a.count,
                frequency: a.frequency,
            })
            .collect(),
    })
}

#[derive(Serialize)]
struct EngineWins {
    engine: EngineId,
    wins: usize,
}

#[derive(Serialize)]
struct SelectorSummary {
    mapped_patterns: usize,
    best_global: Option<EngineId>,
    benchmark: SelectorBenchmark,
    speedup: f64,
}

#[derive(Serialize)]
struct EnsembleReport {
    trials: usize,
    success_rate: f64,
    wins: Vec<EngineWins>,
    selector: Option<SelectorSummary>,
}

fn ensemble(args: &Args, rng: &mut StdRng) -> CliResult<()> {
    let trials = args.get("--trials", 20usize)?;
    let mut ai = MemoryAi::new(MemoryAiConfig::default())?;
    let patterns = builtin::default_set()?;
    ai.store_with_rng(&grids(&patterns), rng)?;
    if args.has("--train") {
        ai.train_selector_with_rng(rng)?;
    }

    let mut wins: Vec<EngineWins> = ai
        .roster()
        .into_iter()
        .map(|engine| EngineWins { engine, wins: 0 })
        .collect();
    let mut successes = 0;
    for _ in 0..trials {
        let index = rng.random_range(0..patterns.len());
        let noise = rng.random_range(0.05..0.10);
        let probe = add_noise_with_rng(&patterns[index].grid, noise, rng);
        let result = ai.recall_with_rng(&probe, &EnsembleOptions::default(), rng)?;

        successes += result.best.recall.success as usize;
        if let Some(slot) = wins.iter_mut().find(|w| w.engine == result.best.engine) {
            slot.wins += 1;
        }
    }

    let selector = match ai.selector() {
        Some(selector) => {
            let config = BenchmarkConfig {
                samples: trials,
                ..BenchmarkConfig::default()
            };
            let benchmark = benchmark_selector(&ai, &config, rng)?;
            Some(SelectorSummary {
                mapped_patterns: selector.mapped_patterns(),
                best_global: selector.best_global(),
                speedup: benchmark.speedup(),
                benchmark,
            })
        }
        None => None,
    };

    print_json(&EnsembleReport {
        trials,
        success_rate: successes as f64 / trials.max(1) as f64,
        wins,
        selector,
    })
}

fn evaluate(args: &Args, rng: &mut StdRng) -> CliResult<()> {
    let config = EvaluationConfig {
        steps: args.get("--steps", 160)?,
        runs: args.get("--runs", 60)?,
        ..EvaluationConfig::default()
    };
    let rule = args.rule()?;
    let patterns = grids(&builtin::default_set()?);
    print_json(&evaluate_rule_with_rng(&rule, &patterns, &config, rng)?)
}

fn capacity(args: &Args, rng: &mut StdRng) -> CliResult<()> {
    let model = args.get("--model", EngineId::Ca(presets::B01_S3))?;
    let config = CapacityConfig {
        size: args.get("--size", 32)?,
        runs: args.get("--runs", 40)?,
        steps: args.get("--steps", 80)?,
        ..CapacityConfig::default()
    };
    print_json(&capacity_with_rng(model, &config, rng)?)
}

fn run(args: &Args) -> CliResult<()> {
    let mut rng = args.rng()?;
    tracing::info!(command = %args.command, "starting");
    match args.command.as_str() {
        "recall" => recall(args, &mut rng),
        "scan" => scan(args, &mut rng),
        "ensemble" => ensemble(args, &mut rng),
        "evaluate" => evaluate(args, &mut rng),
        "capacity" => capacity(args, &mut rng),
        other => Err(format!("unknown command {other:?}\n\n{USAGE}").into()),
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let Some(args) = Args::from_env() else {
        eprintln!("{USAGE}");
        process::exit(2);
    };

    if let Err(err) = run(&args) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}
