//! Subcommand implementations.

use std::path::Path;

use anyhow::Context as _;
use sortwater_core::IngestEvent;
use sortwater_proposer::{CandidateFileProposer, ModelSpec, SimulatedProposer};
use sortwater_store::SqliteLevelStore;
use sortwater_system_balancer::l1_distance;
use sortwater_system_ingestion::{IngestConfig, IngestReport, Ingestion, LevelStore, Proposer};
use sortwater_world::verify_solution;
use tracing::warn;

use crate::settings::Settings;

/// Exit code reported when at least one stored solution fails to replay.
const EXIT_VERIFY_FAILED: u8 = 2;

fn open_store(settings: &Settings) -> anyhow::Result<SqliteLevelStore> {
    SqliteLevelStore::open(&settings.database).with_context(|| {
        format!(
            "failed to open level database {}",
            settings.database.display()
        )
    })
}

/// Runs one ingestion and maps its outcome to an exit code.
pub(crate) fn ingest(
    settings: &Settings,
    model: &str,
    count: usize,
    candidates: Option<&Path>,
    seed: Option<u64>,
) -> anyhow::Result<u8> {
    let config = settings.ingest_config(seed);

    let report = match candidates {
        Some(path) => {
            let proposer = CandidateFileProposer::open(path)?;
            let store = open_store(settings)?;
            run_ingestion(config, proposer, store, model, count)?
        }
        None => {
            let _ = model
                .parse::<ModelSpec>()
                .and_then(|spec| spec.shape())
                .with_context(|| format!("model `{model}` cannot be simulated"))?;
            let proposer = match seed {
                Some(seed) => SimulatedProposer::new(settings.walk_config(), seed),
                None => SimulatedProposer::from_entropy(settings.walk_config()),
            };
            let store = open_store(settings)?;
            run_ingestion(config, proposer, store, model, count)?
        }
    };

    print_summary(&report, model);
    Ok(report.status().exit_code())
}

fn run_ingestion<P: Proposer>(
    config: IngestConfig,
    proposer: P,
    store: SqliteLevelStore,
    model: &str,
    count: usize,
) -> anyhow::Result<IngestReport> {
    let mut ingestion = Ingestion::new(config, proposer, store);
    let mut events = Vec::new();
    let result = ingestion.run(model, count, &mut events);
    print_insertions(&events);
    Ok(result?)
}

fn print_insertions(events: &[IngestEvent]) {
    let inserted = events.iter().filter_map(|event| match event {
        IngestEvent::LevelInserted {
            id,
            difficulty,
            steps_to_solve,
            delta,
            ..
        } => Some((id, difficulty, steps_to_solve, delta)),
        _ => None,
    });

    for (position, (id, difficulty, steps, delta)) in inserted.enumerate() {
        let number = position + 1;
        match delta {
            Some(delta) => println!(
                "#{number:>3}: level {id} difficulty={difficulty:<8} steps={steps:>3} \
                 delta={delta:+.4}"
            ),
            None => println!(
                "#{number:>3}: level {id} [bootstrap] difficulty={difficulty:<8} steps={steps:>3}"
            ),
        }
    }
}

fn print_summary(report: &IngestReport, model: &str) {
    println!(
        "Added {}/{} level(s) from model {model} after {} attempt(s); {} duplicate(s), {} invalid.",
        report.inserted, report.requested, report.attempts, report.duplicates, report.invalid
    );
    for (bucket, count) in report.by_bucket.iter() {
        println!("  {bucket:<10} {count:>4}");
    }
    if report.proposer_exhausted {
        println!("The proposer ran out of candidates.");
    }
}

/// Prints the windowed distribution and its distance to the target.
pub(crate) fn stats(settings: &Settings) -> anyhow::Result<u8> {
    let store = open_store(settings)?;
    let total = store.total_count()?;
    let window = store.window_stats(settings.window_levels)?;
    let target = &settings.target_distrib;
    let observed_total = window.total();

    let mode = if total < settings.window_levels {
        "bootstrap"
    } else {
        "balanced"
    };
    println!("{total} level(s) stored, next ingestion runs in {mode} mode");
    println!("Last {observed_total} level(s) against the target distribution:");

    let share = |count: u64| {
        if observed_total == 0 {
            0.0
        } else {
            count as f64 * 100.0 / observed_total as f64
        }
    };

    for (bucket, fraction) in target.iter() {
        let count = window.count(bucket);
        println!(
            "  {bucket:<10} {count:>4} {:>6.1}%  target {:>6.1}%",
            share(count),
            fraction * 100.0
        );
    }
    for (bucket, count) in window.iter() {
        if target.iter().all(|(named, _)| named != bucket) {
            println!("  {bucket:<10} {count:>4} {:>6.1}%  (not targeted)", share(count));
        }
    }

    println!("L1 distance to target: {:.4}", l1_distance(&window, target));
    Ok(0)
}

/// Replays every stored solution.
pub(crate) fn verify(settings: &Settings) -> anyhow::Result<u8> {
    let store = open_store(settings)?;
    let levels = store.levels()?;

    let mut verified = 0usize;
    let mut failed = 0usize;
    let mut missing = 0usize;

    for level in &levels {
        let Some(solution) = &level.solution else {
            missing += 1;
            continue;
        };
        match verify_solution(&level.state, solution) {
            Ok(()) => verified += 1,
            Err(error) => {
                failed += 1;
                warn!(id = %level.id, %error, "stored solution does not solve its level");
                println!("level {}: {error}", level.id);
            }
        }
    }

    println!("{verified} verified, {failed} failed, {missing} without a solution");
    Ok(if failed > 0 { EXIT_VERIFY_FAILED } else { 0 })
}
