//! EcoQuest Headless Progression Harness
//!
//! Validates progression rules, scoring and persistence without a frontend.
//! Runs entirely in-process: simulated players play through the mission
//! graph against in-memory storage.
//!
//! Usage:
//!   cargo run -p ecoquest-simtest
//!   cargo run -p ecoquest-simtest -- --verbose
//!   cargo run -p ecoquest-simtest -- --config game.json --players 50 --seed 7

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::Parser;

use ecoquest_core::config::GameConfig;
use ecoquest_core::events::ProgressEvent;
use ecoquest_core::persistence::{self, encode_save, load_and_validate};
use ecoquest_core::ranking::{submit_if_higher, InMemoryRanking};
use ecoquest_core::storage::{ManualClock, MemoryStorage, Storage};
use ecoquest_core::store::ProgressStore;
use ecoquest_logic::catalog::{self, MissionId, MISSIONS};
use ecoquest_logic::integrity::validate_structure;
use ecoquest_logic::progress::PlayerProgress;
use ecoquest_logic::resolver::{self, MissionState};
use ecoquest_logic::scoring::{self, NextStep, Question, QuizConfig, QuizSession, SpeedTier};
use ecoquest_logic::transactions;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

/// Headless progression harness.
#[derive(Debug, Parser)]
#[command(name = "ecoquest-simtest", version, about)]
struct Args {
    /// Print every check, not only failures.
    #[arg(long)]
    verbose: bool,
    /// JSON game configuration to run with.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Number of simulated players.
    #[arg(long, default_value_t = 20)]
    players: usize,
    /// Seed for the simulated players.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

struct Options {
    verbose: bool,
    config: GameConfig,
    players: usize,
    seed: u64,
}

impl Args {
    fn into_options(self) -> Result<Options, String> {
        let config = match &self.config {
            Some(path) => {
                GameConfig::load(path).map_err(|e| format!("{}: {}", path.display(), e))?
            }
            None => GameConfig::default(),
        };
        Ok(Options {
            verbose: self.verbose,
            config,
            players: self.players,
            seed: self.seed,
        })
    }
}

fn main() {
    let opts = match Args::parse().into_options() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };
    let verbose = opts.verbose;
    println!("=== EcoQuest Progression Harness ===\n");

    let mut results = Vec::new();

    // 1. Mission catalog & dependency graph
    results.extend(validate_catalog(verbose));

    // 2. Quiz scoring
    results.extend(validate_scoring(&opts.config.quiz, verbose));

    // 3. Transactions
    results.extend(validate_transactions(verbose));

    // 4. Integrity layer
    results.extend(validate_integrity(verbose));

    // 5. Simulated players through the store
    results.extend(simulate_players(&opts, verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn check(name: &str, passed: bool, detail: impl Into<String>) -> TestResult {
    TestResult {
        name: name.into(),
        passed,
        detail: detail.into(),
    }
}

fn questions_for(mission: MissionId) -> Vec<Question> {
    (0..scoring::question_count(mission))
        .map(|i| Question::new(&format!("M{} Q{}", mission, i + 1), &["a", "b", "c", "d"], i % 4))
        .collect()
}

// ── 1. Catalog ──────────────────────────────────────────────────────────

fn validate_catalog(verbose: bool) -> Vec<TestResult> {
    println!("--- Mission Catalog ---");
    let mut results = Vec::new();

    let ids: Vec<MissionId> = catalog::mission_ids().collect();
    let unique: BTreeSet<_> = ids.iter().copied().collect();
    results.push(check(
        "catalog_unique_ids",
        unique.len() == ids.len() && ids.len() == MISSIONS.len(),
        format!("{} missions", ids.len()),
    ));

    let dangling: Vec<_> = MISSIONS
        .iter()
        .flat_map(|m| m.prerequisites.iter().map(move |p| (m.id, *p)))
        .filter(|(_, p)| catalog::mission(*p).is_none())
        .collect();
    results.push(check(
        "catalog_prerequisites_exist",
        dangling.is_empty(),
        format!("{} dangling prerequisites", dangling.len()),
    ));

    let roots = resolver::list_available(&BTreeSet::new());
    results.push(check(
        "catalog_single_root",
        roots.iter().copied().collect::<Vec<_>>() == vec![1],
        format!("roots: {:?}", roots),
    ));

    // Walk the graph greedily: everything must become reachable.
    let mut completed = BTreeSet::new();
    loop {
        let next = resolver::list_available(&completed)
            .into_iter()
            .find(|id| !completed.contains(id));
        match next {
            Some(id) => {
                completed.insert(id);
            }
            None => break,
        }
    }
    results.push(check(
        "catalog_all_reachable",
        completed.len() == MISSIONS.len(),
        format!("{} of {} reachable", completed.len(), MISSIONS.len()),
    ));

    if verbose {
        for m in MISSIONS.iter() {
            println!(
                "    #{:>2} L{} {:<28} {:>3} coins {:>3} pts  needs {:?}",
                m.id, m.level, m.badge_name, m.coin_reward, m.point_reward, m.prerequisites
            );
        }
    }
    results
}

// ── 2. Scoring ──────────────────────────────────────────────────────────

fn validate_scoring(config: &QuizConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Quiz Scoring ---");
    let mut results = Vec::new();

    let buckets = [
        (4.0, Some(SpeedTier::Excellent)),
        (10.0, Some(SpeedTier::Excellent)),
        (15.0, Some(SpeedTier::Great)),
        (20.0, Some(SpeedTier::Great)),
        (30.0, Some(SpeedTier::Good)),
        (30.5, None),
        (f64::NAN, None),
    ];
    let bad: Vec<_> = buckets
        .iter()
        .filter(|(secs, expected)| SpeedTier::classify(*secs) != *expected)
        .collect();
    results.push(check(
        "scoring_speed_tiers",
        bad.is_empty(),
        format!("{} misclassified samples", bad.len()),
    ));

    // Preview points never exceed base + top bonus, and decay with retries.
    let mut monotone = true;
    let mut t = config.time_limit_secs;
    while t >= 0.0 {
        let first = scoring::preview_points(t, 0, config);
        let second = scoring::preview_points(t, 1, config);
        let third = scoring::preview_points(t, 2, config);
        monotone &= first >= second && second >= third;
        t -= 0.5;
    }
    results.push(check(
        "scoring_retry_discount",
        monotone,
        "preview points non-increasing with retries",
    ));

    // Three misses fail the session.
    let mut session = match QuizSession::start(1, questions_for(1), config.clone()) {
        Ok(s) => s,
        Err(e) => {
            results.push(check("scoring_session_start", false, e.to_string()));
            return results;
        }
    };
    let mut steps = Vec::new();
    for _ in 0..3 {
        if let Ok(o) = session.submit(1) {
            steps.push(o.next);
            let _ = session.advance();
        }
    }
    results.push(check(
        "scoring_retry_cap",
        steps == vec![NextStep::Retry, NextStep::Retry, NextStep::MissionFailed]
            && session.result().map(|r| !r.is_correct).unwrap_or(false),
        format!("steps {:?}", steps),
    ));

    // A timeout is a miss.
    let mut session = match QuizSession::start(1, questions_for(1), config.clone()) {
        Ok(s) => s,
        Err(e) => {
            results.push(check("scoring_session_start", false, e.to_string()));
            return results;
        }
    };
    let timeout = session.tick(config.time_limit_secs + 1.0);
    results.push(check(
        "scoring_timeout_is_miss",
        timeout
            .as_ref()
            .map(|o| o.timed_out && !o.is_correct && o.next == NextStep::Retry)
            .unwrap_or(false),
        format!("{:?}", timeout.map(|o| o.next)),
    ));

    if verbose {
        for secs in [5.0, 15.0, 25.0, 45.0] {
            println!(
                "    {:>4.0}s per question -> {} mission points",
                secs,
                scoring::mission_points(secs, 1, config)
            );
        }
    }
    results
}

// ── 3. Transactions ─────────────────────────────────────────────────────

fn validate_transactions(_verbose: bool) -> Vec<TestResult> {
    println!("--- Transactions ---");
    let mut results = Vec::new();
    let fresh = PlayerProgress::new("Harness");

    let locked = transactions::complete_mission(
        &fresh,
        2,
        &scoring::QuizResult::passed(2, 10.0, 40),
        0,
    );
    results.push(check(
        "tx_locked_mission_rejected",
        matches!(locked, Err(transactions::TransactionError::MissionLocked(2))),
        format!("{:?}", locked.map(|(_, o)| o)),
    ));

    let overdraft = transactions::spend_coins(&fresh, 1, 0);
    results.push(check(
        "tx_overdraft_rejected",
        overdraft.is_err(),
        "spending from an empty purse",
    ));

    let pickups = transactions::collect_item(&fresh, "coin_plaza", 5, 0, 0).and_then(
        |(once, first)| {
            transactions::collect_item(&once, "coin_plaza", 5, 0, 0)
                .map(|(twice, second)| (twice.coins, first, second))
        },
    );
    results.push(check(
        "tx_pickup_once",
        matches!(pickups, Ok((5, true, false))),
        format!("coins and grants after two pickups: {:?}", pickups),
    ));

    let full = transactions::grant_coins(&fresh, u64::MAX, 0)
        .and_then(|p| transactions::grant_coins(&p, 1, 0));
    results.push(check(
        "tx_coin_overflow_rejected",
        matches!(full, Err(transactions::TransactionError::Overflow("coins"))),
        format!("{:?}", full.map(|p| p.coins)),
    ));

    let result = scoring::QuizResult::passed(1, 5.0, 50);
    let first = transactions::complete_mission(&fresh, 1, &result, 0);
    let repeat = first
        .as_ref()
        .ok()
        .map(|(p, _)| transactions::complete_mission(p, 1, &result, 0));
    let idempotent = match (&first, &repeat) {
        (Ok((a, _)), Some(Ok((b, transactions::CompletionOutcome::AlreadyCompleted)))) => a == b,
        _ => false,
    };
    results.push(check(
        "tx_completion_idempotent",
        idempotent,
        "second completion is a no-op",
    ));
    results
}

// ── 4. Integrity ────────────────────────────────────────────────────────

fn validate_integrity(_verbose: bool) -> Vec<TestResult> {
    println!("--- Integrity ---");
    let mut results = Vec::new();

    let mut p = PlayerProgress::new("Harness");
    if let Ok((next, _)) =
        transactions::complete_mission(&p, 1, &scoring::QuizResult::passed(1, 5.0, 50), 0)
    {
        p = next;
    }

    let bytes = match encode_save(&p) {
        Ok(b) => b,
        Err(e) => {
            results.push(check("integrity_encode", false, e.to_string()));
            return results;
        }
    };
    results.push(check(
        "integrity_roundtrip",
        load_and_validate(&bytes).as_ref() == Some(&p),
        format!("{} bytes", bytes.len()),
    ));

    let mut flipped = 0;
    for i in 0..bytes.len() {
        let mut tampered = bytes.clone();
        tampered[i] ^= 0x01;
        if let Some(loaded) = load_and_validate(&tampered) {
            // Bytes outside the checksummed fields may still decode.
            if loaded.coins != p.coins || loaded.total_score != p.total_score {
                flipped += 1;
            }
        }
    }
    results.push(check(
        "integrity_tamper_detected",
        flipped == 0,
        format!("{} single-bit flips changed rewards undetected", flipped),
    ));

    let mut forged = p.clone();
    forged.completed_missions.push(20);
    results.push(check(
        "integrity_structure_check",
        !validate_structure(&forged).is_empty(),
        "completion without prerequisites is flagged",
    ));

    let json = persistence::export_json(&p);
    let restored = json.as_ref().ok().and_then(|j| persistence::import_json(j).ok());
    results.push(check(
        "integrity_export_import",
        restored.as_ref() == Some(&p),
        "backup restores the same snapshot",
    ));
    results
}

// ── 5. Simulated players ────────────────────────────────────────────────

fn simulate_players(opts: &Options, verbose: bool) -> Vec<TestResult> {
    println!("--- Simulated Players ({}) ---", opts.players);
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut storage = MemoryStorage::new();
    let mut ranking = InMemoryRanking::new();

    let mut errors = Vec::new();
    let mut gate_violations = 0;
    let mut reload_mismatches = 0;
    let mut integrity_warnings = 0;

    for n in 0..opts.players {
        let name = format!("Player{:03}", n);
        let skill: f64 = rng.gen_range(0.5..1.0);
        let mut store = ProgressStore::open(
            storage.clone(),
            ManualClock::new(1_700_000_000_000),
            &name,
            opts.config.clone(),
        );
        let events = store.subscribe();

        for _ in 0..200 {
            let available: Vec<_> = store
                .mission_states()
                .into_iter()
                .filter(|s| s.state == MissionState::Accessible)
                .map(|s| s.mission_id)
                .collect();
            let Some(&mission) = available.first() else {
                break;
            };
            if !resolver::is_accessible(mission, &store.progress().completed_set()) {
                gate_violations += 1;
            }

            let qs = questions_for(mission);
            let answers: Vec<usize> = qs.iter().map(|q| q.correct_index).collect();
            if let Err(e) = store.start_quiz(mission, qs) {
                errors.push(format!("{}: start {}: {}", name, mission, e));
                break;
            }
            let mut idx = 0;
            while store.active_quiz().is_some() {
                let _ = store.tick(rng.gen_range(2.0..25.0));
                if store.active_quiz().map(|q| q.is_awaiting_answer()) != Some(true) {
                    if store.active_quiz().is_some() {
                        let _ = store.advance_quiz();
                        idx = store.active_quiz().map(|q| q.question_index()).unwrap_or(idx);
                    }
                    continue;
                }
                let choice = if rng.gen_bool(skill) {
                    answers[idx]
                } else {
                    (answers[idx] + 1) % 4
                };
                match store.submit_answer(choice) {
                    Ok(o) if !o.next.is_terminal() => {
                        let _ = store.advance_quiz();
                        idx = store.active_quiz().map(|q| q.question_index()).unwrap_or(idx);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        errors.push(format!("{}: submit: {}", name, e));
                        store.abandon_quiz();
                    }
                }
            }

            if rng.gen_bool(0.3) {
                let item = &ecoquest_logic::collectibles::COLLECTIBLES
                    [rng.gen_range(0..ecoquest_logic::collectibles::COLLECTIBLES.len())];
                let _ = store.pickup(item.id);
            }
        }

        integrity_warnings += events
            .drain()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::IntegrityWarning(_)))
            .count();
        store.flush_playtime();
        let _ = submit_if_higher(&mut ranking, store.progress());

        let reopened = ProgressStore::open(
            store.storage().clone(),
            ManualClock::new(0),
            &name,
            opts.config.clone(),
        );
        if reopened.progress() != store.progress() {
            reload_mismatches += 1;
        }
        if verbose {
            let p = store.progress();
            println!(
                "    {} L{} {:>2} badges {:>4} coins {:>5} pts {:>5.1}% acc",
                p.player_name,
                p.level,
                p.badge_count(),
                p.coins,
                p.total_score,
                p.accuracy_percent()
            );
        }
        storage = store.storage().clone();
    }

    results.push(check(
        "players_no_errors",
        errors.is_empty(),
        errors.first().cloned().unwrap_or_else(|| "no store errors".into()),
    ));
    results.push(check(
        "players_gates_respected",
        gate_violations == 0,
        format!("{} gate violations", gate_violations),
    ));
    results.push(check(
        "players_reload_identical",
        reload_mismatches == 0,
        format!("{} mismatches after reload", reload_mismatches),
    ));
    results.push(check(
        "players_no_integrity_warnings",
        integrity_warnings == 0,
        format!("{} live integrity warnings", integrity_warnings),
    ));
    let stored = (0..opts.players)
        .filter(|n| {
            storage
                .get(&format!("{}Player{:03}", opts.config.store.storage_key_prefix, n))
                .ok()
                .flatten()
                .is_some()
        })
        .count();
    results.push(check(
        "players_all_saved",
        stored == opts.players,
        format!("{} of {} records in storage", stored, opts.players),
    ));
    if let Some(top) = ranking.leaderboard().first() {
        results.push(check(
            "players_leaderboard",
            top.total_score > 0,
            format!("top: {} with {}", top.player_name, top.total_score),
        ));
    }
    results
}
