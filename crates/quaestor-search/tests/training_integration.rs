// End-to-end training runs over in-memory and SQLite history

use quaestor_core::config::Settings;
use quaestor_core::sink::MemorySink;
use quaestor_data::{HistoricalEntry, MemoryHistory, SqliteHistory};
use quaestor_search::Trainer;
use std::sync::Arc;

fn candles(n: i64) -> Vec<HistoricalEntry> {
    (0..n)
        .map(|i| {
            let price = 10_000.0 + 250.0 * ((i as f64) / 7.0).sin() + i as f64;
            HistoricalEntry {
                exchange: "coinbasepro".to_string(),
                market: "BTC-USD".to_string(),
                timestamp: 1_500_000_000 + i * 60,
                lowest_price: price - 5.0,
                highest_price: price + 5.0,
                first_trade_price: price - 1.0,
                last_trade_price: price + 1.0,
                volume: 3.0 + (i % 5) as f64,
            }
        })
        .collect()
}

fn settings(seed: u64) -> Settings {
    let mut settings = Settings::default();
    settings.training.population_size = 20;
    settings.training.window_seconds = 60 * 60;
    settings.training.seed = Some(seed);
    settings.network.hidden_layers = vec![6, 6];
    settings
}

fn trainer(seed: u64, sink: &MemorySink) -> Trainer {
    Trainer::new(
        &settings(seed),
        Arc::new(MemoryHistory::new(candles(90))),
        Arc::new(sink.clone()),
    )
    .unwrap()
}

#[test]
fn test_best_ever_never_decreases() {
    let sink = MemorySink::new();
    let mut trainer = trainer(1, &sink);
    let mut previous = f64::NEG_INFINITY;
    for _ in 0..8 {
        let outcome = trainer.run_generation();
        assert_eq!(outcome.summary.window_len, 60);
        assert!(outcome.summary.best_ever >= previous);
        assert!(outcome.summary.best_ever >= outcome.summary.best_of_generation);
        previous = outcome.summary.best_ever;
    }
    assert_eq!(trainer.state().best_ever_fitness, previous);
    assert_eq!(trainer.best_network().fitness(), Some(previous));
    println!("✓ Best ever after 8 generations: {:.6}", previous);
}

#[test]
fn test_elites_carry_forward_unchanged() {
    let sink = MemorySink::new();
    let mut trainer = trainer(2, &sink);
    for _ in 0..3 {
        let before = trainer.population().to_vec();
        let outcome = trainer.run_generation();

        assert_eq!(outcome.elites.len(), 2);
        let worst_elite = outcome
            .elites
            .iter()
            .map(|&i| outcome.scores[i])
            .fold(f64::INFINITY, f64::min);
        for (idx, score) in outcome.scores.iter().enumerate() {
            if !outcome.elites.contains(&idx) {
                assert!(worst_elite >= *score);
            }
        }

        let after = trainer.population();
        assert_eq!(after.len(), before.len());
        for (slot, &idx) in outcome.elites.iter().enumerate() {
            assert_eq!(after[slot], before[idx]);
        }
    }
}

#[test]
fn test_summaries_reach_subscribers_and_sink() {
    let sink = MemorySink::new();
    let mut trainer = trainer(3, &sink);
    let rx = trainer.subscribe();
    trainer.run(Some(5));

    let summaries: Vec<_> = rx.try_iter().collect();
    assert_eq!(summaries.len(), 5);
    let generations: Vec<u64> = summaries.iter().map(|s| s.generation).collect();
    assert_eq!(generations, vec![0, 1, 2, 3, 4]);
    assert!(summaries.iter().all(|s| s.population_size == 20));

    let messages = sink.messages();
    assert_eq!(messages.len(), 6);
    assert_eq!(messages[1], summaries[0].message());
}

#[test]
fn test_dropped_subscriber_does_not_stop_training() {
    let sink = MemorySink::new();
    let mut trainer = trainer(4, &sink);
    drop(trainer.subscribe());
    let state = trainer.run(Some(2));
    assert_eq!(state.generation, 2);
}

#[test]
fn test_same_seed_same_run() {
    let a: Vec<(f64, f64)> = {
        let sink = MemorySink::new();
        let mut t = trainer(5, &sink);
        (0..4)
            .map(|_| {
                let s = t.run_generation().summary;
                (s.best_of_generation, s.average)
            })
            .collect()
    };
    let b: Vec<(f64, f64)> = {
        let sink = MemorySink::new();
        let mut t = trainer(5, &sink);
        (0..4)
            .map(|_| {
                let s = t.run_generation().summary;
                (s.best_of_generation, s.average)
            })
            .collect()
    };
    assert_eq!(a, b);
}

#[test]
fn test_best_network_drives_decisions() {
    let sink = MemorySink::new();
    let mut trainer = trainer(6, &sink);
    let handle = trainer.best_network();
    let entry = candles(1).remove(0);
    assert!(handle.decide(&entry).is_none());
    trainer.run_generation();
    assert!(handle.decide(&entry).is_some());
}

#[test]
fn test_training_from_sqlite_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteHistory::open(dir.path().join("market.sqlite")).unwrap();
    store.insert_entries(&candles(90)).unwrap();

    let sink = MemorySink::new();
    let mut trainer = Trainer::new(&settings(7), Arc::new(store), Arc::new(sink.clone())).unwrap();
    let outcome = trainer.run_generation();
    assert_eq!(outcome.summary.window_len, 60);
    assert_eq!(outcome.scores.len(), 20);
}
