use std::sync::Arc;

use approx::assert_relative_eq;
use vpin_core::{Tick, VpinConfig, VpinResult};
use vpin_engine::{MemorySink, VpinEngine};
use vpin_ingestion::decode_tick;

/// Small deterministic generator so the tick streams are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

fn random_ticks(instrument: &str, seed: u64, count: usize) -> Vec<Tick> {
    let mut rng = Lcg(seed);
    (0..count)
        .map(|_| {
            let open = 100.0;
            let close = match (rng.next_f64() * 3.0) as u32 {
                0 => 99.5,
                1 => 100.0,
                _ => 100.5,
            };
            let volume = (rng.next_f64() * 400.0).floor();
            Tick::new(instrument, open, close, volume)
        })
        .collect()
}

fn run(ticks: &[Tick], config: &VpinConfig) -> Vec<VpinResult> {
    let sink = Arc::new(MemorySink::new());
    let engine = VpinEngine::with_sink(config.clone(), sink.clone()).unwrap();
    for tick in ticks {
        engine.process_tick(tick).unwrap();
    }
    sink.take()
}

#[test]
fn test_vpin_stays_in_unit_interval() {
    let config = VpinConfig::new(1_000.0, 20).unwrap();
    let results = run(&random_ticks("SPY", 7, 5_000), &config);

    assert!(!results.is_empty());
    for result in &results {
        assert!(result.vpin >= 0.0 && result.vpin <= 1.0, "vpin {}", result.vpin);
        assert!(result.bucket_count >= 1 && result.bucket_count <= 20);
    }
    assert_eq!(results.last().unwrap().bucket_count, 20);
}

#[test]
fn test_interleaving_matches_isolated_runs() {
    let config = VpinConfig::new(500.0, 10).unwrap();
    let a = random_ticks("A", 1, 800);
    let b = random_ticks("B", 2, 600);

    // Interleave with an irregular pattern driven by a third stream.
    let mut rng = Lcg(3);
    let (mut ia, mut ib) = (0, 0);
    let mut mixed = Vec::with_capacity(a.len() + b.len());
    while ia < a.len() || ib < b.len() {
        let take_a = ib == b.len() || (ia < a.len() && rng.next_f64() < 0.5);
        if take_a {
            mixed.push(a[ia].clone());
            ia += 1;
        } else {
            mixed.push(b[ib].clone());
            ib += 1;
        }
    }

    let sink = Arc::new(MemorySink::new());
    let engine = VpinEngine::with_sink(config.clone(), sink.clone()).unwrap();
    for tick in &mixed {
        engine.process_tick(tick).unwrap();
    }

    assert_eq!(sink.results_for("A"), run(&a, &config));
    assert_eq!(sink.results_for("B"), run(&b, &config));
}

#[test]
fn test_default_bucket_threshold() {
    let engine = VpinEngine::with_sink(VpinConfig::default(), Arc::new(MemorySink::new())).unwrap();

    assert!(engine.process_tick(&Tick::new("SPY", 1.0, 2.0, 60_000.0)).unwrap().is_none());
    let result = engine.process_tick(&Tick::new("SPY", 1.0, 2.0, 50_000.0)).unwrap().unwrap();

    let snapshot = engine.snapshot("SPY").unwrap();
    assert_eq!(snapshot.buckets.len(), 1);
    assert_eq!(snapshot.buckets[0].volume, 110_000.0);
    assert_relative_eq!(result.vpin, 1.0);
}

#[test]
fn test_decoded_messages_feed_engine() {
    let sink = Arc::new(MemorySink::new());
    let engine = VpinEngine::with_sink(VpinConfig::new(100.0, 2).unwrap(), sink.clone()).unwrap();

    let messages = [
        (10.0, 12.0, 60),
        (10.0, 12.0, 50),
        (10.0, 8.0, 100),
        (10.0, 10.0, 200),
    ];
    for (i, (open, close, volume)) in messages.iter().enumerate() {
        let raw = format!(
            r#"{{"event_type":"TICK","timestamp":"2024-01-02 14:3{i}:00+00:00","ticker":"X","open":{open},"high":12.0,"low":8.0,"close":{close},"volume":{volume}}}"#
        );
        engine.process_tick(&decode_tick(&raw).unwrap()).unwrap();
    }

    // The sell tick of exactly 100 leaves the second bucket open; the flat
    // tick closes it at 300.
    let vpins: Vec<f64> = sink.results().iter().map(|r| r.vpin).collect();
    assert_eq!(vpins.len(), 2);
    assert_relative_eq!(vpins[0], 1.0);
    assert_relative_eq!(vpins[1], 210.0 / 410.0);
    assert_eq!(sink.results()[1].ts_ms, Some(1704205980000));
}
