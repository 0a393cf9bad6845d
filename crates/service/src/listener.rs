//! Tick message listener.
//!
//! Reads newline-delimited JSON tick messages, decodes and validates them, and
//! hands them to a pool of worker tasks. Messages are routed by instrument so
//! a given instrument is always processed by the same worker, in arrival order,
//! while different instruments proceed in parallel.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use vpin_core::{Error, Result, ServiceConfig, Tick};
use vpin_engine::VpinEngine;
use vpin_ingestion::decode_tick;

/// Message counters shared between the reader and the workers.
#[derive(Debug, Default)]
pub struct ListenerStats {
    received: AtomicU64,
    malformed: AtomicU64,
    undecodable: AtomicU64,
    processed: AtomicU64,
    completions: AtomicU64,
}

/// Point-in-time copy of [`ListenerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStatsSnapshot {
    /// Non-empty lines read.
    pub received: u64,
    /// Messages dropped for failing validation or engine preconditions.
    pub malformed: u64,
    /// Messages that were not valid JSON of the expected shape.
    pub undecodable: u64,
    /// Ticks accepted by the engine.
    pub processed: u64,
    /// Ticks that completed a bucket and produced a VPIN value.
    pub completions: u64,
}

impl ListenerStats {
    /// Read all counters.
    pub fn snapshot(&self) -> ListenerStatsSnapshot {
        ListenerStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            undecodable: self.undecodable.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            completions: self.completions.load(Ordering::Relaxed),
        }
    }

    fn record_error(&self, err: &Error) {
        if err.is_malformed_input() {
            self.malformed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.undecodable.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Listener feeding decoded ticks to worker tasks.
pub struct TickListener {
    workers: Vec<mpsc::Sender<Tick>>,
    handles: Vec<JoinHandle<()>>,
    stats: Arc<ListenerStats>,
}

impl TickListener {
    /// Spawn `config.workers` worker tasks on the current runtime.
    pub fn spawn(engine: Arc<VpinEngine>, config: &ServiceConfig) -> Result<Self> {
        config.validate()?;

        let stats = Arc::new(ListenerStats::default());
        let mut workers = Vec::with_capacity(config.workers);
        let mut handles = Vec::with_capacity(config.workers);

        for id in 0..config.workers {
            let (tx, rx) = mpsc::channel(config.channel_capacity);
            workers.push(tx);
            handles.push(tokio::spawn(run_worker(
                id,
                rx,
                Arc::clone(&engine),
                Arc::clone(&stats),
            )));
        }

        info!(workers = config.workers, "tick listener started");
        Ok(Self {
            workers,
            handles,
            stats,
        })
    }

    /// Decode one message and dispatch it.
    ///
    /// Returns `false` when the message was dropped.
    pub async fn handle_message(&self, raw: &str) -> bool {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        let tick = match decode_tick(raw) {
            Ok(tick) => tick,
            Err(err) => {
                self.stats.record_error(&err);
                if err.is_malformed_input() {
                    warn!(error = %err, "skipping malformed tick message");
                } else {
                    error!(error = %err, "error decoding tick message");
                }
                return false;
            }
        };

        let worker = &self.workers[self.route(&tick.instrument)];
        if worker.send(tick).await.is_err() {
            error!("worker queue closed, dropping tick");
            return false;
        }
        true
    }

    /// Read messages until the reader is exhausted.
    ///
    /// Returns the number of messages dispatched.
    pub async fn run<R>(&self, reader: R) -> Result<u64>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut dispatched = 0;

        while let Some(line) = lines.next_line().await? {
            if self.handle_line(&line).await {
                dispatched += 1;
            }
        }

        debug!(dispatched, "input exhausted");
        Ok(dispatched)
    }

    /// Read messages from a line channel until every sender is dropped.
    ///
    /// Pairs with [`spawn_line_reader`] for sources whose reads block.
    pub async fn run_channel(&self, mut lines: mpsc::Receiver<std::io::Result<String>>) -> Result<u64> {
        let mut dispatched = 0;

        while let Some(line) = lines.recv().await {
            if self.handle_line(&line?).await {
                dispatched += 1;
            }
        }

        debug!(dispatched, "input exhausted");
        Ok(dispatched)
    }

    async fn handle_line(&self, line: &str) -> bool {
        let line = line.trim();
        !line.is_empty() && self.handle_message(line).await
    }

    /// Worker index for an instrument.
    fn route(&self, instrument: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        instrument.hash(&mut hasher);
        (hasher.finish() % self.workers.len() as u64) as usize
    }

    /// Shared message counters.
    pub fn stats(&self) -> Arc<ListenerStats> {
        Arc::clone(&self.stats)
    }

    /// Close the worker queues and wait for queued ticks to drain.
    pub async fn shutdown(self) -> ListenerStatsSnapshot {
        drop(self.workers);
        for handle in self.handles {
            if let Err(err) = handle.await {
                error!(error = %err, "worker task failed");
            }
        }

        let stats = self.stats.snapshot();
        info!(
            received = stats.received,
            processed = stats.processed,
            completions = stats.completions,
            malformed = stats.malformed,
            undecodable = stats.undecodable,
            "tick listener stopped"
        );
        stats
    }
}

/// Read lines from a blocking reader on a detached OS thread.
///
/// A read that never returns does not hold up runtime shutdown. The thread
/// stops at the first read error or once the receiver is dropped.
pub fn spawn_line_reader<R>(reader: R, capacity: usize) -> mpsc::Receiver<std::io::Result<String>>
where
    R: std::io::BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity);
    let spawned = std::thread::Builder::new()
        .name("line-reader".to_string())
        .spawn(move || {
            for line in reader.lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        });
    // On failure the sender is dropped with the closure and the channel reads as empty.
    if let Err(err) = spawned {
        error!(error = %err, "failed to spawn line reader");
    }
    rx
}

async fn run_worker(
    id: usize,
    mut rx: mpsc::Receiver<Tick>,
    engine: Arc<VpinEngine>,
    stats: Arc<ListenerStats>,
) {
    while let Some(tick) = rx.recv().await {
        match engine.process_tick(&tick) {
            Ok(result) => {
                stats.processed.fetch_add(1, Ordering::Relaxed);
                if result.is_some() {
                    stats.completions.fetch_add(1, Ordering::Relaxed);
                }
            }
            // Already logged by the engine; only this tick is lost.
            Err(err) => stats.record_error(&err),
        }
    }
    debug!(worker = id, "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use vpin_core::VpinConfig;
    use vpin_engine::MemorySink;

    fn message(ticker: &str, open: f64, close: f64, volume: i64) -> String {
        format!(
            r#"{{"event_type":"TICK","timestamp":"2024-01-02 14:30:00+00:00","ticker":"{ticker}","open":{open},"high":{open},"low":{close},"close":{close},"volume":{volume}}}"#
        )
    }

    fn service_config(workers: usize) -> ServiceConfig {
        ServiceConfig {
            workers,
            channel_capacity: 4,
            ..ServiceConfig::default()
        }
    }

    #[tokio::test]
    async fn test_run_processes_stream() {
        let sink = Arc::new(MemorySink::new());
        let engine = Arc::new(
            VpinEngine::with_sink(VpinConfig::new(100.0, 2).unwrap(), sink.clone()).unwrap(),
        );
        let listener = TickListener::spawn(engine.clone(), &service_config(3)).unwrap();

        let input = [
            message("X", 10.0, 12.0, 60),
            message("Y", 10.0, 9.0, 150),
            "{broken".to_string(),
            message("X", 10.0, 12.0, 50),
            String::new(),
            message("X", 10.0, 12.0, -3),
            message("X", 10.0, 8.0, 100),
            message("X", 10.0, 10.0, 200),
        ]
        .join("\n");

        let dispatched = listener.run(input.as_bytes()).await.unwrap();
        let stats = listener.shutdown().await;

        assert_eq!(dispatched, 5);
        assert_eq!(
            stats,
            ListenerStatsSnapshot {
                received: 7,
                malformed: 1,
                undecodable: 1,
                processed: 5,
                completions: 3,
            }
        );

        let x: Vec<f64> = sink.results_for("X").iter().map(|r| r.vpin).collect();
        assert_eq!(x.len(), 2);
        assert_relative_eq!(x[1], 210.0 / 410.0);
        assert_eq!(sink.results_for("Y").len(), 1);
        assert_eq!(engine.instrument_count(), 2);
    }

    #[tokio::test]
    async fn test_spawn_rejects_invalid_config() {
        let engine = Arc::new(VpinEngine::new(VpinConfig::default()).unwrap());

        let err = TickListener::spawn(engine.clone(), &service_config(0)).err().unwrap();
        assert!(matches!(err, Error::Config(_)));

        let config = ServiceConfig {
            channel_capacity: 0,
            ..service_config(2)
        };
        assert!(TickListener::spawn(engine, &config).is_err());
    }

    #[tokio::test]
    async fn test_run_channel_from_line_reader() {
        let sink = Arc::new(MemorySink::new());
        let engine = Arc::new(
            VpinEngine::with_sink(VpinConfig::new(100.0, 2).unwrap(), sink.clone()).unwrap(),
        );
        let listener = TickListener::spawn(engine, &service_config(2)).unwrap();

        let input = [
            message("X", 10.0, 12.0, 60),
            String::new(),
            message("X", 10.0, 12.0, 50),
            "{broken".to_string(),
        ]
        .join("\n");
        let lines = spawn_line_reader(std::io::Cursor::new(input.into_bytes()), 4);

        let dispatched = listener.run_channel(lines).await.unwrap();
        let stats = listener.shutdown().await;

        assert_eq!(dispatched, 2);
        assert_eq!(stats.received, 3);
        assert_eq!(stats.undecodable, 1);
        assert_eq!(stats.completions, 1);
        assert_eq!(sink.results_for("X").len(), 1);
    }

    #[tokio::test]
    async fn test_route_is_stable() {
        let engine = Arc::new(VpinEngine::new(VpinConfig::default()).unwrap());
        let listener = TickListener::spawn(engine, &service_config(4)).unwrap();

        let first = listener.route("NVDA");
        for _ in 0..10 {
            assert_eq!(listener.route("NVDA"), first);
        }
        assert!(first < 4);
        listener.shutdown().await;
    }

    #[tokio::test]
    async fn test_handle_message_rejects_validation_failure() {
        let engine = Arc::new(VpinEngine::new(VpinConfig::default()).unwrap());
        let listener = TickListener::spawn(engine, &service_config(1)).unwrap();

        let raw = message("", 1.0, 1.0, 1);
        assert!(!listener.handle_message(&raw).await);
        assert_eq!(listener.stats().snapshot().malformed, 1);
        listener.shutdown().await;
    }
}
