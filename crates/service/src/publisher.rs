//! VPIN result publication.
//!
//! The engine's sink runs on worker threads, so it only logs and enqueues.
//! A dedicated task drains the queue and writes one JSON object per line.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;
use vpin_core::{Result, VpinResult};
use vpin_engine::{LogSink, VpinSink};

/// Sink that logs each result and forwards it to the publisher task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<VpinResult>,
}

impl ChannelSink {
    /// Create a sink and the receiving end for [`run_publisher`].
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<VpinResult>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl VpinSink for ChannelSink {
    fn publish(&self, result: &VpinResult) {
        LogSink.publish(result);
        if self.tx.send(result.clone()).is_err() {
            debug!(instrument = %result.instrument, "publisher closed, result not forwarded");
        }
    }
}

/// Write results as JSON lines until every sender is dropped.
///
/// Returns the number of results written.
pub async fn run_publisher<W>(mut rx: mpsc::UnboundedReceiver<VpinResult>, mut writer: W) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while let Some(result) = rx.recv().await {
        let mut line = serde_json::to_vec(&result)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
        written += 1;
    }
    debug!(written, "publisher stopped");
    Ok(written)
}
