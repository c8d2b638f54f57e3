//! Sample emission from probe tasks into the pass sink.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::metric::{Descriptor, Sample};
use crate::probe::ProbeError;

/// Per-probe handle onto the pass's multi-producer sample channel.
///
/// Each probe task owns one clone of the sender; the pass sink closes once
/// the last emitter is dropped.
#[derive(Debug, Clone)]
pub struct Emitter {
    probe: Arc<str>,
    tx: mpsc::Sender<Sample>,
}

impl Emitter {
    pub fn new(probe: impl Into<Arc<str>>, tx: mpsc::Sender<Sample>) -> Self {
        Self {
            probe: probe.into(),
            tx,
        }
    }

    /// Create an emitter together with the receiving end of its channel.
    pub fn channel(probe: impl Into<Arc<str>>, capacity: usize) -> (Self, mpsc::Receiver<Sample>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(probe, tx), rx)
    }

    /// Name of the probe this emitter belongs to.
    pub fn probe(&self) -> &str {
        &self.probe
    }

    /// Build a sample for `desc` and send it.
    ///
    /// # Errors
    /// - `ProbeError::Emission` if the label values don't match the descriptor
    /// - `ProbeError::SinkClosed` if the pass stopped draining
    pub async fn emit(
        &self,
        desc: &Arc<Descriptor>,
        value: f64,
        label_values: Vec<String>,
    ) -> Result<(), ProbeError> {
        let sample = Sample::new(desc, value, label_values)?;
        self.send(sample).await
    }

    /// Send an already validated sample.
    pub async fn send(&self, sample: Sample) -> Result<(), ProbeError> {
        self.tx.send(sample).await.map_err(|_| {
            tracing::debug!(probe = %self.probe, "Sample sink closed");
            ProbeError::SinkClosed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::MetricKind;

    fn desc() -> Arc<Descriptor> {
        Arc::new(Descriptor::new("m_total", "help", &["schema"], MetricKind::Counter).unwrap())
    }

    #[tokio::test]
    async fn test_emit_preserves_order() {
        let (emitter, mut rx) = Emitter::channel("test", 8);
        let desc = desc();

        for (i, schema) in ["a", "b", "c"].iter().enumerate() {
            emitter.emit(&desc, i as f64, vec![schema.to_string()]).await.unwrap();
        }
        drop(emitter);

        let mut received = Vec::new();
        while let Some(sample) = rx.recv().await {
            received.push(sample.label_values()[0].clone());
        }
        assert_eq!(received, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_emit_rejects_malformed_sample() {
        let (emitter, mut rx) = Emitter::channel("test", 8);

        let result = emitter.emit(&desc(), 1.0, vec![]).await;
        assert!(matches!(result, Err(ProbeError::Emission(_))));

        drop(emitter);
        assert!(rx.recv().await.is_none(), "nothing was sent");
    }

    #[tokio::test]
    async fn test_emit_after_sink_closed() {
        let (emitter, rx) = Emitter::channel("test", 8);
        drop(rx);

        let result = emitter.emit(&desc(), 1.0, vec!["a".into()]).await;
        assert!(matches!(result, Err(ProbeError::SinkClosed)));
        assert_eq!(emitter.probe(), "test");
    }
}
