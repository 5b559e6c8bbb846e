//! Ordered merge of per-bar render outputs.

use tokio::sync::{mpsc, oneshot};

/// Merges one buffer per source into a single stream in source order.
///
/// Source `i` is awaited to completion before source `i + 1` is touched, so
/// rows always come out in bar order no matter which bar finished rendering
/// first. The returned stream closes after the last source.
pub fn fan_in(sources: Vec<oneshot::Receiver<Vec<u8>>>) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel(1);

    tokio::spawn(async move {
        for (index, source) in sources.into_iter().enumerate() {
            match source.await {
                Ok(buf) => {
                    if tx.send(buf).await.is_err() {
                        return;
                    }
                }
                // Render task panicked or was dropped before producing a row.
                Err(_) => tracing::warn!(index, "bar render produced no output"),
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    async fn drain(mut rx: mpsc::Receiver<Vec<u8>>) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(buf) = rx.recv().await {
            out.push(buf);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_output_follows_source_order_not_latency() {
        let mut sources = Vec::new();
        for (i, delay_ms) in [30_u64, 20, 10, 0].into_iter().enumerate() {
            let (tx, rx) = oneshot::channel();
            sources.push(rx);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                let _ = tx.send(format!("row{i}\n").into_bytes());
            });
        }

        let merged = drain(fan_in(sources)).await.concat();
        assert_eq!(merged, b"row0\nrow1\nrow2\nrow3\n");
    }

    #[tokio::test]
    async fn test_stream_closes_after_last_source() {
        let (tx, rx) = oneshot::channel();
        tx.send(b"only".to_vec()).unwrap();

        let mut merged = fan_in(vec![rx]);
        assert_eq!(merged.recv().await, Some(b"only".to_vec()));
        assert_eq!(merged.recv().await, None);
    }

    #[tokio::test]
    async fn test_empty_input_closes_immediately() {
        assert!(drain(fan_in(Vec::new())).await.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_source_is_skipped() {
        let (tx0, rx0) = oneshot::channel();
        let (tx1, rx1) = oneshot::channel::<Vec<u8>>();
        let (tx2, rx2) = oneshot::channel();
        tx0.send(b"a".to_vec()).unwrap();
        drop(tx1);
        tx2.send(b"c".to_vec()).unwrap();

        let merged = drain(fan_in(vec![rx0, rx1, rx2])).await;
        assert_eq!(merged, vec![b"a".to_vec(), b"c".to_vec()]);
    }
}
