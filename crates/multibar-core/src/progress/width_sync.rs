//! Per-tick column width agreement.
//!
//! Each synced column gets its own [`Rendezvous`]: it collects one width per
//! bar until every expected bar has submitted or the deadline passes, then
//! sends the maximum back to every submitter. A slow bar can therefore hold
//! a frame back by at most one refresh period.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

struct Submission<T> {
    value: T,
    reply: oneshot::Sender<T>,
}

/// Collect-until-N-or-deadline, then reduce and broadcast.
///
/// The collector task owns the receiving side. Once it finishes (broadcast
/// sent, or deadline passed with nothing collected) later submissions resolve
/// to `None` instead of blocking.
pub struct Rendezvous<T> {
    tx: mpsc::Sender<Submission<T>>,
}

impl<T> Rendezvous<T>
where
    T: Clone + Send + 'static,
{
    /// Spawns the collector for `participants` submitters.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(participants: usize, deadline: Instant, reduce: F) -> Self
    where
        F: FnOnce(&[T]) -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(participants.max(1));
        tokio::spawn(collect(rx, participants, deadline, reduce));
        Self { tx }
    }

    /// Submits `value` and waits for the broadcast result.
    ///
    /// Returns `None` when this submission is not part of a broadcast.
    pub async fn submit(&self, value: T) -> Option<T> {
        let (reply, result) = oneshot::channel();
        self.tx.send(Submission { value, reply }).await.ok()?;
        result.await.ok()
    }
}

async fn collect<T, F>(
    mut rx: mpsc::Receiver<Submission<T>>,
    participants: usize,
    deadline: Instant,
    reduce: F,
) where
    T: Clone,
    F: FnOnce(&[T]) -> T,
{
    let mut values = Vec::with_capacity(participants);
    let mut replies = Vec::with_capacity(participants);

    let timeout = tokio::time::sleep_until(deadline);
    tokio::pin!(timeout);

    while values.len() < participants {
        tokio::select! {
            biased;
            submission = rx.recv() => match submission {
                Some(Submission { value, reply }) => {
                    values.push(value);
                    replies.push(reply);
                }
                None => break,
            },
            () = &mut timeout => break,
        }
    }

    if values.is_empty() {
        tracing::trace!("rendezvous closed without submissions");
        return;
    }
    if values.len() < participants {
        tracing::trace!(
            collected = values.len(),
            expected = participants,
            "rendezvous resolved at deadline"
        );
    }

    let result = reduce(&values);
    for reply in replies {
        // Submitter may have given up; nothing to do.
        let _ = reply.send(result.clone());
    }
}

/// Width barrier for one column category (leading or trailing) of one tick.
///
/// Cheap to clone; every bar of the tick gets a handle to the same group.
#[derive(Clone)]
pub struct WidthSync {
    columns: Arc<[Rendezvous<usize>]>,
}

impl WidthSync {
    /// Creates one rendezvous per column, each expecting `participants` bars.
    pub fn new(deadline: Instant, participants: usize, columns: usize) -> Self {
        let columns = (0..columns)
            .map(|_| Rendezvous::spawn(participants, deadline, max_width))
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> usize {
        self.columns.len()
    }

    /// Submits this bar's width for `column` and returns the agreed width.
    ///
    /// `None` when the column is outside the group or the broadcast was missed.
    pub async fn submit(&self, column: usize, width: usize) -> Option<usize> {
        self.columns.get(column)?.submit(width).await
    }
}

fn max_width(widths: &[usize]) -> usize {
    widths.iter().copied().max().unwrap_or_default()
}
