//! Progress bars.
//!
//! A [`Bar`] is a cheap, cloneable handle. Progress updates lock the bar's own
//! state, so they may race freely with the render requests issued by the
//! `Progress` loop.
//!
//! Completion is two-phase: a bar that reaches its total is marked completed,
//! renders one last frame, and only after that frame is flushed releases its
//! slot in the container's completion tracker. Forced completion (removal,
//! cancellation) releases the slot immediately.

mod draw;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::task_tracker::TaskTrackerToken;

use crate::config::BarFormat;
use crate::decor::{Decorator, Statistics};
use crate::progress::width_sync::WidthSync;

/// Weight of the newest sample in the time-per-item average.
const TPI_SMOOTHING: f64 = 0.25;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Per-bar options; unset fields fall back to the container defaults.
#[derive(Default)]
pub struct BarOptions {
    width: Option<usize>,
    format: Option<BarFormat>,
    prepend: Vec<Box<dyn Decorator>>,
    append: Vec<Box<dyn Decorator>>,
}

impl BarOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Body width including both bounds.
    #[must_use]
    pub fn width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    /// Five character skin; malformed skins are ignored.
    #[must_use]
    pub fn format(mut self, skin: &str) -> Self {
        match BarFormat::parse(skin) {
            Ok(format) => self.format = Some(format),
            Err(err) => tracing::warn!("Ignoring bar format: {err}"),
        }
        self
    }

    /// Decorators drawn left of the body, in order.
    #[must_use]
    pub fn prepend(mut self, decorators: impl IntoIterator<Item = Box<dyn Decorator>>) -> Self {
        self.prepend.extend(decorators);
        self
    }

    /// Decorators drawn right of the body, in order.
    #[must_use]
    pub fn append(mut self, decorators: impl IntoIterator<Item = Box<dyn Decorator>>) -> Self {
        self.append.extend(decorators);
        self
    }
}

/// Handle to one progress bar.
///
/// Clones refer to the same bar; equality is identity.
#[derive(Clone)]
pub struct Bar {
    shared: Arc<Shared>,
}

struct Shared {
    id: u64,
    width: usize,
    format: BarFormat,
    prepend: Vec<Box<dyn Decorator>>,
    append: Vec<Box<dyn Decorator>>,
    state: Mutex<State>,
    /// Completion tracker slot, taken exactly once on release.
    slot: Mutex<Option<TaskTrackerToken>>,
    /// Fires once the slot has been released.
    finished: CancellationToken,
}

struct State {
    total: u64,
    current: u64,
    started: Instant,
    last_update: Instant,
    time_per_item: Duration,
    completed: bool,
    aborted: bool,
}

impl Bar {
    pub(crate) fn new(
        total: u64,
        cancel: Option<&CancellationToken>,
        options: BarOptions,
        defaults: (usize, BarFormat),
        slot: TaskTrackerToken,
    ) -> Self {
        let now = Instant::now();
        let bar = Self {
            shared: Arc::new(Shared {
                id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                width: options.width.unwrap_or(defaults.0),
                format: options.format.unwrap_or(defaults.1),
                prepend: options.prepend,
                append: options.append,
                state: Mutex::new(State {
                    total,
                    current: 0,
                    started: now,
                    last_update: now,
                    time_per_item: Duration::ZERO,
                    completed: false,
                    aborted: false,
                }),
                slot: Mutex::new(Some(slot)),
                finished: CancellationToken::new(),
            }),
        };

        if let Some(cancel) = cancel {
            let cancel = cancel.clone();
            let bar = bar.clone();
            tokio::spawn(async move {
                tokio::select! {
                    () = cancel.cancelled() => bar.abort(),
                    () = bar.shared.finished.cancelled() => {}
                }
            });
        }

        bar
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn total(&self) -> u64 {
        self.state().total
    }

    pub fn current(&self) -> u64 {
        self.state().current
    }

    pub fn is_completed(&self) -> bool {
        self.state().completed
    }

    pub fn is_aborted(&self) -> bool {
        self.state().aborted
    }

    /// True once the bar has released its completion slot.
    pub fn is_finished(&self) -> bool {
        self.shared.finished.is_cancelled()
    }

    /// Waits until the bar has released its completion slot.
    pub async fn finished(&self) {
        self.shared.finished.cancelled().await;
    }

    /// Advances the bar by `n`, clamping at the total.
    ///
    /// Reaching the total marks the bar completed; it is released after the
    /// next frame that shows it full has been flushed.
    pub fn incr(&self, n: u64) {
        if n == 0 {
            return;
        }
        let mut state = self.state();
        if state.completed {
            return;
        }

        let now = Instant::now();
        let sample = now.duration_since(state.last_update).as_secs_f64() / n as f64;
        let smoothed = if state.time_per_item.is_zero() {
            sample
        } else {
            state.time_per_item.as_secs_f64() * (1.0 - TPI_SMOOTHING) + sample * TPI_SMOOTHING
        };
        state.time_per_item = Duration::try_from_secs_f64(smoothed).unwrap_or(Duration::ZERO);
        state.last_update = now;

        state.current = state.current.saturating_add(n);
        if state.total > 0 && state.current >= state.total {
            state.current = state.total;
            state.completed = true;
        }
    }

    /// Sets the total, e.g. once it becomes known.
    ///
    /// Ignored after completion.
    pub fn set_total(&self, total: u64) {
        let mut state = self.state();
        if state.completed {
            return;
        }
        state.total = total;
        if total > 0 && state.current >= total {
            state.current = total;
            state.completed = true;
        }
    }

    /// Forces completion and releases the completion slot immediately.
    pub fn complete(&self) {
        self.state().completed = true;
        self.release();
    }

    /// Stops a bar whose total is unknown at its current position.
    ///
    /// The bar is released after its next flushed frame.
    pub(crate) fn complete_unbounded(&self) {
        let mut state = self.state();
        if state.total == 0 && !state.completed {
            state.total = state.current;
            state.completed = true;
        }
    }

    fn abort(&self) {
        {
            let mut state = self.state();
            state.aborted = true;
            state.completed = true;
        }
        tracing::debug!(bar = self.id(), "bar aborted by cancellation");
        self.release();
    }

    fn release(&self) {
        let slot = self
            .shared
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(token) = slot {
            drop(token);
            self.shared.finished.cancel();
            tracing::debug!(bar = self.id(), "bar released");
        }
    }

    pub fn statistics(&self) -> Statistics {
        let state = self.state();
        Statistics {
            id: self.shared.id,
            total: state.total,
            current: state.current,
            completed: state.completed,
            aborted: state.aborted,
            time_elapsed: state.started.elapsed(),
            time_per_item: state.time_per_item,
        }
    }

    /// Number of leading (prepended) decorator columns.
    pub fn num_prependers(&self) -> usize {
        self.shared.prepend.len()
    }

    /// Number of trailing (appended) decorator columns.
    pub fn num_appenders(&self) -> usize {
        self.shared.append.len()
    }

    /// Renders one line for the current tick.
    ///
    /// The returned receiver yields exactly one buffer (unless the render task
    /// panics). A completed bar releases its slot once `flushed` turns true,
    /// i.e. after its final frame is on screen.
    pub(crate) fn render(
        &self,
        term_width: usize,
        mut flushed: watch::Receiver<bool>,
        prepend: WidthSync,
        append: WidthSync,
    ) -> oneshot::Receiver<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        let bar = self.clone();

        tokio::spawn(async move {
            let stats = bar.statistics();
            let line = draw::line(&bar.shared, &stats, term_width, &prepend, &append).await;
            let _ = tx.send(line);

            // An error means the frame was abandoned; nothing left to wait for.
            let _ = flushed.wait_for(|done| *done).await;
            if stats.completed {
                bar.release();
            }
        });

        rx
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for Bar {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Bar {}

impl std::fmt::Debug for Bar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("Bar")
            .field("id", &self.shared.id)
            .field("total", &state.total)
            .field("current", &state.current)
            .field("completed", &state.completed)
            .finish_non_exhaustive()
    }
}
