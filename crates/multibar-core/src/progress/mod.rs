//! The `Progress` container: one control task that owns every bar.
//!
//! ## Actor loop
//!
//! All state lives in [`Server`], driven by a single tokio task. Callers talk
//! to it through a command channel with oneshot replies, so lifecycle
//! operations and render ticks are processed in one total order without
//! locks:
//! - `Command`s: add, remove, count, complete-unbounded
//! - refresh ticks (stopped for good once the cancellation token fires)
//! - the quit signal raised by [`Progress::stop`]
//!
//! ## Frames
//!
//! Each tick creates two [`WidthSync`] groups (leading and trailing columns),
//! asks every bar to render concurrently, merges the rows in bar order via
//! [`fan_in`], writes and flushes them, then tells the bars the frame is on
//! screen. The next tick cannot start before the current frame is flushed.

pub mod fan_in;
pub mod width_sync;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::bar::{Bar, BarOptions};
use crate::config::{BarFormat, ProgressConfig};
use crate::terminal::{CursorWriter, FrameWriter};
use fan_in::fan_in;
use width_sync::WidthSync;

/// Hook invoked with the current bars right before each frame is rendered.
pub type BeforeRender = Arc<dyn Fn(&[Bar]) + Send + Sync>;

enum Command {
    Add {
        total: u64,
        options: BarOptions,
        reply: oneshot::Sender<Bar>,
    },
    Remove {
        bar: Bar,
        reply: oneshot::Sender<bool>,
    },
    Count {
        reply: oneshot::Sender<usize>,
    },
    CompleteUnbounded {
        reply: oneshot::Sender<()>,
    },
}

/// Configures and starts a [`Progress`] container.
pub struct ProgressBuilder {
    width: usize,
    format: BarFormat,
    refresh_rate: Duration,
    before_render: Option<BeforeRender>,
    cancel: Option<CancellationToken>,
    shutdown_notifier: Option<oneshot::Sender<()>>,
    writer: Option<Box<dyn FrameWriter>>,
}

impl Default for ProgressBuilder {
    fn default() -> Self {
        Self::from_config(&ProgressConfig::default())
    }
}

impl ProgressBuilder {
    /// Starts from the serializable defaults in `config`.
    pub fn from_config(config: &ProgressConfig) -> Self {
        Self {
            width: config.width,
            format: config.bar_format(),
            refresh_rate: if config.refresh_rate_ms == 0 {
                Duration::from_millis(ProgressConfig::DEFAULT_REFRESH_RATE_MS)
            } else {
                config.refresh_rate()
            },
            before_render: None,
            cancel: None,
            shutdown_notifier: None,
            writer: None,
        }
    }

    /// Default bar width and fallback terminal width.
    #[must_use]
    pub fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Default five character bar skin; malformed skins are ignored.
    #[must_use]
    pub fn format(mut self, skin: &str) -> Self {
        match BarFormat::parse(skin) {
            Ok(format) => self.format = format,
            Err(err) => tracing::warn!("Ignoring progress format: {err}"),
        }
        self
    }

    /// Tick interval, also the width-sync timeout.
    #[must_use]
    pub fn refresh_rate(mut self, refresh_rate: Duration) -> Self {
        if refresh_rate.is_zero() {
            tracing::warn!("Ignoring zero refresh rate");
        } else {
            self.refresh_rate = refresh_rate;
        }
        self
    }

    #[must_use]
    pub fn before_render<F>(mut self, hook: F) -> Self
    where
        F: Fn(&[Bar]) + Send + Sync + 'static,
    {
        self.before_render = Some(Arc::new(hook));
        self
    }

    /// Token that stops the refresh timer and aborts every bar when cancelled.
    #[must_use]
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Receives `()` exactly once, after the control task has exited.
    #[must_use]
    pub fn shutdown_notifier(mut self, notifier: oneshot::Sender<()>) -> Self {
        self.shutdown_notifier = Some(notifier);
        self
    }

    /// Frame sink; defaults to a [`CursorWriter`] on stdout.
    #[must_use]
    pub fn writer(mut self, writer: impl FrameWriter + 'static) -> Self {
        self.writer = Some(Box::new(writer));
        self
    }

    /// Spawns the control task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Progress {
        let (ops_tx, ops_rx) = mpsc::channel(1);
        let tracker = TaskTracker::new();
        let quit = CancellationToken::new();
        let done = CancellationToken::new();

        let mut ticker = tokio::time::interval_at(
            Instant::now() + self.refresh_rate,
            self.refresh_rate,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let server = Server {
            bars: Vec::with_capacity(3),
            width: self.width,
            format: self.format,
            refresh_rate: self.refresh_rate,
            writer: self
                .writer
                .unwrap_or_else(|| Box::new(CursorWriter::stdout())),
            ticker: Some(ticker),
            before_render: self.before_render,
            cancel: self.cancel.clone(),
            bar_cancel: self.cancel,
            shutdown_notifier: self.shutdown_notifier,
            tracker: tracker.clone(),
            stopping: false,
        };
        tokio::spawn(server.run(ops_rx, quit.clone(), done.clone()));

        Progress {
            ops: ops_tx,
            tracker,
            quit,
            done,
            stopping: AtomicBool::new(false),
        }
    }
}

/// Container that renders a set of bars to the terminal.
///
/// All methods take `&self`; wrap it in an `Arc` to share between tasks.
pub struct Progress {
    ops: mpsc::Sender<Command>,
    /// Completion join counter: one token per bar until it is released.
    tracker: TaskTracker,
    /// Raised once by `stop` to end the control task.
    quit: CancellationToken,
    /// Raised by the control task on exit.
    done: CancellationToken,
    stopping: AtomicBool,
}

impl Progress {
    /// Container with default settings rendering to stdout.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ProgressBuilder {
        ProgressBuilder::default()
    }

    /// Adds a bar and returns its handle.
    ///
    /// Returns `None` once shutdown has been requested.
    pub async fn add_bar(&self, total: u64, options: BarOptions) -> Option<Bar> {
        if self.stopping.load(Ordering::SeqCst) {
            return None;
        }
        let (reply, result) = oneshot::channel();
        let mut pending = PendingBar(result);
        self.send(Command::Add {
            total,
            options,
            reply,
        })
        .await?;
        (&mut pending.0).await.ok()
    }

    /// Completes and removes `bar`; `false` if it is not in this container.
    pub async fn remove_bar(&self, bar: &Bar) -> bool {
        let (reply, result) = oneshot::channel();
        let command = Command::Remove {
            bar: bar.clone(),
            reply,
        };
        if self.send(command).await.is_none() {
            return false;
        }
        result.await.unwrap_or(false)
    }

    /// Number of bars currently in the container.
    pub async fn bar_count(&self) -> usize {
        let (reply, result) = oneshot::channel();
        if self.send(Command::Count { reply }).await.is_none() {
            return 0;
        }
        result.await.unwrap_or(0)
    }

    /// Bars that have not yet released their completion slot.
    pub fn pending_completions(&self) -> usize {
        self.tracker.len()
    }

    /// True once the control task has exited.
    pub fn is_stopped(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Waits for every bar to finish, then shuts the control task down.
    ///
    /// Bars with an unknown total are completed at their current position
    /// first. Call this only when every other bar is going to reach its total
    /// (or the cancellation token has fired); it is not a cancellation
    /// mechanism. Only the first call does anything; later calls return
    /// immediately.
    pub async fn stop(&self) {
        if self.stopping.swap(true, Ordering::SeqCst) {
            return;
        }

        let (reply, applied) = oneshot::channel();
        if self
            .send(Command::CompleteUnbounded { reply })
            .await
            .is_some()
        {
            let _ = applied.await;
        }

        tracing::debug!(pending = self.tracker.len(), "waiting for bars to finish");
        self.tracker.close();
        self.tracker.wait().await;

        self.quit.cancel();
        self.done.cancelled().await;
        tracing::debug!("progress stopped");
    }

    async fn send(&self, command: Command) -> Option<()> {
        tokio::select! {
            biased;
            () = self.quit.cancelled() => None,
            sent = self.ops.send(command) => sent.ok(),
        }
    }
}

/// Reply slot of an in-flight `add_bar`.
///
/// If the caller drops the future after the control task has answered, the
/// bar nobody received is completed so it cannot hold up `stop`.
struct PendingBar(oneshot::Receiver<Bar>);

impl Drop for PendingBar {
    fn drop(&mut self) {
        // After close, a reply not yet sent fails on the server side instead.
        self.0.close();
        if let Ok(bar) = self.0.try_recv() {
            tracing::debug!(bar = bar.id(), "add abandoned, completing bar");
            bar.complete();
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

/// State owned by the control task.
struct Server {
    bars: Vec<Bar>,
    width: usize,
    format: BarFormat,
    refresh_rate: Duration,
    writer: Box<dyn FrameWriter>,
    /// `None` once cancelled.
    ticker: Option<Interval>,
    before_render: Option<BeforeRender>,
    /// Armed until the first cancellation is handled.
    cancel: Option<CancellationToken>,
    /// Handed to every new bar, even after the loop has disarmed `cancel`.
    bar_cancel: Option<CancellationToken>,
    shutdown_notifier: Option<oneshot::Sender<()>>,
    tracker: TaskTracker,
    /// Set once unbounded bars have been completed for `stop`; later adds
    /// are refused.
    stopping: bool,
}

impl Server {
    async fn run(
        mut self,
        mut ops: mpsc::Receiver<Command>,
        quit: CancellationToken,
        done: CancellationToken,
    ) {
        let _done = done.drop_guard();

        loop {
            tokio::select! {
                command = ops.recv() => match command {
                    Some(command) => self.handle(command),
                    // Every Progress handle is gone.
                    None => break,
                },
                () = next_tick(&mut self.ticker) => self.render_frame().await,
                () = cancelled(self.cancel.as_ref()) => {
                    tracing::debug!("cancellation received, stopping refresh");
                    self.ticker = None;
                    self.cancel = None;
                }
                () = quit.cancelled() => break,
            }
        }

        self.ticker = None;
        if let Some(notifier) = self.shutdown_notifier.take() {
            let _ = notifier.send(());
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Add {
                total,
                options,
                reply,
            } => {
                if self.stopping {
                    // Dropping the reply resolves the caller to `None`.
                    tracing::debug!("add refused, progress is stopping");
                    return;
                }
                let bar = Bar::new(
                    total,
                    self.bar_cancel.as_ref(),
                    options,
                    (self.width, self.format),
                    self.tracker.token(),
                );
                self.bars.push(bar.clone());
                tracing::debug!(bar = bar.id(), total, "bar added");

                // Caller gave up waiting; don't keep a bar nobody can finish.
                if let Err(bar) = reply.send(bar) {
                    self.bars.pop();
                    bar.complete();
                }
            }
            Command::Remove { bar, reply } => {
                let found = match self.bars.iter().position(|b| *b == bar) {
                    Some(index) => {
                        let removed = self.bars.remove(index);
                        removed.complete();
                        tracing::debug!(bar = removed.id(), "bar removed");
                        true
                    }
                    None => false,
                };
                let _ = reply.send(found);
            }
            Command::Count { reply } => {
                let _ = reply.send(self.bars.len());
            }
            Command::CompleteUnbounded { reply } => {
                self.stopping = true;
                for bar in &self.bars {
                    bar.complete_unbounded();
                }
                let _ = reply.send(());
            }
        }
    }

    async fn render_frame(&mut self) {
        if self.bars.is_empty() {
            return;
        }

        if let Some(hook) = &self.before_render {
            hook(&self.bars);
        }

        let count = self.bars.len();
        let deadline = Instant::now() + self.refresh_rate;
        let first = &self.bars[0];
        let prepend = WidthSync::new(deadline, count, first.num_prependers());
        let append = WidthSync::new(deadline, count, first.num_appenders());

        let term_width = match self.writer.width() {
            Ok(width) if width > 0 => width,
            _ => self.width,
        };

        let (flushed_tx, flushed_rx) = watch::channel(false);
        let sources = self
            .bars
            .iter()
            .map(|bar| {
                bar.render(
                    term_width,
                    flushed_rx.clone(),
                    prepend.clone(),
                    append.clone(),
                )
            })
            .collect();

        let mut rows = fan_in(sources);
        while let Some(row) = rows.recv().await {
            if let Err(err) = self.writer.write(&row) {
                // Dropping `flushed_tx` unblocks the bars without a flush.
                tracing::warn!("Abandoning frame: {err}");
                self.writer.discard();
                return;
            }
        }
        if let Err(err) = self.writer.flush() {
            tracing::warn!("Failed to flush frame: {err}");
            return;
        }

        flushed_tx.send_replace(true);
        tracing::trace!(bars = count, term_width, "frame flushed");
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use tokio::time::timeout;

    use super::*;
    use crate::decor::{self, DecorFlags};
    use crate::terminal::CaptureWriter;

    const RR: Duration = Duration::from_millis(50);

    fn progress(capture: &CaptureWriter) -> Progress {
        Progress::builder()
            .refresh_rate(RR)
            .width(10)
            .writer(capture.clone())
            .build()
    }

    fn capture() -> CaptureWriter {
        CaptureWriter::new().with_width(80)
    }

    fn named(name: &str) -> BarOptions {
        BarOptions::new().prepend([decor::name(name, 0, DecorFlags::NONE)])
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_tracks_adds_and_removes() {
        let capture = capture();
        let p = progress(&capture);

        let a = p.add_bar(10, BarOptions::new()).await.unwrap();
        let b = p.add_bar(10, BarOptions::new()).await.unwrap();
        let _c = p.add_bar(10, BarOptions::new()).await.unwrap();
        assert_eq!(p.bar_count().await, 3);

        assert!(p.remove_bar(&b).await);
        assert!(!p.remove_bar(&b).await);
        assert_eq!(p.bar_count().await, 2);

        assert!(p.remove_bar(&a).await);
        assert_eq!(p.bar_count().await, 1);
        assert!(b.is_finished());
        assert_eq!(p.pending_completions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_frames_without_bars() {
        let capture = capture();
        let _p = progress(&capture);

        tokio::time::sleep(RR * 5).await;
        assert!(capture.frames().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_rows_follow_insertion_order() {
        let capture = capture();
        let p = progress(&capture);
        for name in ["first", "second", "third"] {
            p.add_bar(4, named(name)).await.unwrap();
        }

        tokio::time::sleep(RR * 2).await;
        let frame = capture.last_frame().unwrap();
        assert_eq!(
            frame,
            "first[--------]\nsecond[--------]\nthird[--------]\n"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_synced_columns_share_width() {
        let capture = capture();
        let p = progress(&capture);
        for name in ["a", "bbbb", "cc"] {
            let options = BarOptions::new()
                .width(4)
                .prepend([decor::name(name, 0, DecorFlags::WIDTH_SYNC)]);
            p.add_bar(2, options).await.unwrap();
        }

        tokio::time::sleep(RR * 2).await;
        let frame = capture.last_frame().unwrap();
        assert_eq!(frame, "   a[--]\nbbbb[--]\n  cc[--]\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_before_render_sees_bars_in_order() {
        let capture = capture();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let hook_seen = Arc::clone(&seen);
        let p = Progress::builder()
            .refresh_rate(RR)
            .writer(capture.clone())
            .before_render(move |bars| {
                let ids: Vec<u64> = bars.iter().map(Bar::id).collect();
                hook_seen.lock().unwrap().push(ids);
            })
            .build();

        let a = p.add_bar(1, BarOptions::new()).await.unwrap();
        let b = p.add_bar(1, BarOptions::new()).await.unwrap();
        tokio::time::sleep(RR + RR / 2).await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.last(), Some(&vec![a.id(), b.id()]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_width_shrinks_bodies() {
        let capture = CaptureWriter::new().with_width(6);
        let p = Progress::builder()
            .refresh_rate(RR)
            .width(40)
            .writer(capture.clone())
            .build();
        let bar = p.add_bar(2, BarOptions::new()).await.unwrap();
        bar.incr(1);

        tokio::time::sleep(RR * 2).await;
        assert_eq!(capture.last_frame().as_deref(), Some("[=>--]\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_terminal_width_falls_back_to_default_width() {
        for capture in [CaptureWriter::new(), CaptureWriter::new().with_width(0)] {
            let p = Progress::builder()
                .refresh_rate(RR)
                .width(10)
                .writer(capture.clone())
                .build();
            let bar = p
                .add_bar(2, BarOptions::new().width(40))
                .await
                .unwrap();
            bar.incr(1);

            tokio::time::sleep(RR * 2).await;
            assert_eq!(capture.last_frame().as_deref(), Some("[===>----]\n"));
            bar.complete();
            timeout(Duration::from_secs(5), p.stop()).await.unwrap();
        }
    }

    /// Fails every write and counts flushes.
    struct BrokenWriter {
        flushes: Arc<AtomicUsize>,
    }

    impl FrameWriter for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn discard(&mut self) {}

        fn width(&self) -> std::io::Result<usize> {
            Ok(80)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_error_abandons_frame_without_blocking_stop() {
        let flushes = Arc::new(AtomicUsize::new(0));
        let p = Progress::builder()
            .refresh_rate(RR)
            .writer(BrokenWriter {
                flushes: Arc::clone(&flushes),
            })
            .build();
        let bar = p.add_bar(1, BarOptions::new()).await.unwrap();
        bar.incr(1);

        timeout(Duration::from_secs(5), p.stop()).await.unwrap();
        assert_eq!(flushes.load(Ordering::SeqCst), 0);
        assert!(bar.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_add_does_not_block_stop() {
        let capture = capture();
        let p = progress(&capture);

        {
            let add = p.add_bar(10, BarOptions::new());
            tokio::pin!(add);
            // One poll queues the command; the reply is still outstanding.
            tokio::select! {
                biased;
                _ = &mut add => panic!("add answered before the control task ran"),
                () = std::future::ready(()) => {}
            }
            for _ in 0..10 {
                tokio::task::yield_now().await;
            }
        }
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(p.pending_completions(), 0);
        timeout(Duration::from_secs(5), p.stop()).await.unwrap();
        assert!(p.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_after_unbounded_completion_is_refused() {
        let capture = capture();
        let p = progress(&capture);
        let bar = p.add_bar(0, BarOptions::new()).await.unwrap();
        bar.incr(2);

        // The add lands after stop has completed unbounded bars.
        let (reply, applied) = oneshot::channel();
        p.send(Command::CompleteUnbounded { reply }).await.unwrap();
        applied.await.unwrap();

        assert!(p.add_bar(0, BarOptions::new()).await.is_none());
        assert_eq!(p.bar_count().await, 1);
        timeout(Duration::from_secs(5), p.stop()).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent_and_notifies_once() {
        let capture = capture();
        let (notify_tx, mut notify_rx) = oneshot::channel();
        let p = Progress::builder()
            .refresh_rate(RR)
            .writer(capture.clone())
            .shutdown_notifier(notify_tx)
            .build();

        let bar = p.add_bar(3, BarOptions::new()).await.unwrap();
        bar.incr(3);

        timeout(Duration::from_secs(5), p.stop()).await.unwrap();
        assert!(p.is_stopped());
        assert_eq!(p.pending_completions(), 0);
        assert_eq!(notify_rx.try_recv(), Ok(()));

        timeout(Duration::from_secs(5), p.stop()).await.unwrap();
        assert!(notify_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_calls_after_stop_are_rejected() {
        let capture = capture();
        let p = progress(&capture);
        let bar = p.add_bar(1, BarOptions::new()).await.unwrap();
        bar.incr(1);
        p.stop().await;

        assert!(p.add_bar(1, BarOptions::new()).await.is_none());
        assert!(!p.remove_bar(&bar).await);
        assert_eq!(p.bar_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_during_stop_is_rejected() {
        let capture = capture();
        let p = Arc::new(progress(&capture));
        let bar = p.add_bar(10, BarOptions::new()).await.unwrap();

        let stopper = {
            let p = Arc::clone(&p);
            tokio::spawn(async move { p.stop().await })
        };
        tokio::time::sleep(RR).await;
        assert!(!stopper.is_finished());
        assert!(p.add_bar(1, BarOptions::new()).await.is_none());

        bar.incr(10);
        timeout(Duration::from_secs(5), stopper)
            .await
            .unwrap()
            .unwrap();
        assert!(p.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_completes_unknown_totals() {
        let capture = capture();
        let p = progress(&capture);
        let bar = p.add_bar(0, BarOptions::new()).await.unwrap();
        bar.incr(42);

        timeout(Duration::from_secs(5), p.stop()).await.unwrap();
        assert_eq!(bar.total(), 42);
        assert!(bar.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks_and_lets_stop_return() {
        let capture = capture();
        let cancel = CancellationToken::new();
        let p = Progress::builder()
            .refresh_rate(RR)
            .writer(capture.clone())
            .cancel_token(cancel.clone())
            .build();
        let bar = p.add_bar(100, BarOptions::new()).await.unwrap();
        tokio::time::sleep(RR * 3).await;
        assert!(!capture.frames().is_empty());

        cancel.cancel();
        tokio::time::sleep(RR).await;
        let frames = capture.frames().len();
        tokio::time::sleep(RR * 5).await;
        assert_eq!(capture.frames().len(), frames);

        // Loop still serves lifecycle calls after a cancel.
        assert_eq!(p.bar_count().await, 1);
        assert!(bar.is_aborted());

        timeout(Duration::from_secs(5), p.stop()).await.unwrap();
        assert_eq!(p.pending_completions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_progress_ends_control_task() {
        let capture = capture();
        let (notify_tx, notify_rx) = oneshot::channel();
        let p = Progress::builder()
            .refresh_rate(RR)
            .writer(capture)
            .shutdown_notifier(notify_tx)
            .build();
        drop(p);

        timeout(Duration::from_secs(1), notify_rx)
            .await
            .unwrap()
            .unwrap();
    }
}
