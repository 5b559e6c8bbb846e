//! Concurrent multi-bar run.

use std::time::Duration;

use anyhow::{Context, Result};
use multibar_core::decor::{self, DecorFlags};
use multibar_core::{BarOptions, ProgressBuilder, ProgressConfig};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub struct MultiOptions {
    pub bars: usize,
    pub total: u64,
    pub delay: Duration,
    pub cancel_after: Option<Duration>,
}

pub async fn run(config: &ProgressConfig, opts: MultiOptions) -> Result<()> {
    let cancel = CancellationToken::new();
    let mut builder = ProgressBuilder::from_config(config);
    if opts.cancel_after.is_some() {
        builder = builder.cancel_token(cancel.clone());
    }
    let p = builder.build();

    let mut workers = JoinSet::new();
    for index in 0..opts.bars {
        let options = BarOptions::new()
            .prepend([
                decor::name(
                    format!("Bar#{index}:"),
                    0,
                    DecorFlags::WIDTH_SYNC | DecorFlags::ALIGN_LEFT,
                ),
                decor::eta(4, DecorFlags::SYNC_SPACE),
            ])
            .append([decor::percentage(5, DecorFlags::NONE)]);
        let bar = p
            .add_bar(opts.total, options)
            .await
            .context("progress stopped before all bars were added")?;

        let cancel = cancel.clone();
        let (total, delay) = (opts.total, opts.delay);
        workers.spawn(async move {
            for step in 0..total {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(step_delay(delay, index, step)) => bar.incr(1),
                }
            }
        });
    }

    let timer = opts.cancel_after.map(|after| {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            tracing::debug!("cancelling multi-bar run");
            cancel.cancel();
        })
    });

    while let Some(res) = workers.join_next().await {
        if let Err(err) = res {
            tracing::warn!("bar worker failed: {err}");
        }
    }
    if let Some(timer) = timer {
        timer.abort();
    }

    p.stop().await;

    if cancel.is_cancelled() {
        eprintln!("Run cancelled before all bars completed");
    }
    Ok(())
}

/// Varies the pause per bar and step so bars advance at different speeds.
fn step_delay(base: Duration, bar: usize, step: u64) -> Duration {
    let spread = (bar as u64 * 7 + step * 3) % 5;
    base * u32::try_from(spread + 2).unwrap_or(4) / 4
}
