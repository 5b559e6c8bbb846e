//! Single bar run.

use std::time::Duration;

use anyhow::{Context, Result};
use multibar_core::decor::{self, DecorFlags};
use multibar_core::{BarOptions, ProgressBuilder, ProgressConfig};

const NAME: &str = "Single Bar:";

pub async fn run(config: &ProgressConfig, total: u64, delay: Duration) -> Result<()> {
    let p = ProgressBuilder::from_config(config).build();

    let options = BarOptions::new()
        .prepend([
            decor::name(NAME, NAME.len(), DecorFlags::NONE),
            decor::eta(4, DecorFlags::SYNC_SPACE),
        ])
        .append([decor::percentage(5, DecorFlags::NONE)]);
    let bar = p
        .add_bar(total, options)
        .await
        .context("progress stopped before the bar was added")?;

    for _ in 0..total {
        tokio::time::sleep(delay).await;
        bar.incr(1);
    }

    p.stop().await;
    Ok(())
}
