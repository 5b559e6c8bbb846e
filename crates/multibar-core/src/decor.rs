//! Decorators: text columns drawn before or after a bar body.
//!
//! A decorator only produces text from a [`Statistics`] snapshot. Padding and
//! width synchronization are applied by [`decorate`], which the bar calls
//! once per column per tick.

use std::ops::BitOr;
use std::time::Duration;

use unicode_width::UnicodeWidthStr;

use crate::progress::width_sync::WidthSync;

/// Point-in-time view of a bar handed to decorators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub id: u64,
    /// Zero means the total is not known yet.
    pub total: u64,
    pub current: u64,
    pub completed: bool,
    pub aborted: bool,
    pub time_elapsed: Duration,
    /// Smoothed time spent per unit of progress.
    pub time_per_item: Duration,
}

impl Statistics {
    /// Estimated time until `current` reaches `total`.
    pub fn eta(&self) -> Duration {
        if self.total == 0 || self.completed {
            return Duration::ZERO;
        }
        let remaining = self.total.saturating_sub(self.current) as f64;
        Duration::try_from_secs_f64(self.time_per_item.as_secs_f64() * remaining)
            .unwrap_or(Duration::MAX)
    }
}

/// Decorator layout flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecorFlags(u8);

impl DecorFlags {
    pub const NONE: Self = Self(0);
    /// Pad on the right instead of the left.
    pub const ALIGN_LEFT: Self = Self(1);
    /// Share the column width with every other bar in the frame.
    pub const WIDTH_SYNC: Self = Self(1 << 1);
    /// Add one leading space to a synced column.
    pub const EXTRA_SPACE: Self = Self(1 << 2);
    pub const SYNC_SPACE: Self = Self(Self::WIDTH_SYNC.0 | Self::EXTRA_SPACE.0);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for DecorFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecorConfig {
    pub min_width: usize,
    pub flags: DecorFlags,
}

/// A column of text rendered next to a bar.
pub trait Decorator: Send + Sync {
    fn text(&self, stats: &Statistics) -> String;

    fn config(&self) -> DecorConfig;
}

/// Renders one decorator column, synchronizing its width when requested.
///
/// A synced column submits its own width to `sync` at index `column` and pads
/// to the broadcast maximum. When no broadcast arrives (late submission or a
/// column the group does not know about) the decorator keeps its own width.
pub(crate) async fn decorate(
    decorator: &dyn Decorator,
    stats: &Statistics,
    sync: &WidthSync,
    column: usize,
) -> String {
    let DecorConfig { min_width, flags } = decorator.config();
    let text = decorator.text(stats);
    let own = text.width().max(min_width);

    let width = if flags.contains(DecorFlags::WIDTH_SYNC) {
        let synced = sync.submit(column, own).await.unwrap_or(own);
        if flags.contains(DecorFlags::EXTRA_SPACE) {
            synced + 1
        } else {
            synced
        }
    } else {
        own
    };

    pad(&text, width, flags.contains(DecorFlags::ALIGN_LEFT))
}

fn pad(text: &str, width: usize, align_left: bool) -> String {
    let fill = " ".repeat(width.saturating_sub(text.width()));
    if align_left {
        format!("{text}{fill}")
    } else {
        format!("{fill}{text}")
    }
}

/// Integer share of `width` that `current` represents out of `total`.
pub(crate) fn share(total: u64, current: u64, width: usize) -> usize {
    if total == 0 {
        return 0;
    }
    let current = current.min(total);
    ((width as f64) * (current as f64) / (total as f64)) as usize
}

/// Formats whole seconds compactly: `1h2m3s`, `4m5s`, `6s`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

struct Name {
    name: String,
    config: DecorConfig,
}

impl Decorator for Name {
    fn text(&self, _stats: &Statistics) -> String {
        self.name.clone()
    }

    fn config(&self) -> DecorConfig {
        self.config
    }
}

/// Static label.
pub fn name(name: impl Into<String>, min_width: usize, flags: DecorFlags) -> Box<dyn Decorator> {
    Box::new(Name {
        name: name.into(),
        config: DecorConfig { min_width, flags },
    })
}

/// Applies `render` to each snapshot; backs the built-in dynamic decorators.
struct FnDecorator<F> {
    render: F,
    config: DecorConfig,
}

impl<F> Decorator for FnDecorator<F>
where
    F: Fn(&Statistics) -> String + Send + Sync,
{
    fn text(&self, stats: &Statistics) -> String {
        (self.render)(stats)
    }

    fn config(&self) -> DecorConfig {
        self.config
    }
}

/// Custom decorator from a closure.
pub fn any<F>(render: F, min_width: usize, flags: DecorFlags) -> Box<dyn Decorator>
where
    F: Fn(&Statistics) -> String + Send + Sync + 'static,
{
    Box::new(FnDecorator {
        render,
        config: DecorConfig { min_width, flags },
    })
}

/// `current / total`, with `?` while the total is unknown.
pub fn counters(min_width: usize, flags: DecorFlags) -> Box<dyn Decorator> {
    any(
        |s| {
            if s.total == 0 {
                format!("{} / ?", s.current)
            } else {
                format!("{} / {}", s.current, s.total)
            }
        },
        min_width,
        flags,
    )
}

/// Completion percentage, e.g. `42 %`.
pub fn percentage(min_width: usize, flags: DecorFlags) -> Box<dyn Decorator> {
    any(
        |s| format!("{} %", share(s.total, s.current, 100)),
        min_width,
        flags,
    )
}

/// Estimated time remaining.
pub fn eta(min_width: usize, flags: DecorFlags) -> Box<dyn Decorator> {
    any(|s| format_duration(s.eta()), min_width, flags)
}

/// Time since the bar was created.
pub fn elapsed(min_width: usize, flags: DecorFlags) -> Box<dyn Decorator> {
    any(|s| format_duration(s.time_elapsed), min_width, flags)
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;

    fn stats(total: u64, current: u64) -> Statistics {
        Statistics {
            id: 1,
            total,
            current,
            completed: false,
            aborted: false,
            time_elapsed: Duration::from_secs(65),
            time_per_item: Duration::from_millis(500),
        }
    }

    #[test]
    fn test_flags_compose() {
        let flags = DecorFlags::ALIGN_LEFT | DecorFlags::WIDTH_SYNC;
        assert!(flags.contains(DecorFlags::ALIGN_LEFT));
        assert!(flags.contains(DecorFlags::WIDTH_SYNC));
        assert!(!flags.contains(DecorFlags::EXTRA_SPACE));
        assert!(DecorFlags::SYNC_SPACE.contains(DecorFlags::EXTRA_SPACE));
    }

    #[test]
    fn test_share_bounds() {
        assert_eq!(share(0, 10, 100), 0);
        assert_eq!(share(200, 50, 100), 25);
        assert_eq!(share(100, 150, 100), 100);
        assert_eq!(share(3, 1, 10), 3);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_millis(5900)), "5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m5s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h0m0s");
    }

    #[test]
    fn test_eta_uses_remaining_items() {
        assert_eq!(stats(100, 90).eta(), Duration::from_secs(5));
        assert_eq!(stats(0, 90).eta(), Duration::ZERO);
    }

    #[test]
    fn test_builtin_texts() {
        let s = stats(200, 50);
        assert_eq!(counters(0, DecorFlags::NONE).text(&s), "50 / 200");
        assert_eq!(counters(0, DecorFlags::NONE).text(&stats(0, 3)), "3 / ?");
        assert_eq!(percentage(0, DecorFlags::NONE).text(&s), "25 %");
        assert_eq!(eta(0, DecorFlags::NONE).text(&s), "1m15s");
        assert_eq!(elapsed(0, DecorFlags::NONE).text(&s), "1m5s");
    }

    #[tokio::test]
    async fn test_unsynced_column_pads_to_min_width() {
        let sync = WidthSync::new(Instant::now(), 1, 0);
        let s = stats(100, 5);

        let right = decorate(name("ab", 5, DecorFlags::NONE).as_ref(), &s, &sync, 0).await;
        assert_eq!(right, "   ab");

        let left = decorate(name("ab", 5, DecorFlags::ALIGN_LEFT).as_ref(), &s, &sync, 0).await;
        assert_eq!(left, "ab   ");

        let wide = decorate(name("abcdef", 2, DecorFlags::NONE).as_ref(), &s, &sync, 0).await;
        assert_eq!(wide, "abcdef");
    }

    #[tokio::test]
    async fn test_synced_column_without_group_keeps_own_width() {
        // Group has no columns, so the submission resolves to None.
        let sync = WidthSync::new(Instant::now(), 1, 0);
        let out = decorate(
            name("ab", 0, DecorFlags::SYNC_SPACE).as_ref(),
            &stats(1, 0),
            &sync,
            0,
        )
        .await;
        assert_eq!(out, " ab");
    }
}
