use unicode_width::UnicodeWidthStr;

use super::Shared;
use crate::config::BarFormat;
use crate::decor::{Statistics, decorate, share};
use crate::progress::width_sync::WidthSync;

/// Builds one terminal row: leading decorators, body, trailing decorators.
///
/// The body shrinks when the row would not fit in `term_width`; a zero
/// `term_width` means "unknown" and falls back to the bar's own width.
pub(super) async fn line(
    shared: &Shared,
    stats: &Statistics,
    term_width: usize,
    prepend: &WidthSync,
    append: &WidthSync,
) -> Vec<u8> {
    let mut leading = String::new();
    for (column, decorator) in shared.prepend.iter().enumerate() {
        leading.push_str(&decorate(decorator.as_ref(), stats, prepend, column).await);
    }
    let mut trailing = String::new();
    for (column, decorator) in shared.append.iter().enumerate() {
        trailing.push_str(&decorate(decorator.as_ref(), stats, append, column).await);
    }

    let term_width = if term_width == 0 {
        shared.width
    } else {
        term_width
    };
    let decorations = leading.width() + trailing.width();
    let body_width = if decorations + shared.width > term_width {
        term_width.saturating_sub(decorations)
    } else {
        shared.width
    };
    let body = fill(stats.total, stats.current, body_width, &shared.format);

    let mut row = String::with_capacity(leading.len() + body.len() + trailing.len() + 1);
    row.push_str(&leading);
    row.push_str(&body);
    row.push_str(&trailing);
    row.push('\n');
    row.into_bytes()
}

/// Draws the bar body, `width` columns including both bounds.
///
/// Empty when the width cannot hold the bounds or the total is unknown.
pub(super) fn fill(total: u64, current: u64, width: usize, format: &BarFormat) -> String {
    if width < 2 || total == 0 {
        return String::new();
    }
    let inner = width - 2;
    let filled = share(total, current, inner);

    let mut body = String::with_capacity(width * format.fill.len_utf8());
    body.push(format.left);
    for cell in 0..inner {
        let ch = if cell + 1 == filled && filled < inner {
            format.tip
        } else if cell < filled {
            format.fill
        } else {
            format.empty
        };
        body.push(ch);
    }
    body.push(format.right);
    body
}
