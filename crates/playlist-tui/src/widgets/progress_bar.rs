//! Smooth Unicode progress bar for a task's latest status.

use playlist_proto::protocol::TaskProgress;
use ratatui::{
    style::Style,
    text::{Line, Span},
};

use crate::theme::{style_secondary, style_status, C_MUTED};

const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

/// Build the bar string for `percent` (0..=100) in `width` cells.
pub fn bar(percent: u8, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    // Unicode smooth fill: 8 eighths per cell
    let eighths = usize::from(percent.min(100)) * width * 8 / 100;
    let full_blocks = eighths / 8;
    let partial = eighths % 8;

    let mut out = String::with_capacity(width * 3);
    for _ in 0..full_blocks {
        out.push('█');
    }
    if full_blocks < width {
        out.push(BLOCKS[partial]);
        for _ in (full_blocks + 1)..width {
            out.push(' ');
        }
    }
    out
}

/// One line: `▕██████▍   ▏ 40% Merging...`.
pub fn progress_line(progress: &TaskProgress, bar_width: usize) -> Line<'static> {
    let status = style_status(progress.status);
    Line::from(vec![
        Span::styled("▕", Style::default().fg(C_MUTED)),
        Span::styled(bar(progress.progress, bar_width), status),
        Span::styled("▏", Style::default().fg(C_MUTED)),
        Span::styled(format!(" {:>3}% ", progress.progress), style_secondary()),
        Span::styled(progress.message.clone(), status),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_fill() {
        assert_eq!(bar(0, 4), "    ");
        assert_eq!(bar(100, 4), "████");
        assert_eq!(bar(50, 4), "██  ");
        assert_eq!(bar(40, 10).chars().count(), 10);
        assert_eq!(bar(40, 0), "");
    }
}
