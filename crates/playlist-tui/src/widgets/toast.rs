//! Transient status messages in the top-right corner.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::theme::{C_TOAST_ERROR, C_TOAST_INFO, C_TOAST_SUCCESS, C_TOAST_WARNING};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    fn icon(self) -> &'static str {
        match self {
            Severity::Info => "·",
            Severity::Success => "✓",
            Severity::Warning => "!",
            Severity::Error => "✗",
        }
    }

    fn color(self) -> ratatui::style::Color {
        match self {
            Severity::Info => C_TOAST_INFO,
            Severity::Success => C_TOAST_SUCCESS,
            Severity::Warning => C_TOAST_WARNING,
            Severity::Error => C_TOAST_ERROR,
        }
    }

    fn lifetime(self) -> Duration {
        match self {
            Severity::Info | Severity::Success => Duration::from_secs(3),
            Severity::Warning => Duration::from_secs(4),
            Severity::Error => Duration::from_secs(5),
        }
    }
}

struct Toast {
    message: String,
    severity: Severity,
    expires: Instant,
}

pub struct ToastManager {
    toasts: VecDeque<Toast>,
    max_visible: usize,
}

impl ToastManager {
    pub fn new() -> Self {
        Self {
            toasts: VecDeque::new(),
            max_visible: 4,
        }
    }

    pub fn push(&mut self, message: impl Into<String>, severity: Severity) {
        let message = message.into();
        self.toasts.retain(|t| t.message != message);
        self.toasts.push_back(Toast {
            message,
            severity,
            expires: Instant::now() + severity.lifetime(),
        });
        while self.toasts.len() > self.max_visible * 2 {
            self.toasts.pop_front();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Info);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Success);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Warning);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Error);
    }

    /// Drop expired toasts. Returns true if any were removed.
    pub fn tick(&mut self) -> bool {
        let now = Instant::now();
        let before = self.toasts.len();
        self.toasts.retain(|t| t.expires > now);
        before != self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    /// Newest message first.
    pub fn messages(&self) -> impl Iterator<Item = (&str, Severity)> {
        self.toasts
            .iter()
            .rev()
            .map(|t| (t.message.as_str(), t.severity))
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let max_width = (area.width / 2).clamp(30, 60);
        let mut y = area.y + 1;

        for (message, severity) in self.messages().take(self.max_visible) {
            if y >= area.y + area.height {
                break;
            }
            let w = (message.chars().count() as u16 + 4).min(max_width);
            let toast_area = Rect {
                x: area.x + area.width.saturating_sub(w + 1),
                y,
                width: w,
                height: 1,
            };
            frame.render_widget(Clear, toast_area);
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    format!(" {} {} ", severity.icon(), message),
                    Style::default()
                        .fg(severity.color())
                        .add_modifier(Modifier::BOLD),
                ))),
                toast_area,
            );
            y += 1;
        }
    }
}

impl Default for ToastManager {
    fn default() -> Self {
        Self::new()
    }
}
