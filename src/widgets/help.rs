use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};
use unicode_width::UnicodeWidthStr;

use super::theme::Theme;

/// One key hint in a footer: `[keys] short`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entry {
    pub keys: &'static str,
    pub short: &'static str,
}

impl Entry {
    pub const fn new(keys: &'static str, short: &'static str) -> Self {
        Self { keys, short }
    }
}

fn make_spans<'a>(entries: &'a [Entry], theme: &Theme) -> Vec<Span<'a>> {
    let mut spans: Vec<_> = entries
        .iter()
        .flat_map(|entry| {
            [
                Span::styled(
                    format!("[{}]", entry.keys),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(" "),
                Span::raw(entry.short),
                Span::styled(" • ", Style::default().fg(theme.text_muted())),
            ]
        })
        .collect();
    // trailing separator
    spans.pop();
    spans
}

/// Rows the footer needs at `width` columns.
pub fn height(entries: &[Entry], width: u16) -> u16 {
    if width == 0 {
        return 0;
    }
    let total_width: usize = make_spans(entries, &Theme::dark())
        .iter()
        .map(|s| s.content.width())
        .sum();
    total_width.div_ceil(width as usize) as u16
}

pub fn render(entries: &[Entry], frame: &mut Frame, area: Rect, theme: &Theme) {
    let spans = make_spans(entries, theme);
    let footer = Paragraph::new(Line::from(spans))
        .style(Style::default().fg(theme.text_muted()))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, area);
}
