use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Margin, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Clear, Paragraph, Wrap},
};

use crate::util::{centered, fill_bg, pad};

use super::{input::TextInput, theme::Theme};

/// Destructive-action prompt. With `typed` set the user must type the exact
/// confirmation text into the field; otherwise a y/n answer is expected.
pub struct ConfirmPopup<'a> {
    pub title: &'a str,
    pub message: &'a str,
    pub typed: Option<&'a TextInput>,
    pub hint: &'a str,
}

impl ConfirmPopup<'_> {
    pub fn rect(&self, area: Rect) -> Rect {
        let width = ((area.width as f32 * 0.5) as u16).max(44);
        let height = if self.typed.is_some() { 11 } else { 8 };
        centered(area.inner(Margin::new(2, 1)), width, height)
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let area = self.rect(area);
        frame.render_widget(Clear, area);
        fill_bg(frame.buffer_mut(), area, theme.panel_bg());
        let title = Line::styled(
            pad(self.title, 1),
            Style::default()
                .fg(theme.error())
                .add_modifier(Modifier::BOLD),
        )
        .centered();
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .title(title)
            .border_style(Style::default().fg(theme.error()))
            .style(Style::default().bg(theme.panel_bg()).fg(theme.text()));
        frame.render_widget(block.clone(), area);

        let inner = block.inner(area).inner(Margin::new(1, 0));
        let input_height = if self.typed.is_some() { 3 } else { 0 };
        let [message_area, input_area, hint_area] = Layout::vertical([
            Constraint::Min(1),
            Constraint::Length(input_height),
            Constraint::Length(1),
        ])
        .areas(inner);

        let lines: Vec<Line> = self
            .message
            .lines()
            .map(|line| Line::from(Span::styled(line, Style::default().fg(theme.text()))))
            .collect();
        let body = Paragraph::new(Text::from(lines))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(body, message_area);

        if let Some(input) = self.typed {
            input.render(frame, input_area, "Table name", true, theme);
        }

        let hint = Paragraph::new(Line::styled(
            self.hint,
            Style::default().fg(theme.text_muted()),
        ))
        .alignment(Alignment::Center);
        frame.render_widget(hint, hint_area);
    }
}
