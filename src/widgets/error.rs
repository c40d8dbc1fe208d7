use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Margin, Rect},
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, BorderType, Clear, Paragraph, Wrap},
};

use crate::util::{centered, fill_bg, pad};

use super::theme::Theme;

/// Blocking error overlay. Only an acknowledge key dismisses it.
pub struct ErrorPopup<'a> {
    pub message: &'a str,
}

impl ErrorPopup<'_> {
    pub fn rect(&self, area: Rect) -> Rect {
        centered(area, area.width / 2 + 10, area.height / 3 + 4)
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let area = self.rect(area);
        frame.render_widget(Clear, area);
        fill_bg(frame.buffer_mut(), area, theme.panel_bg());
        let title = Line::styled(
            pad("Error", 1),
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

        let inner = block.inner(area).inner(Margin::new(1, 1));
        let [message_area, hint_area] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(inner);
        let message = Paragraph::new(self.message)
            .style(Style::default().fg(theme.text()))
            .wrap(Wrap { trim: true });
        frame.render_widget(message, message_area);
        let hint = Paragraph::new(Line::styled(
            "Press Enter or Esc to continue",
            Style::default().fg(theme.text_muted()),
        ))
        .alignment(Alignment::Center);
        frame.render_widget(hint, hint_area);
    }
}
