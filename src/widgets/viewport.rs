use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::Line,
    widgets::{Block, Paragraph},
};

use super::theme::Theme;

/// Scrollable window over text taller than the screen.
#[derive(Debug, Default, Clone)]
pub struct Viewport {
    lines: Vec<String>,
    offset: usize,
    height: usize,
}

impl Viewport {
    pub fn set_content(&mut self, text: &str) {
        self.lines = text.lines().map(str::to_string).collect();
        self.clamp();
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_height(&mut self, height: usize) {
        self.height = height;
        self.clamp();
    }

    fn max_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.height.max(1))
    }

    fn clamp(&mut self) {
        self.offset = self.offset.min(self.max_offset());
    }

    pub fn goto_top(&mut self) {
        self.offset = 0;
    }

    pub fn goto_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.offset = self.offset.saturating_sub(n);
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.offset = (self.offset + n).min(self.max_offset());
    }

    pub fn visible_lines(&self) -> &[String] {
        let end = (self.offset + self.height).min(self.lines.len());
        &self.lines[self.offset..end]
    }

    /// Scroll keys; returns false for anything else.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        let page = self.height.max(1);
        let half = (page / 2).max(1);
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('u') if ctrl => self.scroll_up(half),
            KeyCode::Char('d') if ctrl => self.scroll_down(half),
            KeyCode::Char('b') if ctrl => self.scroll_up(page),
            KeyCode::Char('f') if ctrl => self.scroll_down(page),
            KeyCode::Up | KeyCode::Char('k') => self.scroll_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll_down(1),
            KeyCode::PageUp => self.scroll_up(page),
            KeyCode::PageDown => self.scroll_down(page),
            KeyCode::Home => self.goto_top(),
            KeyCode::End => self.goto_bottom(),
            _ => return false,
        }
        true
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, block: Block<'_>, theme: &Theme) {
        let lines: Vec<Line> = self
            .visible_lines()
            .iter()
            .map(|line| Line::raw(line.as_str()))
            .collect();
        let body = Paragraph::new(lines)
            .block(block)
            .style(Style::default().fg(theme.text()));
        frame.render_widget(body, area);
    }
}
