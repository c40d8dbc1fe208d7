use crossterm::event::{Event, KeyCode, KeyModifiers};
use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    widgets::{Block, Paragraph},
};
use unicode_width::UnicodeWidthStr;

use super::theme::Theme;

/// Single-line text field. The cursor counts chars, not bytes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    pub fn with_value(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.value
            .char_indices()
            .nth(chars)
            .map(|(idx, _)| idx)
            .unwrap_or(self.value.len())
    }

    /// Applies editing keys. Returns false for keys the field does not use so
    /// the caller can treat them as commands.
    pub fn handle_event(&mut self, event: &Event) -> bool {
        let Some(key) = event.as_key_press_event() else {
            return false;
        };
        let len = self.value.chars().count();
        match key.code {
            KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.cursor = 0;
            }
            KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.cursor = len;
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.clear();
            }
            KeyCode::Char(_) if key.modifiers.contains(KeyModifiers::CONTROL) => return false,
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    let at = self.byte_offset(self.cursor - 1);
                    self.value.remove(at);
                    self.cursor -= 1;
                }
            }
            KeyCode::Delete => {
                if self.cursor < len {
                    let at = self.byte_offset(self.cursor);
                    self.value.remove(at);
                }
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                if self.cursor < len {
                    self.cursor += 1;
                }
            }
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = len,
            KeyCode::Char(c) => {
                let at = self.byte_offset(self.cursor);
                self.value.insert(at, c);
                self.cursor += 1;
            }
            _ => return false,
        }
        true
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, title: &str, focused: bool, theme: &Theme) {
        let border = if focused { theme.accent() } else { theme.border() };
        let block = Block::bordered()
            .title(title)
            .style(Style::default().bg(theme.panel_bg_alt()).fg(theme.text()))
            .border_style(Style::default().fg(border));
        frame.render_widget(Paragraph::new(self.value.as_str()).block(block), area);

        if focused {
            let before = &self.value[..self.byte_offset(self.cursor)];
            let x = area.x + 1 + before.width() as u16;
            frame.set_cursor_position((x.min(area.right().saturating_sub(2)), area.y + 1));
        }
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyEvent, KeyEventKind, KeyEventState};

    use super::*;

    fn press(code: KeyCode) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn type_str(input: &mut TextInput, s: &str) {
        for c in s.chars() {
            input.handle_event(&press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn edits_at_cursor() {
        let mut input = TextInput::default();
        type_str(&mut input, "helo");
        input.handle_event(&press(KeyCode::Left));
        type_str(&mut input, "l");
        assert_eq!(input.value(), "hello");
        input.handle_event(&press(KeyCode::Home));
        input.handle_event(&press(KeyCode::Delete));
        assert_eq!(input.value(), "ello");
    }

    #[test]
    fn multibyte_backspace() {
        let mut input = TextInput::with_value("café");
        input.handle_event(&press(KeyCode::Backspace));
        assert_eq!(input.value(), "caf");
        type_str(&mut input, "é!");
        assert_eq!(input.value(), "café!");
    }

    #[test]
    fn command_keys_pass_through() {
        let mut input = TextInput::default();
        assert!(!input.handle_event(&press(KeyCode::Enter)));
        assert!(!input.handle_event(&press(KeyCode::Esc)));
        assert!(!input.handle_event(&press(KeyCode::Tab)));
        let ctrl_s = Event::Key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert!(!input.handle_event(&ctrl_s));
    }
}
