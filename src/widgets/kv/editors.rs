use crossterm::event::{Event, KeyCode, KeyModifiers};

use crate::{
    dynamodb::{FilterCondition, Operator},
    widgets::input::TextInput,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnOutcome {
    Continue,
    Save(Vec<String>),
    Cancel,
}

/// Checkbox list over every discovered column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnEditor {
    columns: Vec<String>,
    checked: Vec<bool>,
    cursor: usize,
}

impl ColumnEditor {
    /// With no saved preference every column starts checked.
    pub fn new(columns: Vec<String>, saved: Option<&[String]>) -> Self {
        let checked = match saved {
            Some(saved) if !saved.is_empty() => {
                columns.iter().map(|c| saved.contains(c)).collect()
            }
            _ => vec![true; columns.len()],
        };
        Self {
            columns,
            checked,
            cursor: 0,
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, bool)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.checked.iter().copied())
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selected(&self) -> Vec<String> {
        self.rows()
            .filter(|(_, checked)| *checked)
            .map(|(name, _)| name.to_string())
            .collect()
    }

    pub fn handle_event(&mut self, event: &Event) -> ColumnOutcome {
        let Some(key) = event.as_key_press_event() else {
            return ColumnOutcome::Continue;
        };
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.cursor + 1 < self.columns.len() {
                    self.cursor += 1;
                }
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some(checked) = self.checked.get_mut(self.cursor) {
                    *checked = !*checked;
                }
            }
            KeyCode::Char('a') => self.checked.iter_mut().for_each(|c| *c = true),
            KeyCode::Char('n') => self.checked.iter_mut().for_each(|c| *c = false),
            KeyCode::Char('s') => return ColumnOutcome::Save(self.selected()),
            KeyCode::Esc => return ColumnOutcome::Cancel,
            _ => {}
        }
        ColumnOutcome::Continue
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    Continue,
    Apply(Vec<FilterCondition>),
    Clear,
    Cancel,
}

pub const FIELD_LABELS: [&str; 3] = ["Column", "Operator", "Value"];

/// Condition list plus a three-field form for adding one more.
#[derive(Debug, Clone, Default)]
pub struct FilterEditor {
    conditions: Vec<FilterCondition>,
    fields: [TextInput; 3],
    focus: usize,
    error: Option<String>,
}

impl FilterEditor {
    pub fn new(conditions: Vec<FilterCondition>) -> Self {
        Self {
            conditions,
            ..Self::default()
        }
    }

    pub fn conditions(&self) -> &[FilterCondition] {
        &self.conditions
    }

    pub fn fields(&self) -> &[TextInput; 3] {
        &self.fields
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn fields_empty(&self) -> bool {
        self.fields.iter().all(TextInput::is_empty)
    }

    /// Turns the form into a condition once all three fields are filled.
    fn add_condition(&mut self) {
        let [column, operator, value] = &self.fields;
        if column.is_empty() || operator.is_empty() || value.is_empty() {
            return;
        }
        match operator.value().parse::<Operator>() {
            Ok(operator) => {
                self.conditions.push(FilterCondition::new(
                    column.value().trim(),
                    operator,
                    value.value(),
                ));
                self.fields.iter_mut().for_each(TextInput::clear);
                self.focus = 0;
                self.error = None;
            }
            Err(err) => {
                self.focus = 1;
                self.error = Some(err.to_string());
            }
        }
    }

    pub fn handle_event(&mut self, event: &Event) -> FilterOutcome {
        let Some(key) = event.as_key_press_event() else {
            return FilterOutcome::Continue;
        };
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('s') if ctrl => return FilterOutcome::Apply(self.conditions.clone()),
            KeyCode::Char('x') if ctrl => return FilterOutcome::Clear,
            KeyCode::Esc => return FilterOutcome::Cancel,
            KeyCode::Tab => self.focus = (self.focus + 1) % self.fields.len(),
            KeyCode::BackTab => {
                self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
            }
            KeyCode::Enter => self.add_condition(),
            KeyCode::Backspace if self.fields_empty() => {
                self.conditions.pop();
            }
            _ => {
                self.fields[self.focus].handle_event(event);
            }
        }
        FilterOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyEvent;

    use super::*;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    fn type_str(editor: &mut FilterEditor, s: &str) {
        for c in s.chars() {
            editor.handle_event(&key(KeyCode::Char(c)));
        }
    }

    fn columns() -> Vec<String> {
        ["pk", "sk", "name"].map(String::from).to_vec()
    }

    #[test]
    fn columns_default_to_all_checked() {
        let editor = ColumnEditor::new(columns(), None);
        assert_eq!(editor.selected(), columns());
    }

    #[test]
    fn saved_columns_are_prechecked() {
        let saved = vec!["name".to_string()];
        let editor = ColumnEditor::new(columns(), Some(&saved));
        assert_eq!(editor.selected(), vec!["name"]);
    }

    #[test]
    fn toggling_and_saving_columns() {
        let mut editor = ColumnEditor::new(columns(), None);
        editor.handle_event(&key(KeyCode::Down));
        editor.handle_event(&key(KeyCode::Char(' ')));
        assert_eq!(
            editor.handle_event(&key(KeyCode::Char('s'))),
            ColumnOutcome::Save(vec!["pk".to_string(), "name".to_string()])
        );
        editor.handle_event(&key(KeyCode::Char('n')));
        assert!(editor.selected().is_empty());
        editor.handle_event(&key(KeyCode::Char('a')));
        assert_eq!(editor.selected().len(), 3);
        assert_eq!(editor.handle_event(&key(KeyCode::Esc)), ColumnOutcome::Cancel);
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut editor = ColumnEditor::new(columns(), None);
        for _ in 0..10 {
            editor.handle_event(&key(KeyCode::Char('j')));
        }
        assert_eq!(editor.cursor(), 2);
        editor.handle_event(&key(KeyCode::Up));
        assert_eq!(editor.cursor(), 1);
    }

    #[test]
    fn enter_adds_condition_from_fields() {
        let mut editor = FilterEditor::default();
        type_str(&mut editor, "status");
        editor.handle_event(&key(KeyCode::Tab));
        type_str(&mut editor, "==");
        editor.handle_event(&key(KeyCode::Tab));
        type_str(&mut editor, "open");
        editor.handle_event(&key(KeyCode::Enter));
        assert_eq!(
            editor.conditions(),
            &[FilterCondition::new("status", Operator::Equals, "open")]
        );
        assert!(editor.fields().iter().all(TextInput::is_empty));
        assert_eq!(editor.focus(), 0);
    }

    #[test]
    fn incomplete_form_is_not_added() {
        let mut editor = FilterEditor::default();
        type_str(&mut editor, "status");
        editor.handle_event(&key(KeyCode::Enter));
        assert!(editor.conditions().is_empty());
        assert_eq!(editor.fields()[0].value(), "status");
    }

    #[test]
    fn unknown_operator_keeps_form() {
        let mut editor = FilterEditor::default();
        type_str(&mut editor, "a");
        editor.handle_event(&key(KeyCode::Tab));
        type_str(&mut editor, "like");
        editor.handle_event(&key(KeyCode::Tab));
        type_str(&mut editor, "b");
        editor.handle_event(&key(KeyCode::Enter));
        assert!(editor.conditions().is_empty());
        assert!(editor.error().is_some());
        assert_eq!(editor.focus(), 1);
    }

    #[test]
    fn backspace_on_empty_form_removes_last_condition() {
        let mut editor = FilterEditor::new(vec![
            FilterCondition::new("a", Operator::Equals, "1"),
            FilterCondition::new("b", Operator::Contains, "2"),
        ]);
        editor.handle_event(&key(KeyCode::Backspace));
        assert_eq!(editor.conditions().len(), 1);
        type_str(&mut editor, "x");
        editor.handle_event(&key(KeyCode::Backspace));
        assert_eq!(editor.conditions().len(), 1);
        assert!(editor.fields()[0].is_empty());
    }

    #[test]
    fn control_keys_finish_editing() {
        let mut editor = FilterEditor::new(vec![FilterCondition::new("a", Operator::Equals, "1")]);
        assert_eq!(
            editor.handle_event(&ctrl('s')),
            FilterOutcome::Apply(vec![FilterCondition::new("a", Operator::Equals, "1")])
        );
        assert_eq!(editor.handle_event(&ctrl('x')), FilterOutcome::Clear);
        assert_eq!(editor.handle_event(&key(KeyCode::Esc)), FilterOutcome::Cancel);
    }
}
