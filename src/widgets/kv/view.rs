use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, BorderType, Cell, HighlightSpacing, List, ListItem, Paragraph, Row, Table, Wrap,
    },
};
use throbber_widgets_tui::Throbber;

use super::{
    DeleteScope, DeleteTarget, KvBrowser, LoadStep, State,
    editors::{ColumnEditor, FIELD_LABELS, FilterEditor},
};
use crate::{
    dynamodb::{Item, Operator, TableSchema, format::format_detailed},
    util::{fill_bg, pad},
    widgets::{
        confirm::ConfirmPopup,
        error::ErrorPopup,
        help::{self, Entry},
        theme::Theme,
    },
};

const TABLE_LIST_HELP: &[Entry] = &[
    Entry::new("↑/↓", "move"),
    Entry::new("enter", "open"),
    Entry::new("r", "refresh"),
    Entry::new("q", "menu"),
];

const LOADING_HELP: &[Entry] = &[Entry::new("esc", "cancel")];

const ITEM_LIST_HELP: &[Entry] = &[
    Entry::new("↑/↓", "move"),
    Entry::new("enter", "view"),
    Entry::new("f", "filter"),
    Entry::new("c", "columns"),
    Entry::new("r", "refresh"),
    Entry::new("e", "empty table"),
    Entry::new("esc", "tables"),
];

const ITEM_DETAIL_HELP: &[Entry] = &[
    Entry::new("↑/↓", "scroll"),
    Entry::new("d", "delete"),
    Entry::new("esc", "back"),
];

const COLUMN_HELP: &[Entry] = &[
    Entry::new("↑/↓", "move"),
    Entry::new("space", "toggle"),
    Entry::new("a", "all"),
    Entry::new("n", "none"),
    Entry::new("s", "save"),
    Entry::new("esc", "cancel"),
];

const FILTER_HELP: &[Entry] = &[
    Entry::new("tab", "next field"),
    Entry::new("enter", "add"),
    Entry::new("backspace", "remove last"),
    Entry::new("ctrl+s", "apply"),
    Entry::new("ctrl+x", "clear"),
    Entry::new("esc", "cancel"),
];

impl KvBrowser {
    fn help_entries(&self) -> &'static [Entry] {
        match &self.state {
            State::TableList => TABLE_LIST_HELP,
            State::Loading { .. } => LOADING_HELP,
            State::ItemList => ITEM_LIST_HELP,
            State::ItemDetail => ITEM_DETAIL_HELP,
            State::ColumnFilter(_) => COLUMN_HELP,
            State::ItemFilter(_) => FILTER_HELP,
            State::DeleteConfirm(_) | State::Deleting(_) => &[],
        }
    }

    fn busy_label(&self) -> Option<String> {
        let table = self.table.as_deref().unwrap_or_default();
        match &self.state {
            State::Loading { step, .. } => Some(match step {
                LoadStep::Tables => "Loading tables...".to_string(),
                LoadStep::Schema => format!("Loading schema for {table}..."),
                LoadStep::Items => format!("Scanning {table}..."),
            }),
            State::Deleting(DeleteScope::Item) => Some("Deleting item...".to_string()),
            State::Deleting(DeleteScope::Table) => Some(format!("Emptying {table}...")),
            _ => None,
        }
    }

    pub(super) fn render_view(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        fill_bg(frame.buffer_mut(), area, theme.bg());
        let entries = self.help_entries();
        let [body, footer] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(help::height(entries, area.width)),
        ])
        .areas(area);

        if let Some(label) = self.busy_label() {
            let throbber = Throbber::default()
                .label(label)
                .style(Style::default().fg(theme.text()))
                .throbber_style(
                    Style::default()
                        .fg(theme.accent())
                        .add_modifier(Modifier::BOLD),
                );
            let [_, line, _] = Layout::vertical([
                Constraint::Fill(1),
                Constraint::Length(1),
                Constraint::Fill(1),
            ])
            .areas(body);
            frame.render_stateful_widget(throbber, line.inner(Margin::new(2, 0)), &mut self.throbber);
        } else {
            match self.state {
                State::TableList => self.render_tables(frame, body, theme),
                State::ItemList | State::DeleteConfirm(DeleteTarget::Table { .. }) => {
                    self.render_items(frame, body, theme)
                }
                State::ItemDetail | State::DeleteConfirm(DeleteTarget::Item { .. }) => {
                    self.render_detail(frame, body, theme)
                }
                State::ColumnFilter(ref editor) => render_columns(editor, frame, body, theme),
                State::ItemFilter(ref editor) => render_filter(editor, frame, body, theme),
                State::Loading { .. } | State::Deleting(_) => {}
            }
        }
        help::render(entries, frame, footer, theme);

        if let State::DeleteConfirm(target) = &self.state {
            let table = self.table.as_deref().unwrap_or_default();
            match target {
                DeleteTarget::Item { summary, .. } => {
                    let message = format!("Delete this item?\n{summary}");
                    ConfirmPopup {
                        title: "Delete item",
                        message: &message,
                        typed: None,
                        hint: "[y] delete • [n] cancel",
                    }
                    .render(frame, area, theme);
                }
                DeleteTarget::Table { typed } => {
                    let message = format!(
                        "Delete every item in {table}?\nType the table name to confirm."
                    );
                    ConfirmPopup {
                        title: "Empty table",
                        message: &message,
                        typed: Some(typed),
                        hint: "[enter] confirm • [esc] cancel",
                    }
                    .render(frame, area, theme);
                }
            }
        }
        if let Some(message) = &self.error {
            ErrorPopup { message }.render(frame, area, theme);
        }
    }

    fn render_tables(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let count = match self.tables.len() {
            1 => "1 table".to_string(),
            n => format!("{n} tables"),
        };
        let mut block = Block::bordered()
            .border_type(BorderType::Rounded)
            .title_top(Line::styled(pad("Tables", 1), Style::default().fg(theme.text())))
            .title_bottom(Line::styled(pad(count, 2), Style::default().fg(theme.text_muted())))
            .border_style(Style::default().fg(theme.border()))
            .style(Style::default().bg(theme.panel_bg_alt()).fg(theme.text()));
        if !self.table_prefix.is_empty() {
            block = block.title_top(
                Line::styled(
                    pad(format!("prefix: {}", self.table_prefix), 1),
                    Style::default().fg(theme.text_muted()),
                )
                .right_aligned(),
            );
        }
        if self.tables.is_empty() {
            let empty = Paragraph::new("No tables found")
                .style(Style::default().fg(theme.text_muted()))
                .block(block);
            frame.render_widget(empty, area);
            return;
        }
        let items: Vec<ListItem> = self
            .tables
            .iter()
            .map(|name| ListItem::new(name.as_str()))
            .collect();
        let list = List::new(items)
            .block(block)
            .highlight_spacing(HighlightSpacing::Always)
            .highlight_symbol(">> ")
            .highlight_style(
                Style::default()
                    .bg(theme.selection_bg())
                    .fg(theme.selection_fg()),
            );
        self.list_state.select(Some(self.table_cursor));
        frame.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn render_items(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let table_name = self.table.clone().unwrap_or_default();
        let area = if self.active_filters.is_empty() {
            area
        } else {
            let [badge, rest] =
                Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]).areas(area);
            let clauses: Vec<String> = self.active_filters.iter().map(ToString::to_string).collect();
            let noun = if clauses.len() == 1 { "filter" } else { "filters" };
            let text = format!(" {} {noun} active: {}", clauses.len(), clauses.join(" AND "));
            frame.render_widget(
                Paragraph::new(Line::styled(text, Style::default().fg(theme.warning()))),
                badge,
            );
            rest
        };

        let count = match self.items.len() {
            1 => "1 item".to_string(),
            n => format!("{n} items"),
        };
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .title_top(Line::styled(
                pad(&table_name, 1),
                Style::default().fg(theme.text()).add_modifier(Modifier::BOLD),
            ))
            .title_bottom(Line::styled(pad(count, 2), Style::default().fg(theme.text_muted())))
            .border_style(Style::default().fg(theme.border()))
            .style(Style::default().bg(theme.panel_bg_alt()).fg(theme.text()));

        if self.items.is_empty() {
            let empty = Paragraph::new("No items")
                .style(Style::default().fg(theme.text_muted()))
                .block(block);
            frame.render_widget(empty, area);
            return;
        }

        let header = Row::new(
            self.item_table
                .columns
                .iter()
                .map(|column| Cell::from(column.name.as_str())),
        )
        .style(
            Style::default()
                .fg(theme.text_muted())
                .add_modifier(Modifier::BOLD),
        );
        let rows: Vec<Row> = self
            .item_table
            .rows
            .iter()
            .map(|row| Row::new(row.iter().map(|cell| Cell::from(cell.as_str()))))
            .collect();
        let widths: Vec<Constraint> = self
            .item_table
            .columns
            .iter()
            .map(|column| Constraint::Length(u16::try_from(column.width).unwrap_or(u16::MAX)))
            .collect();
        let table = Table::new(rows, widths)
            .block(block)
            .header(header)
            .highlight_spacing(HighlightSpacing::Always)
            .highlight_symbol(">>")
            .row_highlight_style(
                Style::default()
                    .bg(theme.selection_bg())
                    .fg(theme.selection_fg()),
            );
        self.item_state.select(Some(self.item_cursor));
        frame.render_stateful_widget(table, area, &mut self.item_state);
    }

    fn render_detail(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .title_top(Line::styled(pad("Item", 1), Style::default().fg(theme.text())))
            .border_style(Style::default().fg(theme.border()))
            .style(Style::default().bg(theme.panel_bg_alt()).fg(theme.text()));
        let (Some(item), Some(schema)) = (self.selected_item(), self.current_schema()) else {
            frame.render_widget(block, area);
            return;
        };
        let detail = Paragraph::new(detail_lines(schema, item, theme))
            .block(block)
            .scroll((self.detail_scroll, 0));
        frame.render_widget(detail, area);
    }
}

/// Key attributes first, then the rest in name order.
fn detail_lines(schema: &TableSchema, item: &Item, theme: &Theme) -> Vec<Line<'static>> {
    let keys = std::iter::once(schema.partition_key.as_str()).chain(schema.sort_key.as_deref());
    let ordered = keys
        .filter_map(|key| item.get_key_value(key))
        .chain(item.iter().filter(|(name, _)| !schema.is_key(name)));
    let mut lines = Vec::new();
    for (name, value) in ordered {
        let name_style = if schema.is_key(name) {
            Style::default().fg(theme.accent()).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.accent_alt())
        };
        lines.push(Line::from(Span::styled(format!("{name}:"), name_style)));
        lines.extend(format_detailed(value, 1).lines().map(|line| Line::raw(line.to_string())));
    }
    lines
}

fn render_columns(editor: &ColumnEditor, frame: &mut Frame, area: Rect, theme: &Theme) {
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .title_top(Line::styled(pad("Columns", 1), Style::default().fg(theme.text())))
        .border_style(Style::default().fg(theme.accent()))
        .style(Style::default().bg(theme.panel_bg_alt()).fg(theme.text()));
    let lines: Vec<Line> = editor
        .rows()
        .enumerate()
        .map(|(idx, (name, checked))| {
            let mark = if checked { "[x]" } else { "[ ]" };
            let style = if idx == editor.cursor() {
                Style::default()
                    .bg(theme.selection_bg())
                    .fg(theme.selection_fg())
            } else {
                Style::default().fg(theme.text())
            };
            Line::styled(format!(" {mark} {name}"), style)
        })
        .collect();
    let scroll = u16::try_from(
        editor
            .cursor()
            .saturating_sub(usize::from(area.height.saturating_sub(3))),
    )
    .unwrap_or(u16::MAX);
    frame.render_widget(Paragraph::new(lines).block(block).scroll((scroll, 0)), area);
}

fn render_filter(editor: &FilterEditor, frame: &mut Frame, area: Rect, theme: &Theme) {
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .title_top(Line::styled(pad("Filters", 1), Style::default().fg(theme.text())))
        .border_style(Style::default().fg(theme.accent()))
        .style(Style::default().bg(theme.panel_bg_alt()).fg(theme.text()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [list_area, fields_area, status_area] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(3),
        Constraint::Length(2),
    ])
    .areas(inner);

    let lines: Vec<Line> = if editor.conditions().is_empty() {
        vec![Line::styled(
            " No conditions",
            Style::default().fg(theme.text_muted()),
        )]
    } else {
        editor
            .conditions()
            .iter()
            .enumerate()
            .map(|(idx, condition)| Line::raw(format!(" {}. {condition}", idx + 1)))
            .collect()
    };
    frame.render_widget(Paragraph::new(lines), list_area);

    let field_areas = Layout::horizontal([
        Constraint::Percentage(35),
        Constraint::Percentage(25),
        Constraint::Percentage(40),
    ])
    .split(fields_area);
    for (idx, field) in editor.fields().iter().enumerate() {
        field.render(frame, field_areas[idx], FIELD_LABELS[idx], idx == editor.focus(), theme);
    }

    let status = match editor.error() {
        Some(err) => Line::styled(format!(" {err}"), Style::default().fg(theme.error())),
        None => {
            let operators: Vec<&str> = Operator::ALL.iter().map(Operator::symbol).collect();
            Line::styled(
                format!(" Operators: {}", operators.join(" ")),
                Style::default().fg(theme.text_muted()),
            )
        }
    };
    frame.render_widget(Paragraph::new(status).wrap(Wrap { trim: true }), status_area);
}
