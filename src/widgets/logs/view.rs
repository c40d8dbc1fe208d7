use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Rect},
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, BorderType, HighlightSpacing, List, ListItem, Paragraph},
};
use throbber_widgets_tui::Throbber;

use super::{LoadStep, LogBrowser, State};
use crate::{
    logs::store::display_name,
    util::{fill_bg, pad},
    widgets::{
        error::ErrorPopup,
        help::{self, Entry},
        theme::Theme,
    },
};

const GROUP_LIST_HELP: &[Entry] = &[
    Entry::new("↑/↓", "move"),
    Entry::new("enter", "open"),
    Entry::new("1-9", "jump"),
    Entry::new("r", "refresh"),
    Entry::new("q", "menu"),
];

const LOADING_HELP: &[Entry] = &[Entry::new("esc", "cancel")];

const STREAM_HELP: &[Entry] = &[
    Entry::new("↑/↓", "scroll"),
    Entry::new("pgup/pgdn", "page"),
    Entry::new("/", "search"),
    Entry::new("c", "clear search"),
    Entry::new("1-9", "switch group"),
    Entry::new("r", "refresh"),
    Entry::new("esc", "groups"),
];

const SEARCH_HELP: &[Entry] = &[Entry::new("enter", "search"), Entry::new("esc", "cancel")];

impl LogBrowser {
    fn help_entries(&self) -> &'static [Entry] {
        match self.state {
            State::LogGroupList => GROUP_LIST_HELP,
            State::Loading { .. } => LOADING_HELP,
            State::LogStream => STREAM_HELP,
            State::SearchInput(_) => SEARCH_HELP,
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

        match self.state {
            State::LogGroupList => self.render_groups(frame, body, theme),
            State::Loading { step, .. } => {
                let label = match step {
                    LoadStep::Groups => "Loading log groups...",
                    LoadStep::Events => "Fetching recent events...",
                    LoadStep::Search => "Searching...",
                };
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
            }
            State::LogStream => self.render_stream(frame, body, theme),
            State::SearchInput(ref input) => {
                let [stream, input_area] =
                    Layout::vertical([Constraint::Fill(1), Constraint::Length(3)]).areas(body);
                input.render(frame, input_area, "Search", true, theme);
                self.render_stream(frame, stream, theme);
            }
        }
        help::render(entries, frame, footer, theme);

        if let Some(message) = &self.error {
            ErrorPopup { message }.render(frame, area, theme);
        }
    }

    fn render_groups(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .title_top(Line::styled(pad("Log groups", 1), Style::default().fg(theme.text())))
            .title_bottom(Line::styled(
                pad(format!("{} groups", self.groups.len()), 2),
                Style::default().fg(theme.text_muted()),
            ))
            .border_style(Style::default().fg(theme.border()))
            .style(Style::default().bg(theme.panel_bg_alt()).fg(theme.text()));
        if self.groups.is_empty() {
            let empty = Paragraph::new("No log groups found")
                .style(Style::default().fg(theme.text_muted()))
                .block(block);
            frame.render_widget(empty, area);
            return;
        }
        let items: Vec<ListItem> = self
            .groups
            .iter()
            .enumerate()
            .map(|(idx, group)| {
                let shortcut = if idx < 9 {
                    format!("{} ", idx + 1)
                } else {
                    "  ".to_string()
                };
                ListItem::new(format!("{shortcut}{}", display_name(group)))
            })
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
        self.list_state.select(Some(self.cursor));
        frame.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn render_stream(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let title = self.group.as_deref().map(display_name).unwrap_or_default();
        let mut block = Block::bordered()
            .border_type(BorderType::Rounded)
            .title_top(Line::styled(
                pad(title, 1),
                Style::default().fg(theme.text()).add_modifier(Modifier::BOLD),
            ))
            .title_bottom(Line::styled(
                pad(
                    format!(
                        "{}/{}",
                        (self.viewport.offset() + 1).min(self.viewport.line_count()),
                        self.viewport.line_count()
                    ),
                    2,
                ),
                Style::default().fg(theme.text_muted()),
            ))
            .border_style(Style::default().fg(theme.border()))
            .style(Style::default().bg(theme.panel_bg_alt()).fg(theme.text()));
        if let Some(pattern) = &self.filter {
            block = block.title_top(
                Line::styled(
                    pad(format!("search: {pattern}"), 1),
                    Style::default().fg(theme.warning()),
                )
                .right_aligned(),
            );
        }
        let inner = block.inner(area);
        self.viewport.set_height(usize::from(inner.height));
        if self.viewport.line_count() == 0 {
            let message = if self.filter.is_some() {
                "No matching lines"
            } else {
                "No events in the last 10 minutes"
            };
            let empty = Paragraph::new(message)
                .style(Style::default().fg(theme.text_muted()))
                .block(block);
            frame.render_widget(empty, area);
            return;
        }
        self.viewport.render(frame, area, block, theme);
    }
}
