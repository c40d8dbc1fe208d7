use crossterm::event::{Event, KeyCode, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Clear, Paragraph},
};
use unicode_width::UnicodeWidthStr;

use crate::{
    env::{Effect, Message, TOAST_DURATION, Toast},
    util::{centered, fill_bg, pad},
    widgets::{Browser, KvBrowser, LogBrowser, theme::Theme},
};

const MENU: &[(&str, &str)] = &[
    ("1", "DynamoDB tables"),
    ("2", "CloudWatch logs"),
    ("q", "Quit"),
];
const FAREWELL: &str = "Bye!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Menu,
    Kv,
    Logs,
}

/// Root of the UI: service selection, global keys and the toast.
pub struct App {
    service: Service,
    kv: KvBrowser,
    logs: LogBrowser,
    toast: Option<Toast>,
    toast_generation: u64,
    quitting: bool,
    width: u16,
    height: u16,
    theme: Theme,
}

impl App {
    pub fn new(kv: KvBrowser, logs: LogBrowser) -> Self {
        Self {
            service: Service::Menu,
            kv,
            logs,
            toast: None,
            toast_generation: 0,
            quitting: false,
            width: 0,
            height: 0,
            theme: Theme::default(),
        }
    }

    pub fn service(&self) -> Service {
        self.service
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    pub fn is_quitting(&self) -> bool {
        self.quitting
    }

    pub fn kv(&self) -> &KvBrowser {
        &self.kv
    }

    pub fn logs(&self) -> &LogBrowser {
        &self.logs
    }

    fn active(&mut self) -> Option<&mut dyn Browser> {
        match self.service {
            Service::Menu => None,
            Service::Kv => Some(&mut self.kv),
            Service::Logs => Some(&mut self.logs),
        }
    }

    /// Applies one message and returns the effects the executor must run.
    pub fn dispatch(&mut self, message: Message) -> Vec<Effect> {
        let effects = match message {
            Message::Input(event) => self.handle_input(&event),
            Message::Kv(response) => self.kv.handle_response(response),
            Message::Logs(response) => self.logs.handle_response(response),
            Message::ToastExpired { generation } => {
                if generation == self.toast_generation {
                    self.toast = None;
                }
                vec![]
            }
        };
        self.absorb(effects)
    }

    /// Keeps the effects that only concern the coordinator and passes the
    /// rest on.
    fn absorb(&mut self, effects: Vec<Effect>) -> Vec<Effect> {
        let mut out = Vec::with_capacity(effects.len());
        for effect in effects {
            match effect {
                Effect::BackToMenu => {
                    tracing::debug!(from = ?self.service, "Back to menu");
                    self.service = Service::Menu;
                }
                Effect::ShowToast(toast) => {
                    self.toast_generation += 1;
                    tracing::debug!(generation = self.toast_generation, message = %toast.message, "Showing toast");
                    self.toast = Some(toast);
                    out.push(Effect::ExpireToast {
                        generation: self.toast_generation,
                        after: TOAST_DURATION,
                    });
                }
                other => out.push(other),
            }
        }
        out
    }

    fn handle_input(&mut self, event: &Event) -> Vec<Effect> {
        if let Event::Resize(width, height) = *event {
            self.resize(width, height);
            return vec![];
        }
        if let Some(key) = event.as_key_press_event() {
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                self.quitting = true;
                return vec![Effect::Quit];
            }
            // Any key hides the toast and is still handled as usual.
            if self.toast.take().is_some() {
                tracing::debug!(generation = self.toast_generation, "Toast dismissed");
            }
            if self.service == Service::Menu {
                return match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => {
                        self.quitting = true;
                        vec![Effect::Quit]
                    }
                    KeyCode::Char('1') => self.open(Service::Kv),
                    KeyCode::Char('2') => self.open(Service::Logs),
                    _ => vec![],
                };
            }
        }
        match self.active() {
            Some(browser) => browser.handle_event(event),
            None => vec![],
        }
    }

    fn open(&mut self, service: Service) -> Vec<Effect> {
        tracing::info!(?service, "Opening service");
        self.service = service;
        let (width, height) = (self.width, self.height);
        match self.active() {
            Some(browser) => {
                browser.resize(width, height);
                browser.start()
            }
            None => vec![],
        }
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        match self.service {
            Service::Menu => {
                self.kv.resize(width, height);
                self.logs.resize(width, height);
            }
            Service::Kv => self.kv.resize(width, height),
            Service::Logs => self.logs.resize(width, height),
        }
    }

    pub fn tick(&mut self) {
        if let Some(browser) = self.active() {
            browser.tick();
        }
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let theme = self.theme;
        if self.quitting {
            let farewell = Paragraph::new(FAREWELL)
                .alignment(Alignment::Center)
                .style(Style::default().fg(theme.text()));
            frame.render_widget(farewell, centered(area, area.width, 1));
            return;
        }
        match self.active() {
            Some(browser) => browser.render(frame, area, &theme),
            None => render_menu(frame, area, &theme),
        }
        if let Some(toast) = &self.toast {
            render_toast(toast, frame, area, &theme);
        }
    }
}

fn render_menu(frame: &mut Frame, area: Rect, theme: &Theme) {
    fill_bg(frame.buffer_mut(), area, theme.bg());
    let lines: Vec<Line> = MENU
        .iter()
        .map(|(key, label)| {
            Line::from(vec![
                Span::styled(
                    format!("[{key}] "),
                    Style::default()
                        .fg(theme.accent())
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(*label, Style::default().fg(theme.text())),
            ])
        })
        .collect();
    let height = MENU.len() as u16 + 4;
    let rect = centered(area, 36, height);
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .title(Line::styled(pad("cirrus", 1), Style::default().fg(theme.accent())).centered())
        .border_style(Style::default().fg(theme.border()))
        .style(Style::default().bg(theme.panel_bg()));
    let inner = block.inner(rect);
    frame.render_widget(block, rect);
    frame.render_widget(Paragraph::new(lines), centered(inner, 22, MENU.len() as u16));
}

/// Columns to the left of a toast centred in `width`.
pub fn toast_left_padding(width: u16, toast_width: u16) -> u16 {
    width.saturating_sub(toast_width) / 2
}

fn render_toast(toast: &Toast, frame: &mut Frame, area: Rect, theme: &Theme) {
    let color = theme.toast(toast.kind);
    let width = (toast.message.width() as u16).saturating_add(4).min(area.width);
    let rect = Rect {
        x: area.x + toast_left_padding(area.width, width),
        y: area.y,
        width,
        height: 3.min(area.height),
    };
    frame.render_widget(Clear, rect);
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
        .style(Style::default().bg(theme.panel_bg()));
    let body = Paragraph::new(Line::styled(
        toast.message.as_str(),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .block(block);
    frame.render_widget(body, rect);
}
