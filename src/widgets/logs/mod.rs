mod view;

use chrono::Utc;
use crossterm::event::{Event, KeyCode};
use ratatui::{Frame, layout::Rect, widgets::ListState};
use throbber_widgets_tui::ThrobberState;

use super::{Browser, input::TextInput, theme::Theme, viewport::Viewport};
use crate::{
    env::Effect,
    error::StoreError,
    logs::{
        LogEvent, LogStore, SearchError, SearchTool, TimeWindow,
        store::{EVENT_LIMIT, list_all_log_groups, render_events},
    },
};

/// Rows around the log viewport taken by the header, borders and footer.
const STREAM_CHROME: u16 = 3;

#[derive(Debug)]
pub enum LogRequest {
    ListGroups {
        epoch: u64,
        pattern: Option<String>,
    },
    FetchEvents {
        epoch: u64,
        group: String,
    },
    /// Runs the search tool over `buffer`, the unfiltered stream text.
    Search {
        epoch: u64,
        pattern: String,
        buffer: String,
    },
}

impl LogRequest {
    pub async fn run(self, store: &dyn LogStore, tool: &SearchTool) -> LogResponse {
        match self {
            LogRequest::ListGroups { epoch, pattern } => LogResponse::Groups {
                epoch,
                result: list_all_log_groups(store, pattern.as_deref()).await,
            },
            LogRequest::FetchEvents { epoch, group } => {
                let window = TimeWindow::recent(Utc::now());
                let result = store.filter_log_events(&group, window, EVENT_LIMIT).await;
                LogResponse::Events {
                    epoch,
                    group,
                    result,
                }
            }
            LogRequest::Search {
                epoch,
                pattern,
                buffer,
            } => {
                let result = tool.search(&pattern, &buffer).await;
                LogResponse::Search {
                    epoch,
                    pattern,
                    result,
                }
            }
        }
    }
}

#[derive(Debug)]
pub enum LogResponse {
    Groups {
        epoch: u64,
        result: Result<Vec<String>, StoreError>,
    },
    Events {
        epoch: u64,
        group: String,
        result: Result<Vec<LogEvent>, StoreError>,
    },
    Search {
        epoch: u64,
        pattern: String,
        result: Result<String, SearchError>,
    },
}

impl LogResponse {
    pub fn epoch(&self) -> u64 {
        match self {
            LogResponse::Groups { epoch, .. }
            | LogResponse::Events { epoch, .. }
            | LogResponse::Search { epoch, .. } => *epoch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStep {
    Groups,
    Events,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    GroupList,
    Stream,
}

impl From<Origin> for State {
    fn from(origin: Origin) -> Self {
        match origin {
            Origin::GroupList => State::LogGroupList,
            Origin::Stream => State::LogStream,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    LogGroupList,
    Loading { step: LoadStep, return_to: Origin },
    LogStream,
    SearchInput(TextInput),
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::LogGroupList => "LogGroupList",
            State::Loading { .. } => "Loading",
            State::LogStream => "LogStream",
            State::SearchInput(_) => "SearchInput",
        }
    }
}

/// Log group list and recent-event viewer with local search.
pub struct LogBrowser {
    state: State,
    error: Option<String>,
    epoch: u64,
    group_pattern: Option<String>,
    groups: Vec<String>,
    cursor: usize,
    group: Option<String>,
    /// Rendered events as fetched; searches always run over this text.
    unfiltered: String,
    /// Pattern behind the text currently shown, if any.
    filter: Option<String>,
    viewport: Viewport,
    throbber: ThrobberState,
    list_state: ListState,
}

impl LogBrowser {
    pub fn new(group_pattern: Option<String>) -> Self {
        Self {
            state: State::LogGroupList,
            error: None,
            epoch: 0,
            group_pattern,
            groups: Vec::new(),
            cursor: 0,
            group: None,
            unfiltered: String::new(),
            filter: None,
            viewport: Viewport::default(),
            throbber: ThrobberState::default(),
            list_state: ListState::default(),
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn current_group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn unfiltered(&self) -> &str {
        &self.unfiltered
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    fn next_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    fn set_state(&mut self, state: State) {
        tracing::debug!(from = self.state.name(), to = state.name(), "Log browser transition");
        self.state = state;
    }

    fn leave_to(&mut self, state: State) {
        self.next_epoch();
        self.set_state(state);
    }

    fn load_groups(&mut self) -> Vec<Effect> {
        let epoch = self.next_epoch();
        self.set_state(State::Loading {
            step: LoadStep::Groups,
            return_to: Origin::GroupList,
        });
        vec![Effect::Logs(LogRequest::ListGroups {
            epoch,
            pattern: self.group_pattern.clone(),
        })]
    }

    fn fetch_group(&mut self, index: usize, return_to: Origin) -> Vec<Effect> {
        let Some(group) = self.groups.get(index).cloned() else {
            return vec![];
        };
        self.cursor = index;
        let epoch = self.next_epoch();
        tracing::debug!(group = %group, epoch, "Fetching log events");
        self.set_state(State::Loading {
            step: LoadStep::Events,
            return_to,
        });
        vec![Effect::Logs(LogRequest::FetchEvents { epoch, group })]
    }

    fn show_unfiltered(&mut self) {
        self.filter = None;
        self.viewport.set_content(&self.unfiltered);
        self.viewport.goto_bottom();
    }

    pub fn handle_response(&mut self, response: LogResponse) -> Vec<Effect> {
        if response.epoch() != self.epoch {
            tracing::debug!(
                epoch = response.epoch(),
                current = self.epoch,
                "Dropping stale log response"
            );
            return vec![];
        }
        let return_to = match self.state {
            State::Loading { return_to, .. } => return_to,
            _ => Origin::GroupList,
        };
        match response {
            LogResponse::Groups { result, .. } => {
                match result {
                    Ok(groups) => {
                        self.groups = groups;
                        self.cursor = 0;
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Listing log groups failed");
                        self.error = Some(err.to_string());
                    }
                }
                self.set_state(State::LogGroupList);
            }
            LogResponse::Events { group, result, .. } => match result {
                Ok(events) => {
                    tracing::debug!(group = %group, events = events.len(), "Log events loaded");
                    self.unfiltered = render_events(&events);
                    self.group = Some(group);
                    self.show_unfiltered();
                    self.set_state(State::LogStream);
                }
                Err(err) => {
                    tracing::warn!(group = %group, error = %err, "Fetching log events failed");
                    self.error = Some(err.to_string());
                    self.set_state(return_to.into());
                }
            },
            LogResponse::Search {
                pattern, result, ..
            } => {
                match result {
                    Ok(matches) => {
                        self.viewport.set_content(&matches);
                        self.viewport.goto_top();
                        self.filter = Some(pattern);
                    }
                    Err(err) => {
                        tracing::warn!(pattern = %pattern, error = %err, "Log search failed");
                        self.error = Some(err.to_string());
                    }
                }
                self.set_state(State::LogStream);
            }
        }
        vec![]
    }

    fn handle_group_list(&mut self, code: KeyCode) -> Vec<Effect> {
        match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.cursor + 1 < self.groups.len() {
                    self.cursor += 1;
                }
            }
            KeyCode::Enter => return self.fetch_group(self.cursor, Origin::GroupList),
            KeyCode::Char('r') => return self.load_groups(),
            KeyCode::Char('q') => return vec![Effect::BackToMenu],
            KeyCode::Char(c @ '1'..='9') => return self.fetch_group(digit_index(c), Origin::GroupList),
            _ => {}
        }
        vec![]
    }

    fn handle_stream(&mut self, event: &Event, code: KeyCode) -> Vec<Effect> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.leave_to(State::LogGroupList),
            KeyCode::Char('r') => return self.fetch_group(self.cursor, Origin::Stream),
            KeyCode::Char('/') => {
                let input = TextInput::with_value(self.filter.clone().unwrap_or_default());
                self.set_state(State::SearchInput(input));
            }
            KeyCode::Char('c') => self.show_unfiltered(),
            KeyCode::Char(c @ '1'..='9') => return self.fetch_group(digit_index(c), Origin::Stream),
            _ => {
                if let Some(key) = event.as_key_press_event() {
                    self.viewport.handle_key(&key);
                }
            }
        }
        vec![]
    }

    fn handle_search_input(&mut self, event: &Event, code: KeyCode) -> Vec<Effect> {
        let State::SearchInput(input) = &mut self.state else {
            return vec![];
        };
        match code {
            KeyCode::Enter => {
                let pattern = input.value().trim().to_string();
                if pattern.is_empty() {
                    self.show_unfiltered();
                    self.set_state(State::LogStream);
                    return vec![];
                }
                let epoch = self.next_epoch();
                tracing::debug!(pattern = %pattern, epoch, "Searching log buffer");
                self.set_state(State::Loading {
                    step: LoadStep::Search,
                    return_to: Origin::Stream,
                });
                vec![Effect::Logs(LogRequest::Search {
                    epoch,
                    pattern,
                    buffer: self.unfiltered.clone(),
                })]
            }
            KeyCode::Esc => {
                self.set_state(State::LogStream);
                vec![]
            }
            _ => {
                input.handle_event(event);
                vec![]
            }
        }
    }
}

fn digit_index(c: char) -> usize {
    c.to_digit(10).map_or(0, |d| d as usize - 1)
}

impl Browser for LogBrowser {
    fn start(&mut self) -> Vec<Effect> {
        self.error = None;
        self.group = None;
        self.unfiltered.clear();
        self.filter = None;
        self.viewport.set_content("");
        self.load_groups()
    }

    fn resize(&mut self, _width: u16, height: u16) {
        self.viewport
            .set_height(usize::from(height.saturating_sub(STREAM_CHROME)));
    }

    fn handle_event(&mut self, event: &Event) -> Vec<Effect> {
        let Some(key) = event.as_key_press_event() else {
            return vec![];
        };
        if self.error.is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                self.error = None;
            }
            return vec![];
        }
        match &self.state {
            State::LogGroupList => self.handle_group_list(key.code),
            State::Loading { return_to, .. } => {
                if key.code == KeyCode::Esc {
                    let return_to = *return_to;
                    self.leave_to(return_to.into());
                }
                vec![]
            }
            State::LogStream => self.handle_stream(event, key.code),
            State::SearchInput(_) => self.handle_search_input(event, key.code),
        }
    }

    fn tick(&mut self) {
        if matches!(self.state, State::Loading { .. }) {
            self.throbber.calc_next();
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        self.render_view(frame, area, theme);
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyEvent, KeyModifiers};
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;
    use crate::logs::store::fake::FakeLogStore;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn groups() -> FakeLogStore {
        FakeLogStore {
            pages: vec![
                vec!["/aws/lambda/dev-api".to_string(), "/aws/lambda/dev-worker".to_string()],
                vec!["/aws/lambda/dev-cron".to_string()],
            ],
            events: vec![
                LogEvent {
                    timestamp_ms: 1_700_000_000_000,
                    message: "START request\n".to_string(),
                },
                LogEvent {
                    timestamp_ms: 1_700_000_000_500,
                    message: "ERROR timeout".to_string(),
                },
                LogEvent {
                    timestamp_ms: 1_700_000_001_000,
                    message: "END request".to_string(),
                },
            ],
            ..FakeLogStore::default()
        }
    }

    struct Harness {
        browser: LogBrowser,
        store: FakeLogStore,
        tool: SearchTool,
    }

    impl Harness {
        fn new(store: FakeLogStore) -> Self {
            let mut browser = LogBrowser::new(Some("/aws/lambda/dev-".to_string()));
            browser.resize(80, 30);
            Self {
                browser,
                store,
                tool: SearchTool::from_program("grep"),
            }
        }

        async fn settle(&mut self, effects: Vec<Effect>) -> Vec<Effect> {
            let mut pending = effects;
            let mut rest = Vec::new();
            while let Some(effect) = pending.pop() {
                match effect {
                    Effect::Logs(request) => {
                        let response = request.run(&self.store, &self.tool).await;
                        pending.extend(self.browser.handle_response(response));
                    }
                    other => rest.push(other),
                }
            }
            rest
        }

        async fn press(&mut self, code: KeyCode) -> Vec<Effect> {
            let effects = self.browser.handle_event(&key(code));
            self.settle(effects).await
        }

        async fn started(store: FakeLogStore) -> Self {
            let mut h = Self::new(store);
            let effects = h.browser.start();
            h.settle(effects).await;
            h
        }

        async fn search(&mut self, pattern: &str) {
            self.press(KeyCode::Char('/')).await;
            if let State::SearchInput(input) = &mut self.browser.state {
                input.clear();
            }
            for c in pattern.chars() {
                self.press(KeyCode::Char(c)).await;
            }
            self.press(KeyCode::Enter).await;
        }
    }

    #[tokio::test]
    async fn start_lists_every_page_of_groups() {
        let h = Harness::started(groups()).await;
        assert_eq!(h.browser.state(), &State::LogGroupList);
        assert_eq!(
            h.browser.groups(),
            &["/aws/lambda/dev-api", "/aws/lambda/dev-worker", "/aws/lambda/dev-cron"]
        );
    }

    #[tokio::test]
    async fn selecting_group_shows_events_at_bottom() {
        let mut h = Harness::started(groups()).await;
        h.press(KeyCode::Enter).await;
        assert_eq!(h.browser.state(), &State::LogStream);
        assert_eq!(h.browser.current_group(), Some("/aws/lambda/dev-api"));
        assert_eq!(h.browser.viewport().line_count(), 3);
        assert!(h.browser.unfiltered().lines().next().unwrap().ends_with(" START request"));
    }

    #[tokio::test]
    async fn digit_jumps_to_group() {
        let mut h = Harness::started(groups()).await;
        h.press(KeyCode::Char('3')).await;
        assert_eq!(h.browser.current_group(), Some("/aws/lambda/dev-cron"));
        h.press(KeyCode::Char('2')).await;
        assert_eq!(h.browser.current_group(), Some("/aws/lambda/dev-worker"));
        assert_eq!(
            *h.store.event_requests.lock().unwrap(),
            vec!["/aws/lambda/dev-cron", "/aws/lambda/dev-worker"]
        );
    }

    #[tokio::test]
    async fn digit_past_the_end_does_nothing() {
        let mut h = Harness::started(groups()).await;
        let effects = h.browser.handle_event(&key(KeyCode::Char('9')));
        assert!(effects.is_empty());
        assert_eq!(h.browser.state(), &State::LogGroupList);
    }

    #[tokio::test]
    async fn late_events_after_leaving_are_dropped() {
        let mut h = Harness::started(groups()).await;
        let effects = h.browser.handle_event(&key(KeyCode::Enter));
        h.browser.handle_event(&key(KeyCode::Esc));
        h.settle(effects).await;
        assert_eq!(h.browser.state(), &State::LogGroupList);
        assert!(h.browser.current_group().is_none());
    }

    #[tokio::test]
    async fn fetch_failure_returns_to_group_list() {
        let mut store = groups();
        store.fail_events = true;
        let mut h = Harness::started(store).await;
        h.press(KeyCode::Enter).await;
        assert_eq!(h.browser.state(), &State::LogGroupList);
        assert!(h.browser.error().unwrap().contains("connection reset"));
        h.press(KeyCode::Esc).await;
        assert!(h.browser.error().is_none());
    }

    #[tokio::test]
    async fn search_filters_and_clear_restores() {
        let mut h = Harness::started(groups()).await;
        h.press(KeyCode::Enter).await;
        h.search("ERROR").await;
        assert_eq!(h.browser.state(), &State::LogStream);
        assert_eq!(h.browser.filter(), Some("ERROR"));
        assert_eq!(h.browser.viewport().line_count(), 1);
        assert_eq!(h.browser.viewport().offset(), 0);

        h.press(KeyCode::Char('c')).await;
        assert_eq!(h.browser.filter(), None);
        assert_eq!(h.browser.viewport().line_count(), 3);
        assert_eq!(h.store.event_requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn search_without_matches_is_empty_not_an_error() {
        let mut h = Harness::started(groups()).await;
        h.press(KeyCode::Enter).await;
        h.search("nothing-like-this").await;
        assert!(h.browser.error().is_none());
        assert_eq!(h.browser.viewport().line_count(), 0);

        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal
            .draw(|frame| h.browser.render(frame, frame.area(), &Theme::dark()))
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("No matching lines"));
        assert!(text.contains("search: nothing-like-this"));
    }

    #[tokio::test]
    async fn empty_pattern_clears_filter() {
        let mut h = Harness::started(groups()).await;
        h.press(KeyCode::Enter).await;
        h.search("ERROR").await;
        h.search("  ").await;
        assert_eq!(h.browser.filter(), None);
        assert_eq!(h.browser.viewport().line_count(), 3);
    }

    #[tokio::test]
    async fn missing_search_tool_shows_error() {
        let mut h = Harness::started(groups()).await;
        h.tool = SearchTool::from_program("cirrus-no-such-search-tool");
        h.press(KeyCode::Enter).await;
        h.search("ERROR").await;
        assert_eq!(h.browser.state(), &State::LogStream);
        assert!(h.browser.error().unwrap().contains("cirrus-no-such-search-tool"));
        assert_eq!(h.browser.viewport().line_count(), 3);
    }

    #[tokio::test]
    async fn q_on_group_list_goes_back_to_menu() {
        let mut h = Harness::started(groups()).await;
        let effects = h.press(KeyCode::Char('q')).await;
        assert!(matches!(effects.as_slice(), [Effect::BackToMenu]));
    }
}
