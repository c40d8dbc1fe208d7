mod editors;
mod view;

#[cfg(test)]
mod tests;

use crossterm::event::{Event, KeyCode};
use ratatui::{
    Frame,
    layout::Rect,
    widgets::{ListState, TableState},
};
use throbber_widgets_tui::ThrobberState;

pub use editors::{ColumnEditor, ColumnOutcome, FilterEditor, FilterOutcome};

use super::{Browser, input::TextInput, theme::Theme};
use crate::{
    config::{ConfigError, ConfigStore, Preferences},
    dynamodb::{
        BulkDeleteOutcome, FilterCondition, Item, ItemTable, Key, KvStore, ScanFilter,
        SchemaCache, TableSchema, build_item_table, format::format_compact,
        store::empty_table,
    },
    env::{Effect, Toast},
    error::StoreError,
};

/// One store call issued by the browser, tagged with the epoch it was
/// issued under.
#[derive(Debug)]
pub enum KvRequest {
    ListTables {
        epoch: u64,
    },
    DescribeTable {
        epoch: u64,
        table: String,
    },
    Scan {
        epoch: u64,
        table: String,
        filter: Option<ScanFilter>,
    },
    DeleteItem {
        epoch: u64,
        table: String,
        key: Key,
    },
    EmptyTable {
        epoch: u64,
        table: String,
        schema: TableSchema,
    },
}

impl KvRequest {
    pub async fn run(self, store: &dyn KvStore) -> KvResponse {
        match self {
            KvRequest::ListTables { epoch } => KvResponse::Tables {
                epoch,
                result: store.list_tables().await,
            },
            KvRequest::DescribeTable { epoch, table } => {
                let result = store.describe_table(&table).await;
                KvResponse::Schema {
                    epoch,
                    table,
                    result,
                }
            }
            KvRequest::Scan {
                epoch,
                table,
                filter,
            } => {
                let result = store.scan(&table, filter.as_ref()).await;
                KvResponse::Items {
                    epoch,
                    table,
                    result,
                }
            }
            KvRequest::DeleteItem { epoch, table, key } => {
                let result = store.delete_item(&table, &key).await;
                KvResponse::ItemDeleted {
                    epoch,
                    table,
                    result,
                }
            }
            KvRequest::EmptyTable {
                epoch,
                table,
                schema,
            } => {
                let outcome = empty_table(store, &table, &schema).await;
                KvResponse::TableEmptied {
                    epoch,
                    table,
                    outcome,
                }
            }
        }
    }
}

#[derive(Debug)]
pub enum KvResponse {
    Tables {
        epoch: u64,
        result: Result<Vec<String>, StoreError>,
    },
    Schema {
        epoch: u64,
        table: String,
        result: Result<TableSchema, StoreError>,
    },
    Items {
        epoch: u64,
        table: String,
        result: Result<Vec<Item>, StoreError>,
    },
    ItemDeleted {
        epoch: u64,
        table: String,
        result: Result<(), StoreError>,
    },
    TableEmptied {
        epoch: u64,
        table: String,
        outcome: BulkDeleteOutcome,
    },
}

impl KvResponse {
    pub fn epoch(&self) -> u64 {
        match self {
            KvResponse::Tables { epoch, .. }
            | KvResponse::Schema { epoch, .. }
            | KvResponse::Items { epoch, .. }
            | KvResponse::ItemDeleted { epoch, .. }
            | KvResponse::TableEmptied { epoch, .. } => *epoch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStep {
    Tables,
    Schema,
    Items,
}

/// Where a cancelled or failed load lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    TableList,
    ItemList,
}

impl From<Origin> for State {
    fn from(origin: Origin) -> Self {
        match origin {
            Origin::TableList => State::TableList,
            Origin::ItemList => State::ItemList,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DeleteTarget {
    /// One item, answered with y/n.
    Item { key: Key, summary: String },
    /// Every item in the table, confirmed by typing the table name.
    Table { typed: TextInput },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteScope {
    Item,
    Table,
}

#[derive(Debug, Clone)]
pub enum State {
    TableList,
    Loading { step: LoadStep, return_to: Origin },
    ItemList,
    ItemDetail,
    ColumnFilter(ColumnEditor),
    ItemFilter(FilterEditor),
    DeleteConfirm(DeleteTarget),
    Deleting(DeleteScope),
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::TableList => "TableList",
            State::Loading { .. } => "Loading",
            State::ItemList => "ItemList",
            State::ItemDetail => "ItemDetail",
            State::ColumnFilter(_) => "ColumnFilter",
            State::ItemFilter(_) => "ItemFilter",
            State::DeleteConfirm(_) => "DeleteConfirm",
            State::Deleting(_) => "Deleting",
        }
    }
}

/// Table and item browser for the key-value store.
pub struct KvBrowser {
    state: State,
    error: Option<String>,
    epoch: u64,
    table_prefix: String,
    tables: Vec<String>,
    table_cursor: usize,
    table: Option<String>,
    schemas: SchemaCache,
    items: Vec<Item>,
    item_table: ItemTable,
    item_cursor: usize,
    detail_scroll: u16,
    active_filters: Vec<FilterCondition>,
    config: ConfigStore,
    preferences: Preferences,
    throbber: ThrobberState,
    list_state: ListState,
    item_state: TableState,
    height: u16,
}

impl KvBrowser {
    pub fn new(config: ConfigStore, preferences: Preferences, table_prefix: impl Into<String>) -> Self {
        Self {
            state: State::TableList,
            error: None,
            epoch: 0,
            table_prefix: table_prefix.into(),
            tables: Vec::new(),
            table_cursor: 0,
            table: None,
            schemas: SchemaCache::default(),
            items: Vec::new(),
            item_table: ItemTable::default(),
            item_cursor: 0,
            detail_scroll: 0,
            active_filters: Vec::new(),
            config,
            preferences,
            throbber: ThrobberState::default(),
            list_state: ListState::default(),
            item_state: TableState::default(),
            height: 0,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn current_table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item_table(&self) -> &ItemTable {
        &self.item_table
    }

    pub fn active_filters(&self) -> &[FilterCondition] {
        &self.active_filters
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn schemas(&self) -> &SchemaCache {
        &self.schemas
    }

    fn next_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    fn set_state(&mut self, state: State) {
        tracing::debug!(from = self.state.name(), to = state.name(), "Key-value browser transition");
        self.state = state;
    }

    fn current_schema(&self) -> Option<&TableSchema> {
        self.table.as_deref().and_then(|table| self.schemas.get(table))
    }

    /// Rows moved by a page key: the screen minus header, footer and borders.
    fn page_size(&self) -> usize {
        usize::from(self.height.saturating_sub(8)).max(1)
    }

    fn selected_item(&self) -> Option<&Item> {
        self.items.get(self.item_cursor)
    }

    fn load_tables(&mut self) -> Vec<Effect> {
        let epoch = self.next_epoch();
        self.set_state(State::Loading {
            step: LoadStep::Tables,
            return_to: Origin::TableList,
        });
        vec![Effect::Kv(KvRequest::ListTables { epoch })]
    }

    /// Scans the current table with the active filters.
    fn load_items(&mut self, return_to: Origin) -> Vec<Effect> {
        let Some(table) = self.table.clone() else {
            return vec![];
        };
        let epoch = self.next_epoch();
        let filter = ScanFilter::from_conditions(&self.active_filters);
        tracing::debug!(table = %table, epoch, filters = self.active_filters.len(), "Scanning table");
        self.set_state(State::Loading {
            step: LoadStep::Items,
            return_to,
        });
        vec![Effect::Kv(KvRequest::Scan {
            epoch,
            table,
            filter,
        })]
    }

    fn select_table(&mut self) -> Vec<Effect> {
        let Some(table) = self.tables.get(self.table_cursor).cloned() else {
            return vec![];
        };
        self.active_filters = self.preferences.filter_conditions(&table).to_vec();
        self.items.clear();
        self.item_table = ItemTable::default();
        self.item_cursor = 0;
        self.table = Some(table.clone());
        if self.schemas.get(&table).is_some() {
            return self.load_items(Origin::TableList);
        }
        let epoch = self.next_epoch();
        self.set_state(State::Loading {
            step: LoadStep::Schema,
            return_to: Origin::TableList,
        });
        vec![Effect::Kv(KvRequest::DescribeTable { epoch, table })]
    }

    fn rebuild_table(&mut self) {
        let Some(table) = self.table.as_deref() else {
            return;
        };
        let Some(schema) = self.schemas.get(table) else {
            return;
        };
        self.item_table =
            build_item_table(schema, &self.items, self.preferences.table_columns(table));
    }

    /// Saves a modified copy of the preferences; the in-memory copy only
    /// changes when the write succeeds.
    fn persist(&mut self, update: impl FnOnce(&mut Preferences)) -> Result<(), ConfigError> {
        let mut next = self.preferences.clone();
        update(&mut next);
        self.config.save(&next)?;
        self.preferences = next;
        Ok(())
    }

    fn leave_to(&mut self, state: State) {
        self.next_epoch();
        self.set_state(state);
    }

    pub fn handle_response(&mut self, response: KvResponse) -> Vec<Effect> {
        if response.epoch() != self.epoch {
            tracing::debug!(
                epoch = response.epoch(),
                current = self.epoch,
                "Dropping stale key-value response"
            );
            return vec![];
        }
        match response {
            KvResponse::Tables { result, .. } => {
                match result {
                    Ok(tables) => {
                        self.tables = tables
                            .into_iter()
                            .filter(|name| name.starts_with(&self.table_prefix))
                            .collect();
                        self.table_cursor = 0;
                        tracing::debug!(count = self.tables.len(), "Tables loaded");
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Listing tables failed");
                        self.error = Some(err.to_string());
                    }
                }
                self.set_state(State::TableList);
                vec![]
            }
            KvResponse::Schema { table, result, .. } => match result {
                Ok(schema) => {
                    self.schemas.insert(&table, schema);
                    self.load_items(Origin::TableList)
                }
                Err(err) => {
                    tracing::warn!(table = %table, error = %err, "Describing table failed");
                    self.error = Some(err.to_string());
                    self.set_state(State::TableList);
                    vec![]
                }
            },
            KvResponse::Items { table, result, .. } => {
                let return_to = match self.state {
                    State::Loading { return_to, .. } => return_to,
                    _ => Origin::ItemList,
                };
                match result {
                    Ok(items) => {
                        tracing::debug!(table = %table, count = items.len(), "Items loaded");
                        self.items = items;
                        self.item_cursor = 0;
                        self.rebuild_table();
                        self.set_state(State::ItemList);
                    }
                    Err(err) => {
                        tracing::warn!(table = %table, error = %err, "Scan failed");
                        self.error = Some(err.to_string());
                        self.set_state(return_to.into());
                    }
                }
                vec![]
            }
            KvResponse::ItemDeleted { table, result, .. } => match result {
                Ok(()) => {
                    tracing::info!(table = %table, "Item deleted");
                    let mut effects = vec![Effect::ShowToast(Toast::success("Item deleted"))];
                    effects.extend(self.load_items(Origin::ItemList));
                    effects
                }
                Err(err) => {
                    tracing::warn!(table = %table, error = %err, "Item delete failed");
                    self.error = Some(err.to_string());
                    self.set_state(State::ItemDetail);
                    vec![]
                }
            },
            KvResponse::TableEmptied { table, outcome, .. } => {
                self.items.clear();
                self.item_table = ItemTable::default();
                self.item_cursor = 0;
                self.set_state(State::TableList);
                match outcome.error {
                    None => {
                        tracing::info!(table = %table, deleted = outcome.deleted, "Table emptied");
                        vec![Effect::ShowToast(Toast::success(format!(
                            "Deleted {} items from {table}",
                            outcome.deleted
                        )))]
                    }
                    Some(err) => {
                        tracing::warn!(
                            table = %table,
                            deleted = outcome.deleted,
                            error = %err,
                            "Emptying table stopped"
                        );
                        self.error = Some(format!(
                            "Deleted {} items before failing: {err}",
                            outcome.deleted
                        ));
                        vec![]
                    }
                }
            }
        }
    }

    fn handle_table_list(&mut self, code: KeyCode) -> Vec<Effect> {
        match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.table_cursor = self.table_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.table_cursor + 1 < self.tables.len() {
                    self.table_cursor += 1;
                }
            }
            KeyCode::Enter => return self.select_table(),
            KeyCode::Char('r') => return self.load_tables(),
            KeyCode::Char('q') => return vec![Effect::BackToMenu],
            _ => {}
        }
        vec![]
    }

    fn handle_item_list(&mut self, code: KeyCode) -> Vec<Effect> {
        match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.item_cursor = self.item_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.item_cursor + 1 < self.items.len() {
                    self.item_cursor += 1;
                }
            }
            KeyCode::PageUp => {
                self.item_cursor = self.item_cursor.saturating_sub(self.page_size());
            }
            KeyCode::PageDown => {
                self.item_cursor =
                    (self.item_cursor + self.page_size()).min(self.items.len().saturating_sub(1));
            }
            KeyCode::Enter => {
                if self.selected_item().is_some() {
                    self.detail_scroll = 0;
                    self.set_state(State::ItemDetail);
                }
            }
            KeyCode::Char('f') => {
                let editor = FilterEditor::new(self.active_filters.clone());
                self.set_state(State::ItemFilter(editor));
            }
            KeyCode::Char('c') => {
                let saved = self
                    .table
                    .as_deref()
                    .and_then(|table| self.preferences.table_columns(table));
                let editor = ColumnEditor::new(self.item_table.all_columns.clone(), saved);
                self.set_state(State::ColumnFilter(editor));
            }
            KeyCode::Char('r') => return self.load_items(Origin::ItemList),
            KeyCode::Char('e') => {
                self.set_state(State::DeleteConfirm(DeleteTarget::Table {
                    typed: TextInput::default(),
                }));
            }
            KeyCode::Char('q') | KeyCode::Esc => self.leave_to(State::TableList),
            _ => {}
        }
        vec![]
    }

    fn handle_item_detail(&mut self, code: KeyCode) -> Vec<Effect> {
        match code {
            KeyCode::Char('d') | KeyCode::Delete => {
                let (Some(schema), Some(item)) = (self.current_schema(), self.selected_item())
                else {
                    return vec![];
                };
                match schema.key_for(item) {
                    Ok(key) => {
                        let summary = key
                            .iter()
                            .map(|(name, value)| format!("{name} = {}", format_compact(value)))
                            .collect::<Vec<_>>()
                            .join(", ");
                        self.set_state(State::DeleteConfirm(DeleteTarget::Item { key, summary }));
                    }
                    Err(err) => self.error = Some(err),
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.detail_scroll = self.detail_scroll.saturating_add(1);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.detail_scroll = self.detail_scroll.saturating_sub(1);
            }
            KeyCode::Esc | KeyCode::Char('q') => self.set_state(State::ItemList),
            _ => {}
        }
        vec![]
    }

    fn handle_delete_confirm(&mut self, event: &Event, code: KeyCode) -> Vec<Effect> {
        let Some(table) = self.table.clone() else {
            return vec![];
        };
        let State::DeleteConfirm(target) = &mut self.state else {
            return vec![];
        };
        match target {
            DeleteTarget::Item { key, .. } => match code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    let key = key.clone();
                    let epoch = self.next_epoch();
                    self.set_state(State::Deleting(DeleteScope::Item));
                    vec![Effect::Kv(KvRequest::DeleteItem { epoch, table, key })]
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.set_state(State::ItemDetail);
                    vec![]
                }
                _ => vec![],
            },
            DeleteTarget::Table { typed } => match code {
                KeyCode::Enter => {
                    if typed.value() != table {
                        typed.clear();
                        return vec![];
                    }
                    let Some(schema) = self.schemas.get(&table).cloned() else {
                        self.error = Some(StoreError::MissingKeySchema(table).to_string());
                        self.set_state(State::ItemList);
                        return vec![];
                    };
                    let epoch = self.next_epoch();
                    tracing::info!(table = %table, "Emptying table");
                    self.set_state(State::Deleting(DeleteScope::Table));
                    vec![Effect::Kv(KvRequest::EmptyTable {
                        epoch,
                        table,
                        schema,
                    })]
                }
                KeyCode::Esc => {
                    self.set_state(State::ItemList);
                    vec![]
                }
                _ => {
                    typed.handle_event(event);
                    vec![]
                }
            },
        }
    }

    fn handle_column_filter(&mut self, event: &Event) -> Vec<Effect> {
        let State::ColumnFilter(editor) = &mut self.state else {
            return vec![];
        };
        match editor.handle_event(event) {
            ColumnOutcome::Continue => vec![],
            ColumnOutcome::Cancel => {
                self.set_state(State::ItemList);
                vec![]
            }
            ColumnOutcome::Save(columns) => {
                let Some(table) = self.table.clone() else {
                    return vec![];
                };
                match self.persist(|prefs| prefs.set_table_columns(&table, columns)) {
                    Ok(()) => {
                        self.rebuild_table();
                        self.set_state(State::ItemList);
                        vec![Effect::ShowToast(Toast::success("Column preferences saved"))]
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Saving column preferences failed");
                        vec![Effect::ShowToast(Toast::error(err.to_string()))]
                    }
                }
            }
        }
    }

    fn handle_item_filter(&mut self, event: &Event) -> Vec<Effect> {
        let State::ItemFilter(editor) = &mut self.state else {
            return vec![];
        };
        let conditions = match editor.handle_event(event) {
            FilterOutcome::Continue => return vec![],
            FilterOutcome::Cancel => {
                self.set_state(State::ItemList);
                return vec![];
            }
            FilterOutcome::Apply(conditions) => conditions,
            FilterOutcome::Clear => Vec::new(),
        };
        let Some(table) = self.table.clone() else {
            return vec![];
        };
        let saved = conditions.clone();
        match self.persist(|prefs| prefs.set_filter_conditions(&table, saved)) {
            Ok(()) => {
                self.active_filters = conditions;
                self.load_items(Origin::ItemList)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Saving filter preferences failed");
                vec![Effect::ShowToast(Toast::error(err.to_string()))]
            }
        }
    }
}

impl Browser for KvBrowser {
    fn start(&mut self) -> Vec<Effect> {
        self.error = None;
        self.table = None;
        self.items.clear();
        self.item_table = ItemTable::default();
        self.active_filters.clear();
        self.load_tables()
    }

    fn resize(&mut self, _width: u16, height: u16) {
        self.height = height;
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
            State::TableList => self.handle_table_list(key.code),
            State::Loading { return_to, .. } => {
                if key.code == KeyCode::Esc {
                    let return_to = *return_to;
                    self.leave_to(return_to.into());
                }
                vec![]
            }
            State::ItemList => self.handle_item_list(key.code),
            State::ItemDetail => self.handle_item_detail(key.code),
            State::ColumnFilter(_) => self.handle_column_filter(event),
            State::ItemFilter(_) => self.handle_item_filter(event),
            State::DeleteConfirm(_) => self.handle_delete_confirm(event, key.code),
            State::Deleting(_) => vec![],
        }
    }

    fn tick(&mut self) {
        if matches!(self.state, State::Loading { .. } | State::Deleting(_)) {
            self.throbber.calc_next();
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        self.render_view(frame, area, theme);
    }
}
