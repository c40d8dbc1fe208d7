use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use tempfile::TempDir;

use super::*;
use crate::{
    dynamodb::{AttrValue, Operator, store::fake::FakeStore},
    env::ToastKind,
};

fn key(code: KeyCode) -> Event {
    Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

fn ctrl(c: char) -> Event {
    Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
}

fn item(pairs: &[(&str, &str)]) -> Item {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), AttrValue::S(value.to_string())))
        .collect()
}

fn orders() -> FakeStore {
    let mut store = FakeStore::with_items(
        "dev-orders",
        TableSchema::new("pk", Some("sk")),
        vec![
            item(&[("pk", "a"), ("sk", "1"), ("status", "open")]),
            item(&[("pk", "b"), ("sk", "1"), ("total", "12")]),
            item(&[("pk", "c"), ("sk", "2")]),
        ],
    );
    store.tables = vec![
        "dev-orders".to_string(),
        "prod-orders".to_string(),
        "dev-users".to_string(),
    ];
    store
}

struct Harness {
    browser: KvBrowser,
    store: FakeStore,
    _dir: TempDir,
    config: ConfigStore,
}

impl Harness {
    fn new(store: FakeStore) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigStore::at(dir.path().join("config.json"));
        let browser = KvBrowser::new(config.clone(), Preferences::default(), "dev-");
        Self {
            browser,
            store,
            _dir: dir,
            config,
        }
    }

    /// Runs every store request to completion and feeds the responses back,
    /// returning the effects that are not store requests.
    async fn settle(&mut self, effects: Vec<Effect>) -> Vec<Effect> {
        let mut pending = effects;
        let mut rest = Vec::new();
        while let Some(effect) = pending.pop() {
            match effect {
                Effect::Kv(request) => {
                    let response = request.run(&self.store).await;
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

    async fn type_str(&mut self, s: &str) {
        for c in s.chars() {
            self.press(KeyCode::Char(c)).await;
        }
    }

    async fn open_orders(&mut self) {
        let effects = self.browser.start();
        self.settle(effects).await;
        self.press(KeyCode::Enter).await;
    }
}

fn toast_kinds(effects: &[Effect]) -> Vec<ToastKind> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::ShowToast(toast) => Some(toast.kind),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn start_lists_tables_matching_prefix() {
    let mut h = Harness::new(orders());
    let effects = h.browser.start();
    assert!(matches!(h.browser.state(), State::Loading { step: LoadStep::Tables, .. }));
    h.settle(effects).await;
    assert!(matches!(h.browser.state(), State::TableList));
    assert_eq!(h.browser.tables(), &["dev-orders", "dev-users"]);
}

#[tokio::test]
async fn selecting_table_describes_then_scans() {
    let mut h = Harness::new(orders());
    h.open_orders().await;
    assert!(matches!(h.browser.state(), State::ItemList));
    assert_eq!(h.browser.current_table(), Some("dev-orders"));
    assert_eq!(h.browser.items().len(), 3);
    assert_eq!(
        h.browser.item_table().column_names(),
        vec!["pk", "sk", "status", "total"]
    );
    assert_eq!(h.browser.schemas().len(), 1);
}

#[tokio::test]
async fn cached_schema_skips_describe() {
    let mut h = Harness::new(orders());
    h.open_orders().await;
    h.press(KeyCode::Esc).await;
    assert!(matches!(h.browser.state(), State::TableList));
    let effects = h.browser.handle_event(&key(KeyCode::Enter));
    assert!(matches!(
        effects.as_slice(),
        [Effect::Kv(KvRequest::Scan { .. })]
    ));
}

#[tokio::test]
async fn cancelled_load_drops_late_response() {
    let mut h = Harness::new(orders());
    let effects = h.browser.start();
    h.settle(effects).await;
    let effects = h.browser.handle_event(&key(KeyCode::Enter));
    h.browser.handle_event(&key(KeyCode::Esc));
    assert!(matches!(h.browser.state(), State::TableList));
    // the describe answer arrives after the user backed out
    h.settle(effects).await;
    assert!(matches!(h.browser.state(), State::TableList));
    assert!(h.browser.schemas().is_empty());
    assert!(h.browser.error().is_none());
}

#[tokio::test]
async fn scan_failure_shows_overlay_until_acknowledged() {
    let mut store = orders();
    store.fail_scan = true;
    let mut h = Harness::new(store);
    h.open_orders().await;
    assert!(matches!(h.browser.state(), State::TableList));
    assert!(h.browser.error().unwrap().contains("scan refused"));

    h.press(KeyCode::Char('j')).await;
    assert!(h.browser.error().is_some());
    h.press(KeyCode::Enter).await;
    assert!(h.browser.error().is_none());
    assert!(matches!(h.browser.state(), State::TableList));
}

#[tokio::test]
async fn applied_filters_are_saved_and_sent_to_scan() {
    let mut h = Harness::new(orders());
    h.open_orders().await;
    h.press(KeyCode::Char('f')).await;
    h.type_str("status").await;
    h.press(KeyCode::Tab).await;
    h.type_str("==").await;
    h.press(KeyCode::Tab).await;
    h.type_str("open").await;
    h.press(KeyCode::Enter).await;
    let effects = h.browser.handle_event(&ctrl('s'));
    h.settle(effects).await;

    let expected = vec![FilterCondition::new("status", Operator::Equals, "open")];
    assert!(matches!(h.browser.state(), State::ItemList));
    assert_eq!(h.browser.active_filters(), expected.as_slice());
    let saved = h.config.load().unwrap();
    assert_eq!(saved.filter_conditions("dev-orders"), expected.as_slice());
    let scans = h.store.scans.lock().unwrap();
    let (_, filter) = scans.last().unwrap();
    assert_eq!(filter.as_ref(), ScanFilter::from_conditions(&expected).as_ref());
}

#[tokio::test]
async fn saved_filters_apply_when_table_is_opened() {
    let mut h = Harness::new(orders());
    let mut prefs = Preferences::default();
    prefs.set_filter_conditions(
        "dev-orders",
        vec![FilterCondition::new("pk", Operator::StartsWith, "a")],
    );
    h.browser = KvBrowser::new(h.config.clone(), prefs, "dev-");
    h.open_orders().await;
    assert_eq!(h.browser.active_filters().len(), 1);
    let scans = h.store.scans.lock().unwrap();
    assert!(scans.last().unwrap().1.is_some());
}

#[tokio::test]
async fn clearing_filters_reloads_unfiltered() {
    let mut h = Harness::new(orders());
    h.open_orders().await;
    h.press(KeyCode::Char('f')).await;
    let effects = h.browser.handle_event(&ctrl('x'));
    h.settle(effects).await;
    assert!(h.browser.active_filters().is_empty());
    assert!(h.store.scans.lock().unwrap().last().unwrap().1.is_none());
    assert!(h.config.load().unwrap().filter_conditions("dev-orders").is_empty());
}

#[tokio::test]
async fn cancelled_filter_editor_keeps_active_filters() {
    let mut h = Harness::new(orders());
    h.open_orders().await;
    h.press(KeyCode::Char('f')).await;
    h.type_str("status").await;
    let effects = h.press(KeyCode::Esc).await;
    assert!(effects.is_empty());
    assert!(matches!(h.browser.state(), State::ItemList));
    assert!(h.browser.active_filters().is_empty());
}

#[tokio::test]
async fn saving_columns_rebuilds_table() {
    let mut h = Harness::new(orders());
    h.open_orders().await;
    h.press(KeyCode::Char('c')).await;
    // uncheck "sk" and "status"
    h.press(KeyCode::Down).await;
    h.press(KeyCode::Char(' ')).await;
    h.press(KeyCode::Down).await;
    h.press(KeyCode::Char(' ')).await;
    let effects = h.press(KeyCode::Char('s')).await;

    assert_eq!(toast_kinds(&effects), vec![ToastKind::Success]);
    assert!(matches!(h.browser.state(), State::ItemList));
    assert_eq!(h.browser.item_table().column_names(), vec!["pk", "total"]);
    let saved = h.config.load().unwrap();
    assert_eq!(
        saved.table_columns("dev-orders"),
        Some(["pk".to_string(), "total".to_string()].as_slice())
    );
}

#[tokio::test]
async fn failed_save_keeps_editor_open() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();
    let mut h = Harness::new(orders());
    h.browser = KvBrowser::new(
        ConfigStore::at(blocker.join("config.json")),
        Preferences::default(),
        "dev-",
    );
    h.open_orders().await;
    h.press(KeyCode::Char('c')).await;
    let effects = h.press(KeyCode::Char('s')).await;
    assert_eq!(toast_kinds(&effects), vec![ToastKind::Error]);
    assert!(matches!(h.browser.state(), State::ColumnFilter(_)));
    assert_eq!(h.browser.preferences(), &Preferences::default());
}

#[tokio::test]
async fn deleting_an_item_reloads_the_list() {
    let mut h = Harness::new(orders());
    h.open_orders().await;
    h.press(KeyCode::Enter).await;
    assert!(matches!(h.browser.state(), State::ItemDetail));
    h.press(KeyCode::Char('d')).await;
    assert!(matches!(
        h.browser.state(),
        State::DeleteConfirm(DeleteTarget::Item { .. })
    ));
    let effects = h.press(KeyCode::Char('y')).await;

    assert_eq!(toast_kinds(&effects), vec![ToastKind::Success]);
    assert!(matches!(h.browser.state(), State::ItemList));
    assert_eq!(h.browser.items().len(), 2);
}

#[tokio::test]
async fn declining_delete_returns_to_detail() {
    let mut h = Harness::new(orders());
    h.open_orders().await;
    h.press(KeyCode::Enter).await;
    h.press(KeyCode::Char('d')).await;
    h.press(KeyCode::Char('n')).await;
    assert!(matches!(h.browser.state(), State::ItemDetail));
    assert_eq!(h.browser.items().len(), 3);
}

#[tokio::test]
async fn item_without_key_cannot_be_deleted() {
    let store = FakeStore::with_items(
        "dev-orders",
        TableSchema::new("pk", Some("sk")),
        vec![item(&[("pk", "a")])],
    );
    let mut h = Harness::new(store);
    h.open_orders().await;
    h.press(KeyCode::Enter).await;
    h.press(KeyCode::Char('d')).await;
    assert_eq!(h.browser.error(), Some("Item is missing sk"));
    assert!(matches!(h.browser.state(), State::ItemDetail));
}

#[tokio::test]
async fn emptying_table_requires_exact_name() {
    let mut h = Harness::new(orders());
    h.open_orders().await;
    h.press(KeyCode::Char('e')).await;
    h.type_str("dev-order").await;
    h.press(KeyCode::Enter).await;
    match h.browser.state() {
        State::DeleteConfirm(DeleteTarget::Table { typed }) => assert!(typed.is_empty()),
        other => panic!("unexpected state {other:?}"),
    }
    assert!(h.store.batch_sizes().is_empty());

    h.type_str("dev-orders").await;
    let effects = h.press(KeyCode::Enter).await;
    assert_eq!(toast_kinds(&effects), vec![ToastKind::Success]);
    assert!(matches!(h.browser.state(), State::TableList));
    assert_eq!(h.store.batch_sizes(), vec![3]);
}

#[tokio::test]
async fn partial_empty_reports_deleted_count() {
    let mut store = orders();
    store.fail_batch = Some(1);
    let mut h = Harness::new(store);
    h.open_orders().await;
    h.press(KeyCode::Char('e')).await;
    h.type_str("dev-orders").await;
    h.press(KeyCode::Enter).await;
    assert!(matches!(h.browser.state(), State::TableList));
    assert!(h.browser.error().unwrap().starts_with("Deleted 0 items before failing"));
}

#[tokio::test]
async fn q_on_table_list_goes_back_to_menu() {
    let mut h = Harness::new(orders());
    let effects = h.browser.start();
    h.settle(effects).await;
    let effects = h.press(KeyCode::Char('q')).await;
    assert!(matches!(effects.as_slice(), [Effect::BackToMenu]));
}

#[tokio::test]
async fn cursor_stays_within_table_list() {
    let mut h = Harness::new(orders());
    let effects = h.browser.start();
    h.settle(effects).await;
    for _ in 0..5 {
        h.press(KeyCode::Down).await;
    }
    h.press(KeyCode::Enter).await;
    assert_eq!(h.browser.current_table(), Some("dev-users"));
}
