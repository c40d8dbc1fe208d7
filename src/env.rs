use std::{sync::Arc, time::Duration};

use crossterm::event::Event;
use tokio::{
    sync::mpsc::{UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

use crate::{
    dynamodb::KvStore,
    logs::{LogStore, SearchTool},
    widgets::{
        kv::{KvRequest, KvResponse},
        logs::{LogRequest, LogResponse},
    },
};

/// How long a toast stays on screen.
pub const TOAST_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
}

impl Toast {
    pub fn new(message: impl Into<String>, kind: ToastKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, ToastKind::Info)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, ToastKind::Success)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, ToastKind::Warning)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, ToastKind::Error)
    }
}

/// Everything the event loop consumes, one at a time.
#[derive(Debug)]
pub enum Message {
    Input(Event),
    Kv(KvResponse),
    Logs(LogResponse),
    ToastExpired { generation: u64 },
}

/// Work requested by a state transition. Each asynchronous effect posts
/// exactly one [`Message`] back when it completes.
#[derive(Debug)]
pub enum Effect {
    Kv(KvRequest),
    Logs(LogRequest),
    ShowToast(Toast),
    BackToMenu,
    ExpireToast { generation: u64, after: Duration },
    Quit,
}

pub struct Env {
    tx: UnboundedSender<Message>,
    rx: UnboundedReceiver<Message>,
    kv_store: Arc<dyn KvStore>,
    log_store: Arc<dyn LogStore>,
    search_tool: Arc<SearchTool>,
    toast_timer: Option<JoinHandle<()>>,
}

impl Env {
    pub fn new(
        kv_store: Arc<dyn KvStore>,
        log_store: Arc<dyn LogStore>,
        search_tool: SearchTool,
    ) -> Self {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Message>();
        Env {
            tx,
            rx,
            kv_store,
            log_store,
            search_tool: Arc::new(search_tool),
            toast_timer: None,
        }
    }

    pub fn rx(&mut self) -> &mut UnboundedReceiver<Message> {
        &mut self.rx
    }

    /// Start the work behind `effect`. Effects that only concern the
    /// coordinator itself are ignored here.
    pub fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Kv(request) => {
                let store = self.kv_store.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let response = request.run(store.as_ref()).await;
                    let _ = tx.send(Message::Kv(response));
                });
            }
            Effect::Logs(request) => {
                let store = self.log_store.clone();
                let tool = self.search_tool.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let response = request.run(store.as_ref(), tool.as_ref()).await;
                    let _ = tx.send(Message::Logs(response));
                });
            }
            Effect::ExpireToast { generation, after } => {
                if let Some(previous) = self.toast_timer.take() {
                    previous.abort();
                }
                let tx = self.tx.clone();
                self.toast_timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(Message::ToastExpired { generation });
                }));
            }
            Effect::ShowToast(_) | Effect::BackToMenu | Effect::Quit => {
                tracing::debug!(?effect, "Effect handled by the coordinator");
            }
        }
    }
}
