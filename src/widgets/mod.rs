use crossterm::event::Event;
use ratatui::{Frame, layout::Rect};

use crate::env::Effect;

pub mod confirm;
pub mod error;
pub mod help;
pub mod input;
pub mod kv;
pub mod logs;
pub mod theme;
pub mod viewport;

pub use kv::KvBrowser;
pub use logs::LogBrowser;
use theme::Theme;

/// A service view driven by the root coordinator. Every input is accepted in
/// every state; keys with no meaning in the current state do nothing.
pub trait Browser {
    /// Reset to the first screen and return the initial fetch.
    fn start(&mut self) -> Vec<Effect>;

    fn resize(&mut self, width: u16, height: u16);

    fn handle_event(&mut self, event: &Event) -> Vec<Effect>;

    /// Advance loading animations; called once per frame.
    fn tick(&mut self) {}

    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme);
}
