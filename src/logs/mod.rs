pub mod search;
pub mod store;

pub use search::{SearchError, SearchTool};
pub use store::{CloudWatchStore, LogEvent, LogStore, TimeWindow};
