pub mod app;
pub mod aws;
pub mod config;
pub mod dynamodb;
pub mod env;
pub mod error;
pub mod logging;
pub mod logs;
pub mod util;
pub mod widgets;
