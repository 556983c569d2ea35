#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod board;
pub mod config;
pub mod csv;
pub mod data;
pub mod logging;
pub mod pages;
pub mod sheet;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
