pub mod backend;
pub mod calculator;
pub mod config;
pub mod key_dispatcher;
pub mod logging;
pub mod ui;
