pub mod commands;
pub mod config;
pub mod cookies;
pub mod logging;
pub mod repl;
pub mod robot;
