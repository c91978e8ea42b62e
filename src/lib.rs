pub mod app;
pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod i18n;
pub mod middleware;
pub mod modules;
pub mod services;
pub mod telemetry;
