// Library target holds the whole module tree; the `rereadr` binary, the
// integration tests and the benches all link against it.

rust_i18n::i18n!("locales", fallback = "en");

pub mod api;
pub mod app;
pub mod config;
pub mod dispatch;
pub mod event;
pub mod review;
pub mod session;
pub mod ui;
