//! One module per command; `ui` holds the shared terminal helpers.

pub mod catalog;
pub mod classify;
pub mod fetch;
pub mod import;
pub mod parse;
pub mod pipeline;
pub mod scrape;
pub mod setup;
pub mod status;
pub mod ui;
