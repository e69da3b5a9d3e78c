//! Web interface.
//!
//! HTML pages for managing tasks, a small JSON action API used by the page
//! scripts, and a read-only JSON API under `/api`.

mod server;
pub mod templates;

pub use server::{AppState, ServerHandle, build_router, html_escape, start_server};
