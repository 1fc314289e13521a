//! Web Module - HTTP API over the query engine

pub mod server;

pub use server::{build_router, start_server, AppState};
