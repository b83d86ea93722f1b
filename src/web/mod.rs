//! Companion catalog server

mod handlers;
pub mod server;

pub use server::{router, serve, serve_on};
