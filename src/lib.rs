//! Mailsight — IMAP inbox fetch + LLM analysis backend.

pub mod analysis;
pub mod config;
pub mod error;
pub mod imap;
pub mod record;
pub mod routes;
pub mod score;
