//! `Tazq`: task manager with local storage and remote sign-in.

pub mod app;
pub mod auth;
pub mod config;
pub mod identity;
pub mod store;
pub mod tasks;
