//! `Tazq` identity service library.
//!
//! Email/password accounts, bearer sessions and one profile document per
//! uid, served over HTTP/JSON. Exposed as a library for tests and
//! embedding.

pub mod config;
pub mod server;
pub mod store;
