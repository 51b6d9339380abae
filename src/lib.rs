//! rudis: an in-memory key-value store speaking the Redis wire protocol.
//!
//! The server keeps all shared state — keyspace, command registry, client
//! registry, and lifecycle hooks — behind one process-wide reader-writer
//! lock. Connections are handled as independent tokio tasks feeding a
//! streaming protocol reader; expired keys are reclaimed both lazily on
//! access and actively by a background sampling engine.

pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod expire;
pub mod reader;
pub mod resp;
pub mod server;
pub mod store;

pub use config::Config;
pub use error::{RudisError, RudisResult};
pub use server::{run_server, Server};
