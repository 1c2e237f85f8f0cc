//! CLI command implementations.

mod ask;
mod cache;
mod chat;
mod chunks;
mod config;
mod search;
mod serve;

pub use ask::run_ask;
pub use cache::run_cache;
pub use chat::run_chat;
pub use chunks::run_chunks;
pub use config::run_config;
pub use search::run_search;
pub use serve::run_serve;
