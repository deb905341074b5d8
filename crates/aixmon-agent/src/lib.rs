pub mod config;
pub mod error;
pub mod scrape;
pub mod server;
pub mod write;
