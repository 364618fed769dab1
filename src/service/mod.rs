//! The ping service and the gRPC server hosting it

pub mod config;
pub mod counter;
pub mod format;
pub mod ping;
pub mod server;

#[cfg(test)]
mod tests;

pub use config::ServerConfig;
pub use counter::SequenceCounter;
pub use format::reverse_string;
pub use ping::PingService;
pub use server::PingServer;
