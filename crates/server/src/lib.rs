//! Tile-garden synchronization server library.

pub mod config;
pub mod rate;
pub mod server;
pub mod world;

// Re-export commonly used types
pub use config::Config;
pub use server::game::GameState;
pub use server::{run, Broadcaster, Frame, Outbound, Recipient};
