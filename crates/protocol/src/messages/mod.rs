//! Message definitions for the tile-garden wire protocol.
//!
//! This module contains both client->server and server->client message
//! types. Both directions use the same envelope: a JSON object with a
//! `type` tag and a `payload` object.

mod client;
mod server;

pub use client::*;
pub use server::*;
