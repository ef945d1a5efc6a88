//! Client -> Server message parsing.

use serde::{Deserialize, Serialize};

use crate::{PlantType, ProtocolError};

/// Parsed client message.
///
/// An unrecognized `type` tag or a structurally invalid payload fails
/// to parse; the server drops such messages without closing the
/// connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Single-tile step. dx and dy must each be in {-1, 0, 1}.
    Move { dx: i32, dy: i32 },
    /// Plant at an absolute tile coordinate inside the sender's home.
    #[serde(rename_all = "camelCase")]
    Plant {
        x: i32,
        y: i32,
        plant_type: PlantType,
    },
    /// Remove the sender's own plant at a tile coordinate.
    Clear { x: i32, y: i32 },
    /// Liveness probe; `t` is echoed back verbatim in the pong.
    Ping { t: f64 },
    /// Accepted but currently inert (reserved for partial subscriptions).
    RequestViewport { x: i32, y: i32, w: i32, h: i32 },
}

impl ClientMessage {
    /// Parse a client message from raw message text.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}
