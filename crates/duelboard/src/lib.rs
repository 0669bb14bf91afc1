//! # Duelboard
//!
//! Room and turn-synchronization server for two-player board games.
//!
//! Clients connect over WebSocket, join a room by name, and exchange
//! moves. The server seats two players per room, validates whose turn it
//! is and that the target cell is free, keeps the authoritative board,
//! and broadcasts every accepted move to both seats.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use duelboard::prelude::*;
//!
//! # async fn start() -> Result<(), DuelboardError> {
//! let server = DuelboardServer::builder()
//!     .bind("0.0.0.0:6789")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{DEFAULT_BIND_ADDR, ServerConfig};
pub use error::DuelboardError;
pub use server::{DuelboardServer, DuelboardServerBuilder};

pub mod prelude {
    //! Everything needed to start a server or talk to one.

    pub use crate::{DuelboardError, DuelboardServer, DuelboardServerBuilder, ServerConfig};
    pub use duelboard_protocol::{
        Board, ClientEvent, Codec, JsonCodec, PlayerNames, Role, ServerEvent,
    };
    pub use duelboard_room::{DEFAULT_BOARD_SIZE, RoomConfig};
    pub use duelboard_transport::ConnectionId;
}
