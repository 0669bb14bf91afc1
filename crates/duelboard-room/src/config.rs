//! Room configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Board dimension used when nothing else is configured.
pub const DEFAULT_BOARD_SIZE: usize = 10;

/// Settings shared by every room a [`RoomManager`](crate::RoomManager)
/// creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Rows and columns of the square board.
    pub board_size: usize,

    /// Rooms with no join or accepted move for this long are removed by
    /// [`RoomManager::reap_idle`](crate::RoomManager::reap_idle).
    /// `None` keeps rooms until their last seat leaves.
    pub idle_timeout: Option<Duration>,

    /// Upper bound on concurrently open rooms. Joins that would create a
    /// room beyond it are refused. `None` means unlimited.
    pub max_rooms: Option<usize>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            board_size: DEFAULT_BOARD_SIZE,
            idle_timeout: Some(Duration::from_secs(30 * 60)),
            max_rooms: Some(10_000),
        }
    }
}
