//! Server configuration and environment overrides.

use std::str::FromStr;
use std::time::Duration;

use duelboard_room::RoomConfig;
use serde::{Deserialize, Serialize};

use crate::DuelboardError;

/// Address used when `DUELBOARD_BIND` is not set.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:6789";

/// Everything needed to start a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// Settings applied to every room.
    pub room: RoomConfig,

    /// How often idle rooms are swept. Only used when
    /// `room.idle_timeout` is set.
    pub reap_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            room: RoomConfig::default(),
            reap_interval: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    /// Builds a config from the process environment.
    ///
    /// | Variable | Meaning |
    /// |---|---|
    /// | `DUELBOARD_BIND` | listen address |
    /// | `DUELBOARD_BOARD_SIZE` | board rows/columns (> 0) |
    /// | `DUELBOARD_ROOM_IDLE_SECS` | idle timeout, `0` disables reaping |
    /// | `DUELBOARD_MAX_ROOMS` | room limit, `0` means unlimited |
    /// | `DUELBOARD_REAP_INTERVAL_SECS` | sweep interval (> 0) |
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, DuelboardError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads values through
    /// `lookup`, so callers (and tests) can supply their own source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DuelboardError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("DUELBOARD_BIND") {
            config.bind_addr = addr;
        }
        if let Some(size) = parse::<usize>(&lookup, "DUELBOARD_BOARD_SIZE")? {
            config.room.board_size = nonzero("DUELBOARD_BOARD_SIZE", size)?;
        }
        if let Some(secs) = parse::<u64>(&lookup, "DUELBOARD_ROOM_IDLE_SECS")? {
            config.room.idle_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(max) = parse::<usize>(&lookup, "DUELBOARD_MAX_ROOMS")? {
            config.room.max_rooms = (max > 0).then_some(max);
        }
        if let Some(secs) = parse::<u64>(&lookup, "DUELBOARD_REAP_INTERVAL_SECS")? {
            config.reap_interval =
                Duration::from_secs(nonzero("DUELBOARD_REAP_INTERVAL_SECS", secs)?);
        }

        Ok(config)
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, DuelboardError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| DuelboardError::Config { key, value: raw }),
    }
}

fn nonzero<T>(key: &'static str, value: T) -> Result<T, DuelboardError>
where
    T: PartialEq + Default + ToString,
{
    if value == T::default() {
        return Err(DuelboardError::Config {
            key,
            value: value.to_string(),
        });
    }
    Ok(value)
}
