//! Core shared types and identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{SharedError, SharedResult};

/// Identifier of a supervised channel. Always positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ChannelId(u32);

impl ChannelId {
    pub const FIRST: ChannelId = ChannelId(1);

    pub fn new(id: u32) -> SharedResult<Self> {
        if id == 0 {
            return Err(SharedError::InvalidChannelId { input: id.to_string() });
        }
        Ok(Self(id))
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    /// Zero-based position of this channel, used for address offsets
    pub fn offset(&self) -> u32 {
        self.0 - 1
    }

    pub fn next(&self) -> SharedResult<Self> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or(SharedError::ChannelIdsExhausted { last: self.0 })
    }
}

impl TryFrom<u32> for ChannelId {
    type Error = SharedError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChannelId> for u32 {
    fn from(id: ChannelId) -> Self {
        id.0
    }
}

impl FromStr for ChannelId {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .parse::<u32>()
            .map_err(|_| SharedError::InvalidChannelId { input: s.to_string() })?;
        Self::new(raw)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a channel obtains its incoming stream
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    /// Bind a local port and wait for the sender to connect
    #[default]
    Listener,
    /// Connect outward to a remote sender
    Caller,
}

impl ChannelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelMode::Listener => "listener",
            ChannelMode::Caller => "caller",
        }
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelMode {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "listener" => Ok(ChannelMode::Listener),
            "caller" => Ok(ChannelMode::Caller),
            _ => Err(SharedError::InvalidConfig {
                field: "mode".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Runtime status of a channel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    #[default]
    Inactive,
    Listening,
    Active,
    Stopping,
    Crashed,
    Error,
}

impl ChannelStatus {
    /// Statuses that imply a live worker process
    pub fn has_live_process(&self) -> bool {
        matches!(self, ChannelStatus::Listening | ChannelStatus::Active | ChannelStatus::Stopping)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelStatus::Inactive => "inactive",
            ChannelStatus::Listening => "listening",
            ChannelStatus::Active => "active",
            ChannelStatus::Stopping => "stopping",
            ChannelStatus::Crashed => "crashed",
            ChannelStatus::Error => "error",
        }
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of one channel as pushed to observers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub id: ChannelId,
    pub name: String,
    pub status: ChannelStatus,
    pub pid: Option<u32>,
}

/// Snapshot of every channel in the fleet, ordered by id
pub type FleetSnapshot = Vec<ChannelSnapshot>;
