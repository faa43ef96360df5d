//! Shared error types for the channel relay supervisor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Invalid channel id: {input}")]
    InvalidChannelId { input: String },

    #[error("Channel ids exhausted after {last}")]
    ChannelIdsExhausted { last: u32 },

    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
