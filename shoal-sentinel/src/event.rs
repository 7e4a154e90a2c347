//! Parsing of primary-switch announcements.
//!
//! A switch message is five space-separated fields:
//! `group-name old-host old-port new-host new-port`.

use shoal_core::{Endpoint, GroupName};
use thiserror::Error;

/// A parsed primary-switch announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchEvent {
    /// The group whose primary switched.
    pub group: GroupName,
    /// The primary the group switched away from.
    pub old_primary: Endpoint,
    /// The primary the group switched to.
    pub new_primary: Endpoint,
}

/// Errors parsing a switch message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventParseError {
    /// Fewer than four fields after the group name.
    #[error("switch message has {fields} fields, expected at least 5")]
    TooFewFields {
        /// Number of fields found.
        fields: usize,
    },

    /// A port field did not parse as a u16.
    #[error("switch message carries invalid port {value:?}")]
    InvalidPort {
        /// The unparseable port text.
        value: String,
    },
}

impl SwitchEvent {
    /// Parses a raw switch message.
    ///
    /// Trailing fields beyond the fifth are ignored; sentinels append
    /// extra context on some channels.
    ///
    /// # Errors
    /// Returns an error if the message has fewer than five fields or a
    /// port field is not a valid u16.
    pub fn parse(message: &str) -> Result<Self, EventParseError> {
        let fields: Vec<&str> = message.split_whitespace().collect();
        if fields.len() < 5 {
            return Err(EventParseError::TooFewFields {
                fields: fields.len(),
            });
        }

        let old_port = parse_port(fields[2])?;
        let new_port = parse_port(fields[4])?;

        Ok(Self {
            group: GroupName::new(fields[0]),
            old_primary: Endpoint::new(fields[1], old_port),
            new_primary: Endpoint::new(fields[3], new_port),
        })
    }
}

fn parse_port(value: &str) -> Result<u16, EventParseError> {
    value.parse().map_err(|_| EventParseError::InvalidPort {
        value: value.to_string(),
    })
}
