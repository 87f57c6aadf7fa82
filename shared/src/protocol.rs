//! Text wire protocol spoken over each player's connection.
//!
//! Every message is a single text frame of colon-separated fields. The
//! leading field names the command; the remaining fields are its
//! arguments. Clients send [`ClientCommand`]s, the server answers with
//! [`ServerMessage`]s.

use crate::{Direction, FIELD_DELIMITER};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub const REQUEST_STATE: &str = "REQUEST_STATE";
pub const SPAWN: &str = "SPAWN";
pub const TURN: &str = "TURN";

pub const CONNECTED: &str = "CONNECTED";
pub const GAME_FULL: &str = "GAME_FULL";
pub const DISPLAY_MESSAGE: &str = "DISPLAY_MESSAGE";
pub const NEW_STATE: &str = "NEW_STATE";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("empty message")]
    Empty,
    #[error("{command} needs {needed} field(s), got {given}")]
    MissingFields {
        command: &'static str,
        needed: usize,
        given: usize,
    },
    #[error("invalid coordinate `{0}`")]
    InvalidCoordinate(String),
    #[error("invalid direction `{0}`")]
    InvalidDirection(String),
    #[error("unrecognised server message `{0}`")]
    UnknownServerMessage(String),
}

/// Commands a client can send.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    RequestState,
    /// Spawn near the given point.
    Spawn { x: f64, y: f64 },
    Turn(Direction),
    /// Anything unrecognised. Echoed back verbatim.
    Unknown(String),
}

impl ClientCommand {
    pub fn parse(text: &str) -> Result<ClientCommand, ParseError> {
        if text.is_empty() {
            return Err(ParseError::Empty);
        }

        let fields: Vec<&str> = text.split(FIELD_DELIMITER).collect();
        match fields[0] {
            REQUEST_STATE => Ok(ClientCommand::RequestState),
            SPAWN => {
                require_fields(SPAWN, &fields, 2)?;
                Ok(ClientCommand::Spawn {
                    x: parse_coordinate(fields[1])?,
                    y: parse_coordinate(fields[2])?,
                })
            }
            TURN => {
                require_fields(TURN, &fields, 1)?;
                Direction::from_token(fields[1])
                    .map(ClientCommand::Turn)
                    .ok_or_else(|| ParseError::InvalidDirection(fields[1].to_string()))
            }
            _ => Ok(ClientCommand::Unknown(text.to_string())),
        }
    }
}

impl fmt::Display for ClientCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientCommand::RequestState => f.write_str(REQUEST_STATE),
            ClientCommand::Spawn { x, y } => write!(f, "{SPAWN}:{x}:{y}"),
            ClientCommand::Turn(dir) => write!(f, "{TURN}:{}", dir.token()),
            ClientCommand::Unknown(raw) => f.write_str(raw),
        }
    }
}

/// Messages the server pushes to a client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Connected,
    GameFull,
    DisplayMessage(String),
    NewState(Arc<str>),
    /// A client's unrecognised command, returned unchanged.
    Echo(String),
}

impl ServerMessage {
    pub fn parse(text: &str) -> Result<ServerMessage, ParseError> {
        let (head, rest) = match text.split_once(FIELD_DELIMITER) {
            Some((head, rest)) => (head, Some(rest)),
            None => (text, None),
        };

        match (head, rest) {
            (CONNECTED, None) => Ok(ServerMessage::Connected),
            (GAME_FULL, None) => Ok(ServerMessage::GameFull),
            (DISPLAY_MESSAGE, Some(hint)) => Ok(ServerMessage::DisplayMessage(hint.to_string())),
            (NEW_STATE, Some(snapshot)) => Ok(ServerMessage::NewState(Arc::from(snapshot))),
            _ => Err(ParseError::UnknownServerMessage(text.to_string())),
        }
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Connected => f.write_str(CONNECTED),
            ServerMessage::GameFull => f.write_str(GAME_FULL),
            ServerMessage::DisplayMessage(hint) => write!(f, "{DISPLAY_MESSAGE}:{hint}"),
            ServerMessage::NewState(snapshot) => write!(f, "{NEW_STATE}:{snapshot}"),
            ServerMessage::Echo(raw) => f.write_str(raw),
        }
    }
}

fn require_fields(command: &'static str, fields: &[&str], needed: usize) -> Result<(), ParseError> {
    let given = fields.len() - 1;
    if given < needed {
        return Err(ParseError::MissingFields {
            command,
            needed,
            given,
        });
    }
    Ok(())
}

fn parse_coordinate(field: &str) -> Result<f64, ParseError> {
    field
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::InvalidCoordinate(field.to_string()))
}
