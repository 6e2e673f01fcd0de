//! Callback data carried by the inline buttons.
//!
//! Wire form is `done|<chat_id>|<message_id>` or the literal `noop`.

use thiserror::Error;

/// Telegram caps `callback_data` at 64 bytes.
pub const MAX_CALLBACK_DATA_LEN: usize = 64;

const DONE_TAG: &str = "done";
const NOOP: &str = "noop";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("callback payload is empty")]
    Empty,

    #[error("callback payload is {0} bytes, limit is 64")]
    TooLong(usize),

    #[error("unknown callback action: {0}")]
    UnknownAction(String),

    #[error("expected 3 fields in callback payload, got {0}")]
    WrongArity(usize),

    #[error("invalid {field} in callback payload: {value:?}")]
    InvalidId { field: &'static str, value: String },
}

/// Decoded button payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackPayload {
    MarkDone { chat_id: i64, message_id: i64 },
    Noop,
}

impl CallbackPayload {
    pub fn encode(&self) -> String {
        match self {
            Self::MarkDone {
                chat_id,
                message_id,
            } => format!("{}|{}|{}", DONE_TAG, chat_id, message_id),
            Self::Noop => NOOP.to_string(),
        }
    }

    /// Strict parse: anything other than the two known shapes is rejected.
    pub fn parse(raw: &str) -> Result<Self, PayloadError> {
        if raw.is_empty() {
            return Err(PayloadError::Empty);
        }
        if raw.len() > MAX_CALLBACK_DATA_LEN {
            return Err(PayloadError::TooLong(raw.len()));
        }
        if raw == NOOP {
            return Ok(Self::Noop);
        }

        let parts: Vec<&str> = raw.split('|').collect();
        if parts[0] != DONE_TAG {
            return Err(PayloadError::UnknownAction(parts[0].to_string()));
        }
        if parts.len() != 3 {
            return Err(PayloadError::WrongArity(parts.len()));
        }

        let chat_id = parse_id("chat_id", parts[1])?;
        let message_id = parse_id("message_id", parts[2])?;
        Ok(Self::MarkDone {
            chat_id,
            message_id,
        })
    }
}

fn parse_id(field: &'static str, value: &str) -> Result<i64, PayloadError> {
    value.parse::<i64>().map_err(|_| PayloadError::InvalidId {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_done_payload() {
        assert_eq!(
            CallbackPayload::parse("done|-1001234567890|55"),
            Ok(CallbackPayload::MarkDone {
                chat_id: -1001234567890,
                message_id: 55
            })
        );
    }

    #[test]
    fn encode_matches_wire_form() {
        let payload = CallbackPayload::MarkDone {
            chat_id: 100,
            message_id: 7,
        };
        assert_eq!(payload.encode(), "done|100|7");
        assert_eq!(CallbackPayload::Noop.encode(), "noop");
    }

    #[test]
    fn parses_noop() {
        assert_eq!(CallbackPayload::parse("noop"), Ok(CallbackPayload::Noop));
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert_eq!(CallbackPayload::parse(""), Err(PayloadError::Empty));
        assert!(matches!(
            CallbackPayload::parse("undo|1|2"),
            Err(PayloadError::UnknownAction(_))
        ));
        assert_eq!(
            CallbackPayload::parse("done|1"),
            Err(PayloadError::WrongArity(2))
        );
        assert_eq!(
            CallbackPayload::parse("done|1|2|3"),
            Err(PayloadError::WrongArity(4))
        );
        assert!(matches!(
            CallbackPayload::parse("done|abc|2"),
            Err(PayloadError::InvalidId {
                field: "chat_id",
                ..
            })
        ));
        assert!(matches!(
            CallbackPayload::parse("done|1| 2"),
            Err(PayloadError::InvalidId {
                field: "message_id",
                ..
            })
        ));
    }

    #[test]
    fn rejects_oversized_payload() {
        let raw = format!("done|{}|1", "9".repeat(70));
        assert!(matches!(
            CallbackPayload::parse(&raw),
            Err(PayloadError::TooLong(_))
        ));
    }
}
