// MIT License
// Wire grammar of the Turris Gadgets dongle.

use bitflags::bitflags;
use tracing::warn;

use crate::error::{BridgeError, Result};
use crate::state::SirenMode;

/// Literal acknowledgement reply from the dongle.
pub const ACK_REPLY: &str = "OK";

/// Literal negative reply from the dongle.
pub const ERROR_REPLY: &str = "ERROR";

/// Banner/handshake lines start with this sentinel (e.g. the
/// `TURRIS DONGLE V1.4` identity string).
pub const BANNER_PREFIX: &str = "TURRIS";

/// Commands that can be sent to the dongle.
///
/// Every command is a single text line; the dongle answers each with
/// exactly one reply line (`OK`, `ERROR`, or a query-specific response).
#[derive(Debug, Clone)]
pub enum Command {
    /// `WHO AM I?` — free-text identity reply (dongle banner).
    WhoAmI,
    /// `GET SLOT:NN` — address registered on slot NN (zero-padded,
    /// 0-31). Reply: `SLOT:NN [dddddddd]` or `SLOT:NN [--------]`.
    GetSlot { index: u8 },
    /// `TX ...` — composite output state. The dongle applies the whole
    /// frame atomically and replies `OK`.
    Tx {
        enroll: bool,
        pgx: bool,
        pgy: bool,
        alarm: bool,
        beep: SirenMode,
    },
}

impl Command {
    /// Convert the command to its wire string representation.
    pub fn to_wire_string(&self) -> String {
        match self {
            Command::WhoAmI => "WHO AM I?".to_string(),
            Command::GetSlot { index } => format!("GET SLOT:{:02}", index),
            Command::Tx {
                enroll,
                pgx,
                pgy,
                alarm,
                beep,
            } => format!(
                "TX ENROLL:{} PGX:{} PGY:{} ALARM:{} BEEP:{}",
                bit(*enroll),
                bit(*pgx),
                bit(*pgy),
                bit(*alarm),
                beep.as_str()
            ),
        }
    }
}

fn bit(b: bool) -> u8 {
    u8::from(b)
}

/// Check if a reply line is the acknowledgement token.
pub fn is_ack(reply: &str) -> bool {
    reply == ACK_REPLY
}

bitflags! {
    /// Bare status tokens a device may emit in its payload.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusTokens: u8 {
        /// State-change notification
        const SENSOR = 0b001;
        /// Periodic heartbeat
        const BEACON = 0b010;
        /// Physical interference with the unit
        const TAMPER = 0b100;
    }
}

/// One parsed inbound device message.
///
/// The predicates are evaluated independently and are not mutually
/// exclusive: a single line may carry several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    /// 8-digit source address from the header
    pub address: String,
    /// Device-name token from the header
    pub name: String,
    /// Payload after the header, unparsed
    pub payload: String,
    /// Bare SENSOR/BEACON/TAMPER tokens
    pub tokens: StatusTokens,
    /// `ARM:<d>` field
    pub armed: Option<bool>,
    /// `ACT:<d>` field
    pub activated: Option<bool>,
    /// `BLACKOUT:<d>` field
    pub blackout: Option<bool>,
    /// `LB:<d>` field
    pub low_battery: Option<bool>,
    /// `INT:<cccc>` raw 4-character interior temperature
    pub interior_temp: Option<String>,
    /// `SET:<cccc>` raw 4-character setpoint temperature
    pub setpoint_temp: Option<String>,
}

/// Classification of one inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// `OK` acknowledgement — ends the receive phase of a command cycle
    Ack,
    /// `ERROR` negative acknowledgement
    Err,
    /// Banner/handshake line (`TURRIS...`)
    Banner,
    /// Device status message
    Event(DecodedEvent),
}

impl LineKind {
    /// Control-plane replies never reach the state machine.
    pub fn is_control(&self) -> bool {
        !matches!(self, LineKind::Event(_))
    }
}

/// Parse one raw protocol line.
///
/// Header shape: `[` + 8 ASCII digits + `]` + space + name token +
/// space + payload. Anything else that is not a control reply is a
/// decode error (distinct from "no registered device").
pub fn decode_line(line: &str) -> Result<LineKind> {
    if line == ACK_REPLY {
        return Ok(LineKind::Ack);
    }
    if line == ERROR_REPLY {
        return Ok(LineKind::Err);
    }
    if line.starts_with(BANNER_PREFIX) {
        return Ok(LineKind::Banner);
    }

    let (address, rest) = split_header_address(line).ok_or_else(|| BridgeError::Decode {
        line: line.to_string(),
    })?;
    let (name, payload) = split_name(rest).ok_or_else(|| BridgeError::Decode {
        line: line.to_string(),
    })?;

    let mut tokens = StatusTokens::empty();
    if bare_token(&address, line, "SENSOR") {
        tokens |= StatusTokens::SENSOR;
    }
    if bare_token(&address, line, "BEACON") {
        tokens |= StatusTokens::BEACON;
    }
    if bare_token(&address, line, "TAMPER") {
        tokens |= StatusTokens::TAMPER;
    }

    Ok(LineKind::Event(DecodedEvent {
        address: address.clone(),
        name: name.to_string(),
        payload: payload.to_string(),
        tokens,
        armed: bool_field(&address, line, "ARM"),
        activated: bool_field(&address, line, "ACT"),
        blackout: bool_field(&address, line, "BLACKOUT"),
        low_battery: bool_field(&address, line, "LB"),
        interior_temp: value_field(&address, line, "INT"),
        setpoint_temp: value_field(&address, line, "SET"),
    }))
}

/// Split `[dddddddd]` off the front of a line.
fn split_header_address(line: &str) -> Option<(String, &str)> {
    let rest = line.strip_prefix('[')?;
    if rest.len() < 9 || !rest.is_char_boundary(8) {
        return None;
    }
    let (addr, rest) = rest.split_at(8);
    if !addr.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let rest = rest.strip_prefix(']')?;
    let rest = rest.strip_prefix(' ')?;
    Some((addr.to_string(), rest))
}

/// Split the device-name token off the remainder.
fn split_name(rest: &str) -> Option<(&str, &str)> {
    let (name, payload) = rest.split_once(' ')?;
    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if !valid || payload.is_empty() {
        return None;
    }
    Some((name, payload))
}

/// Re-read the address embedded at the start of a predicate's own match.
///
/// Every extractor validates this against the header address it was
/// handed; a mismatch is a data-integrity warning and the predicate is
/// treated as absent, never an error.
fn embedded_address(line: &str) -> Option<String> {
    split_header_address(line).map(|(addr, _)| addr)
}

fn address_matches(header: &str, line: &str, what: &str) -> bool {
    match embedded_address(line) {
        Some(embedded) if embedded == header => true,
        Some(embedded) => {
            let e = BridgeError::AddressMismatch {
                header: header.to_string(),
                embedded,
            };
            warn!("Decoding {}: {}", what, e);
            false
        }
        None => {
            warn!("No embedded address while decoding {} from {:?}", what, line);
            false
        }
    }
}

/// Extract `KEY:<digit>` as a boolean, validating the embedded address.
pub fn bool_field(header: &str, line: &str, key: &str) -> Option<bool> {
    let tag = format!("{}:", key);
    let pos = line.find(&tag)?;
    let value = line[pos + tag.len()..].chars().next()?;
    if !value.is_ascii_digit() {
        return None;
    }
    if !address_matches(header, line, key) {
        return None;
    }
    Some(value != '0')
}

/// Check for a bare keyword token, validating the embedded address.
pub fn bare_token(header: &str, line: &str, token: &str) -> bool {
    if !line.contains(token) {
        return false;
    }
    address_matches(header, line, token)
}

/// Extract `KEY:<cccc>` as a raw 4-character value, validating the
/// embedded address.
pub fn value_field(header: &str, line: &str, key: &str) -> Option<String> {
    let tag = format!("{}:", key);
    let pos = line.find(&tag)?;
    let value: String = line[pos + tag.len()..].chars().take(4).collect();
    if value.chars().count() != 4 {
        return None;
    }
    if !address_matches(header, line, key) {
        return None;
    }
    Some(value)
}

/// Address registered on a dongle slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotAddress {
    /// A learned 8-digit device address
    Registered(String),
    /// Empty slot (`--------`)
    Empty,
}

/// Parse the reply to `GET SLOT:NN`.
///
/// Expected shape: `SLOT:NN [dddddddd]` or `SLOT:NN [--------]`.
pub fn parse_slot_reply(reply: &str, index: u8) -> Result<SlotAddress> {
    let invalid = || BridgeError::InvalidSlotReply {
        reply: reply.to_string(),
    };

    let expected_prefix = format!("SLOT:{:02} [", index);
    let rest = reply.strip_prefix(&expected_prefix).ok_or_else(invalid)?;
    let body = rest.strip_suffix(']').ok_or_else(invalid)?;

    if body.len() == 8 && body.bytes().all(|b| b.is_ascii_digit()) {
        Ok(SlotAddress::Registered(body.to_string()))
    } else if body == "--------" {
        Ok(SlotAddress::Empty)
    } else {
        Err(invalid())
    }
}
