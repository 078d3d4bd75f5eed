// MIT License
// Alarm state machine: system posture and per-hardware-type transitions.

use std::fmt;

use crate::protocol::{Command, DecodedEvent, StatusTokens};
use crate::registry::{Device, HardwareType, Role};

/// Siren beep mode carried in the outbound TX frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SirenMode {
    #[default]
    None,
    Slow,
    Fast,
}

impl SirenMode {
    /// Wire representation used in `BEEP:<mode>`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Slow => "SLOW",
            Self::Fast => "FAST",
        }
    }

    /// Parse a mode name; unknown names are rejected at the config
    /// boundary rather than at transmit time.
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "NONE" => Some(Self::None),
            "SLOW" => Some(Self::Slow),
            "FAST" => Some(Self::Fast),
            _ => None,
        }
    }
}

/// The alarm installation's current posture.
///
/// Single instance for the process, initialized disarmed/clear, mutated
/// once per decoded line, never persisted.
///
/// Invariants: `alarm` only becomes true while `armed` is true;
/// disarming always clears `alarm` and `pgx`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SystemState {
    pub armed: bool,
    pub alarm: bool,
    pub siren: SirenMode,
    pub pgx: bool,
    pub pgy: bool,
    pub enroll: bool,
    /// Last observed interior temperature, raw 4-character encoding
    pub temperature: Option<String>,
    /// Last observed setpoint temperature, raw 4-character encoding
    pub setpoint: Option<String>,
}

impl SystemState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The composite outbound command derived from the current state.
    pub fn tx_command(&self) -> Command {
        Command::Tx {
            enroll: self.enroll,
            pgx: self.pgx,
            pgy: self.pgy,
            alarm: self.alarm,
            beep: self.siren,
        }
    }
}

/// One structured line reported to the event sink.
///
/// `Display` produces the exact sink line grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// `STATE: <name> OK` — device heartbeat (BEACON)
    Heartbeat { name: String },
    /// `STATE: <name> TAMPER` — physical interference, informational only
    Tamper { name: String },
    /// `ARMED: <name>`
    Armed { name: String },
    /// `DISARMED: <name>`
    Disarmed { name: String },
    /// `STATE: <name> OPEN` — door contact open while its SENSOR token
    /// is present
    DoorOpen { name: String },
    /// `ACTION: <name> ALARM!` — armed intrusion via a door contact
    AlarmAction { name: String },
    /// `ZONE: <name> STATE: <active>` — motion zone activity report
    ZoneState { name: String, active: bool },
    /// `ZONE: <name> ALARM!` — armed intrusion via a motion zone
    ZoneAlarm { name: String },
    /// `STATE: <name> SENSOR` — sensor event with no alarm action
    SensorState { name: String },
    /// `ACTION: <name> SMOKE!` — smoke escalation
    Smoke { name: String },
    /// `ACTION: <name> BLACKOUT!` — siren lost mains power
    Blackout { name: String },
    /// `TEMP: <raw>` — interior temperature reading
    Temperature { value: String },
    /// `TEMPSET: <raw>` — setpoint temperature reading
    TempSetpoint { value: String },
    /// `LOW_BATTERY: <address>` — end-of-cycle battery sweep entry
    LowBattery { address: String },
    /// `CMD: <frame>` — outbound frame about to be transmitted
    Command { frame: String },
    /// `CMD_OK` — dongle acknowledged the frame
    CommandOk,
    /// `CMD_FAILED` — reply missing or not the acknowledgement token
    CommandFailed,
    /// `ERROR: <message>` — decode/integrity problems
    Error { message: String },
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Heartbeat { name } => write!(f, "STATE: {} OK", name),
            Self::Tamper { name } => write!(f, "STATE: {} TAMPER", name),
            Self::Armed { name } => write!(f, "ARMED: {}", name),
            Self::Disarmed { name } => write!(f, "DISARMED: {}", name),
            Self::DoorOpen { name } => write!(f, "STATE: {} OPEN", name),
            Self::AlarmAction { name } => write!(f, "ACTION: {} ALARM!", name),
            Self::ZoneState { name, active } => {
                write!(f, "ZONE: {} STATE: {}", name, active)
            }
            Self::ZoneAlarm { name } => write!(f, "ZONE: {} ALARM!", name),
            Self::SensorState { name } => write!(f, "STATE: {} SENSOR", name),
            Self::Smoke { name } => write!(f, "ACTION: {} SMOKE!", name),
            Self::Blackout { name } => write!(f, "ACTION: {} BLACKOUT!", name),
            Self::Temperature { value } => write!(f, "TEMP: {}", value),
            Self::TempSetpoint { value } => write!(f, "TEMPSET: {}", value),
            Self::LowBattery { address } => write!(f, "LOW_BATTERY: {}", address),
            Self::Command { frame } => write!(f, "CMD: {}", frame),
            Self::CommandOk => write!(f, "CMD_OK"),
            Self::CommandFailed => write!(f, "CMD_FAILED"),
            Self::Error { message } => write!(f, "ERROR: {}", message),
        }
    }
}

/// Apply one decoded event to the system state.
///
/// Pure transition function: dispatches on the resolved device's
/// hardware type and returns the log events to report. The caller has
/// already updated the registry's battery flag.
pub fn apply_event(state: &mut SystemState, device: &Device, event: &DecodedEvent) -> Vec<LogEvent> {
    let mut log = Vec::new();
    let name = device.name.clone();

    if event.tokens.contains(StatusTokens::BEACON) {
        log.push(LogEvent::Heartbeat { name: name.clone() });
    }
    // Decoded and reported, but drives no transition in this revision.
    if event.tokens.contains(StatusTokens::TAMPER) {
        log.push(LogEvent::Tamper { name: name.clone() });
    }

    let sensor = event.tokens.contains(StatusTokens::SENSOR);

    match device.hardware_type {
        HardwareType::Rc86K => {
            // Only left-hand button pairs control arming.
            if device.role == Role::ArmingLeft {
                if event.armed == Some(true) {
                    state.armed = true;
                    log.push(LogEvent::Armed { name });
                } else {
                    // ARM:0 or no ARM field at all: treated as disarm.
                    state.armed = false;
                    state.pgx = false;
                    state.alarm = false;
                    log.push(LogEvent::Disarmed { name });
                }
            }
        }
        HardwareType::Ja83M => {
            let act = event.activated == Some(true);
            if act && sensor {
                log.push(LogEvent::DoorOpen { name: name.clone() });
            }
            if act && state.armed {
                state.pgx = true;
                state.alarm = true;
                log.push(LogEvent::AlarmAction { name });
            }
        }
        HardwareType::Ja83P => {
            let active = event.activated == Some(true) || sensor;
            log.push(LogEvent::ZoneState {
                name: name.clone(),
                active,
            });
            if active && state.armed {
                state.alarm = true;
                state.pgx = true;
                log.push(LogEvent::ZoneAlarm { name });
            }
        }
        HardwareType::Ja82Sh => {
            // No alarm escalation for shock sensors in this revision.
            if sensor {
                log.push(LogEvent::SensorState { name });
            }
        }
        HardwareType::Ja85St => {
            // Escalates regardless of arming state.
            if sensor {
                log.push(LogEvent::SensorState { name: name.clone() });
                log.push(LogEvent::Smoke { name });
            }
        }
        HardwareType::Ja80L => {
            if event.blackout == Some(true) {
                log.push(LogEvent::Blackout { name });
            }
        }
        HardwareType::Tp82N => {
            if let Some(temp) = &event.interior_temp {
                state.temperature = Some(temp.clone());
                log.push(LogEvent::Temperature { value: temp.clone() });
            }
            if let Some(temp) = &event.setpoint_temp {
                state.setpoint = Some(temp.clone());
                log.push(LogEvent::TempSetpoint { value: temp.clone() });
            }
        }
        // Battery tracking and the informational tokens above only.
        HardwareType::Ja81M | HardwareType::Ac88 => {}
    }

    log
}
