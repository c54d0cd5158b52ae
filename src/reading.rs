// ============================================================================
// ENCODER READINGS
// ============================================================================
//
// Typed view of the encoder's registers.

use std::fmt;

/// Number of counts per revolution of the 12-bit position counter.
pub const COUNTS_PER_TURN: u16 = 4096;

/// Sense in which the encoder counts up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    /// `1` means clockwise; the device reports anything else as counter-clockwise.
    pub fn from_register(raw: u16) -> Self {
        if raw == 1 {
            Direction::Clockwise
        } else {
            Direction::CounterClockwise
        }
    }

    pub fn register_value(self) -> u16 {
        match self {
            Direction::Clockwise => 1,
            Direction::CounterClockwise => 0,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Direction::Clockwise => "CW",
            Direction::CounterClockwise => "CCW",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// State of the link to the device as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    Connected,
    #[default]
    Disconnected,
}

impl ConnectionStatus {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Disconnected => "Disconnected",
        }
    }

    pub fn is_connected(self) -> bool {
        self == ConnectionStatus::Connected
    }
}

/// Register values exactly as read from the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRegisters {
    pub direction: u16,
    pub position: u16,
    pub turns: u16,
    pub velocity: u16,
}

/// One normalized poll result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    /// Position within the current turn, `0..4096`.
    pub position: u16,
    pub turns: i16,
    /// Shaft speed in RPM.
    pub velocity: u16,
    pub direction: Direction,
}

impl Reading {
    pub fn from_registers(raw: RawRegisters) -> Self {
        Self {
            position: wrap_position(raw.position),
            turns: turns_from_register(raw.turns),
            velocity: raw.velocity,
            direction: Direction::from_register(raw.direction),
        }
    }
}

impl From<RawRegisters> for Reading {
    fn from(raw: RawRegisters) -> Self {
        Self::from_registers(raw)
    }
}

pub fn wrap_position(raw: u16) -> u16 {
    raw % COUNTS_PER_TURN
}

/// Two's-complement view of the turn counter register.
pub fn turns_from_register(raw: u16) -> i16 {
    raw as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turns_register_is_signed() {
        assert_eq!(turns_from_register(0), 0);
        assert_eq!(turns_from_register(32767), 32767);
        assert_eq!(turns_from_register(32768), -32768);
        assert_eq!(turns_from_register(65535), -1);
    }

    #[test]
    fn direction_register_only_treats_one_as_clockwise() {
        assert_eq!(Direction::from_register(1), Direction::Clockwise);
        assert_eq!(Direction::from_register(0), Direction::CounterClockwise);
        assert_eq!(Direction::from_register(7), Direction::CounterClockwise);
        assert_eq!(Direction::Clockwise.toggled().register_value(), 0);
        assert_eq!(Direction::CounterClockwise.toggled().register_value(), 1);
    }

    #[test]
    fn reading_normalizes_every_register() {
        let reading = Reading::from(RawRegisters {
            direction: 1,
            position: 4097,
            turns: 65534,
            velocity: 1200,
        });
        assert_eq!(
            reading,
            Reading {
                position: 1,
                turns: -2,
                velocity: 1200,
                direction: Direction::Clockwise,
            }
        );
    }

    #[test]
    fn status_defaults_to_disconnected() {
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
        assert_eq!(ConnectionStatus::Connected.label(), "Connected");
    }
}
