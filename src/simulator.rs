// ============================================================================
// SIMULATED ENCODER
// ============================================================================
//
// In-process stand-in for the encoder, used by the demo and tests.

use crate::config::RegisterMap;
use crate::link::{EncoderLink, LinkError};
use crate::reading::{Direction, COUNTS_PER_TURN};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io;
use std::time::{Duration, Instant};
use tokio_modbus::ExceptionCode;

const MAX_RPM: f64 = 120.0;

/// A shaft spinning at a randomly drifting speed behind the same register map as the device
pub struct SimulatedEncoder {
    registers: RegisterMap,
    rng: StdRng,
    open: bool,
    direction: Direction,
    counts: f64,
    rpm: f64,
    last_step: Instant,
    /// Chance per read that the simulated transport drops.
    dropout_chance: f64,
}

impl SimulatedEncoder {
    pub fn new(registers: RegisterMap) -> Self {
        Self::with_rng(registers, StdRng::from_os_rng())
    }

    pub fn seeded(registers: RegisterMap, seed: u64) -> Self {
        Self::with_rng(registers, StdRng::seed_from_u64(seed))
    }

    fn with_rng(registers: RegisterMap, rng: StdRng) -> Self {
        Self {
            registers,
            rng,
            open: false,
            direction: Direction::Clockwise,
            counts: 0.0,
            rpm: 30.0,
            last_step: Instant::now(),
            dropout_chance: 0.0,
        }
    }

    pub fn with_dropouts(mut self, chance: f64) -> Self {
        self.dropout_chance = chance.clamp(0.0, 1.0);
        self
    }

    /// Advances the shaft by `dt`, letting the speed wander a little.
    pub fn step(&mut self, dt: Duration) {
        let drift = self.rng.random_range(-2.0..=2.0);
        self.rpm = (self.rpm + drift).clamp(0.0, MAX_RPM);
        let sign = match self.direction {
            Direction::Clockwise => 1.0,
            Direction::CounterClockwise => -1.0,
        };
        self.counts += sign * self.rpm / 60.0 * f64::from(COUNTS_PER_TURN) * dt.as_secs_f64();
    }

    fn catch_up(&mut self) {
        let now = Instant::now();
        let dt = now - self.last_step;
        self.last_step = now;
        self.step(dt);
    }

    fn register_value(&self, address: u16) -> Option<u16> {
        let counts = self.counts.floor() as i64;
        let per_turn = i64::from(COUNTS_PER_TURN);
        let map = self.registers;
        if address == map.direction {
            Some(self.direction.register_value())
        } else if address == map.position {
            Some(counts.rem_euclid(per_turn) as u16)
        } else if address == map.turns {
            Some(counts.div_euclid(per_turn) as i16 as u16)
        } else if address == map.velocity {
            Some(self.rpm.round() as u16)
        } else {
            None
        }
    }
}

impl EncoderLink for SimulatedEncoder {
    fn peer(&self) -> String {
        "simulated encoder".to_string()
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn open(&mut self) -> Result<(), LinkError> {
        self.open = true;
        self.last_step = Instant::now();
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn read_register(&mut self, address: u16) -> Result<u16, LinkError> {
        if !self.open {
            return Err(LinkError::NotConnected);
        }
        if self.dropout_chance > 0.0 && self.rng.random_bool(self.dropout_chance) {
            self.open = false;
            return Err(io::Error::from(io::ErrorKind::ConnectionReset).into());
        }
        self.catch_up();
        self.register_value(address).ok_or(LinkError::Exception {
            address,
            code: ExceptionCode::IllegalDataAddress,
        })
    }

    fn write_register(&mut self, address: u16, value: u16) -> Result<(), LinkError> {
        if !self.open {
            return Err(LinkError::NotConnected);
        }
        if address != self.registers.direction {
            return Err(LinkError::Exception {
                address,
                code: ExceptionCode::IllegalDataAddress,
            });
        }
        self.direction = Direction::from_register(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> SimulatedEncoder {
        SimulatedEncoder::seeded(RegisterMap::default(), 7)
    }

    #[test]
    fn closed_encoder_refuses_requests() {
        let mut enc = encoder();
        assert!(matches!(enc.read_register(1), Err(LinkError::NotConnected)));
        assert!(matches!(enc.write_register(18, 0), Err(LinkError::NotConnected)));
    }

    #[test]
    fn counting_direction_follows_the_register() {
        let mut enc = encoder();
        enc.open().expect("open");
        let map = RegisterMap::default();
        assert_eq!(enc.read_register(map.direction).ok(), Some(1));

        enc.write_register(map.direction, 0).expect("write");
        assert_eq!(enc.read_register(map.direction).ok(), Some(0));
        enc.step(Duration::from_secs(5));
        // Counting backwards from zero lands in negative turns.
        let turns = enc.read_register(map.turns).expect("turns") as i16;
        assert!(turns < 0);
        let position = enc.read_register(map.position).expect("position");
        assert!(position < COUNTS_PER_TURN);
    }

    #[test]
    fn unknown_registers_are_refused_by_the_device() {
        let mut enc = encoder();
        enc.open().expect("open");
        let err = enc.read_register(999).expect_err("unmapped register");
        assert!(!err.is_connection_failure());
        let err = enc.write_register(1, 5).expect_err("read-only register");
        assert!(!err.is_connection_failure());
    }

    #[test]
    fn dropouts_close_the_transport() {
        let mut enc = encoder().with_dropouts(1.0);
        enc.open().expect("open");
        let err = enc.read_register(1).expect_err("dropout");
        assert!(err.is_connection_failure());
        assert!(!enc.is_open());
    }
}
