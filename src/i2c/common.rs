// Licensed under the Apache-2.0 license

//! Common types and constants for the USCI I2C driver modules.
//!
//! This module provides shared definitions for error handling, bus
//! configuration and interrupt vector decoding used across the driver.

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use fugit::{HertzU32, NanosDurationU32};

/// Number of bytes returned by a register read.
pub const READ_LEN: usize = 3;

/// Slave address of the device on the board.
pub const DEFAULT_SLAVE_ADDRESS: u8 = 0x57;

/// Largest 7-bit slave address.
const MAX_SEVEN_BIT_ADDRESS: u8 = 0x7F;

/// Interrupt enable mask bits (UCBxIE layout).
pub mod interrupts {
    pub const RX: u8 = 0x01;
    pub const TX: u8 = 0x02;
    pub const START: u8 = 0x04;
    pub const STOP: u8 = 0x08;
    pub const ARBITRATION_LOST: u8 = 0x10;
    pub const NACK: u8 = 0x20;

    /// Interrupts the transaction state machine needs.
    pub const MASTER: u8 = TX | RX | NACK | ARBITRATION_LOST;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum I2cSpeed {
    Standard = 100_000,
    Fast = 400_000,
}

/// Clock feeding the bit-rate generator (UCSSELx).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClockSource {
    Aclk,
    Smclk,
}

/// Decoded status vector (UCBxIV). Reading the vector acknowledges the
/// highest-priority pending flag.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum I2cVector {
    None,
    ArbitrationLost,
    NackReceived,
    StartReceived,
    StopReceived,
    RxReady,
    TxReady,
}

impl I2cVector {
    #[must_use]
    pub fn from_bits(iv: u16) -> Self {
        match iv {
            0x02 => Self::ArbitrationLost,
            0x04 => Self::NackReceived,
            0x06 => Self::StartReceived,
            0x08 => Self::StopReceived,
            0x0A => Self::RxReady,
            0x0C => Self::TxReady,
            _ => Self::None,
        }
    }

    #[must_use]
    pub fn bits(self) -> u16 {
        match self {
            Self::None => 0x00,
            Self::ArbitrationLost => 0x02,
            Self::NackReceived => 0x04,
            Self::StartReceived => 0x06,
            Self::StopReceived => 0x08,
            Self::RxReady => 0x0A,
            Self::TxReady => 0x0C,
        }
    }
}

/// Transaction failures surfaced to callers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The slave did not acknowledge the address or a data byte.
    NoAcknowledge(NoAcknowledgeSource),
    /// Another master won the bus; retried before being reported.
    ArbitrationLost,
    /// The configured deadline passed before the interrupt handler completed.
    Timeout,
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match *self {
            Self::NoAcknowledge(source) => ErrorKind::NoAcknowledge(source),
            Self::ArbitrationLost => ErrorKind::ArbitrationLoss,
            Self::Timeout => ErrorKind::Other,
        }
    }
}

/// Rejected configuration values.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigurationError {
    InvalidSlaveAddress(u8),
    /// The computed or requested divisor is zero or does not fit UCBxBRW.
    DivisorOutOfRange(u32),
}

#[derive(Copy, Clone, Debug)]
pub struct I2cConfig {
    pub clock_source: ClockSource,
    pub source_clock: HertzU32,
    pub divisor: u16,
    pub slave_address: u8,
    pub settle_delay: NanosDurationU32,
    pub arbitration_retries: u8,
    /// Per-phase completion deadline. `None` sleeps in low-power mode until
    /// the handler completes; `Some` busy-polls on the delay provider.
    pub timeout: Option<NanosDurationU32>,
}

impl I2cConfig {
    /// Bit rate produced by the programmed divisor.
    #[must_use]
    pub fn bus_frequency(&self) -> HertzU32 {
        HertzU32::from_raw(self.source_clock.raw() / u32::from(self.divisor.max(1)))
    }
}

impl Default for I2cConfig {
    fn default() -> Self {
        I2cConfig {
            clock_source: ClockSource::Smclk,
            source_clock: HertzU32::from_raw(13_560_000),
            divisor: 32,
            slave_address: DEFAULT_SLAVE_ADDRESS,
            // 1000 CPU cycles at 13.56 MHz.
            settle_delay: NanosDurationU32::from_ticks(73_746),
            arbitration_retries: 3,
            timeout: None,
        }
    }
}

pub struct I2cConfigBuilder {
    clock_source: ClockSource,
    source_clock: HertzU32,
    speed: Option<I2cSpeed>,
    divisor: Option<u16>,
    slave_address: u8,
    settle_delay: Option<NanosDurationU32>,
    arbitration_retries: u8,
    timeout: Option<NanosDurationU32>,
}

impl Default for I2cConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl I2cConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        let defaults = I2cConfig::default();
        Self {
            clock_source: defaults.clock_source,
            source_clock: defaults.source_clock,
            speed: None,
            divisor: None,
            slave_address: defaults.slave_address,
            settle_delay: None,
            arbitration_retries: defaults.arbitration_retries,
            timeout: defaults.timeout,
        }
    }
    #[must_use]
    pub fn clock_source(mut self, source: ClockSource, frequency: HertzU32) -> Self {
        self.clock_source = source;
        self.source_clock = frequency;
        self
    }
    /// Derive the divisor from the source clock; overridden by `divisor`.
    #[must_use]
    pub fn speed(mut self, speed: I2cSpeed) -> Self {
        self.speed = Some(speed);
        self
    }
    #[must_use]
    pub fn divisor(mut self, divisor: u16) -> Self {
        self.divisor = Some(divisor);
        self
    }
    #[must_use]
    pub fn slave_address(mut self, address: u8) -> Self {
        self.slave_address = address;
        self
    }
    #[must_use]
    pub fn settle_delay(mut self, delay: NanosDurationU32) -> Self {
        self.settle_delay = Some(delay);
        self
    }
    #[must_use]
    pub fn arbitration_retries(mut self, retries: u8) -> Self {
        self.arbitration_retries = retries;
        self
    }
    #[must_use]
    pub fn timeout(mut self, timeout: NanosDurationU32) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validate and produce the configuration.
    ///
    /// # Errors
    ///
    /// `InvalidSlaveAddress` for addresses above 0x7F, `DivisorOutOfRange`
    /// when the divisor is zero or wider than 16 bits.
    pub fn build(self) -> Result<I2cConfig, ConfigurationError> {
        if self.slave_address > MAX_SEVEN_BIT_ADDRESS {
            return Err(ConfigurationError::InvalidSlaveAddress(self.slave_address));
        }

        let divisor = match (self.divisor, self.speed) {
            (Some(divisor), _) => u32::from(divisor),
            (None, Some(speed)) => self.source_clock.raw().div_ceil(speed as u32),
            (None, None) => u32::from(I2cConfig::default().divisor),
        };
        let divisor = u16::try_from(divisor)
            .ok()
            .filter(|d| *d != 0)
            .ok_or(ConfigurationError::DivisorOutOfRange(divisor))?;

        // 1000 cycles of the source clock unless set explicitly.
        let settle_delay = self.settle_delay.unwrap_or_else(|| {
            let hz = u64::from(self.source_clock.raw().max(1));
            let nanos = 1_000u64 * 1_000_000_000 / hz;
            NanosDurationU32::from_ticks(u32::try_from(nanos).unwrap_or(u32::MAX))
        });

        Ok(I2cConfig {
            clock_source: self.clock_source,
            source_clock: self.source_clock,
            divisor,
            slave_address: self.slave_address,
            settle_delay,
            arbitration_retries: self.arbitration_retries,
            timeout: self.timeout,
        })
    }
}
