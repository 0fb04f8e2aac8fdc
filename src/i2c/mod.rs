// Licensed under the Apache-2.0 license

//! USCI_B I2C master driver module.
//!
//! An interrupt-driven master for the MSP430 USCI_B peripheral. The
//! foreground [`I2cController`] arms a transaction on the shared [`I2cBus`],
//! issues the start condition and sleeps; the USCI vector calls
//! [`I2cBus::on_interrupt`], which moves one byte per event and wakes the
//! foreground once the stop condition has been requested.

pub mod bus;
pub mod common;
pub mod i2c_controller;
pub mod system_setup;
pub mod traits;
pub mod transaction;
pub mod usci_b1;

// Simulated peripheral for host tests and on-target self-test
#[cfg(any(test, feature = "sim"))]
pub mod sim;

// Re-export common types for convenience
pub use common::{
    ClockSource, ConfigurationError, Error, I2cConfig, I2cConfigBuilder, I2cSpeed, I2cVector,
    READ_LEN,
};

pub use bus::I2cBus;
pub use i2c_controller::I2cController;
pub use traits::{LowPowerWait, UsciI2cHardware};
pub use usci_b1::UsciB1;
