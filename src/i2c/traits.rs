// Licensed under the Apache-2.0 license

//! # I2C hardware abstraction traits
//!
//! The transaction state machine only needs a small capability surface from
//! the serial peripheral and one primitive from the CPU. Both are expressed as
//! traits so the core runs unchanged on the USCI_B1 register block
//! ([`crate::i2c::usci_b1::UsciB1`]) and on the simulated peripheral used by
//! the host tests.
//!
//! ```text
//! UsciI2cHardware (register surface, shared by ISR and foreground)
//! LowPowerWait    (foreground suspension until the next interrupt)
//! ```

use crate::i2c::common::{I2cConfig, I2cVector};

/// Register-level operations of a USCI_B style controller in I2C master mode.
///
/// Implementations are owned by [`crate::i2c::bus::I2cBus`] and are only ever
/// called inside a critical section, from either the interrupt handler or the
/// foreground driver.
pub trait UsciI2cHardware {
    /// Put the peripheral in I2C master mode with the configured clock source
    /// and divisor. Leaves software reset released.
    fn configure(&mut self, config: &I2cConfig);

    /// Program the 7-bit slave address used by subsequent start conditions.
    fn set_slave_address(&mut self, address: u8);

    /// Enable interrupt sources, see [`crate::i2c::common::interrupts`].
    fn enable_interrupts(&mut self, mask: u8);

    /// Select master transmitter (`true`) or master receiver (`false`).
    fn set_transmitter(&mut self, transmit: bool);

    /// Generate a start condition followed by the slave address frame.
    fn send_start(&mut self);

    /// Generate a stop condition. In receiver mode the stop follows the byte
    /// currently being received.
    fn send_stop(&mut self);

    /// True while a previously requested stop has not been put on the bus.
    fn is_stop_pending(&mut self) -> bool;

    fn write_tx(&mut self, byte: u8);

    /// Read the receive buffer. In receiver mode this releases the bus clock
    /// for the next byte.
    fn read_rx(&mut self) -> u8;

    fn clear_tx_flag(&mut self);

    /// Read and acknowledge the highest-priority pending interrupt.
    fn interrupt_vector(&mut self) -> I2cVector;

    /// Re-enter master mode after the controller dropped to slave on
    /// arbitration loss.
    fn restore_master(&mut self);
}

/// Suspend the foreground until at least one interrupt has been serviced.
///
/// Called inside a critical section, right after the completion check, so
/// interrupts are masked on entry. The implementation has to unmask and sleep
/// in one step and mask again before returning. On the MSP430 that is
/// `bis.w #LPM0|GIE, SR` followed by `dint`; the interrupt glue clears the
/// LPM bits on exit when [`crate::i2c::bus::I2cBus::on_interrupt`] reports
/// completion.
pub trait LowPowerWait {
    fn wait_for_interrupt(&mut self);
}

impl<F: FnMut()> LowPowerWait for F {
    fn wait_for_interrupt(&mut self) {
        self();
    }
}
