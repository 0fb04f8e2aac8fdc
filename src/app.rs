// Licensed under the Apache-2.0 license

//! Firmware sequence for the board: bring the system up, configure the
//! attached device through a fixed table of register writes, then poll its
//! status register.
//!
//! ```ignore
//! static BUS: I2cBus<UsciB1> = I2cBus::new(unsafe { UsciB1::new() });
//!
//! // USCI_B1 vector
//! fn usci_b1_isr() {
//!     if BUS.on_interrupt() {
//!         exit_lpm0_on_return();
//!     }
//! }
//!
//! let (watchdog, pins, mut ucs) = unsafe { (Watchdog::new(), Pinctrl::new(), Ucs::new()) };
//! system_init(&watchdog, &pins, &mut ucs, None, &mut NoOpLogger)?;
//! let controller = I2cController::new(&BUS, I2cConfig::default(), enter_lpm0, delay);
//! let mut app = Application::new(controller);
//! app.start()?;
//! loop {
//!     let status = app.poll()?;
//! }
//! ```

use embedded_hal::delay::DelayNs;

use crate::common::{Logger, NoOpLogger};
use crate::i2c::common::{Error, READ_LEN};
use crate::i2c::i2c_controller::I2cController;
use crate::i2c::system_setup::I2cSystemSetup;
use crate::i2c::traits::{LowPowerWait, UsciI2cHardware};
use crate::pinctrl::Pinctrl;
use crate::syscon::{ClockControl, ClockError};
use crate::watchdog::Watchdog;

/// Register writes applied once after bring-up, in order.
pub const STARTUP_WRITES: [(u8, u8); 3] = [(0x06, 0x03), (0x07, 0x47), (0x09, 0x33)];

/// Register read on every poll.
pub const POLL_REGISTER: u8 = 0x05;

/// Watchdog, clock pins, XT2, then the I2C pins.
///
/// # Errors
///
/// Propagates `ClockError::OscillatorFault` from the XT2 bring-up; the I2C
/// pins are not selected in that case.
pub fn system_init<C: ClockControl, L: Logger>(
    watchdog: &Watchdog,
    pins: &Pinctrl,
    clocks: &mut C,
    xt2_attempts: Option<u32>,
    logger: &mut L,
) -> Result<u32, ClockError> {
    watchdog.hold();
    pins.select_clock_output();
    pins.select_xt2();
    let attempts = I2cSystemSetup::bring_up_xt2_logged(clocks, xt2_attempts, logger)?;
    pins.select_i2c_b1();
    Ok(attempts)
}

pub struct Application<'a, H, W, D, L = NoOpLogger>
where
    H: UsciI2cHardware,
    W: LowPowerWait,
    D: DelayNs,
    L: Logger,
{
    controller: I2cController<'a, H, W, D, L>,
}

impl<'a, H, W, D, L> Application<'a, H, W, D, L>
where
    H: UsciI2cHardware,
    W: LowPowerWait,
    D: DelayNs,
    L: Logger,
{
    pub fn new(controller: I2cController<'a, H, W, D, L>) -> Self {
        Self { controller }
    }

    /// Initialize the controller and apply [`STARTUP_WRITES`].
    ///
    /// # Errors
    ///
    /// The first failing write aborts the sequence.
    pub fn start(&mut self) -> Result<(), Error> {
        self.controller.init();
        for (reg, value) in STARTUP_WRITES {
            self.controller.write(reg, value)?;
        }
        Ok(())
    }

    /// One read of [`POLL_REGISTER`]. The caller owns the loop.
    ///
    /// # Errors
    ///
    /// Whatever the read reports.
    pub fn poll(&mut self) -> Result<[u8; READ_LEN], Error> {
        self.controller.read(POLL_REGISTER)
    }

    pub fn controller(&mut self) -> &mut I2cController<'a, H, W, D, L> {
        &mut self.controller
    }
}
