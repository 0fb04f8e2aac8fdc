// Licensed under the Apache-2.0 license

//! I2C System Setup Helper
//!
//! Clock bring-up the bus driver depends on. The USCI bit-rate generator runs
//! from SMCLK, so SMCLK has to be on the XT2 crystal, and XT2 has to be free
//! of oscillator faults, before the divisor in [`crate::i2c::common::I2cConfig`]
//! means anything.

use crate::common::{Logger, NoOpLogger};
use crate::syscon::{ClockControl, ClockError};

/// Helper for the system-level steps around the I2C peripheral.
pub struct I2cSystemSetup;

impl I2cSystemSetup {
    /// Move SMCLK and MCLK onto XT2.
    ///
    /// Enables XT2, points the FLL reference and ACLK at REFO, then clears the
    /// oscillator fault flags until they stay clear. At least one clear is
    /// always performed. `max_attempts` bounds the loop; `None` retries for
    /// as long as the crystal needs.
    ///
    /// # Returns
    ///
    /// The number of fault-clear iterations it took.
    ///
    /// # Errors
    ///
    /// `ClockError::OscillatorFault` when the budget runs out. The clock
    /// selection is left on the DCO in that case.
    pub fn bring_up_xt2<C: ClockControl>(
        clocks: &mut C,
        max_attempts: Option<u32>,
    ) -> Result<u32, ClockError> {
        Self::bring_up_xt2_logged(clocks, max_attempts, &mut NoOpLogger)
    }

    /// [`Self::bring_up_xt2`] with progress reported to `logger`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::bring_up_xt2`].
    pub fn bring_up_xt2_logged<C: ClockControl, L: Logger>(
        clocks: &mut C,
        max_attempts: Option<u32>,
        logger: &mut L,
    ) -> Result<u32, ClockError> {
        clocks.enable_xt2();
        clocks.select_fll_reference_refo();
        clocks.select_aclk_refo();

        let mut attempts = 0u32;
        loop {
            clocks.clear_fault_flags();
            attempts = attempts.saturating_add(1);
            if !clocks.oscillator_fault() {
                break;
            }
            if max_attempts.is_some_and(|budget| attempts >= budget) {
                logger.error(format_args!(
                    "clock: XT2 still faulted after {} attempts",
                    attempts
                ));
                return Err(ClockError::OscillatorFault { attempts });
            }
        }

        clocks.reduce_xt2_drive();
        clocks.select_xt2_for_smclk_mclk();
        logger.debug(format_args!("clock: XT2 stable after {} attempts", attempts));
        Ok(attempts)
    }
}
