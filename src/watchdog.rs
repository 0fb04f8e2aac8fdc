// Licensed under the Apache-2.0 license

use crate::registers::{wdt, Reg};

/// Watchdog timer A. The firmware does not service a watchdog, so it is held
/// before anything else runs.
pub struct Watchdog {
    wdtctl: Reg<u16>,
}

impl Watchdog {
    /// # Safety
    ///
    /// Must run on an MSP430F5xx; WDTCTL writes without the password cause a
    /// power-up clear.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self {
            wdtctl: Reg::at(wdt::WDTCTL),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_reg(wdtctl: Reg<u16>) -> Self {
        Self { wdtctl }
    }

    /// Stop the watchdog counter.
    pub fn hold(&self) {
        self.wdtctl.write(wdt::WDTPW | wdt::WDTHOLD);
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.wdtctl.is_set(wdt::WDTHOLD)
    }
}
