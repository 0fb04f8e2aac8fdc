// Licensed under the Apache-2.0 license

//! Unified clock system (UCS) control.
//!
//! [`ClockControl`] exposes the individual UCS steps needed to move the CPU
//! and SMCLK onto the XT2 crystal; the sequencing and fault retry policy live
//! in [`crate::i2c::system_setup::I2cSystemSetup`].

use crate::registers::{sfr, ucs, Reg};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClockError {
    /// The oscillator fault flag was still set after the attempt budget.
    OscillatorFault { attempts: u32 },
}

pub trait ClockControl {
    /// Power up the XT2 oscillator.
    fn enable_xt2(&mut self);

    /// Feed the FLL from the internal REFO so an absent XT1 cannot raise a
    /// fault.
    fn select_fll_reference_refo(&mut self);

    fn select_aclk_refo(&mut self);

    /// Clear the XT2, XT1 and DCO fault flags, then the global oscillator
    /// fault flag.
    fn clear_fault_flags(&mut self);

    /// Global oscillator fault flag, re-raised by hardware while any
    /// oscillator is unstable.
    fn oscillator_fault(&mut self) -> bool;

    /// Lower the XT2 drive strength for the expected crystal frequency.
    fn reduce_xt2_drive(&mut self);

    /// SMCLK = MCLK = XT2.
    fn select_xt2_for_smclk_mclk(&mut self);
}

pub struct Ucs {
    ctl3: Reg<u16>,
    ctl4: Reg<u16>,
    ctl6: Reg<u16>,
    ctl7: Reg<u16>,
    sfrifg1: Reg<u16>,
}

impl Ucs {
    /// # Safety
    ///
    /// Must run on an MSP430F5xx with the UCS module, and at most one `Ucs`
    /// may exist.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self {
            ctl3: Reg::at(ucs::UCSCTL3),
            ctl4: Reg::at(ucs::UCSCTL4),
            ctl6: Reg::at(ucs::UCSCTL6),
            ctl7: Reg::at(ucs::UCSCTL7),
            sfrifg1: Reg::at(sfr::SFRIFG1),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_regs(regs: [Reg<u16>; 5]) -> Self {
        let [ctl3, ctl4, ctl6, ctl7, sfrifg1] = regs;
        Self {
            ctl3,
            ctl4,
            ctl6,
            ctl7,
            sfrifg1,
        }
    }
}

impl ClockControl for Ucs {
    fn enable_xt2(&mut self) {
        self.ctl6.clear_bits(ucs::XT2OFF);
    }

    fn select_fll_reference_refo(&mut self) {
        self.ctl3.set_bits(ucs::SELREF_2);
    }

    fn select_aclk_refo(&mut self) {
        self.ctl4.modify(|r| (r & !ucs::SELA_MASK) | ucs::SELA_2);
    }

    fn clear_fault_flags(&mut self) {
        self.ctl7
            .clear_bits(ucs::XT2OFFG | ucs::XT1LFOFFG | ucs::DCOFFG);
        self.sfrifg1.clear_bits(sfr::OFIFG);
    }

    fn oscillator_fault(&mut self) -> bool {
        self.sfrifg1.is_set(sfr::OFIFG)
    }

    fn reduce_xt2_drive(&mut self) {
        self.ctl6.clear_bits(ucs::XT2DRIVE0);
    }

    fn select_xt2_for_smclk_mclk(&mut self) {
        self.ctl4.modify(|r| {
            (r & !(ucs::SELS_MASK | ucs::SELM_MASK)) | ucs::SELS_5 | ucs::SELM_5
        });
    }
}
