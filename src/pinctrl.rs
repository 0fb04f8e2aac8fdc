// Licensed under the Apache-2.0 license

//! Pin function selection for the I2C board.
//!
//! | Pins       | Function                         |
//! |------------|----------------------------------|
//! | P4.1, P4.2 | UCB1SDA, UCB1SCL                 |
//! | P5.2, P5.3 | XT2IN, XT2OUT                    |
//! | P2.1       | clock output, driven             |

use crate::registers::{port, Reg};

pub const PIN_USCI_B1_I2C: u8 = (1 << 1) | (1 << 2);
pub const PIN_XT2: u8 = (1 << 2) | (1 << 3);
pub const PIN_CLOCK_OUT: u8 = 1 << 1;

pub struct Pinctrl {
    p2dir: Reg<u8>,
    p2sel: Reg<u8>,
    p4sel: Reg<u8>,
    p5sel: Reg<u8>,
}

impl Pinctrl {
    /// # Safety
    ///
    /// Must run on an MSP430F5310. Other owners of ports 2, 4 and 5 must not
    /// modify the select and direction registers concurrently.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self {
            p2dir: Reg::at(port::P2DIR),
            p2sel: Reg::at(port::P2SEL),
            p4sel: Reg::at(port::P4SEL),
            p5sel: Reg::at(port::P5SEL),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_regs(regs: [Reg<u8>; 4]) -> Self {
        let [p2dir, p2sel, p4sel, p5sel] = regs;
        Self {
            p2dir,
            p2sel,
            p4sel,
            p5sel,
        }
    }

    /// Hand P4.1/P4.2 to USCI_B1.
    pub fn select_i2c_b1(&self) {
        self.p4sel.set_bits(PIN_USCI_B1_I2C);
    }

    /// Connect the XT2 crystal. Has to precede enabling XT2.
    pub fn select_xt2(&self) {
        self.p5sel.set_bits(PIN_XT2);
    }

    pub fn select_clock_output(&self) {
        self.p2dir.set_bits(PIN_CLOCK_OUT);
        self.p2sel.set_bits(PIN_CLOCK_OUT);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) struct PortRam(pub [u8; 4]);

    impl PortRam {
        pub(crate) fn pinctrl(&mut self) -> Pinctrl {
            let base = self.0.as_mut_ptr() as usize;
            let reg = |i: usize| unsafe { Reg::<u8>::at(base + i) };
            Pinctrl::from_regs([reg(0), reg(1), reg(2), reg(3)])
        }
    }

    #[test]
    fn test_selects_keep_other_pins() {
        let mut ram = PortRam([0x80, 0x01, 0x01, 0x10]);
        let pins = ram.pinctrl();

        pins.select_i2c_b1();
        pins.select_xt2();
        pins.select_clock_output();

        assert_eq!(ram.0, [0x82, 0x03, 0x07, 0x1C]);
    }
}
