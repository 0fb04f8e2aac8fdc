// Licensed under the Apache-2.0 license

//! USCI_B1 register backend for the MSP430F5310.

use crate::i2c::common::{ClockSource, I2cConfig, I2cVector};
use crate::i2c::traits::UsciI2cHardware;
use crate::registers::{usci_b1, Reg};

const fn offset(addr: usize) -> usize {
    addr - usci_b1::BASE
}

pub struct UsciB1 {
    ctl0: Reg<u8>,
    ctl1: Reg<u8>,
    br0: Reg<u8>,
    br1: Reg<u8>,
    rxbuf: Reg<u8>,
    txbuf: Reg<u8>,
    i2csa: Reg<u16>,
    ie: Reg<u8>,
    ifg: Reg<u8>,
    iv: Reg<u16>,
    /// Interrupt enables to restore after a software reset clears UCB1IE.
    enabled: u8,
}

impl UsciB1 {
    /// # Safety
    ///
    /// Must run on an MSP430F5310 (or a part with the same USCI_B1 map), and
    /// at most one `UsciB1` may exist.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self::at_base(usci_b1::BASE)
    }

    /// # Safety
    ///
    /// `base` must address a USCI_B register block laid out like USCI_B1.
    const unsafe fn at_base(base: usize) -> Self {
        Self {
            ctl0: Reg::at(base + offset(usci_b1::CTL0)),
            ctl1: Reg::at(base + offset(usci_b1::CTL1)),
            br0: Reg::at(base + offset(usci_b1::BR0)),
            br1: Reg::at(base + offset(usci_b1::BR1)),
            rxbuf: Reg::at(base + offset(usci_b1::RXBUF)),
            txbuf: Reg::at(base + offset(usci_b1::TXBUF)),
            i2csa: Reg::at(base + offset(usci_b1::I2CSA)),
            ie: Reg::at(base + offset(usci_b1::IE)),
            ifg: Reg::at(base + offset(usci_b1::IFG)),
            iv: Reg::at(base + offset(usci_b1::IV)),
            enabled: 0,
        }
    }

    fn hold_reset(&self) {
        self.ctl1.set_bits(usci_b1::UCSWRST);
    }

    fn release_reset(&self) {
        self.ctl1.clear_bits(usci_b1::UCSWRST);
    }
}

impl UsciI2cHardware for UsciB1 {
    fn configure(&mut self, config: &I2cConfig) {
        self.hold_reset();
        self.ctl0.write(0);
        self.ctl0
            .write(usci_b1::UCMST | usci_b1::UCMODE_3 | usci_b1::UCSYNC);

        let ssel = match config.clock_source {
            ClockSource::Aclk => usci_b1::UCSSEL_1,
            ClockSource::Smclk => usci_b1::UCSSEL_2,
        };
        self.ctl1.write(ssel | usci_b1::UCSWRST);

        let [lo, hi] = config.divisor.to_le_bytes();
        self.br0.write(lo);
        self.br1.write(hi);
        self.release_reset();
        self.enabled = 0;
    }

    fn set_slave_address(&mut self, address: u8) {
        self.hold_reset();
        self.i2csa.write(u16::from(address));
        self.release_reset();
        // Reset cleared the enables.
        self.ie.write(self.enabled);
    }

    fn enable_interrupts(&mut self, mask: u8) {
        self.enabled |= mask;
        self.ie.set_bits(mask);
    }

    fn set_transmitter(&mut self, transmit: bool) {
        if transmit {
            self.ctl1.set_bits(usci_b1::UCTR);
        } else {
            self.ctl1.clear_bits(usci_b1::UCTR);
        }
    }

    fn send_start(&mut self) {
        self.ctl1.set_bits(usci_b1::UCTXSTT);
    }

    fn send_stop(&mut self) {
        self.ctl1.set_bits(usci_b1::UCTXSTP);
    }

    fn is_stop_pending(&mut self) -> bool {
        self.ctl1.is_set(usci_b1::UCTXSTP)
    }

    fn write_tx(&mut self, byte: u8) {
        self.txbuf.write(byte);
    }

    fn read_rx(&mut self) -> u8 {
        self.rxbuf.read()
    }

    fn clear_tx_flag(&mut self) {
        self.ifg.clear_bits(usci_b1::UCTXIFG);
    }

    fn interrupt_vector(&mut self) -> I2cVector {
        I2cVector::from_bits(self.iv.read())
    }

    fn restore_master(&mut self) {
        // UCMST is only writable in reset, and reset clears UCB1IE.
        self.hold_reset();
        self.ctl0.set_bits(usci_b1::UCMST);
        self.release_reset();
        self.ie.write(self.enabled);
    }
}
