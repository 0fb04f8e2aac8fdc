// Licensed under the Apache-2.0 license

//! MSP430F5310 register map for the blocks this crate drives.
//!
//! Only the registers and bit fields actually used are listed. Addresses are
//! taken from the F5xx family memory map; 8-bit halves of word registers are
//! addressed individually (low byte at the even address).

use core::marker::PhantomData;
use core::ops::{BitAnd, BitOr, Not};
use core::ptr::{read_volatile, write_volatile};

/// A memory-mapped register of width `T`.
#[derive(Clone, Copy, Debug)]
pub struct Reg<T> {
    addr: usize,
    _width: PhantomData<T>,
}

impl<T> Reg<T>
where
    T: Copy + BitAnd<Output = T> + BitOr<Output = T> + Not<Output = T>,
{
    /// # Safety
    ///
    /// `addr` must be the address of a readable and writable peripheral
    /// register of width `T` on the running device, and every `Reg` built
    /// from it must only be used from contexts that tolerate the register's
    /// side effects (e.g. reading an interrupt vector clears a flag).
    #[must_use]
    pub const unsafe fn at(addr: usize) -> Self {
        Self {
            addr,
            _width: PhantomData,
        }
    }

    #[inline]
    pub fn read(self) -> T {
        // SAFETY: `at` requires a valid register address.
        unsafe { read_volatile(self.addr as *const T) }
    }

    #[inline]
    pub fn write(self, value: T) {
        // SAFETY: `at` requires a valid register address.
        unsafe { write_volatile(self.addr as *mut T, value) }
    }

    #[inline]
    pub fn modify(self, f: impl FnOnce(T) -> T) {
        self.write(f(self.read()));
    }

    #[inline]
    pub fn set_bits(self, mask: T) {
        self.modify(|r| r | mask);
    }

    #[inline]
    pub fn clear_bits(self, mask: T) {
        self.modify(|r| r & !mask);
    }

    #[inline]
    pub fn is_set(self, mask: T) -> bool
    where
        T: PartialEq + Default,
    {
        (self.read() & mask) != T::default()
    }
}

/// USCI_B1 in I2C mode.
pub mod usci_b1 {
    pub const BASE: usize = 0x0620;

    pub const CTL1: usize = BASE;
    pub const CTL0: usize = BASE + 0x01;
    pub const BR0: usize = BASE + 0x06;
    pub const BR1: usize = BASE + 0x07;
    pub const STAT: usize = BASE + 0x0A;
    pub const RXBUF: usize = BASE + 0x0C;
    pub const TXBUF: usize = BASE + 0x0E;
    pub const I2COA: usize = BASE + 0x10;
    pub const I2CSA: usize = BASE + 0x12;
    pub const IE: usize = BASE + 0x1C;
    pub const IFG: usize = BASE + 0x1D;
    pub const IV: usize = BASE + 0x1E;

    // CTL0
    pub const UCMST: u8 = 0x08;
    pub const UCMODE_3: u8 = 0x06;
    pub const UCSYNC: u8 = 0x01;

    // CTL1
    pub const UCSSEL_1: u8 = 0x40;
    pub const UCSSEL_2: u8 = 0x80;
    pub const UCTR: u8 = 0x10;
    pub const UCTXSTP: u8 = 0x04;
    pub const UCTXSTT: u8 = 0x02;
    pub const UCSWRST: u8 = 0x01;

    // STAT
    pub const UCBBUSY: u8 = 0x10;

    // IE / IFG share bit positions
    pub const UCNACKIE: u8 = 0x20;
    pub const UCALIE: u8 = 0x10;
    pub const UCSTPIE: u8 = 0x08;
    pub const UCSTTIE: u8 = 0x04;
    pub const UCTXIE: u8 = 0x02;
    pub const UCRXIE: u8 = 0x01;
    pub const UCTXIFG: u8 = 0x02;
}

/// Unified clock system.
pub mod ucs {
    pub const UCSCTL3: usize = 0x0166;
    pub const UCSCTL4: usize = 0x0168;
    pub const UCSCTL6: usize = 0x016C;
    pub const UCSCTL7: usize = 0x016E;

    // UCSCTL3
    pub const SELREF_2: u16 = 0x0020;

    // UCSCTL4
    pub const SELA_MASK: u16 = 0x0700;
    pub const SELA_2: u16 = 0x0200;
    pub const SELS_MASK: u16 = 0x0070;
    pub const SELS_5: u16 = 0x0050;
    pub const SELM_MASK: u16 = 0x0007;
    pub const SELM_5: u16 = 0x0005;

    // UCSCTL6
    pub const XT2DRIVE0: u16 = 0x4000;
    pub const XT2OFF: u16 = 0x0100;

    // UCSCTL7
    pub const XT2OFFG: u16 = 0x0008;
    pub const XT1LFOFFG: u16 = 0x0002;
    pub const DCOFFG: u16 = 0x0001;
}

/// Special function registers.
pub mod sfr {
    pub const SFRIFG1: usize = 0x0102;
    pub const OFIFG: u16 = 0x0002;
}

/// Watchdog timer A.
pub mod wdt {
    pub const WDTCTL: usize = 0x015C;
    pub const WDTPW: u16 = 0x5A00;
    pub const WDTHOLD: u16 = 0x0080;
}

/// Digital I/O function select and direction registers.
pub mod port {
    pub const P2DIR: usize = 0x0205;
    pub const P2SEL: usize = 0x020B;
    pub const P4SEL: usize = 0x022B;
    pub const P5SEL: usize = 0x024A;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reg_bit_operations_on_ram() {
        let mut cell: u16 = 0x00F0;
        let reg = unsafe { Reg::<u16>::at(core::ptr::addr_of_mut!(cell) as usize) };

        reg.set_bits(0x0100);
        assert_eq!(reg.read(), 0x01F0);

        reg.clear_bits(0x0030);
        assert_eq!(reg.read(), 0x01C0);

        assert!(reg.is_set(0x0100));
        assert!(!reg.is_set(0x0001));

        reg.modify(|r| r >> 4);
        assert_eq!(cell, 0x001C);
    }

    #[test]
    fn test_usci_b1_layout() {
        assert_eq!(usci_b1::CTL0, usci_b1::CTL1 + 1);
        assert_eq!(usci_b1::IV - usci_b1::BASE, 0x1E);
        assert_eq!(usci_b1::IE & 1, 0);
    }
}
