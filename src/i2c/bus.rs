// Licensed under the Apache-2.0 license

//! Shared bus object: the peripheral handle and the transaction state behind
//! one critical-section mutex.
//!
//! The board places a single `I2cBus` in a `static` and calls
//! [`I2cBus::on_interrupt`] from the USCI_B1 vector. The foreground driver
//! borrows the same bus. Every access from either side happens inside a
//! critical section, so the handler never observes a half-armed transaction
//! and the foreground never observes completion before the handler's final
//! register writes.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::i2c::common::{Error, I2cVector, READ_LEN};
use crate::i2c::traits::{LowPowerWait, UsciI2cHardware};
use crate::i2c::transaction::{Event, Phase, Reaction, TransactionState};

struct Shared<H> {
    hardware: H,
    state: TransactionState,
}

pub struct I2cBus<H> {
    inner: Mutex<RefCell<Shared<H>>>,
}

impl<H: UsciI2cHardware> I2cBus<H> {
    pub const fn new(hardware: H) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Shared {
                hardware,
                state: TransactionState::new(),
            })),
        }
    }

    /// Service one peripheral event.
    ///
    /// Returns `true` when this call recorded completion; the interrupt glue
    /// then clears the low-power bits in the saved status register so the
    /// foreground resumes.
    pub fn on_interrupt(&self) -> bool {
        critical_section::with(|cs| {
            let mut shared = self.inner.borrow_ref_mut(cs);
            let Shared { hardware, state } = &mut *shared;

            let event = match hardware.interrupt_vector() {
                I2cVector::TxReady => Event::TxReady,
                I2cVector::RxReady => Event::RxReady(hardware.read_rx()),
                I2cVector::NackReceived => Event::Nack,
                I2cVector::ArbitrationLost => Event::ArbitrationLost,
                I2cVector::None | I2cVector::StartReceived | I2cVector::StopReceived => {
                    Event::Other
                }
            };

            let reaction = state.step(event);
            Self::apply(hardware, reaction);
            reaction.complete
        })
    }

    fn apply(hardware: &mut H, reaction: Reaction) {
        if let Some(byte) = reaction.transmit {
            hardware.write_tx(byte);
        }
        if reaction.stop {
            hardware.send_stop();
        }
        if reaction.clear_tx_flag {
            hardware.clear_tx_flag();
        }
        if reaction.release_transmitter {
            hardware.set_transmitter(false);
        }
    }

    /// Run `f` on the peripheral inside a critical section.
    pub fn with_hardware<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs).hardware))
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        critical_section::with(|cs| self.inner.borrow_ref(cs).state.phase())
    }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut TransactionState) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs).state))
    }

    pub(crate) fn is_stop_pending(&self) -> bool {
        self.with_hardware(|hw| hw.is_stop_pending())
    }

    /// `WouldBlock` until the handler records completion. A returned outcome
    /// consumes the completion permit.
    pub(crate) fn poll_complete(&self) -> nb::Result<(), Error> {
        match self.with_state(TransactionState::take_outcome) {
            None => Err(nb::Error::WouldBlock),
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => Err(nb::Error::Other(e)),
        }
    }

    /// [`Self::poll_complete`], suspending through `waiter` while nothing is
    /// recorded. Check and suspension share one critical section, so a
    /// completion landing between them still ends the sleep.
    pub(crate) fn poll_or_wait<W: LowPowerWait>(&self, waiter: &mut W) -> nb::Result<(), Error> {
        critical_section::with(|_| {
            let polled = self.poll_complete();
            if polled == Err(nb::Error::WouldBlock) {
                waiter.wait_for_interrupt();
            }
            polled
        })
    }

    pub(crate) fn received(&self) -> [u8; READ_LEN] {
        critical_section::with(|cs| self.inner.borrow_ref(cs).state.received())
    }

    /// Stop the bus and drop the transaction without completion.
    pub(crate) fn abort(&self) {
        critical_section::with(|cs| {
            let mut shared = self.inner.borrow_ref_mut(cs);
            shared.hardware.send_stop();
            shared.state.abort();
        });
    }
}
