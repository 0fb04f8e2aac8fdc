// Licensed under the Apache-2.0 license

//! Transaction state and the interrupt-side transition function.
//!
//! A transaction is one start..stop sequence on the bus. The foreground arms
//! it with one of the `begin_*` methods, after which only [`TransactionState::step`]
//! mutates the counters, the receive cursor and the phase, one peripheral
//! event at a time. `step` does not touch hardware: it returns a [`Reaction`]
//! that the bus applies to the registers.
//!
//! Receive ordering matters. The stop condition has to be requested while the
//! last byte is still being clocked in, so it is issued on the event that
//! leaves exactly one byte outstanding, and completion is only recorded once
//! that last byte has been captured.

use crate::i2c::common::{Error, READ_LEN};
use embedded_hal::i2c::NoAcknowledgeSource;

/// Bytes loaded by a register write: address, then value.
const WRITE_LEN: u8 = 2;

/// Bytes loaded by the register-select half of a read.
const SELECT_LEN: u8 = 1;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Write,
    Read,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Next TX-ready loads the register address.
    SendingAddress,
    /// Next TX-ready loads the data byte.
    SendingData,
    /// Last byte handed to the shifter; next TX-ready ends the transaction.
    Flushing,
    ReceivingNotLast,
    /// Stop requested, final byte in flight.
    ReceivingLast,
    Done,
}

impl Phase {
    fn is_transmitting(self) -> bool {
        matches!(self, Self::SendingAddress | Self::SendingData | Self::Flushing)
    }

    fn is_receiving(self) -> bool {
        matches!(self, Self::ReceivingNotLast | Self::ReceivingLast)
    }
}

/// Peripheral events as seen by the state machine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Event {
    TxReady,
    RxReady(u8),
    Nack,
    ArbitrationLost,
    /// Start/stop detection and empty vectors; acknowledged, no state change.
    Other,
}

/// Register actions requested by one step, applied in field order.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Reaction {
    pub transmit: Option<u8>,
    pub stop: bool,
    pub clear_tx_flag: bool,
    pub release_transmitter: bool,
    /// Completion was recorded; the foreground has to be woken.
    pub complete: bool,
}

impl Reaction {
    const NONE: Self = Self {
        transmit: None,
        stop: false,
        clear_tx_flag: false,
        release_transmitter: false,
        complete: false,
    };
}

pub struct TransactionState {
    direction: Direction,
    phase: Phase,
    tx_remaining: u8,
    rx_remaining: u8,
    addr_byte: u8,
    data_byte: u8,
    rx_data: [u8; READ_LEN],
    rx_cursor: usize,
    loaded: u8,
    outcome: Option<Result<(), Error>>,
}

impl Default for TransactionState {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            direction: Direction::Write,
            phase: Phase::Idle,
            tx_remaining: 0,
            rx_remaining: 0,
            addr_byte: 0,
            data_byte: 0,
            rx_data: [0; READ_LEN],
            rx_cursor: 0,
            loaded: 0,
            outcome: None,
        }
    }

    fn reset(&mut self, direction: Direction, phase: Phase) {
        *self = Self {
            direction,
            phase,
            ..Self::new()
        };
    }

    /// Arm a two-byte register write.
    pub fn begin_write(&mut self, addr_byte: u8, data_byte: u8) {
        self.reset(Direction::Write, Phase::SendingAddress);
        self.addr_byte = addr_byte;
        self.data_byte = data_byte;
        self.tx_remaining = WRITE_LEN;
    }

    /// Arm the one-byte register select that precedes a read.
    pub fn begin_register_select(&mut self, addr_byte: u8) {
        self.reset(Direction::Read, Phase::SendingData);
        self.data_byte = addr_byte;
        self.tx_remaining = SELECT_LEN;
    }

    /// Arm the receive half of a read. Clears the destination and the cursor.
    pub fn begin_receive(&mut self) {
        self.reset(Direction::Read, Phase::ReceivingNotLast);
        self.rx_remaining = READ_LEN as u8;
    }

    /// Advance by one peripheral event.
    pub fn step(&mut self, event: Event) -> Reaction {
        match (self.phase, event) {
            (Phase::SendingAddress, Event::TxReady) => {
                self.tx_remaining = self.tx_remaining.saturating_sub(1);
                self.loaded += 1;
                self.phase = Phase::SendingData;
                Reaction {
                    transmit: Some(self.addr_byte),
                    ..Reaction::NONE
                }
            }
            (Phase::SendingData, Event::TxReady) => {
                self.tx_remaining = self.tx_remaining.saturating_sub(1);
                self.loaded += 1;
                self.phase = Phase::Flushing;
                Reaction {
                    transmit: Some(self.data_byte),
                    ..Reaction::NONE
                }
            }
            (Phase::Flushing, Event::TxReady) => {
                self.finish(Ok(()));
                Reaction {
                    stop: true,
                    clear_tx_flag: true,
                    release_transmitter: self.direction == Direction::Read,
                    complete: true,
                    ..Reaction::NONE
                }
            }
            (Phase::ReceivingNotLast, Event::RxReady(byte)) => {
                self.store(byte);
                if self.rx_remaining == 1 {
                    self.phase = Phase::ReceivingLast;
                    Reaction {
                        stop: true,
                        ..Reaction::NONE
                    }
                } else {
                    Reaction::NONE
                }
            }
            (Phase::ReceivingLast, Event::RxReady(byte)) => {
                self.store(byte);
                self.finish(Ok(()));
                Reaction {
                    complete: true,
                    ..Reaction::NONE
                }
            }
            (phase, Event::Nack) if phase.is_transmitting() || phase.is_receiving() => {
                // TX-ready fires right after the start, so the first byte sits
                // in TXBUF while the address frame is still being acknowledged.
                let source = if phase.is_receiving() || self.loaded <= 1 {
                    NoAcknowledgeSource::Address
                } else {
                    NoAcknowledgeSource::Data
                };
                self.finish(Err(Error::NoAcknowledge(source)));
                Reaction {
                    stop: true,
                    clear_tx_flag: true,
                    complete: true,
                    ..Reaction::NONE
                }
            }
            (phase, Event::ArbitrationLost) if phase.is_transmitting() || phase.is_receiving() => {
                self.finish(Err(Error::ArbitrationLost));
                Reaction {
                    complete: true,
                    ..Reaction::NONE
                }
            }
            _ => Reaction::NONE,
        }
    }

    fn store(&mut self, byte: u8) {
        self.rx_remaining = self.rx_remaining.saturating_sub(1);
        // The cursor is bounded by rx_remaining, which starts at READ_LEN.
        if let Some(slot) = self.rx_data.get_mut(self.rx_cursor) {
            *slot = byte;
            self.rx_cursor += 1;
        }
    }

    fn finish(&mut self, outcome: Result<(), Error>) {
        self.phase = Phase::Done;
        self.outcome = Some(outcome);
    }

    /// Consume the completion permit. Returns `None` while the transaction is
    /// still running.
    pub fn take_outcome(&mut self) -> Option<Result<(), Error>> {
        let outcome = self.outcome.take();
        if outcome.is_some() {
            self.phase = Phase::Idle;
        }
        outcome
    }

    /// Drop the transaction without completion.
    pub fn abort(&mut self) {
        self.phase = Phase::Idle;
        self.outcome = None;
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn tx_remaining(&self) -> u8 {
        self.tx_remaining
    }

    #[must_use]
    pub fn rx_remaining(&self) -> u8 {
        self.rx_remaining
    }

    #[must_use]
    pub fn rx_cursor(&self) -> usize {
        self.rx_cursor
    }

    #[must_use]
    pub fn received(&self) -> [u8; READ_LEN] {
        self.rx_data
    }
}
