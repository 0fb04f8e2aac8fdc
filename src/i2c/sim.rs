// Licensed under the Apache-2.0 license

//! Simulated USCI_B peripheral with an attached slave.
//!
//! `SimUsci` models just enough of the controller for the driver to run
//! unchanged off-target: interrupt flags with vector priority, the start and
//! stop conditions, the transmit and receive buffers, and a slave that ACKs
//! every frame and answers reads from a byte queue. Everything that reaches
//! the wire is recorded in an event log.
//!
//! Timing is event driven. As on the USCI, TX-ready is raised right after a
//! transmit start, and the acknowledge of the frame on the wire is settled
//! when the next byte is loaded: an ACK shifts that byte out, a NACK drops
//! it. A started receive completes the next time the vector is read, and a
//! stop stays pending for a configurable number of status polls.

use heapless::{Deque, Vec};

use crate::i2c::common::{interrupts, ClockSource, I2cConfig, I2cVector};
use crate::i2c::traits::UsciI2cHardware;
use crate::i2c::transaction::Direction;

const LOG_DEPTH: usize = 64;
const SLAVE_QUEUE_DEPTH: usize = 16;

/// Byte returned once the slave queue runs dry (released SDA).
const IDLE_LINE: u8 = 0xFF;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BusEvent {
    Start(Direction),
    Tx(u8),
    Rx(u8),
    Stop,
}

pub struct SimUsci {
    log: Vec<BusEvent, LOG_DEPTH>,
    slave_bytes: Deque<u8, SLAVE_QUEUE_DEPTH>,
    ifg: u8,
    ie: u8,
    rxbuf: u8,
    transmitter: bool,
    master: bool,
    active: bool,
    rx_in_flight: bool,
    /// Address or data frame `frame` is on the wire, acknowledge pending.
    tx_in_flight: bool,
    stop_requested: bool,
    stop_pending_polls: u8,
    stop_hold: u8,
    frame: usize,
    nack_on_frame: Option<usize>,
    arbitration_losses: u8,
    start_while_stop_pending: bool,
    frozen: bool,
    configured: Option<(ClockSource, u16)>,
    slave_address: u8,
    tx_flag_clears: usize,
    master_restores: usize,
}

impl Default for SimUsci {
    fn default() -> Self {
        Self::new()
    }
}

impl SimUsci {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            log: Vec::new(),
            slave_bytes: Deque::new(),
            ifg: 0,
            ie: 0,
            rxbuf: 0,
            transmitter: false,
            master: true,
            active: false,
            rx_in_flight: false,
            tx_in_flight: false,
            stop_requested: false,
            stop_pending_polls: 0,
            stop_hold: 1,
            frame: 0,
            nack_on_frame: None,
            arbitration_losses: 0,
            start_while_stop_pending: false,
            frozen: false,
            configured: None,
            slave_address: 0,
            tx_flag_clears: 0,
            master_restores: 0,
        }
    }

    /// Queue bytes the slave returns on subsequent reads.
    pub fn push_slave_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            let _ = self.slave_bytes.push_back(byte);
        }
    }

    /// Number of status polls a stop condition stays pending.
    pub fn set_stop_hold(&mut self, polls: u8) {
        self.stop_hold = polls;
    }

    /// NACK the given frame, counting from 1 across the simulator's lifetime.
    /// Address frames count.
    pub fn nack_on_frame(&mut self, frame: usize) {
        self.nack_on_frame = Some(frame);
    }

    /// Lose arbitration on the next `count` start conditions.
    pub fn lose_arbitration(&mut self, count: u8) {
        self.arbitration_losses = count;
    }

    /// Stop raising interrupts, as with SCL held low by a stuck slave.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    #[must_use]
    pub fn log(&self) -> &[BusEvent] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// A start was requested while a stop was still pending.
    #[must_use]
    pub fn started_while_stop_pending(&self) -> bool {
        self.start_while_stop_pending
    }

    #[must_use]
    pub fn configured(&self) -> Option<(ClockSource, u16)> {
        self.configured
    }

    #[must_use]
    pub fn slave_address(&self) -> u8 {
        self.slave_address
    }

    #[must_use]
    pub fn enabled_interrupts(&self) -> u8 {
        self.ie
    }

    #[must_use]
    pub fn is_master(&self) -> bool {
        self.master
    }

    #[must_use]
    pub fn tx_flag_clears(&self) -> usize {
        self.tx_flag_clears
    }

    #[must_use]
    pub fn master_restores(&self) -> usize {
        self.master_restores
    }

    fn record(&mut self, event: BusEvent) {
        let _ = self.log.push(event);
    }

    /// Advance the frame counter. Returns `true` if the slave NACKs it.
    fn next_frame(&mut self) -> bool {
        self.frame += 1;
        self.nack_on_frame == Some(self.frame)
    }

    /// Settle the acknowledge of the transmit frame on the wire.
    fn frame_acked(&mut self) -> bool {
        let acked = !(self.tx_in_flight && self.nack_on_frame == Some(self.frame));
        self.tx_in_flight = false;
        acked
    }

    fn put_stop(&mut self) {
        self.record(BusEvent::Stop);
        self.active = false;
        // The last frame's acknowledge comes after the stop request.
        self.tx_in_flight = false;
        self.stop_requested = false;
        self.stop_pending_polls = self.stop_hold;
    }

    /// Complete the receive in progress, followed by a deferred stop.
    fn land_rx(&mut self) {
        if !self.rx_in_flight {
            return;
        }
        self.rx_in_flight = false;
        let byte = self.slave_bytes.pop_front().unwrap_or(IDLE_LINE);
        self.frame += 1;
        self.rxbuf = byte;
        self.record(BusEvent::Rx(byte));
        self.ifg |= interrupts::RX;
        if self.stop_requested {
            self.put_stop();
        }
    }
}

impl UsciI2cHardware for SimUsci {
    fn configure(&mut self, config: &I2cConfig) {
        self.configured = Some((config.clock_source, config.divisor));
        self.ifg = 0;
        self.ie = 0;
        self.master = true;
        self.active = false;
        self.rx_in_flight = false;
        self.tx_in_flight = false;
        self.stop_requested = false;
    }

    fn set_slave_address(&mut self, address: u8) {
        self.slave_address = address;
    }

    fn enable_interrupts(&mut self, mask: u8) {
        self.ie |= mask;
    }

    fn set_transmitter(&mut self, transmit: bool) {
        self.transmitter = transmit;
    }

    fn send_start(&mut self) {
        if self.stop_pending_polls > 0 || self.stop_requested {
            self.start_while_stop_pending = true;
        }
        if !self.master {
            return;
        }
        if self.arbitration_losses > 0 {
            self.arbitration_losses -= 1;
            self.master = false;
            self.ifg |= interrupts::ARBITRATION_LOST;
            return;
        }

        let direction = if self.transmitter {
            Direction::Write
        } else {
            Direction::Read
        };
        self.record(BusEvent::Start(direction));
        self.active = true;
        // A start clears a stale NACK.
        self.ifg &= !interrupts::NACK;
        if self.frozen {
            return;
        }
        if self.transmitter {
            self.frame += 1;
            self.tx_in_flight = true;
            self.ifg |= interrupts::TX;
        } else if self.next_frame() {
            self.ifg |= interrupts::NACK;
        } else {
            self.rx_in_flight = true;
        }
    }

    fn send_stop(&mut self) {
        if self.rx_in_flight && !self.frozen {
            self.stop_requested = true;
        } else {
            self.rx_in_flight = false;
            self.put_stop();
        }
    }

    fn is_stop_pending(&mut self) -> bool {
        if self.stop_requested {
            return true;
        }
        if self.stop_pending_polls > 0 {
            self.stop_pending_polls -= 1;
            return true;
        }
        false
    }

    fn write_tx(&mut self, byte: u8) {
        if !self.frame_acked() {
            self.ifg |= interrupts::NACK;
            return;
        }
        self.record(BusEvent::Tx(byte));
        self.frame += 1;
        self.tx_in_flight = true;
        self.ifg |= interrupts::TX;
    }

    fn read_rx(&mut self) -> u8 {
        self.ifg &= !interrupts::RX;
        if self.active && !self.transmitter && !self.stop_requested {
            self.rx_in_flight = true;
        }
        self.rxbuf
    }

    fn clear_tx_flag(&mut self) {
        self.ifg &= !interrupts::TX;
        self.tx_flag_clears += 1;
    }

    fn interrupt_vector(&mut self) -> I2cVector {
        if self.frozen {
            return I2cVector::None;
        }
        self.land_rx();

        let pending = self.ifg & self.ie;
        let (flag, vector) = [
            (interrupts::ARBITRATION_LOST, I2cVector::ArbitrationLost),
            (interrupts::NACK, I2cVector::NackReceived),
            (interrupts::START, I2cVector::StartReceived),
            (interrupts::STOP, I2cVector::StopReceived),
            (interrupts::RX, I2cVector::RxReady),
            (interrupts::TX, I2cVector::TxReady),
        ]
        .into_iter()
        .find(|(flag, _)| pending & flag != 0)
        .unwrap_or((0, I2cVector::None));
        self.ifg &= !flag;
        vector
    }

    fn restore_master(&mut self) {
        self.master = true;
        self.master_restores += 1;
    }
}
