// Licensed under the Apache-2.0 license

//! Foreground I2C master driver.
//!
//! The controller arms the shared [`I2cBus`] for one transaction, issues the
//! start condition and then sleeps through [`LowPowerWait`] until the
//! interrupt handler records completion. With [`I2cConfig::timeout`] set it
//! busy-polls on the delay provider instead, since a stalled bus raises no
//! interrupt that could end the sleep. Two operations exist, matching the
//! register protocol of the attached device: a two-byte register write and a
//! register read that returns three bytes.

use embedded_hal::delay::DelayNs;

use crate::common::{Logger, NoOpLogger};
use crate::i2c::bus::I2cBus;
use crate::i2c::common::{interrupts, Error, I2cConfig, READ_LEN};
use crate::i2c::traits::{LowPowerWait, UsciI2cHardware};
use crate::i2c::transaction::TransactionState;

/// Completion poll period while a timeout is armed.
const POLL_INTERVAL_NS: u32 = 10_000;

pub struct I2cController<'a, H, W, D, L = NoOpLogger>
where
    H: UsciI2cHardware,
    W: LowPowerWait,
    D: DelayNs,
    L: Logger,
{
    bus: &'a I2cBus<H>,
    pub config: I2cConfig,
    waiter: W,
    pub delay: D,
    pub logger: L,
}

impl<'a, H, W, D> I2cController<'a, H, W, D>
where
    H: UsciI2cHardware,
    W: LowPowerWait,
    D: DelayNs,
{
    pub fn new(bus: &'a I2cBus<H>, config: I2cConfig, waiter: W, delay: D) -> Self {
        Self::with_logger(bus, config, waiter, delay, NoOpLogger)
    }
}

impl<'a, H, W, D, L> I2cController<'a, H, W, D, L>
where
    H: UsciI2cHardware,
    W: LowPowerWait,
    D: DelayNs,
    L: Logger,
{
    pub fn with_logger(
        bus: &'a I2cBus<H>,
        config: I2cConfig,
        waiter: W,
        delay: D,
        logger: L,
    ) -> Self {
        Self {
            bus,
            config,
            waiter,
            delay,
            logger,
        }
    }

    /// Master mode, clock and divisor, slave address, then the interrupt
    /// enables the state machine relies on.
    pub fn init(&mut self) {
        let config = self.config;
        self.bus.with_hardware(|hw| {
            hw.configure(&config);
            hw.set_slave_address(config.slave_address);
            hw.enable_interrupts(interrupts::MASTER);
        });
        self.logger.debug(format_args!(
            "i2c: master {:?} / {} = {} Hz, slave 0x{:02x}",
            config.clock_source,
            config.divisor,
            config.bus_frequency().raw(),
            config.slave_address
        ));
    }

    /// Write `data_byte` to device register `addr_byte`.
    ///
    /// # Errors
    ///
    /// `NoAcknowledge` if the slave rejects a frame, `ArbitrationLost` once
    /// the retry budget is spent, `Timeout` if a configured deadline passes.
    pub fn write(&mut self, addr_byte: u8, data_byte: u8) -> Result<(), Error> {
        self.retry_on_arbitration_loss(|this| this.write_once(addr_byte, data_byte))
    }

    /// Select register `addr_byte`, then read [`READ_LEN`] bytes from the
    /// device in a separate transaction.
    ///
    /// # Errors
    ///
    /// Same as [`Self::write`].
    pub fn read(&mut self, addr_byte: u8) -> Result<[u8; READ_LEN], Error> {
        self.retry_on_arbitration_loss(|this| this.read_once(addr_byte))
    }

    fn write_once(&mut self, addr_byte: u8, data_byte: u8) -> Result<(), Error> {
        self.bus.with_state(|s| s.begin_write(addr_byte, data_byte));
        self.wait_stop_cleared();
        self.bus.with_hardware(|hw| {
            hw.set_transmitter(true);
            hw.send_start();
        });
        self.wait_complete()?;
        self.settle();
        Ok(())
    }

    fn read_once(&mut self, addr_byte: u8) -> Result<[u8; READ_LEN], Error> {
        self.bus.with_state(|s| s.begin_register_select(addr_byte));
        self.wait_stop_cleared();
        self.bus.with_hardware(|hw| {
            hw.set_transmitter(true);
            hw.send_start();
        });
        self.wait_complete()?;

        // The handler released the transmitter along with the stop.
        self.wait_stop_cleared();
        self.bus.with_state(TransactionState::begin_receive);
        self.bus.with_hardware(|hw| hw.send_start());
        self.wait_complete()?;

        self.wait_stop_cleared();
        self.settle();
        Ok(self.bus.received())
    }

    fn retry_on_arbitration_loss<T>(
        &mut self,
        mut op: impl FnMut(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut retries = 0u8;
        loop {
            match op(self) {
                Err(Error::ArbitrationLost) if retries < self.config.arbitration_retries => {
                    retries += 1;
                    self.logger.debug(format_args!(
                        "i2c: arbitration lost, retry {}/{}",
                        retries, self.config.arbitration_retries
                    ));
                    self.bus.with_hardware(|hw| hw.restore_master());
                }
                Err(e) => {
                    self.logger.error(format_args!("i2c: transaction failed: {:?}", e));
                    return Err(e);
                }
                Ok(value) => return Ok(value),
            }
        }
    }

    fn wait_stop_cleared(&self) {
        while self.bus.is_stop_pending() {
            core::hint::spin_loop();
        }
    }

    fn wait_complete(&mut self) -> Result<(), Error> {
        match self.config.timeout {
            None => nb::block!(self.bus.poll_or_wait(&mut self.waiter)),
            Some(timeout) => self.poll_until(timeout.ticks()),
        }
    }

    fn poll_until(&mut self, timeout_ns: u32) -> Result<(), Error> {
        let mut waited = 0u32;
        loop {
            match self.bus.poll_complete() {
                Ok(()) => return Ok(()),
                Err(nb::Error::Other(e)) => return Err(e),
                Err(nb::Error::WouldBlock) => {}
            }
            if waited >= timeout_ns {
                self.bus.abort();
                self.logger.error(format_args!(
                    "i2c: no completion within {} ns, bus stopped",
                    waited
                ));
                return Err(Error::Timeout);
            }
            self.delay.delay_ns(POLL_INTERVAL_NS);
            waited = waited.saturating_add(POLL_INTERVAL_NS);
        }
    }

    fn settle(&mut self) {
        self.delay.delay_ns(self.config.settle_delay.ticks());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i2c::common::{ClockSource, I2cConfigBuilder};
    use crate::i2c::sim::{BusEvent, SimUsci};
    use crate::i2c::transaction::{Direction, Phase};
    use core::cell::Cell;
    use core::fmt;
    use embedded_hal::i2c::NoAcknowledgeSource;

    #[derive(Default)]
    struct RecordingDelay {
        calls: usize,
        total_ns: u64,
    }

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.calls += 1;
            self.total_ns += u64::from(ns);
        }
    }

    #[derive(Default)]
    struct Wakes {
        waits: Cell<u32>,
        completions: Cell<u32>,
    }

    #[derive(Default)]
    struct Lines(Vec<String>);

    impl Logger for Lines {
        fn debug(&mut self, args: fmt::Arguments<'_>) {
            self.0.push(format!("D {args}"));
        }
        fn error(&mut self, args: fmt::Arguments<'_>) {
            self.0.push(format!("E {args}"));
        }
    }

    /// Each wait services exactly one interrupt.
    fn controller<'a>(
        bus: &'a I2cBus<SimUsci>,
        wakes: &'a Wakes,
        config: I2cConfig,
    ) -> I2cController<'a, SimUsci, impl LowPowerWait + 'a, RecordingDelay, Lines> {
        let waiter = move || {
            wakes.waits.set(wakes.waits.get() + 1);
            if bus.on_interrupt() {
                wakes.completions.set(wakes.completions.get() + 1);
            }
        };
        let mut ctrl = I2cController::with_logger(
            bus,
            config,
            waiter,
            RecordingDelay::default(),
            Lines::default(),
        );
        ctrl.init();
        ctrl
    }

    fn sim_with(setup: impl FnOnce(&mut SimUsci)) -> I2cBus<SimUsci> {
        let mut sim = SimUsci::new();
        setup(&mut sim);
        I2cBus::new(sim)
    }

    #[test]
    fn test_init_programs_peripheral() {
        let bus = sim_with(|_| {});
        let wakes = Wakes::default();
        let config = I2cConfigBuilder::new()
            .clock_source(ClockSource::Aclk, fugit::HertzU32::from_raw(32_768))
            .divisor(4)
            .slave_address(0x20)
            .build()
            .unwrap();
        let ctrl = controller(&bus, &wakes, config);

        bus.with_hardware(|hw| {
            assert_eq!(hw.configured(), Some((ClockSource::Aclk, 4)));
            assert_eq!(hw.slave_address(), 0x20);
            assert_eq!(hw.enabled_interrupts(), interrupts::MASTER);
        });
        assert!(ctrl.logger.0[0].contains("slave 0x20"));
    }

    #[test]
    fn test_write_sends_address_then_data() {
        let bus = sim_with(|_| {});
        let wakes = Wakes::default();
        let mut ctrl = controller(&bus, &wakes, I2cConfig::default());

        ctrl.write(0x06, 0x03).unwrap();

        bus.with_hardware(|hw| {
            assert_eq!(
                hw.log(),
                &[
                    BusEvent::Start(Direction::Write),
                    BusEvent::Tx(0x06),
                    BusEvent::Tx(0x03),
                    BusEvent::Stop,
                ]
            );
            assert_eq!(hw.tx_flag_clears(), 1);
        });
        assert_eq!(wakes.completions.get(), 1);
        assert_eq!(ctrl.delay.calls, 1);
        assert_eq!(ctrl.delay.total_ns, 73_746);
        assert_eq!(bus.phase(), Phase::Idle);
    }

    #[test]
    fn test_read_returns_bytes_in_order() {
        let bus = sim_with(|sim| sim.push_slave_bytes(&[0x11, 0x22, 0x33]));
        let wakes = Wakes::default();
        let mut ctrl = controller(&bus, &wakes, I2cConfig::default());

        assert_eq!(ctrl.read(0x05), Ok([0x11, 0x22, 0x33]));

        bus.with_hardware(|hw| {
            assert_eq!(
                hw.log(),
                &[
                    BusEvent::Start(Direction::Write),
                    BusEvent::Tx(0x05),
                    BusEvent::Stop,
                    BusEvent::Start(Direction::Read),
                    BusEvent::Rx(0x11),
                    BusEvent::Rx(0x22),
                    BusEvent::Rx(0x33),
                    BusEvent::Stop,
                ]
            );
            assert!(!hw.started_while_stop_pending());
        });
        // Register select and receive each wake the foreground once.
        assert_eq!(wakes.completions.get(), 2);
        assert_eq!(ctrl.delay.calls, 1);
    }

    #[test]
    fn test_receive_cursor_restarts_each_read() {
        let bus = sim_with(|sim| sim.push_slave_bytes(&[1, 2, 3, 4, 5, 6]));
        let wakes = Wakes::default();
        let mut ctrl = controller(&bus, &wakes, I2cConfig::default());

        assert_eq!(ctrl.read(0x05), Ok([1, 2, 3]));
        assert_eq!(ctrl.read(0x05), Ok([4, 5, 6]));
    }

    #[test]
    fn test_nack_mid_write_stops_and_reports() {
        // Frame 1 is the address frame, frame 2 the register byte.
        let bus = sim_with(|sim| sim.nack_on_frame(2));
        let wakes = Wakes::default();
        let mut ctrl = controller(&bus, &wakes, I2cConfig::default());

        assert_eq!(
            ctrl.write(0x06, 0x03),
            Err(Error::NoAcknowledge(NoAcknowledgeSource::Data))
        );
        bus.with_hardware(|hw| {
            assert_eq!(
                hw.log(),
                &[
                    BusEvent::Start(Direction::Write),
                    BusEvent::Tx(0x06),
                    BusEvent::Stop,
                ]
            );
            hw.clear_log();
        });
        assert_eq!(ctrl.delay.calls, 0);
        assert!(ctrl.logger.0.iter().any(|l| l.starts_with("E ")));

        // The bus is usable again afterwards.
        ctrl.write(0x07, 0x47).unwrap();
        bus.with_hardware(|hw| assert_eq!(hw.log().len(), 4));
    }

    #[test]
    fn test_nack_on_read_address_then_recover() {
        // Frames: start(W), register byte, start(R).
        let bus = sim_with(|sim| {
            sim.nack_on_frame(3);
            sim.push_slave_bytes(&[7, 8, 9]);
        });
        let wakes = Wakes::default();
        let mut ctrl = controller(&bus, &wakes, I2cConfig::default());

        assert_eq!(
            ctrl.read(0x05),
            Err(Error::NoAcknowledge(NoAcknowledgeSource::Address))
        );
        assert_eq!(ctrl.read(0x05), Ok([7, 8, 9]));
    }

    #[test]
    fn test_sequential_writes_wait_for_stop() {
        let bus = sim_with(|sim| sim.set_stop_hold(5));
        let wakes = Wakes::default();
        let mut ctrl = controller(&bus, &wakes, I2cConfig::default());

        for (addr, data) in [(0x06, 0x03), (0x07, 0x47), (0x09, 0x33)] {
            ctrl.write(addr, data).unwrap();
        }

        bus.with_hardware(|hw| {
            assert!(!hw.started_while_stop_pending());
            let stops = hw.log().iter().filter(|e| **e == BusEvent::Stop).count();
            assert_eq!(stops, 3);
            assert_eq!(hw.log().len(), 12);
        });
        assert_eq!(wakes.completions.get(), 3);
    }

    #[test]
    fn test_arbitration_loss_retried() {
        let bus = sim_with(|sim| sim.lose_arbitration(2));
        let wakes = Wakes::default();
        let mut ctrl = controller(&bus, &wakes, I2cConfig::default());

        ctrl.write(0x06, 0x03).unwrap();

        bus.with_hardware(|hw| {
            assert_eq!(hw.master_restores(), 2);
            assert_eq!(
                hw.log(),
                &[
                    BusEvent::Start(Direction::Write),
                    BusEvent::Tx(0x06),
                    BusEvent::Tx(0x03),
                    BusEvent::Stop,
                ]
            );
        });
        let retries = ctrl
            .logger
            .0
            .iter()
            .filter(|l| l.contains("arbitration lost"))
            .count();
        assert_eq!(retries, 2);
    }

    #[test]
    fn test_arbitration_retry_budget_exhausted() {
        let bus = sim_with(|sim| sim.lose_arbitration(5));
        let wakes = Wakes::default();
        let config = I2cConfigBuilder::new()
            .arbitration_retries(2)
            .build()
            .unwrap();
        let mut ctrl = controller(&bus, &wakes, config);

        assert_eq!(ctrl.read(0x05), Err(Error::ArbitrationLost));
        bus.with_hardware(|hw| {
            assert_eq!(hw.master_restores(), 2);
            assert!(hw.log().is_empty());
        });
    }

    #[test]
    fn test_stalled_bus_times_out() {
        let bus = sim_with(SimUsci::freeze);
        let wakes = Wakes::default();
        let config = I2cConfigBuilder::new()
            .timeout(fugit::NanosDurationU32::from_ticks(50_000))
            .build()
            .unwrap();
        let mut ctrl = controller(&bus, &wakes, config);

        assert_eq!(ctrl.write(0x06, 0x03), Err(Error::Timeout));
        // A stalled bus raises nothing, so the deadline runs on the delay alone.
        assert_eq!(wakes.waits.get(), 0);
        assert_eq!(ctrl.delay.calls, 5);
        assert_eq!(ctrl.delay.total_ns, 50_000);
        assert_eq!(bus.phase(), Phase::Idle);
        bus.with_hardware(|hw| {
            assert_eq!(
                hw.log(),
                &[BusEvent::Start(Direction::Write), BusEvent::Stop]
            );
        });
        assert!(ctrl.logger.0.iter().any(|l| l.contains("within 50000 ns")));
    }

    /// Stands in for the interrupt firing during each poll period.
    struct ServicingDelay<'a> {
        bus: &'a I2cBus<SimUsci>,
        calls: usize,
    }

    impl DelayNs for ServicingDelay<'_> {
        fn delay_ns(&mut self, _ns: u32) {
            self.calls += 1;
            self.bus.on_interrupt();
        }
    }

    #[test]
    fn test_timeout_mode_completes_without_sleeping() {
        let bus = sim_with(|sim| sim.push_slave_bytes(&[0x11, 0x22, 0x33]));
        let sleeps = Cell::new(0u32);
        let config = I2cConfigBuilder::new()
            .timeout(fugit::NanosDurationU32::millis(1))
            .build()
            .unwrap();
        let mut ctrl = I2cController::new(
            &bus,
            config,
            || sleeps.set(sleeps.get() + 1),
            ServicingDelay { bus: &bus, calls: 0 },
        );
        ctrl.init();

        assert_eq!(ctrl.write(0x06, 0x03), Ok(()));
        assert_eq!(ctrl.read(0x05), Ok([0x11, 0x22, 0x33]));
        assert_eq!(sleeps.get(), 0);
        assert!(ctrl.delay.calls > 0);
        bus.with_hardware(|hw| {
            assert_eq!(
                hw.log(),
                &[
                    BusEvent::Start(Direction::Write),
                    BusEvent::Tx(0x06),
                    BusEvent::Tx(0x03),
                    BusEvent::Stop,
                    BusEvent::Start(Direction::Write),
                    BusEvent::Tx(0x05),
                    BusEvent::Stop,
                    BusEvent::Start(Direction::Read),
                    BusEvent::Rx(0x11),
                    BusEvent::Rx(0x22),
                    BusEvent::Rx(0x33),
                    BusEvent::Stop,
                ]
            );
        });
    }

    #[test]
    fn test_address_nack_with_first_byte_loaded() {
        // Frame 1 is the address; the register byte is already in TXBUF.
        let bus = sim_with(|sim| sim.nack_on_frame(1));
        let wakes = Wakes::default();
        let mut ctrl = controller(&bus, &wakes, I2cConfig::default());

        assert_eq!(
            ctrl.write(0x06, 0x03),
            Err(Error::NoAcknowledge(NoAcknowledgeSource::Address))
        );
        bus.with_hardware(|hw| {
            assert_eq!(
                hw.log(),
                &[BusEvent::Start(Direction::Write), BusEvent::Stop]
            );
        });
    }
}
