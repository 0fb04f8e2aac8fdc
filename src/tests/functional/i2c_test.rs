// Licensed under the Apache-2.0 license

//! Driver self-test against the simulated peripheral. Runs on target with the
//! `sim` feature and reports over any `embedded_io::Write` console.

use crate::i2c::bus::I2cBus;
use crate::i2c::common::{Error, I2cConfig};
use crate::i2c::i2c_controller::I2cController;
use crate::i2c::sim::{BusEvent, SimUsci};
use crate::i2c::transaction::Direction;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::NoAcknowledgeSource;
use embedded_io::Write;
use fugit::NanosDurationU32;

struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

pub fn run_i2c_tests<W: Write>(uart: &mut W) {
    let _ = writeln!(uart, "\r\n=== USCI I2C Master Tests ===\r");

    test_register_write(uart);
    test_register_read(uart);
    test_nack_recovery(uart);
    test_arbitration_retry(uart);
    test_completion_timeout(uart);

    let _ = writeln!(uart, "\r\n=== All I2C Tests Passed ===\r");
}

fn run_on<R>(
    sim: SimUsci,
    config: I2cConfig,
    body: impl FnOnce(&mut I2cController<'_, SimUsci, &mut dyn FnMut(), NoDelay>) -> R,
) -> (R, SimUsci) {
    let bus = I2cBus::new(sim);
    let mut service = || {
        bus.on_interrupt();
    };
    let waiter: &mut dyn FnMut() = &mut service;
    let mut controller = I2cController::new(&bus, config, waiter, NoDelay);
    controller.init();
    let result = body(&mut controller);
    let sim = bus.with_hardware(core::mem::take);
    (result, sim)
}

fn test_register_write<W: Write>(uart: &mut W) {
    let _ = write!(uart, "Testing register write... ");

    let (result, sim) = run_on(SimUsci::new(), I2cConfig::default(), |c| {
        c.write(0x06, 0x03)
    });

    assert_eq!(result, Ok(()));
    assert_eq!(
        sim.log(),
        &[
            BusEvent::Start(Direction::Write),
            BusEvent::Tx(0x06),
            BusEvent::Tx(0x03),
            BusEvent::Stop,
        ]
    );

    let _ = writeln!(uart, "PASSED\r");
}

fn test_register_read<W: Write>(uart: &mut W) {
    let _ = write!(uart, "Testing register read... ");

    let mut sim = SimUsci::new();
    sim.push_slave_bytes(&[0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
    let ((first, second), sim) = run_on(sim, I2cConfig::default(), |c| {
        (c.read(0x05), c.read(0x05))
    });

    assert_eq!(first, Ok([0x11, 0x22, 0x33]));
    assert_eq!(second, Ok([0x44, 0x55, 0x66]));
    assert!(!sim.started_while_stop_pending());

    let _ = writeln!(uart, "PASSED\r");
}

fn test_nack_recovery<W: Write>(uart: &mut W) {
    let _ = write!(uart, "Testing NACK recovery... ");

    let mut sim = SimUsci::new();
    sim.nack_on_frame(1);
    let ((failed, recovered), sim) = run_on(sim, I2cConfig::default(), |c| {
        (c.write(0x06, 0x03), c.write(0x06, 0x03))
    });

    assert_eq!(
        failed,
        Err(Error::NoAcknowledge(NoAcknowledgeSource::Address))
    );
    assert_eq!(recovered, Ok(()));
    assert_eq!(sim.log().len(), 6);

    let _ = writeln!(uart, "PASSED\r");
}

fn test_arbitration_retry<W: Write>(uart: &mut W) {
    let _ = write!(uart, "Testing arbitration retry... ");

    let mut sim = SimUsci::new();
    sim.lose_arbitration(1);
    let (result, sim) = run_on(sim, I2cConfig::default(), |c| c.write(0x07, 0x47));

    assert_eq!(result, Ok(()));
    assert_eq!(sim.master_restores(), 1);

    let _ = writeln!(uart, "PASSED\r");
}

fn test_completion_timeout<W: Write>(uart: &mut W) {
    let _ = write!(uart, "Testing completion timeout... ");

    let mut sim = SimUsci::new();
    sim.freeze();
    let config = I2cConfig {
        timeout: Some(NanosDurationU32::micros(100)),
        ..I2cConfig::default()
    };
    let (result, sim) = run_on(sim, config, |c| c.read(0x05));

    assert_eq!(result, Err(Error::Timeout));
    assert_eq!(
        sim.log(),
        &[BusEvent::Start(Direction::Write), BusEvent::Stop]
    );

    let _ = writeln!(uart, "PASSED\r");
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    #[derive(Default)]
    struct Console(Vec<u8>);

    impl embedded_io::ErrorType for Console {
        type Error = Infallible;
    }

    impl Write for Console {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn test_functional_suite_passes() {
        let mut console = Console::default();
        run_i2c_tests(&mut console);

        let text = String::from_utf8(console.0).unwrap();
        assert_eq!(text.matches("PASSED").count(), 5);
        assert!(text.ends_with("=== All I2C Tests Passed ===\r\n"));
    }
}
