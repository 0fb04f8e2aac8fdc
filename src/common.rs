// Licensed under the Apache-2.0 license

//! Logging sinks shared by the drivers.
//!
//! Drivers take a `Logger` type parameter and default to [`NoOpLogger`], so a
//! build without a console pays nothing for the log statements. On a board with
//! a spare UART, [`UartLogger`] formats each record onto any
//! `embedded_io::Write` sink.

use core::fmt;

/// Minimal leveled logger used by the controller and bring-up code.
///
/// Never call a logger from interrupt context.
pub trait Logger {
    fn debug(&mut self, args: fmt::Arguments<'_>);
    fn error(&mut self, args: fmt::Arguments<'_>);
}

impl<L: Logger + ?Sized> Logger for &mut L {
    fn debug(&mut self, args: fmt::Arguments<'_>) {
        (**self).debug(args);
    }

    fn error(&mut self, args: fmt::Arguments<'_>) {
        (**self).error(args);
    }
}

/// Discards every record.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn debug(&mut self, _args: fmt::Arguments<'_>) {}
    fn error(&mut self, _args: fmt::Arguments<'_>) {}
}

/// Writes `[LEVEL] message\r\n` records to a byte sink, typically a UART.
///
/// Write errors are dropped; logging must never change driver behavior.
pub struct UartLogger<W: embedded_io::Write> {
    writer: W,
}

impl<W: embedded_io::Write> UartLogger<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Give the sink back, e.g. to reuse the UART after bring-up.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn record(&mut self, level: &str, args: fmt::Arguments<'_>) {
        let _ = self.writer.write_all(level.as_bytes());
        let _ = self.writer.write_fmt(args);
        let _ = self.writer.write_all(b"\r\n");
    }
}

impl<W: embedded_io::Write> Logger for UartLogger<W> {
    fn debug(&mut self, args: fmt::Arguments<'_>) {
        self.record("[DEBUG] ", args);
    }

    fn error(&mut self, args: fmt::Arguments<'_>) {
        self.record("[ERROR] ", args);
    }
}
