//! Byte-oriented link used by the serial realization.
//!
//! [`SerialDecisionTransport`](super::serial::SerialDecisionTransport) is
//! generic over [`ByteLink`], so the exchange logic runs unchanged against
//! the UART on the board and against in-memory links in tests.

use crate::drivers::hw_init::{self, HwInitError};

/// Byte-oriented, non-blocking channel.
pub trait ByteLink {
    /// Error type for this link.
    type Error: core::fmt::Debug;

    /// Read up to `buf.len()` bytes into `buf`.
    /// Returns 0 if no data is available (non-blocking).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write `data`. Returns the number of bytes actually accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Wait until buffered output has left the device.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Check if received data is waiting.
    fn available(&self) -> bool;
}

/// A link with nobody on the other end: writes vanish, reads stay empty.
pub struct NullLink;

impl ByteLink for NullLink {
    type Error = ();

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, ()> {
        Ok(0)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn available(&self) -> bool {
        false
    }
}

/// UART link to the companion board.
pub struct UartLink {
    port: i32,
}

impl UartLink {
    /// Install the UART driver on `port` and route it to the link pins.
    pub fn open(port: i32, baud_rate: u32) -> Result<Self, HwInitError> {
        hw_init::init_uart(port, baud_rate)?;
        Ok(Self { port })
    }
}

impl ByteLink for UartLink {
    type Error = i32;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, i32> {
        hw_init::uart_read(self.port, buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, i32> {
        hw_init::uart_write(self.port, data)
    }

    fn flush(&mut self) -> Result<(), i32> {
        hw_init::uart_flush_tx(self.port)
    }

    fn available(&self) -> bool {
        hw_init::uart_buffered_len(self.port) > 0
    }
}
