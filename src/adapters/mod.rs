//! Bus transports.
//!
//! The card driver only needs a line-oriented request/response channel. The
//! [`Transport`] trait is that seam: the real serial port and the simulated
//! card both implement it, and the driver never touches anything else.
//!
//! A transport shared by several cards must serialize access itself (one
//! command in flight at a time); the driver performs no locking.

use std::io;
use std::time::Duration;

#[cfg(feature = "instrument_serial")]
pub mod serial_adapter;
#[cfg(feature = "instrument_serial")]
pub use serial_adapter::{SerialTransport, SerialTransportBuilder};

pub mod mock_adapter;
pub use mock_adapter::SimulatedCard;

/// Line-oriented, half-duplex command channel.
pub trait Transport {
    /// Send one command line. The implementation appends its own terminator.
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Read one reply line, trimmed of its terminator and surrounding whitespace.
    fn read_line(&mut self) -> io::Result<String>;

    /// Send a command, wait `settle`, then read its reply.
    fn query(&mut self, line: &str, settle: Duration) -> io::Result<String> {
        self.write_line(line)?;
        if !settle.is_zero() {
            std::thread::sleep(settle);
        }
        self.read_line()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        (**self).write_line(line)
    }

    fn read_line(&mut self) -> io::Result<String> {
        (**self).read_line()
    }

    fn query(&mut self, line: &str, settle: Duration) -> io::Result<String> {
        (**self).query(line, settle)
    }
}
