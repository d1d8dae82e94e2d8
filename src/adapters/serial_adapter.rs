//! Serial transport for RS-232/USB-serial controllers
//!
//! Wraps the `serialport` crate with a blocking, line-oriented
//! [`Transport`](super::Transport) implementation. Reads accumulate bytes until
//! the reply delimiter arrives or the overall timeout expires.

use super::Transport;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Builder for [`SerialTransport`].
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use rust_plogic::adapters::SerialTransportBuilder;
///
/// let transport = SerialTransportBuilder::new("/dev/ttyUSB0", 115200)
///     .with_timeout(Duration::from_millis(250))
///     .open()?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct SerialTransportBuilder {
    port_name: String,
    baud_rate: u32,
    timeout: Duration,
    line_terminator: String,
    response_delimiter: char,
}

impl SerialTransportBuilder {
    /// Create a new builder with required parameters
    ///
    /// Default configuration:
    /// * timeout: 500 ms
    /// * line_terminator: "\r"
    /// * response_delimiter: '\r'
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            timeout: Duration::from_millis(500),
            line_terminator: "\r".to_string(),
            response_delimiter: '\r',
        }
    }

    /// Set the overall reply timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the line terminator appended to every command
    pub fn with_line_terminator(mut self, terminator: impl Into<String>) -> Self {
        self.line_terminator = terminator.into();
        self
    }

    /// Set the character that ends a reply
    pub fn with_response_delimiter(mut self, delimiter: char) -> Self {
        self.response_delimiter = delimiter;
        self
    }

    /// Open the port with 8N1, no flow control.
    pub fn open(self) -> io::Result<SerialTransport> {
        let port = serialport::new(&self.port_name, self.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            // Internal read timeout; the overall deadline is enforced in read_line
            .timeout(Duration::from_millis(20))
            .open()
            .map_err(io::Error::from)?;

        debug!(
            "Serial port '{}' opened at {} baud",
            self.port_name, self.baud_rate
        );

        Ok(SerialTransport {
            port,
            port_name: self.port_name,
            baud_rate: self.baud_rate,
            timeout: self.timeout,
            line_terminator: self.line_terminator,
            response_delimiter: self.response_delimiter,
        })
    }
}

/// Blocking serial transport.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
    port_name: String,
    baud_rate: u32,
    timeout: Duration,
    line_terminator: String,
    response_delimiter: char,
}

impl SerialTransport {
    /// Human-readable description of the port.
    pub fn info(&self) -> String {
        format!("SerialTransport({} @ {} baud)", self.port_name, self.baud_rate)
    }

    /// Discard anything left in the receive buffer, e.g. a late reply from a
    /// previous command that timed out.
    pub fn clear_input(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(io::Error::from)
    }
}

impl Transport for SerialTransport {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let command = format!("{}{}", line, self.line_terminator);
        trace!("Sending '{}'", command.escape_default());
        self.port.write_all(command.as_bytes())?;
        self.port.flush()
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut response = String::new();
        let mut buffer = [0u8; 1];
        let start = Instant::now();

        loop {
            if start.elapsed() > self.timeout {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("Serial read timeout after {:?}", self.timeout),
                ));
            }

            match self.port.read(&mut buffer) {
                Ok(1) => {
                    let ch = buffer[0] as char;
                    if ch == self.response_delimiter {
                        // Skip a bare delimiter left over from the previous reply
                        if response.trim().is_empty() {
                            response.clear();
                            continue;
                        }
                        break;
                    }
                    response.push(ch);
                }
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "Unexpected EOF from serial port",
                    ));
                }
                Ok(_) => {
                    return Err(io::Error::other(
                        "read into single-byte buffer returned more than one byte",
                    ));
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(e),
            }
        }

        let response = response.trim().to_string();
        trace!("Received '{}'", response.escape_default());
        Ok(response)
    }
}
