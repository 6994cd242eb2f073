use std::io::{self, Read, Write};

use serialport::SerialPort;

use crate::LinkChannel;
use crate::link::LinkConfig;

/// Serial-port transport to the arm's motion controller.
///
/// Wraps the platform serial device behind [`LinkChannel`]. The
/// configured timeout applies to each blocking read; a read that expires
/// surfaces as a short byte count, not an error, so the protocol layer
/// sees exactly one timeout shape across real and scripted channels.
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
    port_name: String,
}

impl SerialChannel {
    /// Open the device described by `config`.
    pub fn open(config: &LinkConfig) -> Result<Self, serialport::Error> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.read_timeout)
            .open()?;
        Ok(Self {
            port,
            port_name: config.port.clone(),
        })
    }
}

impl LinkChannel for SerialChannel {
    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                // The timeout applies per read call; a trickling frame
                // restarts the window with each chunk that arrives.
                Err(err) if err.kind() == io::ErrorKind::TimedOut => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(filled)
    }
}

impl std::fmt::Debug for SerialChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialChannel")
            .field("port", &self.port_name)
            .finish()
    }
}
