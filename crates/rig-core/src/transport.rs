//! Byte transports to the rig
//!
//! A [`Transport`] moves raw bytes; it knows nothing about frames. Reads are
//! bounded by a caller-supplied timeout and report [`RigError::Timeout`] when
//! nothing arrives in time.

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use rig_protocol::caps::{Handshake, Parity, PortCaps, PortType};
use rig_protocol::RigError;
use serialport::{ClearBuffer, DataBits, FlowControl, SerialPort, StopBits};
use tracing::{debug, info};

/// Blocking byte channel to a device
pub trait Transport: Send {
    /// Write every byte of `data`
    fn write(&mut self, data: &[u8]) -> Result<(), RigError>;

    /// Read whatever is available into `buf`, waiting up to `timeout`
    ///
    /// Returns the number of bytes read (at least one) or
    /// [`RigError::Timeout`] if nothing arrived.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, RigError>;

    /// Discard any input that has not been read yet
    fn flush_input(&mut self) -> Result<(), RigError>;

    /// Release the underlying device
    fn close(&mut self) -> Result<(), RigError> {
        Ok(())
    }

    /// Human-readable description for logs
    fn description(&self) -> String;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<(), RigError> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, RigError> {
        (**self).read(buf, timeout)
    }

    fn flush_input(&mut self) -> Result<(), RigError> {
        (**self).flush_input()
    }

    fn close(&mut self) -> Result<(), RigError> {
        (**self).close()
    }

    fn description(&self) -> String {
        (**self).description()
    }
}

fn serial_error(e: serialport::Error) -> RigError {
    match e.kind() {
        serialport::ErrorKind::Io(ErrorKind::TimedOut) => RigError::Timeout,
        _ => RigError::Io(e.to_string()),
    }
}

/// Serial line settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub path: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
    pub handshake: Handshake,
}

impl SerialSettings {
    /// Settings for `path` taken from a model's port parameters
    ///
    /// The highest supported rate is used unless `baud_rate` overrides it.
    pub fn from_caps(path: &str, port: &PortCaps, baud_rate: Option<u32>) -> Self {
        Self {
            path: path.to_string(),
            baud_rate: baud_rate.unwrap_or(port.serial_rate_max),
            data_bits: port.data_bits,
            stop_bits: port.stop_bits,
            parity: port.parity,
            handshake: port.handshake,
        }
    }
}

/// Serial port transport
pub struct SerialTransport {
    path: String,
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open a serial port
    pub fn open(settings: &SerialSettings) -> Result<Self, RigError> {
        let data_bits = match settings.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            8 => DataBits::Eight,
            other => return Err(RigError::Config(format!("{} data bits", other))),
        };
        let stop_bits = match settings.stop_bits {
            1 => StopBits::One,
            2 => StopBits::Two,
            other => return Err(RigError::Config(format!("{} stop bits", other))),
        };
        let parity = match settings.parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        };
        let flow_control = match settings.handshake {
            Handshake::None => FlowControl::None,
            Handshake::Software => FlowControl::Software,
            Handshake::Hardware => FlowControl::Hardware,
        };

        let port = serialport::new(&settings.path, settings.baud_rate)
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(parity)
            .flow_control(flow_control)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(serial_error)?;

        info!(
            "Opened serial port {} at {} baud",
            settings.path, settings.baud_rate
        );

        Ok(Self {
            path: settings.path.clone(),
            port,
        })
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, data: &[u8]) -> Result<(), RigError> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, RigError> {
        self.port.set_timeout(timeout).map_err(serial_error)?;
        match self.port.read(buf) {
            Ok(0) => Err(RigError::Timeout),
            Ok(n) => Ok(n),
            Err(e) => Err(e.into()),
        }
    }

    fn flush_input(&mut self) -> Result<(), RigError> {
        self.port.clear(ClearBuffer::Input).map_err(serial_error)
    }

    fn description(&self) -> String {
        self.path.clone()
    }
}

/// TCP transport for network-attached rigs and serial servers
pub struct TcpTransport {
    addr: String,
    stream: TcpStream,
}

impl TcpTransport {
    /// Connect to `addr` (`host:port`)
    pub fn connect(addr: &str, timeout: Duration) -> Result<Self, RigError> {
        let sock = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| RigError::Config(format!("cannot resolve '{}'", addr)))?;
        let stream = TcpStream::connect_timeout(&sock, timeout)?;
        stream.set_nodelay(true)?;
        info!("Connected to {}", addr);
        Ok(Self {
            addr: addr.to_string(),
            stream,
        })
    }
}

impl Transport for TcpTransport {
    fn write(&mut self, data: &[u8]) -> Result<(), RigError> {
        self.stream.write_all(data)?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, RigError> {
        // A zero duration would mean "block forever" to the socket
        let timeout = timeout.max(Duration::from_millis(1));
        self.stream.set_read_timeout(Some(timeout))?;
        match self.stream.read(buf) {
            Ok(0) => Err(RigError::Io(format!("{} closed the connection", self.addr))),
            Ok(n) => Ok(n),
            Err(e) => Err(e.into()),
        }
    }

    fn flush_input(&mut self) -> Result<(), RigError> {
        self.stream.set_nonblocking(true)?;
        let mut scratch = [0u8; 256];
        let result = loop {
            match self.stream.read(&mut scratch) {
                Ok(0) => break Ok(()),
                Ok(n) => debug!("Discarded {} stale bytes from {}", n, self.addr),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break Ok(()),
                Err(e) => break Err(e.into()),
            }
        };
        self.stream.set_nonblocking(false)?;
        result
    }

    fn close(&mut self) -> Result<(), RigError> {
        match self.stream.shutdown(std::net::Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn description(&self) -> String {
        format!("tcp://{}", self.addr)
    }
}

/// Transport for models that have no port
///
/// Writes are discarded and reads always time out.
#[derive(Debug, Default)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn write(&mut self, _data: &[u8]) -> Result<(), RigError> {
        Ok(())
    }

    fn read(&mut self, _buf: &mut [u8], _timeout: Duration) -> Result<usize, RigError> {
        Err(RigError::Timeout)
    }

    fn flush_input(&mut self) -> Result<(), RigError> {
        Ok(())
    }

    fn description(&self) -> String {
        "none".into()
    }
}

/// Open the transport a model needs
///
/// Models without a port get a [`NullTransport`]. Otherwise `path` is a serial
/// device, or `host:port` for a network rig or serial server.
pub fn connect(
    port: &PortCaps,
    path: Option<&str>,
    baud_rate: Option<u32>,
) -> Result<Box<dyn Transport>, RigError> {
    if port.port_type == PortType::None {
        return Ok(Box::new(NullTransport));
    }
    let path = path.ok_or_else(|| RigError::Config("no rig port given".into()))?;
    let is_network = port.port_type == PortType::Network
        || (!path.starts_with('/') && !path.starts_with("COM") && path.contains(':'));
    if is_network {
        let timeout = Duration::from_millis(port.timeout_ms.max(1000));
        Ok(Box::new(TcpTransport::connect(path, timeout)?))
    } else {
        let settings = SerialSettings::from_caps(path, port, baud_rate);
        Ok(Box::new(SerialTransport::open(&settings)?))
    }
}
