//!
//! GPIO input over UDP. Every datagram is one decimal integer that becomes the new value of the
//! GPIO_IN latch, and every datagram is answered with [`ACK`]. The message [`EXIT`] stops the
//! ingress thread without touching the machine.
//!

use crate::simulator::SharedMemory;
use log::{debug, info, warn};
use std::io;
use std::net::{Ipv4Addr, ToSocketAddrs, UdpSocket};

pub const DEFAULT_PORT: u16 = 50000;
pub const EXIT: &str = "EXIT";
pub const ACK: &[u8] = b"Message received";

const BUFFER_SIZE: usize = 1024;

/// What a datagram asks the ingress to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// New GPIO_IN value, already truncated to the latch width
    Sample(u8),
    Exit,
    /// Not a number, nothing to do
    Ignored,
}

pub fn parse_message(message: &[u8]) -> Signal {
    let Ok(text) = std::str::from_utf8(message) else {
        warn!("Ignoring non UTF-8 GPIO message");
        return Signal::Ignored;
    };
    let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');

    if text == EXIT {
        return Signal::Exit;
    }

    match text.parse::<i32>() {
        Ok(value) => Signal::Sample(value as u8),
        Err(e) => {
            warn!("Ignoring GPIO message '{text}': {e}");
            Signal::Ignored
        }
    }
}

/// Binds the ingress socket on every interface
pub fn bind(port: u16) -> io::Result<UdpSocket> {
    bind_to((Ipv4Addr::UNSPECIFIED, port))
}

pub fn bind_to(addr: impl ToSocketAddrs) -> io::Result<UdpSocket> {
    let socket = UdpSocket::bind(addr)?;
    info!("GPIO ingress listening on {}", socket.local_addr()?);
    Ok(socket)
}

/// Receives datagrams until an [`EXIT`] message arrives. Receive errors are logged and skipped.
pub fn serve(socket: &UdpSocket, memory: &SharedMemory) {
    let mut buffer = [0u8; BUFFER_SIZE];
    loop {
        let (n, from) = match socket.recv_from(&mut buffer) {
            Ok(x) => x,
            Err(e) => {
                warn!("GPIO ingress failed to receive: {e}");
                continue;
            }
        };

        let signal = parse_message(&buffer[..n]);
        if let Signal::Sample(value) = signal {
            debug!("GPIO_IN <- {value:#04x} from {from}");
            memory.lock().set_gpio_in(value);
        }

        if let Err(e) = socket.send_to(ACK, from) {
            warn!("GPIO ingress failed to acknowledge {from}: {e}");
        }

        if signal == Signal::Exit {
            break;
        }
    }
    info!("GPIO ingress stopped");
}
