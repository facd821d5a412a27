use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::core::error::PotcheckError;
use crate::core::snapshot::Proto;
use crate::probes::Wire;

/// Blocking socket collaborator for banner grabs and scripted exchanges.
pub struct TcpWire;

fn map_io(err: io::Error) -> PotcheckError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => PotcheckError::Timeout,
        _ => PotcheckError::Network(err.to_string()),
    }
}

fn connect(address: &str, port: u16, timeout: Duration) -> Result<TcpStream, PotcheckError> {
    let mut addrs = (address, port)
        .to_socket_addrs()
        .map_err(|e| PotcheckError::Network(e.to_string()))?;
    let addr = addrs
        .next()
        .ok_or_else(|| PotcheckError::Network(format!("{} did not resolve", address)))?;

    let stream = TcpStream::connect_timeout(&addr, timeout).map_err(map_io)?;
    stream.set_read_timeout(Some(timeout)).map_err(map_io)?;
    stream.set_write_timeout(Some(timeout)).map_err(map_io)?;
    Ok(stream)
}

fn read_chunk(stream: &mut TcpStream) -> Result<Vec<u8>, PotcheckError> {
    let mut buf = [0u8; 1024];
    let n = stream.read(&mut buf).map_err(map_io)?;
    Ok(buf[..n].to_vec())
}

impl Wire for TcpWire {
    fn connect_and_read(
        &self,
        address: &str,
        port: u16,
        proto: Proto,
        timeout: Duration,
    ) -> Result<Vec<u8>, PotcheckError> {
        if proto == Proto::Udp {
            return Err(PotcheckError::Probe(
                "udp banner grabs are not supported".into(),
            ));
        }

        let mut stream = connect(address, port, timeout)?;
        read_chunk(&mut stream)
    }

    fn exchange(
        &self,
        address: &str,
        port: u16,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, PotcheckError> {
        let mut stream = connect(address, port, timeout)?;

        // greeting is read and dropped; some services stay silent until
        // poked, so a timeout here is not fatal
        match read_chunk(&mut stream) {
            Ok(_) | Err(PotcheckError::Timeout) => {}
            Err(err) => return Err(err),
        }

        stream.write_all(payload).map_err(map_io)?;
        read_chunk(&mut stream)
    }
}
