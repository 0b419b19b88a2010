//! UDP socket creation for discovery.
//!
//! Sockets are configured through `socket2` before bind (SO_REUSEADDR, and
//! SO_BROADCAST for network-wide probing), then handed to tokio. Address
//! reuse on the receive port is what keeps the duplicate-detection race
//! safe: a starting duplicate can bind while the winner still listens, and
//! closes its socket as soon as the probe resolves.

use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use tokio::net::UdpSocket;
use tracing::debug;

/// Creates the responder's receive socket on the configured port.
pub(crate) fn bind_responder_socket(port: u16) -> io::Result<UdpSocket> {
    let socket = bind_discovery_socket(port, false)?;
    debug!(port, "Bound responder socket");
    Ok(socket)
}

/// Creates the prober's socket on the send port (configured port + 1).
///
/// When another prober on this host is racing for the send port, falls back
/// to an ephemeral port: the responder replies to the datagram's source
/// address, so the reply reaches either binding.
pub(crate) fn bind_probe_socket(send_port: u16, broadcast: bool) -> io::Result<UdpSocket> {
    match bind_discovery_socket(send_port, broadcast) {
        Ok(socket) => Ok(socket),
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
            debug!(send_port, "Send port contended, using an ephemeral port");
            bind_discovery_socket(0, broadcast)
        }
        Err(e) => Err(e),
    }
}

fn bind_discovery_socket(port: u16, broadcast: bool) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    if broadcast {
        socket.set_broadcast(true)?;
    }

    let bind_addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
    socket.bind(&bind_addr.into())?;

    // tokio requires nonblocking mode before conversion
    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket.into())
}
