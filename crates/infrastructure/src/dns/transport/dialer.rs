use async_trait::async_trait;
use ferrous_forwarder_domain::UpstreamAddr;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::{lookup_host, TcpStream, UdpSocket};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Udp,
    Tcp,
}

/// A connected socket, ready for one exchange.
pub enum Connection {
    Udp(UdpSocket),
    Tcp(TcpStream),
}

/// Opens connections to classic upstreams.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, network: Network, addr: &UpstreamAddr) -> io::Result<Connection>;
}

/// Dials straight from this host, resolving hostnames with the system resolver.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectDialer;

impl DirectDialer {
    async fn resolve(addr: &UpstreamAddr) -> io::Result<SocketAddr> {
        match addr {
            UpstreamAddr::Resolved(socket_addr) => Ok(*socket_addr),
            UpstreamAddr::Unresolved { hostname, port } => lookup_host((&**hostname, *port))
                .await?
                .next()
                .ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("no address found for {}", hostname),
                    )
                }),
        }
    }
}

#[async_trait]
impl Dialer for DirectDialer {
    async fn dial(&self, network: Network, addr: &UpstreamAddr) -> io::Result<Connection> {
        let server_addr = Self::resolve(addr).await?;

        match network {
            Network::Udp => {
                let bind_addr: SocketAddr = if server_addr.is_ipv4() {
                    (Ipv4Addr::UNSPECIFIED, 0).into()
                } else {
                    (Ipv6Addr::UNSPECIFIED, 0).into()
                };
                let socket = UdpSocket::bind(bind_addr).await?;
                socket.connect(server_addr).await?;
                Ok(Connection::Udp(socket))
            }
            Network::Tcp => {
                let stream = TcpStream::connect(server_addr).await?;
                stream.set_nodelay(true)?;
                Ok(Connection::Tcp(stream))
            }
        }
    }
}
