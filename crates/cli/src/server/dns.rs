use anyhow::Context;
use ferrous_forwarder_infrastructure::dns::transport::tcp::{
    read_with_length_prefix, send_with_length_prefix,
};
use ferrous_forwarder_infrastructure::dns::DnsServerHandler;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const MAX_UDP_QUERY_SIZE: usize = 4096;
const TCP_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct DnsSockets {
    udp: UdpSocket,
    tcp: TcpListener,
    addr: SocketAddr,
}

/// Binds UDP and TCP on `socket_addr`. Failure here is fatal to startup.
pub fn bind_dns_sockets(socket_addr: SocketAddr) -> anyhow::Result<DnsSockets> {
    let domain = if socket_addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let udp = create_udp_socket(domain, socket_addr)
        .with_context(|| format!("failed to bind UDP {}", socket_addr))?;
    let tcp = create_tcp_listener(domain, socket_addr)
        .with_context(|| format!("failed to bind TCP {}", socket_addr))?;

    Ok(DnsSockets {
        udp,
        tcp,
        addr: socket_addr,
    })
}

/// Serves until `shutdown` is cancelled.
pub async fn run_dns_server(
    sockets: DnsSockets,
    handler: Arc<DnsServerHandler>,
    shutdown: CancellationToken,
) {
    info!(bind_address = %sockets.addr, "DNS server ready on UDP and TCP");

    let udp = tokio::spawn(run_udp_server(
        Arc::new(sockets.udp),
        Arc::clone(&handler),
        shutdown.clone(),
    ));
    let tcp = tokio::spawn(run_tcp_server(sockets.tcp, handler, shutdown));

    let _ = tokio::join!(udp, tcp);
    info!("DNS server stopped");
}

async fn run_udp_server(
    socket: Arc<UdpSocket>,
    handler: Arc<DnsServerHandler>,
    shutdown: CancellationToken,
) {
    let mut recv_buf = vec![0u8; MAX_UDP_QUERY_SIZE];

    loop {
        let (n, from) = tokio::select! {
            _ = shutdown.cancelled() => break,
            received = socket.recv_from(&mut recv_buf) => match received {
                Ok(received) => received,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    // ICMP port-unreachable from an earlier reply surfaces here on some platforms.
                    debug!(error = %e, "UDP recv error");
                    continue;
                }
            },
        };

        let query: Arc<[u8]> = Arc::from(&recv_buf[..n]);
        let socket = Arc::clone(&socket);
        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            for reply in handler.handle_raw(&query, from).await {
                if let Err(e) = socket.send_to(&reply, from).await {
                    warn!(client = %from, error = %e, "Failed to send UDP reply");
                }
            }
        });
    }
}

async fn run_tcp_server(
    listener: TcpListener,
    handler: Arc<DnsServerHandler>,
    shutdown: CancellationToken,
) {
    loop {
        let (stream, from) = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(error = %e, "TCP accept error");
                    continue;
                }
            },
        };

        let handler = Arc::clone(&handler);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = serve_tcp_connection(stream, from, handler) => {}
            }
        });
    }
}

/// Answers framed queries on one connection, one at a time, until the peer
/// closes it or stays idle too long.
async fn serve_tcp_connection(
    mut stream: TcpStream,
    from: SocketAddr,
    handler: Arc<DnsServerHandler>,
) {
    loop {
        let read = tokio::time::timeout(TCP_IDLE_TIMEOUT, read_with_length_prefix(&mut stream));
        let query = match read.await {
            Ok(Ok(query)) => query,
            Ok(Err(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Ok(Err(e)) => {
                debug!(client = %from, error = %e, "TCP read error");
                break;
            }
            Err(_) => {
                debug!(client = %from, "TCP connection idle, closing");
                break;
            }
        };

        for reply in handler.handle_raw(&query, from).await {
            if let Err(e) = send_with_length_prefix(&mut stream, &reply).await {
                warn!(client = %from, error = %e, "Failed to send TCP reply");
                return;
            }
        }
    }
}

fn create_udp_socket(domain: Domain, socket_addr: SocketAddr) -> anyhow::Result<UdpSocket> {
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    if socket_addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    socket.set_recv_buffer_size(512 * 1024)?;
    socket.set_send_buffer_size(512 * 1024)?;
    socket.bind(&socket_addr.into())?;
    socket.set_nonblocking(true)?;
    let std_socket: std::net::UdpSocket = socket.into();
    Ok(UdpSocket::from_std(std_socket)?)
}

fn create_tcp_listener(domain: Domain, socket_addr: SocketAddr) -> anyhow::Result<TcpListener> {
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    if socket_addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;
    socket.set_nonblocking(true)?;
    let std_listener: std::net::TcpListener = socket.into();
    Ok(TcpListener::from_std(std_listener)?)
}
