//! Shadowsocks AEAD tunnel for the HTTPS client.
//!
//! The HTTP client only speaks SOCKS5 to a proxy, so an `ss://` setting runs a
//! loopback SOCKS5 listener whose CONNECTs are carried to the Shadowsocks
//! server.

pub mod cipher;
pub mod socks;

use cipher::{master_key, random_salt, read_sealed, write_sealed, SessionCipher};
use ferrous_forwarder_domain::{ShadowsocksCredentials, ShadowsocksMethod};
use socks::{TargetAddr, REPLY_HOST_UNREACHABLE, REPLY_SUCCEEDED};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// Timeout for reaching the Shadowsocks server.
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(5);

const RELAY_BUFFER: usize = 16 * 1024;

/// A Shadowsocks server and the key derived from its password.
pub struct ShadowsocksTunnel {
    host: String,
    port: u16,
    method: ShadowsocksMethod,
    key: Vec<u8>,
}

impl ShadowsocksTunnel {
    pub fn new(host: &str, port: u16, credentials: &ShadowsocksCredentials) -> Self {
        Self {
            host: host.to_string(),
            port,
            method: credentials.method,
            key: master_key(&credentials.password, credentials.method.key_len()),
        }
    }

    /// Dials the server and sends the salted target header.
    pub async fn connect(&self, target: &TargetAddr) -> io::Result<SealedStream> {
        let stream = tokio::time::timeout(
            DIAL_TIMEOUT,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "shadowsocks dial timed out"))??;
        let (reader, mut writer) = stream.into_split();

        let salt = random_salt(self.method);
        let mut encoder = SessionCipher::new(self.method, &self.key, &salt)?;
        writer.write_all(&salt).await?;

        let mut header = Vec::with_capacity(1 + 1 + 255 + 2);
        target.encode(&mut header);
        write_sealed(&mut writer, &mut encoder, &header).await?;

        Ok(SealedStream {
            reader,
            writer,
            encoder,
            method: self.method,
            key: self.key.clone(),
        })
    }
}

/// An open tunnel; the server's reply salt has not been read yet.
pub struct SealedStream {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    encoder: SessionCipher,
    method: ShadowsocksMethod,
    key: Vec<u8>,
}

impl SealedStream {
    /// Copies `local` through the tunnel both ways until each side has closed.
    pub async fn relay(self, local: TcpStream) -> io::Result<()> {
        let SealedStream {
            mut reader,
            mut writer,
            mut encoder,
            method,
            key,
        } = self;
        let (mut local_reader, mut local_writer) = local.into_split();

        let outbound = async {
            let mut buf = vec![0u8; RELAY_BUFFER];
            loop {
                let n = local_reader.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                write_sealed(&mut writer, &mut encoder, &buf[..n]).await?;
            }
            writer.shutdown().await
        };

        let inbound = async {
            let mut salt = vec![0u8; method.key_len()];
            if let Err(e) = reader.read_exact(&mut salt).await {
                return match e.kind() {
                    io::ErrorKind::UnexpectedEof => local_writer.shutdown().await,
                    _ => Err(e),
                };
            }
            let mut decoder = SessionCipher::new(method, &key, &salt)?;
            while let Some(payload) = read_sealed(&mut reader, &mut decoder).await? {
                local_writer.write_all(&payload).await?;
            }
            local_writer.shutdown().await
        };

        tokio::try_join!(outbound, inbound).map(|_| ())
    }
}

/// Loopback SOCKS5 listener that forwards every CONNECT through a tunnel.
///
/// The listener keeps running until the runtime shuts down.
pub struct ShadowsocksBridge {
    local_addr: SocketAddr,
}

impl ShadowsocksBridge {
    pub async fn start(tunnel: ShadowsocksTunnel) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let local_addr = listener.local_addr()?;
        let tunnel = Arc::new(tunnel);

        info!(
            bridge = %local_addr,
            server = %format!("{}:{}", tunnel.host, tunnel.port),
            method = tunnel.method.as_str(),
            "Shadowsocks bridge listening"
        );

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        let tunnel = Arc::clone(&tunnel);
                        tokio::spawn(async move {
                            if let Err(e) = serve(stream, &tunnel).await {
                                debug!(peer = %peer, error = %e, "Shadowsocks bridge connection ended");
                            }
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "Shadowsocks bridge accept failed");
                    }
                }
            }
        });

        Ok(Self { local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Proxy URL for the HTTP client; names are resolved on the far side.
    pub fn socks_url(&self) -> String {
        format!("socks5h://{}", self.local_addr)
    }
}

async fn serve(mut local: TcpStream, tunnel: &ShadowsocksTunnel) -> io::Result<()> {
    let target = socks::accept(&mut local).await?;

    let sealed = match tunnel.connect(&target).await {
        Ok(sealed) => sealed,
        Err(e) => {
            warn!(target = %target, error = %e, "Shadowsocks tunnel failed");
            socks::reply(&mut local, REPLY_HOST_UNREACHABLE).await?;
            return Err(e);
        }
    };
    socks::reply(&mut local, REPLY_SUCCEEDED).await?;
    debug!(target = %target, "Shadowsocks tunnel open");

    sealed.relay(local).await
}
