use ferrous_forwarder_domain::ShadowsocksMethod;
use ferrous_forwarder_infrastructure::dns::transport::shadowsocks::cipher::{
    master_key, random_salt, read_sealed, write_sealed, SessionCipher,
};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Shadowsocks AEAD server that connects to whatever target each client asks
/// for and relays plain bytes to it.
pub struct MockShadowsocksServer {
    addr: SocketAddr,
    targets: Arc<Mutex<Vec<String>>>,
}

impl MockShadowsocksServer {
    pub async fn start(method: ShadowsocksMethod, password: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let targets = Arc::new(Mutex::new(Vec::new()));
        let key = Arc::new(master_key(password, method.key_len()));

        let seen = Arc::clone(&targets);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let key = Arc::clone(&key);
                let seen = Arc::clone(&seen);
                tokio::spawn(async move {
                    let _ = Self::serve(stream, method, &key, &seen).await;
                });
            }
        });

        Ok(Self { addr, targets })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `host:port` of every target requested so far.
    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().unwrap().clone()
    }

    async fn serve(
        stream: TcpStream,
        method: ShadowsocksMethod,
        key: &[u8],
        seen: &Mutex<Vec<String>>,
    ) -> std::io::Result<()> {
        let (mut client_reader, mut client_writer) = stream.into_split();

        let mut salt = vec![0u8; method.key_len()];
        client_reader.read_exact(&mut salt).await?;
        let mut decoder = SessionCipher::new(method, key, &salt)?;

        let header = read_sealed(&mut client_reader, &mut decoder)
            .await?
            .ok_or_else(|| std::io::Error::other("no target header"))?;
        let target = decode_target(&header)
            .ok_or_else(|| std::io::Error::other("bad target header"))?;
        seen.lock().unwrap().push(target.clone());

        let upstream = TcpStream::connect(target.as_str()).await?;
        let (mut upstream_reader, mut upstream_writer) = upstream.into_split();

        let reply_salt = random_salt(method);
        let mut encoder = SessionCipher::new(method, key, &reply_salt)?;
        client_writer.write_all(&reply_salt).await?;

        let to_target = async {
            while let Some(payload) = read_sealed(&mut client_reader, &mut decoder).await? {
                upstream_writer.write_all(&payload).await?;
            }
            upstream_writer.shutdown().await
        };
        let to_client = async {
            let mut buf = vec![0u8; 4096];
            loop {
                let n = upstream_reader.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                write_sealed(&mut client_writer, &mut encoder, &buf[..n]).await?;
            }
            client_writer.shutdown().await
        };

        tokio::try_join!(to_target, to_client).map(|_| ())
    }
}

fn decode_target(header: &[u8]) -> Option<String> {
    let (host, rest) = match *header.first()? {
        0x01 => {
            let octets: [u8; 4] = header.get(1..5)?.try_into().ok()?;
            (Ipv4Addr::from(octets).to_string(), header.get(5..)?)
        }
        0x04 => {
            let octets: [u8; 16] = header.get(1..17)?.try_into().ok()?;
            (format!("[{}]", Ipv6Addr::from(octets)), header.get(17..)?)
        }
        0x03 => {
            let len = usize::from(*header.get(1)?);
            let host = std::str::from_utf8(header.get(2..2 + len)?).ok()?;
            (host.to_string(), header.get(2 + len..)?)
        }
        _ => return None,
    };
    let port = u16::from_be_bytes(rest.get(..2)?.try_into().ok()?);
    Some(format!("{}:{}", host, port))
}
