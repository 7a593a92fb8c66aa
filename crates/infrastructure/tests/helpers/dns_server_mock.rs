use super::a_response;
use hickory_proto::op::Message;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy)]
pub enum MockMode {
    /// Reply with one A record carrying this address.
    Answer(Ipv4Addr),
    /// Never reply.
    Silent,
    /// Reply with a transaction ID that does not match the query.
    WrongId(Ipv4Addr),
}

/// UDP and TCP DNS server on loopback ephemeral ports.
pub struct MockDnsServer {
    udp_addr: SocketAddr,
    tcp_addr: SocketAddr,
    received_ids: Arc<Mutex<Vec<u16>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockDnsServer {
    pub async fn start(mode: MockMode) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let udp_addr = socket.local_addr()?;
        let tcp_addr = listener.local_addr()?;
        let received_ids = Arc::new(Mutex::new(Vec::new()));

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let ids = Arc::clone(&received_ids);

        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    result = socket.recv_from(&mut buf) => {
                        if let Ok((len, peer)) = result {
                            if let Some(response) = Self::respond(&buf[..len], mode, &ids) {
                                let _ = socket.send_to(&response, peer).await;
                            }
                        }
                    }
                    accepted = listener.accept() => {
                        if let Ok((mut stream, _)) = accepted {
                            let ids = Arc::clone(&ids);
                            tokio::spawn(async move {
                                let mut len_buf = [0u8; 2];
                                if stream.read_exact(&mut len_buf).await.is_err() {
                                    return;
                                }
                                let mut query = vec![0u8; u16::from_be_bytes(len_buf) as usize];
                                if stream.read_exact(&mut query).await.is_err() {
                                    return;
                                }
                                match Self::respond(&query, mode, &ids) {
                                    Some(response) => {
                                        let len = (response.len() as u16).to_be_bytes();
                                        let _ = stream.write_all(&len).await;
                                        let _ = stream.write_all(&response).await;
                                    }
                                    None => {
                                        let mut hold = [0u8; 1];
                                        let _ = stream.read(&mut hold).await;
                                    }
                                }
                            });
                        }
                    }
                }
            }
        });

        Ok(Self {
            udp_addr,
            tcp_addr,
            received_ids,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn udp_addr(&self) -> SocketAddr {
        self.udp_addr
    }

    pub fn tcp_addr(&self) -> SocketAddr {
        self.tcp_addr
    }

    /// Transaction IDs of every query seen so far.
    pub fn received_ids(&self) -> Vec<u16> {
        self.received_ids.lock().unwrap().clone()
    }

    fn respond(query: &[u8], mode: MockMode, ids: &Mutex<Vec<u16>>) -> Option<Vec<u8>> {
        let query = Message::from_vec(query).ok()?;
        ids.lock().unwrap().push(query.id());

        let (ip, id) = match mode {
            MockMode::Answer(ip) => (ip, query.id()),
            MockMode::WrongId(ip) => (ip, query.id().wrapping_add(1)),
            MockMode::Silent => return None,
        };

        let name = query.queries().first()?.name().to_ascii();
        let mut response = a_response(&name, 60, ip);
        response.set_id(id);
        response.to_vec().ok()
    }

    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockDnsServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
