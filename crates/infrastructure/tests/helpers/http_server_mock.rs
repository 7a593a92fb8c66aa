use super::a_response;
use hickory_proto::op::Message;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

#[derive(Debug, Clone)]
pub enum HttpReply {
    /// Decode the body as a DNS query and answer it with one A record.
    DnsAnswer(Ipv4Addr),
    /// `200 OK` with this JSON document.
    Json(String),
    /// `200 OK` with these bytes as the body.
    Body(&'static [u8]),
    /// Empty body with this status code.
    Status(u16),
    /// Read the request and never answer.
    Silent,
}

/// One request as seen by the server.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
}

impl SeenRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// HTTP/1.1 server on a loopback ephemeral port.
pub struct MockHttpServer {
    addr: SocketAddr,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockHttpServer {
    pub async fn start(reply: HttpReply) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let seen = Arc::new(Mutex::new(Vec::new()));

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let requests = Arc::clone(&seen);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    accepted = listener.accept() => {
                        if let Ok((stream, _)) = accepted {
                            let reply = reply.clone();
                            let requests = Arc::clone(&requests);
                            tokio::spawn(Self::serve(stream, reply, requests));
                        }
                    }
                }
            }
        });

        Ok(Self {
            addr,
            seen,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    async fn serve(
        mut stream: TcpStream,
        reply: HttpReply,
        requests: Arc<Mutex<Vec<SeenRequest>>>,
    ) {
        let Some((request, body)) = read_request(&mut stream).await else {
            return;
        };
        requests.lock().unwrap().push(request);

        let (status, content_type, payload) = match reply {
            HttpReply::DnsAnswer(ip) => {
                let Some(payload) = dns_answer(&body, ip) else {
                    return;
                };
                (200, "application/dns-message", payload)
            }
            HttpReply::Json(document) => (200, "application/dns-json", document.into_bytes()),
            HttpReply::Body(bytes) => (200, "application/dns-message", bytes.to_vec()),
            HttpReply::Status(code) => (code, "text/plain", Vec::new()),
            HttpReply::Silent => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                return;
            }
        };

        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            reason(status),
            content_type,
            payload.len()
        );
        let _ = stream.write_all(head.as_bytes()).await;
        let _ = stream.write_all(&payload).await;
        let _ = stream.shutdown().await;
    }

    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockHttpServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn read_request(stream: &mut TcpStream) -> Option<(SeenRequest, Vec<u8>)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect();

    let request = SeenRequest {
        method,
        target,
        headers,
    };
    let content_length: usize = request
        .header("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let mut body = buf[head_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Some((request, body))
}

fn dns_answer(body: &[u8], ip: Ipv4Addr) -> Option<Vec<u8>> {
    let query = Message::from_vec(body).ok()?;
    let name = query.queries().first()?.name().to_ascii();
    let mut response = a_response(&name, 60, ip);
    response.set_id(query.id());
    response.to_vec().ok()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
