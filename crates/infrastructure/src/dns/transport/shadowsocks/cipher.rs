//! AEAD session ciphers and chunk framing for Shadowsocks streams.
//!
//! Each direction starts with a random salt, followed by chunks of
//! `seal(len) || seal(payload)` where `len` is a big-endian `u16`.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use chacha20poly1305::ChaCha20Poly1305;
use ferrous_forwarder_domain::ShadowsocksMethod;
use hkdf::Hkdf;
use sha1::Sha1;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const TAG_LEN: usize = 16;

/// Largest payload a single chunk may carry.
pub const MAX_PAYLOAD: usize = 0x3fff;

const NONCE_LEN: usize = 12;
const SUBKEY_INFO: &[u8] = b"ss-subkey";

/// Master key for `password`: OpenSSL `EVP_BytesToKey` with MD5 and no salt.
pub fn master_key(password: &str, len: usize) -> Vec<u8> {
    let mut key = Vec::with_capacity(len + 16);
    let mut block: Vec<u8> = Vec::new();
    while key.len() < len {
        block.extend_from_slice(password.as_bytes());
        let digest = md5::compute(&block);
        key.extend_from_slice(&digest.0);
        block = digest.0.to_vec();
    }
    key.truncate(len);
    key
}

pub fn random_salt(method: ShadowsocksMethod) -> Vec<u8> {
    let mut salt = vec![0u8; method.key_len()];
    fastrand::fill(&mut salt);
    salt
}

enum Engine {
    Aes128(Aes128Gcm),
    Aes256(Aes256Gcm),
    ChaCha(ChaCha20Poly1305),
}

/// One direction of a session, keyed by HKDF-SHA1 over the salt.
pub struct SessionCipher {
    engine: Engine,
    nonce: [u8; NONCE_LEN],
}

impl SessionCipher {
    pub fn new(method: ShadowsocksMethod, master_key: &[u8], salt: &[u8]) -> io::Result<Self> {
        let mut subkey = vec![0u8; method.key_len()];
        Hkdf::<Sha1>::new(Some(salt), master_key)
            .expand(SUBKEY_INFO, &mut subkey)
            .map_err(|_| invalid_input("subkey length"))?;

        let engine = match method {
            ShadowsocksMethod::Aes128Gcm => Engine::Aes128(
                Aes128Gcm::new_from_slice(&subkey).map_err(|_| invalid_input("AES-128 key"))?,
            ),
            ShadowsocksMethod::Aes256Gcm => Engine::Aes256(
                Aes256Gcm::new_from_slice(&subkey).map_err(|_| invalid_input("AES-256 key"))?,
            ),
            ShadowsocksMethod::Chacha20IetfPoly1305 => Engine::ChaCha(
                ChaCha20Poly1305::new_from_slice(&subkey)
                    .map_err(|_| invalid_input("ChaCha20 key"))?,
            ),
        };

        Ok(Self {
            engine,
            nonce: [0u8; NONCE_LEN],
        })
    }

    pub fn seal(&mut self, plaintext: &[u8]) -> io::Result<Vec<u8>> {
        let sealed = match &self.engine {
            Engine::Aes128(c) => c.encrypt(aes_gcm::Nonce::from_slice(&self.nonce), plaintext),
            Engine::Aes256(c) => c.encrypt(aes_gcm::Nonce::from_slice(&self.nonce), plaintext),
            Engine::ChaCha(c) => {
                c.encrypt(chacha20poly1305::Nonce::from_slice(&self.nonce), plaintext)
            }
        }
        .map_err(|_| invalid_data("seal failed"))?;
        self.advance();
        Ok(sealed)
    }

    pub fn open(&mut self, sealed: &[u8]) -> io::Result<Vec<u8>> {
        let opened = match &self.engine {
            Engine::Aes128(c) => c.decrypt(aes_gcm::Nonce::from_slice(&self.nonce), sealed),
            Engine::Aes256(c) => c.decrypt(aes_gcm::Nonce::from_slice(&self.nonce), sealed),
            Engine::ChaCha(c) => {
                c.decrypt(chacha20poly1305::Nonce::from_slice(&self.nonce), sealed)
            }
        }
        .map_err(|_| invalid_data("chunk failed authentication"))?;
        self.advance();
        Ok(opened)
    }

    /// Little-endian increment.
    fn advance(&mut self) {
        for byte in self.nonce.iter_mut() {
            *byte = byte.wrapping_add(1);
            if *byte != 0 {
                break;
            }
        }
    }
}

/// Seals `data` as one or more chunks and writes them out.
pub async fn write_sealed<W>(writer: &mut W, cipher: &mut SessionCipher, data: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    for payload in data.chunks(MAX_PAYLOAD) {
        let mut frame = cipher.seal(&(payload.len() as u16).to_be_bytes())?;
        frame.extend_from_slice(&cipher.seal(payload)?);
        writer.write_all(&frame).await?;
    }
    Ok(())
}

/// Reads and opens one chunk; `None` once the peer has closed cleanly.
pub async fn read_sealed<R>(reader: &mut R, cipher: &mut SessionCipher) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_frame = [0u8; 2 + TAG_LEN];
    match reader.read_exact(&mut len_frame).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = match cipher.open(&len_frame)?.as_slice() {
        [hi, lo] => usize::from(u16::from_be_bytes([*hi, *lo])) & MAX_PAYLOAD,
        _ => return Err(invalid_data("bad chunk length")),
    };

    let mut payload = vec![0u8; len + TAG_LEN];
    reader.read_exact(&mut payload).await?;
    cipher.open(&payload).map(Some)
}

fn invalid_input(what: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, format!("invalid {}", what))
}

fn invalid_data(what: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, what)
}
