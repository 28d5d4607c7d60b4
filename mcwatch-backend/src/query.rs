//! Minecraft server status queries.
//!
//! [`StatusPingClient`] speaks the Java Edition Server List Ping: a handshake
//! packet with next state 1, an empty status request, and a single
//! length-prefixed JSON response. Every packet is framed as
//! `VarInt length | VarInt packet id | payload`.

use async_trait::async_trait;
use mcwatch_db::{OnlinePlayer, ServerIdentity};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Largest status response accepted, in bytes.
const MAX_RESPONSE_LEN: usize = 1024 * 1024;

/// "Any version" marker for status-only handshakes.
const PROTOCOL_VERSION: i32 = -1;

const NEXT_STATE_STATUS: i32 = 1;
const PACKET_ID_HANDSHAKE: i32 = 0x00;
const PACKET_ID_STATUS: i32 = 0x00;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("connection failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("invalid status json: {0}")]
    Json(#[from] serde_json::Error),
}

/// What a status query reports. Optional fields are ones the server may omit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResponse {
    pub is_online: bool,
    pub motd: Option<String>,
    pub server_version: Option<String>,
    pub players_max: Option<u32>,
    pub players_online: Option<u32>,
    pub players: Option<Vec<OnlinePlayer>>,
}

/// Source of live server status.
///
/// Implementations bound their own latency; the poll cycle waits for
/// whatever they return and treats any error as "offline".
#[async_trait]
pub trait ServerQuery: Send + Sync {
    async fn query(&self, identity: &ServerIdentity) -> Result<QueryResponse, QueryError>;
}

/// Server List Ping client over TCP.
#[derive(Debug, Clone)]
pub struct StatusPingClient {
    timeout: Duration,
}

impl StatusPingClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn ping(&self, identity: &ServerIdentity) -> Result<QueryResponse, QueryError> {
        let mut stream = TcpStream::connect((identity.host(), identity.port)).await?;
        stream.set_nodelay(true)?;

        let json = exchange(&mut stream, identity.host(), identity.port).await?;
        parse_status(&json)
    }
}

#[async_trait]
impl ServerQuery for StatusPingClient {
    async fn query(&self, identity: &ServerIdentity) -> Result<QueryResponse, QueryError> {
        tokio::time::timeout(self.timeout, self.ping(identity))
            .await
            .map_err(|_| QueryError::Timeout(self.timeout))?
    }
}

/// Send handshake + status request and read back the JSON payload.
async fn exchange<S>(stream: &mut S, host: &str, port: u16) -> Result<String, QueryError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut handshake = Vec::with_capacity(host.len() + 16);
    write_varint(&mut handshake, PROTOCOL_VERSION);
    write_string(&mut handshake, host);
    handshake.extend_from_slice(&port.to_be_bytes());
    write_varint(&mut handshake, NEXT_STATE_STATUS);

    let mut out = Vec::with_capacity(handshake.len() + 8);
    write_packet(&mut out, PACKET_ID_HANDSHAKE, &handshake);
    write_packet(&mut out, PACKET_ID_STATUS, &[]);
    stream.write_all(&out).await?;
    stream.flush().await?;

    let (packet_id, payload) = read_packet(stream).await?;
    if packet_id != PACKET_ID_STATUS {
        return Err(QueryError::Protocol(format!(
            "unexpected packet id {packet_id:#04x}"
        )));
    }

    let mut cursor = payload.as_slice();
    let len = read_varint_slice(&mut cursor)?;
    let len = usize::try_from(len)
        .map_err(|_| QueryError::Protocol("negative string length".to_string()))?;
    if cursor.len() < len {
        return Err(QueryError::Protocol("truncated status string".to_string()));
    }

    String::from_utf8(cursor[..len].to_vec())
        .map_err(|_| QueryError::Protocol("status string is not utf-8".to_string()))
}

pub(crate) fn write_varint(buf: &mut Vec<u8>, value: i32) {
    let mut value = value as u32;
    loop {
        if value & !0x7F == 0 {
            buf.push(value as u8);
            return;
        }
        buf.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
}

pub(crate) fn write_string(buf: &mut Vec<u8>, value: &str) {
    write_varint(buf, value.len() as i32);
    buf.extend_from_slice(value.as_bytes());
}

pub(crate) fn write_packet(buf: &mut Vec<u8>, packet_id: i32, payload: &[u8]) {
    let mut body = Vec::with_capacity(payload.len() + 5);
    write_varint(&mut body, packet_id);
    body.extend_from_slice(payload);
    write_varint(buf, body.len() as i32);
    buf.extend_from_slice(&body);
}

pub(crate) async fn read_varint<R: AsyncRead + Unpin>(reader: &mut R) -> Result<i32, QueryError> {
    let mut value: u32 = 0;
    for i in 0..5 {
        let byte = reader.read_u8().await?;
        value |= ((byte & 0x7F) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value as i32);
        }
    }
    Err(QueryError::Protocol("varint too long".to_string()))
}

fn read_varint_slice(cursor: &mut &[u8]) -> Result<i32, QueryError> {
    let mut value: u32 = 0;
    for i in 0..5 {
        let (&byte, rest) = cursor
            .split_first()
            .ok_or_else(|| QueryError::Protocol("truncated varint".to_string()))?;
        *cursor = rest;
        value |= ((byte & 0x7F) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value as i32);
        }
    }
    Err(QueryError::Protocol("varint too long".to_string()))
}

/// Read one framed packet, returning its id and the remaining payload.
pub(crate) async fn read_packet<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<(i32, Vec<u8>), QueryError> {
    let len = read_varint(reader).await?;
    let len = usize::try_from(len)
        .ok()
        .filter(|len| *len > 0 && *len <= MAX_RESPONSE_LEN)
        .ok_or_else(|| QueryError::Protocol(format!("bad packet length {len}")))?;

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;

    let mut cursor = body.as_slice();
    let packet_id = read_varint_slice(&mut cursor)?;
    Ok((packet_id, cursor.to_vec()))
}

#[derive(Deserialize)]
struct StatusJson {
    version: Option<VersionJson>,
    players: Option<PlayersJson>,
    description: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct VersionJson {
    name: Option<String>,
}

#[derive(Deserialize)]
struct PlayersJson {
    max: Option<u32>,
    online: Option<u32>,
    #[serde(default)]
    sample: Vec<SampleJson>,
}

#[derive(Deserialize)]
struct SampleJson {
    id: String,
    name: String,
}

/// Decode a status response body.
pub fn parse_status(json: &str) -> Result<QueryResponse, QueryError> {
    let status: StatusJson = serde_json::from_str(json)?;

    let (players_max, players_online, players) = match status.players {
        Some(players) => (
            players.max,
            players.online,
            Some(
                players
                    .sample
                    .into_iter()
                    .map(|p| OnlinePlayer::new(p.id, strip_formatting(&p.name)))
                    .collect(),
            ),
        ),
        None => (None, None, None),
    };

    Ok(QueryResponse {
        is_online: true,
        motd: status
            .description
            .as_ref()
            .map(flatten_chat)
            .map(|text| strip_formatting(&text)),
        server_version: status.version.and_then(|v| v.name),
        players_max,
        players_online,
        players,
    })
}

/// Collapse a chat component (string, object with `text`/`extra`, or array)
/// into plain text.
fn flatten_chat(value: &serde_json::Value) -> String {
    fn walk(value: &serde_json::Value, out: &mut String) {
        match value {
            serde_json::Value::String(s) => out.push_str(s),
            serde_json::Value::Array(parts) => parts.iter().for_each(|p| walk(p, out)),
            serde_json::Value::Object(map) => {
                if let Some(text) = map.get("text") {
                    walk(text, out);
                }
                if let Some(extra) = map.get("extra") {
                    walk(extra, out);
                }
            }
            _ => {}
        }
    }

    let mut out = String::new();
    walk(value, &mut out);
    out
}

/// Remove legacy `§x` formatting codes.
fn strip_formatting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '§' {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}
