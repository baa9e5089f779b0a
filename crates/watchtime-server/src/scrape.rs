//! UDP tracker scrape client.
//!
//! Speaks the connect and scrape halves of the UDP tracker protocol (BEP 15)
//! to refresh swarm counts on merged search results. Scrapes are best-effort;
//! the search pipeline logs failures and serves results with stale counts.

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::UdpSocket;
use url::Url;

use watchtime_search::{ScrapeEntry, Scraper, SearchError};

const PROTOCOL_MAGIC: u64 = 0x41727101980;
const ACTION_CONNECT: u32 = 0;
const ACTION_SCRAPE: u32 = 2;

/// BEP 15 fits roughly 74 hashes in one scrape packet; stay under that.
const SCRAPE_CHUNK: usize = 70;

const DEFAULT_TRACKER: &str = "udp://tracker.opentrackr.org:1337";
const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Swarm counts for one hash, in tracker field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SwarmCounts {
    seeders: u32,
    completed: u32,
    leechers: u32,
}

/// Scraper backed by a single UDP tracker.
pub struct UdpScraper {
    tracker: String,
    timeout: Duration,
}

impl UdpScraper {
    pub fn new(tracker: String, timeout: Duration) -> Self {
        Self { tracker, timeout }
    }

    /// Tracker endpoint from `TRACKER_URL` (a `udp://host:port` URL) and
    /// timeout from `TRACKER_TIMEOUT_SECS`, with public-tracker defaults.
    pub fn from_env() -> Self {
        let raw = std::env::var("TRACKER_URL").unwrap_or_else(|_| DEFAULT_TRACKER.to_string());
        let tracker = tracker_endpoint(&raw).unwrap_or_else(|| {
            tracing::warn!(url = %raw, "TRACKER_URL is not a udp://host:port URL, using default");
            "tracker.opentrackr.org:1337".to_string()
        });
        let timeout = std::env::var("TRACKER_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self::new(tracker, Duration::from_secs(timeout))
    }

    async fn exchange(
        &self,
        socket: &UdpSocket,
        packet: &[u8],
        buf: &mut [u8],
    ) -> Result<usize, SearchError> {
        socket
            .send(packet)
            .await
            .map_err(|e| SearchError::Scrape(format!("send failed: {e}")))?;
        match tokio::time::timeout(self.timeout, socket.recv(buf)).await {
            Ok(Ok(received)) => Ok(received),
            Ok(Err(e)) => Err(SearchError::Scrape(format!("recv failed: {e}"))),
            Err(_) => Err(SearchError::Scrape(format!(
                "tracker {} timed out",
                self.tracker
            ))),
        }
    }
}

#[async_trait]
impl Scraper for UdpScraper {
    async fn scrape(&self, hashes: &[String]) -> Result<Vec<ScrapeEntry>, SearchError> {
        // Non-hex hashes (NZB ids, library keys) cannot be scraped.
        let decodable: Vec<(&String, [u8; 20])> = hashes
            .iter()
            .filter_map(|hash| decode_info_hash(hash).map(|bytes| (hash, bytes)))
            .collect();
        if decodable.is_empty() {
            return Ok(Vec::new());
        }

        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| SearchError::Scrape(format!("bind failed: {e}")))?;
        socket.connect(&self.tracker).await.map_err(|e| {
            SearchError::Scrape(format!("cannot reach tracker {}: {e}", self.tracker))
        })?;

        let mut buf = [0u8; 2048];

        let transaction_id = rand::random::<u32>();
        let request = build_connect_request(transaction_id);
        let received = self.exchange(&socket, &request, &mut buf).await?;
        let connection_id = parse_connect_response(&buf[..received], transaction_id)?;

        let mut entries = Vec::with_capacity(decodable.len());
        for chunk in decodable.chunks(SCRAPE_CHUNK) {
            let chunk_bytes: Vec<[u8; 20]> = chunk.iter().map(|(_, bytes)| *bytes).collect();
            let transaction_id = rand::random::<u32>();
            let request = build_scrape_request(connection_id, transaction_id, &chunk_bytes);
            let received = self.exchange(&socket, &request, &mut buf).await?;
            let counts = parse_scrape_response(&buf[..received], transaction_id, chunk.len())?;

            for ((hash, _), counts) in chunk.iter().zip(counts) {
                entries.push(ScrapeEntry {
                    hash: (*hash).clone(),
                    complete: counts.seeders,
                    downloaded: counts.completed,
                    incomplete: counts.leechers,
                });
            }
        }

        tracing::debug!(
            tracker = %self.tracker,
            hashes = decodable.len(),
            scraped = entries.len(),
            "tracker scrape complete"
        );
        Ok(entries)
    }
}

// ─── Packet layout ──────────────────────────────────────────────────────

fn build_connect_request(transaction_id: u32) -> [u8; 16] {
    let mut packet = [0u8; 16];
    packet[0..8].copy_from_slice(&PROTOCOL_MAGIC.to_be_bytes());
    packet[8..12].copy_from_slice(&ACTION_CONNECT.to_be_bytes());
    packet[12..16].copy_from_slice(&transaction_id.to_be_bytes());
    packet
}

fn parse_connect_response(buf: &[u8], transaction_id: u32) -> Result<u64, SearchError> {
    if buf.len() < 16 {
        return Err(SearchError::Scrape(format!(
            "short connect response: {} bytes",
            buf.len()
        )));
    }
    let action = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let echoed = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
    if echoed != transaction_id {
        return Err(SearchError::Scrape("transaction id mismatch".to_string()));
    }
    if action != ACTION_CONNECT {
        return Err(SearchError::Scrape(format!(
            "tracker refused connect: action {action}"
        )));
    }
    let mut connection_id = [0u8; 8];
    connection_id.copy_from_slice(&buf[8..16]);
    Ok(u64::from_be_bytes(connection_id))
}

fn build_scrape_request(connection_id: u64, transaction_id: u32, hashes: &[[u8; 20]]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(16 + hashes.len() * 20);
    packet.extend_from_slice(&connection_id.to_be_bytes());
    packet.extend_from_slice(&ACTION_SCRAPE.to_be_bytes());
    packet.extend_from_slice(&transaction_id.to_be_bytes());
    for hash in hashes {
        packet.extend_from_slice(hash);
    }
    packet
}

fn parse_scrape_response(
    buf: &[u8],
    transaction_id: u32,
    expected: usize,
) -> Result<Vec<SwarmCounts>, SearchError> {
    if buf.len() < 8 {
        return Err(SearchError::Scrape(format!(
            "short scrape response: {} bytes",
            buf.len()
        )));
    }
    let action = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let echoed = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
    if echoed != transaction_id {
        return Err(SearchError::Scrape("transaction id mismatch".to_string()));
    }
    if action != ACTION_SCRAPE {
        // Error packets carry a textual message after the header.
        let message = String::from_utf8_lossy(&buf[8..]).into_owned();
        return Err(SearchError::Scrape(format!("tracker error: {message}")));
    }

    let mut counts = Vec::with_capacity(expected);
    for row in buf[8..].chunks_exact(12).take(expected) {
        counts.push(SwarmCounts {
            seeders: u32::from_be_bytes([row[0], row[1], row[2], row[3]]),
            completed: u32::from_be_bytes([row[4], row[5], row[6], row[7]]),
            leechers: u32::from_be_bytes([row[8], row[9], row[10], row[11]]),
        });
    }
    Ok(counts)
}

/// Forty hex characters to raw bytes; anything else is not a scrapeable hash.
fn decode_info_hash(hash: &str) -> Option<[u8; 20]> {
    if hash.len() != 40 || !hash.is_ascii() {
        return None;
    }
    let mut bytes = [0u8; 20];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hash[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(bytes)
}

/// `udp://host:port` to the `host:port` endpoint a UDP socket expects.
fn tracker_endpoint(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?;
    let port = url.port()?;
    Some(format!("{host}:{port}"))
}
