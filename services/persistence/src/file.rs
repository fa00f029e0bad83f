//! File-backed store — append-only log with checksums
//!
//! Every mutation appends a length-prefixed, CRC32C-checksummed record;
//! the in-memory index is rebuilt by replaying the log on open. A
//! corrupted or truncated tail ends the replay at the last valid
//! record instead of failing the open.
//!
//! # Binary format (per record)
//! ```text
//! [body_len: u32]
//! [kind:     u8]          // 1 = order upsert, 2 = trade
//! [payload_len: u32][payload: bytes]   // JSON
//! [checksum: u32]         // CRC32C over kind + payload
//! ```

use crate::state::StoreState;
use crate::store::{OrderStore, StoreError};
use crc32c::crc32c;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::warn;
use types::ids::OrderId;
use types::order::Order;
use types::trade::Trade;

const KIND_ORDER: u8 = 1;
const KIND_TRADE: u8 = 2;

// Minimum body: 1 (kind) + 4 (payload_len) + 0 (payload) + 4 (crc)
const MIN_BODY_LEN: usize = 9;
// Reject implausible lengths early; anything this large is corruption.
const MAX_BODY_LEN: usize = 100_000_000;

// ── Log record ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
struct LogRecord {
    kind: u8,
    payload: Vec<u8>,
    checksum: u32,
}

impl LogRecord {
    fn new(kind: u8, payload: Vec<u8>) -> Self {
        let checksum = Self::compute_checksum(kind, &payload);
        Self {
            kind,
            payload,
            checksum,
        }
    }

    fn compute_checksum(kind: u8, payload: &[u8]) -> u32 {
        let mut buf = Vec::with_capacity(1 + payload.len());
        buf.push(kind);
        buf.extend_from_slice(payload);
        crc32c(&buf)
    }

    fn verify_checksum(&self) -> bool {
        self.checksum == Self::compute_checksum(self.kind, &self.payload)
    }

    fn to_bytes(&self) -> Vec<u8> {
        let payload_len = self.payload.len() as u32;
        let body_len: u32 = 1 + 4 + payload_len + 4;

        let mut buf = Vec::with_capacity(4 + body_len as usize);
        buf.extend_from_slice(&body_len.to_le_bytes());
        buf.push(self.kind);
        buf.extend_from_slice(&payload_len.to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf.extend_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    /// Decode one record. Returns `(record, bytes_consumed)`; any
    /// truncation or implausible length is an error, not a panic.
    fn from_bytes(data: &[u8]) -> Result<(Self, usize), StoreError> {
        if data.len() < 4 {
            return Err(StoreError::Serialization(
                "not enough data for length prefix".into(),
            ));
        }
        let body_len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if !(MIN_BODY_LEN..=MAX_BODY_LEN).contains(&body_len) {
            return Err(StoreError::Serialization(format!(
                "implausible body length: {}",
                body_len
            )));
        }
        let total = 4 + body_len;
        if data.len() < total {
            return Err(StoreError::Serialization(format!(
                "incomplete record: need {} bytes, have {}",
                total,
                data.len()
            )));
        }

        let body = &data[4..total];
        let kind = body[0];
        let payload_len = u32::from_le_bytes([body[1], body[2], body[3], body[4]]) as usize;
        if 1 + 4 + payload_len + 4 != body_len {
            return Err(StoreError::Serialization(format!(
                "payload length {} inconsistent with body length {}",
                payload_len, body_len
            )));
        }
        let payload = body[5..5 + payload_len].to_vec();
        let checksum_bytes = &body[5 + payload_len..];
        let checksum = u32::from_le_bytes([
            checksum_bytes[0],
            checksum_bytes[1],
            checksum_bytes[2],
            checksum_bytes[3],
        ]);

        Ok((
            Self {
                kind,
                payload,
                checksum,
            },
            total,
        ))
    }
}

// ── File store ──────────────────────────────────────────────────────

struct FileStoreInner {
    writer: BufWriter<File>,
    state: StoreState,
}

/// Append-only file store with a replayed in-memory index.
pub struct FileStore {
    path: PathBuf,
    inner: Mutex<FileStoreInner>,
}

impl FileStore {
    /// Open the store, replaying the existing log if present.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let state = Self::replay(&path)?;

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            inner: Mutex::new(FileStoreInner {
                writer: BufWriter::new(file),
                state,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rebuild the index from the log. Stops at the first corrupt or
    /// truncated record, keeping the valid prefix.
    fn replay(path: &Path) -> Result<StoreState, StoreError> {
        let mut state = StoreState::new();
        let mut data = Vec::new();
        match File::open(path) {
            Ok(mut file) => {
                file.read_to_end(&mut data)?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(state),
            Err(e) => return Err(e.into()),
        }

        let mut pos = 0usize;
        while pos < data.len() {
            let (record, consumed) = match LogRecord::from_bytes(&data[pos..]) {
                Ok(ok) => ok,
                Err(e) => {
                    warn!(offset = pos, error = %e, "store log replay stopped at corrupt tail");
                    break;
                }
            };
            if !record.verify_checksum() {
                warn!(offset = pos, "store log replay stopped at checksum mismatch");
                break;
            }
            match record.kind {
                KIND_ORDER => match serde_json::from_slice::<Order>(&record.payload) {
                    Ok(order) => state.apply_order(&order),
                    Err(e) => {
                        warn!(offset = pos, error = %e, "skipping undecodable order record");
                    }
                },
                KIND_TRADE => match serde_json::from_slice::<Trade>(&record.payload) {
                    Ok(trade) => state.apply_trade(&trade),
                    Err(e) => {
                        warn!(offset = pos, error = %e, "skipping undecodable trade record");
                    }
                },
                other => {
                    warn!(offset = pos, kind = other, "skipping record of unknown kind");
                }
            }
            pos += consumed;
        }
        Ok(state)
    }

    fn lock(&self) -> Result<MutexGuard<'_, FileStoreInner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }

    fn append_order(inner: &mut FileStoreInner, order: &Order) -> Result<(), StoreError> {
        let payload =
            serde_json::to_vec(order).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let record = LogRecord::new(KIND_ORDER, payload);
        inner.writer.write_all(&record.to_bytes())?;
        inner.state.apply_order(order);
        Ok(())
    }

    fn append_trade(inner: &mut FileStoreInner, trade: &Trade) -> Result<(), StoreError> {
        let payload =
            serde_json::to_vec(trade).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let record = LogRecord::new(KIND_TRADE, payload);
        inner.writer.write_all(&record.to_bytes())?;
        inner.state.apply_trade(trade);
        Ok(())
    }

    fn sync(inner: &mut FileStoreInner) -> Result<(), StoreError> {
        inner.writer.flush()?;
        inner.writer.get_ref().sync_all()?;
        Ok(())
    }
}

impl OrderStore for FileStore {
    fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if let Some(key) = &order.idempotency_key {
            if inner.state.idempotency_bound(key) {
                return Err(StoreError::DuplicateIdempotencyKey { key: key.clone() });
            }
        }
        Self::append_order(&mut inner, order)?;
        Self::sync(&mut inner)
    }

    fn find_by_idempotency(&self, key: &str) -> Result<Option<Order>, StoreError> {
        Ok(self.lock()?.state.order_by_idempotency(key).cloned())
    }

    fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.lock()?.state.order(order_id).cloned())
    }

    fn save_orders(&self, orders: &[Order]) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        for order in orders {
            Self::append_order(&mut inner, order)?;
        }
        Self::sync(&mut inner)
    }

    fn save_trades(&self, trades: &[Trade]) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        for trade in trades {
            Self::append_trade(&mut inner, trade)?;
        }
        Self::sync(&mut inner)
    }

    fn commit_execution(&self, trades: &[Trade], orders: &[Order]) -> Result<(), StoreError> {
        // Single lock for the whole unit; trades land before orders
        // and one sync covers both.
        let mut inner = self.lock()?;
        for trade in trades {
            Self::append_trade(&mut inner, trade)?;
        }
        for order in orders {
            Self::append_order(&mut inner, order)?;
        }
        Self::sync(&mut inner)
    }

    fn scan_live_orders(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self.lock()?.state.live_orders())
    }

    fn recent_trades(&self, limit: usize) -> Result<Vec<Trade>, StoreError> {
        Ok(self.lock()?.state.recent_trades(limit))
    }

    fn ping(&self) -> Result<(), StoreError> {
        let inner = self.lock()?;
        inner
            .writer
            .get_ref()
            .metadata()
            .map(|_| ())
            .map_err(StoreError::Io)
    }
}
