//! Persisted device record: credentials, collector address, node identity.
//!
//! The record occupies a reserved non-volatile region and is written as one
//! fixed-size block. Validation is a magic word plus an additive byte-sum
//! checksum; any mismatch reverts every field to factory defaults, because a
//! blank region on first boot is the normal case, not an error.
//!
//! # Record layout (little-endian, 154 bytes)
//!
//! | Offset | Size | Field |
//! |--------|------|-----------------|
//! | 0      | 4    | magic           |
//! | 4      | 32   | wifi_ssid       |
//! | 36     | 64   | wifi_password   |
//! | 100    | 16   | collector_host  |
//! | 116    | 2    | collector_port  |
//! | 118    | 32   | node_id         |
//! | 150    | 4    | checksum        |
//!
//! String fields are NUL-padded ASCII; longer values truncate on encode.
//! The checksum is the wrapping additive sum of bytes 0..150. It is weak
//! (transposed bytes cancel) but it is the deployed on-flash format, so it
//! is preserved as-is. A CRC would be a format version bump.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use thiserror::Error;

/// Record magic word.
pub const CONFIG_MAGIC: u32 = 0xBEE5_CAFE;

/// Total encoded record size in bytes.
pub const RECORD_LEN: usize = 154;

/// Offset of the trailing checksum field.
pub const CHECKSUM_OFFSET: usize = RECORD_LEN - 4;

const SSID_LEN: usize = 32;
const PASSWORD_LEN: usize = 64;
const HOST_LEN: usize = 16;
const NODE_ID_LEN: usize = 32;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    /// The backing region cannot hold a full record.
    #[error("storage region holds {0} bytes, record needs {RECORD_LEN}")]
    RegionTooSmall(usize),
}

/// Reserved non-volatile region holding exactly one config record.
///
/// `erase` then `program` is the write discipline: flash-backed ports erase
/// the sector before programming, and keeping the two steps separate makes
/// a torn write observable in tests. MCU ports mask interrupts around the
/// pair; the single-threaded control loop guarantees no capture overlaps.
pub trait NvStorage {
    /// Read the whole region into `buf` (at least `RECORD_LEN` bytes).
    /// Unwritten regions read as erased bytes (0xFF).
    fn read(&mut self, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Reset the region to the erased state (all 0xFF).
    fn erase(&mut self) -> Result<(), StorageError>;

    /// Program `data` starting at offset 0 of the region.
    fn program(&mut self, data: &[u8]) -> Result<(), StorageError>;
}

/// In-memory device configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemConfig {
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub collector_host: String,
    pub collector_port: u16,
    pub node_id: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            collector_host: "192.168.0.100".to_string(),
            collector_port: 8000,
            node_id: "pico-hive-001".to_string(),
        }
    }
}

impl SystemConfig {
    /// Encode into the fixed on-flash layout, checksum included.
    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let mut raw = [0u8; RECORD_LEN];
        raw[0..4].copy_from_slice(&CONFIG_MAGIC.to_le_bytes());
        put_str(&mut raw[4..4 + SSID_LEN], &self.wifi_ssid);
        put_str(&mut raw[36..36 + PASSWORD_LEN], &self.wifi_password);
        put_str(&mut raw[100..100 + HOST_LEN], &self.collector_host);
        raw[116..118].copy_from_slice(&self.collector_port.to_le_bytes());
        put_str(&mut raw[118..118 + NODE_ID_LEN], &self.node_id);
        let sum = additive_checksum(&raw[..CHECKSUM_OFFSET]);
        raw[CHECKSUM_OFFSET..].copy_from_slice(&sum.to_le_bytes());
        raw
    }

    /// Decode a stored record. `None` when the magic word or checksum does
    /// not match; the caller substitutes defaults.
    pub fn decode(raw: &[u8]) -> Option<Self> {
        if raw.len() < RECORD_LEN {
            return None;
        }
        let magic = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        if magic != CONFIG_MAGIC {
            return None;
        }
        let stored = u32::from_le_bytes([
            raw[CHECKSUM_OFFSET],
            raw[CHECKSUM_OFFSET + 1],
            raw[CHECKSUM_OFFSET + 2],
            raw[CHECKSUM_OFFSET + 3],
        ]);
        if stored != additive_checksum(&raw[..CHECKSUM_OFFSET]) {
            return None;
        }
        Some(Self {
            wifi_ssid: get_str(&raw[4..4 + SSID_LEN]),
            wifi_password: get_str(&raw[36..36 + PASSWORD_LEN]),
            collector_host: get_str(&raw[100..100 + HOST_LEN]),
            collector_port: u16::from_le_bytes([raw[116], raw[117]]),
            node_id: get_str(&raw[118..118 + NODE_ID_LEN]),
        })
    }

    /// True when WiFi credentials have been provisioned.
    pub fn has_credentials(&self) -> bool {
        !self.wifi_ssid.is_empty()
    }
}

/// Wrapping additive sum of `bytes`.
pub fn additive_checksum(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |acc, &b| acc.wrapping_add(u32::from(b)))
}

/// NUL-padded, truncating copy into a fixed field.
fn put_str(field: &mut [u8], value: &str) {
    let bytes = value.as_bytes();
    let n = bytes.len().min(field.len());
    field[..n].copy_from_slice(&bytes[..n]);
}

/// Read a NUL-padded field back out, dropping non-UTF8 tails.
fn get_str(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

// ========================================
// Storage backends
// ========================================

/// File standing in for the reserved flash region on hosted builds.
///
/// A missing file reads as an erased region, so first boot lands on
/// factory defaults without special cases.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl NvStorage for FileStorage {
    fn read(&mut self, buf: &mut [u8]) -> Result<(), StorageError> {
        buf.fill(0xFF);
        match File::open(&self.path) {
            Ok(mut f) => {
                let mut data = Vec::new();
                f.read_to_end(&mut data)?;
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn erase(&mut self) -> Result<(), StorageError> {
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        f.write_all(&[0xFF; RECORD_LEN])?;
        f.sync_all()?;
        Ok(())
    }

    fn program(&mut self, data: &[u8]) -> Result<(), StorageError> {
        let mut f = OpenOptions::new().write(true).open(&self.path)?;
        f.seek(SeekFrom::Start(0))?;
        f.write_all(data)?;
        f.sync_all()?;
        Ok(())
    }
}

/// RAM-backed region for tests: corruption and write faults on demand.
pub struct MemStorage {
    region: Vec<u8>,
    pub fail_writes: bool,
    pub erases: u32,
    pub programs: u32,
}

impl MemStorage {
    /// Fresh erased region.
    pub fn new() -> Self {
        Self::with_region(vec![0xFF; RECORD_LEN])
    }

    /// Region seeded with arbitrary bytes.
    pub fn with_region(region: Vec<u8>) -> Self {
        Self {
            region,
            fail_writes: false,
            erases: 0,
            programs: 0,
        }
    }

    pub fn region(&self) -> &[u8] {
        &self.region
    }
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl NvStorage for MemStorage {
    fn read(&mut self, buf: &mut [u8]) -> Result<(), StorageError> {
        if self.region.len() < buf.len() {
            return Err(StorageError::RegionTooSmall(self.region.len()));
        }
        buf.copy_from_slice(&self.region[..buf.len()]);
        Ok(())
    }

    fn erase(&mut self) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Io(std::io::Error::other("simulated fault")));
        }
        self.erases += 1;
        self.region.fill(0xFF);
        Ok(())
    }

    fn program(&mut self, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Io(std::io::Error::other("simulated fault")));
        }
        self.programs += 1;
        let n = data.len().min(self.region.len());
        self.region[..n].copy_from_slice(&data[..n]);
        Ok(())
    }
}

// ========================================
// Store
// ========================================

/// Load/save front end over one reserved region.
pub struct ConfigStore {
    storage: Box<dyn NvStorage>,
}

impl ConfigStore {
    pub fn new(storage: Box<dyn NvStorage>) -> Self {
        Self { storage }
    }

    /// Load the persisted record, or factory defaults when the region is
    /// blank, corrupt, or unreadable. Never fails: cold start is normal.
    pub fn load(&mut self) -> SystemConfig {
        let mut raw = [0xFF_u8; RECORD_LEN];
        match self.storage.read(&mut raw) {
            Ok(()) => match SystemConfig::decode(&raw) {
                Some(cfg) => {
                    debug!("config record loaded, node_id={}", cfg.node_id);
                    cfg
                }
                None => {
                    info!("config record blank or invalid, using factory defaults");
                    SystemConfig::default()
                }
            },
            Err(e) => {
                warn!("config read failed ({e}), using factory defaults");
                SystemConfig::default()
            }
        }
    }

    /// Write `cfg` as one erase-then-program cycle.
    pub fn save(&mut self, cfg: &SystemConfig) -> Result<(), StorageError> {
        let raw = cfg.encode();
        self.storage.erase()?;
        self.storage.program(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_known_value() {
        assert_eq!(additive_checksum(&[]), 0);
        assert_eq!(additive_checksum(&[1, 2, 3]), 6);
        assert_eq!(additive_checksum(&[0xFF; 4]), 4 * 255);
    }

    #[test]
    fn test_field_roundtrip() {
        let mut field = [0u8; 8];
        put_str(&mut field, "bee");
        assert_eq!(get_str(&field), "bee");
    }

    #[test]
    fn test_field_truncates() {
        let mut field = [0u8; 4];
        put_str(&mut field, "long-node-name");
        assert_eq!(get_str(&field), "long");
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let mut raw = SystemConfig::default().encode();
        raw[0] ^= 0x01;
        assert!(SystemConfig::decode(&raw).is_none());
    }

    #[test]
    fn test_decode_rejects_short_input() {
        assert!(SystemConfig::decode(&[0u8; 10]).is_none());
    }
}
