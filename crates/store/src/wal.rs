//! Write-Ahead Log (WAL) for durability.
//!
//! Format: each entry is `[4-byte CRC32][4-byte length][JSON payload]\n`.
//! On recovery, replay all valid entries. A corrupt or truncated tail stops
//! replay at the last good entry.

use crate::record::WalRecord;
use crc32fast::Hasher;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum WalError {
    #[error("WAL I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("WAL serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Fsync policy for the WAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsyncPolicy {
    /// Fsync after every write.
    Always,
    /// Fsync periodically (caller controls).
    Batch,
    /// Never explicitly fsync (OS decides).
    None,
}

impl FsyncPolicy {
    pub fn from_str_config(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "always" => Self::Always,
            "none" => Self::None,
            _ => Self::Batch,
        }
    }
}

/// An append-only write-ahead log of [`WalRecord`]s.
#[derive(Debug)]
pub struct Wal {
    writer: BufWriter<File>,
    #[allow(dead_code)] // will be used for WAL rotation
    path: PathBuf,
    fsync: FsyncPolicy,
    entries_written: u64,
}

impl Wal {
    /// Open or create a WAL file at the given path.
    pub fn open(path: &Path, fsync: FsyncPolicy) -> Result<Self, WalError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            fsync,
            entries_written: 0,
        })
    }

    /// Append a record to the WAL.
    pub fn append(&mut self, record: &WalRecord) -> Result<(), WalError> {
        let payload = serde_json::to_vec(record)?;

        let mut hasher = Hasher::new();
        hasher.update(&payload);
        let crc = hasher.finalize();

        let len = payload.len() as u32;

        // CRC(4) + LEN(4) + PAYLOAD + \n
        self.writer.write_all(&crc.to_le_bytes())?;
        self.writer.write_all(&len.to_le_bytes())?;
        self.writer.write_all(&payload)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;

        if self.fsync == FsyncPolicy::Always {
            self.writer.get_ref().sync_all()?;
        }

        self.entries_written += 1;
        Ok(())
    }

    /// Explicitly fsync the WAL (for batch mode).
    pub fn sync(&mut self) -> Result<(), WalError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Number of entries written since open.
    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    /// Replay all valid entries from a WAL file, in write order.
    /// Stops at the first corrupt or truncated entry.
    pub fn replay(path: &Path) -> Result<Vec<WalRecord>, WalError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(WalError::Io(e)),
        };

        let mut reader = BufReader::new(file);
        let mut records = Vec::new();
        let mut entry_num = 0u64;

        loop {
            // CRC (4 bytes); clean EOF here means we are done.
            let mut crc_buf = [0u8; 4];
            match io::Read::read_exact(&mut reader, &mut crc_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(WalError::Io(e)),
            }
            let expected_crc = u32::from_le_bytes(crc_buf);

            // Helper macro: treat UnexpectedEof as truncated entry (stop replay).
            macro_rules! read_or_break {
                ($reader:expr, $buf:expr) => {
                    match io::Read::read_exact($reader, $buf) {
                        Ok(()) => {}
                        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                            tracing::warn!(
                                "WAL truncated mid-entry at entry {}; stopping replay",
                                entry_num
                            );
                            break;
                        }
                        Err(e) => return Err(WalError::Io(e)),
                    }
                };
            }

            let mut len_buf = [0u8; 4];
            read_or_break!(&mut reader, &mut len_buf);
            let len = u32::from_le_bytes(len_buf) as usize;

            let mut payload = vec![0u8; len];
            read_or_break!(&mut reader, &mut payload);

            let mut nl = [0u8; 1];
            read_or_break!(&mut reader, &mut nl);

            let mut hasher = Hasher::new();
            hasher.update(&payload);
            let actual_crc = hasher.finalize();

            if actual_crc != expected_crc {
                tracing::warn!(
                    "WAL CRC mismatch at entry {}: expected {:#010x}, got {:#010x}; stopping replay",
                    entry_num,
                    expected_crc,
                    actual_crc
                );
                break; // Truncate at corruption
            }

            let record: WalRecord = serde_json::from_slice(&payload)?;
            records.push(record);
            entry_num += 1;
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn put_record(table: &str, row: &str, value: &str) -> WalRecord {
        WalRecord::PutCell {
            table: table.to_string(),
            row_key: row.as_bytes().to_vec(),
            family: "cf1".to_string(),
            qualifier: b"q1".to_vec(),
            value: value.as_bytes().to_vec(),
            timestamp_ms: 1,
        }
    }

    #[test]
    fn test_wal_write_and_replay() {
        let dir = TempDir::new().unwrap();
        let wal_path = dir.path().join("test.wal");

        {
            let mut wal = Wal::open(&wal_path, FsyncPolicy::Always).unwrap();
            wal.append(&WalRecord::CreateTable {
                table: "t".to_string(),
                families: ["cf1".to_string()].into_iter().collect(),
            })
            .unwrap();
            wal.append(&put_record("t", "r1", "v1")).unwrap();
            wal.append(&put_record("t", "r2", "v2")).unwrap();
            assert_eq!(wal.entries_written(), 3);
        }

        let records = Wal::replay(&wal_path).unwrap();
        assert_eq!(records.len(), 3);
        assert!(matches!(records[0], WalRecord::CreateTable { .. }));
        match &records[1] {
            WalRecord::PutCell { row_key, value, .. } => {
                assert_eq!(row_key, b"r1");
                assert_eq!(value, b"v1");
            }
            other => panic!("expected PutCell, got {:?}", other),
        }
    }

    #[test]
    fn test_wal_replay_missing_file() {
        let dir = TempDir::new().unwrap();
        let records = Wal::replay(&dir.path().join("absent.wal")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_wal_replay_truncated_tail() {
        let dir = TempDir::new().unwrap();
        let wal_path = dir.path().join("trunc.wal");

        {
            let mut wal = Wal::open(&wal_path, FsyncPolicy::Always).unwrap();
            wal.append(&put_record("t", "r1", "v1")).unwrap();
            wal.append(&put_record("t", "r2", "v2")).unwrap();
            wal.append(&put_record("t", "r3", "v3")).unwrap();
        }

        // Chop off the end of the file mid-entry.
        {
            let file = OpenOptions::new().write(true).open(&wal_path).unwrap();
            let len = file.metadata().unwrap().len();
            file.set_len(len - 5).unwrap();
        }

        let records = Wal::replay(&wal_path).unwrap();
        assert_eq!(
            records.len(),
            2,
            "should recover 2 of 3 entries after truncation"
        );
    }

    #[test]
    fn test_wal_replay_corrupt_crc() {
        let dir = TempDir::new().unwrap();
        let wal_path = dir.path().join("crc.wal");

        {
            let mut wal = Wal::open(&wal_path, FsyncPolicy::Always).unwrap();
            wal.append(&put_record("t", "r1", "v1")).unwrap();
            wal.append(&put_record("t", "r2", "v2")).unwrap();
        }

        // Flip a byte inside the second entry's payload.
        {
            let mut contents = std::fs::read(&wal_path).unwrap();
            let idx = contents.len() - 10;
            contents[idx] ^= 0xFF;
            std::fs::write(&wal_path, contents).unwrap();
        }

        let records = Wal::replay(&wal_path).unwrap();
        assert_eq!(records.len(), 1, "corrupt entry should stop replay");
    }
}
