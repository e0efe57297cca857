//! Append-only record log.
//!
//! Every `put` appends one codec-framed record; the full map is rebuilt on
//! open by replaying the log, last write per key winning. There is no
//! compaction: records are small and a cache that only ever grows by one
//! entry per novel heading stays tiny in practice.
//!
//! # File Format
//! ```text
//! [MAGIC: 4 bytes][VERSION: 1 byte]
//! [RECORD 1: codec-encoded CacheRecord]
//! [RECORD 2: codec-encoded CacheRecord]
//! ...
//! ```
//!
//! # Crash safety
//! A crash mid-append leaves a truncated or checksum-invalid tail. Replay
//! stops at the first undecodable entry, so a partial record is never
//! visible; every fully-flushed record before it survives.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Result as IoResult, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::outcome::CacheRecord;

use super::codec;

/// Append-only log of cache records.
///
/// Thread-safe via internal mutex, though the engine is single-threaded by
/// contract.
#[derive(Debug)]
pub struct RecordLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    sync_on_write: bool,
}

impl RecordLog {
    /// Open or create the log file.
    ///
    /// A new file gets the header; an existing file is left untouched (use
    /// [`RecordLog::replay`] to read it back).
    pub fn open(path: &Path, sync_on_write: bool) -> IoResult<Self> {
        let exists = path.exists() && std::fs::metadata(path)?.len() >= codec::HEADER_SIZE;

        if !exists {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?;
            codec::write_header(&mut file)?;
            if sync_on_write {
                file.sync_all()?;
            }
        }

        let file = OpenOptions::new().append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
            sync_on_write,
        })
    }

    /// Append one record, flushing (and fsyncing if configured) before
    /// returning, so the write is durable once this call succeeds.
    pub fn append(&self, record: &CacheRecord) -> IoResult<()> {
        let encoded = codec::encode(record)?;

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| std::io::Error::other("poisoned log writer lock"))?;
        writer.write_all(&encoded)?;
        writer.flush()?;

        if self.sync_on_write {
            writer.get_ref().sync_all()?;
        }

        Ok(())
    }

    /// Flush buffered writes to the OS.
    pub fn flush(&self) -> IoResult<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| std::io::Error::other("poisoned log writer lock"))?;
        writer.flush()
    }

    /// The log file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every decodable record from a log file, in write order.
    ///
    /// Stops silently at the first truncated or corrupt entry: everything
    /// before it is intact (CRC-verified), everything after is the debris
    /// of an interrupted write.
    pub fn replay(path: &Path) -> IoResult<Vec<CacheRecord>> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let version = codec::read_header(&mut reader)?;
        let _ = version; // single version so far; decode re-checks per entry

        let mut records = Vec::new();
        loop {
            match codec::decode::<CacheRecord>(&mut reader) {
                Ok(record) => records.push(record),
                Err(err) => {
                    if err.kind() != std::io::ErrorKind::UnexpectedEof {
                        log::warn!(
                            "cache log {}: stopping replay at undecodable entry: {err}",
                            path.display()
                        );
                    }
                    break;
                }
            }
        }

        Ok(records)
    }
}

impl Drop for RecordLog {
    fn drop(&mut self) {
        // put() already flushed every record; this only covers a writer
        // that died with the mutex intact.
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}
