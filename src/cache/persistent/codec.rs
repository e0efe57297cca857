//! Entry framing for the record log.
//!
//! Each log entry is a self-checking frame around a JSON-serialized record:
//!
//! ```text
//! [version: 1][payload length: u32 LE][payload: JSON][crc32: u32 LE]
//! ```
//!
//! The checksum covers the version byte and the payload, so a bit flip
//! anywhere in a frame fails verification. The file itself opens with a
//! magic/version header distinguishing a cache log from arbitrary files in
//! the same directory.

use std::io::{Error as IoError, ErrorKind, Read, Result as IoResult, Write};

use serde::{de::DeserializeOwned, Serialize};

/// Frame layout version.
const FRAME_VERSION: u8 = 1;

/// File-type marker at the start of every cache log.
pub const MAGIC: [u8; 4] = *b"ALNK";

/// Bytes occupied by the file header (magic plus version).
pub const HEADER_SIZE: u64 = MAGIC.len() as u64 + 1;

/// A single record is a heading plus at most a handful of candidates; a
/// frame claiming more than this is debris, not data.
const ENTRY_CAP: u32 = 1024 * 1024;

fn corrupt(message: impl Into<String>) -> IoError {
    IoError::new(ErrorKind::InvalidData, message.into())
}

fn checksum(version: u8, payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&[version]);
    hasher.update(payload);
    hasher.finalize()
}

fn read_u8(reader: &mut impl Read) -> IoResult<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32(reader: &mut impl Read) -> IoResult<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Frame one value for appending to the log.
pub fn encode<T: Serialize>(value: &T) -> IoResult<Vec<u8>> {
    let payload = serde_json::to_vec(value)
        .map_err(|e| corrupt(format!("record does not serialize: {e}")))?;

    #[allow(clippy::cast_possible_truncation)]
    let length = payload.len() as u32;
    let crc = checksum(FRAME_VERSION, &payload);

    let mut frame = Vec::with_capacity(payload.len() + 9);
    frame.push(FRAME_VERSION);
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&payload);
    frame.extend_from_slice(&crc.to_le_bytes());
    Ok(frame)
}

/// Read and verify one frame, yielding its deserialized payload.
///
/// # Errors
/// `ErrorKind::UnexpectedEof` when the reader ends mid-frame (the truncated
/// tail of an interrupted write); `ErrorKind::InvalidData` for a version,
/// size, checksum, or deserialization problem.
pub fn decode<T: DeserializeOwned>(reader: &mut impl Read) -> IoResult<T> {
    let version = read_u8(reader)?;
    if version != FRAME_VERSION {
        return Err(corrupt(format!(
            "unknown frame version {version}, this build reads {FRAME_VERSION}"
        )));
    }

    let length = read_u32(reader)?;
    if length > ENTRY_CAP {
        return Err(corrupt(format!(
            "frame claims {length} bytes, cap is {ENTRY_CAP}"
        )));
    }

    let mut payload = vec![0u8; length as usize];
    reader.read_exact(&mut payload)?;

    let stored = read_u32(reader)?;
    let computed = checksum(version, &payload);
    if stored != computed {
        return Err(corrupt(format!(
            "checksum mismatch, stored {stored:08x} computed {computed:08x}"
        )));
    }

    serde_json::from_slice(&payload)
        .map_err(|e| corrupt(format!("record does not deserialize: {e}")))
}

/// Write the magic/version file header.
pub fn write_header(writer: &mut impl Write) -> IoResult<()> {
    writer.write_all(&MAGIC)?;
    writer.write_all(&[FRAME_VERSION])
}

/// Read the file header, checking the magic and returning the version.
pub fn read_header(reader: &mut impl Read) -> IoResult<u8> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(corrupt(format!(
            "not a cache log, leading bytes {magic:?}"
        )));
    }
    read_u8(reader)
}
