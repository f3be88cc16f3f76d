//! Field helpers shared by the storage codec (big-endian, commonware) and the
//! op-code wire codec (little-endian, fixed width).

use super::{messages::CodecError, MAX_MAPPING_NAME_LENGTH};
use bytes::{Buf, BufMut};
use commonware_codec::{Error, ReadExt, Write};

/// Writes a string as u32-length-prefixed UTF-8 bytes.
pub fn write_string(s: &str, writer: &mut impl BufMut) {
    let bytes = s.as_bytes();
    (bytes.len() as u32).write(writer);
    writer.put_slice(bytes);
}

/// Reads a u32-length-prefixed UTF-8 string, rejecting anything over `max_len` bytes.
pub fn read_string(reader: &mut impl Buf, max_len: usize) -> Result<String, Error> {
    let len = u32::read(reader)? as usize;
    if len > max_len {
        return Err(Error::Invalid("String", "too long"));
    }
    if reader.remaining() < len {
        return Err(Error::EndOfBuffer);
    }
    let mut bytes = vec![0u8; len];
    reader.copy_to_slice(&mut bytes);
    String::from_utf8(bytes).map_err(|_| Error::Invalid("String", "invalid UTF-8"))
}

pub fn string_encode_size(s: &str) -> usize {
    4 + s.len()
}

// ─── Op-code wire fields ─────────────────────────────────────────────────────

fn ensure(reader: &impl Buf, len: usize, field: &'static str) -> Result<(), CodecError> {
    if reader.remaining() < len {
        return Err(CodecError::Malformed(field));
    }
    Ok(())
}

pub(crate) fn get_u8(reader: &mut impl Buf, field: &'static str) -> Result<u8, CodecError> {
    ensure(reader, 1, field)?;
    Ok(reader.get_u8())
}

pub(crate) fn get_u32(reader: &mut impl Buf, field: &'static str) -> Result<u32, CodecError> {
    ensure(reader, 4, field)?;
    Ok(reader.get_u32_le())
}

pub(crate) fn get_u64(reader: &mut impl Buf, field: &'static str) -> Result<u64, CodecError> {
    ensure(reader, 8, field)?;
    Ok(reader.get_u64_le())
}

/// Reads a u16-length-prefixed mapping name.
pub(crate) fn get_name(reader: &mut impl Buf) -> Result<String, CodecError> {
    ensure(reader, 2, "name length")?;
    let len = reader.get_u16_le() as usize;
    if len > MAX_MAPPING_NAME_LENGTH {
        return Err(CodecError::NameTooLong {
            len,
            max: MAX_MAPPING_NAME_LENGTH,
        });
    }
    ensure(reader, len, "name")?;
    let mut bytes = vec![0u8; len];
    reader.copy_to_slice(&mut bytes);
    String::from_utf8(bytes).map_err(|_| CodecError::Malformed("name utf-8"))
}

pub(crate) fn put_name(writer: &mut impl BufMut, name: &str) -> Result<(), CodecError> {
    let bytes = name.as_bytes();
    if bytes.len() > MAX_MAPPING_NAME_LENGTH {
        return Err(CodecError::NameTooLong {
            len: bytes.len(),
            max: MAX_MAPPING_NAME_LENGTH,
        });
    }
    writer.put_u16_le(bytes.len() as u16);
    writer.put_slice(bytes);
    Ok(())
}
