use sha2::{Digest, Sha256};

const MAGIC: &[u8; 4] = b"PGSV";
pub const SAVE_FORMAT_VERSION: u16 = 1;
const HASH_LEN: usize = 32;

/// Frames a payload as: magic, format version (u16 LE), payload length
/// (u32 LE), SHA-256 of the payload, payload.
pub(crate) fn encode_envelope(payload: &[u8]) -> Result<Vec<u8>, String> {
    let payload_len = u32::try_from(payload.len())
        .map_err(|_| format!("payload of {} bytes exceeds u32 length", payload.len()))?;

    let mut bytes = Vec::<u8>::with_capacity(MAGIC.len() + 2 + 4 + HASH_LEN + payload.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&SAVE_FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&payload_len.to_le_bytes());
    bytes.extend_from_slice(&sha256_bytes(payload));
    bytes.extend_from_slice(payload);
    Ok(bytes)
}

/// Returns the verified payload slice, or a message naming what is wrong.
pub(crate) fn decode_envelope(bytes: &[u8]) -> Result<&[u8], String> {
    let mut cursor = 0usize;

    let magic = read_exact(bytes, &mut cursor, MAGIC.len())?;
    if magic != MAGIC {
        return Err("invalid magic".to_string());
    }

    let version = read_u16(bytes, &mut cursor)?;
    if version != SAVE_FORMAT_VERSION {
        return Err(format!(
            "unsupported save format version {version} (expected {SAVE_FORMAT_VERSION})"
        ));
    }

    let payload_len = read_u32(bytes, &mut cursor)? as usize;
    let expected_hash = read_exact(bytes, &mut cursor, HASH_LEN)?;
    let payload = read_exact(bytes, &mut cursor, payload_len)?;
    if cursor != bytes.len() {
        return Err("unexpected trailing bytes".to_string());
    }
    if expected_hash != sha256_bytes(payload).as_slice() {
        return Err("payload hash mismatch".to_string());
    }
    Ok(payload)
}

fn read_exact<'a>(bytes: &'a [u8], cursor: &mut usize, len: usize) -> Result<&'a [u8], String> {
    let end = cursor
        .checked_add(len)
        .ok_or_else(|| "length overflow".to_string())?;
    let slice = bytes
        .get(*cursor..end)
        .ok_or_else(|| format!("truncated at byte {} (wanted {len} more)", *cursor))?;
    *cursor = end;
    Ok(slice)
}

fn read_u16(bytes: &[u8], cursor: &mut usize) -> Result<u16, String> {
    let raw = read_exact(bytes, cursor, 2)?;
    let array: [u8; 2] = raw
        .try_into()
        .map_err(|_| "invalid u16 encoding".to_string())?;
    Ok(u16::from_le_bytes(array))
}

fn read_u32(bytes: &[u8], cursor: &mut usize) -> Result<u32, String> {
    let raw = read_exact(bytes, cursor, 4)?;
    let array: [u8; 4] = raw
        .try_into()
        .map_err(|_| "invalid u32 encoding".to_string())?;
    Ok(u32::from_le_bytes(array))
}

fn sha256_bytes(bytes: &[u8]) -> [u8; HASH_LEN] {
    let digest = Sha256::digest(bytes);
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(&digest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_returns_framed_payload() {
        let bytes = encode_envelope(br#"{"score":40}"#).expect("encode");
        assert_eq!(&bytes[..4], MAGIC);
        assert_eq!(decode_envelope(&bytes).expect("decode"), br#"{"score":40}"#);
    }

    #[test]
    fn empty_payload_is_valid() {
        let bytes = encode_envelope(b"").expect("encode");
        assert_eq!(decode_envelope(&bytes).expect("decode"), b"");
    }

    #[test]
    fn truncated_envelope_is_rejected() {
        let bytes = encode_envelope(b"payload").expect("encode");
        let err = decode_envelope(&bytes[..bytes.len() - 3]).expect_err("truncated");
        assert!(err.starts_with("truncated"), "{err}");
    }

    #[test]
    fn flipped_payload_byte_fails_hash_check() {
        let mut bytes = encode_envelope(b"payload").expect("encode");
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert_eq!(
            decode_envelope(&bytes).expect_err("tampered"),
            "payload hash mismatch"
        );
    }

    #[test]
    fn wrong_magic_and_version_are_rejected() {
        let mut bytes = encode_envelope(b"x").expect("encode");
        bytes[0] = b'X';
        assert_eq!(decode_envelope(&bytes).expect_err("magic"), "invalid magic");

        let mut bytes = encode_envelope(b"x").expect("encode");
        bytes[4] = 9;
        let err = decode_envelope(&bytes).expect_err("version");
        assert!(err.contains("unsupported save format version 9"), "{err}");
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = encode_envelope(b"x").expect("encode");
        bytes.push(0);
        assert_eq!(
            decode_envelope(&bytes).expect_err("trailing"),
            "unexpected trailing bytes"
        );
    }
}
