use crate::error::SessionError;

/// Decode an uploaded chunk body into i16 mono PCM samples.
///
/// Chunks are little-endian 16-bit signed frames; anything that cannot be
/// framed that way is rejected as a single bad submission without touching
/// session state.
pub fn decode_chunk(bytes: &[u8], max_bytes: usize) -> Result<Vec<i16>, SessionError> {
    if bytes.is_empty() {
        return Err(SessionError::MalformedChunk("empty body".to_string()));
    }

    if bytes.len() > max_bytes {
        return Err(SessionError::MalformedChunk(format!(
            "chunk is {} bytes, limit is {}",
            bytes.len(),
            max_bytes
        )));
    }

    if bytes.len() % 2 != 0 {
        return Err(SessionError::MalformedChunk(format!(
            "odd byte count {} cannot frame 16-bit samples",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Encode samples back to little-endian bytes for the engine boundary.
pub fn encode_samples(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
