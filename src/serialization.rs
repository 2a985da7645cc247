/// Serialization format options for exchange grids.
///
/// Each format has both a plain and an LZ4 compressed variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SerializationFormat {
    /// Bincode - compact binary
    Bincode,
    /// Bincode with LZ4 compression (default)
    #[default]
    BincodeLz4,
}

impl SerializationFormat {
    /// Returns true if this format uses LZ4 compression
    pub fn is_compressed(&self) -> bool {
        matches!(self, SerializationFormat::BincodeLz4)
    }
}

use crate::errors::XGError;
use serde::{de::DeserializeOwned, Serialize};

fn encode<T: Serialize>(data: &T) -> Result<Vec<u8>, XGError> {
    bincode::serde::encode_to_vec(data, bincode::config::standard())
        .map_err(|_| XGError::SerializationFailed)
}

fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, XGError> {
    let (value, read) = bincode::serde::decode_from_slice(data, bincode::config::standard())
        .map_err(|_| XGError::DeserializationFailed)?;
    if read != data.len()
    {
        return Err(XGError::DeserializationFailed);
    }
    Ok(value)
}

/// Serialize data to bytes using the specified format.
/// Applies LZ4 compression if the format variant ends with Lz4.
pub fn serialize<T: Serialize>(data: &T, format: SerializationFormat) -> Result<Vec<u8>, XGError> {
    let bytes = encode(data)?;
    if format.is_compressed() {
        Ok(lz4_flex::compress_prepend_size(&bytes))
    } else {
        Ok(bytes)
    }
}

/// Deserialize data from bytes using the specified format.
/// Applies LZ4 decompression if the format variant ends with Lz4.
pub fn deserialize<T: DeserializeOwned>(data: &[u8], format: SerializationFormat) -> Result<T, XGError> {
    if format.is_compressed() {
        let decompressed = lz4_flex::decompress_size_prepended(data)
            .map_err(|_| XGError::LZ4DecompressionFailed)?;
        decode(&decompressed)
    } else {
        decode(data)
    }
}
