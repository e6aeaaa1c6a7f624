//! Lossless state compression for transport

use std::io::{Read, Write};

use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};

use crate::State;

/// Opaque compressed state blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedState(pub Vec<u8>);

impl CompressedState {
    /// Size of the compressed blob in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the blob is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Encode a state with bincode and gzip the result
pub fn compress(state: &State) -> crate::Result<CompressedState> {
    let encoded = bincode::serialize(state)?;
    let mut encoder = GzEncoder::new(Vec::with_capacity(encoded.len() / 2), Compression::fast());
    encoder.write_all(&encoded)?;
    Ok(CompressedState(encoder.finish()?))
}

/// Inverse of [`compress`]
pub fn decompress(blob: &CompressedState) -> crate::Result<State> {
    let mut decoder = GzDecoder::new(blob.0.as_slice());
    let mut encoded = Vec::new();
    decoder.read_to_end(&mut encoded)?;
    Ok(bincode::deserialize(&encoded)?)
}
