use std::io::Write;

use datalift_protocol::constants::{CHUNKED_MIN_BYTES, LZ4_AUTO_MAX_BYTES};
use datalift_protocol::{Codec, Compression, TransferProfile};

use crate::CompressError;

/// zstd level 3: fast with a reasonable ratio.
const ZSTD_LEVEL: i32 = 3;

/// Outcome of compressing a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionResult {
    /// Codec actually applied. [`Codec::None`] when compression was skipped
    /// or did not shrink the payload.
    pub method: Codec,
    pub original_size: usize,
    pub compressed_size: usize,
    /// The bytes to put on the wire (the original payload when `method` is
    /// [`Codec::None`]).
    pub data: Vec<u8>,
}

impl CompressionResult {
    /// Space savings as `1 - compressed/original`, in `[0, 1)`.
    pub fn ratio(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        1.0 - self.compressed_size as f64 / self.original_size as f64
    }

    fn uncompressed(data: Vec<u8>) -> Self {
        let len = data.len();
        Self {
            method: Codec::None,
            original_size: len,
            compressed_size: len,
            data,
        }
    }
}

/// Picks a codec for a payload of `len` serialized bytes.
///
/// An explicit caller choice always wins. `auto` prefers LZ4 where speed
/// matters (real-time profile, small payloads), deflate where ratio matters
/// (batch profile, chunked-bound payloads), and zstd for the band between.
pub fn select_codec(len: usize, profile: TransferProfile, choice: Compression) -> Codec {
    if let Some(codec) = choice.fixed_codec() {
        return codec;
    }
    match profile {
        TransferProfile::Realtime => Codec::Lz4,
        TransferProfile::Batch => Codec::Deflate,
        TransferProfile::Default => {
            if len < LZ4_AUTO_MAX_BYTES {
                Codec::Lz4
            } else if len >= CHUNKED_MIN_BYTES {
                Codec::Deflate
            } else {
                Codec::Zstd
            }
        }
    }
}

/// Compresses `payload` with the codec selected for it.
///
/// Falls back to [`Codec::None`] (keeping the original bytes) whenever the
/// encoded form is not strictly smaller than the input.
pub fn compress(
    payload: Vec<u8>,
    profile: TransferProfile,
    choice: Compression,
) -> Result<CompressionResult, CompressError> {
    let codec = select_codec(payload.len(), profile, choice);
    if codec == Codec::None {
        return Ok(CompressionResult::uncompressed(payload));
    }

    let encoded = encode(&payload, codec)?;
    if encoded.len() >= payload.len() {
        tracing::debug!(
            codec = %codec,
            original = payload.len(),
            encoded = encoded.len(),
            "compression did not shrink payload, sending uncompressed"
        );
        return Ok(CompressionResult::uncompressed(payload));
    }

    Ok(CompressionResult {
        method: codec,
        original_size: payload.len(),
        compressed_size: encoded.len(),
        data: encoded,
    })
}

/// Encodes `data` with `codec`. [`Codec::None`] copies the input.
pub fn encode(data: &[u8], codec: Codec) -> Result<Vec<u8>, CompressError> {
    match codec {
        Codec::Deflate => {
            let encode_err = |e: std::io::Error| CompressError::Encode {
                codec,
                message: e.to_string(),
            };
            let mut encoder =
                flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(data).map_err(encode_err)?;
            encoder.finish().map_err(encode_err)
        }
        Codec::Lz4 => Ok(lz4_flex::compress_prepend_size(data)),
        Codec::Zstd => zstd::encode_all(data, ZSTD_LEVEL).map_err(|e| CompressError::Encode {
            codec,
            message: e.to_string(),
        }),
        Codec::None => Ok(data.to_vec()),
    }
}

/// Decodes `data` with `codec`. Exact left inverse of [`encode`] for every
/// codec: `decode(encode(x)) == x` byte for byte.
pub fn decode(data: &[u8], codec: Codec) -> Result<Vec<u8>, CompressError> {
    match codec {
        Codec::Deflate => {
            let decode_err = |e: std::io::Error| CompressError::Decode {
                codec,
                message: e.to_string(),
            };
            let mut decoder = flate2::write::ZlibDecoder::new(Vec::new());
            decoder.write_all(data).map_err(decode_err)?;
            decoder.finish().map_err(decode_err)
        }
        Codec::Lz4 => {
            lz4_flex::decompress_size_prepended(data).map_err(|e| CompressError::Decode {
                codec,
                message: e.to_string(),
            })
        }
        Codec::Zstd => zstd::decode_all(data).map_err(|e| CompressError::Decode {
            codec,
            message: e.to_string(),
        }),
        Codec::None => Ok(data.to_vec()),
    }
}
