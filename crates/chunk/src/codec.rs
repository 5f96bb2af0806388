use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::ChunkError;

/// One ordered fragment of a larger (possibly compressed) payload.
///
/// The owning session id travels alongside the chunk on the wire; the codec
/// itself only cares about position and integrity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based position, contiguous within a transfer.
    pub index: u32,
    /// Total chunk count of the transfer this fragment belongs to.
    pub total_chunks: u32,
    /// Fragment bytes, at most the `max_chunk_size` the payload was split with.
    pub data: Vec<u8>,
    /// CRC32 of `data`.
    pub checksum: u32,
}

impl Chunk {
    /// Returns `true` if `checksum` matches `data`.
    pub fn verify(&self) -> bool {
        checksum(&self.data) == self.checksum
    }
}

/// Computes the CRC32 checksum of a chunk's data.
pub fn checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Computes SHA-256 of a whole payload and returns the hex-encoded digest.
pub fn digest_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Splits `payload` into `ceil(len / max_chunk_size)` ordered chunks.
///
/// Chunk `i` covers bytes `[i * max_chunk_size, min((i + 1) * max_chunk_size,
/// len))`. `max_chunk_size` is measured in bytes of the payload as given,
/// before any transport-level encoding. An empty payload yields a single
/// empty chunk so the split/assemble round trip holds for every input.
pub fn split(payload: &[u8], max_chunk_size: usize) -> Result<Vec<Chunk>, ChunkError> {
    if max_chunk_size == 0 {
        return Err(ChunkError::InvalidChunkSize);
    }

    let total = payload.len().div_ceil(max_chunk_size).max(1) as u32;
    let mut chunks = Vec::with_capacity(total as usize);
    for index in 0..total {
        let start = index as usize * max_chunk_size;
        let end = (start + max_chunk_size).min(payload.len());
        let data = payload[start..end].to_vec();
        let checksum = checksum(&data);
        chunks.push(Chunk {
            index,
            total_chunks: total,
            data,
            checksum,
        });
    }
    Ok(chunks)
}

/// Reassembles chunks into the original payload.
///
/// Order of `chunks` is irrelevant; positions come from each chunk's index.
/// Duplicate indices are tolerated (the last occurrence wins). Fails when
/// any index in `[0, total)` is absent, any index is out of range, declared
/// totals disagree, or a checksum does not match its data.
pub fn assemble(chunks: &[Chunk]) -> Result<Vec<u8>, ChunkError> {
    let Some(first) = chunks.first() else {
        return Err(ChunkError::Empty);
    };
    let expected = first.total_chunks;

    let mut by_index: HashMap<u32, &Chunk> = HashMap::with_capacity(chunks.len());
    for chunk in chunks {
        if chunk.total_chunks != expected {
            return Err(ChunkError::TotalMismatch {
                index: chunk.index,
                declared: chunk.total_chunks,
                expected,
            });
        }
        if chunk.index >= expected {
            return Err(ChunkError::IndexOutOfRange {
                index: chunk.index,
                expected,
            });
        }
        by_index.insert(chunk.index, chunk);
    }

    let missing: Vec<u32> = (0..expected).filter(|i| !by_index.contains_key(i)).collect();
    if !missing.is_empty() {
        return Err(ChunkError::Incomplete { missing });
    }

    let capacity = by_index.values().map(|c| c.data.len()).sum();
    let mut payload = Vec::with_capacity(capacity);
    for index in 0..expected {
        let chunk = by_index[&index];
        if !chunk.verify() {
            return Err(ChunkError::ChecksumMismatch { index });
        }
        payload.extend_from_slice(&chunk.data);
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn split_covers_exact_ranges() {
        let p = b"AABBCCDDEE"; // 10 bytes
        let chunks = split(p, 4).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].data, b"AABB");
        assert_eq!(chunks[1].data, b"CCDD");
        assert_eq!(chunks[2].data, b"EE");
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i as u32);
            assert_eq!(c.total_chunks, 3);
            assert!(c.verify());
        }
    }

    #[test]
    fn split_rejects_zero_chunk_size() {
        assert!(matches!(
            split(b"data", 0),
            Err(ChunkError::InvalidChunkSize)
        ));
    }

    #[test]
    fn roundtrip_various_sizes() {
        for len in [0, 1, 5999, 6000, 6001, 25_000] {
            for size in [1, 7, 6000, 100_000] {
                let p = payload(len);
                let chunks = split(&p, size).unwrap();
                assert_eq!(
                    chunks.len(),
                    len.div_ceil(size).max(1),
                    "len={len} size={size}"
                );
                assert_eq!(assemble(&chunks).unwrap(), p, "len={len} size={size}");
            }
        }
    }

    #[test]
    fn empty_payload_is_one_empty_chunk() {
        let chunks = split(&[], 6000).unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].data.is_empty());
        assert_eq!(assemble(&chunks).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn assemble_ignores_arrival_order() {
        let p = payload(25_000);
        let mut chunks = split(&p, 6000).unwrap();
        chunks.reverse();
        chunks.swap(0, 2);
        assert_eq!(assemble(&chunks).unwrap(), p);
    }

    #[test]
    fn assemble_reports_every_missing_index() {
        let p = payload(30_000);
        let chunks = split(&p, 6000).unwrap();
        let partial: Vec<Chunk> = chunks
            .iter()
            .filter(|c| c.index != 1 && c.index != 3)
            .cloned()
            .collect();
        match assemble(&partial) {
            Err(ChunkError::Incomplete { missing }) => assert_eq!(missing, vec![1, 3]),
            other => panic!("expected Incomplete, got {other:?}"),
        }
    }

    #[test]
    fn assemble_detects_corruption() {
        let p = payload(12_000);
        let mut chunks = split(&p, 6000).unwrap();
        chunks[1].data[0] ^= 0xFF;
        match assemble(&chunks) {
            Err(ChunkError::ChecksumMismatch { index }) => assert_eq!(index, 1),
            other => panic!("expected ChecksumMismatch, got {other:?}"),
        }
    }

    #[test]
    fn assemble_tolerates_duplicates() {
        let p = payload(12_000);
        let mut chunks = split(&p, 6000).unwrap();
        let dup = chunks[0].clone();
        chunks.push(dup);
        assert_eq!(assemble(&chunks).unwrap(), p);
    }

    #[test]
    fn assemble_rejects_total_disagreement() {
        let p = payload(12_000);
        let mut chunks = split(&p, 6000).unwrap();
        chunks[1].total_chunks = 5;
        assert!(matches!(
            assemble(&chunks),
            Err(ChunkError::TotalMismatch {
                index: 1,
                declared: 5,
                expected: 2
            })
        ));
    }

    #[test]
    fn assemble_rejects_out_of_range_index() {
        let chunk = Chunk {
            index: 7,
            total_chunks: 2,
            data: b"x".to_vec(),
            checksum: checksum(b"x"),
        };
        let valid = split(b"ab", 1).unwrap();
        let mixed = vec![valid[0].clone(), valid[1].clone(), chunk];
        assert!(matches!(
            assemble(&mixed),
            Err(ChunkError::IndexOutOfRange {
                index: 7,
                expected: 2
            })
        ));
    }

    #[test]
    fn digest_is_stable_hex() {
        let d1 = digest_hex(b"hello world");
        let d2 = digest_hex(b"hello world");
        assert_eq!(d1, d2);
        assert_eq!(d1.len(), 64);
        assert_ne!(d1, digest_hex(b"hello worle"));
    }
}
