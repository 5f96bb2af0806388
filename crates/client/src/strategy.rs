use datalift_protocol::Strategy;
use datalift_protocol::constants::{CHUNKED_MIN_BYTES, DIRECT_MAX_BYTES};

use crate::options::TransferOptions;

/// Maps a serialized payload length and the caller's options to a transfer
/// strategy. Pure: no side effects, no I/O.
///
/// Bands are inclusive on the large side: exactly 8 000 bytes classifies as
/// `Compressed`, exactly 1 000 000 as `Chunked`. An empty payload is
/// `Direct` and still makes the full request/response round trip.
pub fn classify(serialized_len: usize, options: &TransferOptions) -> Strategy {
    if options.session_management || serialized_len >= CHUNKED_MIN_BYTES {
        Strategy::Chunked
    } else if serialized_len >= DIRECT_MAX_BYTES {
        Strategy::Compressed
    } else {
        Strategy::Direct
    }
}
