use crate::common::Keyed;
use crate::errors::FlatdbResult;

/// Fixed-size binary codec for store records.
///
/// # Purpose
/// The record store holds records of one uniform byte width, fixed for the
/// lifetime of the backing file. Implementers describe that width and how a
/// record's fields map onto it. Integer fields are conventionally encoded
/// little-endian via `to_le_bytes`/`from_le_bytes`.
///
/// # Contract
/// - `encoded_len()` is constant for the type and greater than zero.
/// - `encode` fills a buffer of exactly `encoded_len()` bytes.
/// - `decode` parses a buffer of exactly `encoded_len()` bytes. It may still
///   reject invalid content; during reload such a rejection surfaces as a
///   corruption error.
/// - The [`Keyed`] key must survive a round-trip: `decode(encode(r))` yields
///   a record with `r.key()`.
pub trait FixedRecord: Keyed + Clone + Send + 'static {
    /// Encoded byte width, uniform for all values of the type.
    fn encoded_len() -> usize;

    /// Writes this record's bytes into `buf` (`buf.len() == encoded_len()`).
    fn encode(&self, buf: &mut [u8]);

    /// Parses a record from `buf` (`buf.len() == encoded_len()`).
    fn decode(buf: &[u8]) -> FlatdbResult<Self>;
}

/// A record cached by the store's index together with its file position.
///
/// `offset` is the byte position of the record's slot in the backing file.
/// The slot keys itself by the record's own key, so the index orders slots
/// exactly as it would order bare records.
#[derive(Clone, Debug)]
pub(crate) struct RecordSlot<R> {
    pub offset: u64,
    pub record: R,
}

impl<R: FixedRecord> Keyed for RecordSlot<R> {
    fn key(&self) -> i64 {
        self.record.key()
    }
}
