//! This module provides the Lempel-Ziv-Welch decompression used by GIF.

use crate::error::{CropResult, Error, MalformedKind};

use super::bitstream::LsbReader;
use super::decoder::Strictness;

const MAX_CODESIZE: u8 = 12;
const MAX_ENTRIES: usize = 1 << MAX_CODESIZE;

/// Alias for a LZW code point.
type Code = u16;

/// Decoding dictionary.
///
/// Entries are `(prefix code, suffix byte)`; a sequence is reconstructed by
/// chasing prefixes and reversing.
struct DecodingDict {
    min_size: u8,
    table: Vec<(Option<Code>, u8)>,
    buffer: Vec<u8>,
}

impl DecodingDict {
    /// Creates a new dict seeded for `min_size`-bit literals.
    fn new(min_size: u8) -> DecodingDict {
        let mut this = DecodingDict {
            min_size,
            table: Vec::with_capacity(512),
            buffer: Vec::with_capacity((1 << MAX_CODESIZE) - 1),
        };
        this.reset();
        this
    }

    /// Resets the dictionary to its seeded state.
    ///
    /// The two sentinel entries keep table indices aligned with the clear
    /// and end codes.
    fn reset(&mut self) {
        self.table.clear();
        for i in 0..(1u16 << self.min_size) {
            self.table.push((None, i as u8));
        }
        self.table.push((None, 0)); // clear code
        self.table.push((None, 0)); // end code
    }

    /// Inserts a value into the dict.
    #[inline]
    fn push(&mut self, key: Option<Code>, value: u8) {
        self.table.push((key, value));
    }

    /// Reconstructs the byte sequence for `code` into the internal buffer.
    fn reconstruct(&mut self, code: Code) -> &[u8] {
        self.buffer.clear();
        let mut entry = self.table[code as usize];
        self.buffer.push(entry.1);
        while let Some(k) = entry.0 {
            entry = self.table[k as usize];
            self.buffer.push(entry.1);
        }
        self.buffer.reverse();
        &self.buffer
    }

    /// The next free code, i.e. the current number of entries.
    #[inline]
    fn next_code(&self) -> Code {
        self.table.len() as Code
    }
}

/// Decompresses an LZW stream with the given minimum code size.
///
/// The code width starts at `min_code_size + 1` bits and grows whenever the
/// table size reaches `1 << code_size`, capped at 12 bits. Running out of
/// input mid-code ends decoding without error under either policy; a code
/// referencing an unpopulated table slot is a [`MalformedStream`] error under
/// [`Strictness::Strict`] and an immediate clean stop under
/// [`Strictness::Lenient`].
///
/// [`MalformedStream`]: crate::Error::MalformedStream
pub fn decode(min_code_size: u8, data: &[u8], strictness: Strictness) -> CropResult<Vec<u8>> {
    if !(2..=11).contains(&min_code_size) {
        return Err(Error::malformed(MalformedKind::BadMinimumCodeSize {
            size: min_code_size,
        }));
    }

    let clear_code: Code = 1 << min_code_size;
    let end_code: Code = clear_code + 1;
    let mut table = DecodingDict::new(min_code_size);
    let mut code_size = min_code_size + 1;
    let mut prev: Option<Code> = None;
    let mut reader = LsbReader::new(data);
    let mut out = Vec::new();

    loop {
        let code = match reader.read_bits(code_size) {
            Some(code) => code,
            None => return Ok(out),
        };
        if code == clear_code {
            table.reset();
            code_size = min_code_size + 1;
            prev = None;
        } else if code == end_code {
            return Ok(out);
        } else {
            let next_code = table.next_code();
            if code > next_code || (prev.is_none() && code >= clear_code) {
                return match strictness {
                    Strictness::Strict => Err(Error::malformed(MalformedKind::InvalidLzwCode {
                        code,
                        limit: next_code,
                    })),
                    Strictness::Lenient => Ok(out),
                };
            }
            if let Some(prev) = prev {
                if code == next_code {
                    // The KwKwK case: the new entry is the previous
                    // sequence extended by its own first byte.
                    let first = table.reconstruct(prev)[0];
                    table.push(Some(prev), first);
                    out.extend_from_slice(table.reconstruct(code));
                } else {
                    let first = table.reconstruct(code)[0];
                    out.extend_from_slice(&table.buffer);
                    // A full 12-bit table freezes until the next clear code.
                    if (table.next_code() as usize) < MAX_ENTRIES {
                        table.push(Some(prev), first);
                    }
                }
                if table.next_code() == (1 << code_size) && code_size < MAX_CODESIZE {
                    code_size += 1;
                }
            } else {
                out.push(code as u8);
            }
            prev = Some(code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::decode;
    use super::super::decoder::Strictness;
    use crate::error::Error;

    // Streams below are hand-packed: codes listed in comments, LSB first.

    #[test]
    fn literal_run() {
        // min size 2: clear(4), 0, 1, 2, 3, end(5). The table reaches
        // eight entries after "2", so "3" and the end code are four bits.
        let data = [0x44, 0x34, 0x05];
        assert_eq!(decode(2, &data, Strictness::Strict).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn kwkwk_case() {
        // min size 2: clear(4), 1, 6, end(5). Code 6 is not in the table
        // yet and resolves to "previous + previous[0]".
        let data = [0x8C, 0x0B];
        assert_eq!(decode(2, &data, Strictness::Strict).unwrap(), vec![1, 1, 1]);
    }

    #[test]
    fn clear_code_resets_table() {
        // min size 2: clear(4), 1, 1, clear(4), 2, 2, end(5). After the
        // mid-stream clear the dictionary entry built from the first run
        // must be gone and plain literals decode again.
        let data = [0x4C, 0x28, 0x15];
        assert_eq!(
            decode(2, &data, Strictness::Strict).unwrap(),
            vec![1, 1, 2, 2]
        );
    }

    #[test]
    fn exhausted_input_stops_without_error() {
        // clear(4) then 1, with no end code and no trailing bits.
        let data = [0x0C];
        assert_eq!(decode(2, &data, Strictness::Strict).unwrap(), vec![1]);
    }

    #[test]
    fn ordering_violation_strict() {
        // clear(4), 1, 7: code 7 skips ahead of the next free slot (6).
        let data = [0xCC, 0x01];
        match decode(2, &data, Strictness::Strict) {
            Err(Error::MalformedStream { .. }) => {}
            other => panic!("expected malformed stream, got {other:?}"),
        }
    }

    #[test]
    fn ordering_violation_lenient_stops_early() {
        let data = [0xCC, 0x01];
        assert_eq!(decode(2, &data, Strictness::Lenient).unwrap(), vec![1]);
    }

    #[test]
    fn rejects_out_of_range_code_size() {
        assert!(decode(1, &[0x00], Strictness::Strict).is_err());
        assert!(decode(12, &[0x00], Strictness::Strict).is_err());
    }
}
