//! Stream deblocker (§4.3): splits a growing byte buffer into
//! newline-delimited records, one per callback invocation.

/// Accumulates bytes from a transfer and yields complete, newline-terminated
/// records in arrival order. Partial trailing bytes remain buffered.
#[derive(Debug, Default)]
pub struct Deblocker {
    buffer: Vec<u8>,
}

impl Deblocker {
    #[must_use]
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Appends `chunk` to the internal buffer and returns every complete
    /// record (bytes up to, not including, each newline) now available.
    /// An empty record (two consecutive newlines, or a newline at the very
    /// start) is returned unchanged, per §4.3.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);
        let mut records = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let record: Vec<u8> = self.buffer.drain(..=pos).collect();
            // Drop the trailing newline we just consumed.
            let mut record = record;
            record.pop();
            records.push(record);
        }
        records
    }

    /// Bytes still buffered, not yet terminated by a newline.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant 1 (spec.md §8): for any byte stream split into chunks, the
    /// sequence of records emitted equals `S.split('\n')[:-1]`.
    #[test]
    fn deblocking_is_idempotent_to_chunking() {
        let s = b"one\ntwo\nthree\n";
        let expected: Vec<Vec<u8>> = vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()];

        // Whole-buffer case.
        let mut d = Deblocker::new();
        assert_eq!(d.push(s), expected);

        // Byte-at-a-time case.
        let mut d = Deblocker::new();
        let mut got = Vec::new();
        for b in s {
            got.extend(d.push(&[*b]));
        }
        assert_eq!(got, expected);

        // Arbitrary chunk boundaries.
        let mut d = Deblocker::new();
        let mut got = Vec::new();
        for chunk in [&s[0..2], &s[2..7], &s[7..]] {
            got.extend(d.push(chunk));
        }
        assert_eq!(got, expected);
    }

    #[test]
    fn partial_trailing_bytes_stay_buffered() {
        let mut d = Deblocker::new();
        let records = d.push(b"complete\npartial");
        assert_eq!(records, vec![b"complete".to_vec()]);
        assert_eq!(d.pending(), b"partial");
    }

    #[test]
    fn empty_record_passes_through() {
        let mut d = Deblocker::new();
        let records = d.push(b"\n\nabc\n");
        assert_eq!(records, vec![Vec::<u8>::new(), Vec::new(), b"abc".to_vec()]);
    }
}
