/// Line delimiter. A single `\r` directly before it is stripped.
const DELIMITER: u8 = b'\n';

/// Buffers raw input and yields a text line whenever a `\n` is encountered.
///
/// Bytes are kept undecoded until a line is complete, so a multi-byte UTF-8
/// character split across two reads decodes correctly. Invalid sequences are
/// replaced with U+FFFD rather than rejected.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Append `bytes` and return the lines they complete.
    ///
    /// The returned iterator extracts lines on demand. Lines it does not get
    /// to stay buffered and come out of the next `ingest` call, so nothing is
    /// lost if the caller stops early.
    pub fn ingest(&mut self, bytes: &[u8]) -> Lines<'_> {
        self.buffer.extend_from_slice(bytes);
        Lines { framer: self }
    }

    /// Drop any partial line.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Bytes held for an unterminated line.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn next_line(&mut self) -> Option<String> {
        loop {
            let pos = self.buffer.iter().position(|&b| b == DELIMITER)?;
            let mut raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            raw.pop();
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }

            let line = String::from_utf8_lossy(&raw);
            if line.trim().is_empty() {
                continue;
            }
            return Some(line.into_owned());
        }
    }
}

/// Lazy sequence of lines completed by one [`LineFramer::ingest`] call.
pub struct Lines<'a> {
    framer: &'a mut LineFramer,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.framer.next_line()
    }
}
