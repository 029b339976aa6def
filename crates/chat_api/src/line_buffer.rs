/// Splits `remainder + chunk` into complete newline-terminated records.
///
/// Returns the complete records in arrival order plus the unterminated tail,
/// which callers must pass back as `remainder` on the next call. Blank records
/// are dropped and a `\r` before the delimiter is stripped.
pub fn split_records(remainder: &str, chunk: &str) -> (Vec<String>, String) {
    let mut buffer = String::with_capacity(remainder.len() + chunk.len());
    buffer.push_str(remainder);
    buffer.push_str(chunk);

    let mut records = Vec::new();
    let mut start = 0;
    while let Some(offset) = buffer[start..].find('\n') {
        let end = start + offset;
        push_record(&mut records, &buffer[start..end]);
        start = end + 1;
    }

    let tail = buffer.split_off(start);
    (records, tail)
}

fn push_record(records: &mut Vec<String>, line: &str) {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if !line.trim().is_empty() {
        records.push(line.to_owned());
    }
}

/// Stateful wrapper around [`split_records`] that owns the remainder.
#[derive(Debug, Default, Clone)]
pub struct LineBuffer {
    remainder: String,
}

impl LineBuffer {
    /// Feed one text chunk and drain the records it completes.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        let (records, remainder) = split_records(&self.remainder, chunk);
        self.remainder = remainder;
        records
    }

    /// Take the unterminated remainder as a final record, if it has content.
    pub fn finish(&mut self) -> Option<String> {
        let remainder = std::mem::take(&mut self.remainder);
        let mut records = Vec::with_capacity(1);
        push_record(&mut records, &remainder);
        records.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.remainder.trim().is_empty()
    }

    pub fn clear(&mut self) {
        self.remainder.clear();
    }
}

/// Incremental UTF-8 decoder for byte chunks.
///
/// A multi-byte character split across two chunks is held back until the rest
/// of it arrives. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default, Clone)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(bytes);

        let mut out = String::with_capacity(input.len());
        let mut rest: &[u8] = &input;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(error) => {
                    let (valid, after) = rest.split_at(error.valid_up_to());
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match error.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush bytes held back at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let pending = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&pending).into_owned())
    }
}
