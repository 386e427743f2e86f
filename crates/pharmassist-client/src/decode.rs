//! Incremental UTF-8 decoding for chunked response bodies.
//!
//! A chunk boundary can fall inside a multi-byte character. The decoder
//! holds back the incomplete tail (at most 3 bytes) and prepends it to the
//! next chunk. Invalid sequences become U+FFFD and decoding continues.

/// Stateful UTF-8 decoder, one per streaming call.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk` and append the text to `out`.
    pub fn decode(&mut self, chunk: &[u8], out: &mut String) {
        let joined;
        let mut input: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            let mut buf = std::mem::take(&mut self.pending);
            buf.extend_from_slice(chunk);
            joined = buf;
            &joined
        };

        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    out.push_str(text);
                    return;
                }
                Err(e) => {
                    let (valid, rest) = input.split_at(e.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        out.push_str(text);
                    }
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                        None => {
                            // Truncated sequence at the end: wait for more bytes.
                            self.pending = rest.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Bytes of an incomplete character still waiting for the next chunk.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// End of stream: drop any incomplete character. Returns how many bytes
    /// were dropped.
    pub fn finish(&mut self) -> usize {
        std::mem::take(&mut self.pending).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(chunks: &[&[u8]]) -> String {
        let mut decoder = Utf8Decoder::new();
        let mut out = String::new();
        for chunk in chunks {
            decoder.decode(chunk, &mut out);
        }
        out
    }

    #[test]
    fn ascii_passes_through() {
        assert_eq!(decode_all(&[&b"hello "[..], &b"world"[..]]), "hello world");
    }

    #[test]
    fn hebrew_split_mid_character() {
        // "ש" is 0xD7 0xA9.
        let bytes = "שלום".as_bytes();
        assert_eq!(decode_all(&[&bytes[..1], &bytes[1..3], &bytes[3..]]), "שלום");
    }

    #[test]
    fn four_byte_character_split_byte_by_byte() {
        let bytes = "💊".as_bytes();
        let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(decode_all(&chunks), "💊");
    }

    #[test]
    fn pending_bytes_are_held_until_completed() {
        let mut decoder = Utf8Decoder::new();
        let mut out = String::new();
        let bytes = "€".as_bytes();

        decoder.decode(&bytes[..2], &mut out);
        assert!(out.is_empty());
        assert_eq!(decoder.pending().len(), 2);

        decoder.decode(&bytes[2..], &mut out);
        assert_eq!(out, "€");
        assert!(decoder.pending().is_empty());
    }

    #[test]
    fn invalid_bytes_become_replacement_and_decoding_continues() {
        assert_eq!(decode_all(&[&b"a\xFFb"[..]]), "a\u{FFFD}b");
    }

    #[test]
    fn finish_drops_truncated_character() {
        let mut decoder = Utf8Decoder::new();
        let mut out = String::new();
        decoder.decode(&"€".as_bytes()[..1], &mut out);
        assert_eq!(decoder.finish(), 1);
        assert!(out.is_empty());
        assert_eq!(decoder.finish(), 0);
    }
}
