use crate::error::{ClientError, Result};

/// Incremental UTF-8 decoder for chunked bodies.
///
/// A multi-byte character split across two chunks is held back until the
/// rest of it arrives, so no chunk boundary can corrupt the text.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `chunk` (plus any carried bytes) as forms whole characters
    pub fn decode(&mut self, chunk: &[u8]) -> Result<String> {
        self.pending.extend_from_slice(chunk);

        let complete = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            Err(e) if e.error_len().is_some() => {
                return Err(ClientError::Decode(format!(
                    "invalid UTF-8 sequence at byte {}",
                    e.valid_up_to()
                )));
            }
            Err(e) => e.valid_up_to(),
        };

        let rest = self.pending.split_off(complete);
        let decoded = std::mem::replace(&mut self.pending, rest);
        String::from_utf8(decoded).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Check that the body did not end in the middle of a character
    pub fn finish(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            let dangling = self.pending.len();
            self.pending.clear();
            Err(ClientError::Decode(format!(
                "stream ended inside a multi-byte character ({} dangling bytes)",
                dangling
            )))
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"Hello").unwrap(), "Hello");
        assert!(decoder.finish().is_ok());
    }

    #[test]
    fn test_split_multibyte_character() {
        // "café ☕" with the é and the cup split across chunks
        let bytes = "café ☕".as_bytes();
        let mut decoder = Utf8Decoder::new();

        let first = decoder.decode(&bytes[..4]).unwrap();
        assert_eq!(first, "caf");
        assert!(decoder.has_pending());

        let second = decoder.decode(&bytes[4..7]).unwrap();
        assert_eq!(second, "é ");

        let third = decoder.decode(&bytes[7..8]).unwrap();
        assert_eq!(third, "");
        let fourth = decoder.decode(&bytes[8..]).unwrap();
        assert_eq!(fourth, "☕");

        assert!(decoder.finish().is_ok());
    }

    #[test]
    fn test_invalid_sequence_is_an_error() {
        let mut decoder = Utf8Decoder::new();
        let err = decoder.decode(&[b'o', b'k', 0xff, b'!']).unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn test_truncated_tail_is_an_error() {
        let mut decoder = Utf8Decoder::new();
        let cup = "☕".as_bytes();
        assert_eq!(decoder.decode(&cup[..2]).unwrap(), "");
        assert!(decoder.finish().is_err());
    }
}
