use std::error::Error;
use std::marker::PhantomData;

/// Represents a way of decoding the payload of an incoming message (a sequence
/// of bytes) into an arbitrary result type.
///
/// The decoded result is owned by the [`Envelope`](crate::Envelope) and may
/// not borrow from the original bytes.
pub trait Decoder {
    /// The type of decoded result.
    type Result;

    /// The type of error produced when decoding is not possible.
    type Error: Error;

    /// Decodes the given sequence of bytes into the desired
    /// [`Result`](Decoder::Result), or returns an appropriate
    /// [`Error`](Decoder::Error).
    fn decode(&self, bytes: &[u8]) -> Result<Self::Result, Self::Error>;
}

/// A [`Decoder`] that interprets the incoming bytes as JSON and deserializes
/// them into `T`.
///
/// `T` is required to be [`DeserializeOwned`](serde::de::DeserializeOwned)
/// because the decoded value lives alongside the original bytes on the same
/// envelope and therefore may not borrow from them.
pub struct JsonDecoder<T>(PhantomData<T>);

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T> Decoder for JsonDecoder<T>
where
    T: serde::de::DeserializeOwned,
{
    type Result = T;
    type Error = serde_json::Error;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Result, Self::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Probe {
        question: String,
    }

    #[test]
    fn json_decoder_decodes_valid_payload() {
        // Given
        let decoder = JsonDecoder::<Probe>::default();

        // When
        let decoded = decoder.decode(br#"{"question": "what is ntp"}"#).unwrap();

        // Then
        assert_eq!(
            decoded,
            Probe {
                question: "what is ntp".to_string(),
            },
        );
    }

    #[test]
    fn json_decoder_rejects_gibberish() {
        // Given
        let decoder = JsonDecoder::<Probe>::default();

        // When
        let result = decoder.decode(b"not-json");

        // Then
        assert!(result.is_err());
    }
}
