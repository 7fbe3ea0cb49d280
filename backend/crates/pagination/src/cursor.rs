//! Opaque, URL-safe cursor tokens.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors raised while encoding or decoding cursor tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    /// The token is not valid URL-safe base64.
    #[error("cursor is not valid base64: {message}")]
    InvalidEncoding {
        /// Decoder error message.
        message: String,
    },
    /// The decoded token does not contain a valid key payload.
    #[error("cursor payload is malformed: {message}")]
    InvalidPayload {
        /// Deserialiser error message.
        message: String,
    },
    /// The key could not be serialised.
    #[error("cursor key could not be serialised: {message}")]
    Serialize {
        /// Serialiser error message.
        message: String,
    },
}

/// Keyset cursor wrapping the sort key of the last item on a page.
///
/// The key is serialised as JSON and encoded with URL-safe base64 without
/// padding so tokens can be placed in query strings unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor<K> {
    key: K,
}

impl<K> Cursor<K> {
    /// Wrap a sort key.
    pub const fn new(key: K) -> Self {
        Self { key }
    }

    /// Borrow the wrapped key.
    pub const fn key(&self) -> &K {
        &self.key
    }

    /// Consume the cursor and return the key.
    pub fn into_key(self) -> K {
        self.key
    }
}

impl<K: Serialize> Cursor<K> {
    /// Encode the cursor into an opaque token.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::Serialize`] when the key cannot be serialised.
    pub fn encode(&self) -> Result<String, CursorError> {
        let json = serde_json::to_vec(&self.key).map_err(|err| CursorError::Serialize {
            message: err.to_string(),
        })?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }
}

impl<K: DeserializeOwned> Cursor<K> {
    /// Decode an opaque token produced by [`Cursor::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::InvalidEncoding`] for non-base64 input and
    /// [`CursorError::InvalidPayload`] when the payload does not match `K`.
    pub fn decode(token: &str) -> Result<Self, CursorError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|err| CursorError::InvalidEncoding {
                message: err.to_string(),
            })?;
        let key = serde_json::from_slice(&bytes).map_err(|err| CursorError::InvalidPayload {
            message: err.to_string(),
        })?;
        Ok(Self { key })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for cursor tokens.
    use super::*;
    use rstest::rstest;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Key {
        created_at: i64,
        id: String,
    }

    #[rstest]
    fn encoded_tokens_are_url_safe() {
        let token = Cursor::new(Key {
            created_at: 1_700_000_000,
            id: "??>>".to_owned(),
        })
        .encode()
        .expect("encode");
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[rstest]
    fn decode_restores_key() {
        let key = Key {
            created_at: 42,
            id: "abc".to_owned(),
        };
        let token = Cursor::new(key.clone()).encode().expect("encode");
        let decoded = Cursor::<Key>::decode(&token).expect("decode");
        assert_eq!(decoded.into_key(), key);
    }

    #[rstest]
    #[case("***")]
    #[case("not base64!")]
    fn decode_rejects_bad_encoding(#[case] token: &str) {
        let err = Cursor::<Key>::decode(token).expect_err("bad token");
        assert!(matches!(err, CursorError::InvalidEncoding { .. }));
    }

    #[rstest]
    fn decode_rejects_foreign_payload() {
        let token = URL_SAFE_NO_PAD.encode(br#"{"other":1}"#);
        let err = Cursor::<Key>::decode(&token).expect_err("bad payload");
        assert!(matches!(err, CursorError::InvalidPayload { .. }));
    }
}
