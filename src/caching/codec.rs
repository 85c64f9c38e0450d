//! # 값 코덱
//!
//! 타입이 있는 값을 저장소 페이로드(바이트)로 바꾸고 되돌립니다.
//!
//! | 코덱 | 페이로드 | 비고 |
//! |------|----------|------|
//! | [`JsonTextCodec`] | UTF-8 JSON 텍스트 | 기본값, 다른 클라이언트와 호환 |
//! | [`JsonBytesCodec`] | JSON 바이트 | UTF-8 검사 생략 |

use serde::{Serialize, de::DeserializeOwned};

use crate::errors::{CacheResult, ErrorContext};

/// 직렬화 전략
///
/// 같은 값은 항상 같은 페이로드로 인코딩되어야 합니다.
pub trait ValueCodec: Send + Sync + 'static {
    /// # Errors
    ///
    /// * `CacheError::Codec` - 값을 표현할 수 없는 경우
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CacheResult<Vec<u8>>;

    /// # Errors
    ///
    /// * `CacheError::Codec` - 페이로드가 손상되었거나 타입과 맞지 않는 경우
    fn decode<T: DeserializeOwned>(&self, payload: &[u8]) -> CacheResult<T>;

    fn name(&self) -> &'static str;
}

/// UTF-8 JSON 텍스트 코덱
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTextCodec;

impl ValueCodec for JsonTextCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CacheResult<Vec<u8>> {
        let text = serde_json::to_string(value).codec_context("JSON 직렬화 실패")?;
        Ok(text.into_bytes())
    }

    fn decode<T: DeserializeOwned>(&self, payload: &[u8]) -> CacheResult<T> {
        let text = std::str::from_utf8(payload).codec_context("페이로드가 UTF-8이 아님")?;
        serde_json::from_str(text).codec_context("JSON 역직렬화 실패")
    }

    fn name(&self) -> &'static str {
        "json-text"
    }
}

/// JSON 바이트 코덱
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBytesCodec;

impl ValueCodec for JsonBytesCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CacheResult<Vec<u8>> {
        serde_json::to_vec(value).codec_context("JSON 직렬화 실패")
    }

    fn decode<T: DeserializeOwned>(&self, payload: &[u8]) -> CacheResult<T> {
        serde_json::from_slice(payload).codec_context("JSON 역직렬화 실패")
    }

    fn name(&self) -> &'static str {
        "json-bytes"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CacheError;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        id: u64,
        name: String,
        tags: Vec<String>,
    }

    fn profile() -> Profile {
        Profile {
            id: 7,
            name: "홍길동".to_string(),
            tags: vec!["admin".to_string()],
        }
    }

    #[test]
    fn test_text_codec_payload_is_json_text() {
        let payload = JsonTextCodec.encode(&profile()).unwrap();
        let text = String::from_utf8(payload.clone()).unwrap();

        assert_eq!(text, r#"{"id":7,"name":"홍길동","tags":["admin"]}"#);
        assert_eq!(JsonTextCodec.decode::<Profile>(&payload).unwrap(), profile());
    }

    #[test]
    fn test_codecs_are_interchangeable_for_json() {
        let payload = JsonBytesCodec.encode(&profile()).unwrap();
        assert_eq!(JsonTextCodec.decode::<Profile>(&payload).unwrap(), profile());
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = JsonTextCodec.encode(&profile()).unwrap();
        let b = JsonTextCodec.encode(&profile()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_malformed_payload_is_codec_error() {
        assert!(matches!(
            JsonTextCodec.decode::<Profile>(b"{not json"),
            Err(CacheError::Codec(_))
        ));
        assert!(matches!(
            JsonBytesCodec.decode::<Profile>(br#"{"id":"seven"}"#),
            Err(CacheError::Codec(_))
        ));
    }

    #[test]
    fn test_text_codec_rejects_invalid_utf8() {
        let result = JsonTextCodec.decode::<String>(&[0x22, 0xff, 0xfe, 0x22]);
        assert!(matches!(result, Err(CacheError::Codec(msg)) if msg.contains("UTF-8")));
    }

    #[test]
    fn test_non_string_map_keys_fail_to_encode() {
        let mut map = HashMap::new();
        map.insert(vec![1u8], "value");

        assert!(matches!(JsonTextCodec.encode(&map), Err(CacheError::Codec(_))));
    }

    #[test]
    fn test_codec_names() {
        assert_eq!(JsonTextCodec.name(), "json-text");
        assert_eq!(JsonBytesCodec.name(), "json-bytes");
    }
}
