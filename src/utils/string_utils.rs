//! # 문자열 유틸리티
//!
//! 키 검증과 설정값 정리에 쓰이는 공통 함수들입니다.

use serde::Deserialize;
use crate::errors::CacheError;

/// 비어 있지 않은 문자열인지 검증합니다.
///
/// 캐시 키는 와이어 포맷의 일부이므로 공백을 잘라내지 않고 그대로 돌려줍니다.
///
/// # Errors
///
/// * `CacheError::InvalidKey` - 빈 문자열인 경우
pub fn require_non_empty<'a>(value: &'a str, field_name: &str) -> Result<&'a str, CacheError> {
    if value.is_empty() {
        return Err(CacheError::InvalidKey(format!("{}은(는) 비어 있을 수 없습니다", field_name)));
    }
    Ok(value)
}

/// 공백만 있는 값은 `None`으로, 나머지는 앞뒤 공백을 제거해 반환합니다.
pub fn clean_optional_string(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// 빈 override 값은 없는 것으로 취급합니다.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// serde용: 빈 문자열/공백 문자열을 `None`으로 역직렬화합니다.
pub fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(clean_optional_string(opt))
}

/// 문자열을 bool 설정값으로 해석합니다. (`true`, `1`, `yes`, `on`)
pub fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
