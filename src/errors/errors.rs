//! 캐시 계층 전역에서 사용하는 에러 시스템
//!
//! `thiserror` 기반의 `CacheError` 하나로 키 검증, 캐시 미스, 저장소 장애,
//! 직렬화 실패, 설정 오류를 표현합니다.
//!
//! ## 에러 분류
//!
//! | 변형 | 성격 | 호출자 처리 |
//! |------|------|-------------|
//! | `InvalidKey` | 호출자 버그 | 즉시 실패, 재시도 금지 |
//! | `CacheMiss` | 정상적인 결과 | 반드시 처리 (에러 로그 아님) |
//! | `StoreUnavailable` | 일시적 연결/타임아웃 장애 | 전파, `get_or_set` 읽기 단계에서만 흡수 |
//! | `Store` | 저장소가 명령을 거부 | 전파 |
//! | `Codec` | 저장된 페이로드 손상/비호환 | 전파 |
//! | `InvalidSettings` | 잘못된 설정 | 즉시 실패 |
//!
//! ## 사용 예제
//!
//! ```rust,ignore
//! use redis_cache_service::errors::CacheError;
//!
//! match cache.get::<Profile>("user.1", Scope::Local).await {
//!     Ok(profile) => render(profile),
//!     Err(CacheError::CacheMiss(_)) => load_from_db().await?,
//!     Err(e) => return Err(e.into()),
//! }
//! ```

use thiserror::Error;

/// 캐시 계층 에러 타입
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// 비어 있는 키 또는 네임스페이스
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    /// 키가 없거나 값이 비어 있음. 값은 물리 키입니다.
    #[error("Object not found in cache. Key: {0}")]
    CacheMiss(String),

    /// 연결 실패, 타임아웃, 연결 끊김 등 일시적인 저장소 장애
    #[error("Cache store unavailable: {0}")]
    StoreUnavailable(String),

    /// 연결은 정상이지만 저장소가 명령을 거부한 경우 (WRONGTYPE 등)
    #[error("Cache store error: {0}")]
    Store(String),

    /// 직렬화/역직렬화 실패
    #[error("Codec error: {0}")]
    Codec(String),

    /// 설정값 검증 실패
    #[error("Invalid cache settings: {0}")]
    InvalidSettings(String),
}

impl CacheError {
    /// `CacheMiss` 여부
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::CacheMiss(_))
    }

    /// 연결 계열 장애 여부
    pub fn is_connectivity(&self) -> bool {
        matches!(self, CacheError::StoreUnavailable(_))
    }
}

impl From<redis::RedisError> for CacheError {
    /// Redis 에러를 연결 장애와 명령 실패로 분류합니다.
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal()
            || err.is_timeout()
            || err.is_connection_dropped()
            || err.is_io_error()
        {
            CacheError::StoreUnavailable(err.to_string())
        } else {
            CacheError::Store(err.to_string())
        }
    }
}

/// 편의성을 위한 Result 타입 별칭
pub type CacheResult<T> = Result<T, CacheError>;

/// 외부 라이브러리 에러를 `CacheError`로 변환하는 확장 trait
///
/// # 예제
///
/// ```rust,ignore
/// use redis_cache_service::errors::ErrorContext;
///
/// let size = raw.parse::<usize>().settings_context("CACHE_POOL_SIZE")?;
/// let text = std::str::from_utf8(bytes).codec_context("payload is not UTF-8")?;
/// ```
pub trait ErrorContext<T> {
    /// 설정 오류로 변환합니다.
    fn settings_context(self, msg: &str) -> CacheResult<T>;

    /// 코덱 오류로 변환합니다.
    fn codec_context(self, msg: &str) -> CacheResult<T>;

    /// 클로저로 지연 평가된 메시지와 함께 저장소 장애로 변환합니다.
    fn unavailable_with<F>(self, f: F) -> CacheResult<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn settings_context(self, msg: &str) -> CacheResult<T> {
        self.map_err(|e| CacheError::InvalidSettings(format!("{}: {}", msg, e)))
    }

    fn codec_context(self, msg: &str) -> CacheResult<T> {
        self.map_err(|e| CacheError::Codec(format!("{}: {}", msg, e)))
    }

    fn unavailable_with<F>(self, f: F) -> CacheResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| CacheError::StoreUnavailable(format!("{}: {}", f(), e)))
    }
}
