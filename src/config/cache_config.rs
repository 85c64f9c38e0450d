//! 캐시 설정 관리 모듈
//!
//! 저장소 엔드포인트, 커넥션 풀 크기, 연산 타임아웃, 기본 TTL,
//! 글로벌 네임스페이스, 인증 정보, 로깅 여부를 한 번 로드해 불변으로 유지합니다.

use std::env;
use std::fmt;
use std::time::Duration;

use log::{error, warn};
use serde::Deserialize;

use crate::errors::{CacheError, CacheResult, ErrorContext};
use crate::utils::string_utils::{clean_optional_string, deserialize_optional_string, parse_flag};

/// 기본 엔드포인트
pub const DEFAULT_ENDPOINT: &str = "redis://localhost:6379";
/// 기본 커넥션 풀 크기
pub const DEFAULT_POOL_SIZE: usize = 1;
/// 기본 연산 타임아웃 (ms)
pub const DEFAULT_SYNC_TIMEOUT_MS: u64 = 5000;
/// 기본 엔트리 수명 (초)
pub const DEFAULT_LIFETIME_SECS: u64 = 3600;
/// 기본 글로벌 네임스페이스
pub const DEFAULT_GLOBAL_NAMESPACE: &str = "Global";

/// 캐시 설정
///
/// 생성 후에는 변경되지 않으며 풀과 파사드가 `Arc`로 공유합니다.
///
/// # Examples
///
/// ```rust,ignore
/// let settings = CacheSettings::default()
///     .with_endpoint("sentinel.local:26379,serviceName=cache_master")
///     .with_pool_size(3)
///     .with_default_lifetime(Duration::from_secs(600))
///     .with_logging(true);
/// settings.validate()?;
/// ```
#[derive(Clone, PartialEq)]
pub struct CacheSettings {
    endpoint: String,
    pool_size: usize,
    sync_timeout: Duration,
    default_lifetime: Duration,
    global_namespace: String,
    password: Option<String>,
    use_logging: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            pool_size: DEFAULT_POOL_SIZE,
            sync_timeout: Duration::from_millis(DEFAULT_SYNC_TIMEOUT_MS),
            default_lifetime: Duration::from_secs(DEFAULT_LIFETIME_SECS),
            global_namespace: DEFAULT_GLOBAL_NAMESPACE.to_string(),
            password: None,
            use_logging: false,
        }
    }
}

// 비밀번호는 로그에 남기지 않는다
impl fmt::Debug for CacheSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheSettings")
            .field("endpoint", &self.endpoint)
            .field("pool_size", &self.pool_size)
            .field("sync_timeout", &self.sync_timeout)
            .field("default_lifetime", &self.default_lifetime)
            .field("global_namespace", &self.global_namespace)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("use_logging", &self.use_logging)
            .finish()
    }
}

/// JSON 설정 문서 형태
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsDocument {
    redis_url: Option<String>,
    pool_size: Option<usize>,
    sync_timeout_ms: Option<u64>,
    default_lifetime_secs: Option<u64>,
    global_namespace: Option<String>,
    #[serde(deserialize_with = "deserialize_optional_string")]
    password: Option<String>,
    use_logging: Option<bool>,
}

impl CacheSettings {
    /// 환경 변수에서 설정을 로드합니다.
    ///
    /// ## 환경 변수
    ///
    /// ```bash
    /// REDIS_URL=redis://localhost:6379              # 또는 host:port,serviceName=name
    /// REDIS_PASSWORD=secret                         # 선택
    /// CACHE_POOL_SIZE=3                             # 기본값 1
    /// CACHE_SYNC_TIMEOUT_MS=5000                    # 기본값 5000
    /// CACHE_DEFAULT_LIFETIME_SECS=3600              # 기본값 3600
    /// CACHE_GLOBAL_NAMESPACE=Global                 # 기본값 Global
    /// CACHE_USE_LOGGING=true                        # 기본값 false
    /// ```
    ///
    /// 숫자 파싱에 실패한 값은 에러 로그를 남기고 기본값을 사용합니다.
    ///
    /// # Errors
    ///
    /// * `CacheError::InvalidSettings` - 로드된 값이 불변식을 위반하는 경우
    pub fn from_env() -> CacheResult<Self> {
        let settings = Self {
            endpoint: env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string()),
            pool_size: env_number("CACHE_POOL_SIZE", DEFAULT_POOL_SIZE),
            sync_timeout: Duration::from_millis(env_number("CACHE_SYNC_TIMEOUT_MS", DEFAULT_SYNC_TIMEOUT_MS)),
            default_lifetime: Duration::from_secs(env_number("CACHE_DEFAULT_LIFETIME_SECS", DEFAULT_LIFETIME_SECS)),
            global_namespace: normalize_global(env::var("CACHE_GLOBAL_NAMESPACE").ok()),
            password: clean_optional_string(env::var("REDIS_PASSWORD").ok()),
            use_logging: env::var("CACHE_USE_LOGGING").map(|v| parse_flag(&v)).unwrap_or(false),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// JSON 설정 문서에서 설정을 로드합니다. 누락된 필드는 기본값을 사용합니다.
    ///
    /// ```json
    /// {
    ///   "redis_url": "sentinel.master:26379,serviceName=cache_master",
    ///   "pool_size": 3,
    ///   "sync_timeout_ms": 5000,
    ///   "default_lifetime_secs": 3600,
    ///   "global_namespace": "Shared",
    ///   "password": "secret",
    ///   "use_logging": true
    /// }
    /// ```
    pub fn from_json_str(document: &str) -> CacheResult<Self> {
        let doc = serde_json::from_str::<SettingsDocument>(document).settings_context("설정 문서 파싱 실패")?;
        let defaults = Self::default();

        let settings = Self {
            endpoint: doc.redis_url.unwrap_or(defaults.endpoint),
            pool_size: doc.pool_size.unwrap_or(defaults.pool_size),
            sync_timeout: doc.sync_timeout_ms.map(Duration::from_millis).unwrap_or(defaults.sync_timeout),
            default_lifetime: doc
                .default_lifetime_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_lifetime),
            global_namespace: normalize_global(doc.global_namespace),
            password: doc.password,
            use_logging: doc.use_logging.unwrap_or(defaults.use_logging),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// 불변식을 검증합니다.
    ///
    /// - 풀 크기 ≥ 1
    /// - 기본 수명 > 0
    /// - 타임아웃 > 0
    /// - 엔드포인트가 비어 있지 않음
    pub fn validate(&self) -> CacheResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(CacheError::InvalidSettings("endpoint must not be empty".to_string()));
        }
        if self.pool_size == 0 {
            return Err(CacheError::InvalidSettings("pool size must be at least 1".to_string()));
        }
        if self.default_lifetime.is_zero() {
            return Err(CacheError::InvalidSettings("default lifetime must be greater than zero".to_string()));
        }
        if self.sync_timeout.is_zero() {
            return Err(CacheError::InvalidSettings("operation timeout must be greater than zero".to_string()));
        }
        Ok(())
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_sync_timeout(mut self, timeout: Duration) -> Self {
        self.sync_timeout = timeout;
        self
    }

    pub fn with_default_lifetime(mut self, lifetime: Duration) -> Self {
        self.default_lifetime = lifetime;
        self
    }

    /// 빈 문자열을 주면 기본값 `Global`을 사용합니다.
    pub fn with_global_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.global_namespace = normalize_global(Some(namespace.into()));
        self
    }

    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = clean_optional_string(password);
        self
    }

    pub fn with_logging(mut self, use_logging: bool) -> Self {
        self.use_logging = use_logging;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// 개별 저장소 호출 하나에 적용되는 타임아웃
    pub fn sync_timeout(&self) -> Duration {
        self.sync_timeout
    }

    pub fn default_lifetime(&self) -> Duration {
        self.default_lifetime
    }

    pub fn global_namespace(&self) -> &str {
        &self.global_namespace
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn use_logging(&self) -> bool {
        self.use_logging
    }
}

fn normalize_global(value: Option<String>) -> String {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => DEFAULT_GLOBAL_NAMESPACE.to_string(),
    }
}

fn env_number<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + fmt::Display + Copy,
    T::Err: fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or_else(|e| {
            error!("{} 파싱 실패: {}. 기본값 {} 사용", name, e, default);
            default
        }),
        Err(env::VarError::NotPresent) => default,
        Err(e) => {
            warn!("{} 읽기 실패: {}. 기본값 {} 사용", name, e, default);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = CacheSettings::default();

        assert_eq!(settings.endpoint(), "redis://localhost:6379");
        assert_eq!(settings.pool_size(), 1);
        assert_eq!(settings.sync_timeout(), Duration::from_millis(5000));
        assert_eq!(settings.default_lifetime(), Duration::from_secs(3600));
        assert_eq!(settings.global_namespace(), "Global");
        assert_eq!(settings.password(), None);
        assert!(!settings.use_logging());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_pool_and_lifetime() {
        let zero_pool = CacheSettings::default().with_pool_size(0);
        assert!(matches!(zero_pool.validate(), Err(CacheError::InvalidSettings(_))));

        let zero_lifetime = CacheSettings::default().with_default_lifetime(Duration::ZERO);
        assert!(matches!(zero_lifetime.validate(), Err(CacheError::InvalidSettings(_))));

        let zero_timeout = CacheSettings::default().with_sync_timeout(Duration::ZERO);
        assert!(matches!(zero_timeout.validate(), Err(CacheError::InvalidSettings(_))));

        let no_endpoint = CacheSettings::default().with_endpoint("  ");
        assert!(matches!(no_endpoint.validate(), Err(CacheError::InvalidSettings(_))));
    }

    #[test]
    fn test_empty_global_namespace_falls_back() {
        let settings = CacheSettings::default().with_global_namespace("");
        assert_eq!(settings.global_namespace(), "Global");

        let settings = CacheSettings::default().with_global_namespace("Shared");
        assert_eq!(settings.global_namespace(), "Shared");
    }

    #[test]
    fn test_from_json_str() {
        let settings = CacheSettings::from_json_str(
            r#"{
                "redis_url": "sentinel.master:26379,serviceName=cache_master",
                "pool_size": 3,
                "sync_timeout_ms": 2000,
                "default_lifetime_secs": 60,
                "global_namespace": "Shared",
                "password": "  secret ",
                "use_logging": true
            }"#,
        )
        .unwrap();

        assert_eq!(settings.endpoint(), "sentinel.master:26379,serviceName=cache_master");
        assert_eq!(settings.pool_size(), 3);
        assert_eq!(settings.sync_timeout(), Duration::from_millis(2000));
        assert_eq!(settings.default_lifetime(), Duration::from_secs(60));
        assert_eq!(settings.global_namespace(), "Shared");
        assert_eq!(settings.password(), Some("secret"));
        assert!(settings.use_logging());
    }

    #[test]
    fn test_from_json_str_uses_defaults_and_validates() {
        let settings = CacheSettings::from_json_str("{}").unwrap();
        assert_eq!(settings, CacheSettings::default());

        let invalid = CacheSettings::from_json_str(r#"{"pool_size": 0}"#);
        assert!(matches!(invalid, Err(CacheError::InvalidSettings(_))));

        let malformed = CacheSettings::from_json_str("{ nope");
        assert!(matches!(malformed, Err(CacheError::InvalidSettings(_))));
    }

    #[test]
    fn test_debug_masks_password() {
        let settings = CacheSettings::default().with_password(Some("hunter2".to_string()));
        let rendered = format!("{:?}", settings);

        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn test_env_number_default_when_missing() {
        assert_eq!(env_number("CACHE_TEST_SURELY_MISSING_VARIABLE", 42usize), 42);
    }
}
