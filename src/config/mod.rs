//! # Configuration Module
//!
//! 캐시 파사드의 설정 관리를 담당하는 모듈입니다.
//! 환경 변수 또는 JSON 문서에서 한 번 로드한 뒤 불변으로 공유합니다.
//!
//! ## 모듈 구성
//!
//! - [`cache_config`] - 엔드포인트, 풀 크기, 타임아웃, TTL, 네임스페이스 설정
//!
//! ## 사용 예제
//!
//! ```rust,ignore
//! use redis_cache_service::config::CacheSettings;
//!
//! dotenv::dotenv().ok();
//! let settings = CacheSettings::from_env()?;
//! println!("Cache endpoint: {}", settings.endpoint());
//! ```
//!
//! ## 환경 변수 설정 가이드
//!
//! ```bash
//! # 단일 서버
//! export REDIS_URL="redis://localhost:6379"
//!
//! # Sentinel (serviceName이 있으면 failover 토폴로지)
//! export REDIS_URL="sentinel-1:26379,sentinel-2:26379,serviceName=cache_master"
//! export REDIS_PASSWORD="secret"
//!
//! # 풀/타임아웃/TTL
//! export CACHE_POOL_SIZE="3"
//! export CACHE_SYNC_TIMEOUT_MS="5000"
//! export CACHE_DEFAULT_LIFETIME_SECS="3600"
//! export CACHE_GLOBAL_NAMESPACE="Global"
//! export CACHE_USE_LOGGING="true"
//! ```

pub mod cache_config;

pub use cache_config::*;
