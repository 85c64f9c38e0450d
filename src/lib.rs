//! Redis 캐시 서비스
//!
//! 애플리케이션 코드와 TTL을 지원하는 Redis 호환 저장소(선택적으로 Sentinel) 사이의 캐시 파사드입니다.
//! 타입이 있는 값을 네임스페이스가 붙은 만료 엔트리로 바꾸고, 작은 커넥션 풀에 부하를 분산하며,
//! 저장소 장애를 견디는 read-through 조회를 제공합니다.
//!
//! # Features
//!
//! - **키 공간**: 테넌트/프로젝트 네임스페이스와 글로벌 네임스페이스 분리
//! - **커넥션 풀**: 지연 초기화, 최소 부하 핸들 선택, Sentinel 레플리카 읽기
//! - **get_or_set**: 미스와 저장소 장애를 흡수하는 read-through 조회
//! - **일괄 무효화**: 키 목록 또는 부분 문자열 패턴 기반 삭제
//! - **동기/비동기**: `CacheService`와 `BlockingCacheService`
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │ CacheService / Blocking  │ ← 공개 연산 (get, set, get_or_set, reset*)
//! └──────────────────────────┘
//!     │          │          │
//!     ▼          ▼          ▼
//! ┌────────┐ ┌────────┐ ┌──────────┐
//! │KeySpace│ │ Codec  │ │   Pool   │ ← 키 변환 / 직렬화 / 핸들 대여
//! └────────┘ └────────┘ └──────────┘
//!                            │
//!                            ▼
//!               ┌─────────────────────────┐
//!               │ Redis (Sentinel) / 메모리 │ ← StoreConnection
//!               └─────────────────────────┘
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use redis_cache_service::{CacheService, CacheSettings, ConnectionPool, Scope};
//!
//! let settings = Arc::new(CacheSettings::from_env()?);
//! let pool = Arc::new(ConnectionPool::redis(settings)?);
//! let cache = CacheService::new(pool, "TenantA")?;
//!
//! let profile: Profile = cache
//!     .get_or_set("user.42", Scope::Local, || repository.find_profile(42))
//!     .await?;
//! ```

pub mod caching;
pub mod config;
pub mod errors;
pub mod utils;

pub use caching::{BlockingCacheService, CacheService, ConnectionPool, Scope};
pub use config::CacheSettings;
pub use errors::{CacheError, CacheResult};
