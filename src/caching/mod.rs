//! 캐싱 계층 모듈
//!
//! Redis(선택적으로 Sentinel) 위에서 동작하는 네임스페이스 기반 캐시 파사드를 제공합니다.
//!
//! # 구성
//!
//! - [`keyspace`] - 논리 키 → 물리 키/무효화 패턴 변환
//! - [`endpoint`] - `REDIS_URL` 디스크립터 해석 (단일 서버 / Sentinel)
//! - [`connection`] - 저장소 핸들과 커넥터 trait, 라우팅 플래그
//! - [`pool`] - 지연 초기화되는 고정 크기 커넥션 풀
//! - [`codec`] - JSON 텍스트/바이트 값 코덱
//! - [`service`] - 비동기 파사드 (`get`, `set`, `get_or_set`, `reset*`)
//! - [`blocking`] - 동기 파사드
//! - [`redis`] - Redis 백엔드
//! - [`memory`] - 인메모리 백엔드 (테스트용)
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use redis_cache_service::caching::{CacheService, ConnectionPool, Scope};
//! use redis_cache_service::config::CacheSettings;
//!
//! let settings = Arc::new(CacheSettings::from_env()?);
//! let pool = Arc::new(ConnectionPool::redis(settings)?);
//! let cache = CacheService::new(pool, "TenantA")?;
//!
//! cache.set("user.123", &user_data, Scope::Local).await?;
//! let cached: User = cache.get("user.123", Scope::Local).await?;
//! cache.reset_matching("user.", Scope::Local, None).await?;
//! ```

pub mod blocking;
pub mod codec;
pub mod connection;
pub mod endpoint;
pub mod keyspace;
pub mod memory;
pub mod pool;
pub mod redis;
pub mod service;

pub use blocking::BlockingCacheService;
pub use codec::{JsonBytesCodec, JsonTextCodec, ValueCodec};
pub use connection::{Connector, Routing, StoreConnection, Target};
pub use endpoint::{Endpoint, NodeAddress};
pub use keyspace::{KeyPattern, KeySpace, PhysicalKey, Scope};
pub use memory::{MemoryConnection, MemoryConnector};
pub use pool::{ConnectionPool, Lease, PoolState};
pub use redis::{RedisConnection, RedisConnector};
pub use service::CacheService;
