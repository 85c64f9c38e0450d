//! # 블로킹 캐시 서비스
//!
//! 비동기 런타임이 없는 호출자를 위한 `CacheService`의 동기 버전입니다.
//! 전용 tokio 런타임(워커 1개)을 소유하고 각 연산을 `block_on`으로 실행하며,
//! 계약(에러, 로깅, get_or_set 흡수 정책)은 비동기 버전과 동일합니다.
//!
//! ## 주의사항
//!
//! - 비동기 컨텍스트 안에서 호출하면 tokio가 패닉을 일으킵니다.
//! - Redis 연결은 연결을 연 런타임에 묶이므로, 블로킹 파사드에는 전용 풀을 만들어 주세요.
//!
//! ```rust,ignore
//! let settings = Arc::new(CacheSettings::from_env()?);
//! let pool = Arc::new(ConnectionPool::redis(settings)?);
//! let cache = BlockingCacheService::new(pool, "TenantA")?;
//!
//! let menu: Menu = cache.get_or_set("menu", Scope::Local, || load_menu_from_db())?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use tokio::runtime::{Builder, Runtime};

use crate::caching::codec::{JsonTextCodec, ValueCodec};
use crate::caching::connection::Connector;
use crate::caching::keyspace::Scope;
use crate::caching::pool::ConnectionPool;
use crate::caching::service::CacheService;
use crate::errors::{CacheResult, ErrorContext};

/// 동기 캐시 파사드
pub struct BlockingCacheService<C: Connector, K: ValueCodec = JsonTextCodec> {
    inner: CacheService<C, K>,
    runtime: Runtime,
}

impl<C: Connector> BlockingCacheService<C, JsonTextCodec> {
    /// # Errors
    ///
    /// * `CacheError::InvalidKey` - 네임스페이스가 빈 경우
    /// * `CacheError::StoreUnavailable` - 내부 런타임을 시작할 수 없는 경우
    pub fn new(pool: Arc<ConnectionPool<C>>, namespace: &str) -> CacheResult<Self> {
        Self::with_codec(pool, namespace, JsonTextCodec)
    }
}

impl<C: Connector, K: ValueCodec> BlockingCacheService<C, K> {
    pub fn with_codec(pool: Arc<ConnectionPool<C>>, namespace: &str, codec: K) -> CacheResult<Self> {
        let inner = CacheService::with_codec(pool, namespace, codec)?;
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("cache-blocking")
            .enable_all()
            .build()
            .unavailable_with(|| "캐시 런타임 시작 실패".to_string())?;

        Ok(Self { inner, runtime })
    }

    /// 내부 비동기 파사드
    pub fn as_async(&self) -> &CacheService<C, K> {
        &self.inner
    }

    pub fn namespace(&self) -> &str {
        self.inner.namespace()
    }

    /// 풀을 미리 초기화합니다.
    pub fn warm_up(&self) -> CacheResult<()> {
        self.runtime.block_on(self.inner.pool().warm_up())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str, scope: Scope) -> CacheResult<T> {
        self.runtime.block_on(self.inner.get(key, scope))
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, scope: Scope) -> CacheResult<()> {
        self.runtime.block_on(self.inner.set(key, value, scope))
    }

    pub fn set_with_expiry<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        lifetime: Duration,
        scope: Scope,
    ) -> CacheResult<()> {
        self.runtime
            .block_on(self.inner.set_with_expiry(key, value, lifetime, scope))
    }

    /// `populate`는 호출한 스레드에서 실행됩니다.
    pub fn get_or_set<T, F>(&self, key: &str, scope: Scope, populate: F) -> CacheResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        self.get_or_set_with_expiry(key, self.inner.settings().default_lifetime(), scope, populate)
    }

    pub fn get_or_set_with_expiry<T, F>(&self, key: &str, lifetime: Duration, scope: Scope, populate: F) -> CacheResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        self.runtime.block_on(
            self.inner
                .get_or_set_with_expiry(key, lifetime, scope, move || async move { populate() }),
        )
    }

    pub fn reset(&self, key: &str, scope: Scope) -> CacheResult<()> {
        self.runtime.block_on(self.inner.reset(key, scope))
    }

    pub fn reset_bulk<S: AsRef<str>>(&self, keys: &[S], scope: Scope, namespace_override: Option<&str>) -> CacheResult<()> {
        self.runtime
            .block_on(self.inner.reset_bulk(keys, scope, namespace_override))
    }

    pub fn reset_matching(&self, partial_key: &str, scope: Scope, namespace_override: Option<&str>) -> CacheResult<usize> {
        self.runtime
            .block_on(self.inner.reset_matching(partial_key, scope, namespace_override))
    }
}
