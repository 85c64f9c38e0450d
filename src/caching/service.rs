//! # 캐시 서비스 (비동기 파사드)
//!
//! 애플리케이션 코드가 사용하는 캐시 연산 표면입니다.
//! `KeySpace`로 물리 키를 만들고, `ConnectionPool`에서 핸들을 빌려,
//! `ValueCodec`으로 값을 변환한 뒤 토폴로지에 맞는 라우팅으로 저장소를 호출합니다.
//!
//! ## 연산 요약
//!
//! | 연산 | 라우팅 | 실패 시 |
//! |------|--------|---------|
//! | `get` | 읽기 (failover면 레플리카 우선) | `CacheMiss` / `StoreUnavailable` / `Codec` 전파 |
//! | `set`, `set_with_expiry` | 쓰기 (마스터, fire-and-forget) | 전파 |
//! | `get_or_set` | 읽기 → 생성 → 쓰기 | 조회/쓰기 실패는 로그 후 흡수 |
//! | `reset`, `reset_bulk` | 삭제 (마스터, fire-and-forget) | 전파 |
//! | `reset_matching` | `KEYS` + 일괄 삭제 | `StoreUnavailable`로 전파 |
//!
//! 모든 저장소 호출에는 `CacheSettings::sync_timeout`이 적용되며,
//! 초과하면 `StoreUnavailable`로 실패합니다.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};
use serde::{Serialize, de::DeserializeOwned};

use crate::caching::codec::{JsonTextCodec, ValueCodec};
use crate::caching::connection::{Connector, StoreConnection};
use crate::caching::keyspace::{KeyPattern, KeySpace, PhysicalKey, Scope};
use crate::caching::pool::ConnectionPool;
use crate::config::CacheSettings;
use crate::errors::{CacheError, CacheResult};

/// `get_or_set`의 조회 결과
enum Lookup<T> {
    Hit(T),
    Miss,
    Failed(CacheError),
}

/// 네임스페이스가 바인딩된 비동기 캐시 파사드
///
/// 풀은 여러 파사드(테넌트/프로젝트별)가 공유할 수 있습니다.
///
/// # Examples
///
/// ```rust,ignore
/// let pool = Arc::new(ConnectionPool::redis(Arc::new(CacheSettings::from_env()?))?);
/// let cache = CacheService::new(pool, "TenantA")?;
///
/// cache.set("user.1", &profile, Scope::Local).await?;
/// let cached: Profile = cache.get("user.1", Scope::Local).await?;
///
/// let translations = cache
///     .get_or_set("TextResource.en", Scope::Global, || load_translations("en"))
///     .await?;
/// ```
pub struct CacheService<C: Connector, K: ValueCodec = JsonTextCodec> {
    pool: Arc<ConnectionPool<C>>,
    settings: Arc<CacheSettings>,
    keys: KeySpace,
    codec: K,
}

impl<C: Connector> CacheService<C, JsonTextCodec> {
    /// JSON 텍스트 코덱을 사용하는 파사드를 만듭니다.
    ///
    /// # Errors
    ///
    /// * `CacheError::InvalidKey` - 네임스페이스가 빈 경우
    pub fn new(pool: Arc<ConnectionPool<C>>, namespace: &str) -> CacheResult<Self> {
        Self::with_codec(pool, namespace, JsonTextCodec)
    }
}

impl<C: Connector, K: ValueCodec> CacheService<C, K> {
    pub fn with_codec(pool: Arc<ConnectionPool<C>>, namespace: &str, codec: K) -> CacheResult<Self> {
        let settings = Arc::clone(pool.settings());
        let keys = KeySpace::new(namespace, settings.global_namespace())?;

        Ok(Self {
            pool,
            settings,
            keys,
            codec,
        })
    }

    pub fn namespace(&self) -> &str {
        self.keys.namespace()
    }

    pub fn keyspace(&self) -> &KeySpace {
        &self.keys
    }

    pub fn pool(&self) -> &Arc<ConnectionPool<C>> {
        &self.pool
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn codec(&self) -> &K {
        &self.codec
    }

    /// 값을 조회합니다.
    ///
    /// # Errors
    ///
    /// * `CacheError::InvalidKey` - 빈 키
    /// * `CacheError::CacheMiss` - 키가 없거나 값이 비어 있음
    /// * `CacheError::StoreUnavailable` - 연결 실패 또는 타임아웃
    /// * `CacheError::Codec` - 저장된 값을 `T`로 해석할 수 없음
    pub async fn get<T: DeserializeOwned>(&self, key: &str, scope: Scope) -> CacheResult<T> {
        let physical = self.keys.resolve(key, scope, None)?;

        self.fetch(&physical).await.inspect_err(|e| self.log_failure("get", &physical, e))
    }

    /// 기본 수명으로 값을 저장합니다.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, scope: Scope) -> CacheResult<()> {
        self.set_with_expiry(key, value, self.settings.default_lifetime(), scope)
            .await
    }

    /// 지정한 수명으로 값을 저장합니다.
    ///
    /// # Errors
    ///
    /// * `CacheError::InvalidKey` - 빈 키
    /// * `CacheError::InvalidSettings` - 수명이 0
    /// * `CacheError::Codec` - 값을 직렬화할 수 없음
    /// * `CacheError::StoreUnavailable` - 연결 실패 또는 타임아웃
    pub async fn set_with_expiry<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        lifetime: Duration,
        scope: Scope,
    ) -> CacheResult<()> {
        let physical = self.keys.resolve(key, scope, None)?;
        ensure_lifetime(lifetime)?;

        self.store(&physical, value, lifetime)
            .await
            .inspect_err(|e| self.log_failure("set", &physical, e))
    }

    /// 캐시에 값이 있으면 반환하고, 없으면 `populate`로 만들어 기본 수명으로 저장한 뒤 반환합니다.
    pub async fn get_or_set<T, F, Fut>(&self, key: &str, scope: Scope, populate: F) -> CacheResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.get_or_set_with_expiry(key, self.settings.default_lifetime(), scope, populate)
            .await
    }

    /// 읽기 단계의 미스와 저장소 장애를 흡수하는 read-through 조회
    ///
    /// 1. 캐시 조회
    /// 2. 미스는 warn, 그 외 실패는 error 로그 후 계속 진행
    /// 3. `populate()` 호출
    /// 4. 결과 저장 (실패는 error 로그 후 무시)
    /// 5. 생성한 값 반환
    ///
    /// 같은 키에 대한 동시 미스는 각자 `populate()`를 호출하며 마지막 쓰기가 남습니다.
    ///
    /// # Errors
    ///
    /// * `CacheError::InvalidKey` - 빈 키 (저장소 호출 전에 실패)
    /// * `CacheError::InvalidSettings` - 수명이 0
    pub async fn get_or_set_with_expiry<T, F, Fut>(
        &self,
        key: &str,
        lifetime: Duration,
        scope: Scope,
        populate: F,
    ) -> CacheResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let physical = self.keys.resolve(key, scope, None)?;
        ensure_lifetime(lifetime)?;

        match self.lookup::<T>(&physical).await {
            Lookup::Hit(value) => return Ok(value),
            Lookup::Miss => {
                if self.settings.use_logging() {
                    warn!("⚠️ 캐시 미스, 값을 새로 생성합니다: {}", physical);
                }
            }
            Lookup::Failed(e) => {
                if self.settings.use_logging() {
                    error!("❌ 캐시 조회 실패, 값을 새로 생성합니다 ({}): {}", physical, e);
                }
            }
        }

        let value = populate().await;

        if let Err(e) = self.store(&physical, &value, lifetime).await {
            if self.settings.use_logging() {
                error!("❌ 생성한 값 저장 실패 ({}): {}", physical, e);
            }
        }

        Ok(value)
    }

    /// 키를 삭제합니다. 없는 키는 에러가 아닙니다.
    pub async fn reset(&self, key: &str, scope: Scope) -> CacheResult<()> {
        let physical = self.keys.resolve(key, scope, None)?;

        self.remove(std::slice::from_ref(&physical))
            .await
            .inspect_err(|e| self.log_failure("reset", &physical, e))
    }

    /// 여러 키를 한 번의 삭제 명령으로 지웁니다. 빈 목록이면 아무 일도 하지 않습니다.
    ///
    /// # Errors
    ///
    /// * `CacheError::InvalidKey` - 목록에 빈 키가 있음 (저장소 호출 전에 실패)
    /// * `CacheError::StoreUnavailable` - 연결 실패 또는 타임아웃
    pub async fn reset_bulk<S: AsRef<str>>(
        &self,
        keys: &[S],
        scope: Scope,
        namespace_override: Option<&str>,
    ) -> CacheResult<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let physical = keys
            .iter()
            .map(|key| self.keys.resolve(key.as_ref(), scope, namespace_override))
            .collect::<CacheResult<Vec<_>>>()?;

        self.remove(&physical)
            .await
            .inspect_err(|e| self.log_failure("reset_bulk", &format!("{}개 키", physical.len()), e))
    }

    /// `partial_key`를 포함하는 모든 키를 삭제하고 삭제한 키 수를 반환합니다.
    ///
    /// 저장소 전체를 `KEYS`로 열거하므로 비용이 큰 연산입니다.
    /// 요청 처리 경로가 아닌 관리 작업(번역 리소스 갱신 등)에서만 사용하세요.
    ///
    /// # Errors
    ///
    /// * `CacheError::InvalidKey` - 빈 부분 키
    /// * `CacheError::StoreUnavailable` - 열거 또는 삭제 실패
    pub async fn reset_matching(
        &self,
        partial_key: &str,
        scope: Scope,
        namespace_override: Option<&str>,
    ) -> CacheResult<usize> {
        let pattern = self.keys.resolve_pattern(partial_key, scope, namespace_override)?;

        let result = self.purge(&pattern).await.map_err(into_unavailable);
        match &result {
            Ok(count) => {
                if self.settings.use_logging() {
                    debug!("캐시 패턴 무효화: {} ({}개 키)", pattern, count);
                }
            }
            Err(e) => self.log_failure("reset_matching", &pattern, e),
        }
        result
    }

    async fn purge(&self, pattern: &KeyPattern) -> CacheResult<usize> {
        let conn = self.pool.checkout().await?;
        let matched = self.bounded("KEYS", pattern, conn.keys(pattern)).await?;
        if matched.is_empty() {
            return Ok(0);
        }

        self.bounded("DEL", pattern, conn.delete(&matched, self.pool.remove_routing()))
            .await?;
        Ok(matched.len())
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &PhysicalKey) -> Lookup<T> {
        match self.fetch(key).await {
            Ok(value) => Lookup::Hit(value),
            Err(e) if e.is_miss() => Lookup::Miss,
            Err(e) => Lookup::Failed(e),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, key: &PhysicalKey) -> CacheResult<T> {
        let conn = self.pool.checkout().await?;
        let payload = self.bounded("GET", key, conn.get(key, self.pool.read_routing())).await?;
        drop(conn);

        match payload {
            Some(bytes) if !bytes.is_empty() => {
                let value = self.codec.decode(&bytes)?;
                if self.settings.use_logging() {
                    debug!("캐시 적중: {} ({} bytes)", key, bytes.len());
                }
                Ok(value)
            }
            _ => Err(CacheError::CacheMiss(key.to_string())),
        }
    }

    async fn store<T: Serialize + ?Sized>(&self, key: &PhysicalKey, value: &T, lifetime: Duration) -> CacheResult<()> {
        let payload = self.codec.encode(value)?;
        let size = payload.len();

        let conn = self.pool.checkout().await?;
        self.bounded(
            "SET",
            key,
            conn.set(key, payload, lifetime, self.pool.write_routing()),
        )
        .await?;

        if self.settings.use_logging() {
            debug!("캐시 저장: {} ({} bytes, TTL {}s)", key, size, lifetime.as_secs());
        }
        Ok(())
    }

    async fn remove(&self, keys: &[PhysicalKey]) -> CacheResult<()> {
        let conn = self.pool.checkout().await?;
        let target = keys.first().map(PhysicalKey::as_str).unwrap_or_default();
        self.bounded("DEL", &target, conn.delete(keys, self.pool.remove_routing()))
            .await?;

        if self.settings.use_logging() {
            debug!("캐시 삭제: {}개 키", keys.len());
        }
        Ok(())
    }

    /// 저장소 호출 하나에 타임아웃을 적용합니다.
    async fn bounded<T, F>(&self, command: &str, target: &(dyn Display + Sync), call: F) -> CacheResult<T>
    where
        F: Future<Output = CacheResult<T>>,
    {
        let timeout = self.settings.sync_timeout();
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::StoreUnavailable(format!(
                "{} {} timed out after {} ms",
                command,
                target,
                timeout.as_millis()
            ))),
        }
    }

    fn log_failure(&self, operation: &str, target: &(dyn Display + Sync), err: &CacheError) {
        if !self.settings.use_logging() {
            return;
        }
        if err.is_miss() {
            warn!("⚠️ 캐시 미스 ({}): {}", operation, target);
        } else {
            error!("❌ 캐시 {} 실패 ({}): {}", operation, target, err);
        }
    }
}

fn ensure_lifetime(lifetime: Duration) -> CacheResult<()> {
    if lifetime.is_zero() {
        return Err(CacheError::InvalidSettings("entry lifetime must be greater than zero".to_string()));
    }
    Ok(())
}

/// 패턴 무효화는 명령 거부도 저장소 장애로 보고합니다.
fn into_unavailable(err: CacheError) -> CacheError {
    match err {
        CacheError::Store(msg) => CacheError::StoreUnavailable(msg),
        other => other,
    }
}
