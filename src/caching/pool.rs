//! # 커넥션 풀
//!
//! 고정 크기의 독립 저장소 핸들 집합을 소유합니다.
//!
//! ## 생명주기
//!
//! ```text
//! Uninitialized ──첫 checkout/warm_up──▶ Initializing ──성공──▶ Ready
//!       ▲                                    │
//!       └──────────실패 (열린 핸들 모두 닫음)──┘
//!
//! 어느 상태에서든 dispose() ──▶ Disposed
//! ```
//!
//! 초기화는 비동기 뮤텍스와 이중 확인으로 한 번만 수행되며,
//! 한 번 채워진 슬롯 목록은 변경되지 않습니다.
//! `checkout()`은 진행 중인 연산이 가장 적은 핸들을 빌려줍니다.

use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering, fence};

use log::{error, info, warn};
use once_cell::sync::OnceCell;
use tokio::sync::Mutex;

use crate::caching::connection::{Connector, Routing, StoreConnection};
use crate::caching::endpoint::Endpoint;
use crate::caching::redis::RedisConnector;
use crate::config::CacheSettings;
use crate::errors::{CacheError, CacheResult};

/// 풀 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Uninitialized,
    Initializing,
    Ready,
    Disposed,
}

struct Slot<S> {
    connection: S,
    in_flight: AtomicUsize,
}

/// 빌려준 핸들
///
/// 살아 있는 동안 해당 슬롯의 진행 중 연산 수에 포함되며, drop 시 반환됩니다.
pub struct Lease<'a, S> {
    slot: &'a Slot<S>,
    index: usize,
}

impl<S> Lease<'_, S> {
    /// 풀 안에서의 슬롯 위치
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<S> Deref for Lease<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.slot.connection
    }
}

impl<S> Drop for Lease<'_, S> {
    fn drop(&mut self) {
        self.slot.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// 저장소 커넥션 풀
///
/// 프로세스 전역 싱글톤이 아니라 호출자가 소유하고 `Arc`로 파사드에 주입합니다.
///
/// # Examples
///
/// ```rust,ignore
/// let settings = Arc::new(CacheSettings::from_env()?);
/// let pool = Arc::new(ConnectionPool::redis(settings)?);
/// pool.warm_up().await?;
///
/// let cache = CacheService::new(Arc::clone(&pool), "TenantA")?;
/// ```
pub struct ConnectionPool<C: Connector> {
    connector: C,
    settings: Arc<CacheSettings>,
    endpoint: Endpoint,
    slots: OnceCell<Vec<Slot<C::Connection>>>,
    init_lock: Mutex<()>,
    disposed: AtomicBool,
    handles_closed: AtomicBool,
}

impl ConnectionPool<RedisConnector> {
    /// Redis 백엔드 풀을 만듭니다. 연결은 첫 사용 시점에 열립니다.
    pub fn redis(settings: Arc<CacheSettings>) -> CacheResult<Self> {
        Self::new(settings, RedisConnector)
    }
}

impl<C: Connector> ConnectionPool<C> {
    /// 설정을 검증하고 엔드포인트를 해석합니다. 연결은 열지 않습니다.
    ///
    /// # Errors
    ///
    /// * `CacheError::InvalidSettings` - 설정 불변식 위반 또는 잘못된 엔드포인트
    pub fn new(settings: Arc<CacheSettings>, connector: C) -> CacheResult<Self> {
        settings.validate()?;
        let endpoint = Endpoint::parse(settings.endpoint(), settings.password())?;

        Ok(Self {
            connector,
            settings,
            endpoint,
            slots: OnceCell::new(),
            init_lock: Mutex::new(()),
            disposed: AtomicBool::new(false),
            handles_closed: AtomicBool::new(false),
        })
    }

    pub fn settings(&self) -> &Arc<CacheSettings> {
        &self.settings
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// 설정된 핸들 수
    pub fn size(&self) -> usize {
        self.settings.pool_size()
    }

    /// Sentinel 토폴로지 여부 (생성 시 한 번 결정)
    pub fn is_failover_topology(&self) -> bool {
        self.endpoint.is_failover()
    }

    pub fn state(&self) -> PoolState {
        if self.disposed.load(Ordering::SeqCst) {
            PoolState::Disposed
        } else if self.slots.get().is_some() {
            PoolState::Ready
        } else if self.init_lock.try_lock().is_err() {
            PoolState::Initializing
        } else {
            PoolState::Uninitialized
        }
    }

    /// 읽기 라우팅: failover 구성이면 레플리카 우선
    pub fn read_routing(&self) -> Routing {
        if self.is_failover_topology() {
            Routing::prefer_replica()
        } else {
            Routing::primary()
        }
    }

    /// 쓰기 라우팅: 항상 마스터, 응답 값 무시
    pub fn write_routing(&self) -> Routing {
        Routing::primary().fire_and_forget()
    }

    pub fn remove_routing(&self) -> Routing {
        Routing::primary().fire_and_forget()
    }

    /// 풀을 미리 초기화합니다.
    pub async fn warm_up(&self) -> CacheResult<()> {
        self.ready_slots().await.map(|_| ())
    }

    /// 진행 중 연산이 가장 적은 핸들을 빌립니다. 동률이면 앞쪽 슬롯을 고릅니다.
    ///
    /// # Errors
    ///
    /// * `CacheError::StoreUnavailable` - 초기화 실패 또는 이미 dispose된 풀
    pub async fn checkout(&self) -> CacheResult<Lease<'_, C::Connection>> {
        let slots = self.ready_slots().await?;

        let (index, slot) = slots
            .iter()
            .enumerate()
            .min_by_key(|(_, slot)| slot.in_flight.load(Ordering::Acquire))
            .ok_or_else(|| CacheError::StoreUnavailable("connection pool is empty".to_string()))?;

        slot.in_flight.fetch_add(1, Ordering::AcqRel);
        Ok(Lease { slot, index })
    }

    /// 각 슬롯에서 진행 중인 연산 수
    pub fn in_flight(&self) -> Vec<usize> {
        self.slots
            .get()
            .map(|slots| slots.iter().map(|s| s.in_flight.load(Ordering::Acquire)).collect())
            .unwrap_or_default()
    }

    /// 모든 핸들을 한 번만 닫습니다. 여러 번 호출해도 안전합니다.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.close_published();
    }

    /// 게시된 슬롯의 핸들을 닫습니다. dispose와 초기화가 겹쳐도 한 번만 실행됩니다.
    fn close_published(&self) {
        let Some(slots) = self.slots.get() else {
            return;
        };
        if self.handles_closed.swap(true, Ordering::SeqCst) {
            return;
        }

        slots.iter().for_each(|slot| slot.connection.close());
        info!("🔌 캐시 커넥션 풀 종료: {}개 연결 닫음", slots.len());
    }

    async fn ready_slots(&self) -> CacheResult<&[Slot<C::Connection>]> {
        self.ensure_not_disposed()?;
        if let Some(slots) = self.slots.get() {
            return Ok(slots);
        }

        let _guard = self.init_lock.lock().await;
        self.ensure_not_disposed()?;
        if let Some(slots) = self.slots.get() {
            return Ok(slots);
        }

        let opened = self.open_all().await?;

        // 연결을 여는 동안 dispose되었다면 게시하지 않고 직접 닫는다
        if self.disposed.load(Ordering::SeqCst) {
            opened.iter().for_each(|slot| slot.connection.close());
            return Err(disposed_error());
        }

        if self.slots.set(opened).is_err() {
            // init_lock 아래에서는 도달하지 않음
            warn!("커넥션 풀이 이미 초기화되어 있습니다");
        }

        // 게시 직후 dispose가 슬롯을 보지 못했을 수 있다
        fence(Ordering::SeqCst);
        if self.disposed.load(Ordering::SeqCst) {
            self.close_published();
            return Err(disposed_error());
        }

        self.slots
            .get()
            .map(Vec::as_slice)
            .ok_or_else(|| CacheError::StoreUnavailable("connection pool was not populated".to_string()))
    }

    async fn open_all(&self) -> CacheResult<Vec<Slot<C::Connection>>> {
        let size = self.settings.pool_size();
        let timeout = self.settings.sync_timeout();
        info!("🔄 캐시 커넥션 풀 초기화: {} ({}개 연결)", self.endpoint, size);

        let mut opened: Vec<Slot<C::Connection>> = Vec::with_capacity(size);
        for index in 0..size {
            let attempt = tokio::time::timeout(timeout, self.connector.connect(&self.endpoint, &self.settings)).await;
            let result = match attempt {
                Ok(result) => result,
                Err(_) => Err(CacheError::StoreUnavailable(format!(
                    "connect to {} timed out after {} ms",
                    self.endpoint,
                    timeout.as_millis()
                ))),
            };

            match result {
                Ok(connection) => opened.push(Slot {
                    connection,
                    in_flight: AtomicUsize::new(0),
                }),
                Err(e) => {
                    error!("❌ 캐시 연결 #{} 실패: {}", index, e);
                    opened.iter().for_each(|slot| slot.connection.close());
                    return Err(e);
                }
            }
        }

        info!("✅ 캐시 커넥션 풀 준비 완료 ({}개 연결)", opened.len());
        Ok(opened)
    }

    fn ensure_not_disposed(&self) -> CacheResult<()> {
        if self.disposed.load(Ordering::SeqCst) {
            Err(disposed_error())
        } else {
            Ok(())
        }
    }
}

impl<C: Connector> Drop for ConnectionPool<C> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn disposed_error() -> CacheError {
    CacheError::StoreUnavailable("connection pool has been disposed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caching::connection::Target;
    use crate::caching::keyspace::{KeyPattern, PhysicalKey};
    use crate::caching::memory::MemoryConnector;
    use std::time::Duration;

    fn pool_with(endpoint: &str, size: usize, store: &MemoryConnector) -> ConnectionPool<MemoryConnector> {
        let settings = CacheSettings::default().with_endpoint(endpoint).with_pool_size(size);
        ConnectionPool::new(Arc::new(settings), store.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_lazy_initialization_opens_exactly_pool_size() {
        let store = MemoryConnector::new();
        let pool = pool_with("redis://localhost:6379", 3, &store);

        assert_eq!(pool.state(), PoolState::Uninitialized);
        assert_eq!(store.connect_count(), 0);

        pool.warm_up().await.unwrap();
        pool.warm_up().await.unwrap();
        let _lease = pool.checkout().await.unwrap();

        assert_eq!(pool.state(), PoolState::Ready);
        assert_eq!(store.connect_count(), 3);
        assert_eq!(pool.size(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_initializes_once() {
        let store = MemoryConnector::new();
        let pool = Arc::new(pool_with("redis://localhost:6379", 2, &store));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move { pool.warm_up().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_checkout_prefers_least_loaded_slot() {
        let store = MemoryConnector::new();
        let pool = pool_with("redis://localhost:6379", 3, &store);

        let first = pool.checkout().await.unwrap();
        let second = pool.checkout().await.unwrap();
        let third = pool.checkout().await.unwrap();
        assert_eq!((first.index(), second.index(), third.index()), (0, 1, 2));
        assert_eq!(pool.in_flight(), vec![1, 1, 1]);

        drop(second);
        let again = pool.checkout().await.unwrap();
        assert_eq!(again.index(), 1);

        drop(first);
        drop(third);
        drop(again);
        assert_eq!(pool.in_flight(), vec![0, 0, 0]);
        assert_eq!(pool.checkout().await.unwrap().index(), 0);
    }

    #[tokio::test]
    async fn test_failed_initialization_is_retriable() {
        let store = MemoryConnector::new();
        let pool = pool_with("redis://localhost:6379", 3, &store);

        store.set_reachable(false);
        let err = pool.warm_up().await.unwrap_err();
        assert!(err.is_connectivity());
        assert_eq!(pool.state(), PoolState::Uninitialized);

        store.set_reachable(true);
        pool.warm_up().await.unwrap();
        assert_eq!(pool.state(), PoolState::Ready);
    }

    #[tokio::test]
    async fn test_partial_failure_closes_opened_handles() {
        let store = MemoryConnector::new();
        let settings = CacheSettings::default().with_pool_size(3);
        let pool = ConnectionPool::new(Arc::new(settings), FailOnSecondConnect(store.clone())).unwrap();

        assert!(pool.warm_up().await.unwrap_err().is_connectivity());
        assert_eq!(store.connect_count(), 2);
        assert_eq!(store.close_count(), 1);
        assert_eq!(pool.state(), PoolState::Uninitialized);

        pool.warm_up().await.unwrap();
        assert_eq!(store.connect_count(), 5);
        assert_eq!(pool.in_flight().len(), 3);
    }

    struct FailOnSecondConnect(MemoryConnector);

    #[async_trait::async_trait]
    impl Connector for FailOnSecondConnect {
        type Connection = crate::caching::memory::MemoryConnection;

        async fn connect(&self, endpoint: &Endpoint, settings: &CacheSettings) -> CacheResult<Self::Connection> {
            if self.0.connect_count() == 1 {
                self.0.fail_next_connects(1);
            }
            self.0.connect(endpoint, settings).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_timeout_is_unavailable() {
        let store = MemoryConnector::new();
        let settings = CacheSettings::default()
            .with_pool_size(1)
            .with_sync_timeout(Duration::from_millis(100));
        let pool = ConnectionPool::new(Arc::new(settings), SlowConnector(store)).unwrap();

        let err = pool.warm_up().await.unwrap_err();
        assert!(matches!(err, CacheError::StoreUnavailable(msg) if msg.contains("timed out")));
        assert_eq!(pool.state(), PoolState::Uninitialized);
    }

    struct SlowConnector(MemoryConnector);

    #[async_trait::async_trait]
    impl Connector for SlowConnector {
        type Connection = crate::caching::memory::MemoryConnection;

        async fn connect(&self, endpoint: &Endpoint, settings: &CacheSettings) -> CacheResult<Self::Connection> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            self.0.connect(endpoint, settings).await
        }
    }

    #[tokio::test]
    async fn test_dispose_closes_each_handle_once() {
        let store = MemoryConnector::new();
        let pool = pool_with("redis://localhost:6379", 2, &store);
        pool.warm_up().await.unwrap();

        pool.dispose();
        pool.dispose();
        drop(pool);

        assert_eq!(store.close_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_during_initialization_closes_each_handle_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        let settings = CacheSettings::default().with_pool_size(2);
        let connector = CountingConnector {
            closes: Arc::clone(&closes),
        };
        let pool = Arc::new(ConnectionPool::new(Arc::new(settings), connector).unwrap());

        let init = tokio::spawn({
            let pool = Arc::clone(&pool);
            async move { pool.warm_up().await }
        });
        while pool.state() != PoolState::Initializing {
            tokio::task::yield_now().await;
        }

        pool.dispose();
        let result = init.await.unwrap();
        drop(pool);

        assert!(matches!(result, Err(CacheError::StoreUnavailable(_))));
        assert_eq!(closes.load(Ordering::SeqCst), 2);
    }

    /// `close()` 호출을 모두 세는 연결 (중복 호출도 포함)
    struct CountingConnector {
        closes: Arc<AtomicUsize>,
    }

    struct CountingConnection {
        closes: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl Connector for CountingConnector {
        type Connection = CountingConnection;

        async fn connect(&self, _endpoint: &Endpoint, _settings: &CacheSettings) -> CacheResult<CountingConnection> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(CountingConnection {
                closes: Arc::clone(&self.closes),
            })
        }
    }

    #[async_trait::async_trait]
    impl StoreConnection for CountingConnection {
        async fn get(&self, _key: &PhysicalKey, _routing: Routing) -> CacheResult<Option<Vec<u8>>> {
            Ok(None)
        }

        async fn set(&self, _key: &PhysicalKey, _value: Vec<u8>, _lifetime: Duration, _routing: Routing) -> CacheResult<()> {
            Ok(())
        }

        async fn delete(&self, _keys: &[PhysicalKey], _routing: Routing) -> CacheResult<()> {
            Ok(())
        }

        async fn keys(&self, _pattern: &KeyPattern) -> CacheResult<Vec<PhysicalKey>> {
            Ok(Vec::new())
        }

        fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_checkout_after_dispose_fails() {
        let store = MemoryConnector::new();
        let pool = pool_with("redis://localhost:6379", 1, &store);

        pool.dispose();

        assert_eq!(pool.state(), PoolState::Disposed);
        assert!(matches!(pool.checkout().await, Err(CacheError::StoreUnavailable(_))));
        assert_eq!(store.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_drop_disposes_pool() {
        let store = MemoryConnector::new();
        {
            let pool = pool_with("redis://localhost:6379", 2, &store);
            pool.warm_up().await.unwrap();
        }
        assert_eq!(store.close_count(), 2);
    }

    #[test]
    fn test_routing_depends_on_topology() {
        let store = MemoryConnector::new();

        let standalone = pool_with("redis://localhost:6379", 1, &store);
        assert!(!standalone.is_failover_topology());
        assert_eq!(standalone.read_routing(), Routing::primary());

        let sentinel = pool_with("sentinel-1,serviceName=cache_master", 1, &store);
        assert!(sentinel.is_failover_topology());
        assert_eq!(sentinel.read_routing().target, Target::PreferReplica);
        assert!(!sentinel.read_routing().fire_and_forget);

        for routing in [sentinel.write_routing(), sentinel.remove_routing()] {
            assert_eq!(routing.target, Target::Primary);
            assert!(routing.fire_and_forget);
        }
    }

    #[test]
    fn test_invalid_settings_rejected_at_construction() {
        let store = MemoryConnector::new();
        let settings = CacheSettings::default().with_pool_size(0);
        assert!(matches!(
            ConnectionPool::new(Arc::new(settings), store.clone()),
            Err(CacheError::InvalidSettings(_))
        ));

        let settings = CacheSettings::default().with_endpoint("host:port");
        assert!(matches!(
            ConnectionPool::new(Arc::new(settings), store),
            Err(CacheError::InvalidSettings(_))
        ));
    }
}
