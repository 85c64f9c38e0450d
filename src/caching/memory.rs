//! # 인메모리 저장소
//!
//! Redis 없이 캐시 계층을 검증하기 위한 `Connector` 구현입니다.
//! 같은 `MemoryConnector`에서 열린 모든 연결은 하나의 저장 공간을 공유하므로
//! 여러 핸들로 구성된 풀에서도 단일 서버처럼 동작합니다.
//!
//! - TTL: `tokio::time::Instant` 기준 (`start_paused` 테스트에서 시간 제어 가능)
//! - `KEYS`: `*` 와일드카드 glob 매칭
//! - 장애 주입: `set_reachable`, `set_writable`, `fail_next_connects`, `set_latency`
//! - 실행된 명령 기록: `commands()`
//!
//! ```rust,ignore
//! let store = MemoryConnector::new();
//! let pool = Arc::new(ConnectionPool::new(settings, store.clone())?);
//! let cache = CacheService::new(pool, "TenantA")?;
//!
//! store.set_reachable(false);
//! assert!(cache.get::<String>("k", Scope::Local).await.unwrap_err().is_connectivity());
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::time::Instant;

use crate::caching::connection::{Connector, Routing, StoreConnection};
use crate::caching::endpoint::Endpoint;
use crate::caching::keyspace::{KeyPattern, PhysicalKey};
use crate::config::CacheSettings;
use crate::errors::{CacheError, CacheResult};

/// 저장소가 받은 명령
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get { key: String, routing: Routing },
    Set { key: String, lifetime: Duration, routing: Routing },
    Delete { keys: Vec<String>, routing: Routing },
    Keys { pattern: String },
}

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug)]
struct Shared {
    entries: Mutex<HashMap<String, Entry>>,
    commands: Mutex<Vec<Command>>,
    reachable: AtomicBool,
    writable: AtomicBool,
    pending_connect_failures: AtomicUsize,
    latency_ms: AtomicU64,
    connects: AtomicUsize,
    closes: AtomicUsize,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            commands: Mutex::new(Vec::new()),
            reachable: AtomicBool::new(true),
            writable: AtomicBool::new(true),
            pending_connect_failures: AtomicUsize::new(0),
            latency_ms: AtomicU64::new(0),
            connects: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        }
    }
}

const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 공유 인메모리 저장소에 연결을 여는 `Connector`
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    shared: Arc<Shared>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// `false`면 연결과 모든 명령이 `StoreUnavailable`로 실패합니다.
    pub fn set_reachable(&self, reachable: bool) {
        self.shared.reachable.store(reachable, Ordering::SeqCst);
    }

    /// `false`면 읽기는 성공하고 쓰기/삭제만 `StoreUnavailable`로 실패합니다.
    pub fn set_writable(&self, writable: bool) {
        self.shared.writable.store(writable, Ordering::SeqCst);
    }

    /// 다음 `count`번의 연결 시도를 실패시킵니다.
    pub fn fail_next_connects(&self, count: usize) {
        self.shared.pending_connect_failures.store(count, Ordering::SeqCst);
    }

    /// 모든 명령 앞에 지연을 넣습니다.
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.shared.latency_ms.store(millis, Ordering::SeqCst);
    }

    /// 연결 시도 횟수 (실패 포함)
    pub fn connect_count(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    /// 닫힌 연결 수
    pub fn close_count(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    pub fn commands(&self) -> Vec<Command> {
        lock(&self.shared.commands).clone()
    }

    pub fn clear_commands(&self) {
        lock(&self.shared.commands).clear();
    }

    /// 만료되지 않은 물리 키가 있는지 확인합니다.
    pub fn contains(&self, physical_key: &str) -> bool {
        let now = Instant::now();
        lock(&self.shared.entries)
            .get(physical_key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// 만료되지 않은 엔트리 수
    pub fn len(&self) -> usize {
        let now = Instant::now();
        lock(&self.shared.entries).values().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 명령 기록 없이 물리 키에 원시 페이로드를 넣습니다. (손상된 값 재현용)
    pub fn insert_raw(&self, physical_key: &str, payload: Vec<u8>, lifetime: Duration) {
        lock(&self.shared.entries).insert(
            physical_key.to_string(),
            Entry {
                value: payload,
                expires_at: expiry_after(lifetime),
            },
        );
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Connection = MemoryConnection;

    async fn connect(&self, endpoint: &Endpoint, _settings: &CacheSettings) -> CacheResult<MemoryConnection> {
        let id = self.shared.connects.fetch_add(1, Ordering::SeqCst);

        let injected = self
            .shared
            .pending_connect_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected || !self.shared.reachable.load(Ordering::SeqCst) {
            return Err(CacheError::StoreUnavailable(format!("cannot connect to {}", endpoint)));
        }

        debug!("인메모리 연결 #{} 생성: {}", id, endpoint);
        Ok(MemoryConnection {
            shared: Arc::clone(&self.shared),
            id,
            closed: AtomicBool::new(false),
        })
    }
}

/// 인메모리 저장소 핸들
#[derive(Debug)]
pub struct MemoryConnection {
    shared: Arc<Shared>,
    id: usize,
    closed: AtomicBool,
}

impl MemoryConnection {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn enter(&self, command: Command, write: bool) -> CacheResult<()> {
        let latency = self.shared.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.is_closed() {
            return Err(CacheError::StoreUnavailable(format!("connection #{} is closed", self.id)));
        }
        if !self.shared.reachable.load(Ordering::SeqCst) {
            return Err(CacheError::StoreUnavailable("store is unreachable".to_string()));
        }
        if write && !self.shared.writable.load(Ordering::SeqCst) {
            return Err(CacheError::StoreUnavailable("store rejects writes".to_string()));
        }

        lock(&self.shared.commands).push(command);
        Ok(())
    }
}

#[async_trait]
impl StoreConnection for MemoryConnection {
    async fn get(&self, key: &PhysicalKey, routing: Routing) -> CacheResult<Option<Vec<u8>>> {
        self.enter(
            Command::Get {
                key: key.to_string(),
                routing,
            },
            false,
        )
        .await?;

        let now = Instant::now();
        let mut entries = lock(&self.shared.entries);
        let expired = entries.get(key.as_str()).map(|entry| entry.is_expired(now));
        match expired {
            Some(true) => {
                entries.remove(key.as_str());
                Ok(None)
            }
            Some(false) => Ok(entries.get(key.as_str()).map(|entry| entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &PhysicalKey, value: Vec<u8>, lifetime: Duration, routing: Routing) -> CacheResult<()> {
        self.enter(
            Command::Set {
                key: key.to_string(),
                lifetime,
                routing,
            },
            true,
        )
        .await?;

        lock(&self.shared.entries).insert(
            key.to_string(),
            Entry {
                value,
                expires_at: expiry_after(lifetime),
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[PhysicalKey], routing: Routing) -> CacheResult<()> {
        self.enter(
            Command::Delete {
                keys: keys.iter().map(PhysicalKey::to_string).collect(),
                routing,
            },
            true,
        )
        .await?;

        let mut entries = lock(&self.shared.entries);
        for key in keys {
            entries.remove(key.as_str());
        }
        Ok(())
    }

    async fn keys(&self, pattern: &KeyPattern) -> CacheResult<Vec<PhysicalKey>> {
        self.enter(
            Command::Keys {
                pattern: pattern.to_string(),
            },
            false,
        )
        .await?;

        let now = Instant::now();
        let entries = lock(&self.shared.entries);
        let mut matched: Vec<PhysicalKey> = entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired(now) && glob_matches(pattern.as_str(), key))
            .map(|(key, _)| PhysicalKey::from_stored(key.as_str()))
            .collect();
        matched.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(matched)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.shared.closes.fetch_add(1, Ordering::SeqCst);
            debug!("인메모리 연결 #{} 종료", self.id);
        }
    }
}

/// 아주 긴 수명은 약 100년 뒤로 포화시킵니다.
fn expiry_after(lifetime: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(lifetime)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// `*`만 와일드카드로 취급하는 glob 매칭
pub(crate) fn glob_matches(pattern: &str, key: &str) -> bool {
    let segments: Vec<&str> = pattern.split('*').collect();
    if segments.len() == 1 {
        return pattern == key;
    }

    let (first, rest) = (segments[0], &segments[1..]);
    let Some(mut remaining) = key.strip_prefix(first) else {
        return false;
    };

    let (last, middle) = match rest.split_last() {
        Some(split) => split,
        None => return remaining.is_empty(),
    };

    for segment in middle.iter().filter(|s| !s.is_empty()) {
        match remaining.find(segment) {
            Some(pos) => remaining = &remaining[pos + segment.len()..],
            None => return false,
        }
    }

    remaining.ends_with(last)
}
