//! # 저장소 연결 추상화
//!
//! 커넥션 풀이 다루는 개별 핸들(`StoreConnection`)과 핸들을 여는 팩토리(`Connector`)를 정의합니다.
//! 실제 Redis 구현은 [`crate::caching::redis`], 테스트용 인메모리 구현은 [`crate::caching::memory`]에 있습니다.

use std::time::Duration;

use async_trait::async_trait;

use crate::caching::endpoint::Endpoint;
use crate::caching::keyspace::{KeyPattern, PhysicalKey};
use crate::config::CacheSettings;
use crate::errors::CacheResult;

/// 명령을 보낼 노드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// 마스터 노드
    Primary,
    /// 가능하면 레플리카, 없으면 마스터
    PreferReplica,
}

/// 저장소 명령 하나에 붙는 라우팅 플래그
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Routing {
    pub target: Target,
    /// 응답 값을 쓰지 않는 명령인지 여부
    ///
    /// 백엔드는 명령이 전송 계층에 수락된 뒤에 반환하고, 실패는 호출자에게 돌려줘야 합니다.
    pub fire_and_forget: bool,
}

impl Routing {
    pub const fn primary() -> Self {
        Self {
            target: Target::Primary,
            fire_and_forget: false,
        }
    }

    pub const fn prefer_replica() -> Self {
        Self {
            target: Target::PreferReplica,
            fire_and_forget: false,
        }
    }

    pub const fn fire_and_forget(self) -> Self {
        Self {
            target: self.target,
            fire_and_forget: true,
        }
    }
}

/// 풀이 소유하는 저장소 핸들
///
/// 모든 메서드는 여러 태스크에서 동시에 호출될 수 있어야 합니다.
/// 응답 대기 시간 제한은 호출하는 쪽(`CacheService`)이 적용합니다.
#[async_trait]
pub trait StoreConnection: Send + Sync + 'static {
    /// 값을 읽습니다. 키가 없으면 `Ok(None)`.
    async fn get(&self, key: &PhysicalKey, routing: Routing) -> CacheResult<Option<Vec<u8>>>;

    /// 수명과 함께 값을 씁니다.
    async fn set(&self, key: &PhysicalKey, value: Vec<u8>, lifetime: Duration, routing: Routing) -> CacheResult<()>;

    /// 여러 키를 한 번의 명령으로 삭제합니다. 없는 키는 무시됩니다.
    async fn delete(&self, keys: &[PhysicalKey], routing: Routing) -> CacheResult<()>;

    /// 패턴과 일치하는 키를 모두 열거합니다.
    async fn keys(&self, pattern: &KeyPattern) -> CacheResult<Vec<PhysicalKey>>;

    /// 연결을 닫습니다. 여러 번 호출돼도 안전해야 합니다.
    fn close(&self);
}

/// 엔드포인트에 새 핸들을 여는 팩토리
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Connection: StoreConnection;

    /// # Errors
    ///
    /// * `CacheError::StoreUnavailable` - 저장소에 연결할 수 없는 경우
    async fn connect(&self, endpoint: &Endpoint, settings: &CacheSettings) -> CacheResult<Self::Connection>;
}
