//! # Redis 저장소 구현
//!
//! `redis` 크레이트 위에서 동작하는 `Connector`/`StoreConnection` 구현입니다.
//!
//! ## 연결 관리
//!
//! 핸들 하나는 멀티플렉싱 연결 하나(Sentinel 구성이면 마스터 + 레플리카)를 가지며,
//! 단일 TCP 연결에서 여러 동시 요청을 처리합니다.
//!
//! | 엔드포인트 | 마스터 연결 | 레플리카 연결 |
//! |-----------|-------------|---------------|
//! | `redis://` URL | URL 그대로 | 없음 |
//! | 단일 서버 디스크립터 | 첫 번째 노드 | 없음 |
//! | Sentinel 디스크립터 | `SentinelServerType::Master` | `SentinelServerType::Replica` (실패 시 마스터로 대체) |
//!
//! ## 명령
//!
//! - 읽기: `GET`
//! - 쓰기: `PSETEX` (밀리초 단위 TTL)
//! - 삭제: `DEL key1 key2 ...` (한 번의 명령)
//! - 열거: `KEYS pattern`
//!
//! 모든 명령은 서버 응답까지 기다립니다(`sync_timeout` 적용). `fire_and_forget` 라우팅의
//! 쓰기도 마찬가지라서, 같은 핸들에서 이어지는 읽기는 항상 앞선 쓰기 이후에 처리되고
//! 쓰기 실패는 호출자에게 전파됩니다.

use std::future::Future;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use redis::aio::MultiplexedConnection;
use redis::sentinel::{SentinelClient, SentinelNodeConnectionInfo, SentinelServerType};
use redis::{AsyncCommands, Client, IntoConnectionInfo, RedisConnectionInfo, RedisResult};

use crate::caching::connection::{Connector, Routing, StoreConnection, Target};
use crate::caching::endpoint::{Endpoint, NodeAddress};
use crate::caching::keyspace::{KeyPattern, PhysicalKey};
use crate::config::CacheSettings;
use crate::errors::{CacheError, CacheResult, ErrorContext};

/// Redis 연결 팩토리
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisConnector;

#[async_trait]
impl Connector for RedisConnector {
    type Connection = RedisConnection;

    /// 엔드포인트에 연결하고 `PING`으로 가용성을 확인합니다.
    ///
    /// ## 에러 케이스
    ///
    /// - 서버/Sentinel에 연결할 수 없는 경우 → `StoreUnavailable`
    /// - 잘못된 URL 형식 → `InvalidSettings`
    /// - 인증 실패 등 서버 거부 → `Store`
    async fn connect(&self, endpoint: &Endpoint, settings: &CacheSettings) -> CacheResult<RedisConnection> {
        let links = match endpoint {
            Endpoint::Url { url, password, .. } => Links {
                primary: open_url(url, password.as_deref()).await?,
                replica: None,
            },
            Endpoint::Standalone {
                nodes,
                password,
                database,
            } => {
                let node = first_node(nodes)?;
                Links {
                    primary: open_url(&node.to_url(password.as_deref(), *database), None).await?,
                    replica: None,
                }
            }
            Endpoint::Sentinel {
                nodes,
                service_name,
                password,
                database,
            } => {
                let primary = open_sentinel(
                    nodes,
                    service_name,
                    password.as_deref(),
                    *database,
                    SentinelServerType::Master,
                )
                .await?;
                let replica = match open_sentinel(
                    nodes,
                    service_name,
                    password.as_deref(),
                    *database,
                    SentinelServerType::Replica,
                )
                .await
                {
                    Ok(replica) => Some(replica),
                    Err(e) => {
                        warn!("⚠️ 레플리카 연결 실패, 읽기를 마스터로 보냅니다: {}", e);
                        None
                    }
                };
                Links { primary, replica }
            }
        };

        // 연결 테스트 - PING 명령으로 서버 가용성 확인
        let mut ping = links.primary.clone();
        redis::cmd("PING").query_async::<()>(&mut ping).await?;

        info!("✅ Redis 연결 성공: {}", endpoint);

        Ok(RedisConnection {
            links: RwLock::new(Some(links)),
            label: endpoint.to_string(),
            timeout: settings.sync_timeout(),
        })
    }
}

#[derive(Clone)]
struct Links {
    primary: MultiplexedConnection,
    replica: Option<MultiplexedConnection>,
}

/// Redis 저장소 핸들
///
/// `close()` 이후에는 모든 명령이 `StoreUnavailable`로 실패합니다.
pub struct RedisConnection {
    links: RwLock<Option<Links>>,
    label: String,
    /// 명령 응답 대기 타임아웃
    timeout: Duration,
}

impl RedisConnection {
    fn link(&self, target: Target) -> CacheResult<MultiplexedConnection> {
        let guard = self.links.read().unwrap_or_else(PoisonError::into_inner);
        let links = guard
            .as_ref()
            .ok_or_else(|| CacheError::StoreUnavailable(format!("connection to {} is closed", self.label)))?;

        Ok(match (target, &links.replica) {
            (Target::PreferReplica, Some(replica)) => replica.clone(),
            _ => links.primary.clone(),
        })
    }

    async fn bounded<T, F>(&self, description: &str, command: F) -> CacheResult<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, command).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::StoreUnavailable(format!(
                "Redis {} timed out after {} ms ({})",
                description,
                self.timeout.as_millis(),
                self.label
            ))),
        }
    }
}

#[async_trait]
impl StoreConnection for RedisConnection {
    async fn get(&self, key: &PhysicalKey, routing: Routing) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.link(routing.target)?;
        self.bounded("GET", conn.get::<_, Option<Vec<u8>>>(key.as_str())).await
    }

    async fn set(&self, key: &PhysicalKey, value: Vec<u8>, lifetime: Duration, routing: Routing) -> CacheResult<()> {
        let mut conn = self.link(routing.target)?;
        let millis = lifetime_millis(lifetime);

        self.bounded("PSETEX", conn.pset_ex::<_, _, ()>(key.as_str(), value, millis))
            .await?;
        debug!("Redis PSETEX {} ({} ms)", key, millis);
        Ok(())
    }

    async fn delete(&self, keys: &[PhysicalKey], routing: Routing) -> CacheResult<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut conn = self.link(routing.target)?;
        let keys: Vec<&str> = keys.iter().map(PhysicalKey::as_str).collect();

        let removed = self.bounded("DEL", conn.del::<_, usize>(&keys)).await?;
        debug!("Redis DEL {}개 요청, {}개 삭제", keys.len(), removed);
        Ok(())
    }

    /// ## ⚠️ 프로덕션 주의사항
    ///
    /// KEYS 명령은 블로킹 연산으로 Redis 서버 전체 성능에 영향을 줄 수 있습니다.
    /// 대량 무효화 용도로만 사용하세요.
    async fn keys(&self, pattern: &KeyPattern) -> CacheResult<Vec<PhysicalKey>> {
        let mut conn = self.link(Target::Primary)?;
        let keys = self
            .bounded("KEYS", conn.keys::<_, Vec<String>>(pattern.as_str()))
            .await?;
        Ok(keys.into_iter().map(PhysicalKey::from_stored).collect())
    }

    fn close(&self) {
        let taken = self.links.write().unwrap_or_else(PoisonError::into_inner).take();
        if taken.is_some() {
            debug!("Redis 연결 종료: {}", self.label);
        }
    }
}

/// URL에 비밀번호가 없으면 `password`를 적용해 연결합니다.
async fn open_url(url: &str, password: Option<&str>) -> CacheResult<MultiplexedConnection> {
    let mut info = url.into_connection_info().settings_context("잘못된 Redis URL")?;
    if info.redis.password.is_none() {
        info.redis.password = password.map(str::to_string);
    }

    let client = Client::open(info).settings_context("잘못된 Redis URL")?;
    let conn = client.get_multiplexed_async_connection().await?;
    Ok(conn)
}

async fn open_sentinel(
    nodes: &[NodeAddress],
    service_name: &str,
    password: Option<&str>,
    database: i64,
    server_type: SentinelServerType,
) -> CacheResult<MultiplexedConnection> {
    // Sentinel 노드 자체에는 인증 없이 접속하고, 비밀번호는 데이터 노드에만 적용
    let sentinels: Vec<String> = nodes.iter().map(|node| node.to_url(None, 0)).collect();
    let node_info = SentinelNodeConnectionInfo {
        redis_connection_info: Some(RedisConnectionInfo {
            db: database,
            password: password.map(str::to_string),
            ..Default::default()
        }),
        ..Default::default()
    };

    let mut client = SentinelClient::build(sentinels, service_name.to_string(), Some(node_info), server_type)
        .settings_context("Sentinel 클라이언트 구성 실패")?;
    let conn = client.get_async_connection().await?;
    Ok(conn)
}

fn first_node(nodes: &[NodeAddress]) -> CacheResult<&NodeAddress> {
    nodes
        .first()
        .ok_or_else(|| CacheError::InvalidSettings("endpoint has no nodes".to_string()))
}

/// PSETEX는 0ms를 거부하므로 최소 1ms로 올림
fn lifetime_millis(lifetime: Duration) -> u64 {
    u64::try_from(lifetime.as_millis()).unwrap_or(u64::MAX).max(1)
}
