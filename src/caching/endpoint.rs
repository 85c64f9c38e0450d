//! # 엔드포인트 디스크립터
//!
//! 설정의 `REDIS_URL` 값을 해석해 연결 대상 토폴로지를 결정합니다.
//!
//! ## 지원 형식
//!
//! ```text
//! redis://localhost:6379                     # URL 그대로 사용 (단일 서버)
//! rediss://:secret@cache.internal:6380/2     # TLS URL
//! cache-1:6379                               # 단일 서버 디스크립터
//! sentinel-1,sentinel-2:26380,serviceName=cache_master,password=secret,defaultDatabase=1
//! ```
//!
//! `serviceName=` 옵션이 있으면 Sentinel(failover) 토폴로지로 간주합니다.
//! 포트를 생략하면 Sentinel 노드는 26379, 일반 노드는 6379를 사용합니다.
//! 비밀번호가 없는 URL에는 설정의 비밀번호(`REDIS_PASSWORD`)가 적용됩니다.

use std::fmt;

use log::warn;
use redis::IntoConnectionInfo;

use crate::errors::{CacheError, CacheResult, ErrorContext};

/// Sentinel 노드 기본 포트
pub const DEFAULT_SENTINEL_PORT: u16 = 26379;
/// 일반 Redis 노드 기본 포트
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// `host:port` 한 쌍
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAddress {
    pub host: String,
    pub port: u16,
}

impl NodeAddress {
    /// 비밀번호와 DB 번호를 포함한 `redis://` URL을 만듭니다.
    pub fn to_url(&self, password: Option<&str>, database: i64) -> String {
        match password {
            Some(pw) => format!(
                "redis://:{}@{}:{}/{}",
                urlencoding::encode(pw),
                self.host,
                self.port,
                database
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, database),
        }
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// 해석된 연결 대상
#[derive(Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `redis://` / `rediss://` URL
    ///
    /// `password`는 URL의 비밀번호, 없으면 설정의 비밀번호입니다.
    Url {
        url: String,
        password: Option<String>,
        database: i64,
    },

    /// 단일 서버. 여러 노드가 나열되면 첫 번째 노드에 연결합니다.
    Standalone {
        nodes: Vec<NodeAddress>,
        password: Option<String>,
        database: i64,
    },

    /// Sentinel이 관리하는 마스터/레플리카 구성
    Sentinel {
        nodes: Vec<NodeAddress>,
        service_name: String,
        password: Option<String>,
        database: i64,
    },
}

impl Endpoint {
    /// 디스크립터를 해석합니다.
    ///
    /// 디스크립터 안의 `password=`(URL이면 `redis://:pw@host`)가 `settings_password`보다 우선합니다.
    ///
    /// # Errors
    ///
    /// * `CacheError::InvalidSettings` - 잘못된 URL, 노드가 없거나 포트/DB 번호가 숫자가 아닌 경우,
    ///   `serviceName=` 값이 비어 있는 경우
    pub fn parse(descriptor: &str, settings_password: Option<&str>) -> CacheResult<Self> {
        let descriptor = descriptor.trim();
        if descriptor.is_empty() {
            return Err(CacheError::InvalidSettings("endpoint descriptor is empty".to_string()));
        }

        if descriptor.starts_with("redis://") || descriptor.starts_with("rediss://") {
            let info = descriptor
                .into_connection_info()
                .settings_context("잘못된 Redis URL")?;
            return Ok(Endpoint::Url {
                url: descriptor.to_string(),
                password: info.redis.password.or_else(|| settings_password.map(str::to_string)),
                database: info.redis.db,
            });
        }

        let mut raw_nodes = Vec::new();
        let mut service_name: Option<String> = None;
        let mut password: Option<String> = None;
        let mut database: i64 = 0;

        for part in descriptor.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.split_once('=') {
                Some((name, value)) => {
                    let value = value.trim();
                    match name.trim().to_ascii_lowercase().as_str() {
                        "servicename" => {
                            if value.is_empty() {
                                return Err(CacheError::InvalidSettings(
                                    "serviceName option must not be empty".to_string(),
                                ));
                            }
                            service_name = Some(value.to_string());
                        }
                        "password" => {
                            if !value.is_empty() {
                                password = Some(value.to_string());
                            }
                        }
                        "defaultdatabase" => {
                            database = value.parse::<i64>().map_err(|e| {
                                CacheError::InvalidSettings(format!("invalid defaultDatabase '{}': {}", value, e))
                            })?;
                        }
                        other => warn!("알 수 없는 엔드포인트 옵션 무시: {}", other),
                    }
                }
                None => raw_nodes.push(part),
            }
        }

        if raw_nodes.is_empty() {
            return Err(CacheError::InvalidSettings(format!(
                "endpoint descriptor has no host: {}",
                mask_descriptor(descriptor)
            )));
        }

        let default_port = if service_name.is_some() {
            DEFAULT_SENTINEL_PORT
        } else {
            DEFAULT_REDIS_PORT
        };
        let nodes = raw_nodes
            .into_iter()
            .map(|raw| parse_node(raw, default_port))
            .collect::<CacheResult<Vec<_>>>()?;

        let password = password.or_else(|| settings_password.map(str::to_string));

        Ok(match service_name {
            Some(service_name) => Endpoint::Sentinel {
                nodes,
                service_name,
                password,
                database,
            },
            None => Endpoint::Standalone {
                nodes,
                password,
                database,
            },
        })
    }

    /// Sentinel 토폴로지 여부. 읽기 라우팅 결정에 사용됩니다.
    pub fn is_failover(&self) -> bool {
        matches!(self, Endpoint::Sentinel { .. })
    }

    pub fn service_name(&self) -> Option<&str> {
        match self {
            Endpoint::Sentinel { service_name, .. } => Some(service_name.as_str()),
            _ => None,
        }
    }

    pub fn nodes(&self) -> &[NodeAddress] {
        match self {
            Endpoint::Url { .. } => &[],
            Endpoint::Standalone { nodes, .. } | Endpoint::Sentinel { nodes, .. } => nodes.as_slice(),
        }
    }

    pub fn password(&self) -> Option<&str> {
        match self {
            Endpoint::Url { password, .. }
            | Endpoint::Standalone { password, .. }
            | Endpoint::Sentinel { password, .. } => password.as_deref(),
        }
    }

    pub fn database(&self) -> i64 {
        match self {
            Endpoint::Url { database, .. }
            | Endpoint::Standalone { database, .. }
            | Endpoint::Sentinel { database, .. } => *database,
        }
    }
}

// 로그에 비밀번호가 남지 않도록 Debug/Display 모두 마스킹
impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Url { url, .. } => f.write_str(&mask_url(url)),
            Endpoint::Standalone { nodes, database, .. } => {
                write!(f, "{} (db {})", join_nodes(nodes), database)
            }
            Endpoint::Sentinel {
                nodes,
                service_name,
                database,
                ..
            } => write!(f, "sentinel {} [{}] (db {})", service_name, join_nodes(nodes), database),
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Endpoint({})", self)
    }
}

fn parse_node(raw: &str, default_port: u16) -> CacheResult<NodeAddress> {
    // `[::1]:6379` 같은 IPv6 표기는 마지막 `:` 기준으로 분리
    let split = match raw.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && (!host.contains(':') || host.ends_with(']')) => Some((host, port)),
        _ => None,
    };

    match split {
        Some((host, port)) => {
            let port = port
                .trim()
                .parse::<u16>()
                .map_err(|e| CacheError::InvalidSettings(format!("invalid port in '{}': {}", raw, e)))?;
            Ok(NodeAddress {
                host: host.to_string(),
                port,
            })
        }
        None => Ok(NodeAddress {
            host: raw.to_string(),
            port: default_port,
        }),
    }
}

fn join_nodes(nodes: &[NodeAddress]) -> String {
    nodes.iter().map(NodeAddress::to_string).collect::<Vec<_>>().join(",")
}

fn mask_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

fn mask_descriptor(descriptor: &str) -> String {
    descriptor
        .split(',')
        .map(|part| {
            if part.trim().to_ascii_lowercase().starts_with("password=") {
                "password=***"
            } else {
                part
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_passthrough() {
        let endpoint = Endpoint::parse("redis://localhost:6379/3", None).unwrap();

        assert_eq!(
            endpoint,
            Endpoint::Url {
                url: "redis://localhost:6379/3".to_string(),
                password: None,
                database: 3,
            }
        );
        assert!(!endpoint.is_failover());
        assert_eq!(endpoint.database(), 3);

        let tls = Endpoint::parse("rediss://cache.internal:6380", None).unwrap();
        assert!(matches!(tls, Endpoint::Url { .. }));
    }

    #[test]
    fn test_url_takes_settings_password_when_missing() {
        let endpoint = Endpoint::parse("redis://127.0.0.1:6379", Some("secret")).unwrap();
        assert_eq!(endpoint.password(), Some("secret"));

        let inline = Endpoint::parse("redis://:inline@127.0.0.1:6379", Some("secret")).unwrap();
        assert_eq!(inline.password(), Some("inline"));
        assert!(!format!("{}", inline).contains("inline"));
    }

    #[test]
    fn test_malformed_url_is_settings_error() {
        assert!(matches!(
            Endpoint::parse("redis://cache-1:notaport/0", None),
            Err(CacheError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_empty_service_name_is_rejected() {
        assert!(matches!(
            Endpoint::parse("s1:26379,serviceName=", None),
            Err(CacheError::InvalidSettings(_))
        ));
        assert!(matches!(
            Endpoint::parse("s1:26379,serviceName=  ,password=pw", None),
            Err(CacheError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_standalone_descriptor_defaults() {
        let endpoint = Endpoint::parse("cache-1", Some("secret")).unwrap();

        assert!(!endpoint.is_failover());
        assert_eq!(
            endpoint.nodes(),
            &[NodeAddress {
                host: "cache-1".to_string(),
                port: 6379
            }]
        );
        assert_eq!(endpoint.password(), Some("secret"));
        assert_eq!(endpoint.database(), 0);
    }

    #[test]
    fn test_sentinel_descriptor() {
        let endpoint = Endpoint::parse(
            "sentinel-1, sentinel-2:26380,serviceName=cache_master,defaultDatabase=2",
            None,
        )
        .unwrap();

        assert!(endpoint.is_failover());
        assert_eq!(endpoint.service_name(), Some("cache_master"));
        assert_eq!(endpoint.nodes().len(), 2);
        assert_eq!(endpoint.nodes()[0].port, DEFAULT_SENTINEL_PORT);
        assert_eq!(endpoint.nodes()[1].port, 26380);
        assert_eq!(endpoint.database(), 2);
    }

    #[test]
    fn test_descriptor_password_wins() {
        let endpoint = Endpoint::parse("cache-1:6380,password=inline", Some("from-settings")).unwrap();
        assert_eq!(endpoint.password(), Some("inline"));
    }

    #[test]
    fn test_option_names_are_case_insensitive_and_unknown_ignored() {
        let endpoint = Endpoint::parse("s1,SERVICENAME=m,abortConnect=false,ssl=true", None).unwrap();
        assert_eq!(endpoint.service_name(), Some("m"));
        assert_eq!(endpoint.nodes().len(), 1);
    }

    #[test]
    fn test_invalid_descriptors() {
        assert!(matches!(Endpoint::parse("", None), Err(CacheError::InvalidSettings(_))));
        assert!(matches!(Endpoint::parse("   ", None), Err(CacheError::InvalidSettings(_))));
        assert!(matches!(
            Endpoint::parse("serviceName=cache_master", None),
            Err(CacheError::InvalidSettings(_))
        ));
        assert!(matches!(
            Endpoint::parse("cache-1:notaport", None),
            Err(CacheError::InvalidSettings(_))
        ));
        assert!(matches!(
            Endpoint::parse("cache-1,defaultDatabase=x", None),
            Err(CacheError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_ipv6_node() {
        let endpoint = Endpoint::parse("[::1]:6380", None).unwrap();
        assert_eq!(endpoint.nodes()[0].host, "[::1]");
        assert_eq!(endpoint.nodes()[0].port, 6380);
    }

    #[test]
    fn test_node_url_encodes_password() {
        let node = NodeAddress {
            host: "cache-1".to_string(),
            port: 6379,
        };

        assert_eq!(node.to_url(None, 0), "redis://cache-1:6379/0");
        assert_eq!(node.to_url(Some("p@ss:word"), 3), "redis://:p%40ss%3Aword@cache-1:6379/3");
    }

    #[test]
    fn test_display_masks_secrets() {
        let url = Endpoint::parse("redis://:hunter2@cache-1:6379/0", None).unwrap();
        assert!(!url.to_string().contains("hunter2"));
        assert!(url.to_string().contains("cache-1:6379"));

        let sentinel = Endpoint::parse("s1,serviceName=m,password=hunter2", None).unwrap();
        assert!(!format!("{:?}", sentinel).contains("hunter2"));

        assert_eq!(mask_descriptor("s1,password=hunter2"), "s1,password=***");
    }
}
