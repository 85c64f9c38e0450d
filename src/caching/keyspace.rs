//! # 키 공간 (KeySpace)
//!
//! 논리 키를 저장소에 실제로 전송되는 물리 키로 변환합니다.
//!
//! | 종류 | 형식 | 예 |
//! |------|------|----|
//! | 물리 키 | `{namespace}.{key}` | `TenantA.user.1` |
//! | 무효화 패턴 | `{namespace}.*{partial}*` | `TenantA.*TextResource.en.*` |
//!
//! 네임스페이스는 `Scope::Global`이면 설정의 글로벌 라벨,
//! `Scope::Local`이면 override(비어 있지 않은 경우) 또는 파사드에 바인딩된 프로젝트 네임스페이스입니다.
//! 이 형식은 다른 클라이언트와의 상호 운용을 위해 바뀌면 안 됩니다.

use std::fmt;

use crate::errors::CacheResult;
use crate::utils::string_utils::{non_empty, require_non_empty};

/// 엔트리가 속하는 범위
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// 바인딩된 프로젝트/테넌트 네임스페이스
    #[default]
    Local,
    /// 모든 프로젝트가 공유하는 글로벌 네임스페이스
    Global,
}

/// 저장소에 전송되는 물리 키
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhysicalKey(String);

impl PhysicalKey {
    /// 저장소가 돌려준 키(예: `KEYS` 결과)를 그대로 감쌉니다.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        PhysicalKey(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhysicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `KEYS` 열거에 쓰는 와일드카드 패턴
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPattern(String);

impl KeyPattern {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 바인딩된 네임스페이스와 글로벌 라벨로 키를 구성하는 순수 함수 집합
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    namespace: String,
    global_namespace: String,
}

impl KeySpace {
    /// # Errors
    ///
    /// * `CacheError::InvalidKey` - 네임스페이스 또는 글로벌 라벨이 빈 경우
    pub fn new(namespace: &str, global_namespace: &str) -> CacheResult<Self> {
        require_non_empty(namespace, "namespace")?;
        require_non_empty(global_namespace, "global namespace")?;

        Ok(Self {
            namespace: namespace.to_string(),
            global_namespace: global_namespace.to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn global_namespace(&self) -> &str {
        &self.global_namespace
    }

    /// 논리 키를 물리 키로 변환합니다.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let keys = KeySpace::new("TenantA", "Global")?;
    /// assert_eq!(keys.resolve("user.1", Scope::Local, None)?.as_str(), "TenantA.user.1");
    /// assert_eq!(keys.resolve("user.1", Scope::Global, None)?.as_str(), "Global.user.1");
    /// assert_eq!(keys.resolve("user.1", Scope::Local, Some("TenantB"))?.as_str(), "TenantB.user.1");
    /// ```
    pub fn resolve(&self, key: &str, scope: Scope, namespace_override: Option<&str>) -> CacheResult<PhysicalKey> {
        let key = require_non_empty(key, "key")?;
        Ok(PhysicalKey(format!("{}.{}", self.namespace_for(scope, namespace_override), key)))
    }

    /// 부분 문자열 매칭용 패턴을 만듭니다.
    pub fn resolve_pattern(
        &self,
        partial_key: &str,
        scope: Scope,
        namespace_override: Option<&str>,
    ) -> CacheResult<KeyPattern> {
        let partial_key = require_non_empty(partial_key, "partial key")?;
        Ok(KeyPattern(format!(
            "{}.*{}*",
            self.namespace_for(scope, namespace_override),
            partial_key
        )))
    }

    fn namespace_for<'a>(&'a self, scope: Scope, namespace_override: Option<&'a str>) -> &'a str {
        match scope {
            Scope::Global => &self.global_namespace,
            Scope::Local => non_empty(namespace_override).unwrap_or(&self.namespace),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CacheError;

    fn keyspace() -> KeySpace {
        KeySpace::new("TenantA", "Global").unwrap()
    }

    #[test]
    fn test_local_and_global_keys() {
        let keys = keyspace();

        assert_eq!(keys.resolve("user.1", Scope::Local, None).unwrap().as_str(), "TenantA.user.1");
        assert_eq!(keys.resolve("user.1", Scope::Global, None).unwrap().as_str(), "Global.user.1");
        assert_ne!(
            keys.resolve("user.1", Scope::Local, None).unwrap(),
            keys.resolve("user.1", Scope::Global, None).unwrap()
        );
    }

    #[test]
    fn test_namespace_override() {
        let keys = keyspace();

        assert_eq!(
            keys.resolve("user.1", Scope::Local, Some("TenantB")).unwrap().as_str(),
            "TenantB.user.1"
        );
        // 빈 override는 바인딩된 네임스페이스로 대체
        assert_eq!(keys.resolve("user.1", Scope::Local, Some("")).unwrap().as_str(), "TenantA.user.1");
        // 글로벌 범위는 override를 무시
        assert_eq!(
            keys.resolve("user.1", Scope::Global, Some("TenantB")).unwrap().as_str(),
            "Global.user.1"
        );
    }

    #[test]
    fn test_pattern_format() {
        let keys = keyspace();

        assert_eq!(
            keys.resolve_pattern("TextResource.en.", Scope::Local, None).unwrap().as_str(),
            "TenantA.*TextResource.en.*"
        );
        assert_eq!(
            keys.resolve_pattern("user", Scope::Global, None).unwrap().as_str(),
            "Global.*user*"
        );
        assert_eq!(
            keys.resolve_pattern("user", Scope::Local, Some("TenantC")).unwrap().to_string(),
            "TenantC.*user*"
        );
    }

    #[test]
    fn test_empty_key_fails_fast() {
        let keys = keyspace();

        assert!(matches!(keys.resolve("", Scope::Local, None), Err(CacheError::InvalidKey(_))));
        assert!(matches!(keys.resolve("", Scope::Global, None), Err(CacheError::InvalidKey(_))));
        assert!(matches!(
            keys.resolve_pattern("", Scope::Local, None),
            Err(CacheError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_empty_namespace_rejected() {
        assert!(matches!(KeySpace::new("", "Global"), Err(CacheError::InvalidKey(_))));
        assert!(matches!(KeySpace::new("TenantA", ""), Err(CacheError::InvalidKey(_))));
    }

    #[test]
    fn test_scope_defaults_to_local() {
        assert_eq!(Scope::default(), Scope::Local);
    }
}
