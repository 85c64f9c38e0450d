//! # Error Module
//!
//! 캐시 계층의 통합 에러 타입을 제공합니다.
//!
//! - [`errors::CacheError`] - 모든 캐시 연산이 반환하는 에러
//! - [`errors::CacheResult`] - `Result<T, CacheError>` 별칭
//! - [`errors::ErrorContext`] - 외부 에러 변환 확장 trait

pub mod errors;

pub use errors::*;
