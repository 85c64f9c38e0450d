//! 공통 유틸리티 함수 모듈
//!
//! # Modules
//!
//! - [`string_utils`] - 키 검증, 설정 문자열 정리
//! - [`display_terminal`] - `cache_probe` 터미널 출력 포맷팅

pub mod string_utils;
pub mod display_terminal;
