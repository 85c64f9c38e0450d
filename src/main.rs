//! 캐시 프로브
//!
//! 설정된 저장소에 실제로 연결해 캐시 파사드의 주요 연산을 순서대로 실행하고
//! 결과를 터미널에 요약합니다. 배포 직후 연결/인증/Sentinel 구성을 확인하는 용도입니다.
//!
//! ```bash
//! PROFILE=dev cargo run --bin cache_probe
//! REDIS_URL="sentinel-1:26379,serviceName=cache_master" cargo run --bin cache_probe
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dotenv::dotenv;
use env_logger::Env;
use log::{error, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use redis_cache_service::caching::{CacheService, ConnectionPool, RedisConnector, Scope};
use redis_cache_service::config::CacheSettings;
use redis_cache_service::errors::{CacheError, CacheResult};
use redis_cache_service::utils::display_terminal::{
    print_boxed_title, print_probe_summary, print_step_complete, print_step_failed, print_step_start, print_sub_task,
};

/// 프로브가 기록하는 값
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ProbePayload {
    run_id: Uuid,
    written_at: DateTime<Utc>,
    host: String,
}

const TOTAL_STEPS: usize = 6;

#[tokio::main]
async fn main() -> ExitCode {
    load_env_file();
    init_logging();

    print_boxed_title("🔎 CACHE PROBE");

    let settings = match CacheSettings::from_env() {
        Ok(settings) => Arc::new(settings),
        Err(e) => {
            error!("설정 로드 실패: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("캐시 설정: {:?}", settings);

    let pool = match ConnectionPool::redis(Arc::clone(&settings)) {
        Ok(pool) => Arc::new(pool),
        Err(e) => {
            error!("커넥션 풀 생성 실패: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let namespace = std::env::var("CACHE_NAMESPACE").unwrap_or_else(|_| "CacheProbe".to_string());
    let cache = match CacheService::new(Arc::clone(&pool), &namespace) {
        Ok(cache) => cache,
        Err(e) => {
            error!("캐시 서비스 생성 실패: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let passed = run_probe(&cache).await;

    print_probe_summary(
        &pool.endpoint().to_string(),
        pool.size(),
        pool.is_failover_topology(),
        passed,
        TOTAL_STEPS,
    );
    pool.dispose();

    if passed == TOTAL_STEPS {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// 단계를 순서대로 실행하고 성공한 단계 수를 반환합니다. 실패한 단계 이후는 건너뜁니다.
async fn run_probe(cache: &CacheService<RedisConnector>) -> usize {
    let run_id = Uuid::new_v4();
    let key = format!("probe.{}.value", run_id);
    let computed_key = format!("probe.{}.computed", run_id);
    let payload = ProbePayload {
        run_id,
        written_at: Utc::now(),
        host: std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string()),
    };
    let mut passed = 0;

    let started = Instant::now();
    print_step_start(1, "커넥션 풀 초기화");
    match cache.pool().warm_up().await {
        Ok(()) => {
            print_sub_task("namespace", cache.namespace());
            passed += complete(1, "커넥션 풀 초기화", started);
        }
        Err(e) => return fail(1, "커넥션 풀 초기화", &e, passed),
    }

    let started = Instant::now();
    print_step_start(2, "값 저장 (set)");
    match cache.set_with_expiry(&key, &payload, Duration::from_secs(60), Scope::Local).await {
        Ok(()) => passed += complete(2, "값 저장 (set)", started),
        Err(e) => return fail(2, "값 저장 (set)", &e, passed),
    }

    let started = Instant::now();
    print_step_start(3, "값 조회 (get)");
    match cache.get::<ProbePayload>(&key, Scope::Local).await {
        Ok(read) if read == payload => {
            print_sub_task("written_at", &read.written_at.to_rfc3339());
            passed += complete(3, "값 조회 (get)", started);
        }
        Ok(_) => {
            print_step_failed(3, "값 조회 (get)", "저장한 값과 다릅니다");
            return passed;
        }
        Err(e) => return fail(3, "값 조회 (get)", &e, passed),
    }

    let started = Instant::now();
    print_step_start(4, "read-through 조회 (get_or_set)");
    let computed = cache
        .get_or_set_with_expiry(&computed_key, Duration::from_secs(60), Scope::Local, || async {
            Utc::now().timestamp_millis()
        })
        .await;
    match computed {
        Ok(value) => {
            print_sub_task("populated", &value.to_string());
            passed += complete(4, "read-through 조회 (get_or_set)", started);
        }
        Err(e) => return fail(4, "read-through 조회 (get_or_set)", &e, passed),
    }

    let started = Instant::now();
    print_step_start(5, "패턴 무효화 (reset_matching)");
    match cache
        .reset_matching(&format!("probe.{}.", run_id), Scope::Local, None)
        .await
    {
        Ok(removed) => {
            print_sub_task("removed", &removed.to_string());
            passed += complete(5, "패턴 무효화 (reset_matching)", started);
        }
        Err(e) => return fail(5, "패턴 무효화 (reset_matching)", &e, passed),
    }

    let started = Instant::now();
    print_step_start(6, "무효화 확인 (cache miss)");
    match expect_miss(cache, &key).await {
        Ok(()) => passed += complete(6, "무효화 확인 (cache miss)", started),
        Err(e) => return fail(6, "무효화 확인 (cache miss)", &e, passed),
    }

    passed
}

/// 무효화된 키는 바로 미스여야 합니다.
async fn expect_miss(cache: &CacheService<RedisConnector>, key: &str) -> CacheResult<()> {
    match cache.get::<ProbePayload>(key, Scope::Local).await {
        Err(e) if e.is_miss() => Ok(()),
        Err(e) => Err(e),
        Ok(_) => Err(CacheError::Store(format!("{} is still cached after reset", key))),
    }
}

fn complete(step: u8, description: &str, started: Instant) -> usize {
    print_step_complete(step, description, started.elapsed().as_millis());
    1
}

fn fail(step: u8, description: &str, err: &CacheError, passed: usize) -> usize {
    error!("프로브 {}단계 실패: {}", step, err);
    print_step_failed(step, description, &err.to_string());
    passed
}

/// 환경별 설정 파일을 로드합니다
///
/// # Environment Variables
///
/// * `PROFILE=dev` - .env.dev 파일 로드 (기본값)
/// * `PROFILE=prod` - .env.prod 파일 로드
/// * 기타 - 기본 .env 파일 로드
fn load_env_file() {
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "dev".to_string());

    match profile.as_str() {
        "prod" => match dotenv::from_filename(".env.prod") {
            Ok(_) => eprintln!(".env.prod 파일 로드 됨"),
            Err(e) => eprintln!(".env.prod 파일 로드 실패: {}", e),
        },
        "dev" => match dotenv::from_filename(".env.dev") {
            Ok(_) => eprintln!(".env.dev 파일 로드 됨"),
            Err(e) => eprintln!(".env.dev 파일 로드 실패: {}", e),
        },
        _ => {
            dotenv().ok();
        }
    }
}

/// 로깅 시스템을 초기화합니다
///
/// * `RUST_LOG` - 로깅 레벨 설정 (기본값: "info")
///
/// ```bash
/// RUST_LOG=redis_cache_service=debug cargo run --bin cache_probe
/// ```
fn init_logging() {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
}
