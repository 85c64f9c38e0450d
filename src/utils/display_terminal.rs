//! 터미널 출력 포맷팅 유틸리티
//!
//! `cache_probe` 실행 과정을 박스 제목, 단계 표시, 요약 형태로 출력합니다.

pub fn print_boxed_title(title: &str) {
    // 고정 너비 50칸 사용 (박스 내부 콘텐츠)
    let content_width = 50;
    let border = "═".repeat(content_width);

    println!("╔{}╗", border);
    println!("║{:^49}║", title);
    println!("╚{}╝", border);
}

pub fn print_step_start(step: u8, description: &str) {
    println!("→ Step {}: {}", step, description);
}

pub fn print_step_complete(step: u8, description: &str, elapsed_ms: u128) {
    println!("✓ Step {}: {} ({} ms)", step, description, elapsed_ms);
}

pub fn print_step_failed(step: u8, description: &str, reason: &str) {
    println!("✗ Step {}: {} - {}", step, description, reason);
}

pub fn print_sub_task(name: &str, status: &str) {
    println!("   ├─ {}: {}", name, status);
}

pub fn print_probe_summary(endpoint: &str, pool_size: usize, failover: bool, passed: usize, total: usize) {
    println!();
    if passed == total {
        print_boxed_title("🎉 CACHE PROBE PASSED");
    } else {
        print_boxed_title("⚠️ CACHE PROBE FAILED");
    }
    println!("   🔌 Endpoint: {}", endpoint);
    println!("   📦 Pool size: {}", pool_size);
    println!("   🛰️ Sentinel: {}", if failover { "yes" } else { "no" });
    println!("   ✅ Steps passed: {}/{}", passed, total);
    println!();
}
