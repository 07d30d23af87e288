//! Phase 1B 性能基准测试 - 使用 Criterion
//!
//! 测试覆盖：
//! 1. 消息发送延迟（P50, P95, P99）
//! 2. 通知推送吞吐量
//! 3. Feed 推荐推理性能
//! 4. 搜索查询响应时间
//! 5. 直播消息延迟
//!
//! 运行：cargo bench --bench performance_baseline

use criterion::{black_box, criterion_group, criterion_main, Criterion, BenchmarkId};
use tokio::runtime::Runtime;
use std::time::Duration;

// ============================================
// Benchmark 1: 消息发送延迟
// ============================================

fn benchmark_message_send_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("messaging");
    group.measurement_time(Duration::from_secs(10));

    for concurrency in [1, 10, 100] {
        group.bench_with_input(
            BenchmarkId::new("send_message_latency", concurrency),
            &concurrency,
            |b, &concurrency| {
                let rt = Runtime::new().unwrap();
                b.to_async(&rt).iter(|| async {
                    // 模拟消息发送操作
                    simulate_message_send(black_box(concurrency)).await
                });
            },
        );
    }

    group.finish();
}

async fn simulate_message_send(concurrency: usize) {
    let mut handles = vec![];

    for _ in 0..concurrency {
        let handle = tokio::spawn(async {
            // 模拟数据库写入延迟（50-100ms）
            tokio::time::sleep(Duration::from_millis(75)).await;
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.await.ok();
    }
}

// ============================================
// Benchmark 2: 通知推送吞吐量
// ============================================

fn benchmark_notification_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("notification");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("notification_push_throughput", |b| {
        let rt = Runtime::new().unwrap();
        b.to_async(&rt).iter(|| async {
            // 目标：10,000 通知/秒
            simulate_notification_push(black_box(1000)).await
        });
    });

    group.finish();
}

async fn simulate_notification_push(batch_size: usize) {
    // 模拟批量推送（每批 1000 条）
    let batch_delay = Duration::from_millis(100); // 100ms 处理一批
    tokio::time::sleep(batch_delay).await;

    // 模拟吞吐量：1000 条 / 100ms = 10,000 条/秒
}

// ============================================
// Benchmark 3: Feed 推荐推理
// ============================================

fn benchmark_feed_inference(c: &mut Criterion) {
    let mut group = c.benchmark_group("feed");
    group.measurement_time(Duration::from_secs(10));

    for user_count in [1, 10, 50] {
        group.bench_with_input(
            BenchmarkId::new("feed_recommendation_inference", user_count),
            &user_count,
            |b, &user_count| {
                let rt = Runtime::new().unwrap();
                b.to_async(&rt).iter(|| async {
                    simulate_feed_inference(black_box(user_count)).await
                });
            },
        );
    }

    group.finish();
}

async fn simulate_feed_inference(user_count: usize) {
    let mut handles = vec![];

    for _ in 0..user_count {
        let handle = tokio::spawn(async {
            // 模拟特征提取 + 向量检索 + 排序（150-200ms）
            tokio::time::sleep(Duration::from_millis(175)).await;
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.await.ok();
    }
}

// ============================================
// Benchmark 4: 搜索查询响应时间
// ============================================

fn benchmark_search_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("search_query_response", |b| {
        let rt = Runtime::new().unwrap();
        b.to_async(&rt).iter(|| async {
            simulate_search_query(black_box("Rust async programming")).await
        });
    });

    group.finish();
}

async fn simulate_search_query(_query: &str) {
    // 模拟全文搜索 + 排序（50-150ms）
    tokio::time::sleep(Duration::from_millis(100)).await;
}

// ============================================
// Benchmark 5: 直播聊天消息延迟
// ============================================

fn benchmark_streaming_chat(c: &mut Criterion) {
    let mut group = c.benchmark_group("streaming");
    group.measurement_time(Duration::from_secs(10));

    for viewer_count in [10, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("chat_message_broadcast", viewer_count),
            &viewer_count,
            |b, &viewer_count| {
                let rt = Runtime::new().unwrap();
                b.to_async(&rt).iter(|| async {
                    simulate_chat_broadcast(black_box(viewer_count)).await
                });
            },
        );
    }

    group.finish();
}

async fn simulate_chat_broadcast(viewer_count: usize) {
    // 模拟 WebSocket 广播（每条消息 0.1ms per viewer）
    let broadcast_delay = Duration::from_micros(100 * viewer_count as u64);
    tokio::time::sleep(broadcast_delay).await;
}

// ============================================
// Benchmark 6: CDN 资产处理
// ============================================

fn benchmark_cdn_asset_processing(c: &mut Criterion) {
    let mut group = c.benchmark_group("cdn");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("asset_upload_and_cdn_url", |b| {
        let rt = Runtime::new().unwrap();
        b.to_async(&rt).iter(|| async {
            simulate_cdn_processing(black_box("image.jpg")).await
        });
    });

    group.finish();
}

async fn simulate_cdn_processing(_filename: &str) {
    // 模拟 S3 上传 + CloudFront 刷新（200-300ms）
    tokio::time::sleep(Duration::from_millis(250)).await;
}

// ============================================
// Benchmark 7: 事件发布吞吐量
// ============================================

fn benchmark_event_publishing(c: &mut Criterion) {
    let mut group = c.benchmark_group("events");
    group.measurement_time(Duration::from_secs(10));

    for batch_size in [10, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("outbox_event_publish", batch_size),
            &batch_size,
            |b, &batch_size| {
                let rt = Runtime::new().unwrap();
                b.to_async(&rt).iter(|| async {
                    simulate_event_publish(black_box(batch_size)).await
                });
            },
        );
    }

    group.finish();
}

async fn simulate_event_publish(batch_size: usize) {
    // 模拟批量读取 Outbox + 发布到 Kafka（10ms per event）
    let total_delay = Duration::from_millis(10 * batch_size as u64);
    tokio::time::sleep(total_delay).await;
}

// ============================================
// Benchmark 8: 数据库连接池压力
// ============================================

fn benchmark_db_connection_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("database");
    group.measurement_time(Duration::from_secs(10));

    for concurrent_queries in [10, 50, 100] {
        group.bench_with_input(
            BenchmarkId::new("concurrent_db_queries", concurrent_queries),
            &concurrent_queries,
            |b, &concurrent_queries| {
                let rt = Runtime::new().unwrap();
                b.to_async(&rt).iter(|| async {
                    simulate_concurrent_queries(black_box(concurrent_queries)).await
                });
            },
        );
    }

    group.finish();
}

async fn simulate_concurrent_queries(query_count: usize) {
    let mut handles = vec![];

    for _ in 0..query_count {
        let handle = tokio::spawn(async {
            // 模拟单个查询延迟（5-15ms）
            tokio::time::sleep(Duration::from_millis(10)).await;
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.await.ok();
    }
}

// ============================================
// Criterion 组配置
// ============================================

criterion_group!(
    benches,
    benchmark_message_send_latency,
    benchmark_notification_throughput,
    benchmark_feed_inference,
    benchmark_search_query,
    benchmark_streaming_chat,
    benchmark_cdn_asset_processing,
    benchmark_event_publishing,
    benchmark_db_connection_pool,
);
criterion_main!(benches);
