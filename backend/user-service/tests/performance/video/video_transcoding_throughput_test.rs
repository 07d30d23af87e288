/// Performance Tests for Video Transcoding Throughput (T139)
/// Validates transcoding completes within SLA bounds
/// - 99.9% of videos complete within 5 minutes
/// - Throughput: at least 1 video per minute baseline
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Video file size tiers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileSizeTier {
    Small,  // 10-50 MB
    Medium, // 50-200 MB
    Large,  // 200-500 MB
}

impl FileSizeTier {
    pub fn base_latency(&self) -> Duration {
        match self {
            FileSizeTier::Small => Duration::from_secs(25), // ~25 seconds
            FileSizeTier::Medium => Duration::from_secs(55), // ~55 seconds
            FileSizeTier::Large => Duration::from_secs(160), // ~2.7 minutes
        }
    }

    pub fn variation(&self) -> f64 {
        match self {
            FileSizeTier::Small => 0.05, // ±5%
            FileSizeTier::Medium => 0.1, // ±10%
            FileSizeTier::Large => 0.15, // ±15%
        }
    }
}

/// Video transcoding job
#[derive(Debug, Clone)]
pub struct TranscodingJob {
    pub id: Uuid,
    pub input_file_size_mb: u32,
    pub tier: FileSizeTier,
    pub codec: String,
    pub started_at: Instant,
}

/// Transcoding service result
#[derive(Debug, Clone)]
pub struct TranscodingResult {
    pub job_id: Uuid,
    pub duration: Duration,
    pub tier: FileSizeTier,
    pub success: bool,
}

/// Mock transcoding service
pub struct MockTranscodingService {
    processing_factor: f64, // Simulates system load: 1.0 = normal, 2.0 = 2x slower
}

impl MockTranscodingService {
    pub fn new(processing_factor: f64) -> Self {
        Self { processing_factor }
    }

    /// Simulate transcoding with deterministic but variable duration
    pub fn transcode(&self, job: &TranscodingJob) -> TranscodingResult {
        let base_latency = job.tier.base_latency();
        let variation = job.tier.variation();

        // Simulate some variation based on job ID (deterministic)
        let seed = job.id.as_bytes()[0] as f64 / 255.0;
        let variation_factor = 1.0 + ((seed - 0.5) * 2.0 * variation);
        let adjusted_latency = Duration::from_secs_f64(
            base_latency.as_secs_f64() * variation_factor * self.processing_factor,
        );

        TranscodingResult {
            job_id: job.id,
            duration: adjusted_latency,
            tier: job.tier,
            success: adjusted_latency < Duration::from_secs(300),
        }
    }
}

/// Transcoding throughput analyzer
pub struct ThroughputAnalyzer {
    results: Vec<TranscodingResult>,
}

impl ThroughputAnalyzer {
    pub fn new(results: Vec<TranscodingResult>) -> Self {
        Self { results }
    }

    /// Get results sorted by duration
    pub fn sorted_by_duration(&self) -> Vec<TranscodingResult> {
        let mut sorted = self.results.clone();
        sorted.sort_by_key(|r| r.duration);
        sorted
    }

    /// Calculate percentile
    pub fn percentile_duration(&self, p: f64) -> Duration {
        let sorted = self.sorted_by_duration();
        if sorted.is_empty() {
            return Duration::ZERO;
        }
        let index = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
        let idx = (index - 1).min(sorted.len() - 1);
        sorted[idx].duration
    }

    /// Success rate
    pub fn success_rate(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        let successful = self.results.iter().filter(|r| r.success).count();
        successful as f64 / self.results.len() as f64 * 100.0
    }

    /// Get results exceeding 5-minute SLA
    pub fn sla_violations(&self) -> Vec<&TranscodingResult> {
        self.results
            .iter()
            .filter(|r| r.duration > Duration::from_secs(300))
            .collect()
    }

    /// Throughput in videos per minute
    pub fn avg_throughput(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        let total_secs: u64 = self.results.iter().map(|r| r.duration.as_secs()).sum();
        let total_minutes = total_secs as f64 / 60.0;
        self.results.len() as f64 / total_minutes
    }

    /// Min/Max/Median durations
    pub fn min_duration(&self) -> Duration {
        self.sorted_by_duration()
            .first()
            .map(|r| r.duration)
            .unwrap_or_default()
    }

    pub fn max_duration(&self) -> Duration {
        self.sorted_by_duration()
            .last()
            .map(|r| r.duration)
            .unwrap_or_default()
    }

    pub fn median_duration(&self) -> Duration {
        let sorted = self.sorted_by_duration();
        if sorted.is_empty() {
            return Duration::ZERO;
        }
        sorted[sorted.len() / 2].duration
    }
}

// ============================================
// Performance Tests (T139)
// ============================================

#[test]
fn test_transcoding_throughput_baseline() {
    let service = MockTranscodingService::new(1.0); // Normal processing

    let mut results = Vec::new();
    for i in 0..100 {
        let tier = match i % 3 {
            0 => FileSizeTier::Small,
            1 => FileSizeTier::Medium,
            _ => FileSizeTier::Large,
        };

        let job = TranscodingJob {
            id: Uuid::new_v4(),
            input_file_size_mb: match tier {
                FileSizeTier::Small => 30,
                FileSizeTier::Medium => 150,
                FileSizeTier::Large => 400,
            },
            tier,
            codec: "h264".to_string(),
            started_at: Instant::now(),
        };

        let result = service.transcode(&job);
        results.push(result);
    }

    let analyzer = ThroughputAnalyzer::new(results);

    // 99.9% should complete within 5 minutes
    let p999 = analyzer.percentile_duration(99.9);
    assert!(
        p999 <= Duration::from_secs(300),
        "P99.9 should be <= 5 minutes, was {:?}",
        p999
    );

    println!(
        "Baseline throughput - P50: {:?}, P95: {:?}, P99.9: {:?}, Avg throughput: {:.2} videos/min",
        analyzer.median_duration(),
        analyzer.percentile_duration(95.0),
        p999,
        analyzer.avg_throughput()
    );
}

#[test]
fn test_transcoding_throughput_by_file_size() {
    let service = MockTranscodingService::new(1.0);

    for tier in &[
        FileSizeTier::Small,
        FileSizeTier::Medium,
        FileSizeTier::Large,
    ] {
        let mut results = Vec::new();

        for _ in 0..50 {
            let job = TranscodingJob {
                id: Uuid::new_v4(),
                input_file_size_mb: match tier {
                    FileSizeTier::Small => 30,
                    FileSizeTier::Medium => 150,
                    FileSizeTier::Large => 400,
                },
                tier: *tier,
                codec: "h264".to_string(),
                started_at: Instant::now(),
            };

            let result = service.transcode(&job);
            results.push(result);
        }

        let analyzer = ThroughputAnalyzer::new(results);
        let p999 = analyzer.percentile_duration(99.9);

        assert!(
            p999 <= Duration::from_secs(300),
            "{:?} files should meet 5-minute SLA, P99.9 was {:?}",
            tier,
            p999
        );

        println!(
            "{:?} file tier - P99.9: {:?}, Success rate: {:.2}%, Throughput: {:.2} videos/min",
            tier,
            p999,
            analyzer.success_rate(),
            analyzer.avg_throughput()
        );
    }
}

#[test]
fn test_transcoding_sla_compliance_99_9_percent() {
    let service = MockTranscodingService::new(1.0);

    let mut results = Vec::new();
    for i in 0..1000 {
        let tier = match i % 3 {
            0 => FileSizeTier::Small,
            1 => FileSizeTier::Medium,
            _ => FileSizeTier::Large,
        };

        let job = TranscodingJob {
            id: Uuid::new_v4(),
            input_file_size_mb: match tier {
                FileSizeTier::Small => 30,
                FileSizeTier::Medium => 150,
                FileSizeTier::Large => 400,
            },
            tier,
            codec: "h264".to_string(),
            started_at: Instant::now(),
        };

        let result = service.transcode(&job);
        results.push(result);
    }

    let analyzer = ThroughputAnalyzer::new(results);

    // 99.9% of videos must complete within 5 minutes
    let p999 = analyzer.percentile_duration(99.9);
    assert!(
        p999 <= Duration::from_secs(300),
        "SLA violation: P99.9 latency {:?} exceeds 5-minute SLA",
        p999
    );

    let violation_rate =
        (analyzer.sla_violations().len() as f64 / analyzer.results.len() as f64) * 100.0;
    assert!(
        violation_rate <= 0.1,
        "SLA violation rate {:.2}% exceeds 0.1% threshold",
        violation_rate
    );

    println!(
        "SLA Compliance (1000 videos) - P99.9: {:?}, Violation rate: {:.4}%, Success rate: {:.2}%",
        p999,
        violation_rate,
        analyzer.success_rate()
    );
}

#[test]
fn test_transcoding_throughput_high_load() {
    let service = MockTranscodingService::new(1.2); // 20% slower due to system load

    let mut results = Vec::new();
    for i in 0..100 {
        let tier = match i % 3 {
            0 => FileSizeTier::Small,
            1 => FileSizeTier::Medium,
            _ => FileSizeTier::Large,
        };

        let job = TranscodingJob {
            id: Uuid::new_v4(),
            input_file_size_mb: match tier {
                FileSizeTier::Small => 30,
                FileSizeTier::Medium => 150,
                FileSizeTier::Large => 400,
            },
            tier,
            codec: "h265".to_string(), // More CPU intensive
            started_at: Instant::now(),
        };

        let result = service.transcode(&job);
        results.push(result);
    }

    let analyzer = ThroughputAnalyzer::new(results);

    // Under high load, P99.9 might approach but should not exceed 5-minute SLA
    let p999 = analyzer.percentile_duration(99.9);
    assert!(
        p999 <= Duration::from_secs(300),
        "High load: P99.9 should still meet SLA, was {:?}",
        p999
    );

    println!(
        "High load throughput (1.5x processing factor) - P99.9: {:?}, Throughput: {:.2} videos/min",
        p999,
        analyzer.avg_throughput()
    );
}

#[test]
fn test_transcoding_throughput_codec_comparison() {
    let service = MockTranscodingService::new(1.0);

    let codecs = vec!["h264", "h265", "vp9"];

    for codec in codecs {
        let mut results = Vec::new();

        for _ in 0..100 {
            let job = TranscodingJob {
                id: Uuid::new_v4(),
                input_file_size_mb: 100,
                tier: FileSizeTier::Medium,
                codec: codec.to_string(),
                started_at: Instant::now(),
            };

            let result = service.transcode(&job);
            results.push(result);
        }

        let analyzer = ThroughputAnalyzer::new(results);

        println!(
            "Codec {:8} - P95: {:?}, P99: {:?}, P99.9: {:?}",
            codec,
            analyzer.percentile_duration(95.0),
            analyzer.percentile_duration(99.0),
            analyzer.percentile_duration(99.9)
        );
    }
}

#[test]
fn test_transcoding_queue_throughput_simulation() {
    let service = MockTranscodingService::new(1.0);

    // Simulate queueing 500 jobs
    let mut results = Vec::new();

    for i in 0..500 {
        let tier = match i % 3 {
            0 => FileSizeTier::Small,
            1 => FileSizeTier::Medium,
            _ => FileSizeTier::Large,
        };

        let job = TranscodingJob {
            id: Uuid::new_v4(),
            input_file_size_mb: match tier {
                FileSizeTier::Small => 30,
                FileSizeTier::Medium => 150,
                FileSizeTier::Large => 400,
            },
            tier,
            codec: "h264".to_string(),
            started_at: Instant::now(),
        };

        let result = service.transcode(&job);
        results.push(result);
    }

    let analyzer = ThroughputAnalyzer::new(results);

    let sla_violations = analyzer.sla_violations();
    let violation_count = sla_violations.len();

    println!(
        "Queue simulation (500 jobs) - SLA violations: {}/{} ({:.2}%), Avg throughput: {:.2} videos/min",
        violation_count,
        analyzer.results.len(),
        (violation_count as f64 / analyzer.results.len() as f64) * 100.0,
        analyzer.avg_throughput()
    );

    // Ensure < 0.1% violation rate
    assert!(
        violation_count as f64 / analyzer.results.len() as f64 <= 0.001,
        "SLA violation rate exceeded 0.1%"
    );
}

#[test]
fn test_transcoding_percentile_distribution() {
    let service = MockTranscodingService::new(1.0);

    let mut results = Vec::new();
    for i in 0..1000 {
        let tier = match i % 3 {
            0 => FileSizeTier::Small,
            1 => FileSizeTier::Medium,
            _ => FileSizeTier::Large,
        };

        let job = TranscodingJob {
            id: Uuid::new_v4(),
            input_file_size_mb: match tier {
                FileSizeTier::Small => 30,
                FileSizeTier::Medium => 150,
                FileSizeTier::Large => 400,
            },
            tier,
            codec: "h264".to_string(),
            started_at: Instant::now(),
        };

        let result = service.transcode(&job);
        results.push(result);
    }

    let analyzer = ThroughputAnalyzer::new(results);

    println!("Transcoding latency percentile distribution (1000 videos):");
    println!("  P10:   {:?}", analyzer.percentile_duration(10.0));
    println!("  P25:   {:?}", analyzer.percentile_duration(25.0));
    println!("  P50:   {:?}", analyzer.percentile_duration(50.0));
    println!("  P75:   {:?}", analyzer.percentile_duration(75.0));
    println!("  P90:   {:?}", analyzer.percentile_duration(90.0));
    println!("  P95:   {:?}", analyzer.percentile_duration(95.0));
    println!("  P99:   {:?}", analyzer.percentile_duration(99.0));
    println!("  P99.9: {:?}", analyzer.percentile_duration(99.9));

    // Verify monotonic increase
    assert!(analyzer.percentile_duration(50.0) >= analyzer.percentile_duration(25.0));
    assert!(analyzer.percentile_duration(95.0) >= analyzer.percentile_duration(90.0));
    assert!(analyzer.percentile_duration(99.9) >= analyzer.percentile_duration(99.0));
}

#[test]
fn test_transcoding_throughput_degradation_under_load() {
    let load_factors = vec![1.0, 1.1, 1.2, 1.3];

    for factor in load_factors {
        let service = MockTranscodingService::new(factor);

        let mut results = Vec::new();
        for _ in 0..100 {
            let job = TranscodingJob {
                id: Uuid::new_v4(),
                input_file_size_mb: 100,
                tier: FileSizeTier::Medium,
                codec: "h264".to_string(),
                started_at: Instant::now(),
            };

            let result = service.transcode(&job);
            results.push(result);
        }

        let analyzer = ThroughputAnalyzer::new(results);
        let p999 = analyzer.percentile_duration(99.9);

        println!(
            "Load factor {:.1}x - P99.9: {:?}, Throughput: {:.2} videos/min, SLA compliance: {}",
            factor,
            p999,
            analyzer.avg_throughput(),
            if p999 <= Duration::from_secs(300) {
                "✓"
            } else {
                "✗"
            }
        );

        // All should meet SLA
        assert!(
            p999 <= Duration::from_secs(300),
            "Load factor {:.1}x violates SLA",
            factor
        );
    }
}

#[test]
fn test_transcoding_min_throughput_requirement() {
    let service = MockTranscodingService::new(1.0);

    let mut results = Vec::new();
    for _ in 0..60 {
        let job = TranscodingJob {
            id: Uuid::new_v4(),
            input_file_size_mb: 150,
            tier: FileSizeTier::Medium,
            codec: "h264".to_string(),
            started_at: Instant::now(),
        };

        let result = service.transcode(&job);
        results.push(result);
    }

    let analyzer = ThroughputAnalyzer::new(results);
    let throughput = analyzer.avg_throughput();

    // Baseline requirement: at least 1 video per minute
    assert!(
        throughput >= 1.0,
        "Throughput {:.2} videos/min below minimum requirement of 1.0",
        throughput
    );

    println!(
        "Throughput requirement test - Achieved: {:.2} videos/min (requirement: 1.0+)",
        throughput
    );
}
