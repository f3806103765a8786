use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use equitrain::{
    models::{FeatureSet, SessionRecord, SubjectId, TrainingRecord},
    overload::OverloadClassifier,
    summary::{group_by_subject_and_type, SummaryAggregator},
    trends::TrendCalculator,
    RecordExtractor,
};
use serde_json::json;

/// Benchmarks for the analysis pipeline with growing per-horse histories

const TYPES: [&str; 4] = ["Jumping", "Dressage", "Lunging", "Hacking"];
const INTENSITIES: [&str; 3] = ["Low", "Medium", "High"];

fn create_records(count: usize) -> Vec<TrainingRecord> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let subject_id = SubjectId::parse("bench-horse").unwrap();

    (0..count)
        .map(|i| {
            let load = (i % 17) as f64;
            TrainingRecord {
                subject_id: subject_id.clone(),
                subject_name: "Bench".to_string(),
                training_type: TYPES[i % TYPES.len()].to_string(),
                created_at: start + Duration::hours(i as i64 * 13),
                heart_rate_before: Some(36.0 + load),
                heart_rate_during: Some(110.0 + load * 3.0),
                heart_rate_after: Some(70.0 + load * 5.0),
                temperature_celsius: Some(12.0 + (i % 23) as f64),
                duration: Some(20.0 + (i % 50) as f64),
                intensity: Some(INTENSITIES[i % INTENSITIES.len()].to_string()),
                rating_score: Some(1.0 + (i % 5) as f64),
            }
        })
        .collect()
}

fn create_sessions(count: usize) -> Vec<SessionRecord> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();

    (0..count)
        .map(|i| SessionRecord {
            id: format!("s{}", i),
            subject_id: Some(format!("horse-{}", i % 8)),
            subject_name: Some(format!("Horse {}", i % 8)),
            created_at: Some(start + Duration::hours(i as i64 * 5)),
            trainings: vec![
                json!({
                    "trainingStatus": "Completed",
                    "trainingType": TYPES[i % TYPES.len()],
                    "heartRateBefore": 40,
                    "heartRateDuring": 120 + (i % 30),
                    "heartRateAfter": 80,
                    "temperatureCelsius": 18.5,
                    "duration": 45,
                    "intensity": "Medium",
                    "ratingScore": 3
                }),
                json!({ "trainingStatus": "Planned", "trainingType": "Jumping" }),
            ],
        })
        .collect()
}

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("Record Extraction");

    for &size in &[10, 100, 1000] {
        let sessions = create_sessions(size);
        let extractor = RecordExtractor::new(FeatureSet::Overload);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("extract", size), &sessions, |b, sessions| {
            b.iter(|| extractor.extract(black_box(sessions)));
        });
    }

    group.finish();
}

fn bench_summary_and_trends(c: &mut Criterion) {
    let mut group = c.benchmark_group("Summary and Trends");
    let now = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
    let trends = TrendCalculator::new(now);

    for &size in &[100, 1000, 10000] {
        let records = create_records(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("summary_trend", size), &records, |b, records| {
            b.iter(|| {
                for (_, by_type) in group_by_subject_and_type(black_box(records)) {
                    black_box(SummaryAggregator::compute_summary(&by_type));
                    black_box(trends.compute_trends(&by_type));
                }
            });
        });
    }

    group.finish();
}

fn bench_overload_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("Overload Classification");
    group.sample_size(20);
    let classifier = OverloadClassifier::new();

    for &size in &[20, 100, 500] {
        let records = create_records(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("classify", size), &records, |b, records| {
            b.iter(|| classifier.classify(black_box(records)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_extraction,
    bench_summary_and_trends,
    bench_overload_classification
);
criterion_main!(benches);
