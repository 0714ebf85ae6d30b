use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use rollcall_attendance::{
    classify, must_attend_count, project, safe_bunk_budget, SubjectAttendanceRecord,
};

/// Worst realistic semester: many classes held, far below a strict requirement.
fn deep_deficit(total: u32) -> SubjectAttendanceRecord {
    SubjectAttendanceRecord {
        attended_classes: total / 4,
        total_classes: total,
        required_percentage: 95,
    }
}

/// Large surplus against a lenient requirement: the bunk search runs to the cap.
fn deep_surplus(total: u32) -> SubjectAttendanceRecord {
    SubjectAttendanceRecord {
        attended_classes: total,
        total_classes: total,
        required_percentage: 1,
    }
}

fn bench_classify(c: &mut Criterion) {
    let record = SubjectAttendanceRecord {
        attended_classes: 28,
        total_classes: 38,
        required_percentage: 75,
    };
    c.bench_function("classify", |b| b.iter(|| classify(black_box(&record))));
}

fn bench_convergence(c: &mut Criterion) {
    let mut group = c.benchmark_group("convergence");

    for total in [40u32, 400, 4000].iter() {
        group.throughput(Throughput::Elements(u64::from(*total)));

        group.bench_with_input(BenchmarkId::new("must_attend", total), total, |b, &t| {
            let record = deep_deficit(t);
            b.iter(|| black_box(must_attend_count(black_box(&record))));
        });

        group.bench_with_input(BenchmarkId::new("safe_bunk", total), total, |b, &t| {
            let record = deep_surplus(t);
            b.iter(|| black_box(safe_bunk_budget(black_box(&record))));
        });
    }

    group.finish();
}

fn bench_dashboard(c: &mut Criterion) {
    // One dashboard render: a projection per subject.
    let subjects: Vec<SubjectAttendanceRecord> = (1..=8u32)
        .map(|i| SubjectAttendanceRecord {
            attended_classes: 20 + i,
            total_classes: 30 + i * 2,
            required_percentage: 75,
        })
        .collect();

    c.bench_function("dashboard_projection", |b| {
        b.iter(|| {
            for s in &subjects {
                black_box(project(black_box(s)));
            }
        })
    });
}

criterion_group!(benches, bench_classify, bench_convergence, bench_dashboard);
criterion_main!(benches);
