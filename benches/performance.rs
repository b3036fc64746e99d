use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use memctl_core::config::MemControlConfig;
use memctl_core::controller::MemoryController;
use memctl_core::id::UserId;
use memctl_exec::{BackpressurePolicy, DataPoint, FlushSink, MemTableWriter, WriteExecutor};
use memctl_mem::{MemController, SharedController};

/// Discards flushed data so the bench measures accounting, not storage.
struct NullSink;

impl FlushSink for NullSink {
    fn write_series(&mut self, _path: &str, _points: &[DataPoint]) -> memctl_exec::Result<()> {
        Ok(())
    }
}

fn controller(enabled: bool, per_user: bool) -> MemController {
    let mut cfg = MemControlConfig::with_byte_thresholds(1 << 40, 1 << 38, 1 << 39);
    cfg.enabled = enabled;
    cfg.per_user_accounting = per_user;
    MemController::from_config(&cfg).unwrap()
}

fn bench_acquire_release(c: &mut Criterion) {
    let cases = [
        ("acquire_release/tracking_per_user", controller(true, true)),
        ("acquire_release/tracking_total_only", controller(true, false)),
        ("acquire_release/disabled", controller(false, false)),
    ];
    for (name, ctl) in cases {
        let user = UserId::new(1);
        c.bench_function(name, |b| {
            b.iter(|| {
                let level = ctl.acquire_usage(user, 4096);
                ctl.release_usage(user, 4096);
                level
            })
        });
    }
}

fn bench_writer_insert(c: &mut Criterion) {
    let cfg = MemControlConfig::with_byte_thresholds(1 << 40, 1 << 38, 1 << 39);
    let shared = Arc::new(SharedController::from_config(&cfg).unwrap());
    let mut w = MemTableWriter::register(shared, BackpressurePolicy::default(), NullSink);
    let mut t = 0i64;
    c.bench_function("memtable_insert", |b| {
        b.iter(|| {
            t += 1;
            w.insert("root.sg.d1.s1", t, "3.14159").unwrap();
            if t % 1024 == 0 {
                w.flush().unwrap();
            }
        })
    });
}

criterion_group!(hot_path, bench_acquire_release, bench_writer_insert);
criterion_main!(hot_path);
