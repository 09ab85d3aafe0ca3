//! Benchmarks for session id generation and registry lookup.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use webconsole::testing::{factory, MapBinding};
use webconsole::SessionId;

fn id_benchmark(c: &mut Criterion) {
    c.bench_function("session_id_generate", |b| {
        b.iter(|| black_box(SessionId::generate()))
    });
}

fn lookup_benchmark(c: &mut Criterion) {
    let factory = factory();
    let ids: Vec<SessionId> = (0..1000)
        .filter_map(|n| {
            factory
                .create_from_contexts(vec![MapBinding::new(format!("frame-{n}"))])
                .ok()
                .map(|session| session.id().clone())
        })
        .collect();

    c.bench_function("registry_find", |b| {
        let mut n = 0;
        b.iter(|| {
            n = (n + 1) % ids.len();
            black_box(factory.registry().find(ids[n].as_str()).is_ok())
        })
    });

    c.bench_function("session_evaluate", |b| {
        let session = factory.registry().find(ids[0].as_str());
        b.iter(|| {
            if let Ok(session) = &session {
                black_box(session.evaluate("1 + 2 + 3", None).is_ok());
            }
        })
    });
}

criterion_group!(benches, id_benchmark, lookup_benchmark);
criterion_main!(benches);
