//! Performance benchmarks for the flush-time analysis path
//!
//! Targets:
//! - Pattern detection: <100µs for a typical burst (<2KB)
//! - Classification and scoring: <1µs

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use episodic_core::analysis::{classify, detect_patterns, ImportanceScorer};
use episodic_core::capture::{AggregatedEdit, AggregationTable, FlushHandler};
use episodic_core::{EditTotals, FlushTrigger, RawChange};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

const RUST_SNIPPET: &str = "use std::io;\n\npub struct Parser {\n    input: String,\n}\n\nimpl Parser {\n    pub async fn parse(&self) -> Result<(), io::Error> {\n        // TODO: handle escapes\n        self.read().await?;\n        Ok(())\n    }\n}\n";

const PYTHON_SNIPPET: &str = "import asyncio\n\nclass Loader:\n    @staticmethod\n    async def fetch(url):\n        try:\n            return await asyncio.sleep(0)\n        except Exception:\n            raise\n";

/// Benchmark 1: Pattern detection by language and input size
fn bench_pattern_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("pattern_detection");

    for (language, snippet) in [("rust", RUST_SNIPPET), ("python", PYTHON_SNIPPET), ("plaintext", RUST_SNIPPET)] {
        for repeat in [1usize, 8] {
            let text = snippet.repeat(repeat);
            group.throughput(Throughput::Bytes(text.len() as u64));
            group.bench_with_input(
                BenchmarkId::new(language, text.len()),
                &text,
                |b, text| b.iter(|| detect_patterns(black_box(text), black_box(language))),
            );
        }
    }

    group.finish();
}

/// Benchmark 2: Classification and importance scoring
fn bench_classify_and_score(c: &mut Criterion) {
    let totals = EditTotals {
        lines_added: 14,
        lines_deleted: 12,
        chars_added: 420,
        chars_deleted: 380,
    };
    let patterns: BTreeSet<String> = detect_patterns(RUST_SNIPPET, "rust");
    let scorer = ImportanceScorer::default();

    c.bench_function("classify", |b| b.iter(|| classify(black_box(&totals))));
    c.bench_function("importance_score", |b| {
        b.iter(|| scorer.score(black_box(&totals), black_box(&patterns), black_box("src/parser.rs")))
    });
}

struct NullHandler;

#[async_trait::async_trait]
impl FlushHandler for NullHandler {
    async fn handle_flush(&self, edit: AggregatedEdit, _trigger: FlushTrigger) {
        black_box(edit);
    }
}

/// Benchmark 3: Accumulate throughput on a hot resource
fn bench_accumulate(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let _guard = runtime.enter();

    let table = AggregationTable::new(Duration::from_secs(3600), 1, Arc::new(NullHandler));
    let mut offset = 0usize;

    c.bench_function("accumulate_hot_resource", |b| {
        b.iter(|| {
            offset += 2;
            table.accumulate(
                black_box("src/lib.rs"),
                "rust",
                RawChange::insert(offset, 1, "ab"),
            );
        })
    });

    runtime.block_on(async {
        table.flush_all(FlushTrigger::Shutdown).await;
        table.wait_idle().await;
    });
}

criterion_group!(
    benches,
    bench_pattern_detection,
    bench_classify_and_score,
    bench_accumulate
);
criterion_main!(benches);
