//! Benchmarks for the suggestion engine core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use manuscript_core::conflict::ResolverConfig;
use manuscript_core::{
    ConflictResolver, Document, EditType, PositionMapper, SpatialIndex, Strategy, Suggestion, SuggestionEditor,
    SuggestionId, ViewportQuery,
};

const TYPES: [EditType; 5] = [
    EditType::Developmental,
    EditType::Structural,
    EditType::Line,
    EditType::Copy,
    EditType::Proof,
];

fn manuscript(paragraphs: usize) -> String {
    (0..paragraphs)
        .map(|i| format!("Paragraph {i} carries enough prose to look like a real manuscript page, more or less."))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Suggestions every `stride` chars, each `len` long
fn spread(count: usize, stride: usize, len: usize) -> Vec<Suggestion> {
    (0..count)
        .map(|i| {
            let start = i * stride;
            Suggestion::new(SuggestionId(i as u64 + 1), TYPES[i % TYPES.len()], "x", "y", start, start + len)
                .with_doc_range(start + 1, start + len + 1)
                .with_confidence(0.5 + (i % 5) as f64 / 10.0)
        })
        .collect()
}

fn bench_map_cold(c: &mut Criterion) {
    c.bench_function("map_character_to_doc_cold", |b| {
        let doc = Document::from_text(&manuscript(500));
        let total = doc.text_len();
        let mut offset = 0;
        b.iter(|| {
            // Fresh mapper each time so the cache never answers
            let mut mapper = PositionMapper::new(16);
            offset = (offset + 7919) % total;
            black_box(mapper.map_character_to_doc(&doc, black_box(offset)));
        });
    });
}

fn bench_map_cached(c: &mut Criterion) {
    c.bench_function("map_character_to_doc_cached", |b| {
        let doc = Document::from_text(&manuscript(500));
        let mut mapper = PositionMapper::new(1000);
        let offset = doc.text_len() / 2;
        mapper.map_character_to_doc(&doc, offset);
        b.iter(|| {
            black_box(mapper.map_character_to_doc(&doc, black_box(offset)));
        });
    });
}

fn bench_map_batch(c: &mut Criterion) {
    c.bench_function("map_batch_1000", |b| {
        let doc = Document::from_text(&manuscript(500));
        let mapper = PositionMapper::new(16);
        let total = doc.text_len();
        let offsets: Vec<usize> = (0..1000).map(|i| (i * 7919) % total).collect();
        b.iter(|| {
            black_box(mapper.map_batch(&doc, black_box(&offsets)));
        });
    });
}

fn bench_viewport_query(c: &mut Criterion) {
    c.bench_function("viewport_query_10k", |b| {
        let mut index = SpatialIndex::new();
        index.batch_add(spread(10_000, 40, 25));
        let query = ViewportQuery::new().limit(100);
        let mut start = 0;
        b.iter(|| {
            // Moving viewport defeats the query cache
            start = (start + 997) % 390_000;
            black_box(index.query_viewport(start, start + 3_000, &query).len());
        });
    });
}

fn bench_overlap_query(c: &mut Criterion) {
    c.bench_function("overlap_query_10k", |b| {
        let mut index = SpatialIndex::new();
        index.batch_add(spread(10_000, 40, 60));
        let mut start = 0;
        b.iter(|| {
            start = (start + 997) % 390_000;
            black_box(index.query_overlaps(start, start + 200).len());
        });
    });
}

fn bench_detect_and_resolve(c: &mut Criterion) {
    c.bench_function("detect_and_resolve_1k", |b| {
        let resolver = ConflictResolver::new(ResolverConfig::default());
        // Long spans on a short stride produce dense overlap chains
        let suggestions = spread(1_000, 30, 50);
        b.iter(|| {
            let groups = resolver.detect_overlaps(black_box(&suggestions));
            let mut next = 10_000u64;
            let mut alloc = || {
                next += 1;
                SuggestionId(next)
            };
            black_box(resolver.resolve_conflicts(&groups, Strategy::Merge, true, &mut alloc));
        });
    });
}

fn bench_accept_undo(c: &mut Criterion) {
    c.bench_function("accept_undo_cycle", |b| {
        let text = manuscript(200);
        let mut editor = SuggestionEditor::with_text(&text, Default::default());
        editor.manager.ingest_fallback();
        let raws = (0..200)
            .map(|i| manuscript_core::RawSuggestion::new(format!("Paragraph {i} "), format!("Section {i} "), EditType::Line))
            .collect();
        editor.manager.ingest(raws, None);
        let id = editor.manager.suggestions()[100].id;

        b.iter(|| {
            if editor.manager.accept(black_box(id)).is_some() {
                editor.manager.undo();
            }
        });
    });
}

fn bench_viewport_decorations(c: &mut Criterion) {
    c.bench_function("viewport_decorations_500", |b| {
        let text = manuscript(500);
        let mut editor = SuggestionEditor::with_text(&text, Default::default());
        let raws = (0..500)
            .map(|i| manuscript_core::RawSuggestion::new(format!("Paragraph {i} "), format!("Section {i} "), EditType::Line))
            .collect();
        editor.manager.ingest(raws, None);
        let size = editor.manager.document().size();
        let mut start = 0;
        b.iter(|| {
            start = (start + 997) % size;
            black_box(editor.decorations_in(start, start + 3_000).len());
        });
    });
}

criterion_group!(
    benches,
    bench_map_cold,
    bench_map_cached,
    bench_map_batch,
    bench_viewport_query,
    bench_overlap_query,
    bench_detect_and_resolve,
    bench_accept_undo,
    bench_viewport_decorations,
);

criterion_main!(benches);
