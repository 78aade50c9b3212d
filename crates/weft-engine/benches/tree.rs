use criterion::{Criterion, black_box, criterion_group, criterion_main};
use weft_engine::{Node, Plain, Selection, State};

fn generate_text(paragraphs: usize) -> String {
    (0..paragraphs)
        .map(|i| format!("Paragraph {i} with a few words of filler text in it"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn bench_navigation(c: &mut Criterion) {
    let mut group = c.benchmark_group("navigation");
    group.sample_size(20);

    let doc = Plain::deserialize(&generate_text(200));
    let last = doc.last_text().unwrap().key().clone();

    group.bench_function("path_of_last_text", |b| {
        b.iter(|| black_box(doc.path(black_box(&last)).unwrap()));
    });
    group.bench_function("text_at_offset", |b| {
        let offset = doc.len() / 2;
        b.iter(|| black_box(doc.text_at_offset(black_box(offset))));
    });
    group.bench_function("texts", |b| {
        b.iter(|| black_box(doc.texts().len()));
    });

    group.finish();
}

fn bench_memoized_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("memoized_queries");
    group.sample_size(20);

    let state = State::new(Plain::deserialize(&generate_text(200)));
    group.bench_function("texts_cached", |b| {
        b.iter(|| black_box(state.texts().len()));
    });

    group.finish();
}

fn bench_transforms(c: &mut Criterion) {
    let mut group = c.benchmark_group("transforms");
    group.sample_size(20);

    let state = State::new(Plain::deserialize(&generate_text(100)));
    let middle: Node = state.document().nodes()[50].clone();
    let key = middle.first_text().unwrap().key().clone();

    group.bench_function("type_and_undo", |b| {
        b.iter(|| {
            let mut tx = state.transform();
            tx.select(Selection::collapsed(key.clone(), 5)).unwrap();
            tx.insert_text("typed").unwrap();
            tx.save(false);
            tx.undo().unwrap();
            black_box(tx.apply());
        });
    });
    group.bench_function("split_and_join", |b| {
        b.iter(|| {
            let mut tx = state.transform();
            tx.select(Selection::collapsed(key.clone(), 10)).unwrap();
            tx.split_block(1).unwrap();
            tx.delete_backward(weft_engine::Boundary::Char).unwrap();
            black_box(tx.apply());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_navigation,
    bench_memoized_queries,
    bench_transforms
);
criterion_main!(benches);
