use core_editor::buffer::compute_offsets;
use core_editor::{Buffer, WrapContext};
use criterion::{Criterion, criterion_group, criterion_main};

fn bench_offsets(c: &mut Criterion) {
    let ctx = WrapContext {
        row_width: 72,
        tab_width: 4,
        soft_wrap: true,
    };
    let long = "lorem ipsum dolor sit amet consectetur adipiscing elit ".repeat(40);
    c.bench_function("compute_offsets_long_line", |b| {
        b.iter(|| compute_offsets(&long, &ctx))
    });
}

fn bench_relayout(c: &mut Criterion) {
    let ctx = WrapContext {
        row_width: 72,
        tab_width: 4,
        soft_wrap: true,
    };
    let lines: Vec<String> = (0..2_000)
        .map(|i| format!("line {i} with a moderate amount of text on it"))
        .collect();
    c.bench_function("relayout_two_thousand_lines", |b| {
        let mut buffer = Buffer::from_lines(None, lines.clone(), &ctx);
        b.iter(|| buffer.relayout(&ctx))
    });
}

criterion_group!(benches, bench_offsets, bench_relayout);
criterion_main!(benches);
