//! Collection cycle benchmarks

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::mem;
use std::ptr;
use vesper_core::{Collector, Marker, VisitFn};

#[repr(C)]
struct Node {
    child: *mut u8,
}

fn visit_node(marker: &mut Marker<'_>, payload: *mut u8, _ctx: *mut u8) {
    let node = unsafe { &*(payload as *const Node) };
    marker.visit(node.child);
}

fn bench_leaf_churn(c: &mut Criterion) {
    let mut gc = Collector::new();
    let leaf = gc
        .heap_mut()
        .types_mut()
        .register("Leaf", None, ptr::null_mut(), None, ptr::null_mut())
        .unwrap();

    c.bench_function("collect_100_dead_leaves", |b| {
        b.iter(|| {
            for _ in 0..100 {
                black_box(gc.allocate(32, leaf).unwrap());
            }
            gc.collect()
        });
    });
}

fn bench_chain_marking(c: &mut Criterion) {
    let mut gc = Collector::new();
    let node = gc
        .heap_mut()
        .types_mut()
        .register(
            "Node",
            Some(visit_node as VisitFn),
            ptr::null_mut(),
            None,
            ptr::null_mut(),
        )
        .unwrap();

    c.bench_function("mark_chain_of_100", |b| {
        b.iter(|| {
            let mut head = ptr::null_mut();
            for _ in 0..100 {
                let payload = gc.allocate(mem::size_of::<Node>(), node).unwrap();
                unsafe {
                    (payload.as_ptr() as *mut Node).write(Node { child: head });
                }
                head = payload.as_ptr();
            }
            gc.visit(head);
            gc.collect()
        });
    });
}

criterion_group!(benches, bench_leaf_churn, bench_chain_marking);
criterion_main!(benches);
