use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use meshedit::{PolyMesh, SubdivScheme};

// Triangulated sphere with 1280 faces.
fn sphere() -> PolyMesh {
    let mut mesh = PolyMesh::icosahedron(1.0).unwrap();
    mesh.loop_subdivide_n(3).unwrap();
    mesh
}

// Primitive Creation Benchmarks
fn bench_primitive_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("primitive_creation");

    group.bench_function("tetrahedron_batch", |b| {
        b.iter(|| {
            for i in 0..100 {
                let mesh = PolyMesh::tetrahedron(black_box(1.0 + i as f32 * 0.01)).unwrap();
                black_box(mesh);
            }
        });
    });

    group.bench_function("icosahedron_batch", |b| {
        b.iter(|| {
            for i in 0..100 {
                let mesh = PolyMesh::icosahedron(black_box(1.0 + i as f32 * 0.01)).unwrap();
                black_box(mesh);
            }
        });
    });

    group.bench_function("quad_grid_64", |b| {
        b.iter(|| {
            let mesh = PolyMesh::quad_grid(1.0, 1.0, black_box(64), black_box(64)).unwrap();
            black_box(mesh);
        });
    });

    group.finish();
}

// Local Operator Benchmarks
fn bench_local_operators(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_operators");

    group.bench_function("flip_all_edges", |b| {
        b.iter_batched(
            sphere,
            |mut mesh| {
                let edges: Vec<_> = mesh.edges().collect();
                for e in edges {
                    black_box(mesh.flip_edge(e));
                }
                mesh
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("split_all_edges", |b| {
        b.iter_batched(
            sphere,
            |mut mesh| {
                let edges: Vec<_> = mesh.edges().collect();
                for e in edges {
                    black_box(mesh.split_edge(e));
                }
                mesh
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("bevel_all_faces", |b| {
        b.iter_batched(
            || PolyMesh::quad_grid(1.0, 1.0, 32, 32).unwrap(),
            |mut mesh| {
                let faces: Vec<_> = mesh.faces().collect();
                for f in faces {
                    black_box(mesh.bevel_face(f));
                }
                mesh
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

// Subdivision Benchmarks
fn bench_subdivision(c: &mut Criterion) {
    let mut group = c.benchmark_group("subdivision");

    group.bench_function("catmull_clark_cube_3_iterations", |b| {
        b.iter_batched(
            || PolyMesh::unit_box().unwrap(),
            |mut mesh| {
                mesh.subdivide(SubdivScheme::CatmullClark, black_box(3))
                    .unwrap();
                mesh
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("linear_sphere", |b| {
        b.iter_batched(
            sphere,
            |mut mesh| {
                mesh.subdivide(SubdivScheme::Linear, black_box(1)).unwrap();
                mesh
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("loop_subdivision_sphere", |b| {
        b.iter_batched(
            sphere,
            |mut mesh| {
                mesh.loop_subdivide().unwrap();
                mesh
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

// Whole mesh algorithm benchmarks
fn bench_algorithms(c: &mut Criterion) {
    let mut group = c.benchmark_group("algorithms");

    group.bench_function("triangulate_grid", |b| {
        b.iter_batched(
            || PolyMesh::quad_grid(1.0, 1.0, 64, 64).unwrap(),
            |mut mesh| {
                mesh.triangulate().unwrap();
                mesh
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("isotropic_remesh_sphere", |b| {
        b.iter_batched(
            sphere,
            |mut mesh| {
                black_box(mesh.isotropic_remesh());
                mesh
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("simplify_sphere", |b| {
        b.iter_batched(
            sphere,
            |mut mesh| {
                black_box(mesh.simplify());
                mesh
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("garbage_collection", |b| {
        b.iter_batched(
            || {
                let mut mesh = sphere();
                mesh.simplify();
                mesh
            },
            |mut mesh| {
                mesh.garbage_collection().unwrap();
                mesh
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_primitive_creation,
    bench_local_operators,
    bench_subdivision,
    bench_algorithms
);
criterion_main!(benches);
