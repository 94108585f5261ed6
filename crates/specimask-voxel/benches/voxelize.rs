use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Affine3A, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use specimask_core::{EulerAngles, ProxyObject};
use specimask_voxel::{
    NearestProxyAssigner, ParityClassifier, ProxyIndexKind, TriMesh, VoxelGridBuilder,
    VoxelizeConfig,
};

fn sphere() -> TriMesh {
    TriMesh::icosphere(0.3, 3).transformed(&Affine3A::from_translation(Vec3::new(
        0.013, -0.021, 0.007,
    )))
}

fn bench_build_mask(c: &mut Criterion) {
    let mesh = sphere();
    let mut group = c.benchmark_group("build_mask");
    group.sample_size(10);
    for resolution in [16u32, 32, 64] {
        for parallel in [false, true] {
            let label = if parallel { "parallel" } else { "sequential" };
            let config = VoxelizeConfig::new(resolution).with_parallel(parallel);
            group.bench_with_input(BenchmarkId::new(label, resolution), &config, |b, config| {
                b.iter(|| {
                    VoxelGridBuilder::new(&mesh, config.clone())
                        .build_mask()
                        .unwrap()
                });
            });
        }
    }
    group.finish();
}

fn bench_classify_point(c: &mut Criterion) {
    let mesh = sphere();
    let classifier = ParityClassifier::default();
    c.bench_function("classify_point", |b| {
        b.iter(|| {
            classifier
                .is_inside(&mesh, black_box(Vec3::new(0.05, -0.02, 0.1)))
                .unwrap()
        });
    });
}

fn bench_nearest_proxy(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(11);
    let mut random_vec = || Vec3::new(rng.gen(), rng.gen(), rng.gen()) - 0.5;
    let proxies: Vec<ProxyObject> = (0..512)
        .map(|_| {
            let position = random_vec();
            let angles = random_vec() * 6.0;
            ProxyObject::from_euler(position, EulerAngles::new(angles.x, angles.y, angles.z))
        })
        .collect();
    let queries: Vec<Vec3> = (0..1024).map(|_| random_vec()).collect();

    let mut group = c.benchmark_group("nearest_proxy");
    for kind in [ProxyIndexKind::Linear, ProxyIndexKind::KdTree] {
        let assigner = NearestProxyAssigner::new(&proxies, kind).unwrap();
        group.bench_function(format!("{kind:?}"), |b| {
            b.iter(|| {
                queries
                    .iter()
                    .map(|&q| assigner.nearest_index(q))
                    .sum::<usize>()
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_build_mask,
    bench_classify_point,
    bench_nearest_proxy
);
criterion_main!(benches);
