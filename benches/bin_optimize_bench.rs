//! # Bin Optimize Benchmark
//!
//! Measures `RenderAtomBin::optimize` on the key distributions a frame
//! typically produces:
//! 1. Few distinct materials (heavy duplication)
//! 2. Many distinct materials (mostly unique keys)
//! 3. Already sorted input (steady-state frames)

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use glam::{Affine3A, Vec3};

use aster::renderer::{FrameStatistics, RenderAtom, RenderAtomBin};
use aster::resources::Geometry;
use aster::scene::{Aabb, SpatialLeaf};
use aster::state::StateLeaf;

struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }
}

fn leaves(keys: u32) -> Vec<Arc<StateLeaf>> {
    let bounds = Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5));
    let geometry = Arc::new(Geometry::new(36, 12, bounds));
    (0..keys)
        .map(|key| {
            Arc::new(
                StateLeaf::new()
                    .with_geometry(Arc::clone(&geometry))
                    .with_sort_index(key),
            )
        })
        .collect()
}

fn atoms(count: usize, keys: u32, sorted: bool) -> Vec<RenderAtom> {
    let leaves = leaves(keys);
    let bounds = Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5));
    let mut rng = XorShift(0x2545_F491_4F6C_DD1D);
    let mut picks: Vec<usize> = (0..count).map(|_| (rng.next() % u64::from(keys)) as usize).collect();
    if sorted {
        picks.sort_unstable();
    }
    picks
        .into_iter()
        .enumerate()
        .map(|(i, key)| {
            let transform = Affine3A::from_translation(Vec3::new(i as f32, 0.0, 0.0));
            let spatial = Arc::new(SpatialLeaf::from_local(transform, &bounds));
            RenderAtom::new(spatial, Arc::clone(&leaves[key]))
        })
        .collect()
}

fn filled_bin(atoms: &[RenderAtom]) -> RenderAtomBin {
    let mut bin = RenderAtomBin::new(atoms.len());
    let mut stats = FrameStatistics::new();
    for atom in atoms {
        bin.add_render_atom(atom.clone(), &mut stats);
    }
    bin
}

fn bench_optimize(c: &mut Criterion) {
    let mut group = c.benchmark_group("bin_optimize");

    for count in [1_000, 10_000, 50_000] {
        for (label, keys, sorted) in [("few_keys", 8, false), ("many_keys", 4_096, false), ("sorted", 64, true)] {
            let input = atoms(count, keys, sorted);
            group.bench_with_input(BenchmarkId::new(label, count), &input, |b, input| {
                b.iter_batched(
                    || filled_bin(input),
                    |mut bin| {
                        bin.optimize();
                        black_box(bin)
                    },
                    BatchSize::LargeInput,
                );
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_optimize);
criterion_main!(benches);
