//! A user-defined structure gains every memory operation by listing its
//! leaves.

use lanewise::{
    compress, gather, gather_masked, index_sequence, prefetch, scatter, Composite, DynamicArray,
    DynamicPacket, Layout, Mask, Packet,
};

#[derive(Clone, Copy, Debug, PartialEq)]
struct Particle {
    position: [f32; 3],
    mass: f32,
}

impl Layout for Particle {
    type Leaf = f32;
    const LEAVES: usize = 4;

    fn zeroed() -> Self {
        Particle {
            position: [0.0; 3],
            mass: 0.0,
        }
    }

    fn leaf(&self, k: usize) -> f32 {
        match k {
            0..=2 => self.position[k],
            3 => self.mass,
            _ => panic!("particle has no leaf {k}"),
        }
    }

    fn leaf_mut(&mut self, k: usize) -> &mut f32 {
        match k {
            0..=2 => &mut self.position[k],
            3 => &mut self.mass,
            _ => panic!("particle has no leaf {k}"),
        }
    }
}

/// Structure-of-arrays form of `Particle`.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Particles<const N: usize> {
    position: [Packet<f32, N>; 3],
    mass: Packet<f32, N>,
}

impl<const N: usize> Composite<N> for Particles<N> {
    type Leaf = f32;
    type Element = Particle;
    const LEAVES: usize = 4;

    fn zero() -> Self {
        Particles {
            position: [Packet::zero(); 3],
            mass: Packet::zero(),
        }
    }

    fn leaf(&self, k: usize) -> &Packet<f32, N> {
        match k {
            0..=2 => &self.position[k],
            3 => &self.mass,
            _ => panic!("particles have no leaf {k}"),
        }
    }

    fn leaf_mut(&mut self, k: usize) -> &mut Packet<f32, N> {
        match k {
            0..=2 => &mut self.position[k],
            3 => &mut self.mass,
            _ => panic!("particles have no leaf {k}"),
        }
    }
}

fn particles(count: usize) -> Vec<Particle> {
    (0..count)
        .map(|i| {
            let x = i as f32;
            Particle {
                position: [x, x + 0.5, -x],
                mass: 1.0 + x,
            }
        })
        .collect()
}

#[test]
fn gather_builds_structure_of_arrays() {
    let base = particles(16);
    let idx = Packet::from_array([15u32, 2, 9, 0]);
    let soa: Particles<4> = gather(&base[..], idx);

    assert_eq!(soa.position[0].to_array(), [15.0, 2.0, 9.0, 0.0]);
    assert_eq!(soa.mass.to_array(), [16.0, 3.0, 10.0, 1.0]);
    assert_eq!(soa.slice(2), base[9]);
}

#[test]
fn masked_gather_and_scatter() {
    let mut base = particles(8);
    let idx: Packet<u32, 8> = index_sequence();
    let heavy = Mask::from_fn(|lane| lane >= 5);

    let mut soa: Particles<8> = gather_masked(&base[..], idx, heavy);
    assert_eq!(soa.slice(0), Particle::zeroed());
    assert_eq!(soa.slice(6), base[6]);

    soa.mass = soa.mass * Packet::splat(2.0);
    scatter(&mut base[..], &soa, idx);
    assert_eq!(base[0], Particle::zeroed());
    assert_eq!(base[7].mass, 16.0);

    prefetch::<Particles<8>, u32, 8>(&base[..], idx);
}

#[test]
fn compress_whole_structures() {
    let base = particles(4);
    let soa = Particles::<4>::from_elements(|lane| base[lane]);
    let mut out = [Particle::zeroed(); 4];
    let rest = compress(&mut out[..], &soa, Mask::from_array([false, true, false, true]));
    assert_eq!(rest.len(), 2);
    assert_eq!(out[..2], [base[1], base[3]]);
}

#[test]
fn dynamic_container_of_custom_structures() {
    let base = particles(10);
    let index = DynamicPacket::<u32, 4>::index_sequence(10);
    let soa = DynamicArray::<Particles<4>, 4>::gather(&base[..], &index);

    assert_eq!(soa.chunk_count(), 3);
    assert_eq!(soa.to_elements(), base);
    let total_mass: f32 = soa
        .iter_chunks()
        .map(|(chunk, valid)| Packet::select(valid, chunk.mass, Packet::zero()).sum())
        .sum();
    assert_eq!(total_mass, 55.0);
    assert_eq!(Particles::<4>::fill(1.0).slice(3), Particle::filled(1.0));
}
