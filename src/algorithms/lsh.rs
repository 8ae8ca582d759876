use std::collections::HashMap;

use rand::{rngs::StdRng, seq::index::sample, SeedableRng};

use crate::frame::{Descriptor, DESCRIPTOR_SIZE};

const DESCRIPTOR_BITS: usize = DESCRIPTOR_SIZE * u8::BITS as usize;

/// Approximate nearest neighbour index over binary descriptors.
///
/// Each table hashes a descriptor down to `key_bits` of its bits chosen at
/// random. Queries also probe every bucket one bit flip away from their own
/// key, then rank the collected candidates by their exact Hamming distance.
pub struct LshIndex<'a> {
    descriptors: &'a [Descriptor],
    bit_sets: Vec<Vec<usize>>,
    tables: Vec<HashMap<u64, Vec<usize>>>,
}

impl<'a> LshIndex<'a> {
    pub fn new(descriptors: &'a [Descriptor], tables: usize, key_bits: usize, seed: u64) -> Self {
        let key_bits = key_bits.clamp(1, 64);
        let mut rng = StdRng::seed_from_u64(seed);

        let bit_sets: Vec<Vec<usize>> = (0..tables)
            .map(|_| sample(&mut rng, DESCRIPTOR_BITS, key_bits).into_vec())
            .collect();

        let tables = bit_sets
            .iter()
            .map(|bits| {
                let mut table: HashMap<u64, Vec<usize>> = HashMap::new();
                for (index, descriptor) in descriptors.iter().enumerate() {
                    table.entry(hash(descriptor, bits)).or_default().push(index);
                }
                table
            })
            .collect();

        Self {
            descriptors,
            bit_sets,
            tables,
        }
    }

    /// Up to `k` nearest candidates as `(index, distance)`, closest first.
    pub fn knn(&self, query: &Descriptor, k: usize) -> Vec<(usize, u32)> {
        let mut candidates: Vec<usize> = Vec::new();
        for (bits, table) in self.bit_sets.iter().zip(&self.tables) {
            let key = hash(query, bits);
            let probes = std::iter::once(key).chain((0..bits.len()).map(|b| key ^ (1 << b)));
            for probe in probes {
                if let Some(bucket) = table.get(&probe) {
                    candidates.extend_from_slice(bucket);
                }
            }
        }
        candidates.sort_unstable();
        candidates.dedup();

        let mut neighbors: Vec<(usize, u32)> = candidates
            .into_iter()
            .map(|index| (index, query.distance(&self.descriptors[index]) as u32))
            .collect();
        neighbors.sort_by_key(|&(index, distance)| (distance, index));
        neighbors.truncate(k);
        neighbors
    }
}

fn hash(descriptor: &Descriptor, bits: &[usize]) -> u64 {
    let bytes = descriptor.bytes();
    bits.iter().enumerate().fold(0u64, |key, (position, &bit)| {
        let set = bytes[bit / u8::BITS as usize] >> (bit % u8::BITS as usize) & 1;
        key | (set as u64) << position
    })
}
