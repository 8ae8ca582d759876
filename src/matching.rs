use std::{fmt, str::FromStr, time::Instant};

use log::*;
use space::{Knn, LinearKnn, Metric};

use crate::{
    algorithms::lsh::LshIndex,
    config::MatcherConfig,
    frame::{Descriptor, FeatureMatch},
    Error,
};

/// How candidate matches are searched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherType {
    /// Exhaustive Hamming search over every reference descriptor
    BruteForce,
    /// Approximate search through a locality sensitive hashing index
    Flann,
}

/// How the final match is picked among the candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorType {
    /// The single best candidate
    NearestNeighbor,
    /// The best of two candidates, if it passes Lowe's ratio test
    KNearestNeighbors,
}

impl fmt::Display for MatcherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BruteForce => "MAT_BF",
            Self::Flann => "MAT_FLANN",
        })
    }
}

impl FromStr for MatcherType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MAT_BF" => Ok(Self::BruteForce),
            "MAT_FLANN" => Ok(Self::Flann),
            _ => Err(Error::UnknownMatcher(s.to_owned())),
        }
    }
}

impl fmt::Display for SelectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NearestNeighbor => "SEL_NN",
            Self::KNearestNeighbors => "SEL_KNN",
        })
    }
}

impl FromStr for SelectorType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SEL_NN" => Ok(Self::NearestNeighbor),
            "SEL_KNN" => Ok(Self::KNearestNeighbors),
            _ => Err(Error::UnknownSelector(s.to_owned())),
        }
    }
}

/// Find the best match in `reference` for each descriptor of `source`.
///
/// `source` normally holds the previous frame's descriptors and `reference`
/// the current frame's, so [`FeatureMatch::source`] indexes the previous frame.
pub fn match_descriptors(
    source: &[Descriptor],
    reference: &[Descriptor],
    matcher: MatcherType,
    selector: SelectorType,
    config: &MatcherConfig,
) -> Vec<FeatureMatch> {
    if source.is_empty() || reference.is_empty() {
        return Vec::new();
    }
    let start = Instant::now();

    let search = SearchIndex::new(reference, matcher, config);
    let mut matches: Vec<FeatureMatch> = match selector {
        SelectorType::NearestNeighbor => source
            .iter()
            .enumerate()
            .filter_map(|(i, descriptor)| {
                let (index, distance) = *search.knn(descriptor, 1).first()?;
                Some(FeatureMatch {
                    source: i,
                    reference: index,
                    distance,
                })
            })
            .collect(),
        SelectorType::KNearestNeighbors => source
            .iter()
            .enumerate()
            .filter_map(|(i, descriptor)| {
                // find k = 2 nearest neighbors and then perform Lowe's test to filter out
                // answers potentially chosen by noise
                let nearest = search.knn(descriptor, 2);
                match nearest[..] {
                    [(index, best), (_, second)]
                        if (best as f32) < config.ratio * second as f32 =>
                    {
                        Some(FeatureMatch {
                            source: i,
                            reference: index,
                            distance: best,
                        })
                    }
                    _ => None,
                }
            })
            .collect(),
    };

    if config.cross_check {
        let reverse = SearchIndex::new(source, matcher, config);
        matches.retain(|m| {
            reverse
                .knn(&reference[m.reference], 1)
                .first()
                .map_or(false, |&(index, _)| index == m.source)
        });
    }

    debug!(
        "{} {} matched {} of {} descriptors in {:.3} ms",
        matcher,
        selector,
        matches.len(),
        source.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    matches
}

enum SearchIndex<'a> {
    Linear(Vec<(&'a Descriptor, ())>),
    Lsh(LshIndex<'a>),
}

impl<'a> SearchIndex<'a> {
    fn new(descriptors: &'a [Descriptor], matcher: MatcherType, config: &MatcherConfig) -> Self {
        match matcher {
            MatcherType::BruteForce => Self::Linear(descriptors.iter().map(|d| (d, ())).collect()),
            MatcherType::Flann => Self::Lsh(LshIndex::new(
                descriptors,
                config.lsh_tables,
                config.lsh_key_bits,
                config.lsh_seed,
            )),
        }
    }

    /// Up to `k` neighbours of `query` as `(index, distance)`, closest first.
    fn knn(&self, query: &Descriptor, k: usize) -> Vec<(usize, u32)> {
        match self {
            Self::Linear(data) => {
                let search = LinearKnn {
                    metric: DescriptorHamming,
                    points: data.iter(),
                };
                search
                    .knn(&query, k)
                    .into_iter()
                    .map(|(neighbor, _, _)| (neighbor.index, neighbor.distance))
                    .collect()
            }
            Self::Lsh(index) => index.knn(query, k),
        }
    }
}

// Implementations for `space`

#[derive(Default)]
struct DescriptorHamming;

impl<'d> Metric<&'d Descriptor> for DescriptorHamming {
    type Unit = u32;
    fn distance(&self, a: &&'d Descriptor, b: &&'d Descriptor) -> Self::Unit {
        a.distance(b) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::DESCRIPTOR_SIZE;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_descriptors(count: usize, seed: u64) -> Vec<Descriptor> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                let mut bytes = [0u8; DESCRIPTOR_SIZE];
                rng.fill(&mut bytes[..]);
                Descriptor::new(bytes)
            })
            .collect()
    }

    /// Copy of `descriptor` with the first `bits` bits inverted.
    fn flip_bits(descriptor: &Descriptor, bits: usize) -> Descriptor {
        let mut bytes = *descriptor.bytes();
        for bit in 0..bits {
            bytes[bit / 8] ^= 1 << (bit % 8);
        }
        Descriptor::new(bytes)
    }

    #[test]
    fn parses_names() {
        assert_eq!("MAT_BF".parse::<MatcherType>().unwrap(), MatcherType::BruteForce);
        assert_eq!("mat_flann".parse::<MatcherType>().unwrap(), MatcherType::Flann);
        assert_eq!("SEL_NN".parse::<SelectorType>().unwrap(), SelectorType::NearestNeighbor);
        assert_eq!(
            SelectorType::KNearestNeighbors.to_string().parse::<SelectorType>().unwrap(),
            SelectorType::KNearestNeighbors
        );
        assert!(matches!("MAT_KD".parse::<MatcherType>(), Err(Error::UnknownMatcher(_))));
        assert!(matches!("SEL_3NN".parse::<SelectorType>(), Err(Error::UnknownSelector(_))));
    }

    #[test]
    fn identical_sets_match_onto_themselves() {
        let descriptors = random_descriptors(40, 3);
        let matches = match_descriptors(
            &descriptors,
            &descriptors,
            MatcherType::BruteForce,
            SelectorType::NearestNeighbor,
            &MatcherConfig::default(),
        );
        assert_eq!(matches.len(), descriptors.len());
        for (i, m) in matches.iter().enumerate() {
            assert_eq!((m.source, m.reference, m.distance), (i, i, 0));
        }
    }

    #[test]
    fn ratio_test_accepts_distinct_best_match() {
        let base = random_descriptors(1, 9)[0].clone();
        let reference = vec![flip_bits(&base, 200), flip_bits(&base, 0)];
        let matches = match_descriptors(
            &[base],
            &reference,
            MatcherType::BruteForce,
            SelectorType::KNearestNeighbors,
            &MatcherConfig::default(),
        );
        assert_eq!(
            matches,
            vec![FeatureMatch {
                source: 0,
                reference: 1,
                distance: 0
            }]
        );
    }

    #[test]
    fn ratio_test_rejects_ambiguous_match() {
        let base = random_descriptors(1, 11)[0].clone();
        // 10 vs 12 differing bits: 10 < 0.8 * 12 does not hold
        let reference = vec![flip_bits(&base, 10), flip_bits(&base, 12)];
        let matches = match_descriptors(
            &[base.clone()],
            &reference,
            MatcherType::BruteForce,
            SelectorType::KNearestNeighbors,
            &MatcherConfig::default(),
        );
        assert!(matches.is_empty());

        // equal distances
        let reference = vec![base.clone(), base.clone()];
        let matches = match_descriptors(
            &[base],
            &reference,
            MatcherType::BruteForce,
            SelectorType::KNearestNeighbors,
            &MatcherConfig::default(),
        );
        assert!(matches.is_empty());
    }

    #[test]
    fn knn_needs_two_candidates() {
        let descriptors = random_descriptors(3, 5);
        let matches = match_descriptors(
            &descriptors,
            &descriptors[..1],
            MatcherType::BruteForce,
            SelectorType::KNearestNeighbors,
            &MatcherConfig::default(),
        );
        assert!(matches.is_empty());
    }

    #[test]
    fn empty_inputs_have_no_matches() {
        let descriptors = random_descriptors(3, 5);
        for selector in [SelectorType::NearestNeighbor, SelectorType::KNearestNeighbors] {
            let config = MatcherConfig::default();
            assert!(
                match_descriptors(&[], &descriptors, MatcherType::BruteForce, selector, &config)
                    .is_empty()
            );
            assert!(
                match_descriptors(&descriptors, &[], MatcherType::Flann, selector, &config)
                    .is_empty()
            );
        }
    }

    #[test]
    fn cross_check_drops_one_sided_matches() {
        let base = random_descriptors(1, 21)[0].clone();
        let source = vec![flip_bits(&base, 2), flip_bits(&base, 40)];
        let reference = vec![base];

        let one_sided = match_descriptors(
            &source,
            &reference,
            MatcherType::BruteForce,
            SelectorType::NearestNeighbor,
            &MatcherConfig::default(),
        );
        assert_eq!(one_sided.len(), 2);

        let config = MatcherConfig {
            cross_check: true,
            ..Default::default()
        };
        let mutual = match_descriptors(
            &source,
            &reference,
            MatcherType::BruteForce,
            SelectorType::NearestNeighbor,
            &config,
        );
        assert_eq!(
            mutual,
            vec![FeatureMatch {
                source: 0,
                reference: 0,
                distance: 2
            }]
        );
    }

    #[test]
    fn flann_recovers_perturbed_descriptors() {
        let source = random_descriptors(50, 17);
        let reference: Vec<_> = source.iter().rev().map(|d| flip_bits(d, 5)).collect();
        let matches = match_descriptors(
            &source,
            &reference,
            MatcherType::Flann,
            SelectorType::NearestNeighbor,
            &MatcherConfig::default(),
        );
        assert_eq!(matches.len(), source.len());
        for m in &matches {
            assert_eq!(m.reference, source.len() - 1 - m.source);
            assert_eq!(m.distance, 5);
        }
    }
}
