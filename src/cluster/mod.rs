//!
//! Jet clustering strategies. Use the [tiled_reconstruct] and
//! [ee_reconstruct] entry points instead of the strategy modules
//! directly; they validate the configuration and pick the matching
//! engine:
//!
//! * [plain](crate::cluster::plain): O(N²) structure-of-arrays
//!   strategy for the e+e- algorithms (Durham, ee kt), measuring
//!   distances between 3D directions.
//!
//! * [tiled](crate::cluster::tiled): tiled strategy for the
//!   hadron-collider algorithms (kt, anti-kt, Cambridge/Aachen,
//!   generalised kt), measuring ΔR² on the (rapidity, φ) cylinder
//!   with an O(N^1.5) grid of linked lists.
//!
/// Plain e+e- clustering
pub mod plain;
/// Tiled hadron-collider clustering
pub mod tiled;
/// The (rapidity, φ) grid used by the tiled strategy
pub mod tiling;

use noisy_float::prelude::*;
use thiserror::Error;

use crate::algorithm::{JetAlgorithm, Strategy};
use crate::history::ClusterSequence;
use crate::pseudojet::{PseudoJet, D};
use crate::recombine::{EScheme, Recombine};

/// Errors reported by the clustering entry points
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ClusterError {
    /// The algorithm needs an explicit kt power
    #[error("algorithm {0} requires an explicit power")]
    MissingPower(JetAlgorithm),
    /// The algorithm fixes its kt power
    #[error("algorithm {algorithm} fixes the power to {expected}, got {got}")]
    FixedPower {
        algorithm: JetAlgorithm,
        expected: f64,
        got: f64,
    },
    /// The algorithm belongs to the other geometry
    #[error("algorithm {algorithm} is not defined for the {strategy} strategy")]
    StrategyMismatch {
        algorithm: JetAlgorithm,
        strategy: Strategy,
    },
    /// There is nothing to cluster
    #[error("no input particles")]
    EmptyInput,
    /// An input momentum contains NaN or an infinity
    #[error("input particle {0} has a non-finite momentum component")]
    NonFiniteInput(usize),
    /// Exclusive jet selection with an impossible jet count
    #[error("cannot select {njets} exclusive jets from {n_initial} particles")]
    InvalidExclusiveNJets { njets: usize, n_initial: usize },
    /// Exclusive jet selection for an unsuitable algorithm
    #[error("algorithm {0} is not suitable for exclusive jet selection")]
    ExclusiveUnsupported(JetAlgorithm),
}

/// Cluster `particles` with a hadron-collider algorithm
///
/// `p` must be given for [JetAlgorithm::GenKt] and must be absent or
/// match the fixed power for the other algorithms. Recombination is
/// four-momentum addition; see [tiled_reconstruct_with] for custom
/// schemes.
pub fn tiled_reconstruct<'a, P>(
    particles: &'a [P],
    algorithm: JetAlgorithm,
    p: Option<f64>,
    r: f64,
) -> Result<ClusterSequence, ClusterError>
where
    &'a P: Into<PseudoJet>,
{
    tiled_reconstruct_with(particles, algorithm, p, r, &EScheme)
}

/// Cluster `particles` with a hadron-collider algorithm and a custom
/// recombination scheme
pub fn tiled_reconstruct_with<'a, P, R>(
    particles: &'a [P],
    algorithm: JetAlgorithm,
    p: Option<f64>,
    r: f64,
    recombiner: &R,
) -> Result<ClusterSequence, ClusterError>
where
    &'a P: Into<PseudoJet>,
    R: Recombine,
{
    if !algorithm.is_hadronic() {
        return Err(ClusterError::StrategyMismatch {
            algorithm,
            strategy: Strategy::N2Tiled,
        });
    }
    let power = checked_power(algorithm, p)?;
    let jets = to_pseudojets(particles)?;
    Ok(tiled::cluster(jets, algorithm, power, n64(r), recombiner))
}

/// Cluster `particles` with an e+e- algorithm
///
/// `p` must be given for [JetAlgorithm::EEKt]. For
/// [JetAlgorithm::Durham] the radius parameter is fixed to 4 and `r`
/// is ignored.
pub fn ee_reconstruct<'a, P>(
    particles: &'a [P],
    algorithm: JetAlgorithm,
    p: Option<f64>,
    r: f64,
) -> Result<ClusterSequence, ClusterError>
where
    &'a P: Into<PseudoJet>,
{
    ee_reconstruct_with(particles, algorithm, p, r, &EScheme)
}

/// Cluster `particles` with an e+e- algorithm and a custom
/// recombination scheme
pub fn ee_reconstruct_with<'a, P, R>(
    particles: &'a [P],
    algorithm: JetAlgorithm,
    p: Option<f64>,
    r: f64,
    recombiner: &R,
) -> Result<ClusterSequence, ClusterError>
where
    &'a P: Into<PseudoJet>,
    R: Recombine,
{
    if !algorithm.is_ee() {
        return Err(ClusterError::StrategyMismatch {
            algorithm,
            strategy: Strategy::N2Plain,
        });
    }
    let power = checked_power(algorithm, p)?;
    let r = if algorithm == JetAlgorithm::Durham {
        n64(4.)
    } else {
        n64(r)
    };
    let jets = to_pseudojets(particles)?;
    Ok(plain::cluster(jets, algorithm, power, r, recombiner))
}

/// Resolve the kt power, rejecting inconsistent configurations
fn checked_power(
    algorithm: JetAlgorithm,
    p: Option<f64>,
) -> Result<N64, ClusterError> {
    match (algorithm.fixed_power(), p) {
        (Some(fixed), None) => Ok(n64(fixed)),
        (Some(fixed), Some(p)) if p == fixed => Ok(n64(fixed)),
        (Some(fixed), Some(p)) => Err(ClusterError::FixedPower {
            algorithm,
            expected: fixed,
            got: p,
        }),
        (None, Some(p)) => Ok(n64(p)),
        (None, None) => Err(ClusterError::MissingPower(algorithm)),
    }
}

/// Convert the input particles, rejecting empty and non-finite input
fn to_pseudojets<'a, P>(particles: &'a [P]) -> Result<Vec<PseudoJet>, ClusterError>
where
    &'a P: Into<PseudoJet>,
{
    if particles.is_empty() {
        return Err(ClusterError::EmptyInput);
    }
    let jets = Vec::from_iter(particles.iter().map(|p| p.into()));
    for (i, jet) in jets.iter().enumerate() {
        for k in 0..D {
            if !f64::from(jet[k]).is_finite() {
                return Err(ClusterError::NonFiniteInput(i));
            }
        }
    }
    Ok(jets)
}

/// Minimum of the first `n` entries and its index
///
/// Ties are broken in favour of the lowest index.
pub(crate) fn find_min(d: &[N64], n: usize) -> (N64, usize) {
    debug_assert!((1..=d.len()).contains(&n));
    let mut min_dist = d[0];
    let mut best = 0;
    for (i, &dist) in d[1..n].iter().enumerate() {
        if dist < min_dist {
            min_dist = dist;
            best = i + 1;
        }
    }
    (min_dist, best)
}
