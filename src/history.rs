use log::error;
use noisy_float::prelude::*;

use crate::algorithm::{JetAlgorithm, Strategy};
use crate::cluster::ClusterError;
use crate::pseudojet::PseudoJet;
use crate::recombine::Recombine;

/// Parent of a clustering-history entry
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Ancestor {
    /// The history entry at the given index
    Step(usize),
    /// The beam
    Beam,
    /// No parent: the entry corresponds to an input particle
    None,
}

impl Ancestor {
    /// The history index, if this refers to an earlier step
    pub fn step(&self) -> Option<usize> {
        match self {
            Self::Step(i) => Some(*i),
            _ => None,
        }
    }
}

/// One step of the clustering history
///
/// The first `N` entries correspond to the input particles. Every
/// recombination appends one entry: a jet-jet merge with both parents
/// pointing at earlier steps, or a beam termination with `parent2 ==
/// Ancestor::Beam`. For merges `parent1` carries the smaller history
/// index.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct HistoryElement {
    /// First parent
    pub parent1: Ancestor,
    /// Second parent; the beam for termination steps
    pub parent2: Ancestor,
    /// History index of the later step that consumed this entry's jet
    pub child: Option<usize>,
    /// Jet-store index of the jet created at this step, absent for
    /// beam terminations
    pub jetp_index: Option<usize>,
    /// Recombination metric at which this step happened
    pub dij: N64,
    /// Largest recombination metric over all steps up to this one
    pub max_dij_so_far: N64,
}

/// The result of clustering a set of particles
///
/// Owns the full jet store (inputs plus every merged jet) and the
/// clustering history that connects them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClusterSequence {
    algorithm: JetAlgorithm,
    power: N64,
    r: N64,
    strategy: Strategy,
    jets: Vec<PseudoJet>,
    n_initial: usize,
    history: Vec<HistoryElement>,
    qtot: N64,
}

impl ClusterSequence {
    /// Seed a cluster sequence from the input particles
    ///
    /// Every particle gets an initial history entry and its stable
    /// `cluster_hist_index`.
    pub(crate) fn new(
        mut particles: Vec<PseudoJet>,
        algorithm: JetAlgorithm,
        power: N64,
        r: N64,
        strategy: Strategy,
    ) -> Self {
        let n_initial = particles.len();
        let mut history = Vec::with_capacity(2 * n_initial);
        let mut qtot = n64(0.);
        for (i, p) in particles.iter_mut().enumerate() {
            p.set_cluster_hist_index(i);
            qtot += p.e();
            history.push(HistoryElement {
                parent1: Ancestor::None,
                parent2: Ancestor::None,
                child: None,
                jetp_index: Some(i),
                dij: n64(0.),
                max_dij_so_far: n64(0.),
            });
        }
        particles.reserve(n_initial.saturating_sub(1));
        Self {
            algorithm,
            power,
            r,
            strategy,
            jets: particles,
            n_initial,
            history,
            qtot,
        }
    }

    /// The clustering algorithm
    pub fn algorithm(&self) -> JetAlgorithm {
        self.algorithm
    }

    /// The kt power used by the metric
    pub fn power(&self) -> N64 {
        self.power
    }

    /// The radius parameter
    pub fn r(&self) -> N64 {
        self.r
    }

    /// The strategy that produced this sequence
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// All jets: the inputs followed by every merged jet
    pub fn jets(&self) -> &[PseudoJet] {
        &self.jets
    }

    /// The clustering history
    pub fn history(&self) -> &[HistoryElement] {
        &self.history
    }

    /// Number of input particles
    pub fn n_initial(&self) -> usize {
        self.n_initial
    }

    /// Total visible energy, the sum of all input energies
    pub fn qtot(&self) -> N64 {
        self.qtot
    }

    /// Merge the jets at store indices `jet_i` and `jet_j`
    ///
    /// Returns the store index of the merged jet.
    pub(crate) fn do_ij_recombination_step<R: Recombine>(
        &mut self,
        jet_i: usize,
        jet_j: usize,
        dij: N64,
        recombiner: &R,
    ) -> usize {
        let newstep_k = self.history.len();
        let jet =
            recombiner.recombine(&self.jets[jet_i], &self.jets[jet_j], newstep_k);
        self.jets.push(jet);
        let newjet_k = self.jets.len() - 1;

        let hist_i = self.jets[jet_i].cluster_hist_index();
        let hist_j = self.jets[jet_j].cluster_hist_index();
        let (parent1, parent2) = minmax(hist_i, hist_j);
        self.add_step(
            Ancestor::Step(parent1),
            Ancestor::Step(parent2),
            Some(newjet_k),
            dij,
        );
        newjet_k
    }

    /// Terminate the jet at store index `jet_i` against the beam
    pub(crate) fn do_ib_recombination_step(&mut self, jet_i: usize, dib: N64) {
        let hist_i = self.jets[jet_i].cluster_hist_index();
        self.add_step(Ancestor::Step(hist_i), Ancestor::Beam, None, dib);
    }

    fn add_step(
        &mut self,
        parent1: Ancestor,
        parent2: Ancestor,
        jetp_index: Option<usize>,
        dij: N64,
    ) {
        let max_dij_so_far = std::cmp::max(
            dij,
            self.history
                .last()
                .map(|h| h.max_dij_so_far)
                .unwrap_or(n64(0.)),
        );
        self.history.push(HistoryElement {
            parent1,
            parent2,
            child: None,
            jetp_index,
            dij,
            max_dij_so_far,
        });
        let step = self.history.len() - 1;

        for parent in [parent1, parent2] {
            if let Ancestor::Step(p) = parent {
                let entry = &mut self.history[p];
                if entry.child.is_some() {
                    error!("history entry {p} was recombined twice");
                    panic!("corrupted clustering history");
                }
                entry.child = Some(step);
            }
        }
    }

    /// Jet-store index of the jet created at history entry `step`
    fn jet_at_step(&self, step: usize) -> usize {
        match self.history[step].jetp_index {
            Some(jetp_index) => jetp_index,
            None => {
                error!("history entry {step} does not carry a jet");
                panic!("corrupted clustering history");
            }
        }
    }

    /// All jets that were recombined with the beam and pass the pt cut
    pub fn inclusive_jets(&self, ptmin: f64) -> Vec<PseudoJet> {
        let ptmin2 = n64(ptmin * ptmin);
        let mut jets = Vec::new();
        for elem in &self.history {
            if elem.parent2 != Ancestor::Beam {
                continue;
            }
            let Some(parent1) = elem.parent1.step() else {
                error!("beam termination without a parent step");
                panic!("corrupted clustering history");
            };
            let jet = self.jets[self.jet_at_step(parent1)];
            if jet.pt2() >= ptmin2 {
                jets.push(jet);
            }
        }
        jets
    }

    /// The jet population at the point where exactly `njets` remained
    ///
    /// Only meaningful for algorithms whose metric grows monotonically
    /// along the sequence.
    pub fn exclusive_jets(&self, njets: usize) -> Result<Vec<PseudoJet>, ClusterError> {
        if njets == 0 || njets > self.n_initial {
            return Err(ClusterError::InvalidExclusiveNJets {
                njets,
                n_initial: self.n_initial,
            });
        }
        use JetAlgorithm::*;
        if !matches!(self.algorithm, Kt | CambridgeAachen | EEKt | Durham) {
            return Err(ClusterError::ExclusiveUnsupported(self.algorithm));
        }

        // every step from stop_point on undoes one of the wanted jets,
        // so their entries are exactly the parents predating stop_point
        let stop_point = 2 * self.n_initial - njets;
        let mut jets = Vec::with_capacity(njets);
        for elem in &self.history[stop_point..] {
            for parent in [elem.parent1, elem.parent2] {
                if let Some(p) = parent.step() {
                    if p < stop_point {
                        jets.push(self.jets[self.jet_at_step(p)]);
                    }
                }
            }
        }
        Ok(jets)
    }

    /// Number of jets that remain when clustering stops at metric `dcut`
    pub fn n_exclusive_jets(&self, dcut: f64) -> usize {
        let dcut = n64(dcut);
        let mut i = self.history.len();
        while i > 0 && self.history[i - 1].max_dij_so_far > dcut {
            i -= 1;
        }
        2 * self.n_initial - i
    }
}

fn minmax<T: Ord>(i: T, j: T) -> (T, T) {
    if i > j {
        (j, i)
    } else {
        (i, j)
    }
}
