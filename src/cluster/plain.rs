use std::cmp::min;
use std::f64::consts::PI;
use std::mem;

use log::{debug, trace};
use noisy_float::prelude::*;

#[cfg(debug_assertions)]
use log::error;

use crate::algorithm::{JetAlgorithm, Strategy};
use crate::cluster::find_min;
use crate::history::ClusterSequence;
use crate::pseudojet::PseudoJet;
use crate::recombine::Recombine;

/// Angular distances never exceed 2; anything above means "unset"
const LARGE_DISTANCE: f64 = 16.;
/// Metric distance forcing a lone jet onto the beam
const LARGE_DIJ: f64 = 1.0e6;
/// Nearest-neighbour slot meaning "the beam is closer than any jet"
const BEAM: usize = usize::MAX;

/// Cluster `particles` with an e+e- algorithm in direction space
pub(crate) fn cluster<R: Recombine>(
    particles: Vec<PseudoJet>,
    algorithm: JetAlgorithm,
    power: N64,
    r: N64,
    recombiner: &R,
) -> ClusterSequence {
    debug!(
        "clustering {} particles with the plain strategy",
        particles.len()
    );
    trace!("particles: {particles:#?}");
    let mut cs = ClusterSequence::new(
        particles,
        algorithm,
        power,
        r,
        Strategy::N2Plain,
    );
    let r2 = r * r;
    let dij_factor = match algorithm {
        JetAlgorithm::Durham => n64(2.),
        JetAlgorithm::EEKt => {
            if r < PI {
                n64(1.) / (n64(1.) - r.cos())
            } else {
                n64(1.) / (n64(3.) + r.cos())
            }
        }
        _ => unreachable!("{algorithm} is not an e+e- algorithm"),
    };

    let mut ee = EERecords::seed(cs.jets(), power);
    ee.init_nn(algorithm, dij_factor);

    let mut n = cs.n_initial();
    while n != 0 {
        let (dij_min, mut ia) = find_min(&ee.dijdist, n);
        let mut ib = ee.nni[ia];
        if ib == BEAM || n == 1 {
            ib = ia;
            debug!("new jet: {:?}", cs.jets()[ee.index[ia]]);
            cs.do_ib_recombination_step(ee.index[ia], dij_min);
        } else {
            if ib < ia {
                mem::swap(&mut ia, &mut ib);
            }
            debug!("cluster pseudojets {} {}", ee.index[ia], ee.index[ib]);
            let newjet_k = cs.do_ij_recombination_step(
                ee.index[ia],
                ee.index[ib],
                dij_min,
                recombiner,
            );
            ee.set_jet(ia, newjet_k, &cs.jets()[newjet_k], power, r2);
        }

        // move the last live slot into the freed one
        n -= 1;
        if ib != n {
            ee.copy_slot(n, ib);
        }
        for i in 0..n {
            if ib != n && ee.nni[i] == n {
                // the jet itself just moved: rename
                ee.nni[i] = ib;
            } else if ee.nni[i] == ia
                || ee.nni[i] == ib
                || (ee.nni[i] != BEAM && ee.nni[i] >= n)
            {
                ee.update_nn_no_cross(i, n, algorithm, dij_factor);
            }
        }
        if ia != ib {
            ee.update_nn_cross(ia, n, algorithm, dij_factor);
        }
        #[cfg(debug_assertions)]
        check_consistency(&ee, &cs, n);
    }
    cs
}

/// Energy weight E²ᵖ
fn e2p(e: N64, power: N64) -> N64 {
    (e * e).powf(power)
}

/// Structure-of-arrays state of the plain strategy, one slot per live
/// jet
struct EERecords {
    index: Vec<usize>,
    nni: Vec<usize>,
    nndist: Vec<N64>,
    dijdist: Vec<N64>,
    nx: Vec<N64>,
    ny: Vec<N64>,
    nz: Vec<N64>,
    e2p: Vec<N64>,
}

impl EERecords {
    fn seed(jets: &[PseudoJet], power: N64) -> Self {
        let n = jets.len();
        let mut rec = Self {
            index: Vec::with_capacity(n),
            nni: Vec::with_capacity(n),
            nndist: Vec::with_capacity(n),
            dijdist: Vec::with_capacity(n),
            nx: Vec::with_capacity(n),
            ny: Vec::with_capacity(n),
            nz: Vec::with_capacity(n),
            e2p: Vec::with_capacity(n),
        };
        for (i, jet) in jets.iter().enumerate() {
            let [nx, ny, nz] = jet.direction();
            rec.index.push(i);
            rec.nni.push(i);
            rec.nndist.push(n64(LARGE_DISTANCE));
            rec.dijdist.push(n64(LARGE_DIJ));
            rec.nx.push(nx);
            rec.ny.push(ny);
            rec.nz.push(nz);
            rec.e2p.push(e2p(jet.e(), power));
        }
        rec
    }

    /// 1 − cos θ between the jets in slots `i` and `j`
    fn angular(&self, i: usize, j: usize) -> N64 {
        n64(1.)
            - self.nx[i] * self.nx[j]
            - self.ny[i] * self.ny[j]
            - self.nz[i] * self.nz[j]
    }

    /// Metric distance of slot `i` to the neighbour in slot `nni`
    fn dij_dist(&self, i: usize, nni: usize, dij_factor: N64) -> N64 {
        if nni == BEAM || nni == i {
            return n64(LARGE_DIJ);
        }
        min(self.e2p[i], self.e2p[nni]) * dij_factor * self.nndist[i]
    }

    /// Let the beam take over when it is closer than any jet
    fn beam_clamp(&mut self, i: usize, algorithm: JetAlgorithm) {
        if algorithm == JetAlgorithm::EEKt && self.e2p[i] < self.dijdist[i] {
            self.dijdist[i] = self.e2p[i];
            self.nni[i] = BEAM;
        }
    }

    /// Initial sweep visiting every pair once
    fn init_nn(&mut self, algorithm: JetAlgorithm, dij_factor: N64) {
        let n = self.index.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let dist = self.angular(i, j);
                if dist < self.nndist[i] {
                    self.nndist[i] = dist;
                    self.nni[i] = j;
                }
                if dist < self.nndist[j] {
                    self.nndist[j] = dist;
                    self.nni[j] = i;
                }
            }
        }
        for i in 0..n {
            self.dijdist[i] = self.dij_dist(i, self.nni[i], dij_factor);
            self.beam_clamp(i, algorithm);
        }
    }

    /// Re-seed slot `slot` with the merged jet
    fn set_jet(
        &mut self,
        slot: usize,
        jets_index: usize,
        jet: &PseudoJet,
        power: N64,
        r2: N64,
    ) {
        let [nx, ny, nz] = jet.direction();
        self.index[slot] = jets_index;
        self.nni[slot] = BEAM;
        self.nndist[slot] = r2;
        self.nx[slot] = nx;
        self.ny[slot] = ny;
        self.nz[slot] = nz;
        self.e2p[slot] = e2p(jet.e(), power);
    }

    fn copy_slot(&mut self, from: usize, to: usize) {
        self.index[to] = self.index[from];
        self.nni[to] = self.nni[from];
        self.nndist[to] = self.nndist[from];
        self.dijdist[to] = self.dijdist[from];
        self.nx[to] = self.nx[from];
        self.ny[to] = self.ny[from];
        self.nz[to] = self.nz[from];
        self.e2p[to] = self.e2p[from];
    }

    /// Recompute the nearest neighbour of `i` from scratch
    fn update_nn_no_cross(
        &mut self,
        i: usize,
        n: usize,
        algorithm: JetAlgorithm,
        dij_factor: N64,
    ) {
        self.nndist[i] = n64(LARGE_DISTANCE);
        self.nni[i] = i;
        for j in 0..n {
            if j != i {
                let dist = self.angular(i, j);
                if dist < self.nndist[i] {
                    self.nndist[i] = dist;
                    self.nni[i] = j;
                }
            }
        }
        self.dijdist[i] = self.dij_dist(i, self.nni[i], dij_factor);
        self.beam_clamp(i, algorithm);
    }

    /// Recompute the nearest neighbour of `i`, updating every partner
    /// that `i` undercuts
    fn update_nn_cross(
        &mut self,
        i: usize,
        n: usize,
        algorithm: JetAlgorithm,
        dij_factor: N64,
    ) {
        self.nndist[i] = n64(LARGE_DISTANCE);
        self.nni[i] = i;
        for j in 0..n {
            if j != i {
                let dist = self.angular(i, j);
                if dist < self.nndist[i] {
                    self.nndist[i] = dist;
                    self.nni[i] = j;
                }
                if dist < self.nndist[j] {
                    self.nndist[j] = dist;
                    self.nni[j] = i;
                    self.dijdist[j] = self.dij_dist(j, i, dij_factor);
                    self.beam_clamp(j, algorithm);
                }
            }
        }
        self.dijdist[i] = self.dij_dist(i, self.nni[i], dij_factor);
        self.beam_clamp(i, algorithm);
    }
}

/// Per-iteration sanity check, active in debug builds only
#[cfg(debug_assertions)]
fn check_consistency(ee: &EERecords, cs: &ClusterSequence, n: usize) {
    for i in 0..n {
        let nni = ee.nni[i];
        if nni != BEAM && nni >= n {
            error!("slot {i}: nearest neighbour {nni} outside live range {n}");
            panic!("corrupted nearest-neighbour state");
        }
        let hist = cs.jets()[ee.index[i]].cluster_hist_index();
        if cs.history()[hist].child.is_some() {
            error!("slot {i}: jet was already recombined");
            panic!("corrupted clustering history");
        }
    }
}
