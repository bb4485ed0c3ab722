use std::cmp::min;
use std::f64::consts::PI;

use log::{debug, trace};
use noisy_float::prelude::*;

use crate::algorithm::{JetAlgorithm, Strategy};
use crate::cluster::tiling::{Tiling, TilingDef};
use crate::cluster::find_min;
use crate::history::ClusterSequence;
use crate::pseudojet::PseudoJet;
use crate::recombine::Recombine;

/// Transverse momenta squared below this count as degenerate
const KT2_FLOOR: f64 = 1e-300;
/// kt weight assigned to degenerate transverse momenta
const KT2_OVERFLOW: f64 = 1e300;

/// Cluster `particles` with a hadron-collider algorithm on the
/// (rapidity, φ) grid
pub(crate) fn cluster<R: Recombine>(
    particles: Vec<PseudoJet>,
    algorithm: JetAlgorithm,
    power: N64,
    r: N64,
    recombiner: &R,
) -> ClusterSequence {
    debug!(
        "clustering {} particles with the tiled strategy",
        particles.len()
    );
    trace!("particles: {particles:#?}");
    Tiled::new(particles, algorithm, power, r).run(recombiner)
}

/// kt weight pt²ᵖ, with degenerate transverse momenta pushed out of
/// the running
pub(crate) fn kt2_weight(jet: &PseudoJet, p: N64) -> N64 {
    let pt2 = jet.pt2();
    if pt2 > KT2_FLOOR {
        pt2.powf(p)
    } else {
        n64(KT2_OVERFLOW)
    }
}

/// ΔR² between two tiled jet records, with φ wrapped onto [0, 2π)
fn tj_dist(a: &TiledJet, b: &TiledJet) -> N64 {
    let dphi = n64(PI) - (n64(PI) - (a.phi - b.phi).abs()).abs();
    let deta = a.eta - b.eta;
    dphi * dphi + deta * deta
}

/// Mutable per-jet state of the tiled strategy
///
/// Records live in an arena; `nn` and the intra-tile list links are
/// arena indices. `dij_posn` is the back-index into the compact
/// `nns`/`dij` arrays.
#[derive(Copy, Clone, Debug, Default)]
struct TiledJet {
    eta: N64,
    phi: N64,
    kt2: N64,
    nn_dist: N64,
    jets_index: usize,
    tile_index: usize,
    dij_posn: usize,
    nn: Option<usize>,
    previous: Option<usize>,
    next: Option<usize>,
}

struct Tiled {
    cs: ClusterSequence,
    tiling: Tiling,
    tiledjets: Vec<TiledJet>,
    /// compact array: arena index of the jet at each live slot
    nns: Vec<usize>,
    /// compact array: recombination metric of the jet at each live slot
    dij: Vec<N64>,
    /// scratch for the tiles affected by one step, at most 3 neighbourhoods
    tile_union: Vec<usize>,
    r2: N64,
    inv_r2: N64,
    power: N64,
}

impl Tiled {
    fn new(
        particles: Vec<PseudoJet>,
        algorithm: JetAlgorithm,
        power: N64,
        r: N64,
    ) -> Self {
        let r2 = r * r;
        let cs = ClusterSequence::new(
            particles,
            algorithm,
            power,
            r,
            Strategy::N2Tiled,
        );
        let eta = Vec::from_iter(cs.jets().iter().map(|j| j.rap()));
        let tiling = Tiling::new(TilingDef::new(&eta, r));
        let n = cs.n_initial();
        let mut res = Self {
            cs,
            tiling,
            tiledjets: Vec::with_capacity(n),
            nns: Vec::with_capacity(n),
            dij: Vec::with_capacity(n),
            tile_union: Vec::with_capacity(3 * 9),
            r2,
            inv_r2: n64(1.) / r2,
            power,
        };
        for i in 0..n {
            res.tiledjets.push(TiledJet::default());
            res.set_jet_info(i, i);
        }
        res.init_nearest();
        res
    }

    /// Point the record `tj` at the jet-store entry `jets_index`
    ///
    /// Resets the nearest-neighbour state and files the record into
    /// the tile matching its position.
    fn set_jet_info(&mut self, tj: usize, jets_index: usize) {
        let jet = &self.cs.jets()[jets_index];
        let eta = jet.rap();
        let phi = jet.phi();
        let kt2 = kt2_weight(jet, self.power);
        let tile = self.tiling.setup.tile_index(eta, phi);

        let record = &mut self.tiledjets[tj];
        record.eta = eta;
        record.phi = phi;
        record.kt2 = kt2;
        record.jets_index = jets_index;
        record.nn = None;
        record.nn_dist = self.r2;
        self.insert_at_head(tj, tile);
    }

    fn insert_at_head(&mut self, jet: usize, tile: usize) {
        let head = self.tiling.heads[tile];
        self.tiledjets[jet].previous = None;
        self.tiledjets[jet].next = head;
        if let Some(h) = head {
            self.tiledjets[h].previous = Some(jet);
        }
        self.tiling.heads[tile] = Some(jet);
        self.tiledjets[jet].tile_index = tile;
    }

    fn remove_from_tiles(&mut self, jet: usize) {
        let TiledJet {
            previous,
            next,
            tile_index,
            ..
        } = self.tiledjets[jet];
        match previous {
            None => self.tiling.heads[tile_index] = next,
            Some(prev) => self.tiledjets[prev].next = next,
        }
        if let Some(nxt) = next {
            self.tiledjets[nxt].previous = previous;
        }
        self.tiledjets[jet].previous = None;
        self.tiledjets[jet].next = None;
    }

    /// Metric entry for the compact array: min(kt²ᵢ, kt²ⱼ)·ΔR²ᵢⱼ
    ///
    /// Stored without the 1/R² normalisation; jets without a
    /// neighbour carry kt²·R², which divides out to the beam metric.
    fn tj_dij(&self, jet: usize) -> N64 {
        let j = &self.tiledjets[jet];
        let kt2 = match j.nn {
            Some(nn) => min(j.kt2, self.tiledjets[nn].kt2),
            None => j.kt2,
        };
        kt2 * j.nn_dist
    }

    /// One-shot nearest-neighbour pass visiting every neighbouring
    /// pair exactly once, then build the compact arrays
    fn init_nearest(&mut self) {
        for tile in 0..self.tiling.heads.len() {
            // pairs within the tile: every partner earlier in the list
            let mut ija = self.tiling.heads[tile];
            while let Some(ja) = ija {
                let mut ijb = self.tiling.heads[tile];
                while ijb != Some(ja) {
                    let jb = ijb.unwrap();
                    let dist =
                        tj_dist(&self.tiledjets[ja], &self.tiledjets[jb]);
                    if dist < self.tiledjets[ja].nn_dist {
                        self.tiledjets[ja].nn_dist = dist;
                        self.tiledjets[ja].nn = Some(jb);
                    }
                    if dist < self.tiledjets[jb].nn_dist {
                        self.tiledjets[jb].nn_dist = dist;
                        self.tiledjets[jb].nn = Some(ja);
                    }
                    ijb = self.tiledjets[jb].next;
                }
                ija = self.tiledjets[ja].next;
            }
            // pairs with the right half of the 3×3 neighbourhood
            for rtile in self.tiling.setup.right_neighbours(tile) {
                let mut ija = self.tiling.heads[tile];
                while let Some(ja) = ija {
                    let mut ijb = self.tiling.heads[rtile];
                    while let Some(jb) = ijb {
                        let dist =
                            tj_dist(&self.tiledjets[ja], &self.tiledjets[jb]);
                        if dist < self.tiledjets[ja].nn_dist {
                            self.tiledjets[ja].nn_dist = dist;
                            self.tiledjets[ja].nn = Some(jb);
                        }
                        if dist < self.tiledjets[jb].nn_dist {
                            self.tiledjets[jb].nn_dist = dist;
                            self.tiledjets[jb].nn = Some(ja);
                        }
                        ijb = self.tiledjets[jb].next;
                    }
                    ija = self.tiledjets[ja].next;
                }
            }
        }
        for i in 0..self.tiledjets.len() {
            self.nns.push(i);
            let d = self.tj_dij(i);
            self.dij.push(d);
            self.tiledjets[i].dij_posn = i;
        }
    }

    /// Rescan the full 3×3 neighbourhood of `jet` for its nearest
    /// neighbour and refresh its metric entry
    fn recompute_nn(&mut self, jet: usize) {
        self.tiledjets[jet].nn_dist = self.r2;
        self.tiledjets[jet].nn = None;
        let tile = self.tiledjets[jet].tile_index;
        for near in self.tiling.setup.surrounding(tile) {
            let mut ijj = self.tiling.heads[near];
            while let Some(jj) = ijj {
                if jj != jet {
                    let dist =
                        tj_dist(&self.tiledjets[jet], &self.tiledjets[jj]);
                    if dist < self.tiledjets[jet].nn_dist {
                        self.tiledjets[jet].nn_dist = dist;
                        self.tiledjets[jet].nn = Some(jj);
                    }
                }
                ijj = self.tiledjets[jj].next;
            }
        }
        let d = self.tj_dij(jet);
        let pos = self.tiledjets[jet].dij_posn;
        self.dij[pos] = d;
    }

    /// Tag and collect the 3×3 neighbourhood of `tile`, skipping
    /// tiles already in the union
    fn add_untagged_neighbours(&mut self, tile: usize) {
        for t in self.tiling.setup.surrounding(tile) {
            if !self.tiling.tags[t] {
                self.tiling.tags[t] = true;
                self.tile_union.push(t);
            }
        }
    }

    fn run<R: Recombine>(mut self, recombiner: &R) -> ClusterSequence {
        let n_initial = self.cs.n_initial();
        let mut n = n_initial;
        for _ in 0..n_initial {
            let (dij_min, ibest) = find_min(&self.dij, n);
            let mut ja = self.nns[ibest];
            let dij_min = dij_min * self.inv_r2;

            let (jetb, oldb_tile) = if let Some(mut jb) = self.tiledjets[ja].nn
            {
                // the record with the smaller index survives and is
                // reused for the merged jet
                if ja < jb {
                    std::mem::swap(&mut ja, &mut jb);
                }
                let jets_index_a = self.tiledjets[ja].jets_index;
                let jets_index_b = self.tiledjets[jb].jets_index;
                debug!("cluster pseudojets {jets_index_a} {jets_index_b}");
                let newjet_k = self.cs.do_ij_recombination_step(
                    jets_index_a,
                    jets_index_b,
                    dij_min,
                    recombiner,
                );
                self.remove_from_tiles(ja);
                let oldb_tile = self.tiledjets[jb].tile_index;
                self.remove_from_tiles(jb);
                self.set_jet_info(jb, newjet_k);
                (Some(jb), oldb_tile)
            } else {
                let jets_index_a = self.tiledjets[ja].jets_index;
                debug!("new jet: {:?}", self.cs.jets()[jets_index_a]);
                self.cs.do_ib_recombination_step(jets_index_a, dij_min);
                self.remove_from_tiles(ja);
                (None, 0)
            };

            // the union of tiles whose jets may need repairing
            self.tile_union.clear();
            let a_tile = self.tiledjets[ja].tile_index;
            self.add_untagged_neighbours(a_tile);
            if let Some(jb) = jetb {
                let b_tile = self.tiledjets[jb].tile_index;
                if b_tile != a_tile {
                    self.add_untagged_neighbours(b_tile);
                }
                if oldb_tile != a_tile && oldb_tile != b_tile {
                    self.add_untagged_neighbours(oldb_tile);
                }
            }

            // retire jetA's slot by moving the last live entry into it
            n -= 1;
            let apos = self.tiledjets[ja].dij_posn;
            self.nns[apos] = self.nns[n];
            self.dij[apos] = self.dij[n];
            let moved = self.nns[apos];
            self.tiledjets[moved].dij_posn = apos;

            for iu in 0..self.tile_union.len() {
                let tile = self.tile_union[iu];
                self.tiling.tags[tile] = false;
                let mut iji = self.tiling.heads[tile];
                while let Some(ji) = iji {
                    // jets that lost their neighbour need a full rescan
                    let nn = self.tiledjets[ji].nn;
                    if nn == Some(ja) || (jetb.is_some() && nn == jetb) {
                        self.recompute_nn(ji);
                    }
                    // the merged jet may undercut the current neighbour
                    if let Some(jb) = jetb {
                        if ji != jb {
                            let dist = tj_dist(
                                &self.tiledjets[ji],
                                &self.tiledjets[jb],
                            );
                            if dist < self.tiledjets[ji].nn_dist {
                                self.tiledjets[ji].nn_dist = dist;
                                self.tiledjets[ji].nn = Some(jb);
                                let d = self.tj_dij(ji);
                                let pos = self.tiledjets[ji].dij_posn;
                                self.dij[pos] = d;
                            }
                            if dist < self.tiledjets[jb].nn_dist {
                                self.tiledjets[jb].nn_dist = dist;
                                self.tiledjets[jb].nn = Some(ji);
                            }
                        }
                    }
                    iji = self.tiledjets[ji].next;
                }
            }
            if let Some(jb) = jetb {
                let d = self.tj_dij(jb);
                let pos = self.tiledjets[jb].dij_posn;
                self.dij[pos] = d;
            }
        }
        debug_assert_eq!(n, 0);
        self.cs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::tiled_reconstruct;
    use crate::history::Ancestor;
    use crate::pseudojet::pseudojet_f;
    use crate::test_data::*;

    fn log_init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Brute-force clustering recomputing every pair metric each round
    fn reference_cluster(
        partons: &[PseudoJet],
        power: f64,
        r: f64,
    ) -> Vec<PseudoJet> {
        let r2 = n64(r) * n64(r);
        let power = n64(power);
        let mut jets = partons.to_vec();
        let mut out = Vec::new();
        while !jets.is_empty() {
            let mut best_dist = n64(f64::MAX);
            let mut best = (0, usize::MAX);
            for i in 0..jets.len() {
                let kti = kt2_weight(&jets[i], power);
                if kti < best_dist {
                    best_dist = kti;
                    best = (i, usize::MAX);
                }
                for j in (i + 1)..jets.len() {
                    let ktj = kt2_weight(&jets[j], power);
                    let dij =
                        min(kti, ktj) * jets[i].delta_r2(&jets[j]) / r2;
                    if dij < best_dist {
                        best_dist = dij;
                        best = (i, j);
                    }
                }
            }
            let (i, j) = best;
            if j == usize::MAX {
                out.push(jets.swap_remove(i));
            } else {
                let pj = jets.swap_remove(j);
                jets[i] += pj;
            }
        }
        out
    }

    fn sorted_momenta(jets: &[PseudoJet]) -> Vec<[N64; 4]> {
        let mut p = Vec::from_iter(
            jets.iter().map(|j| [j.e(), j.px(), j.py(), j.pz()]),
        );
        p.sort();
        p
    }

    fn cmp_with_reference(
        partons: Vec<PseudoJet>,
        algorithm: JetAlgorithm,
        p: Option<f64>,
        r: f64,
    ) {
        log_init();
        let power = p.or(algorithm.fixed_power()).unwrap();
        let seq = tiled_reconstruct(&partons, algorithm, p, r).unwrap();
        let expected = reference_cluster(&partons, power, r);
        assert_eq!(
            sorted_momenta(&seq.inclusive_jets(0.)),
            sorted_momenta(&expected),
        );
    }

    #[test]
    fn cmp_anti_kt_9() {
        cmp_with_reference(partons_9_to_7(), JetAlgorithm::AntiKt, None, 0.4);
    }

    #[test]
    fn cmp_anti_kt_8() {
        cmp_with_reference(partons_8_to_7(), JetAlgorithm::AntiKt, None, 0.4);
    }

    #[test]
    fn cmp_kt() {
        cmp_with_reference(partons_9_to_7(), JetAlgorithm::Kt, None, 0.6);
    }

    #[test]
    fn cmp_cambridge_aachen() {
        cmp_with_reference(
            partons_3_to_2(),
            JetAlgorithm::CambridgeAachen,
            None,
            0.4,
        );
    }

    #[test]
    fn cmp_gen_kt() {
        cmp_with_reference(
            partons_4_to_4(),
            JetAlgorithm::GenKt,
            Some(0.5),
            0.7,
        );
    }

    #[test]
    fn back_to_back_never_merges() {
        log_init();
        let partons = vec![
            pseudojet_f(100., 100., 0., 0.),
            pseudojet_f(100., -100., 0., 0.),
        ];
        let seq =
            tiled_reconstruct(&partons, JetAlgorithm::AntiKt, None, 0.4)
                .unwrap();
        assert_eq!(seq.history().len(), 4);
        for step in &seq.history()[2..] {
            assert_eq!(step.parent2, Ancestor::Beam);
        }
        assert_eq!(seq.inclusive_jets(0.).len(), 2);
    }

    #[test]
    fn collinear_doublet_merges() {
        log_init();
        let partons = vec![
            pseudojet_f(10., 10., 0., 0.),
            pseudojet_f(10., 10., 0., 0.),
        ];
        let seq = tiled_reconstruct(&partons, JetAlgorithm::AntiKt, None, 1.)
            .unwrap();
        assert_eq!(seq.history().len(), 4);
        let merge = &seq.history()[2];
        assert_eq!(merge.parent1, Ancestor::Step(0));
        assert_eq!(merge.parent2, Ancestor::Step(1));
        assert_eq!(merge.dij, 0.);
        let beam = &seq.history()[3];
        assert_eq!(beam.parent2, Ancestor::Beam);

        let jets = seq.inclusive_jets(0.);
        assert_eq!(jets.len(), 1);
        assert_eq!(jets[0].e(), 20.);
    }

    #[test]
    fn triangle_in_phi() {
        log_init();
        let parton = |phi: f64| {
            pseudojet_f(50., 50. * phi.cos(), 50. * phi.sin(), 0.)
        };
        let partons = vec![parton(0.), parton(0.3), parton(2.)];
        let seq = tiled_reconstruct(&partons, JetAlgorithm::AntiKt, None, 0.4)
            .unwrap();

        let merges = seq.history()[3..]
            .iter()
            .filter(|s| s.parent2 != Ancestor::Beam)
            .count();
        assert_eq!(merges, 1);

        let mut energies =
            Vec::from_iter(seq.inclusive_jets(0.).iter().map(|j| j.e()));
        energies.sort();
        // the isolated parton comes through untouched
        assert_eq!(energies, [n64(50.), n64(100.)]);
    }

    #[test]
    fn merges_across_tile_boundary() {
        log_init();
        // Δy just below the radius, on either side of a tile edge
        let partons = vec![
            pseudojet_f(30. * 0.19f64.cosh(), 30., 0., 30. * 0.19f64.sinh()),
            pseudojet_f(
                30. * 0.19f64.cosh(),
                30.,
                0.,
                -30. * 0.19f64.sinh(),
            ),
        ];
        let seq = tiled_reconstruct(&partons, JetAlgorithm::AntiKt, None, 0.4)
            .unwrap();
        assert!((seq.jets()[0].rap() - 0.19).abs() < 1e-12);
        assert!((seq.jets()[1].rap() + 0.19).abs() < 1e-12);
        assert_eq!(seq.inclusive_jets(0.).len(), 1);
    }

    #[test]
    fn tiny_radius_keeps_all_partons() {
        log_init();
        let partons = partons_4_to_4();
        let seq =
            tiled_reconstruct(&partons, JetAlgorithm::AntiKt, None, 0.01)
                .unwrap();
        let merges = seq.history()[4..]
            .iter()
            .filter(|s| s.parent2 != Ancestor::Beam)
            .count();
        assert_eq!(merges, 0);
        assert_eq!(seq.inclusive_jets(0.).len(), 4);
    }

    #[test]
    fn deterministic() {
        log_init();
        let partons = partons_9_to_7();
        let first =
            tiled_reconstruct(&partons, JetAlgorithm::AntiKt, None, 0.4)
                .unwrap();
        let second =
            tiled_reconstruct(&partons, JetAlgorithm::AntiKt, None, 0.4)
                .unwrap();
        assert_eq!(first.history(), second.history());
        assert_eq!(first.jets(), second.jets());
    }

    #[test]
    fn input_order_does_not_matter() {
        log_init();
        let partons = partons_9_to_7();
        let mut reversed = partons.clone();
        reversed.reverse();
        let seq = tiled_reconstruct(&partons, JetAlgorithm::AntiKt, None, 0.4)
            .unwrap();
        let seq_rev =
            tiled_reconstruct(&reversed, JetAlgorithm::AntiKt, None, 0.4)
                .unwrap();
        let jets = sorted_momenta(&seq.inclusive_jets(0.));
        let jets_rev = sorted_momenta(&seq_rev.inclusive_jets(0.));
        assert_eq!(jets.len(), jets_rev.len());
        for (p, q) in jets.iter().zip(&jets_rev) {
            for k in 0..4 {
                float_cmp::assert_approx_eq!(
                    f64,
                    f64::from(p[k]),
                    f64::from(q[k]),
                    ulps = 4
                );
            }
        }
    }

    #[test]
    fn history_bookkeeping() {
        log_init();
        let partons = partons_9_to_7();
        let qtot = partons.iter().fold(n64(0.), |acc, p| acc + p.e());
        let seq = tiled_reconstruct(&partons, JetAlgorithm::AntiKt, None, 0.4)
            .unwrap();

        assert_eq!(seq.qtot(), qtot);
        // every input is eventually merged or terminated
        assert_eq!(seq.history().len(), 2 * seq.n_initial());
        let beams = seq
            .history()
            .iter()
            .filter(|s| s.parent2 == Ancestor::Beam)
            .count();
        assert_eq!(beams, seq.inclusive_jets(0.).len());

        // energy is conserved at every merge
        for step in seq.history() {
            let (Some(p1), Some(p2)) =
                (step.parent1.step(), step.parent2.step())
            else {
                continue;
            };
            let jet = |hist: usize| {
                seq.jets()[seq.history()[hist].jetp_index.unwrap()]
            };
            let child = jet(p1).e() + jet(p2).e();
            assert_eq!(child, seq.jets()[step.jetp_index.unwrap()].e());
        }
    }
}
