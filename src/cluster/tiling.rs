use std::cmp::{max, min};
use std::f64::consts::PI;

use itertools::Itertools;
use noisy_float::prelude::*;
use num_traits::cast::ToPrimitive;

/// Smallest allowed tile edge length
const MIN_TILE_SIZE: f64 = 0.1;
/// Largest fraction of the busiest rapidity bin tolerated in an edge bin
const ALLOWED_MAX_FRACTION: f64 = 0.25;
/// An edge bin may always hold at least this many particles
const MIN_MULTIPLICITY: f64 = 4.;

/// Geometry of the (rapidity, φ) grid
///
/// Tiles are identified by the 1D index `iφ·n_η + iη`. Tile edges are
/// at least as long as the radius parameter, so that any pair closer
/// than the radius sits within a 3×3 tile neighbourhood. The rapidity
/// edge bins are open-ended: everything beyond the extent is folded
/// into them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct TilingDef {
    eta_min: N64,
    eta_max: N64,
    tile_size_eta: N64,
    tile_size_phi: N64,
    n_tiles_eta: usize,
    n_tiles_phi: usize,
}

impl TilingDef {
    /// Lay out the grid for the observed rapidities and radius `r`
    pub(crate) fn new(eta: &[N64], r: N64) -> Self {
        let tile_size_eta = max(n64(MIN_TILE_SIZE), r);
        let n_tiles_phi =
            max(3, (n64(2. * PI) / tile_size_eta).floor().to_usize().unwrap());
        let tile_size_phi = n64(2. * PI) / n_tiles_phi as f64;

        let (minrap, maxrap) = determine_rapidity_extent(eta);
        let ieta_min = f64::from((minrap / tile_size_eta).floor()) as i64;
        let ieta_max = f64::from((maxrap / tile_size_eta).floor()) as i64;
        let eta_min = tile_size_eta * ieta_min as f64;
        let eta_max = tile_size_eta * (ieta_max + 1) as f64;
        let n_tiles_eta = (ieta_max - ieta_min + 1) as usize;

        Self {
            eta_min,
            eta_max,
            tile_size_eta,
            tile_size_phi,
            n_tiles_eta,
            n_tiles_phi,
        }
    }

    pub(crate) fn n_tiles(&self) -> usize {
        self.n_tiles_eta * self.n_tiles_phi
    }

    /// The tile containing the point (η, φ)
    pub(crate) fn tile_index(&self, eta: N64, phi: N64) -> usize {
        let ieta = if eta <= self.eta_min {
            0
        } else if eta >= self.eta_max {
            self.n_tiles_eta - 1
        } else {
            let bin = ((eta - self.eta_min) / self.tile_size_eta).floor();
            bin.to_usize().unwrap().min(self.n_tiles_eta - 1)
        };
        let iphi = (phi / self.tile_size_phi)
            .floor()
            .to_usize()
            .unwrap()
            .min(self.n_tiles_phi - 1);
        iphi * self.n_tiles_eta + ieta
    }

    /// The up to 9 tiles of the 3×3 neighbourhood around `tile`
    ///
    /// Includes `tile` itself; φ wraps, η clips at the grid edges.
    pub(crate) fn surrounding(
        &self,
        tile: usize,
    ) -> impl Iterator<Item = usize> + '_ {
        let ieta = tile % self.n_tiles_eta;
        let iphi = tile / self.n_tiles_eta;
        let eta_lo = ieta.saturating_sub(1);
        let eta_hi = min(ieta + 1, self.n_tiles_eta - 1);
        let phis = [
            (iphi + self.n_tiles_phi - 1) % self.n_tiles_phi,
            iphi,
            (iphi + 1) % self.n_tiles_phi,
        ];
        (eta_lo..=eta_hi)
            .cartesian_product(phis)
            .map(move |(e, p)| p * self.n_tiles_eta + e)
    }

    /// The "right half" of the 3×3 neighbourhood around `tile`
    ///
    /// Covers each unordered pair of neighbouring tiles exactly once
    /// when combined with the same call on the partner tile.
    pub(crate) fn right_neighbours(
        &self,
        tile: usize,
    ) -> impl Iterator<Item = usize> + '_ {
        let ieta = tile % self.n_tiles_eta;
        let iphi = tile / self.n_tiles_eta;
        let up = (iphi + 1) % self.n_tiles_phi;
        let eta_up = (ieta + 1 < self.n_tiles_eta).then_some(ieta + 1);
        [
            eta_up.map(|e| iphi * self.n_tiles_eta + e),
            (ieta > 0).then(|| up * self.n_tiles_eta + ieta - 1),
            Some(up * self.n_tiles_eta + ieta),
            eta_up.map(|e| up * self.n_tiles_eta + e),
        ]
        .into_iter()
        .flatten()
    }
}

/// The grid state: one list head and one transient tag per tile
///
/// The intra-tile lists are doubly linked through the jet records held
/// by the tiled strategy; the grid only stores the heads.
#[derive(Clone, Debug)]
pub(crate) struct Tiling {
    pub(crate) setup: TilingDef,
    pub(crate) heads: Vec<Option<usize>>,
    pub(crate) tags: Vec<bool>,
}

impl Tiling {
    pub(crate) fn new(setup: TilingDef) -> Self {
        let n_tiles = setup.n_tiles();
        Self {
            setup,
            heads: vec![None; n_tiles],
            tags: vec![false; n_tiles],
        }
    }
}

/// Rapidity extent covered by regular-size tiles
///
/// Sparsely populated extremes are cut off and folded into the
/// open-ended edge bins, keeping the per-tile occupancy flat.
fn determine_rapidity_extent(eta: &[N64]) -> (N64, N64) {
    if eta.is_empty() {
        return (n64(0.), n64(0.));
    }
    const NRAP: usize = 20;
    const NBINS: usize = 2 * NRAP;

    let mut counts = [0usize; NBINS];
    let mut minrap = n64(f64::MAX);
    let mut maxrap = n64(-f64::MAX);
    for &y in eta {
        minrap = min(minrap, y);
        maxrap = max(maxrap, y);
        let ibin = (f64::from(y) + NRAP as f64).floor() as i64;
        counts[ibin.clamp(0, NBINS as i64 - 1) as usize] += 1;
    }

    let max_in_bin = counts.iter().copied().max().unwrap();
    let allowed_max_cumul = n64(
        (max_in_bin as f64 * ALLOWED_MAX_FRACTION)
            .max(MIN_MULTIPLICITY)
            .floor()
            .min(max_in_bin as f64),
    );

    let mut cumul = n64(0.);
    for (ibin, &c) in counts.iter().enumerate() {
        cumul += n64(c as f64);
        if cumul >= allowed_max_cumul {
            minrap = max(minrap, n64(ibin as f64 - NRAP as f64));
            break;
        }
    }
    let mut cumul = n64(0.);
    for (ibin, &c) in counts.iter().enumerate().rev() {
        cumul += n64(c as f64);
        if cumul >= allowed_max_cumul {
            maxrap = min(maxrap, n64(ibin as f64 - NRAP as f64 + 1.));
            break;
        }
    }

    // extreme rapidities end up in the edge tiles
    let lo = n64(-(NRAP as f64) - 1.);
    let hi = n64(NRAP as f64 + 1.);
    let minrap = minrap.max(lo).min(hi);
    let maxrap = maxrap.max(minrap).min(hi);
    (minrap, maxrap)
}
