//! Sequential jet clustering for hadron-collider and e+e- geometries.
//!
//! The following members of the generalised-kt family are implemented:
//!
//! - [anti-kt](https://arxiv.org/abs/0802.1189)
//! - [Cambridge](https://arxiv.org/abs/hep-ph/9707323)/[Aachen](https://arxiv.org/abs/hep-ph/9907280)
//! - [kt](https://arxiv.org/abs/hep-ph/9305266)
//! - Generalised kt
//! - [Durham](https://inspirehep.net/literature/317695)
//! - Generalised e+e- kt
//!
//! The hadron-collider algorithms run on a tiled (rapidity, φ) grid,
//! the e+e- algorithms on a plain structure-of-arrays engine in
//! direction space. Both return the full [ClusterSequence] with every
//! intermediate jet and the complete clustering history.
//!
//! For state-of-the-art implementations of many more jet algorithms,
//! have a look at the excellent [fastjet](http://fastjet.fr/) library.
//!
//! # Examples
//!
//! Cluster a number of partons into jets using the anti-kt algorithm
//! with radius 0.4:
//!
//! ```rust
//! use jetrec::{pseudojet_f, tiled_reconstruct, JetAlgorithm};
//!
//! let partons = vec![
//!     pseudojet_f(0.2626773221934335, -0.08809521946454194, -0.1141608706693822, -0.2195584284654444),
//!     pseudojet_f(2.21902459329915, -0.7529973704809976, -0.9658189214109036, -1.850475321845671)
//! ];
//!
//! let seq = tiled_reconstruct(&partons, JetAlgorithm::AntiKt, None, 0.4)?;
//!
//! // both partons end up in a single jet
//! assert_eq!(seq.inclusive_jets(0.).len(), 1);
//!
//! // no jet has at least 40 GeV
//! assert!(seq.inclusive_jets(40.).is_empty());
//!
//! // the history records the merge and the beam step
//! assert_eq!(seq.history().len(), 4);
//! # Ok::<(), jetrec::ClusterError>(())
//! ```
/// Algorithm and strategy tags
pub mod algorithm;
/// Jet clustering strategies
pub mod cluster;
/// Cluster sequences and their history
pub mod history;
/// Pseudojets
pub mod pseudojet;
/// Recombination schemes
pub mod recombine;

#[cfg(test)]
mod test_data;

pub use algorithm::{JetAlgorithm, Strategy};
pub use cluster::{
    ee_reconstruct, ee_reconstruct_with, tiled_reconstruct,
    tiled_reconstruct_with, ClusterError,
};
pub use history::{Ancestor, ClusterSequence, HistoryElement};
pub use pseudojet::{pseudojet, pseudojet_f, PseudoJet};
pub use recombine::{EScheme, Recombine};
