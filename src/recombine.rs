use crate::pseudojet::PseudoJet;

/// Recombination scheme merging two pseudojets into one
///
/// Implementations must return a jet carrying the given
/// `cluster_hist_index`. Plain closures taking two pseudojets work as
/// well; the history index is attached afterwards.
pub trait Recombine {
    /// Merge `a` and `b` into a new pseudojet
    fn recombine(
        &self,
        a: &PseudoJet,
        b: &PseudoJet,
        cluster_hist_index: usize,
    ) -> PseudoJet;
}

/// Four-momentum addition (E scheme), the default recombiner
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct EScheme;

impl Recombine for EScheme {
    fn recombine(
        &self,
        a: &PseudoJet,
        b: &PseudoJet,
        cluster_hist_index: usize,
    ) -> PseudoJet {
        let mut jet = *a + *b;
        jet.set_cluster_hist_index(cluster_hist_index);
        jet
    }
}

impl<F> Recombine for F
where
    F: Fn(&PseudoJet, &PseudoJet) -> PseudoJet,
{
    fn recombine(
        &self,
        a: &PseudoJet,
        b: &PseudoJet,
        cluster_hist_index: usize,
    ) -> PseudoJet {
        let mut jet = self(a, b);
        jet.set_cluster_hist_index(cluster_hist_index);
        jet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pseudojet::pseudojet_f;

    #[test]
    fn e_scheme_adds_momenta() {
        let a = pseudojet_f(3., 1., 0., 2.);
        let b = pseudojet_f(5., -1., 2., 3.);
        let jet = EScheme.recombine(&a, &b, 7);
        assert_eq!(jet.e(), 8.);
        assert_eq!(jet.px(), 0.);
        assert_eq!(jet.py(), 2.);
        assert_eq!(jet.pz(), 5.);
        assert_eq!(jet.cluster_hist_index(), 7);
    }

    #[test]
    fn closures_recombine() {
        // winner-takes-all: keep the harder momentum, sum the energies
        let wta = |a: &PseudoJet, b: &PseudoJet| {
            let hard = if a.pt2() > b.pt2() { a } else { b };
            crate::pseudojet::pseudojet(a.e() + b.e(), hard.px(), hard.py(), hard.pz())
        };
        let a = pseudojet_f(3., 1., 0., 0.);
        let b = pseudojet_f(5., -2., 1., 0.);
        let jet = wta.recombine(&a, &b, 3);
        assert_eq!(jet.e(), 8.);
        assert_eq!(jet.px(), -2.);
        assert_eq!(jet.cluster_hist_index(), 3);
    }
}
