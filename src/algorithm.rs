use std::fmt;

/// Members of the generalised-kt family of jet clustering algorithms
///
/// The hadron-collider members measure distances in (rapidity, φ) on a
/// cylinder, the e+e- members in 3D direction space. Each algorithm
/// either fixes the kt power p or requires it as an explicit parameter.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum JetAlgorithm {
    /// kt algorithm, p = 1
    Kt,
    /// anti-kt algorithm, p = -1
    AntiKt,
    /// Cambridge/Aachen algorithm, p = 0
    CambridgeAachen,
    /// Generalised kt algorithm with explicit power
    GenKt,
    /// Generalised e+e- kt algorithm with explicit power
    EEKt,
    /// Durham algorithm, p = 1
    Durham,
}

impl JetAlgorithm {
    /// The kt power fixed by the algorithm, if any
    pub fn fixed_power(&self) -> Option<f64> {
        match self {
            Self::Kt | Self::Durham => Some(1.),
            Self::AntiKt => Some(-1.),
            Self::CambridgeAachen => Some(0.),
            Self::GenKt | Self::EEKt => None,
        }
    }

    /// Whether this algorithm clusters in hadron-collider (y, φ) geometry
    pub fn is_hadronic(&self) -> bool {
        matches!(
            self,
            Self::Kt | Self::AntiKt | Self::CambridgeAachen | Self::GenKt
        )
    }

    /// Whether this algorithm clusters in e+e- direction geometry
    pub fn is_ee(&self) -> bool {
        !self.is_hadronic()
    }
}

impl fmt::Display for JetAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Kt => "kt",
            Self::AntiKt => "anti-kt",
            Self::CambridgeAachen => "Cambridge/Aachen",
            Self::GenKt => "generalised kt",
            Self::EEKt => "ee kt",
            Self::Durham => "Durham",
        };
        f.write_str(name)
    }
}

/// Nearest-neighbour maintenance strategy used for a cluster sequence
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Strategy {
    /// Tiled (y, φ) grid with intra-tile linked lists
    N2Tiled,
    /// Plain structure-of-arrays scan
    N2Plain,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::N2Tiled => "tiled",
            Self::N2Plain => "plain",
        };
        f.write_str(name)
    }
}
