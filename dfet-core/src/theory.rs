//! The dielectric-theory identifier shared between the CLI parser and the solver dispatch.

use crate::error::Error;

/// A dielectric theory this crate can solve for.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Theory {
    /// Random phase approximation: `G = 0` identically.
    Rpa,
    /// Singwi-Tosi-Land-Sjolander, classical closure.
    Stls,
    /// STLS with the hypernetted-chain bridge correction.
    StlsHnc,
    /// STLS with the Ichimaru-Ogawa-Ichikawa bridge mapping.
    StlsIoi,
    /// STLS with the Lado-Chakravarty-Tolias bridge mapping.
    StlsLct,
    /// Quantum STLS.
    Qstls,
    /// Quantum STLS with the hypernetted-chain bridge correction.
    QstlsHnc,
    /// Quantum STLS with the Ichimaru-Ogawa-Ichikawa bridge mapping.
    QstlsIoi,
    /// Quantum STLS with the Lado-Chakravarty-Tolias bridge mapping.
    QstlsLct,
    /// Variational-self-consistent STLS: a CSR outer loop on top of STLS.
    VsStls,
    /// Variational-self-consistent quantum STLS.
    QvsStls,
    /// Effective static approximation: a non-iterative closure fit.
    Esa,
}

impl Theory {
    /// Whether this theory requires the quantum (qSTLS-family) auxiliary response of
    /// component F, as opposed to the classical STLS closure of component E alone.
    #[must_use]
    pub const fn is_quantum(self) -> bool {
        matches!(
            self,
            Self::Qstls | Self::QstlsHnc | Self::QstlsIoi | Self::QstlsLct | Self::QvsStls
        )
    }

    /// Whether this theory applies an IET bridge-function correction.
    #[must_use]
    pub const fn is_iet(self) -> bool {
        matches!(
            self,
            Self::StlsHnc
                | Self::StlsIoi
                | Self::StlsLct
                | Self::QstlsHnc
                | Self::QstlsIoi
                | Self::QstlsLct
        )
    }

    /// Whether this theory wraps its inner scheme in the VS-STLS CSR outer loop.
    #[must_use]
    pub const fn is_variational(self) -> bool {
        matches!(self, Self::VsStls | Self::QvsStls)
    }

    /// The lower-case-with-underscores label used in file names and cache headers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rpa => "rpa",
            Self::Stls => "stls",
            Self::StlsHnc => "stls_hnc",
            Self::StlsIoi => "stls_ioi",
            Self::StlsLct => "stls_lct",
            Self::Qstls => "qstls",
            Self::QstlsHnc => "qstls_hnc",
            Self::QstlsIoi => "qstls_ioi",
            Self::QstlsLct => "qstls_lct",
            Self::VsStls => "vsstls",
            Self::QvsStls => "qvsstls",
            Self::Esa => "esa",
        }
    }
}

impl std::str::FromStr for Theory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rpa" => Ok(Self::Rpa),
            "stls" => Ok(Self::Stls),
            "stls-hnc" => Ok(Self::StlsHnc),
            "stls-ioi" => Ok(Self::StlsIoi),
            "stls-lct" => Ok(Self::StlsLct),
            "qstls" => Ok(Self::Qstls),
            "qstls-hnc" => Ok(Self::QstlsHnc),
            "qstls-ioi" => Ok(Self::QstlsIoi),
            "qstls-lct" => Ok(Self::QstlsLct),
            "vsstls" => Ok(Self::VsStls),
            "qvsstls" => Ok(Self::QvsStls),
            "esa" => Ok(Self::Esa),
            other => Err(Error::Config(format!("unknown theory '{other}'"))),
        }
    }
}

impl std::fmt::Display for Theory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Rpa => "rpa",
            Self::Stls => "stls",
            Self::StlsHnc => "stls-hnc",
            Self::StlsIoi => "stls-ioi",
            Self::StlsLct => "stls-lct",
            Self::Qstls => "qstls",
            Self::QstlsHnc => "qstls-hnc",
            Self::QstlsIoi => "qstls-ioi",
            Self::QstlsLct => "qstls-lct",
            Self::VsStls => "vsstls",
            Self::QvsStls => "qvsstls",
            Self::Esa => "esa",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant_through_its_display_form() {
        let all = [
            Theory::Rpa,
            Theory::Stls,
            Theory::StlsHnc,
            Theory::StlsIoi,
            Theory::StlsLct,
            Theory::Qstls,
            Theory::QstlsHnc,
            Theory::QstlsIoi,
            Theory::QstlsLct,
            Theory::VsStls,
            Theory::QvsStls,
            Theory::Esa,
        ];
        for theory in all {
            let s = theory.to_string();
            assert_eq!(s.parse::<Theory>().unwrap(), theory);
        }
    }

    #[test]
    fn classifies_quantum_and_iet_flags_correctly() {
        assert!(Theory::Qstls.is_quantum());
        assert!(!Theory::Stls.is_quantum());
        assert!(Theory::StlsHnc.is_iet());
        assert!(!Theory::Stls.is_iet());
        assert!(Theory::VsStls.is_variational());
        assert!(!Theory::Stls.is_variational());
    }

    #[test]
    fn rejects_unknown_theory_name() {
        assert!("bogus".parse::<Theory>().is_err());
    }

    #[test]
    fn accepts_the_documented_uppercase_spelling() {
        assert_eq!("STLS".parse::<Theory>().unwrap(), Theory::Stls);
        assert_eq!("RPA".parse::<Theory>().unwrap(), Theory::Rpa);
        assert_eq!("QSTLS".parse::<Theory>().unwrap(), Theory::Qstls);
        assert_eq!("QSTLS-HNC".parse::<Theory>().unwrap(), Theory::QstlsHnc);
        assert_eq!("VSSTLS".parse::<Theory>().unwrap(), Theory::VsStls);
    }
}
