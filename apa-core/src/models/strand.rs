use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ApaCoreError;

///
/// Transcription strand of a site. `Forward` orders before `Reverse`, which
/// is also the order in which per-strand groups are written to disk.
///
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Strand {
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
}

impl Strand {
    pub fn from_reverse_flag(is_reverse: bool) -> Self {
        if is_reverse {
            Strand::Reverse
        } else {
            Strand::Forward
        }
    }

    pub fn flipped(&self) -> Self {
        match self {
            Strand::Forward => Strand::Reverse,
            Strand::Reverse => Strand::Forward,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

impl Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Strand {
    type Err = ApaCoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            _ => Err(ApaCoreError::InvalidStrand(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("+", Strand::Forward)]
    #[case("-", Strand::Reverse)]
    fn test_parse_strand(#[case] symbol: &str, #[case] expected: Strand) {
        let strand: Strand = symbol.parse().unwrap();
        assert_eq!(strand, expected);
        assert_eq!(strand.to_string(), symbol);
    }

    #[rstest]
    fn test_invalid_strand() {
        assert!(".".parse::<Strand>().is_err());
    }

    #[rstest]
    fn test_flip_and_order() {
        assert_eq!(Strand::Forward.flipped(), Strand::Reverse);
        assert_eq!(Strand::Reverse.flipped(), Strand::Forward);
        assert!(Strand::Forward < Strand::Reverse);
        assert_eq!(Strand::from_reverse_flag(true), Strand::Reverse);
    }
}
