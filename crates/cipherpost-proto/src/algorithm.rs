//! Algorithm tags.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::FrameError;

/// Asymmetric cryptosystem a key or ciphertext belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Algorithm {
    /// Textbook RSA
    #[serde(rename = "RSA")]
    Rsa,
    /// Textbook ElGamal
    #[serde(rename = "ElGamal")]
    ElGamal,
}

impl Algorithm {
    /// All supported algorithms.
    pub const ALL: [Self; 2] = [Self::Rsa, Self::ElGamal];

    /// Literal wire tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
            Self::ElGamal => "ElGamal",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RSA" => Ok(Self::Rsa),
            "ElGamal" => Ok(Self::ElGamal),
            other => Err(FrameError::UnknownAlgorithm { tag: other.to_string() }),
        }
    }
}
