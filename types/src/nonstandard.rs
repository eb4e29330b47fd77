use strum::{AsRefStr, Display, EnumString};

/// The fork a state or block belongs to.
///
/// The fork schedule of this implementation ends at Bellatrix.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, AsRefStr, Display, EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Phase {
    Phase0,
    Altair,
    Bellatrix,
}

/// Verification status of the execution payload carried by a block.
///
/// Pre-Bellatrix blocks and blocks with the default payload are `Valid` vacuously.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PayloadStatus {
    Valid,
    Optimistic,
    Invalid,
}

impl PayloadStatus {
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }

    #[must_use]
    pub const fn is_optimistic(self) -> bool {
        matches!(self, Self::Optimistic)
    }

    #[must_use]
    pub const fn is_invalid(self) -> bool {
        matches!(self, Self::Invalid)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RelativeEpoch {
    Previous,
    Current,
    Next,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum AttestationEpoch {
    Previous,
    Current,
}

impl From<AttestationEpoch> for RelativeEpoch {
    fn from(attestation_epoch: AttestationEpoch) -> Self {
        match attestation_epoch {
            AttestationEpoch::Previous => Self::Previous,
            AttestationEpoch::Current => Self::Current,
        }
    }
}
