use serde::{Deserialize, Serialize};

use crate::types::OvercapPolicy;

/// ledger configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LedgerConfig {
    /// what to do with abonos exceeding the remaining balance
    pub overcap_policy: OvercapPolicy,
}

impl LedgerConfig {
    /// clip over-cap abonos at the final amount (the default)
    pub fn clipping() -> Self {
        Self {
            overcap_policy: OvercapPolicy::Clip,
        }
    }

    /// reject over-cap abonos instead of clipping
    pub fn strict() -> Self {
        Self {
            overcap_policy: OvercapPolicy::Reject,
        }
    }
}
