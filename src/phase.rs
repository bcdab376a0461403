use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

/// External marketplace the page links to once the public sale opens.
pub const MARKETPLACE_URL: &str = "https://lfj.gg/avalanche/trade";

/// Lifecycle stage reported by the presale contract. Ordered and never
/// advanced locally.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PresalePhase {
    #[default]
    Presale,
    SeedLiquidity,
    Airdrop,
    WhitelistIdo,
    PublicSale,
}

impl PresalePhase {
    pub const ALL: [PresalePhase; 5] = [
        PresalePhase::Presale,
        PresalePhase::SeedLiquidity,
        PresalePhase::Airdrop,
        PresalePhase::WhitelistIdo,
        PresalePhase::PublicSale,
    ];

    pub fn from_raw(raw: u64) -> Option<Self> {
        Self::ALL.get(usize::try_from(raw).ok()?).copied()
    }

    pub fn as_raw(self) -> u64 {
        match self {
            PresalePhase::Presale => 0,
            PresalePhase::SeedLiquidity => 1,
            PresalePhase::Airdrop => 2,
            PresalePhase::WhitelistIdo => 3,
            PresalePhase::PublicSale => 4,
        }
    }

    /// Heading shown by the presale page for this phase.
    pub fn label(self) -> &'static str {
        match self {
            PresalePhase::Presale => "$BRO PRESALE",
            PresalePhase::SeedLiquidity => "$BRO SEED LP",
            PresalePhase::Airdrop => "$BRO AIRDROP",
            PresalePhase::WhitelistIdo => "$BRO WHITELISTED IDO",
            PresalePhase::PublicSale => "$BRO PUBLIC SALE",
        }
    }

    /// Where to buy instead of using an in-page action.
    pub fn marketplace_url(self) -> Option<&'static str> {
        match self {
            PresalePhase::PublicSale => Some(MARKETPLACE_URL),
            _ => None,
        }
    }
}

impl fmt::Display for PresalePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
