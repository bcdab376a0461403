use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    str::FromStr,
};
use thiserror::Error;

/// Decimal places of the native currency (wei-style smallest unit).
pub const NATIVE_DECIMALS: u32 = 18;
const ONE_UNIT: u128 = 10u128.pow(NATIVE_DECIMALS);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("'{0}' is not a decimal amount")]
    Invalid(String),
    #[error("'{0}' has more than {} decimal places", NATIVE_DECIMALS)]
    TooPrecise(String),
    #[error("'{0}' does not fit in 128 bits")]
    Overflow(String),
    #[error("'{0}' is not a hex encoded integer")]
    InvalidHex(String),
}

/// A quantity held exactly as a count of smallest units.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_base_units(units: u128) -> Self {
        Self(units)
    }

    pub const fn base_units(self) -> u128 {
        self.0
    }

    pub const fn from_whole(units: u64) -> Self {
        Self(units as u128 * ONE_UNIT)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    /// Parses a `0x`-prefixed big-endian integer of smallest units, as returned
    /// by a JSON-RPC balance query.
    pub fn from_hex(raw: &str) -> Result<Self, AmountError> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.is_empty() {
            return Err(AmountError::InvalidHex(raw.to_string()));
        }
        let padded = if digits.len() % 2 == 1 {
            format!("0{digits}")
        } else {
            digits.to_string()
        };
        let bytes =
            hex::decode(&padded).map_err(|_| AmountError::InvalidHex(raw.to_string()))?;
        let significant: Vec<u8> = bytes.into_iter().skip_while(|b| *b == 0).collect();
        if significant.len() > 16 {
            return Err(AmountError::Overflow(raw.to_string()));
        }
        let value = significant
            .iter()
            .fold(0u128, |acc, byte| (acc << 8) | u128::from(*byte));
        Ok(Self(value))
    }

    /// Renders the amount rounded half-up to `decimals` places, always printing
    /// exactly that many fractional digits.
    pub fn display_rounded(self, decimals: u32) -> String {
        let decimals = decimals.min(NATIVE_DECIMALS);
        let scale = 10u128.pow(NATIVE_DECIMALS - decimals);
        let mut scaled = self.0 / scale;
        if scale > 1 && self.0 % scale >= scale / 2 {
            scaled += 1;
        }
        if decimals == 0 {
            return scaled.to_string();
        }
        let divisor = 10u128.pow(decimals);
        format!(
            "{}.{:0width$}",
            scaled / divisor,
            scaled % divisor,
            width = decimals as usize
        )
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / ONE_UNIT;
        let fraction = self.0 % ONE_UNIT;
        if fraction == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{:0width$}", fraction, width = NATIVE_DECIMALS as usize);
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AmountError::Empty);
        }
        let (whole, fraction) = match trimmed.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (trimmed, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(AmountError::Invalid(raw.to_string()));
        }
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole) || !all_digits(fraction) {
            return Err(AmountError::Invalid(raw.to_string()));
        }
        if fraction.len() > NATIVE_DECIMALS as usize {
            return Err(AmountError::TooPrecise(raw.to_string()));
        }

        let overflow = || AmountError::Overflow(raw.to_string());
        let whole_units = if whole.is_empty() {
            0
        } else {
            whole.parse::<u128>().map_err(|_| overflow())?
        };
        let fraction_units = if fraction.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", fraction, width = NATIVE_DECIMALS as usize);
            padded.parse::<u128>().map_err(|_| overflow())?
        };
        whole_units
            .checked_mul(ONE_UNIT)
            .and_then(|units| units.checked_add(fraction_units))
            .map(Amount)
            .ok_or_else(overflow)
    }
}
