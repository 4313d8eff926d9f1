use ethers::types::U256;
use ethers::utils::{format_units, parse_units};

use crate::error::AmountError;

/// Convert a decimal string such as `"1.5"` into the token's integer amount.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    parse_units(amount, u32::from(decimals))
        .map(U256::from)
        .map_err(|e| AmountError {
            amount: amount.to_owned(),
            reason: e.to_string(),
        })
}

/// Render an integer amount with the token's decimal scale. Trailing zeros
/// of the fraction are dropped.
pub fn to_display_units(amount: U256, decimals: u8) -> String {
    let Ok(formatted) = format_units(amount, u32::from(decimals)) else {
        return amount.to_string();
    };
    if !formatted.contains('.') {
        return formatted;
    }
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_amounts() {
        assert_eq!(
            to_base_units("1.5", 18).unwrap(),
            U256::from(1_500_000_000_000_000_000u128)
        );
        assert_eq!(to_base_units("100", 6).unwrap(), U256::from(100_000_000u64));
    }

    #[test]
    fn rejects_garbage() {
        let err = to_base_units("one", 18).unwrap_err();
        assert_eq!(err.amount, "one");
    }

    #[test]
    fn displays_without_trailing_zeros() {
        assert_eq!(
            to_display_units(U256::from(1_500_000_000_000_000_000u128), 18),
            "1.5"
        );
        assert_eq!(to_display_units(U256::from(100_000_000u64), 6), "100");
    }
}
