use crate::error::{AdapterResult, BridgeError};
use ethers_core::types::{Address, H160, H256, U256};
use ethers_core::utils::{format_units, parse_units};

/// Sentinel some vendors use in place of the zero address for the native asset.
pub const NATIVE_PLACEHOLDER: Address = H160([0xee; 20]);

pub const NATIVE_DECIMALS: u32 = 18;

/// Every integer with at most this many decimal digits fits in a `U256`.
const MAX_UINT_DIGITS: usize = 77;

pub fn is_native_token(address: Address) -> bool {
    address.is_zero() || address == NATIVE_PLACEHOLDER
}

pub fn parse_address(field: &str, raw: &str) -> AdapterResult<Address> {
    let trimmed = raw.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| {
            BridgeError::Validation(format!("{field} must be a 0x-prefixed address, got {raw:?}"))
        })?;
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(BridgeError::Validation(format!(
            "{field} is not a well-formed address: {raw:?}"
        )));
    }
    hex.parse::<Address>()
        .map_err(|e| BridgeError::Validation(format!("{field} is not a valid address: {e}")))
}

/// Converts a human decimal amount into minimal units. Without decimals the
/// amount must already be an integer count of minimal units.
pub fn to_minimal_units(amount: &str, decimals: Option<u32>) -> AdapterResult<U256> {
    let trimmed = amount.trim();
    let well_formed = !trimmed.is_empty()
        && trimmed != "."
        && trimmed.matches('.').count() <= 1
        && trimmed.chars().all(|c| c.is_ascii_digit() || c == '.');
    if !well_formed {
        return Err(BridgeError::Validation(format!(
            "amount must be a positive decimal, got {amount:?}"
        )));
    }

    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    let units = match decimals {
        Some(decimals) => {
            if fraction.len() > decimals as usize {
                return Err(BridgeError::Validation(format!(
                    "amount {trimmed} has more than {decimals} fractional digits"
                )));
            }
            let significant = whole.trim_start_matches('0').len();
            if significant + decimals as usize > MAX_UINT_DIGITS {
                return Err(BridgeError::Validation(format!(
                    "amount {trimmed} does not fit in 256 bits at {decimals} decimals"
                )));
            }
            parse_units(trimmed, decimals)
                .map(U256::from)
                .map_err(|e| BridgeError::Validation(format!("amount {trimmed} out of range: {e}")))?
        }
        None => {
            if trimmed.contains('.') {
                return Err(BridgeError::Validation(format!(
                    "amount {trimmed} is fractional but token decimals are unknown"
                )));
            }
            U256::from_dec_str(trimmed)
                .map_err(|e| BridgeError::Validation(format!("amount {trimmed} out of range: {e}")))?
        }
    };

    if units.is_zero() {
        return Err(BridgeError::Validation(
            "amount must be greater than zero".to_string(),
        ));
    }
    Ok(units)
}

/// Human decimal rendering without trailing zeros, e.g. `1000000` at 6 → `"1"`.
pub fn to_decimal_string(units: U256, decimals: u32) -> AdapterResult<String> {
    let formatted = format_units(units, decimals)
        .map_err(|e| BridgeError::Validation(format!("cannot format amount {units}: {e}")))?;
    if !formatted.contains('.') {
        return Ok(formatted);
    }
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    Ok(trimmed.to_string())
}

/// Left-pads an address into a 32-byte word.
pub fn address_to_bytes32(address: Address) -> H256 {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    H256(word)
}

pub fn address_from_word(word: H256) -> Address {
    Address::from_slice(&word.as_bytes()[12..])
}
