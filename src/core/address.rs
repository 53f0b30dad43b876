//! Contract address validation

use crate::error::ValidationError;

/// Length of the contract addresses the bot accepts
pub const CONTRACT_ADDRESS_LEN: usize = 44;

/// True when `text` decodes under the Bitcoin/Solana base-58 alphabet
pub fn is_base58(text: &str) -> bool {
    bs58::decode(text).into_vec().is_ok()
}

/// Accept exactly `expected_len` base-58 characters; surrounding whitespace
/// is trimmed before checking
pub fn validate_contract_address(raw: &str, expected_len: usize) -> Result<&str, ValidationError> {
    let address = raw.trim();
    if address.chars().count() != expected_len || !is_base58(address) {
        return Err(ValidationError::BadAddress(raw.to_string()));
    }
    Ok(address)
}
