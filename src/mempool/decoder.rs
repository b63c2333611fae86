//! Mempool Filter: Calldata Decoder
//!
//! Purpose:
//!     Recognise the watched router call in a pending transaction's input and
//!     extract its parameters.
//!
//! Matching:
//!     A payload is a candidate only if it is exactly 4 + 8*32 = 260 bytes,
//!     i.e. a selector followed by one static 8-word tuple. The selector itself
//!     is not checked by default, so any call with the same encoded size is
//!     decoded too. `decode_swap_strict` additionally pins the selector to
//!     exactOutputSingle (0xdb3e2198).
//!
//! Dependencies:
//!     - alloy (sol-types validating decoder)

use alloy::sol_types::SolCall;
use thiserror::Error;

use super::types::DecodedSwapParams;
use crate::contracts::ISwapRouter;

pub const SELECTOR_LEN: usize = 4;

/// Selector + (address, address, uint24, address, uint256, uint256, uint256, uint160)
pub const EXPECTED_PAYLOAD_LEN: usize = SELECTOR_LEN + 8 * 32;

/// exactOutputSingle((address,address,uint24,address,uint256,uint256,uint256,uint160))
pub const EXACT_OUTPUT_SINGLE: [u8; 4] = ISwapRouter::exactOutputSingleCall::SELECTOR;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("abi layout mismatch: {0}")]
    Abi(#[from] alloy::sol_types::Error),
    #[error("unexpected selector {found}")]
    SelectorMismatch { found: String },
}

impl From<ISwapRouter::ExactOutputSingleParams> for DecodedSwapParams {
    fn from(p: ISwapRouter::ExactOutputSingleParams) -> Self {
        Self {
            tokens: [p.tokenIn, p.tokenOut],
            fee: p.fee.to::<u32>(),
            recipient: p.recipient,
            deadline: p.deadline,
            amount_out: p.amountOut,
            amount_in_maximum: p.amountInMaximum,
            sqrt_price_limit_x96: p.sqrtPriceLimitX96,
        }
    }
}

/// Decode a payload by shape only.
///
/// Returns `Ok(None)` when the length does not match (not this call),
/// `Err` when the length matches but the words are not a valid tuple.
pub fn decode_swap(input: &[u8]) -> Result<Option<DecodedSwapParams>, DecodeError> {
    if input.len() != EXPECTED_PAYLOAD_LEN {
        return Ok(None);
    }

    let call = ISwapRouter::exactOutputSingleCall::abi_decode_raw_validate(&input[SELECTOR_LEN..])?;
    Ok(Some(call.params.into()))
}

/// Like `decode_swap`, but a right-sized payload with a foreign selector is
/// rejected with `DecodeError::SelectorMismatch`.
pub fn decode_swap_strict(input: &[u8]) -> Result<Option<DecodedSwapParams>, DecodeError> {
    if input.len() != EXPECTED_PAYLOAD_LEN {
        return Ok(None);
    }
    if input[..SELECTOR_LEN] != EXACT_OUTPUT_SINGLE {
        return Err(DecodeError::SelectorMismatch {
            found: selector_hex(input),
        });
    }
    decode_swap(input)
}

/// Return the 4-byte selector as a hex string for logging
pub fn selector_hex(input: &[u8]) -> String {
    if input.len() < SELECTOR_LEN {
        return "0x????".to_string();
    }
    format!("0x{:02x}{:02x}{:02x}{:02x}", input[0], input[1], input[2], input[3])
}
