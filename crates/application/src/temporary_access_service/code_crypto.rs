use std::fmt::Write;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

use medgate_core::{AppError, AppResult};
use medgate_domain::{ACCESS_CODE_PREFIX, AccessCodeFormat};

const CODE_ENTROPY_BYTES: usize = 16;
const HINT_SUFFIX_CHARS: usize = 4;

/// Generates a random plaintext code with 128 bits of entropy.
///
/// Prefixed codes read `TAC-XXXXXXXXXXXXXXXX-XXXXXXXXXXXXXXXX`; URL-safe
/// codes are unpadded base64 of the random bytes.
pub(super) fn generate_code(format: AccessCodeFormat) -> AppResult<String> {
    let mut bytes = [0u8; CODE_ENTROPY_BYTES];
    getrandom::fill(&mut bytes).map_err(|error| {
        AppError::Internal(format!("failed to generate temporary access code: {error}"))
    })?;

    Ok(match format {
        AccessCodeFormat::Prefixed => {
            let hex = to_hex(&bytes).to_ascii_uppercase();
            let (first, second) = hex.split_at(hex.len() / 2);
            format!("{ACCESS_CODE_PREFIX}-{first}-{second}")
        }
        AccessCodeFormat::UrlSafe => URL_SAFE_NO_PAD.encode(bytes),
    })
}

/// Computes the SHA-256 hash of a plaintext code for storage and lookup.
pub(super) fn hash_code(code: &str) -> String {
    to_hex(&Sha256::digest(code.as_bytes()))
}

/// Returns a non-secret hint showing only the last characters of a code.
pub(super) fn code_hint(code: &str, format: AccessCodeFormat) -> String {
    let suffix_start = code
        .char_indices()
        .rev()
        .nth(HINT_SUFFIX_CHARS - 1)
        .map_or(0, |(index, _)| index);
    let suffix = &code[suffix_start..];

    match format {
        AccessCodeFormat::Prefixed => format!("{ACCESS_CODE_PREFIX}-…{suffix}"),
        AccessCodeFormat::UrlSafe => format!("…{suffix}"),
    }
}

/// Trims user input and restores the canonical case of prefixed codes.
pub(super) fn normalize_code(code: &str) -> String {
    let code = code.trim();
    let is_prefixed = code
        .get(..ACCESS_CODE_PREFIX.len() + 1)
        .is_some_and(|head| head.eq_ignore_ascii_case(&format!("{ACCESS_CODE_PREFIX}-")));

    if is_prefixed {
        code.to_ascii_uppercase()
    } else {
        code.to_owned()
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        })
}
