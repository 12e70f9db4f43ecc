//! Local session token generation

use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::{SessionError, SessionResult};

/// Number of random bytes behind a token (128 bits).
pub const TOKEN_BYTES: usize = 16;

/// Length of the hex-encoded token.
pub const TOKEN_LEN: usize = TOKEN_BYTES * 2;

/// Generate a new local session token
///
/// Draws [`TOKEN_BYTES`] bytes straight from the operating system and encodes
/// them as lowercase hex. There is no fallback generator: when the OS source
/// fails the error is returned to the caller.
pub fn generate() -> SessionResult<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(SessionError::EntropyUnavailable)?;

    Ok(bytes.iter().map(|b| format!("{b:02x}")).collect())
}
