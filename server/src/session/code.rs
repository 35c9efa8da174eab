use rand::RngCore;

const SESSION_CODE_BYTES: usize = 32;

/// Generate an opaque session code: 32 bytes from the thread-local CSPRNG, hex encoded.
///
/// Hex keeps the code safe to drop into a query string without escaping.
pub fn generate_session_code() -> String {
    let mut bytes = [0u8; SESSION_CODE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);

    hex::encode(bytes)
}
