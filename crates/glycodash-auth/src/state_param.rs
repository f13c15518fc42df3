use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;

/// Generates a random `state` parameter for the authorize request.
///
/// Returns a 22-character URL-safe string (16 random bytes → base64url).
#[must_use]
pub fn generate_state() -> String {
    let random_bytes: [u8; 16] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(random_bytes)
}
