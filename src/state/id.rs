//! Opaque identifier generation.
//!
//! Sessions and participants are identified by short, human-shareable
//! tokens. Tokens are uppercase hex drawn from the OS-seeded CSPRNG, so
//! they are unguessable but easy to read over voice chat.

use rand::Rng;

/// Identifier length in hex characters.
pub const ID_LEN: usize = 6;

/// Generate a fresh identifier: `ID_LEN` uppercase hex characters from
/// `ID_LEN / 2` bytes of cryptographically strong randomness.
///
/// Collisions are possible at 24 bits of entropy but negligible at the
/// expected session count; the store does not detect them.
pub fn generate_id() -> String {
    let mut bytes = [0u8; ID_LEN / 2];
    rand::rng().fill(&mut bytes[..]);
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

/// Check that a string has the shape of a generated identifier.
pub fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
}
