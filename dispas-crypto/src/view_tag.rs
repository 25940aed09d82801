//! View tag computation for efficient scanning.
//!
//! View tags enable recipients to quickly filter announcements:
//! - Each announcement includes a 1-byte view tag
//! - Recipients compute their expected view tag from the shared secret
//! - Only announcements with matching view tags get the full address check
//!
//! ## Efficiency
//!
//! With 1-byte view tags (256 possible values), ~99.6% of announcements
//! can skip the point addition and address hash.
//!
//! ## Security
//!
//! A view tag leaks 1 byte of the hashed shared secret, leaving 248 bits.
//! The tag alone cannot identify the recipient.

use subtle::ConstantTimeEq;

use crate::hash::keccak256;

/// Computes the view tag of a shared secret.
///
/// The view tag is the first byte of `keccak256(shared_secret)`, where the
/// shared secret is the compressed point `r·V`.
pub fn compute_view_tag(shared_secret: &[u8]) -> u8 {
    keccak256(shared_secret)[0]
}

/// Checks if a view tag matches the expected value for a shared secret.
///
/// This is a constant-time comparison to prevent timing attacks.
pub fn verify_view_tag(shared_secret: &[u8], expected_tag: u8) -> bool {
    view_tags_match(compute_view_tag(shared_secret), expected_tag)
}

/// Constant-time equality of two view tags.
pub fn view_tags_match(computed: u8, expected: u8) -> bool {
    computed.ct_eq(&expected).into()
}
