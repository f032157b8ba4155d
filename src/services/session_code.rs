//! Short, human-typed session codes.

use rand::Rng;

use crate::{
    dto::validation::{MAX_CODE_LENGTH, MIN_CODE_LENGTH, validate_session_code},
    error::ServiceError,
};

/// Characters used in generated codes; look-alikes (0/O, 1/I/L) are left out.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Draw a random code of `length` characters (clamped to the accepted range).
pub fn generate<R: Rng + ?Sized>(length: usize, rng: &mut R) -> String {
    let length = length.clamp(MIN_CODE_LENGTH, MAX_CODE_LENGTH);
    (0..length)
        .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
        .collect()
}

/// Canonical form of a code typed by a user: trimmed and upper-cased.
pub fn normalize(code: &str) -> Result<String, ServiceError> {
    validate_session_code(code)
        .map_err(|err| ServiceError::InvalidInput(format!("invalid session code `{code}`: {err}")))?;
    Ok(code.trim().to_ascii_uppercase())
}

/// Key under which a client keeps its player id for a session.
pub fn identity_key(code: &str) -> String {
    format!("hotseat-player-{code}")
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn generated_codes_use_the_alphabet() {
        let mut rng = StdRng::seed_from_u64(3);
        for length in [1, 4, 5, 6, 9] {
            let code = generate(length, &mut rng);
            assert_eq!(code.len(), length.clamp(4, 6));
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn normalize_uppercases_and_validates() {
        assert_eq!(normalize(" ab3k ").unwrap(), "AB3K");
        assert!(matches!(
            normalize("ab"),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn identity_key_is_per_session() {
        assert_eq!(identity_key("WXYZ"), "hotseat-player-WXYZ");
    }
}
