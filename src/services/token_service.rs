use rand::{Rng, rngs::OsRng};

pub const ROOM_ID_LEN: usize = 16;
pub const SESSION_TOKEN_LEN: usize = 64;

const ROOM_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Issues shareable room ids and session tokens. Both act as capabilities, so both draw
/// from the OS CSPRNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokenService;

impl TokenService {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Generates a 16-character room id from lowercase letters and digits.
    #[must_use]
    pub fn generate_room_id(&self) -> String {
        Self::sample(ROOM_ALPHABET, ROOM_ID_LEN)
    }

    /// Generates a `length`-character alphanumeric token for use as a session identity.
    #[must_use]
    pub fn generate_secure_token(&self, length: usize) -> String {
        Self::sample(TOKEN_ALPHABET, length)
    }

    fn sample(alphabet: &[u8], length: usize) -> String {
        let mut rng = OsRng;
        (0..length).map(|_| char::from(alphabet[rng.gen_range(0..alphabet.len())])).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_room_id_shape() {
        let service = TokenService::new();
        let id = service.generate_room_id();
        assert_eq!(id.len(), ROOM_ID_LEN);
        assert!(id.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
    }

    #[test]
    fn test_secure_token_length_and_alphabet() {
        let service = TokenService::new();
        for len in [0, 1, 32, SESSION_TOKEN_LEN] {
            let token = service.generate_secure_token(len);
            assert_eq!(token.len(), len);
            assert!(token.bytes().all(|b| b.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_generated_values_do_not_collide() {
        let service = TokenService::new();
        let rooms: HashSet<_> = (0..1000).map(|_| service.generate_room_id()).collect();
        assert_eq!(rooms.len(), 1000);

        let tokens: HashSet<_> = (0..1000).map(|_| service.generate_secure_token(SESSION_TOKEN_LEN)).collect();
        assert_eq!(tokens.len(), 1000);
    }
}
