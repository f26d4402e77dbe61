use rand::Rng;

pub const PICKUP_CODE_LEN: usize = 6;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub fn generate_pickup_code() -> String {
    let mut rng = rand::thread_rng();
    (0..PICKUP_CODE_LEN)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// Compares a code typed at handoff against the stored one. Customers read
/// codes aloud, so case and surrounding whitespace are ignored.
pub fn code_matches(stored: &str, supplied: &str) -> bool {
    stored.eq_ignore_ascii_case(supplied.trim())
}

#[cfg(test)]
mod tests {
    use super::{code_matches, generate_pickup_code, PICKUP_CODE_LEN};

    #[test]
    fn generated_codes_are_six_uppercase_alphanumerics() {
        for _ in 0..100 {
            let code = generate_pickup_code();
            assert_eq!(code.len(), PICKUP_CODE_LEN);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn match_ignores_case_and_padding() {
        assert!(code_matches("AB12CD", " ab12cd "));
        assert!(!code_matches("AB12CD", "AB12CE"));
        assert!(!code_matches("AB12CD", ""));
    }
}
