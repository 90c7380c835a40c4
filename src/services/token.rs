use rand::Rng;

/// Lookup tokens look like AUR-7MK2XQ: a fixed business prefix plus six
/// characters drawn from an alphabet with visually ambiguous characters
/// (0/O, 1/I/L) removed, so they survive being read over the phone.
pub const TOKEN_PREFIX: &str = "AUR";
const ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const SUFFIX_LEN: usize = 6;

pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{TOKEN_PREFIX}-{suffix}")
}

/// Shape check applied before any store lookup, so garbage input is
/// rejected without a round trip. Accepts any uppercase A-Z/2-9 suffix;
/// the alphabet restriction only matters at generation time.
pub fn is_well_formed(token: &str) -> bool {
    let Some(rest) = token.strip_prefix(TOKEN_PREFIX) else {
        return false;
    };
    let Some(suffix) = rest.strip_prefix('-') else {
        return false;
    };
    suffix.len() == SUFFIX_LEN
        && suffix
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Uppercases and trims customer input; tokens are case-insensitive on entry.
pub fn normalize(input: &str) -> String {
    input.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_token_shape() {
        for _ in 0..100 {
            let token = generate();
            assert_eq!(token.len(), 10);
            assert!(token.starts_with("AUR-"));
            assert!(is_well_formed(&token));
        }
    }

    #[test]
    fn test_alphabet_excludes_ambiguous_characters() {
        for _ in 0..200 {
            let token = generate();
            let suffix = &token[4..];
            for c in suffix.chars() {
                assert!(
                    !"0O1IL".contains(c),
                    "ambiguous character {c} in token {token}"
                );
            }
        }
    }

    #[test]
    fn test_well_formed_rejects_garbage() {
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("AUR-"));
        assert!(!is_well_formed("AUR-ABC"));
        assert!(!is_well_formed("AUR-ABCDEFG"));
        assert!(!is_well_formed("XYZ-ABCDEF"));
        assert!(!is_well_formed("AUR-abc123"));
        assert!(!is_well_formed("AUR-ABC 12"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  aur-7mk2xq "), "AUR-7MK2XQ");
    }
}
