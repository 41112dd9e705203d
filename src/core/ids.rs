//! Deterministic 8-character identifiers for scripts and dApps.
//!
//! Both generators emit base-62 digits over `0-9A-Za-z`. Identifiers are a
//! pure function of their input and never consult previously issued ids;
//! two hashes that share their first 12 hex characters collide by
//! construction.

/// Identifier alphabet, digits first.
pub const BASE62_ALPHABET: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Every generated identifier has exactly this many characters.
pub const ID_LEN: usize = 8;

/// Number of leading hex characters of a script hash that feed `script_id`.
const SCRIPT_PREFIX_HEX: usize = 12;

/// Accumulator mask for `project_id` (48 bits).
const PROJECT_HASH_MASK: u64 = 0xFFFF_FFFF_FFFF;

/// Encode the low base-62 digits of `num`, most significant first.
fn encode_base62(mut num: u64) -> String {
    let mut digits = [0u8; ID_LEN];
    for slot in digits.iter_mut().rev() {
        *slot = BASE62_ALPHABET[(num % 62) as usize];
        num /= 62;
    }
    digits.iter().map(|&b| b as char).collect()
}

/// Identifier for a script, derived from the first 12 hex characters of its hash.
///
/// Non-hex characters in the prefix are skipped, so callers should pass a
/// normalized hash. A prefix shorter than 12 characters is read as-is.
pub fn script_id(script_hash: &str) -> String {
    let num = script_hash
        .chars()
        .take(SCRIPT_PREFIX_HEX)
        .filter_map(|c| c.to_digit(16))
        .fold(0u64, |acc, d| (acc << 4) | u64::from(d));
    encode_base62(num)
}

/// Identifier for a dApp, derived from its project name.
///
/// The name is folded over its UTF-16 code units with `acc * 31 + unit`
/// masked to 48 bits, then encoded like `script_id`.
pub fn project_id(project_name: &str) -> String {
    let hash = project_name.encode_utf16().fold(0u64, |acc, unit| {
        (acc.wrapping_shl(5).wrapping_sub(acc).wrapping_add(u64::from(unit))) & PROJECT_HASH_MASK
    });
    encode_base62(hash)
}

/// True when `id` has the shape of a generated identifier.
pub fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LEN && id.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_id_matches_pinned_vectors() {
        assert_eq!(script_id(&"abcd".repeat(14)), "rdgd7meb");
        assert_eq!(script_id(&"0".repeat(56)), "00000000");
        assert_eq!(script_id(&"f".repeat(56)), "HvWXNAa7");
        assert_eq!(
            script_id("e1317b152faac13426e6a83e06ff88a4d62cce3c1634ab0a5ec13309"),
            "8JBMLk3W"
        );
    }

    #[test]
    fn script_id_only_reads_twelve_hex_chars() {
        let a = format!("abcdabcdabcd{}", "1".repeat(44));
        let b = format!("abcdabcdabcd{}", "2".repeat(44));
        assert_eq!(script_id(&a), script_id(&b));

        let c = format!("abcdabcdabce{}", "0".repeat(44));
        assert_eq!(script_id(&c), "rdgd7mec");
    }

    #[test]
    fn script_id_is_case_insensitive_over_hex() {
        assert_eq!(script_id(&"ABCD".repeat(14)), script_id(&"abcd".repeat(14)));
    }

    #[test]
    fn project_id_matches_pinned_vectors() {
        assert_eq!(project_id("Minswap"), "01FzMcJJ");
        assert_eq!(project_id("SundaeSwap"), "Cwj4w09H");
        assert_eq!(project_id("Wingriders"), "e4X1LJ2K");
        assert_eq!(project_id("Spectrum"), "0g0LvbDl");
        assert_eq!(project_id("a"), "0000001Z");
        assert_eq!(project_id(""), "00000000");
    }

    #[test]
    fn project_id_folds_utf16_units_and_wraps() {
        assert_eq!(project_id("Café"), "00008mNl");
        assert_eq!(
            project_id("A very long project name that wraps the accumulator"),
            "I0OOyqbM"
        );
    }

    #[test]
    fn generated_ids_are_valid_and_stable() {
        for name in ["Minswap", "GeniusYield", "MuesliSwap", "Splash"] {
            let first = project_id(name);
            assert!(is_valid_id(&first));
            assert_eq!(first, project_id(name));
        }
        assert!(!is_valid_id("short"));
        assert!(!is_valid_id("bad-id!!"));
    }
}
