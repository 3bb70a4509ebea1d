//! Run identifiers: `seo_<epoch-ms>_<9 lowercase base36 chars>`.

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 9;

static RUN_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^seo_\d+_[a-z0-9]{9}$").unwrap());

pub fn generate() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("seo_{millis}_{suffix}")
}

pub fn is_valid(run_id: &str) -> bool {
    RUN_ID_RE.is_match(run_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_match_format() {
        for _ in 0..200 {
            let id = generate();
            assert!(is_valid(&id), "bad id {id}");
        }
    }

    #[test]
    fn generated_ids_are_distinct() {
        let ids: HashSet<String> = (0..500).map(|_| generate()).collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn rejects_malformed_ids() {
        for bad in [
            "",
            "seo_123_abc",
            "seo_123_ABCDEFGHI",
            "seo__abcdefghi",
            "run_123_abcdefghi",
            "seo_123_abcdefghij",
            "seo_12a_abcdefghi",
            "seo_123_abcdefgh!",
        ] {
            assert!(!is_valid(bad), "accepted {bad:?}");
        }
        assert!(is_valid("seo_1700000000000_k3j9x0a2b"));
    }
}
