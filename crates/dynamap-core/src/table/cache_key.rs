//! Cache key derivation.
//!
//! A cache key is the lowercase hex SHA-224 digest of
//! `{prefix}_{hash}` or `{prefix}_{hash}_{range}`, where `prefix` is the
//! table's cache prefix or, failing that, its name.

use crate::value::Key;
use sha2::{Digest, Sha224};
use std::fmt::Write as _;

/// Length of every derived cache key, in hex characters.
pub const CACHE_KEY_LEN: usize = 56;

/// Derive the cache key for a row of the table identified by `prefix`.
///
/// Key components are hashed in their rendered form, so `"1"` and `1`
/// derive the same key, as do the hash key `"a_b"` and the pair
/// `("a", "b")`. Within one table the key attributes have a fixed wire
/// type and arity, so such keys cannot meet under one prefix.
#[must_use]
pub fn cache_key(prefix: &str, key: &Key) -> String {
    let mut hasher = Sha224::new();
    hasher.update(prefix.as_bytes());
    hasher.update(b"_");
    hasher.update(key.hash.to_string().as_bytes());
    if let Some(range) = &key.range {
        hasher.update(b"_");
        hasher.update(range.to_string().as_bytes());
    }

    let digest = hasher.finalize();
    let mut out = String::with_capacity(CACHE_KEY_LEN);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn digest_matches_known_sha224_of_joined_key() {
        // sha224("users_u1")
        let expected = {
            let digest = Sha224::digest(b"users_u1");
            digest.iter().map(|b| format!("{b:02x}")).collect::<String>()
        };

        assert_eq!(cache_key("users", &Key::hash("u1")), expected);
    }

    #[test]
    fn keys_are_fixed_length_lowercase_hex() {
        let key = cache_key("events", &Key::ranged("acct-9", 17));

        assert_eq!(key.len(), CACHE_KEY_LEN);
        assert!(key.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn hash_only_and_ranged_keys_differ() {
        let hash_only = cache_key("events", &Key::hash("a"));
        let ranged = cache_key("events", &Key::ranged("a", "b"));

        assert_ne!(hash_only, ranged);
    }

    #[test]
    fn components_are_hashed_in_rendered_form() {
        assert_eq!(
            cache_key("users", &Key::hash("1")),
            cache_key("users", &Key::hash(1))
        );
        assert_eq!(
            cache_key("events", &Key::hash("a_b")),
            cache_key("events", &Key::ranged("a", "b"))
        );
    }

    proptest! {
        #[test]
        fn derivation_is_deterministic(prefix in "[a-z]{1,12}", h in any::<i64>(), r in "[a-z0-9]{0,8}") {
            let key = Key::ranged(h, r);
            prop_assert_eq!(cache_key(&prefix, &key), cache_key(&prefix, &key));
        }

        #[test]
        fn changing_any_component_changes_the_key(
            prefix in "[a-z]{1,8}",
            h in "[a-z]{1,8}",
            r in "[a-z]{1,8}",
        ) {
            let base = cache_key(&prefix, &Key::ranged(h.as_str(), r.as_str()));

            prop_assert_ne!(&base, &cache_key(&format!("{prefix}x"), &Key::ranged(h.as_str(), r.as_str())));
            prop_assert_ne!(&base, &cache_key(&prefix, &Key::ranged(format!("{h}x"), r.as_str())));
            prop_assert_ne!(&base, &cache_key(&prefix, &Key::ranged(h.as_str(), format!("{r}x"))));
        }
    }
}
