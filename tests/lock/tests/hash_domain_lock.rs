//! Hash domain governance lock tests.
//!
//! Proves:
//! 1. The domain set has the expected count
//! 2. All domains follow the `TOKENPASS::*::V1\0` naming convention
//! 3. `canonical_hash` is SHA-256 over `domain || data`, recomputed here
//!    independently with `sha2`
//! 4. No production type rejects unknown serde fields

use sha2::{Digest, Sha256};
use tokenpass_kernel::proof::hash::canonical_hash;
use tokenpass_kernel::proof::hash_domain::HashDomain;

/// ACCEPTANCE: HASH-DOMAIN-LOCK
#[test]
fn hash_domain_canonical_set_count() {
    assert_eq!(
        HashDomain::ALL.len(),
        5,
        "expected 5 domain variants; if you added a new domain, update this count"
    );
}

/// ACCEPTANCE: HASH-DOMAIN-LOCK
#[test]
fn hash_domain_naming_convention() {
    for domain in HashDomain::ALL {
        let text = std::str::from_utf8(domain.as_bytes()).unwrap();
        assert!(text.starts_with("TOKENPASS::"), "{domain}");
        assert!(text.ends_with("::V1\0"), "{domain}");
    }
}

/// ACCEPTANCE: HASH-DOMAIN-LOCK
#[test]
fn canonical_hash_matches_independent_sha256() {
    let data = br#"{"a":1}"#;
    for domain in HashDomain::ALL {
        let mut hasher = Sha256::new();
        hasher.update(domain.as_bytes());
        hasher.update(data);
        let expected = format!("sha256:{}", hex::encode(hasher.finalize()));
        assert_eq!(canonical_hash(*domain, data).as_str(), expected);
    }
}

fn scan_dir(dir: &std::path::Path, pattern: &str, violations: &mut Vec<String>) {
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            scan_dir(&path, pattern, violations);
        } else if path.extension().is_some_and(|e| e == "rs") {
            let text = std::fs::read_to_string(&path).unwrap();
            for (n, line) in text.lines().enumerate() {
                if line.contains(pattern) {
                    violations.push(format!("{}:{}", path.display(), n + 1));
                }
            }
        }
    }
}

/// Policy documents must stay readable by older decoders, so no production
/// type may reject unknown fields.
///
/// ACCEPTANCE: SCHEMA-EXTENSIBLE
#[test]
fn no_deny_unknown_fields_in_production_code() {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    let pattern = ["deny", "unknown", "fields"].join("_");
    let mut violations = Vec::new();
    for krate in ["kernel", "search", "harness"] {
        scan_dir(&root.join(krate).join("src"), &pattern, &mut violations);
    }
    assert!(
        violations.is_empty(),
        "{pattern} found in production code:\n{}",
        violations.join("\n")
    );
}
