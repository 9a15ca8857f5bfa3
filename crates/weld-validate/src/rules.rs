//! Pure predicate functions backing the document-level and per-step bound
//! checks in `validate`. Kept separate from the orchestration in
//! `validate.rs` so each rule can be unit-tested against its exact
//! boundary values in isolation.

use regex::Regex;
use std::sync::OnceLock;

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9_-]+$").unwrap())
}

fn semver_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-((?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?(?:\+([0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?$",
        )
        .unwrap()
    })
}

pub fn is_valid_id(id: &str) -> bool {
    id_pattern().is_match(id)
}

pub fn is_valid_version(version: &str) -> bool {
    semver_pattern().is_match(version)
}

pub fn is_valid_name_length(name: &str) -> bool {
    (1..=100).contains(&name.chars().count())
}

pub fn is_valid_parallel(parallel: u32) -> bool {
    (1..=32).contains(&parallel)
}

/// `0` means "no per-step timeout", which is a valid sentinel rather than
/// an out-of-bounds value.
pub fn is_valid_timeout_seconds(timeout: u64) -> bool {
    timeout == 0 || (1..=360_000).contains(&timeout)
}

pub fn is_valid_verify_timeout_seconds(timeout: u32) -> bool {
    (1..=600).contains(&timeout)
}
