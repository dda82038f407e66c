//! Static analysis of multi-stage Containerfiles
//!
//! Computes the set of external base images a build pulls, resolving stage
//! aliases and `${ARG}` build-arg interpolation. Aliased stages reference
//! earlier internal stages and are never external dependencies.

use std::collections::{BTreeMap, BTreeSet};

/// The pseudo-image that starts an empty stage; never an external pull.
const SCRATCH: &str = "scratch";

/// Compute the distinct external base images referenced by a Containerfile.
///
/// `build_args` is the fully resolved build-arg mapping for this build.
/// Unmatched `${NAME}` placeholders are left verbatim. Deterministic and
/// idempotent for the same inputs.
pub fn base_images(contents: &str, build_args: &BTreeMap<String, String>) -> BTreeSet<String> {
    let from_lines: Vec<Vec<&str>> = contents
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>())
        .filter(|tokens| {
            tokens
                .first()
                .is_some_and(|word| word.eq_ignore_ascii_case("FROM"))
        })
        .collect();

    let mut aliases = BTreeSet::new();
    for tokens in &from_lines {
        if let Some(pos) = tokens.iter().position(|t| *t == "as" || *t == "AS") {
            if let Some(alias) = tokens.get(pos + 1) {
                aliases.insert(*alias);
            }
        }
    }

    let mut images = BTreeSet::new();
    for tokens in &from_lines {
        let Some(reference) = tokens.get(1) else {
            continue;
        };
        if aliases.contains(reference) {
            continue;
        }
        images.insert(interpolate(reference, build_args));
    }

    images.remove(SCRATCH);
    images
}

/// Replace well-formed `${NAME}` tokens with their build-arg values.
///
/// Only exact delimited tokens are matched, so an arg name that is a prefix
/// of another (FOO vs FOO_BAR) can never rewrite the longer placeholder.
fn interpolate(reference: &str, build_args: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(reference.len());
    let mut rest = reference;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match build_args.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        // No mapping; keep the placeholder verbatim
                        out.push_str(&rest[start..start + 2 + end + 1]);
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                // Unterminated placeholder; keep the remainder as-is
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}
