//! Module identifier resolution
//!
//! A module asks for another module by an identifier relative to its own
//! directory, like a path in a shell:
//!
//! | Requested | Caller | Resolves to |
//! |-----------|--------|-------------|
//! | `./helper` | `index` | `helper` |
//! | `helper2` | `modules/helper` | `modules/helper2` |
//! | `../modules2/helper` | `modules/helper2` | `modules2/helper` |
//! | `/lib/util` | `modules/helper` | `lib/util` |
//!
//! Identifiers never climb above the application root.

use crate::error::{HearthError, HearthResult};

/// Resolve `requested` against the module identifier of its caller.
///
/// # Panics
///
/// When either argument is empty.
pub fn resolve(requested: &str, caller: &str) -> HearthResult<String> {
    assert!(!requested.is_empty(), "require needs a module identifier");
    assert!(!caller.is_empty(), "require needs the calling module's identifier");

    let joined = match requested.strip_prefix('/') {
        Some(rooted) => rooted.to_string(),
        None => match caller.rsplit_once('/') {
            Some((dir, _)) => format!("{}/{}", dir, requested),
            None => requested.to_string(),
        },
    };

    normalize(&joined).ok_or_else(|| HearthError::Resolution {
        identifier: requested.to_string(),
        caller: caller.to_string(),
    })
}

/// Collapse `.`, `..` and empty segments.
///
/// Returns `None` when the path climbs above its start or is empty.
pub fn normalize(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

/// Argument boundary of the `require` call: `[requested, caller]`.
///
/// # Panics
///
/// When the arguments are missing or are not exactly two.
pub fn require(args: Option<&[&str]>) -> HearthResult<String> {
    let args = args.expect("require called without arguments");
    assert_eq!(
        args.len(),
        2,
        "require takes a module identifier and the caller's identifier"
    );
    resolve(args[0], args[1])
}
