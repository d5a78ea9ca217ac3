//! Key ref layout and ref name validation.
//!
//! A key with id `{uuid}` owns:
//!
//! - `refs/tags/kv/{uuid}`: existence marker, points at the key's own commit
//! - `refs/heads/kv/{uuid}/value/bytes`: commit holding the value payload
//! - `refs/heads/kv/{uuid}/value/type`: one of the provisioned type commits
//!
//! Type commits are provisioned once at `refs/tags/kv/types/{TypeName}`.

use gitkv_types::{KeyId, TypeTag};

use crate::error::{RefError, Result};

/// Characters that are never allowed in a ref name.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

/// The three refs owned by one key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyRefs {
    pub marker: String,
    pub bytes: String,
    pub kind: String,
}

impl KeyRefs {
    pub fn for_key(id: &KeyId) -> Self {
        Self {
            marker: format!("refs/tags/kv/{id}"),
            bytes: format!("refs/heads/kv/{id}/value/bytes"),
            kind: format!("refs/heads/kv/{id}/value/type"),
        }
    }

    /// All three names, marker first.
    pub fn all(&self) -> [&str; 3] {
        [&self.marker, &self.bytes, &self.kind]
    }
}

/// Where the commit for `tag` is provisioned.
pub fn type_marker(tag: TypeTag) -> String {
    format!("refs/tags/kv/types/{}", tag.name())
}

/// Names without a `refs/` prefix are branches.
pub fn qualify(name: &str) -> String {
    if name.starts_with("refs/") {
        name.to_string()
    } else {
        format!("refs/heads/{name}")
    }
}

/// Validate a fully qualified ref name, returning `Ok(())` if valid.
///
/// Follows git's `check-ref-format` rules.
///
/// # Examples
///
/// ```
/// use gitkv_refs::names::validate_ref_name;
///
/// assert!(validate_ref_name("refs/heads/main").is_ok());
/// assert!(validate_ref_name("refs/tags/kv/String/abc-_").is_ok());
/// assert!(validate_ref_name("refs/heads/bad..name").is_err());
/// ```
pub fn validate_ref_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(RefError::InvalidRefName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if !name.starts_with("refs/") {
        return invalid("must start with 'refs/'");
    }

    for ch in FORBIDDEN_CHARS {
        if name.contains(*ch) {
            return Err(RefError::InvalidRefName {
                name: name.to_string(),
                reason: format!("contains forbidden character: {ch:?}"),
            });
        }
    }

    if name.chars().any(char::is_control) {
        return invalid("must not contain control characters");
    }
    if name.contains("..") {
        return invalid("must not contain '..'");
    }
    if name.contains("@{") {
        return invalid("must not contain '@{'");
    }
    if name.ends_with('/') || name.ends_with('.') {
        return invalid("must not end with '/' or '.'");
    }

    for component in name.split('/') {
        if component.is_empty() {
            return invalid("must not contain empty path components");
        }
        if component.starts_with('.') {
            return invalid("path components must not start with '.'");
        }
        if component.ends_with(".lock") {
            return invalid("path components must not end with '.lock'");
        }
    }

    Ok(())
}
