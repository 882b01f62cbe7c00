//! Storage identifiers and their mapping onto relative paths.

use std::fmt;
use std::str::FromStr;

use svix_ksuid::{Ksuid, KsuidLike};
use uuid::Uuid;

/// Separator between path segments produced by [`sharded_path`].
pub const PATH_SEPARATOR: char = '/';

/// Maps an identifier's textual form onto a sharded relative path.
///
/// The first four characters become four single-character directory
/// segments and the remainder becomes the final segment, which keeps
/// any one directory from accumulating an unbounded number of entries:
///
/// ```
/// use blobstore::sharded_path;
///
/// assert_eq!(
///     sharded_path("467f28f8-5a5a-4f10-9fce-ed2b5eb5ddd4"),
///     "4/6/7/f/28f8-5a5a-4f10-9fce-ed2b5eb5ddd4",
/// );
/// ```
///
/// Texts of four characters or fewer map to themselves as a single
/// segment.
pub fn sharded_path(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= 4 {
        return text.to_string();
    }

    let mut path = String::with_capacity(text.len() + 4);
    for c in &chars[..4] {
        path.push(*c);
        path.push(PATH_SEPARATOR);
    }
    path.extend(&chars[4..]);
    path
}

/// An identifier a blob is stored and retrieved under.
///
/// [`fmt::Display`] renders the canonical textual value (used in error
/// messages and logs); [`storage_path`](StorageId::storage_path)
/// derives the relative path the blob lives at. The mapping must be
/// pure: the same identifier always yields the same path.
///
/// Applications with their own identity scheme implement this trait
/// directly; [`UuidId`] and [`KsuidId`] cover the common cases.
pub trait StorageId: fmt::Display + Send + Sync {
    /// Relative path of the blob addressed by this identifier.
    fn storage_path(&self) -> String;
}

/// UUID-backed storage identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UuidId(Uuid);

impl UuidId {
    /// Mint a random (v4) identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for UuidId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for UuidId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl fmt::Display for UuidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageId for UuidId {
    fn storage_path(&self) -> String {
        sharded_path(&self.0.to_string())
    }
}

/// KSUID-backed storage identifier.
///
/// KSUIDs sort by creation time, so sibling directories fill in
/// rough chronological order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KsuidId(Ksuid);

impl KsuidId {
    /// Mint an identifier stamped with the current time.
    pub fn random() -> Self {
        Self(Ksuid::new(None, None))
    }

    pub fn new(ksuid: Ksuid) -> Self {
        Self(ksuid)
    }

    pub fn ksuid(&self) -> &Ksuid {
        &self.0
    }
}

impl From<Ksuid> for KsuidId {
    fn from(ksuid: Ksuid) -> Self {
        Self(ksuid)
    }
}

impl FromStr for KsuidId {
    type Err = <Ksuid as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl fmt::Display for KsuidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageId for KsuidId {
    fn storage_path(&self) -> String {
        sharded_path(&self.0.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_path_fans_out_first_four_chars() {
        let id: UuidId = "467f28f8-5a5a-4f10-9fce-ed2b5eb5ddd4".parse().unwrap();
        assert_eq!(id.storage_path(), "4/6/7/f/28f8-5a5a-4f10-9fce-ed2b5eb5ddd4");
    }

    #[test]
    fn ksuid_path_fans_out_first_four_chars() {
        let id: KsuidId = "1HCpXwx2EK9oYluWbacgeCnFcLf".parse().unwrap();
        assert_eq!(id.storage_path(), "1/H/C/p/Xwx2EK9oYluWbacgeCnFcLf");
    }

    #[test]
    fn short_values_stay_a_single_segment() {
        assert_eq!(sharded_path("abcd"), "abcd");
        assert_eq!(sharded_path("ab"), "ab");
        assert_eq!(sharded_path(""), "");
        assert_eq!(sharded_path("abcde"), "a/b/c/d/e");
    }

    #[test]
    fn mapping_is_deterministic() {
        let id = UuidId::random();
        assert_eq!(id.storage_path(), id.storage_path());

        let id = KsuidId::random();
        assert_eq!(id.storage_path(), id.storage_path());
    }

    #[test]
    fn display_renders_the_canonical_value() {
        let text = "467f28f8-5a5a-4f10-9fce-ed2b5eb5ddd4";
        let id: UuidId = text.parse().unwrap();
        assert_eq!(id.to_string(), text);

        let text = "1HCpXwx2EK9oYluWbacgeCnFcLf";
        let id: KsuidId = text.parse().unwrap();
        assert_eq!(id.to_string(), text);
    }

    #[test]
    fn distinct_ids_map_to_distinct_paths() {
        let a = UuidId::random();
        let b = UuidId::random();
        assert_ne!(a.storage_path(), b.storage_path());
    }
}
