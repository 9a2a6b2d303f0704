//! `ResourceIdentifier`: a `(ResRef, ResourceType)` pair, the key every
//! archive and the installation index resolves resources by.

use std::fmt;
use std::path::Path;

use kotor_common::resref::ResRef;

use crate::resource_type::ResourceType;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentifier {
    pub resref: ResRef,
    pub restype: ResourceType,
}

impl ResourceIdentifier {
    pub fn new(resref: ResRef, restype: ResourceType) -> Self {
        Self { resref, restype }
    }

    /// Splits `path` at its last `.`; an unrecognized extension yields
    /// `ResourceType::Invalid`, not an error — callers decide whether that's
    /// fatal.
    pub fn from_path(path: &str) -> Self {
        let file_name = Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(path);
        match file_name.rsplit_once('.') {
            Some((stem, ext)) => Self::new(ResRef::from_reader_bytes(stem), ResourceType::from_extension(ext)),
            None => Self::new(ResRef::from_reader_bytes(file_name), ResourceType::Invalid),
        }
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resref, self.restype.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_splits_on_last_dot() {
        let identifier = ResourceIdentifier::from_path("p_bastila.utc");
        assert_eq!(identifier.resref.as_str(), "p_bastila");
        assert_eq!(identifier.restype, ResourceType::Utc);
    }

    #[test]
    fn test_from_path_strips_directory() {
        let identifier = ResourceIdentifier::from_path("override/P_BASTILA.UTC");
        assert_eq!(identifier.resref.as_str(), "p_bastila");
        assert_eq!(identifier.restype, ResourceType::Utc);
    }

    #[test]
    fn test_from_path_unknown_extension_is_invalid() {
        let identifier = ResourceIdentifier::from_path("readme.zzz");
        assert_eq!(identifier.restype, ResourceType::Invalid);
    }

    #[test]
    fn test_equality_is_case_insensitive_via_resref() {
        let a = ResourceIdentifier::from_path("P_Bastila.utc");
        let b = ResourceIdentifier::from_path("p_bastila.utc");
        assert_eq!(a, b);
    }
}
