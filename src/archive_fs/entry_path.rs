//! Normalized entry paths inside an archive.
//!
//! Archive entry names never start with `/` and directories carry a trailing
//! `/`. Callers may spell paths either way, so every lookup goes through
//! [`EntryPath`] first.

use std::fmt;

/// A normalized, root-relative path to an entry inside an archive
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryPath(String);

impl EntryPath {
    /// Normalize `raw` into an entry path
    ///
    /// Leading and repeated `/` are dropped, `.` components are removed and
    /// `..` pops the previous component. `..` at the root stays at the root.
    pub fn new(raw: &str) -> Self {
        let mut components: Vec<&str> = Vec::new();
        for component in raw.split('/') {
            match component {
                "" | "." => {}
                ".." => {
                    components.pop();
                }
                other => components.push(other),
            }
        }
        Self(components.join("/"))
    }

    /// The entry name as stored in the archive (no leading or trailing `/`)
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the archive root
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Name prefix shared by every entry below this path (`"dir/"`)
    pub fn dir_prefix(&self) -> String {
        if self.is_root() {
            String::new()
        } else {
            format!("{}/", self.0)
        }
    }

    /// Final component, or `None` for the root
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            None
        } else {
            self.0.rsplit('/').next()
        }
    }
}

impl fmt::Display for EntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

impl From<&str> for EntryPath {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalization() {
        assert_eq!(EntryPath::new("hello.txt").as_str(), "hello.txt");
        assert_eq!(EntryPath::new("/hello.txt").as_str(), "hello.txt");
        assert_eq!(EntryPath::new("//a///b/").as_str(), "a/b");
        assert_eq!(EntryPath::new("a/./b/../c").as_str(), "a/c");
        assert_eq!(EntryPath::new("../../a").as_str(), "a");
        assert!(EntryPath::new("/").is_root());
        assert!(EntryPath::new("").is_root());
        assert!(EntryPath::new("a/..").is_root());
    }

    #[test]
    fn test_dir_prefix_and_file_name() {
        let path = EntryPath::new("/META-INF/MANIFEST.MF");
        assert_eq!(path.dir_prefix(), "META-INF/MANIFEST.MF/");
        assert_eq!(path.file_name(), Some("MANIFEST.MF"));
        assert_eq!(path.to_string(), "/META-INF/MANIFEST.MF");

        let root = EntryPath::new("/");
        assert_eq!(root.dir_prefix(), "");
        assert_eq!(root.file_name(), None);
        assert_eq!(root.to_string(), "/");
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(raw in "[a-z./]{0,24}") {
            let once = EntryPath::new(&raw);
            let twice = EntryPath::new(once.as_str());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn normalized_paths_have_clean_components(raw in "[a-z./]{0,24}") {
            let path = EntryPath::new(&raw);
            prop_assert!(!path.as_str().starts_with('/'));
            prop_assert!(!path.as_str().ends_with('/'));
            prop_assert!(!path.as_str().contains("//"));
            prop_assert!(path.as_str().split('/').all(|c| c != "." && c != ".."));
        }
    }
}
