//! Source language detection.

use std::fmt;
use std::path::Path;

/// Languages the formatter has a grammar for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedLanguage {
    /// Java source files (`.java`).
    Java,
}

impl SupportedLanguage {
    /// Detects the language from a file extension.
    ///
    /// Returns `None` if the extension is not recognised.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "java" => Some(Self::Java),
            _ => None,
        }
    }

    /// Detects the language from a file name or path.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Lower-case identifier of the language.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Java => "java",
        }
    }
}

impl fmt::Display for SupportedLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn java_extension_is_recognised() {
        assert_eq!(
            SupportedLanguage::from_path("src/Main.java"),
            Some(SupportedLanguage::Java)
        );
        assert_eq!(
            SupportedLanguage::from_extension("JAVA"),
            Some(SupportedLanguage::Java)
        );
    }

    #[test]
    fn unknown_extensions_are_rejected() {
        assert_eq!(SupportedLanguage::from_path("build.gradle.kts"), None);
        assert_eq!(SupportedLanguage::from_path("Makefile"), None);
    }
}
