//! Symbol graph request and result types.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Minimum access level for symbols included in an extracted graph.
///
/// The variants form a total order from most to least restrictive; variant
/// order is load-bearing for the derived `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Private,
    FilePrivate,
    Internal,
    Package,
    Public,
    Open,
}

impl AccessLevel {
    /// Name used on the wire and on extractor command lines.
    pub fn as_str(self) -> &'static str {
        match self {
            AccessLevel::Private => "private",
            AccessLevel::FilePrivate => "fileprivate",
            AccessLevel::Internal => "internal",
            AccessLevel::Package => "package",
            AccessLevel::Public => "public",
            AccessLevel::Open => "open",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options controlling symbol graph extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolGraphOptions {
    pub minimum_access_level: AccessLevel,
    #[serde(default)]
    pub include_synthesized: bool,
    #[serde(default)]
    pub include_spi: bool,
    #[serde(default)]
    pub emit_extension_blocks: bool,
}

impl Default for SymbolGraphOptions {
    fn default() -> Self {
        Self {
            minimum_access_level: AccessLevel::Public,
            include_synthesized: false,
            include_spi: false,
            emit_extension_blocks: false,
        }
    }
}

/// A plugin's request to extract a symbol graph for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolGraphRequest {
    pub target_name: String,
    #[serde(flatten)]
    pub options: SymbolGraphOptions,
}

/// Result of a symbol graph request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolGraphResult {
    /// Directory containing the emitted symbol graph files.
    pub directory: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_levels_are_totally_ordered() {
        assert!(AccessLevel::Private < AccessLevel::FilePrivate);
        assert!(AccessLevel::FilePrivate < AccessLevel::Internal);
        assert!(AccessLevel::Internal < AccessLevel::Package);
        assert!(AccessLevel::Package < AccessLevel::Public);
        assert!(AccessLevel::Public < AccessLevel::Open);
    }

    #[test]
    fn access_level_wire_names() {
        assert_eq!(
            serde_json::to_string(&AccessLevel::FilePrivate).unwrap(),
            r#""fileprivate""#
        );
        let back: AccessLevel = serde_json::from_str(r#""open""#).unwrap();
        assert_eq!(back, AccessLevel::Open);
    }

    #[test]
    fn request_flattens_options() {
        let request = SymbolGraphRequest {
            target_name: "Core".to_string(),
            options: SymbolGraphOptions {
                minimum_access_level: AccessLevel::Internal,
                include_synthesized: true,
                include_spi: false,
                emit_extension_blocks: true,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["target_name"], "Core");
        assert_eq!(json["minimum_access_level"], "internal");
        assert_eq!(json["include_synthesized"], true);
    }
}
