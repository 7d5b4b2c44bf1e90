//! Configuration options for loading and writing branch trees.
//!
//! - [`ParseOptions`]: how text and binary input is read
//! - [`WriteOptions`]: which format and binary version is written
//!
//! ## Examples
//!
//! ```rust
//! use acm::{ParseMode, ParseOptions, WriteOptions, FileFormat};
//!
//! let parse = ParseOptions::new()
//!     .with_mode(ParseMode::Strict)
//!     .with_source("config/base.acm")
//!     .with_expected_root("project");
//!
//! let write = WriteOptions::binary();
//! assert_eq!(write.format, FileFormat::Binary);
//! ```

use crate::binary::MAX_BINARY_VERSION;

/// On-disk representation of a tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FileFormat {
    Binary,
    #[default]
    Utf8,
}

/// Binary format generation to write.
///
/// `Legacy` emits the unversioned `node.bin` header, which readers treat as
/// version 1. `Versioned(n)` emits `node.binx` followed by `n`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryVersion {
    Legacy,
    Versioned(u32),
}

impl BinaryVersion {
    /// The newest version this crate reads and writes.
    pub const CURRENT: BinaryVersion = BinaryVersion::Versioned(MAX_BINARY_VERSION);

    /// Effective version number used for payload layout decisions.
    #[must_use]
    pub const fn number(&self) -> u32 {
        match self {
            BinaryVersion::Legacy => 1,
            BinaryVersion::Versioned(v) => *v,
        }
    }
}

impl Default for BinaryVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

/// Recovery policy for malformed input.
///
/// `Lenient` logs a warning and drops the malformed subtree, keeping the rest
/// of the document. A scalar whose text does not read as its type is kept
/// and only warned about. `Strict` fails on the first problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ParseMode {
    #[default]
    Lenient,
    Strict,
}

/// Options for reading text or binary input.
#[derive(Clone, Debug)]
pub struct ParseOptions {
    pub mode: ParseMode,
    /// Label used in diagnostics, usually the originating path.
    pub source: String,
    /// When set, the root branch must carry this name.
    pub expected_root: Option<String>,
    /// Maximum container nesting accepted before the input is rejected.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            mode: ParseMode::default(),
            source: "<buffer>".to_string(),
            expected_root: None,
            max_depth: 128,
        }
    }
}

impl ParseOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `ParseOptions::new().with_mode(ParseMode::Strict)`.
    #[must_use]
    pub fn strict() -> Self {
        ParseOptions {
            mode: ParseMode::Strict,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ParseMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Requires the loaded root to be named `name`.
    ///
    /// ```rust
    /// use acm::{from_str_with_options, ParseOptions};
    ///
    /// let options = ParseOptions::new().with_expected_root("project");
    /// assert!(from_str_with_options("object level { }", options).is_err());
    /// ```
    #[must_use]
    pub fn with_expected_root(mut self, name: impl Into<String>) -> Self {
        self.expected_root = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub(crate) fn is_strict(&self) -> bool {
        self.mode == ParseMode::Strict
    }
}

/// Options for writing a tree.
#[derive(Clone, Debug)]
pub struct WriteOptions {
    pub format: FileFormat,
    pub binary_version: BinaryVersion,
    /// Comment line written under the text header. `None` omits it.
    pub banner: Option<String>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            format: FileFormat::default(),
            binary_version: BinaryVersion::default(),
            banner: Some("this node file has been auto-generated!".to_string()),
        }
    }
}

impl WriteOptions {
    /// Text output with the default banner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binary output at the current format version.
    #[must_use]
    pub fn binary() -> Self {
        WriteOptions {
            format: FileFormat::Binary,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_binary_version(mut self, version: BinaryVersion) -> Self {
        self.binary_version = version;
        self
    }

    #[must_use]
    pub fn with_banner(mut self, banner: Option<String>) -> Self {
        self.banner = banner;
        self
    }
}
