//! # acm
//!
//! Ape Config Markup: a typed configuration tree with a curly-brace text
//! format and a compact versioned binary format.
//!
//! ## The Tree
//!
//! A document is a tree of [`Branch`]es. Objects hold named children, arrays
//! hold unnamed children of a single declared type, and every other branch is
//! a scalar (`string`, `bool`, the signed and unsigned integers, `float16`,
//! `float`, `float64`) whose value is kept in its canonical text form.
//!
//! ## Text Format
//!
//! ```text
//! node.utf8
//! ; line comment
//! object game {
//!     string title "Hello World"
//!     uint width 1920
//!     array float origin { 0 1.5 -2 }
//!     array object actors {
//!         { string class door }
//!     }
//! }
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use acm::{from_str, to_vec, from_slice, WriteOptions};
//!
//! let root = from_str("object cfg { int32 x 42 bool flag true }").unwrap();
//! assert_eq!(root.get_int("x", 0), 42);
//! assert!(root.get_bool("flag", false));
//!
//! // binary round trip
//! let bytes = to_vec(&root, &WriteOptions::binary()).unwrap();
//! assert_eq!(from_slice(&bytes).unwrap(), root);
//!
//! // text round trip
//! let text = acm::to_string(&root).unwrap();
//! assert_eq!(from_str(&text).unwrap(), root);
//! ```
//!
//! ## Building Trees
//!
//! ```rust
//! use acm::{acm, Branch};
//!
//! let mut root = Branch::object("cfg");
//! root.push_string("title", "Hello World").unwrap();
//! root.push_array_f32("origin", &[0.0, 1.5, -2.0]).unwrap();
//!
//! let same = acm!(object cfg {
//!     string title = "Hello World",
//!     array float origin = [0.0, 1.5, -2.0],
//! });
//! assert_eq!(root, same);
//! ```
//!
//! ## Diagnostics
//!
//! Malformed input is handled according to [`ParseMode`]. The default,
//! lenient mode drops the malformed branch (a value that merely does not
//! read as its type is kept as text and flagged), logs a warning through
//! [`tracing`](https://docs.rs/tracing) and keeps going; [`parse`] also
//! returns the collected [`Diagnostic`]s. Strict mode fails on the first
//! problem. This crate never installs a subscriber.
//!
//! ## Threading
//!
//! Parsing and writing are synchronous and keep no global state, so
//! independent documents can be processed on different threads. A single
//! tree has one owner; wrap it in a `Mutex` to share it.

pub mod binary;
pub mod branch;
pub mod de;
pub mod error;
pub mod float16;
pub mod lexer;
pub mod macros;
pub mod options;
pub mod property;
pub mod ser;

pub use binary::{Header, MAX_BINARY_VERSION};
pub use branch::{Branch, BranchMut, Scalar};
pub use de::{Parsed, Parser};
pub use error::{Diagnostic, Error, ErrorCode, Result};
pub use float16::F16;
pub use lexer::{Lexer, Token, TokenKind};
pub use options::{BinaryVersion, FileFormat, ParseMode, ParseOptions, WriteOptions};
pub use property::PropertyType;
pub use ser::Serializer;

use std::fs;
use std::io;
use std::path::Path;

/// Parses text with the given options, returning the tree (if any) along
/// with every diagnostic.
///
/// A leading `node.utf8` header line is skipped.
///
/// # Errors
///
/// In strict mode, returns a syntax error for the first problem found.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn parse(input: &str, options: &ParseOptions) -> Result<Parsed> {
    de::parse(strip_text_header(input), options)
}

/// Skips the `node.utf8` header, keeping its line break so diagnostics
/// report the same line numbers as the file.
fn strip_text_header(input: &str) -> &str {
    match input.strip_prefix(ser::HEADER) {
        Some(rest) if rest.is_empty() || rest.starts_with(['\n', '\r']) => rest,
        _ => input,
    }
}

fn check_root(root: Branch, options: &ParseOptions) -> Result<Branch> {
    if let Some(expected) = &options.expected_root {
        let found = root.name().unwrap_or_default();
        if found != expected.as_str() {
            tracing::warn!(
                path = %options.source,
                expected = %expected,
                found = %found,
                "unexpected root branch"
            );
            return Err(Error::UnexpectedRoot {
                expected: expected.clone(),
                found: found.to_string(),
            });
        }
    }
    Ok(root)
}

/// Parses a text document into a tree.
///
/// # Examples
///
/// ```rust
/// use acm::from_str;
///
/// let root = from_str("object cfg { array int32 nums { 1 2 3 } }").unwrap();
/// assert_eq!(root.get_array::<i32>("nums", None), Some(vec![1, 2, 3]));
/// ```
///
/// # Errors
///
/// Returns a syntax error if no root branch could be parsed.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str(s: &str) -> Result<Branch> {
    from_str_with_options(s, ParseOptions::default())
}

/// Parses a text document into a tree with custom options.
///
/// # Errors
///
/// Returns a syntax error if no root branch could be parsed (or, in strict
/// mode, on the first problem), and `UnexpectedRoot` if the root is not
/// named as [`ParseOptions::expected_root`] requires.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str_with_options(s: &str, options: ParseOptions) -> Result<Branch> {
    let root = parse(s, &options)?.into_root()?;
    check_root(root, &options)
}

/// Reads the header of a buffer to find out which format it holds.
///
/// # Errors
///
/// `InvalidArgument` for an unknown header; `IoRead` for a binary header
/// with an unsupported version.
pub fn detect_format(bytes: &[u8]) -> Result<Header> {
    binary::read_header(bytes)
}

/// Loads a tree from a buffer holding either format, dispatching on its
/// header.
///
/// # Errors
///
/// Fails if the header is unknown or unsupported, or the body is malformed.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice(v: &[u8]) -> Result<Branch> {
    from_slice_with_options(v, ParseOptions::default())
}

/// Loads a tree from a buffer holding either format with custom options.
///
/// # Errors
///
/// See [`from_slice`] and [`from_str_with_options`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice_with_options(v: &[u8], options: ParseOptions) -> Result<Branch> {
    let header = detect_format(v)?;
    let root = match header.format {
        FileFormat::Binary => binary::decode(v, &options)?.into_root()?,
        FileFormat::Utf8 => {
            let body = std::str::from_utf8(&v[header.body_offset..])
                .map_err(|e| Error::io_read(format!("{}: {}", options.source, e)))?;
            de::parse(body, &options)?.into_root()?
        }
    };
    check_root(root, &options)
}

/// Loads a tree from an I/O stream holding either format.
///
/// # Errors
///
/// Returns `IoRead` if reading fails, otherwise see [`from_slice`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<R>(mut reader: R) -> Result<Branch>
where
    R: io::Read,
{
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(Error::io_read)?;
    from_slice(&bytes)
}

/// Loads a tree from a file.
///
/// # Errors
///
/// Returns `IoRead` with the OS reason if the file cannot be read,
/// otherwise see [`from_slice`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Branch> {
    load_file_with_options(path, ParseOptions::default())
}

/// Loads a tree from a file with custom options. When the options carry
/// the default source label, diagnostics use the file path instead.
///
/// # Examples
///
/// ```rust,no_run
/// use acm::{load_file_with_options, ParseOptions};
///
/// let options = ParseOptions::new().with_expected_root("project");
/// let project = load_file_with_options("project.acm", options).unwrap();
/// ```
///
/// # Errors
///
/// See [`load_file`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn load_file_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Branch> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| {
        tracing::warn!(path = %path.display(), error = %e, "failed to open node file");
        Error::io_read(format!("failed to open \"{}\": {}", path.display(), e))
    })?;

    let options = if options.source == ParseOptions::default().source {
        options.with_source(path.display().to_string())
    } else {
        options
    };
    from_slice_with_options(&bytes, options)
}

/// Prints a tree as a text document with the default banner.
///
/// # Errors
///
/// Returns `InvalidArgument` if a name or value has no text form.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string(root: &Branch) -> Result<String> {
    ser::to_string(root, &WriteOptions::default())
}

/// Serializes a tree in the format selected by `options`.
///
/// # Errors
///
/// Returns `InvalidArgument` for unwritable names or values or an
/// unsupported binary version.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_vec(root: &Branch, options: &WriteOptions) -> Result<Vec<u8>> {
    match options.format {
        FileFormat::Binary => binary::encode(root, options.binary_version),
        FileFormat::Utf8 => ser::to_string(root, options).map(String::into_bytes),
    }
}

/// Serializes a tree to a writer.
///
/// # Errors
///
/// See [`to_vec`]; returns `IoWrite` if writing fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W>(mut writer: W, root: &Branch, options: &WriteOptions) -> Result<()>
where
    W: io::Write,
{
    let bytes = to_vec(root, options)?;
    writer.write_all(&bytes).map_err(Error::io_write)?;
    writer.flush().map_err(Error::io_write)
}

/// Writes a tree to a file, replacing any existing content.
///
/// The tree is fully serialized before the file is opened, so a tree that
/// cannot be written leaves the file untouched.
///
/// # Errors
///
/// See [`to_vec`]; returns `IoWrite` with the OS reason if the file cannot
/// be written.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn write_file<P: AsRef<Path>>(path: P, root: &Branch, options: &WriteOptions) -> Result<()> {
    let path = path.as_ref();
    let bytes = to_vec(root, options)?;
    fs::write(path, bytes).map_err(|e| {
        Error::io_write(format!("failed to open path \"{}\": {}", path.display(), e))
    })
}
