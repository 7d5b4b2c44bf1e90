//! Text serialization.
//!
//! This module provides the [`Serializer`] that prints a [`Branch`] tree in
//! the text grammar read by [`crate::de`].
//!
//! ## Layout
//!
//! ```text
//! node.utf8
//! ; this node file has been auto-generated!
//! object cfg {
//! 	int32 x 42
//! 	array int32 nums {
//! 		1
//! 		2
//! 	}
//! 	array object list {
//! 				{
//! 			string name first
//! 		}
//! 	}
//! }
//! ```
//!
//! Each branch line is indented with one tab per depth. Scalar values are
//! followed by a space. An object element of an array gets its indent twice
//! before the `{`; readers ignore the whitespace, but the layout is kept
//! stable so generated files diff cleanly against older ones.
//!
//! ## Quoting
//!
//! Names and string/bool values are quoted when written bare they would not
//! read back as the same text: empty, containing whitespace or braces,
//! starting like a comment, quote or number, or spelling a typename. Quoted
//! strings have no escapes, so text that needs quotes and also contains `"`
//! or a line break cannot be written and fails with `InvalidArgument`.
//!
//! Float values that are NaN or positive infinity have no text form and fail
//! the same way.

use crate::options::WriteOptions;
use crate::{Branch, Error, PropertyType, Result};
use std::borrow::Cow;

/// Writes the text header line that [`crate::detect_format`] recognizes.
pub const HEADER: &str = "node.utf8";

/// The text serializer.
pub struct Serializer {
    output: String,
    depth: usize,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer {
    pub fn new() -> Self {
        Serializer {
            output: String::with_capacity(256),
            depth: 0,
        }
    }

    pub fn into_inner(self) -> String {
        self.output
    }

    /// Writes the `node.utf8` line and, if given, the banner as comment
    /// lines.
    pub fn write_header(&mut self, banner: Option<&str>) {
        self.output.push_str(HEADER);
        self.output.push('\n');
        if let Some(banner) = banner {
            for line in banner.lines() {
                self.output.push_str("; ");
                self.output.push_str(line);
                self.output.push('\n');
            }
        }
    }

    /// Writes `root` and its subtree.
    pub fn serialize(&mut self, root: &Branch) -> Result<()> {
        self.node(root, false)
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.output.push('\t');
        }
    }

    fn node(&mut self, branch: &Branch, in_array: bool) -> Result<()> {
        self.indent();

        if !in_array {
            let ty = branch.property_type();
            self.output.push_str(ty.keyword());
            self.output.push(' ');
            if let Some(child_type) = branch.child_type() {
                self.output.push_str(child_type.keyword());
                self.output.push(' ');
            }

            match branch.name() {
                Some(name) => {
                    let name = quote(name, "name")?;
                    self.output.push_str(&name);
                    self.output.push(' ');
                }
                // objects may be anonymous, everything else needs a name token
                None if !branch.is_object() => self.output.push_str("\"\" "),
                None => {}
            }
        }

        if branch.is_container() {
            if in_array {
                self.indent();
            }
            self.output.push_str("{\n");
            self.depth += 1;
            for child in branch {
                self.node(child, branch.is_array())?;
            }
            self.depth -= 1;
            self.indent();
            self.output.push_str("}\n");
            return Ok(());
        }

        let text = branch.text().ok_or_else(|| {
            Error::internal(format!("{} branch has no value", branch.property_type()))
        })?;
        let value = value_text(branch.property_type(), text)?;
        self.output.push_str(&value);
        self.output.push_str(" \n");
        Ok(())
    }
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '{' || c == '}')
        || s.starts_with(|c: char| c == ';' || c == '"' || c == '-' || c.is_ascii_digit())
        || PropertyType::is_keyword(s)
}

fn quote<'a>(s: &'a str, what: &str) -> Result<Cow<'a, str>> {
    if s.contains(|c| c == '\n' || c == '\r') {
        return Err(Error::invalid_argument(format!(
            "{} \"{}\" contains a line break",
            what,
            s.escape_default()
        )));
    }
    if !needs_quotes(s) {
        return Ok(Cow::Borrowed(s));
    }
    if s.contains('"') {
        return Err(Error::invalid_argument(format!(
            "{} {} needs quoting but contains '\"'",
            what, s
        )));
    }
    Ok(Cow::Owned(format!("\"{}\"", s)))
}

fn value_text(ty: PropertyType, text: &str) -> Result<Cow<'_, str>> {
    match ty {
        PropertyType::String | PropertyType::Bool => quote(text, "value"),
        _ => {
            let numeric = text.starts_with(|c: char| c == '-' || c.is_ascii_digit())
                && !text
                    .chars()
                    .any(|c| c.is_whitespace() || c.is_control() || c == '{' || c == '}');
            if numeric {
                Ok(Cow::Borrowed(text))
            } else {
                Err(Error::invalid_argument(format!(
                    "{} value \"{}\" has no text form",
                    ty, text
                )))
            }
        }
    }
}

/// Prints `root` as a complete text document, header included.
pub fn to_string(root: &Branch, options: &WriteOptions) -> Result<String> {
    let mut serializer = Serializer::new();
    serializer.write_header(options.banner.as_deref());
    serializer.serialize(root)?;
    Ok(serializer.into_inner())
}
