//! Binary codec.
//!
//! ## Layout
//!
//! ```text
//! "node.binx\n" u32 version          (current header)
//! "node.bin\n"                       (legacy header, version 1)
//!
//! node := u16 name_len  name_len bytes (NUL-terminated, absent when 0)
//!         i8 type
//!         [i8 child_type]            arrays only
//!         u32 child_count node*      containers
//!         payload                    scalars
//! ```
//!
//! Every fixed-width field is little-endian. Scalar payloads are 1 byte for
//! Bool/Int8/UInt8, 2 for Float16/Int16/UInt16, 4 for Float32/Int32/UInt32 and
//! 8 for Float64/Int64/UInt64. Strings use the same length-prefixed form as
//! names, with 0 meaning the empty string.
//!
//! Version 1 writers emitted four stray bytes after every Int16/UInt16
//! payload. Readers skip them when the version is below 2, and writers
//! reproduce them when asked for version 1.

use crate::branch::{Branch, Scalar};
use crate::de::Parsed;
use crate::error::Diagnostic;
use crate::float16::F16;
use crate::options::{BinaryVersion, FileFormat, ParseOptions};
use crate::{Error, PropertyType, Result};

/// Newest binary format version understood by this crate.
pub const MAX_BINARY_VERSION: u32 = 2;

pub(crate) const BINARY_HEADER: &[u8] = b"node.binx";
pub(crate) const LEGACY_HEADER: &[u8] = b"node.bin";
pub(crate) const TEXT_HEADER: &[u8] = b"node.utf8";

/// Longest header line inspected when sniffing a buffer.
const MAX_HEADER_LEN: usize = 32;

/// Bytes written after 16-bit integers by version 1 writers.
const LEGACY_PADDING: usize = 4;

/// What a buffer's header line says about its contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub format: FileFormat,
    /// Binary format version. Text buffers report 1.
    pub version: u32,
    /// Offset of the first byte after the header. For text this is the
    /// newline ending the header line, so line numbers stay aligned.
    pub body_offset: usize,
}

/// Reads the header of a node buffer.
///
/// Unknown headers fail with `InvalidArgument`. A versioned binary header
/// with a missing, zero, or too-new version fails with `IoRead`.
///
/// ```rust
/// use acm::{detect_format, FileFormat};
///
/// let header = detect_format(b"node.utf8\nobject cfg { }").unwrap();
/// assert_eq!(header.format, FileFormat::Utf8);
/// assert_eq!(header.body_offset, 9);
/// ```
pub fn read_header(bytes: &[u8]) -> Result<Header> {
    let window = &bytes[..bytes.len().min(MAX_HEADER_LEN)];
    let line_end = window.iter().position(|&b| b == b'\n');
    let token = &window[..line_end.unwrap_or(window.len())];
    let after_line = line_end.map_or(window.len(), |n| n + 1);

    if token.starts_with(BINARY_HEADER) {
        let version = bytes
            .get(after_line..after_line + 4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .ok_or_else(|| Error::io_read("binary node header is missing its version"))?;
        if version == 0 || version > MAX_BINARY_VERSION {
            return Err(Error::io_read(format!(
                "invalid binary node format ({} == 0 || {} > {})",
                version, version, MAX_BINARY_VERSION
            )));
        }
        return Ok(Header {
            format: FileFormat::Binary,
            version,
            body_offset: after_line + 4,
        });
    }

    if token.starts_with(LEGACY_HEADER) {
        return Ok(Header {
            format: FileFormat::Binary,
            version: 1,
            body_offset: after_line,
        });
    }

    if token.starts_with(TEXT_HEADER) {
        return Ok(Header {
            format: FileFormat::Utf8,
            version: 1,
            body_offset: TEXT_HEADER.len(),
        });
    }

    Err(Error::invalid_argument(format!(
        "unknown file type \"{}\"",
        String::from_utf8_lossy(token)
    )))
}

/// A decode failure at a byte offset.
struct DecodeError {
    offset: usize,
    message: String,
}

type Decoded<T> = std::result::Result<T, DecodeError>;

struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    version: u32,
    options: &'a ParseOptions,
    diagnostics: Vec<Diagnostic>,
    halted: bool,
}

impl<'a> Decoder<'a> {
    fn error(&self, message: impl Into<String>) -> DecodeError {
        DecodeError {
            offset: self.pos,
            message: message.into(),
        }
    }

    #[inline]
    fn ensure_len(&self, need: usize, ctx: &str) -> Decoded<()> {
        if self.pos + need > self.data.len() {
            Err(self.error(format!(
                "truncated at {} (need {} bytes at offset {}, have {})",
                ctx,
                need,
                self.pos,
                self.data.len()
            )))
        } else {
            Ok(())
        }
    }

    fn take<const N: usize>(&mut self, ctx: &str) -> Decoded<[u8; N]> {
        self.ensure_len(N, ctx)?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(buf)
    }

    #[inline]
    fn read_i8(&mut self, ctx: &str) -> Decoded<i8> {
        Ok(i8::from_le_bytes(self.take::<1>(ctx)?))
    }

    #[inline]
    fn read_u16(&mut self, ctx: &str) -> Decoded<u16> {
        Ok(u16::from_le_bytes(self.take::<2>(ctx)?))
    }

    #[inline]
    fn read_u32(&mut self, ctx: &str) -> Decoded<u32> {
        Ok(u32::from_le_bytes(self.take::<4>(ctx)?))
    }

    fn skip(&mut self, count: usize, ctx: &str) -> Decoded<()> {
        self.ensure_len(count, ctx)?;
        self.pos += count;
        Ok(())
    }

    /// Reads a length-prefixed string. A zero length yields `None`.
    fn read_string(&mut self, ctx: &str) -> Decoded<Option<String>> {
        let length = self.read_u16(ctx)? as usize;
        if length == 0 {
            return Ok(None);
        }
        self.ensure_len(length, ctx)?;
        let raw = &self.data[self.pos..self.pos + length];
        let raw = raw.strip_suffix(&[0u8]).unwrap_or(raw);
        let text = std::str::from_utf8(raw)
            .map_err(|e| self.error(format!("invalid UTF-8 in {}: {}", ctx, e)))?
            .to_string();
        self.pos += length;
        Ok(Some(text))
    }

    fn read_type(&mut self, ctx: &str) -> Decoded<PropertyType> {
        let code = self.read_i8(ctx)?;
        PropertyType::from_wire_code(code)
            .ok_or_else(|| self.error(format!("unknown property type {} in {}", code, ctx)))
    }

    fn record(&mut self, error: DecodeError) {
        let diagnostic = Diagnostic::new(&self.options.source, 0, error.offset, error.message);
        tracing::warn!(
            path = %diagnostic.path,
            offset = diagnostic.column,
            "{}",
            diagnostic.message
        );
        self.diagnostics.push(diagnostic);
    }

    fn node(&mut self, depth: usize) -> Decoded<Branch> {
        let name = self.read_string("name")?.filter(|n| !n.is_empty());
        let ty = self.read_type("type")?;

        match ty {
            PropertyType::Object => self.container(Branch::container(name, ty, None), depth),
            PropertyType::Array => {
                let child_type = self.read_type("child type")?;
                if child_type == PropertyType::Array {
                    return Err(self.error("arrays cannot hold arrays"));
                }
                self.container(Branch::container(name, ty, Some(child_type)), depth)
            }
            _ => {
                let text = self.payload(ty)?;
                Ok(Branch::from_text(name, ty, text))
            }
        }
    }

    fn container(&mut self, mut branch: Branch, depth: usize) -> Decoded<Branch> {
        if depth >= self.options.max_depth {
            return Err(self.error(format!(
                "nesting exceeds maximum depth of {}",
                self.options.max_depth
            )));
        }

        let count = self.read_u32("child count")?;
        for _ in 0..count {
            let child = match self.node(depth + 1) {
                Ok(child) => child,
                Err(e) if !self.options.is_strict() => {
                    self.record(e);
                    self.halted = true;
                    break;
                }
                Err(e) => return Err(e),
            };

            if let Err(e) = branch.push_branch(child) {
                return Err(self.error(e.to_string()));
            }
            if self.halted {
                break;
            }
        }
        Ok(branch)
    }

    fn payload(&mut self, ty: PropertyType) -> Decoded<String> {
        let ctx = ty.keyword();
        let width = match ty.payload_width() {
            Some(width) => width,
            None if ty == PropertyType::String => {
                return Ok(self.read_string(ctx)?.unwrap_or_default())
            }
            None => return Err(self.error(format!("{} has no scalar payload", ty))),
        };

        self.ensure_len(width, ctx)?;
        let text = scalar_text(ty, &self.data[self.pos..self.pos + width]);
        self.pos += width;
        if matches!(ty, PropertyType::Int16 | PropertyType::UInt16) {
            self.skip_legacy_padding(ctx)?;
        }
        Ok(text)
    }

    fn skip_legacy_padding(&mut self, ctx: &str) -> Decoded<()> {
        if self.version < 2 {
            self.skip(LEGACY_PADDING, ctx)?;
        }
        Ok(())
    }
}

/// Copies a payload slice of exactly `N` bytes into an array.
fn le<const N: usize>(raw: &[u8]) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(raw);
    buf
}

/// Text form of a fixed-width payload; `raw` is `ty.payload_width()` bytes.
fn scalar_text(ty: PropertyType, raw: &[u8]) -> String {
    match ty {
        PropertyType::Bool => (raw[0] != 0).to_text(),
        PropertyType::Int8 => i8::from_le_bytes(le(raw)).to_text(),
        PropertyType::UInt8 => raw[0].to_text(),
        PropertyType::Int16 => i16::from_le_bytes(le(raw)).to_text(),
        PropertyType::UInt16 => u16::from_le_bytes(le(raw)).to_text(),
        PropertyType::Float16 => F16::from_bits(u16::from_le_bytes(le(raw))).to_text(),
        PropertyType::Int32 => i32::from_le_bytes(le(raw)).to_text(),
        PropertyType::UInt32 => u32::from_le_bytes(le(raw)).to_text(),
        PropertyType::Float32 => f32::from_le_bytes(le(raw)).to_text(),
        PropertyType::Int64 => i64::from_le_bytes(le(raw)).to_text(),
        PropertyType::UInt64 => u64::from_le_bytes(le(raw)).to_text(),
        PropertyType::Float64 => f64::from_le_bytes(le(raw)).to_text(),
        PropertyType::String | PropertyType::Object | PropertyType::Array => String::new(),
    }
}

/// Decodes a complete binary buffer, header included.
///
/// In lenient mode a failure inside the tree drops the failing branch and
/// stops reading every enclosing container; the partial tree is returned
/// with a diagnostic. A failure reading the root itself is always an error.
pub fn decode(bytes: &[u8], options: &ParseOptions) -> Result<Parsed> {
    let header = read_header(bytes)?;
    if header.format != FileFormat::Binary {
        return Err(Error::invalid_argument("buffer does not hold a binary node tree"));
    }

    let mut decoder = Decoder {
        data: bytes,
        pos: header.body_offset,
        version: header.version,
        options,
        diagnostics: Vec::new(),
        halted: false,
    };

    match decoder.node(0) {
        Ok(root) => Ok(Parsed {
            root: Some(root),
            diagnostics: decoder.diagnostics,
        }),
        Err(e) => Err(Error::io_read(format!(
            "{}: offset {}: {}",
            options.source, e.offset, e.message
        ))),
    }
}

struct Encoder {
    out: Vec<u8>,
    version: u32,
}

impl Encoder {
    fn write_string(&mut self, text: &str, ctx: &str) -> Result<()> {
        if text.is_empty() {
            self.out.extend_from_slice(&0u16.to_le_bytes());
            return Ok(());
        }
        let length = u16::try_from(text.len() + 1).map_err(|_| {
            Error::invalid_argument(format!(
                "{} of {} bytes is too long for the binary format",
                ctx,
                text.len()
            ))
        })?;
        self.out.extend_from_slice(&length.to_le_bytes());
        self.out.extend_from_slice(text.as_bytes());
        self.out.push(0);
        Ok(())
    }

    fn write_type(&mut self, ty: PropertyType) -> Result<()> {
        let code = ty.wire_code();
        if code < 0 {
            return Err(Error::internal(format!("no wire code for {}", ty)));
        }
        self.out.extend_from_slice(&code.to_le_bytes());
        Ok(())
    }

    fn node(&mut self, branch: &Branch) -> Result<()> {
        self.write_string(branch.name().unwrap_or_default(), "name")?;
        self.write_type(branch.property_type())?;

        if branch.is_array() {
            let child_type = branch
                .child_type()
                .ok_or_else(|| Error::internal("array branch has no child type"))?;
            self.write_type(child_type)?;
        }

        if branch.is_container() {
            let count = u32::try_from(branch.len())
                .map_err(|_| Error::invalid_argument("too many children for the binary format"))?;
            self.out.extend_from_slice(&count.to_le_bytes());
            for child in branch {
                self.node(child)?;
            }
            return Ok(());
        }

        self.payload(branch)
    }

    fn payload(&mut self, branch: &Branch) -> Result<()> {
        let ty = branch.property_type();
        let text = branch
            .text()
            .ok_or_else(|| Error::internal(format!("{} branch has no value", ty)))?;

        match ty {
            PropertyType::String => self.write_string(text, "string value")?,
            PropertyType::Bool => self.out.push(u8::from(parse::<bool>(text, ty)?)),
            PropertyType::Int8 => self.put(&parse::<i8>(text, ty)?.to_le_bytes()),
            PropertyType::UInt8 => self.out.push(parse::<u8>(text, ty)?),
            PropertyType::Int16 => {
                self.put(&parse::<i16>(text, ty)?.to_le_bytes());
                self.legacy_padding();
            }
            PropertyType::UInt16 => {
                self.put(&parse::<u16>(text, ty)?.to_le_bytes());
                self.legacy_padding();
            }
            PropertyType::Float16 => self.put(&parse::<F16>(text, ty)?.to_bits().to_le_bytes()),
            PropertyType::Int32 => self.put(&parse::<i32>(text, ty)?.to_le_bytes()),
            PropertyType::UInt32 => self.put(&parse::<u32>(text, ty)?.to_le_bytes()),
            PropertyType::Float32 => self.put(&parse::<f32>(text, ty)?.to_le_bytes()),
            PropertyType::Int64 => self.put(&parse::<i64>(text, ty)?.to_le_bytes()),
            PropertyType::UInt64 => self.put(&parse::<u64>(text, ty)?.to_le_bytes()),
            PropertyType::Float64 => self.put(&parse::<f64>(text, ty)?.to_le_bytes()),
            PropertyType::Object | PropertyType::Array => {
                return Err(Error::internal(format!("{} has no scalar payload", ty)))
            }
        }
        Ok(())
    }

    fn put(&mut self, bytes: &[u8]) {
        self.out.extend_from_slice(bytes);
    }

    fn legacy_padding(&mut self) {
        if self.version < 2 {
            self.out.extend_from_slice(&[0u8; LEGACY_PADDING]);
        }
    }
}

fn parse<T: Scalar>(text: &str, ty: PropertyType) -> Result<T> {
    T::from_text(text)
        .ok_or_else(|| Error::invalid_argument(format!("cannot encode \"{}\" as {}", text, ty)))
}

/// Encodes `root` as a complete binary buffer, header included.
pub fn encode(root: &Branch, version: BinaryVersion) -> Result<Vec<u8>> {
    let number = version.number();
    if number == 0 || number > MAX_BINARY_VERSION {
        return Err(Error::invalid_argument(format!(
            "unsupported binary version {}",
            number
        )));
    }

    let mut encoder = Encoder {
        out: Vec::new(),
        version: number,
    };
    match version {
        BinaryVersion::Legacy => {
            encoder.out.extend_from_slice(LEGACY_HEADER);
            encoder.out.push(b'\n');
        }
        BinaryVersion::Versioned(v) => {
            encoder.out.extend_from_slice(BINARY_HEADER);
            encoder.out.push(b'\n');
            encoder.out.extend_from_slice(&v.to_le_bytes());
        }
    }

    encoder.node(root)?;
    Ok(encoder.out)
}
