//! The branch tree model.
//!
//! A [`Branch`] is one node of a configuration tree. Objects and arrays are
//! containers; every other [`PropertyType`] is a scalar leaf whose value is
//! held in its canonical text form.
//!
//! ## Ownership
//!
//! A branch owns its children by value. Dropping a branch drops its whole
//! subtree, and [`Clone`] produces a fully independent deep copy that is not
//! attached to any parent. Attaching and detaching move subtrees in and out
//! of a parent ([`Branch::push_branch`], [`Branch::remove_child`]). There are
//! no back-references, so a tree cannot contain cycles. Code that needs the
//! parent of a node walks down from the root and carries it along.
//!
//! Pushing returns a [`BranchMut`] rather than `&mut Branch`, so a node that
//! already sits in an array can be filled in but never swapped for a node of
//! another type.
//!
//! A tree is plain data with a single owner. Share it between threads the
//! usual way, e.g. behind a `Mutex`.
//!
//! ## Building Trees
//!
//! ```rust
//! use acm::{Branch, PropertyType};
//!
//! let mut root = Branch::object("cfg");
//! root.push_i32("x", 42).unwrap();
//! root.push_bool("flag", true).unwrap();
//! root.push_array_i32("nums", &[1, 2, 3]).unwrap();
//!
//! assert_eq!(root.get_int("x", 0), 42);
//! assert!(root.get_bool("flag", false));
//! assert_eq!(root.get_array::<i32>("nums", None), Some(vec![1, 2, 3]));
//!
//! // arrays are homogeneous
//! let nums = root.child_by_name_mut("nums").unwrap().unwrap();
//! assert!(nums.push_string("", "four").is_err());
//! assert_eq!(nums.len(), 3);
//! assert_eq!(nums.child_type(), Some(PropertyType::Int32));
//! ```

use crate::float16::F16;
use crate::{Error, PropertyType, Result};
use serde::{Serialize, Serializer};
use std::ops::Deref;
use std::slice;

/// A Rust value that can live in a scalar branch.
///
/// Implementations define the branch type, the canonical text form written
/// into the tree, and how to read that text back.
pub trait Scalar: Sized {
    const TYPE: PropertyType;

    fn to_text(&self) -> String;

    fn from_text(text: &str) -> Option<Self>;
}

impl Scalar for bool {
    const TYPE: PropertyType = PropertyType::Bool;

    fn to_text(&self) -> String {
        if *self { "true" } else { "false" }.to_string()
    }

    fn from_text(text: &str) -> Option<Self> {
        match text {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }
}

impl Scalar for String {
    const TYPE: PropertyType = PropertyType::String;

    fn to_text(&self) -> String {
        self.clone()
    }

    fn from_text(text: &str) -> Option<Self> {
        Some(text.to_string())
    }
}

impl Scalar for F16 {
    const TYPE: PropertyType = PropertyType::Float16;

    fn to_text(&self) -> String {
        self.to_f32().to_string()
    }

    fn from_text(text: &str) -> Option<Self> {
        text.trim().parse::<f32>().ok().map(F16::from_f32)
    }
}

macro_rules! impl_scalar_number {
    ($($ty:ty => $prop:ident),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const TYPE: PropertyType = PropertyType::$prop;

                fn to_text(&self) -> String {
                    self.to_string()
                }

                fn from_text(text: &str) -> Option<Self> {
                    text.trim().parse::<$ty>().ok()
                }
            }
        )*
    };
}

impl_scalar_number! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
}

/// Returns `true` if `text` is a readable value of scalar type `ty`.
pub(crate) fn is_valid_text(ty: PropertyType, text: &str) -> bool {
    match ty {
        PropertyType::Object | PropertyType::Array => false,
        PropertyType::String => true,
        PropertyType::Bool => bool::from_text(text).is_some(),
        PropertyType::Float16 => F16::from_text(text).is_some(),
        PropertyType::Float32 => f32::from_text(text).is_some(),
        PropertyType::Float64 => f64::from_text(text).is_some(),
        PropertyType::Int8 => i8::from_text(text).is_some(),
        PropertyType::Int16 => i16::from_text(text).is_some(),
        PropertyType::Int32 => i32::from_text(text).is_some(),
        PropertyType::Int64 => i64::from_text(text).is_some(),
        PropertyType::UInt8 => u8::from_text(text).is_some(),
        PropertyType::UInt16 => u16::from_text(text).is_some(),
        PropertyType::UInt32 => u32::from_text(text).is_some(),
        PropertyType::UInt64 => u64::from_text(text).is_some(),
    }
}

/// A node in a configuration tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Branch {
    name: Option<String>,
    property_type: PropertyType,
    child_type: Option<PropertyType>,
    data: Option<String>,
    children: Vec<Branch>,
}

fn normalize_name(name: &str) -> Option<String> {
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Typed push helpers, shared by [`Branch`] and [`BranchMut`]. Each one
/// goes through `push_branch`.
macro_rules! push_family {
    () => {
        pub fn push_object(&mut self, name: &str) -> Result<BranchMut<'_>> {
            self.push_branch(Branch::object(name))
        }

        pub fn push_array(
            &mut self,
            name: &str,
            child_type: PropertyType,
        ) -> Result<BranchMut<'_>> {
            self.push_branch(Branch::array(name, child_type)?)
        }

        /// Pushes an empty array of objects.
        pub fn push_array_object(&mut self, name: &str) -> Result<BranchMut<'_>> {
            self.push_array(name, PropertyType::Object)
        }

        pub fn push_value<T: Scalar>(&mut self, name: &str, value: T) -> Result<BranchMut<'_>> {
            self.push_branch(Branch::scalar(name, value))
        }

        /// Pushes an unnamed element onto an array.
        pub fn push_element<T: Scalar>(&mut self, value: T) -> Result<BranchMut<'_>> {
            self.push_value("", value)
        }

        pub fn push_string(&mut self, name: &str, value: &str) -> Result<BranchMut<'_>> {
            self.push_value(name, value.to_string())
        }

        /// Pushes a string unless `value` is empty.
        pub fn push_string_if(&mut self, name: &str, value: &str) -> Result<Option<BranchMut<'_>>> {
            if value.is_empty() {
                return Ok(None);
            }
            self.push_string(name, value).map(Some)
        }

        pub fn push_bool(&mut self, name: &str, value: bool) -> Result<BranchMut<'_>> {
            self.push_value(name, value)
        }

        pub fn push_i8(&mut self, name: &str, value: i8) -> Result<BranchMut<'_>> {
            self.push_value(name, value)
        }

        pub fn push_i16(&mut self, name: &str, value: i16) -> Result<BranchMut<'_>> {
            self.push_value(name, value)
        }

        pub fn push_i32(&mut self, name: &str, value: i32) -> Result<BranchMut<'_>> {
            self.push_value(name, value)
        }

        pub fn push_i64(&mut self, name: &str, value: i64) -> Result<BranchMut<'_>> {
            self.push_value(name, value)
        }

        pub fn push_u8(&mut self, name: &str, value: u8) -> Result<BranchMut<'_>> {
            self.push_value(name, value)
        }

        pub fn push_u16(&mut self, name: &str, value: u16) -> Result<BranchMut<'_>> {
            self.push_value(name, value)
        }

        pub fn push_u32(&mut self, name: &str, value: u32) -> Result<BranchMut<'_>> {
            self.push_value(name, value)
        }

        pub fn push_u64(&mut self, name: &str, value: u64) -> Result<BranchMut<'_>> {
            self.push_value(name, value)
        }

        /// Pushes a Float16 branch, rounding `value` to half precision.
        pub fn push_f16(&mut self, name: &str, value: f32) -> Result<BranchMut<'_>> {
            self.push_value(name, F16::from_f32(value))
        }

        pub fn push_f32(&mut self, name: &str, value: f32) -> Result<BranchMut<'_>> {
            self.push_value(name, value)
        }

        pub fn push_f64(&mut self, name: &str, value: f64) -> Result<BranchMut<'_>> {
            self.push_value(name, value)
        }

        /// Pushes an array holding `values`.
        pub fn push_array_values<T: Scalar>(
            &mut self,
            name: &str,
            values: &[T],
        ) -> Result<BranchMut<'_>> {
            let mut array = Branch::array(name, T::TYPE)?;
            array.children = values
                .iter()
                .map(|v| Branch::from_text(None, T::TYPE, v.to_text()))
                .collect();
            self.push_branch(array)
        }

        pub fn push_array_string(&mut self, name: &str, values: &[&str]) -> Result<BranchMut<'_>> {
            let mut array = Branch::array(name, PropertyType::String)?;
            array.children = values
                .iter()
                .map(|v| Branch::from_text(None, PropertyType::String, (*v).to_string()))
                .collect();
            self.push_branch(array)
        }

        pub fn push_array_i16(&mut self, name: &str, values: &[i16]) -> Result<BranchMut<'_>> {
            self.push_array_values(name, values)
        }

        pub fn push_array_i32(&mut self, name: &str, values: &[i32]) -> Result<BranchMut<'_>> {
            self.push_array_values(name, values)
        }

        pub fn push_array_u32(&mut self, name: &str, values: &[u32]) -> Result<BranchMut<'_>> {
            self.push_array_values(name, values)
        }

        pub fn push_array_f32(&mut self, name: &str, values: &[f32]) -> Result<BranchMut<'_>> {
            self.push_array_values(name, values)
        }
    };
}

impl Branch {
    /// Creates a detached, empty object.
    #[must_use]
    pub fn object(name: &str) -> Branch {
        Branch::container(normalize_name(name), PropertyType::Object, None)
    }

    /// Creates a detached, empty array whose elements must be `child_type`.
    ///
    /// Arrays of arrays are not supported and fail with `InvalidType`.
    pub fn array(name: &str, child_type: PropertyType) -> Result<Branch> {
        if child_type == PropertyType::Array {
            return Err(Error::invalid_type("arrays cannot hold arrays"));
        }
        Ok(Branch::container(
            normalize_name(name),
            PropertyType::Array,
            Some(child_type),
        ))
    }

    /// Creates a detached scalar branch.
    #[must_use]
    pub fn scalar<T: Scalar>(name: &str, value: T) -> Branch {
        Branch::from_text(normalize_name(name), T::TYPE, value.to_text())
    }

    pub(crate) fn container(
        name: Option<String>,
        property_type: PropertyType,
        child_type: Option<PropertyType>,
    ) -> Branch {
        Branch {
            name,
            property_type,
            child_type,
            data: None,
            children: Vec::new(),
        }
    }

    pub(crate) fn from_text(
        name: Option<String>,
        property_type: PropertyType,
        text: String,
    ) -> Branch {
        Branch {
            name,
            property_type,
            child_type: None,
            data: Some(text),
            children: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn property_type(&self) -> PropertyType {
        self.property_type
    }

    /// Element type of an array; `None` for every other branch.
    #[inline]
    #[must_use]
    pub fn child_type(&self) -> Option<PropertyType> {
        self.child_type
    }

    /// Canonical text of a scalar; `None` for containers.
    #[inline]
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.data.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn is_object(&self) -> bool {
        self.property_type == PropertyType::Object
    }

    #[inline]
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.property_type == PropertyType::Array
    }

    #[inline]
    #[must_use]
    pub fn is_container(&self) -> bool {
        self.property_type.is_container()
    }

    /// Number of children.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    #[must_use]
    pub fn children(&self) -> &[Branch] {
        &self.children
    }

    pub fn iter(&self) -> slice::Iter<'_, Branch> {
        self.children.iter()
    }

    #[must_use]
    pub fn child(&self, index: usize) -> Option<&Branch> {
        self.children.get(index)
    }

    fn require_object(&self) -> Result<()> {
        if self.is_object() {
            Ok(())
        } else {
            Err(Error::invalid_type(format!(
                "attempted to get child by name from {} branch",
                self.property_type
            )))
        }
    }

    /// Returns the first child named `name`.
    ///
    /// Only objects have named children; any other branch fails with
    /// `InvalidType`.
    pub fn child_by_name(&self, name: &str) -> Result<Option<&Branch>> {
        self.require_object()?;
        Ok(self.children.iter().find(|c| c.name() == Some(name)))
    }

    pub fn child_by_name_mut(&mut self, name: &str) -> Result<Option<&mut Branch>> {
        self.require_object()?;
        Ok(self.children.iter_mut().find(|c| c.name() == Some(name)))
    }

    /// Depth-first search for a branch whose name matches `name`, ignoring
    /// ASCII case. `self` is checked first.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Branch> {
        if matches!(self.name(), Some(n) if n.eq_ignore_ascii_case(name)) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Attaches `child` as the last child and returns a handle to it.
    ///
    /// Fails with `InvalidType` if `self` is not a container, or if `self`
    /// is an array and the child's type differs from the element type. In
    /// both cases `self` is left untouched. Array elements lose their names.
    pub fn push_branch(&mut self, mut child: Branch) -> Result<BranchMut<'_>> {
        match self.property_type {
            PropertyType::Object => {}
            PropertyType::Array => {
                if Some(child.property_type) != self.child_type {
                    return Err(Error::invalid_type(format!(
                        "attempted to add {} to array of {}",
                        child.property_type,
                        self.child_type.map(|t| t.keyword()).unwrap_or("unknown")
                    )));
                }
                child.name = None;
            }
            other => {
                return Err(Error::invalid_type(format!(
                    "{} branches cannot have children",
                    other
                )))
            }
        }

        let index = self.children.len();
        self.children.push(child);
        Ok(BranchMut {
            branch: &mut self.children[index],
        })
    }

    /// Appends `child` without any checks. Only for callers that already
    /// know `self` is an object.
    pub(crate) fn append(&mut self, child: Branch) {
        self.children.push(child);
    }

    /// Detaches and returns the child at `index`.
    pub fn remove_child(&mut self, index: usize) -> Option<Branch> {
        if index < self.children.len() {
            Some(self.children.remove(index))
        } else {
            None
        }
    }

    /// Detaches and returns the first child named `name`.
    pub fn remove_child_by_name(&mut self, name: &str) -> Result<Option<Branch>> {
        self.require_object()?;
        let position = self.children.iter().position(|c| c.name() == Some(name));
        Ok(position.map(|i| self.children.remove(i)))
    }

    push_family!();

    /// Reads this scalar as `T`.
    ///
    /// Fails with `InvalidType` unless the branch type is exactly `T::TYPE`,
    /// and with `InvalidArgument` if the stored text does not parse.
    ///
    /// ```rust
    /// use acm::Branch;
    ///
    /// let b = Branch::scalar("n", 7u16);
    /// assert_eq!(b.value::<u16>().unwrap(), 7);
    /// assert!(b.value::<i32>().is_err());
    /// ```
    pub fn value<T: Scalar>(&self) -> Result<T> {
        if self.property_type != T::TYPE {
            return Err(Error::invalid_type(format!(
                "expected {} branch, found {}",
                T::TYPE,
                self.property_type
            )));
        }
        let text = self.data.as_deref().unwrap_or_default();
        T::from_text(text).ok_or_else(|| {
            Error::invalid_argument(format!("invalid {} value \"{}\"", T::TYPE, text))
        })
    }

    /// Reads this string branch without copying.
    pub fn as_str(&self) -> Result<&str> {
        if self.property_type != PropertyType::String {
            return Err(Error::invalid_type(format!(
                "expected string branch, found {}",
                self.property_type
            )));
        }
        Ok(self.data.as_deref().unwrap_or_default())
    }

    /// Reads the elements of an array of `T`.
    ///
    /// With `Some(count)`, exactly the first `count` elements are returned and
    /// a shorter array fails with `InvalidElementCount`. With `None`, all
    /// elements are returned.
    pub fn array_values<T: Scalar>(&self, count: Option<usize>) -> Result<Vec<T>> {
        if self.property_type != PropertyType::Array || self.child_type != Some(T::TYPE) {
            return Err(Error::invalid_type(format!(
                "expected array of {}, found {}",
                T::TYPE,
                self.describe_type()
            )));
        }

        let wanted = count.unwrap_or(self.children.len());
        if self.children.len() < wanted {
            return Err(Error::InvalidElementCount {
                expected: wanted,
                found: self.children.len(),
            });
        }

        self.children[..wanted].iter().map(Branch::value).collect()
    }

    fn describe_type(&self) -> String {
        match self.child_type {
            Some(child) if self.is_array() => format!("array of {}", child),
            _ => self.property_type.to_string(),
        }
    }

    fn child_text(&self, name: &str) -> Option<&str> {
        self.child_by_name(name).ok().flatten().and_then(Branch::text)
    }

    /// Reads the Bool child `name`, or `fallback` if it is missing, not a
    /// Bool, or unreadable.
    #[must_use]
    pub fn get_bool(&self, name: &str, fallback: bool) -> bool {
        self.child_by_name(name)
            .ok()
            .flatten()
            .and_then(|c| c.value::<bool>().ok())
            .unwrap_or(fallback)
    }

    /// Text of the scalar child `name`, whatever its type.
    #[must_use]
    pub fn get_string<'a>(&'a self, name: &str, fallback: &'a str) -> &'a str {
        self.child_text(name).unwrap_or(fallback)
    }

    #[must_use]
    pub fn get_int(&self, name: &str, fallback: i64) -> i64 {
        self.child_text(name)
            .and_then(|t| t.trim().parse().ok())
            .unwrap_or(fallback)
    }

    #[must_use]
    pub fn get_uint(&self, name: &str, fallback: u64) -> u64 {
        self.child_text(name)
            .and_then(|t| t.trim().parse().ok())
            .unwrap_or(fallback)
    }

    #[must_use]
    pub fn get_f32(&self, name: &str, fallback: f32) -> f32 {
        self.get_f64(name, f64::from(fallback)) as f32
    }

    #[must_use]
    pub fn get_f64(&self, name: &str, fallback: f64) -> f64 {
        self.child_text(name)
            .and_then(|t| t.trim().parse().ok())
            .unwrap_or(fallback)
    }

    /// Elements of the array child `name`, or `None` if it is missing, of the
    /// wrong type, or shorter than `count`.
    #[must_use]
    pub fn get_array<T: Scalar>(&self, name: &str, count: Option<usize>) -> Option<Vec<T>> {
        self.child_by_name(name)
            .ok()
            .flatten()
            .and_then(|c| c.array_values(count).ok())
    }

    /// Renders the tree as an indented listing, one branch per line.
    ///
    /// ```rust
    /// use acm::Branch;
    ///
    /// let mut root = Branch::object("cfg");
    /// root.push_i32("x", 1).unwrap();
    /// assert_eq!(root.dump(), "cfg (object)\n\tint32 x 1\n");
    /// ```
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for line in self.dump_lines() {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    /// Logs [`Branch::dump`] line by line at info level.
    pub fn print_tree(&self) {
        for line in self.dump_lines() {
            tracing::info!(target: "acm::tree", "{}", line);
        }
    }

    fn dump_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.dump_into(&mut lines, 0, false);
        lines
    }

    fn dump_into(&self, lines: &mut Vec<String>, depth: usize, in_array: bool) {
        let indent = "\t".repeat(depth);
        let name = self.name().unwrap_or("");
        let text = self.text().unwrap_or("");
        match (self.property_type, self.child_type) {
            (PropertyType::Object, _) => lines.push(format!("{}{} (object)", indent, name)),
            (PropertyType::Array, child) => lines.push(format!(
                "{}{} (array {})",
                indent,
                name,
                child.map(|c| c.keyword()).unwrap_or("invalid")
            )),
            (ty, _) if in_array => lines.push(format!("{}{} {}", indent, ty, text)),
            (ty, _) => lines.push(format!("{}{} {} {}", indent, ty, name, text)),
        }
        for child in &self.children {
            child.dump_into(lines, depth + 1, self.is_array());
        }
    }
}

impl<'a> IntoIterator for &'a Branch {
    type Item = &'a Branch;
    type IntoIter = slice::Iter<'a, Branch>;

    fn into_iter(self) -> Self::IntoIter {
        self.children.iter()
    }
}

/// Mutable handle to a branch that lives inside a tree.
///
/// Push methods return this instead of `&mut Branch`. It reads like the
/// branch it points at and can add or remove that branch's children, but it
/// cannot replace the branch itself. An array element therefore keeps the
/// array's element type and stays unnamed.
///
/// ```rust
/// use acm::Branch;
///
/// let mut root = Branch::object("level");
/// let mut actors = root.push_array_object("actors").unwrap();
/// let mut door = actors.push_object("").unwrap();
/// door.push_string("class", "door").unwrap();
/// assert_eq!(door.get_string("class", ""), "door");
/// assert_eq!(door.name(), None);
/// ```
#[derive(Debug)]
pub struct BranchMut<'a> {
    branch: &'a mut Branch,
}

impl BranchMut<'_> {
    /// See [`Branch::push_branch`].
    pub fn push_branch(&mut self, child: Branch) -> Result<BranchMut<'_>> {
        self.branch.push_branch(child)
    }

    pub fn remove_child(&mut self, index: usize) -> Option<Branch> {
        self.branch.remove_child(index)
    }

    pub fn remove_child_by_name(&mut self, name: &str) -> Result<Option<Branch>> {
        self.branch.remove_child_by_name(name)
    }

    pub fn child_by_name_mut(&mut self, name: &str) -> Result<Option<&mut Branch>> {
        self.branch.child_by_name_mut(name)
    }

    push_family!();
}

impl Deref for BranchMut<'_> {
    type Target = Branch;

    fn deref(&self) -> &Branch {
        self.branch
    }
}

impl Serialize for Branch {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::{SerializeMap, SerializeSeq};

        let text = self.data.as_deref().unwrap_or_default();
        match self.property_type {
            PropertyType::Object => {
                let mut map = serializer.serialize_map(Some(self.children.len()))?;
                for child in &self.children {
                    map.serialize_entry(child.name().unwrap_or_default(), child)?;
                }
                map.end()
            }
            PropertyType::Array => {
                let mut seq = serializer.serialize_seq(Some(self.children.len()))?;
                for child in &self.children {
                    seq.serialize_element(child)?;
                }
                seq.end()
            }
            PropertyType::Bool => match bool::from_text(text) {
                Some(b) => serializer.serialize_bool(b),
                None => serializer.serialize_str(text),
            },
            PropertyType::Int8
            | PropertyType::Int16
            | PropertyType::Int32
            | PropertyType::Int64 => match i64::from_text(text) {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_str(text),
            },
            PropertyType::UInt8
            | PropertyType::UInt16
            | PropertyType::UInt32
            | PropertyType::UInt64 => match u64::from_text(text) {
                Some(u) => serializer.serialize_u64(u),
                None => serializer.serialize_str(text),
            },
            PropertyType::Float16 | PropertyType::Float32 | PropertyType::Float64 => {
                match f64::from_text(text) {
                    Some(f) => serializer.serialize_f64(f),
                    None => serializer.serialize_str(text),
                }
            }
            PropertyType::String => serializer.serialize_str(text),
        }
    }
}
