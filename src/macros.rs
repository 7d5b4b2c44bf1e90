//! The [`acm!`](crate::acm) macro for building trees inline.

use crate::branch::{Branch, Scalar};
use crate::PropertyType;

#[doc(hidden)]
pub fn __attach(object: &mut Branch, child: Branch) {
    object.append(child);
}

#[doc(hidden)]
pub fn __scalar_array<T: Scalar>(name: &str, values: Vec<T>) -> Branch {
    let mut array = Branch::container(
        Some(name.to_string()).filter(|n| !n.is_empty()),
        PropertyType::Array,
        Some(T::TYPE),
    );
    for value in values {
        array.append(Branch::from_text(None, T::TYPE, value.to_text()));
    }
    array
}

#[doc(hidden)]
pub fn __object_array(name: &str, elements: Vec<Branch>) -> Branch {
    let mut array = Branch::container(
        Some(name.to_string()).filter(|n| !n.is_empty()),
        PropertyType::Array,
        Some(PropertyType::Object),
    );
    for element in elements {
        array.append(element);
    }
    array
}

/// Builds a [`Branch`](crate::Branch) tree using the text format's
/// keywords.
///
/// Entries are comma-separated. Scalars are written `type name = value`,
/// arrays `array type name = [..]`, and nested objects `object name { .. }`.
/// Elements of an `array object` are bare `{ .. }` blocks.
///
/// ```rust
/// use acm::acm;
///
/// let cfg = acm!(object cfg {
///     int32 x = 42,
///     bool flag = true,
///     string title = "Hello World",
///     array float origin = [0.0, 1.5, -2.0],
///     object video {
///         uint width = 1920,
///     },
///     array object actors = [
///         { string class = "door" },
///         { string class = "light", float64 radius = 2.5 },
///     ],
/// });
///
/// assert_eq!(cfg.get_int("x", 0), 42);
/// assert_eq!(cfg.get_array::<f32>("origin", None), Some(vec![0.0, 1.5, -2.0]));
/// ```
#[macro_export]
macro_rules! acm {
    // anonymous object
    (object { $($body:tt)* }) => {{
        let mut object = $crate::Branch::object("");
        $crate::acm!(@fill object; $($body)*);
        object
    }};

    // named object
    (object $name:ident { $($body:tt)* }) => {{
        let mut object = $crate::Branch::object(stringify!($name));
        $crate::acm!(@fill object; $($body)*);
        object
    }};

    (@fill $obj:ident; ) => {};

    (@fill $obj:ident; object $name:ident { $($inner:tt)* } $(, $($rest:tt)*)?) => {
        $crate::macros::__attach(&mut $obj, $crate::acm!(object $name { $($inner)* }));
        $crate::acm!(@fill $obj; $($($rest)*)?);
    };

    (@fill $obj:ident; array object $name:ident = [ $({ $($elem:tt)* }),* $(,)? ] $(, $($rest:tt)*)?) => {
        $crate::macros::__attach(
            &mut $obj,
            $crate::macros::__object_array(
                stringify!($name),
                vec![$($crate::acm!(object { $($elem)* })),*],
            ),
        );
        $crate::acm!(@fill $obj; $($($rest)*)?);
    };

    (@fill $obj:ident; array string $name:ident = [ $($val:expr),* $(,)? ] $(, $($rest:tt)*)?) => {
        $crate::macros::__attach(
            &mut $obj,
            $crate::macros::__scalar_array::<::std::string::String>(
                stringify!($name),
                vec![$(::std::string::String::from($val)),*],
            ),
        );
        $crate::acm!(@fill $obj; $($($rest)*)?);
    };

    (@fill $obj:ident; array float16 $name:ident = [ $($val:expr),* $(,)? ] $(, $($rest:tt)*)?) => {
        $crate::macros::__attach(
            &mut $obj,
            $crate::macros::__scalar_array::<$crate::F16>(
                stringify!($name),
                vec![$($crate::F16::from_f32({ let v: f32 = $val; v })),*],
            ),
        );
        $crate::acm!(@fill $obj; $($($rest)*)?);
    };

    (@fill $obj:ident; array $kw:ident $name:ident = [ $($val:expr),* $(,)? ] $(, $($rest:tt)*)?) => {
        $crate::macros::__attach(
            &mut $obj,
            $crate::macros::__scalar_array::<$crate::acm!(@ty $kw)>(
                stringify!($name),
                vec![$({ let v: $crate::acm!(@ty $kw) = $val; v }),*],
            ),
        );
        $crate::acm!(@fill $obj; $($($rest)*)?);
    };

    (@fill $obj:ident; string $name:ident = $val:expr $(, $($rest:tt)*)?) => {
        $crate::macros::__attach(
            &mut $obj,
            $crate::Branch::scalar(stringify!($name), ::std::string::String::from($val)),
        );
        $crate::acm!(@fill $obj; $($($rest)*)?);
    };

    (@fill $obj:ident; float16 $name:ident = $val:expr $(, $($rest:tt)*)?) => {
        $crate::macros::__attach(
            &mut $obj,
            $crate::Branch::scalar(
                stringify!($name),
                $crate::F16::from_f32({ let v: f32 = $val; v }),
            ),
        );
        $crate::acm!(@fill $obj; $($($rest)*)?);
    };

    (@fill $obj:ident; $kw:ident $name:ident = $val:expr $(, $($rest:tt)*)?) => {
        $crate::macros::__attach(
            &mut $obj,
            $crate::Branch::scalar(stringify!($name), { let v: $crate::acm!(@ty $kw) = $val; v }),
        );
        $crate::acm!(@fill $obj; $($($rest)*)?);
    };

    (@ty bool) => { bool };
    (@ty int8) => { i8 };
    (@ty int16) => { i16 };
    (@ty int32) => { i32 };
    (@ty int) => { i32 };
    (@ty int64) => { i64 };
    (@ty uint8) => { u8 };
    (@ty uint16) => { u16 };
    (@ty uint32) => { u32 };
    (@ty uint) => { u32 };
    (@ty uint64) => { u64 };
    (@ty float) => { f32 };
    (@ty float64) => { f64 };
}
