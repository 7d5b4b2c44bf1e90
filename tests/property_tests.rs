//! Property-based tests for the round-trip guarantees of both formats.
//!
//! Trees are generated through the public builders, written, read back and
//! compared structurally: same shape, types, names and scalar text.

use acm::{from_slice, from_str, to_vec, BinaryVersion, Branch, WriteOptions, F16};
use proptest::prelude::*;

fn name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-z_][a-z0-9_]{0,8}",
        "[a-z][a-z ]{0,6}[a-z]",
        Just("int".to_string()),
    ]
}

fn text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 _.:-]{0,12}"
}

fn integer() -> impl Strategy<Value = Branch> {
    prop_oneof![
        (name(), any::<i8>()).prop_map(|(n, v)| Branch::scalar(&n, v)),
        (name(), any::<i16>()).prop_map(|(n, v)| Branch::scalar(&n, v)),
        (name(), any::<i32>()).prop_map(|(n, v)| Branch::scalar(&n, v)),
        (name(), any::<i64>()).prop_map(|(n, v)| Branch::scalar(&n, v)),
        (name(), any::<u8>()).prop_map(|(n, v)| Branch::scalar(&n, v)),
        (name(), any::<u16>()).prop_map(|(n, v)| Branch::scalar(&n, v)),
        (name(), any::<u32>()).prop_map(|(n, v)| Branch::scalar(&n, v)),
        (name(), any::<u64>()).prop_map(|(n, v)| Branch::scalar(&n, v)),
    ]
}

fn scalar() -> impl Strategy<Value = Branch> {
    prop_oneof![
        2 => integer(),
        1 => (name(), any::<bool>()).prop_map(|(n, v)| Branch::scalar(&n, v)),
        1 => (name(), -1.0e6f32..1.0e6f32).prop_map(|(n, v)| Branch::scalar(&n, v)),
        1 => (name(), -1.0e12f64..1.0e12f64).prop_map(|(n, v)| Branch::scalar(&n, v)),
        1 => (name(), -1000.0f32..1000.0f32)
            .prop_map(|(n, v)| Branch::scalar(&n, F16::from_f32(v))),
        1 => (name(), text()).prop_map(|(n, v)| Branch::scalar(&n, v)),
    ]
}

fn scalar_array() -> impl Strategy<Value = Branch> {
    prop_oneof![
        (name(), prop::collection::vec(any::<i32>(), 0..6)).prop_map(|(n, values)| {
            let mut array = Branch::object("tmp");
            array.push_array_values(&n, &values).unwrap();
            array.remove_child(0).unwrap()
        }),
        (name(), prop::collection::vec(any::<u16>(), 0..6)).prop_map(|(n, values)| {
            let mut array = Branch::object("tmp");
            array.push_array_values(&n, &values).unwrap();
            array.remove_child(0).unwrap()
        }),
        (name(), prop::collection::vec(text(), 0..6)).prop_map(|(n, values)| {
            let mut array = Branch::object("tmp");
            array.push_array_values(&n, &values).unwrap();
            array.remove_child(0).unwrap()
        }),
    ]
}

fn tree() -> impl Strategy<Value = Branch> {
    let leaf = prop_oneof![3 => scalar(), 1 => scalar_array()];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            (name(), prop::collection::vec(inner.clone(), 0..6)).prop_map(|(n, children)| {
                let mut object = Branch::object(&n);
                for child in children {
                    object.push_branch(child).unwrap();
                }
                object
            }),
            (name(), prop::collection::vec(prop::collection::vec(inner, 0..4), 0..4)).prop_map(
                |(n, elements)| {
                    let mut array = Branch::object("tmp");
                    let mut list = array.push_array_object(&n).unwrap();
                    for children in elements {
                        let mut element = list.push_object("").unwrap();
                        for child in children {
                            element.push_branch(child).unwrap();
                        }
                    }
                    array.remove_child(0).unwrap()
                }
            ),
        ]
    })
}

fn root() -> impl Strategy<Value = Branch> {
    (name(), prop::collection::vec(tree(), 0..6)).prop_map(|(n, children)| {
        let mut root = Branch::object(&n);
        for child in children {
            root.push_branch(child).unwrap();
        }
        root
    })
}

fn binary_roundtrip(root: &Branch, version: BinaryVersion) -> Branch {
    let options = WriteOptions::binary().with_binary_version(version);
    let bytes = to_vec(root, &options).unwrap();
    from_slice(&bytes).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_binary_current(root in root()) {
        prop_assert_eq!(binary_roundtrip(&root, BinaryVersion::CURRENT), root);
    }

    #[test]
    fn prop_binary_v1(root in root()) {
        prop_assert_eq!(binary_roundtrip(&root, BinaryVersion::Versioned(1)), root);
    }

    #[test]
    fn prop_binary_legacy(root in root()) {
        prop_assert_eq!(binary_roundtrip(&root, BinaryVersion::Legacy), root);
    }

    #[test]
    fn prop_text(root in root()) {
        let text = acm::to_string(&root).unwrap();
        prop_assert_eq!(from_str(&text).unwrap(), root);
    }

    #[test]
    fn prop_text_then_binary(root in root()) {
        let text = acm::to_string(&root).unwrap();
        let parsed = from_str(&text).unwrap();
        prop_assert_eq!(binary_roundtrip(&parsed, BinaryVersion::CURRENT), root);
    }

    #[test]
    fn prop_clone_is_deep(root in root(), extra in scalar()) {
        let mut copy = root.clone();
        copy.push_branch(extra).unwrap();
        prop_assert_eq!(copy.len(), root.len() + 1);
    }

    #[test]
    fn prop_array_values(values in prop::collection::vec(any::<i64>(), 0..16)) {
        let mut root = Branch::object("cfg");
        root.push_array_values("v", &values).unwrap();
        prop_assert_eq!(root.get_array::<i64>("v", None), Some(values.clone()));
        prop_assert_eq!(root.get_array::<i64>("v", Some(values.len() + 1)), None);
    }

    #[test]
    fn prop_garbage_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut buffer = b"node.binx\n\x02\x00\x00\x00".to_vec();
        buffer.extend_from_slice(&bytes);
        let _ = from_slice(&buffer);

        let text = String::from_utf8_lossy(&bytes).into_owned();
        let _ = from_str(&text);
    }
}
