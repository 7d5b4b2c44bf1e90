use acm::{acm, from_slice, from_str, to_string, to_vec, PropertyType, WriteOptions};

#[test]
fn test_macro_anonymous_root() {
    let root = acm!(object { int32 x = 1 });
    assert_eq!(root.name(), None);
    assert_eq!(root.get_int("x", 0), 1);
}

#[test]
fn test_macro_empty_object() {
    let root = acm!(object cfg {});
    assert!(root.is_object());
    assert!(root.is_empty());
}

#[test]
fn test_macro_aliases() {
    let root = acm!(object cfg { int a = 1, uint b = 2, float c = 0.5 });
    let types: Vec<_> = root.iter().map(|b| b.property_type()).collect();
    assert_eq!(
        types,
        vec![PropertyType::Int32, PropertyType::UInt32, PropertyType::Float32]
    );
}

#[test]
fn test_macro_expressions() {
    let width: u16 = 640;
    let title = String::from("level one");
    let root = acm!(object cfg {
        uint16 width = width * 2,
        string title = title.clone(),
        array int64 steps = [i64::from(width), i64::from(width) + 1],
    });

    assert_eq!(root.get_uint("width", 0), 1280);
    assert_eq!(root.get_string("title", ""), "level one");
    assert_eq!(root.get_array::<i64>("steps", None), Some(vec![640, 641]));
}

#[test]
fn test_macro_nested_roundtrip() {
    let root = acm!(object world {
        string name = "e1m1",
        object spawn {
            array float origin = [0.0, 0.0, 24.0],
            float16 yaw = 90.0,
        },
        array object entities = [
            { string class = "door", bool locked = true },
            { string class = "monster", uint8 health = 100 },
        ],
    });

    let text = to_string(&root).unwrap();
    assert_eq!(from_str(&text).unwrap(), root);

    let entities = root.find("entities").unwrap();
    assert_eq!(entities.child_type(), Some(PropertyType::Object));
    assert_eq!(entities.len(), 2);
    assert!(entities.child(0).unwrap().get_bool("locked", false));
    assert_eq!(entities.child(1).unwrap().get_uint("health", 0), 100);
}

#[test]
fn test_macro_trailing_commas() {
    let a = acm!(object cfg { int32 x = 1, });
    let b = acm!(object cfg { int32 x = 1 });
    assert_eq!(a, b);
}

#[test]
fn test_macro_boundary_values() {
    let root = acm!(object limits {
        int8 low = -128,
        int8 high = i8::MAX,
        uint8 byte = 255,
        int16 small = i16::MIN,
        uint16 wide = 65535,
        int64 big = i64::MIN,
        uint64 huge = 18446744073709551615,
        array uint8 bytes = [0, 255],
        array int16 edges = [-32768, 32767],
    });

    let texts: Vec<_> = root.iter().take(7).map(|b| b.text().unwrap()).collect();
    assert_eq!(
        texts,
        vec![
            "-128",
            "127",
            "255",
            "-32768",
            "65535",
            "-9223372036854775808",
            "18446744073709551615",
        ]
    );
    assert_eq!(root.get_array::<u8>("bytes", None), Some(vec![0, 255]));
    assert_eq!(root.get_array::<i16>("edges", None), Some(vec![i16::MIN, i16::MAX]));

    let bytes = to_vec(&root, &WriteOptions::binary()).unwrap();
    assert_eq!(from_slice(&bytes).unwrap(), root);
}
