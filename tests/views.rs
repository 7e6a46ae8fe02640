// View and legacy adapter suite, exercised through the public API only.
//
// Invariants exercised:
// - Views mirror their dictionary: same len, slot order, no own version.
// - Read-only views reject mutation with NotSupported.
// - Loosely-typed entry points reject null keys, even on an empty table.
// - Copy-outs validate fully before writing.
use keyed_dict::legacy::{DictionaryEntry, ElementType, LegacyArray, Object};
use keyed_dict::{
    ArgumentFault, ByteDictionary, Error, ObjectCollection, ObjectDictionary, ReadOnlyCollection,
    StateFault, TypeDictionary,
};
use test_log::test;

fn sample() -> ByteDictionary<u32> {
    let mut d = ByteDictionary::new();
    for (i, word) in ["red", "green", "blue"].iter().enumerate() {
        d.insert_bytes(word.as_bytes(), i as u32);
    }
    d
}

// Test: views share storage with the dictionary.
// Verifies: a view taken before a value overwrite sees the new value, and
// a view enumerator fails after a structural change.
#[test]
fn views_track_the_dictionary() {
    let mut d = sample();
    let mut values = d.values().enumerator();
    assert_eq!(values.move_next(&d), Ok(true));
    *d.get_bytes_mut(b"red").unwrap() = 7;
    assert_eq!(values.current(&d), Some(&7));

    let keys: Vec<String> = d
        .keys()
        .iter()
        .map(|k| String::from_utf8(k.to_vec()).unwrap())
        .collect();
    assert_eq!(keys, ["red", "green", "blue"]);

    d.remove_bytes(b"green");
    assert_eq!(d.keys().len(), 2);
    assert_eq!(
        values.move_next(&d),
        Err(Error::InvalidState(StateFault::VersionChanged))
    );
    assert_eq!(
        values.reset(&d),
        Err(Error::InvalidState(StateFault::VersionChanged))
    );
}

// Test: read-only contract.
#[test]
fn views_are_read_only() {
    let d = sample();
    let mut keys = d.keys();
    let mut values = d.values();
    assert!(keys.is_read_only() && values.is_read_only());
    assert!(matches!(keys.clear(), Err(Error::NotSupported(_))));
    assert!(matches!(values.add(9), Err(Error::NotSupported(_))));
    assert!(matches!(values.remove(&0), Err(Error::NotSupported(_))));
    assert!(ReadOnlyCollection::contains(&keys, &Box::from(&b"blue"[..])));
    assert!(ReadOnlyCollection::contains(&values, &2));
    assert_eq!(d.len(), 3);
}

// Test: null keys on every loosely-typed entry point.
// Verifies: InvalidArgument naming "key" whether the table is empty or not.
#[test]
fn null_keys_everywhere() {
    let mut empty: ByteDictionary<u32> = ByteDictionary::new();
    let mut filled = sample();
    for d in [&mut empty, &mut filled] {
        let before = d.len();
        assert_eq!(d.get_object(None).unwrap_err().param(), Some("key"));
        assert_eq!(d.contains_object(None).unwrap_err().param(), Some("key"));
        assert_eq!(d.remove_object(None).unwrap_err().param(), Some("key"));
        let value: Option<Object> = Some(Box::new(1u32));
        assert_eq!(d.set_object(None, value).unwrap_err().param(), Some("key"));
        assert_eq!(d.add_object(None, None).unwrap_err().param(), Some("key"));
        assert_eq!(d.len(), before);
    }
}

// Test: loosely-typed round trip through a type-keyed dictionary.
#[test]
fn object_access_on_type_dictionary() {
    let mut d: TypeDictionary<Option<&'static str>> = TypeDictionary::new();
    d.set_object(Some(Box::new(keyed_dict::TypeKey::of::<u8>())), Some(Box::new(Some("byte"))))
        .unwrap();
    d.set_object(Some(Box::new(keyed_dict::TypeKey::of::<u16>())), None)
        .unwrap();
    assert_eq!(d.get_type::<u8>(), Some(&Some("byte")));
    assert_eq!(d.get_type::<u16>(), Some(&None));

    let err = d
        .set_object(Some(Box::new(8u8)), Some(Box::new(Some("x"))))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidArgument {
            param: "key",
            fault: ArgumentFault::WrongKeyType { .. }
        }
    ));

    let mut e = d.object_enumerator();
    let mut seen = 0;
    while e.move_next(&d).unwrap() {
        let entry = e.entry(&d).unwrap();
        assert!(entry.key.is::<keyed_dict::TypeKey>());
        seen += 1;
    }
    assert_eq!(seen, 2);
}

// Test: copy-out into loosely-typed arrays.
// Verifies: nothing is written when validation fails, and each accepted
// element type receives what it should.
#[test]
fn copy_out_to_legacy_arrays() {
    let d = sample();

    let mut too_small = LegacyArray::entries(3);
    assert!(matches!(
        d.copy_to_array(&mut too_small, 1),
        Err(Error::InvalidArgument {
            param: "array",
            fault: ArgumentFault::ArrayTooSmall
        })
    ));
    assert!((0..3).all(|i| too_small.get(i).is_none()));

    let mut entries = LegacyArray::entries(4);
    d.copy_to_array(&mut entries, 1).unwrap();
    let first = entries.get_as::<DictionaryEntry>(1).unwrap();
    assert_eq!(first.value.downcast_ref::<u32>(), Some(&0));
    assert!(entries.get(0).is_none());

    let mut values = LegacyArray::of::<u32>(3);
    d.values().copy_to_array(&mut values, 0).unwrap();
    assert_eq!(values.get_as::<u32>(2), Some(&2));

    let mut jagged = LegacyArray::with_shape(ElementType::of::<u32>(), 2, 0, 3);
    assert!(d.values().copy_to_array(&mut jagged, 0).is_err());
}
