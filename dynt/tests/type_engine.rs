use dynt::{parse_string, Error, Kind, NullLogger, ParseOptions, Primitive};
use pretty_assertions::assert_eq;

#[test]
fn primitive_i32_has_expected_layout() {
    let tree = parse_string("I", &ParseOptions::new()).unwrap();
    let root = tree.root();
    assert_eq!(root.kind(), Kind::Simple);
    assert_eq!(root.primitive(), Some(Primitive::I32));
    assert_eq!(root.size(), 4);
    assert_eq!(root.align(), 4);
}

#[test]
fn struct_with_reuse_computes_offsets() {
    let tree = parse_string("Tperson={ssi age weight height};Lperson;", &ParseOptions::new()).unwrap();
    let root = tree.root();
    assert!(root.is_typed_pointer());
    let person = root.typed_pointer_target_type().unwrap();
    assert!(person.is_complex());
    assert_eq!(person.name(), Some("person"));

    let weight = person.complex_index_for_name("weight").unwrap();
    assert_eq!(weight, 1);
    let height = person.complex_index_for_name("height").unwrap();
    assert_eq!(height, 2);
    assert!(person.complex_index_for_name("nonexistent").is_none());

    let blob = person.alloc().unwrap();
    assert_eq!(blob.len(), 8);
    let weight_loc = person.complex_field_loc(blob.as_bytes(), weight).unwrap();
    assert_eq!(weight_loc.as_ptr() as usize - blob.as_bytes().as_ptr() as usize, 2);
    let height_loc = person.complex_field_loc(blob.as_bytes(), height).unwrap();
    assert_eq!(height_loc.as_ptr() as usize - blob.as_bytes().as_ptr() as usize, 4);

    person.destroy_value(blob);
}

#[test]
fn sequence_of_structs_manages_capacity() {
    let tree = parse_string("[{DD x y}", &ParseOptions::new()).unwrap();
    let seq = tree.root();
    assert!(seq.is_sequence());
    assert_eq!(seq.size(), 16); // {u32, u32, ptr} on a 64-bit target

    let element = seq.sequence_element_type().unwrap();
    assert!(element.is_complex());
    assert_eq!(element.complex_field_count(), 2);

    let logger = NullLogger;
    let mut blob = seq.alloc().unwrap();
    seq.sequence_alloc(blob.as_bytes_mut(), 3).unwrap();
    assert_eq!(seq.sequence_cap(blob.as_bytes()).unwrap(), 3);
    assert_eq!(seq.sequence_len(blob.as_bytes()).unwrap(), 0);

    for _ in 0..3 {
        seq.sequence_push_slot(blob.as_bytes_mut(), &logger).unwrap();
    }
    assert_eq!(seq.sequence_len(blob.as_bytes()).unwrap(), 3);

    let err = seq
        .sequence_push_slot(blob.as_bytes_mut(), &logger)
        .unwrap_err();
    assert!(matches!(err, Error::OutOfRange { index: 3, cap: 3, .. }));
    assert_eq!(seq.sequence_len(blob.as_bytes()).unwrap(), 3, "failed push must not bump len");

    seq.destroy_value(blob);
}

#[test]
fn self_reference_via_external_scope() {
    let owner = parse_string(
        "Tnode={[IP children next};lnode;",
        &ParseOptions::new(),
    )
    .unwrap();
    let node_type = owner.root().resolve();
    assert!(node_type.is_complex());
    assert_eq!(node_type.name(), Some("node"));

    let scope: Vec<(String, dynt::NodeHandle)> = vec![("node".to_string(), node_type.clone())];
    let opts = ParseOptions::new().ext_scope(&scope);
    let pointer_tree = parse_string("*lnode;", &opts).unwrap();

    let root = pointer_tree.root();
    assert!(root.is_typed_pointer());
    let target = root.typed_pointer_target_type().unwrap();
    assert!(target.is_complex());
    assert_eq!(target.name(), Some("node"));

    let children = target.complex_field_type(0).unwrap();
    assert!(children.is_sequence());
    assert_eq!(children.sequence_element_type().unwrap().primitive(), Some(Primitive::I32));

    let next = target.complex_field_type(1).unwrap();
    assert_eq!(next.primitive(), Some(Primitive::Ptr));
}

#[test]
fn text_field_round_trips_through_c_string_storage() {
    let tree = parse_string("{t name}", &ParseOptions::new()).unwrap();
    let root = tree.root();
    assert!(root.is_complex());
    let field = root.complex_field_type(0).unwrap();
    assert_eq!(field.kind(), Kind::Text);
    assert_eq!(field.size() as usize, std::mem::size_of::<usize>());

    let mut blob = root.alloc().unwrap();
    {
        let loc = root.complex_field_loc_mut(blob.as_bytes_mut(), 0).unwrap();
        field.text_init(loc, "hello type engine").unwrap();
    }
    let loc = root.complex_field_loc(blob.as_bytes(), 0).unwrap();
    assert_eq!(field.text_read(loc).unwrap(), "hello type engine");

    root.destroy_value(blob);
}

#[test]
fn malformed_inputs_are_parse_errors() {
    for input in ["{Ii a", "Q", "llmissing;"] {
        let err = parse_string(input, &ParseOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }), "input {input:?} should fail to parse");
    }
}

#[test]
fn sequence_accessors_reject_a_multi_field_complex() {
    let tree = parse_string("Tperson={ssi age weight height};Lperson;", &ParseOptions::new()).unwrap();
    let person = tree.root().typed_pointer_target_type().unwrap();
    assert!(person.is_complex());
    assert_eq!(person.complex_field_count(), 3);

    let logger = NullLogger;
    let mut blob = person.alloc().unwrap();

    let err = person.sequence_cap(blob.as_bytes()).unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));

    let err = person.sequence_len(blob.as_bytes()).unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));

    let err = person.sequence_alloc(blob.as_bytes_mut(), 3).unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));

    let err = person.sequence_elem_loc(blob.as_bytes(), 0).unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));

    let err = person.sequence_push_slot(blob.as_bytes_mut(), &logger).unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));

    person.destroy_value(blob);
}

#[test]
fn complex_accessors_reject_a_sequence_header() {
    let tree = parse_string("[{DD x y}", &ParseOptions::new()).unwrap();
    let seq = tree.root();
    assert!(seq.is_sequence());

    let blob = seq.alloc().unwrap();

    let err = seq.complex_field_loc(blob.as_bytes(), 0).unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
    assert!(seq.complex_field_type(0).is_none());

    seq.destroy_value(blob);
}

#[test]
fn empty_complex_has_zero_size_and_unit_alignment() {
    let tree = parse_string("{}", &ParseOptions::new()).unwrap();
    let root = tree.root();
    assert!(root.is_complex());
    assert_eq!(root.size(), 0);
    assert_eq!(root.align(), 1);
    assert_eq!(root.complex_field_count(), 0);
}
