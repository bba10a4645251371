use bot_encoder::*;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};

// =============================================================================
// Helpers
// =============================================================================

fn body(sink: &RecordingSink) -> Vec<SinkEvent> {
    sink.body().into_iter().cloned().collect()
}

fn record<T: Serializable>(value: &T) -> Vec<SinkEvent> {
    let mut writer = Writer::new(RecordingSink::default()).unwrap();
    value.write(&mut writer).unwrap();
    body(&writer.finish().unwrap())
}

fn ints(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn scalar(name: &str, native: NativeType, raw: &[u8]) -> SinkEvent {
    SinkEvent::Scalar {
        name: name.to_string(),
        native,
        raw: raw.to_vec(),
    }
}

fn header(name: &str, tag: Tag, count: u64) -> SinkEvent {
    SinkEvent::BeginCollection {
        name: name.to_string(),
        tag,
        count,
    }
}

fn dimension(len: u64, class: SizeClass) -> SinkEvent {
    SinkEvent::Dimension { len, class }
}

fn leaf(native: NativeType, raw: &[u8], count: u64) -> SinkEvent {
    SinkEvent::LeafArray {
        native,
        raw: raw.to_vec(),
        count,
    }
}

// =============================================================================
// Test types
// =============================================================================

#[derive(Serializable, Default)]
struct Inner {
    x: u16,
}

#[derive(Serializable, Default)]
struct Sparse {
    a: u32,
    b: i64,
    c: f32,
    flag: bool,
    inner: Inner,
    note: Option<u8>,
}

#[derive(Serializable)]
struct Grid {
    cells: Vec<Vec<i32>>,
}

#[derive(Serializable)]
struct Outer {
    id: u32,
    inner: Inner,
    empty: Inner,
}

#[derive(Serializable)]
struct Node {
    value: u8,
    child: Option<Box<Node>>,
}

fn chain(len: u8) -> Node {
    let mut node = Node {
        value: len,
        child: None,
    };
    for value in (1..len).rev() {
        node = Node {
            value,
            child: Some(Box::new(node)),
        };
    }
    node
}

#[derive(Serializable, Default)]
struct Tagged {
    #[bot(rename = "n")]
    number: u32,
    #[bot(skip)]
    cache: u64,
    #[bot(size = "short")]
    list: Vec<u8>,
}

#[derive(Serializable)]
struct Pair(u8, i16);

#[derive(Serializable)]
struct Marker;

#[derive(Primitive)]
#[bot(repr = "u64")]
struct Vector2i {
    x: i32,
    y: i32,
}

#[derive(Primitive)]
#[bot(repr = "u32")]
struct Rgb(u8, u8, u8);

#[derive(Primitive)]
#[bot(repr = "u16")]
struct Oversized {
    a: u16,
    b: u8,
}

#[derive(Primitive)]
struct Celsius(f64);

impl SerializedAs for Celsius {
    type Repr = i16;

    fn to_repr(&self) -> Result<i16> {
        let hundredths = (self.0 * 100.0).round();
        if hundredths < i16::MIN as f64 || hundredths > i16::MAX as f64 {
            return Err(EncoderError::Size(format!("{} does not fit i16", self.0)));
        }
        Ok(hundredths as i16)
    }
}

#[derive(Serializable)]
struct Body {
    position: Vector2i,
    path: Vec<Vector2i>,
    color: Rgb,
    temperature: Celsius,
}

#[derive(Serializable)]
struct Wrapper<T> {
    inner: T,
    #[bot(skip)]
    revision: u8,
}

#[derive(Serializable)]
struct Unwritable {
    before: u8,
    maps: Vec<Vec<HashMap<u8, u8>>>,
    flat_maps: Vec<HashMap<u8, u8>>,
    after: u8,
}

// =============================================================================
// Jagged arrays
// =============================================================================

#[test]
fn test_jagged_array_scenario() {
    let grid = Grid {
        cells: vec![vec![1, 2], vec![3, 4, 5, 6, 7], vec![8]],
    };

    assert_eq!(
        record(&grid),
        vec![
            header("cells", Tag::TINY_ARRAY, 3),
            SinkEvent::Descriptors(vec![Tag::TINY_ARRAY, Tag::INT]),
            SinkEvent::Count(3),
            dimension(2, SizeClass::Tiny),
            leaf(NativeType::I32, &ints(&[1, 2]), 2),
            dimension(5, SizeClass::Tiny),
            leaf(NativeType::I32, &ints(&[3, 4, 5, 6, 7]), 5),
            dimension(1, SizeClass::Tiny),
            leaf(NativeType::I32, &ints(&[8]), 1),
        ]
    );
}

#[test]
fn test_nested_level_sized_by_widest_member() {
    let items = vec![vec![7u16], vec![1u16; 300]];
    let descriptors = resolve_shape(&items).unwrap();
    assert_eq!(descriptors, vec![Tag::SMALL_ARRAY, Tag::SHORT]);

    let mut writer = Writer::new(RecordingSink::default()).unwrap();
    writer.write("rows", &items).unwrap();
    let events = body(writer.sink());
    assert_eq!(events[3], dimension(1, SizeClass::Small));
    assert_eq!(events[5], dimension(300, SizeClass::Small));
}

#[test]
fn test_nested_class_holds_the_widest_length() {
    // Dimension lengths are stored as is, so 255 is the widest a Tiny level can announce
    assert_eq!(
        resolve_shape(&[vec![0u16; 255]]).unwrap(),
        vec![Tag::TINY_ARRAY, Tag::SHORT]
    );
    assert_eq!(
        resolve_shape(&[vec![0u16; 256]]).unwrap(),
        vec![Tag::SMALL_ARRAY, Tag::SHORT]
    );
    assert_eq!(
        resolve_shape(&[Vec::<u16>::new()]).unwrap(),
        vec![Tag::TINY_ARRAY, Tag::SHORT]
    );
}

#[test]
fn test_three_level_descriptors() {
    let items = vec![vec![vec![1u16, 2], vec![3]]];
    assert_eq!(
        resolve_shape(&items).unwrap(),
        vec![Tag::TINY_ARRAY, Tag::TINY_ARRAY, Tag::SHORT]
    );

    let mut writer = Writer::new(RecordingSink::default()).unwrap();
    writer.write("cube", &items).unwrap();
    assert_eq!(
        body(writer.sink()),
        vec![
            header("cube", Tag::TINY_ARRAY, 1),
            SinkEvent::Descriptors(vec![Tag::TINY_ARRAY, Tag::TINY_ARRAY, Tag::SHORT]),
            SinkEvent::Count(1),
            dimension(2, SizeClass::Tiny),
            dimension(2, SizeClass::Tiny),
            leaf(NativeType::U16, &[1, 0, 2, 0], 2),
            dimension(1, SizeClass::Tiny),
            leaf(NativeType::U16, &[3, 0], 1),
        ]
    );
}

#[test]
fn test_flat_array_has_no_dimension_markers() {
    let mut writer = Writer::new(RecordingSink::default()).unwrap();
    writer.write("pos", &[3i32, 0]).unwrap();
    assert_eq!(
        body(writer.sink()),
        vec![
            header("pos", Tag::TINY_ARRAY, 2),
            SinkEvent::Descriptors(vec![Tag::INT]),
            SinkEvent::Count(2),
            leaf(NativeType::I32, &ints(&[3, 0]), 2),
        ]
    );
}

// =============================================================================
// Omission
// =============================================================================

#[test]
fn test_zero_scalars_are_omitted() {
    let sparse = Sparse {
        a: 5,
        ..Default::default()
    };
    assert_eq!(
        record(&sparse),
        vec![scalar("a", NativeType::U32, &5u32.to_le_bytes())]
    );
}

#[test]
fn test_writing_zero_equals_not_writing() {
    let mut with_zero = Writer::new(RecordingSink::default()).unwrap();
    with_zero.write("a", &1u8).unwrap();
    with_zero.write("zero", &0u64).unwrap();
    with_zero.write("none", &None::<u32>).unwrap();
    with_zero.write("off", &false).unwrap();

    let mut without = Writer::new(RecordingSink::default()).unwrap();
    without.write("a", &1u8).unwrap();

    assert_eq!(with_zero.sink().events(), without.sink().events());
}

#[test]
fn test_default_object_is_omitted() {
    let mut writer = Writer::new(RecordingSink::default()).unwrap();
    writer.write_object("sparse", &Sparse::default()).unwrap();
    writer.write("inner", &Inner::default()).unwrap();
    assert!(writer.sink().body().is_empty());
    assert!(Sparse::default().is_default());
}

#[test]
fn test_negative_zero_float_is_written() {
    let sparse = Sparse {
        c: -0.0,
        ..Default::default()
    };
    assert_eq!(
        record(&sparse),
        vec![scalar("c", NativeType::F32, &(-0.0f32).to_le_bytes())]
    );
}

#[test]
fn test_option_some_is_written() {
    let sparse = Sparse {
        note: Some(9),
        ..Default::default()
    };
    assert_eq!(record(&sparse), vec![scalar("note", NativeType::U8, &[9])]);
}

// =============================================================================
// Zero-length and unwritable collections
// =============================================================================

#[test]
fn test_empty_collections_are_never_written() {
    let mut writer = Writer::new(RecordingSink::default()).unwrap();
    writer.write("list", &Vec::<u32>::new()).unwrap();
    writer.write("nested", &Vec::<Vec<u8>>::new()).unwrap();
    writer.write("map", &BTreeMap::<u8, u8>::new()).unwrap();
    writer.write("blob", &Bytes::new()).unwrap();
    writer.write("fixed", &[0u8; 0]).unwrap();
    assert!(writer.sink().body().is_empty());
}

#[test]
fn test_empty_nested_member_is_written_with_zero_length() {
    let grid = Grid {
        cells: vec![vec![1, 2], vec![], vec![3]],
    };
    assert_eq!(
        record(&grid),
        vec![
            header("cells", Tag::TINY_ARRAY, 3),
            SinkEvent::Descriptors(vec![Tag::TINY_ARRAY, Tag::INT]),
            SinkEvent::Count(3),
            dimension(2, SizeClass::Tiny),
            leaf(NativeType::I32, &ints(&[1, 2]), 2),
            dimension(0, SizeClass::Tiny),
            leaf(NativeType::I32, &[], 0),
            dimension(1, SizeClass::Tiny),
            leaf(NativeType::I32, &ints(&[3]), 1),
        ]
    );
}

#[test]
fn test_all_empty_nested_members() {
    let grid = Grid {
        cells: vec![vec![], vec![]],
    };
    assert_eq!(
        record(&grid),
        vec![
            header("cells", Tag::TINY_ARRAY, 2),
            SinkEvent::Descriptors(vec![Tag::TINY_ARRAY, Tag::INT]),
            SinkEvent::Count(2),
            dimension(0, SizeClass::Tiny),
            leaf(NativeType::I32, &[], 0),
            dimension(0, SizeClass::Tiny),
            leaf(NativeType::I32, &[], 0),
        ]
    );
}

#[test]
fn test_unterminated_shape_is_omitted() {
    let mut map = HashMap::new();
    map.insert(1u8, 2u8);
    let value = Unwritable {
        before: 1,
        maps: vec![vec![map.clone()]],
        flat_maps: vec![map],
        after: 2,
    };

    assert_eq!(
        record(&value),
        vec![
            scalar("before", NativeType::U8, &[1]),
            scalar("after", NativeType::U8, &[2]),
        ]
    );
}

#[test]
fn test_resolve_shape_errors() {
    assert!(matches!(
        resolve_shape::<u8>(&[]),
        Err(EncoderError::Size(_))
    ));
    assert!(matches!(
        resolve_shape(&[vec![BTreeMap::<u8, u8>::new()]]),
        Err(EncoderError::Shape(_))
    ));
    assert!(matches!(
        resolve_shape(&[HashMap::<u8, u8>::new()]),
        Err(EncoderError::Shape(_))
    ));
}

// =============================================================================
// Objects
// =============================================================================

#[test]
fn test_nested_objects() {
    let outer = Outer {
        id: 1,
        inner: Inner { x: 2 },
        empty: Inner::default(),
    };

    let mut writer = Writer::new(RecordingSink::default()).unwrap();
    writer.write_object("root", &outer).unwrap();
    assert_eq!(
        body(writer.sink()),
        vec![
            SinkEvent::BeginObject("root".to_string()),
            scalar("id", NativeType::U32, &1u32.to_le_bytes()),
            SinkEvent::BeginObject("inner".to_string()),
            scalar("x", NativeType::U16, &2u16.to_le_bytes()),
            SinkEvent::EndObject,
            SinkEvent::EndObject,
        ]
    );
}

#[test]
fn test_depth_limit() {
    let mut writer = Writer::new(RecordingSink::new(3)).unwrap();
    writer.write_object("root", &chain(3)).unwrap();

    let mut writer = Writer::new(RecordingSink::new(3)).unwrap();
    let result = writer.write_object("root", &chain(4));
    assert!(matches!(result, Err(EncoderError::Depth { max: 3 })));
}

#[test]
fn test_end_object_without_scope() {
    let mut sink = RecordingSink::default();
    assert!(matches!(sink.end_object(), Err(EncoderError::Scope(_))));
}

#[test]
fn test_object_leaves_in_array() {
    let mut writer = Writer::new(RecordingSink::default()).unwrap();
    writer
        .write("items", &vec![Inner { x: 1 }, Inner::default()])
        .unwrap();
    assert_eq!(
        body(writer.sink()),
        vec![
            header("items", Tag::TINY_ARRAY, 2),
            SinkEvent::Descriptors(vec![Tag::OBJECT]),
            SinkEvent::Count(2),
            SinkEvent::BeginObject(String::new()),
            scalar("x", NativeType::U16, &[1, 0]),
            SinkEvent::EndObject,
            SinkEvent::BeginObject(String::new()),
            SinkEvent::EndObject,
        ]
    );
}

// =============================================================================
// Derive attributes
// =============================================================================

#[test]
fn test_derive_attributes() {
    let tagged = Tagged {
        number: 7,
        cache: 99,
        list: vec![1, 2],
    };
    assert_eq!(
        record(&tagged),
        vec![
            scalar("n", NativeType::U32, &7u32.to_le_bytes()),
            header("list", Tag::SHORT_ARRAY, 2),
            SinkEvent::Descriptors(vec![Tag::BYTE]),
            SinkEvent::Count(2),
            leaf(NativeType::U8, &[1, 2], 2),
        ]
    );
}

#[test]
fn test_skipped_field_does_not_count_for_default() {
    let tagged = Tagged {
        cache: 5,
        ..Default::default()
    };
    assert!(tagged.is_default());
}

#[test]
fn test_tuple_and_unit_structs() {
    assert_eq!(
        record(&Pair(3, -1)),
        vec![
            scalar("0", NativeType::U8, &[3]),
            scalar("1", NativeType::I16, &(-1i16).to_le_bytes()),
        ]
    );
    assert!(Marker.is_default());
    assert!(record(&Marker).is_empty());
}

#[test]
fn test_generic_struct_fields() {
    let scalar_inner = Wrapper {
        inner: 5u32,
        revision: 1,
    };
    assert_eq!(
        record(&scalar_inner),
        vec![scalar("inner", NativeType::U32, &5u32.to_le_bytes())]
    );

    let list_inner = Wrapper {
        inner: vec![1u16],
        revision: 0,
    };
    assert_eq!(
        record(&list_inner),
        vec![
            header("inner", Tag::TINY_ARRAY, 1),
            SinkEvent::Descriptors(vec![Tag::SHORT]),
            SinkEvent::Count(1),
            leaf(NativeType::U16, &[1, 0], 1),
        ]
    );

    let nested = Wrapper {
        inner: Wrapper {
            inner: 0u8,
            revision: 3,
        },
        revision: 0,
    };
    assert!(nested.is_default());
    assert!(record(&nested).is_empty());
}

// =============================================================================
// Primitive representations
// =============================================================================

#[test]
fn test_primitive_fields_and_leaves() {
    let body_value = Body {
        position: Vector2i { x: 1, y: -1 },
        path: vec![Vector2i { x: 0, y: 0 }, Vector2i { x: 2, y: 3 }],
        color: Rgb(1, 2, 3),
        temperature: Celsius(21.5),
    };
    assert_eq!(
        record(&body_value),
        vec![
            scalar("position", NativeType::U64, &[1, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]),
            header("path", Tag::TINY_ARRAY, 2),
            SinkEvent::Descriptors(vec![Tag::LONG]),
            SinkEvent::Count(2),
            leaf(
                NativeType::U64,
                &[0, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0],
                2
            ),
            scalar("color", NativeType::U32, &[1, 2, 3, 0]),
            scalar("temperature", NativeType::I16, &2150i16.to_le_bytes()),
        ]
    );
}

#[test]
fn test_zero_representation_is_omitted() {
    let body_value = Body {
        position: Vector2i { x: 0, y: 0 },
        path: Vec::new(),
        color: Rgb(0, 0, 0),
        temperature: Celsius(0.001),
    };
    assert!(body_value.is_default());
    assert!(record(&body_value).is_empty());
}

#[test]
fn test_failed_representation_fails_the_field() {
    let mut writer = Writer::new(RecordingSink::default()).unwrap();
    let result = writer.write("wide", &Oversized { a: 1, b: 2 });
    assert!(matches!(result, Err(EncoderError::Size(_))));
    assert!(!Oversized { a: 0, b: 0 }.is_default_value());

    let result = writer.write("hot", &vec![Celsius(1.0), Celsius(1e6)]);
    assert!(matches!(result, Err(EncoderError::Size(_))));
}

// =============================================================================
// Session configuration
// =============================================================================

#[test]
fn test_fixed_name_length_requires_width() {
    let result = Writer::builder(RecordingSink::default())
        .options(Options {
            fixed_name_length: true,
            full_width: None,
        })
        .build();
    assert!(matches!(result, Err(EncoderError::Mode(_))));
}

#[test]
fn test_fixed_name_length_is_declared_once() {
    let mut writer = Writer::builder(RecordingSink::default())
        .fixed_name_length(4)
        .build()
        .unwrap();
    assert_eq!(
        writer.sink().events()[..2],
        [
            SinkEvent::Init(Options {
                fixed_name_length: true,
                full_width: None,
            }),
            SinkEvent::NameLength(4),
        ]
    );
    assert!(matches!(
        writer.sink_mut().set_name_length(8),
        Err(EncoderError::Mode(_))
    ));
    writer.write("abcd", &1u8).unwrap();
    assert!(matches!(
        writer.write("abcde", &1u8),
        Err(EncoderError::InvalidName(_))
    ));
}

#[test]
fn test_name_length_rejected_in_variable_mode() {
    let mut writer = Writer::new(RecordingSink::default()).unwrap();
    assert!(matches!(
        writer.sink_mut().set_name_length(8),
        Err(EncoderError::Mode(_))
    ));
    let long = "x".repeat(256);
    assert!(matches!(
        writer.write(&long, &1u8),
        Err(EncoderError::InvalidName(_))
    ));
}

#[test]
fn test_full_width_is_a_minimum_for_auto_headers() {
    let mut writer = Writer::builder(RecordingSink::default())
        .full_width(FullWidth::Medium)
        .build()
        .unwrap();
    assert!(writer.sink().has_full_width());
    assert_eq!(writer.sink().full_width(), Some(SizeClass::Medium));
    writer.write("auto", &vec![vec![1u16]]).unwrap();
    writer
        .write_sized("explicit", &vec![1u8], SizeClass::Tiny)
        .unwrap();

    let events = body(writer.sink());
    assert_eq!(events[0], header("auto", Tag::MEDIUM_ARRAY, 1));
    assert_eq!(
        events[1],
        SinkEvent::Descriptors(vec![Tag::TINY_ARRAY, Tag::SHORT])
    );
    assert_eq!(events[5], header("explicit", Tag::TINY_ARRAY, 1));
}

#[test]
fn test_explicit_size_class_too_small() {
    let mut writer = Writer::new(RecordingSink::default()).unwrap();
    let result = writer.write_sized("list", &vec![1u8; 300], SizeClass::Tiny);
    assert!(matches!(result, Err(EncoderError::Size(_))));
    assert!(writer.sink().body().is_empty());
    writer
        .write_sized("list", &vec![1u8; 256], SizeClass::Tiny)
        .unwrap();
}

// =============================================================================
// Dictionaries and blobs
// =============================================================================

#[test]
fn test_dictionary_entries() {
    let mut map = BTreeMap::new();
    map.insert(1u8, 10u32);
    map.insert(2u8, 20u32);

    let mut writer = Writer::new(RecordingSink::default()).unwrap();
    writer.write("map", &map).unwrap();
    assert_eq!(
        body(writer.sink()),
        vec![
            header("map", Tag::TINY_DICT, 2),
            SinkEvent::Descriptors(vec![Tag::BYTE, Tag::INT]),
            SinkEvent::Count(2),
            SinkEvent::Entry {
                key: NativeType::U8,
                key_raw: vec![1],
                value: NativeType::U32,
                value_raw: 10u32.to_le_bytes().to_vec(),
            },
            SinkEvent::Entry {
                key: NativeType::U8,
                key_raw: vec![2],
                value: NativeType::U32,
                value_raw: 20u32.to_le_bytes().to_vec(),
            },
        ]
    );
}

#[test]
fn test_blob_field() {
    let mut writer = Writer::new(RecordingSink::default()).unwrap();
    writer.write("data", &Bytes::from_static(b"hey")).unwrap();
    assert_eq!(
        body(writer.sink()),
        vec![
            header("data", Tag::TINY_BLOB, 3),
            SinkEvent::Count(3),
            leaf(NativeType::U8, b"hey", 3),
        ]
    );
}

#[test]
fn test_blob_leaves_in_array() {
    let blobs = vec![Bytes::from_static(b"ab"), Bytes::from_static(b"c")];
    let mut writer = Writer::new(RecordingSink::default()).unwrap();
    writer.write("chunks", &blobs).unwrap();
    assert_eq!(
        body(writer.sink()),
        vec![
            header("chunks", Tag::TINY_ARRAY, 2),
            SinkEvent::Descriptors(vec![Tag::TINY_BLOB]),
            SinkEvent::Count(2),
            dimension(2, SizeClass::Tiny),
            leaf(NativeType::U8, b"ab", 2),
            dimension(1, SizeClass::Tiny),
            leaf(NativeType::U8, b"c", 1),
        ]
    );
}

#[test]
fn test_nested_byte_sequences_are_blobs() {
    let rows = vec![vec![1u8, 2], vec![3]];
    assert_eq!(resolve_shape(&rows).unwrap(), vec![Tag::TINY_BLOB]);

    let mut writer = Writer::new(RecordingSink::default()).unwrap();
    writer.write("rows", &rows).unwrap();
    let from_vecs = body(writer.sink());
    assert_eq!(
        from_vecs,
        vec![
            header("rows", Tag::TINY_ARRAY, 2),
            SinkEvent::Descriptors(vec![Tag::TINY_BLOB]),
            SinkEvent::Count(2),
            dimension(2, SizeClass::Tiny),
            leaf(NativeType::U8, &[1, 2], 2),
            dimension(1, SizeClass::Tiny),
            leaf(NativeType::U8, &[3], 1),
        ]
    );

    // Same layout as an array of `Bytes`
    let mut writer = Writer::new(RecordingSink::default()).unwrap();
    writer
        .write(
            "rows",
            &vec![Bytes::from_static(&[1, 2]), Bytes::from_static(&[3])],
        )
        .unwrap();
    assert_eq!(body(writer.sink()), from_vecs);
}

#[test]
fn test_byte_blobs_below_nested_arrays() {
    let items = vec![vec![[-1i8, 2]], vec![]];
    assert_eq!(
        resolve_shape(&items).unwrap(),
        vec![Tag::TINY_ARRAY, Tag::TINY_BLOB]
    );

    let mut writer = Writer::new(RecordingSink::default()).unwrap();
    writer.write("frames", &items).unwrap();
    assert_eq!(
        body(writer.sink()),
        vec![
            header("frames", Tag::TINY_ARRAY, 2),
            SinkEvent::Descriptors(vec![Tag::TINY_ARRAY, Tag::TINY_BLOB]),
            SinkEvent::Count(2),
            dimension(1, SizeClass::Tiny),
            dimension(2, SizeClass::Tiny),
            leaf(NativeType::I8, &[0xFF, 2], 2),
            dimension(0, SizeClass::Tiny),
        ]
    );

    // A flat byte array stays an array
    assert_eq!(resolve_shape(&[1u8, 2]).unwrap(), vec![Tag::BYTE]);
}

#[test]
fn test_combined_value_as_field() {
    let packed: Tribyte = Combiner::new()
        .combine(1u8)
        .combine(2u8)
        .combine(3u8)
        .to()
        .unwrap();
    let mut writer = Writer::new(RecordingSink::default()).unwrap();
    writer.write("rgb", &packed).unwrap();
    assert_eq!(
        body(writer.sink()),
        vec![scalar("rgb", NativeType::Tribyte, &[1, 2, 3])]
    );
}

// =============================================================================
// Optional features
// =============================================================================

#[cfg(feature = "uuid")]
#[test]
fn test_uuid_field_and_array() {
    let id = uuid::Uuid::from_bytes([7; 16]);
    let mut writer = Writer::new(RecordingSink::default()).unwrap();
    writer.write("id", &id).unwrap();
    writer.write("nil", &uuid::Uuid::nil()).unwrap();
    writer.write("ids", &vec![id]).unwrap();
    assert_eq!(
        body(writer.sink()),
        vec![
            scalar("id", NativeType::Big, &[7; 16]),
            header("ids", Tag::TINY_ARRAY, 1),
            SinkEvent::Descriptors(vec![Tag::BIG]),
            SinkEvent::Count(1),
            leaf(NativeType::Big, &[7; 16], 1),
        ]
    );
}

#[cfg(feature = "half")]
#[test]
fn test_half_float_field_and_array() {
    use half::f16;

    let mut writer = Writer::new(RecordingSink::default()).unwrap();
    writer.write("one", &f16::from_f32(1.0)).unwrap();
    writer.write("zero", &f16::ZERO).unwrap();
    writer.write("neg_zero", &f16::NEG_ZERO).unwrap();
    writer
        .write("pair", &vec![f16::from_f32(1.0), f16::from_f32(-2.0)])
        .unwrap();
    assert_eq!(
        body(writer.sink()),
        vec![
            scalar("one", NativeType::U16, &[0x00, 0x3C]),
            scalar("neg_zero", NativeType::U16, &[0x00, 0x80]),
            header("pair", Tag::TINY_ARRAY, 2),
            SinkEvent::Descriptors(vec![Tag::SHORT]),
            SinkEvent::Count(2),
            leaf(NativeType::U16, &[0x00, 0x3C, 0x00, 0xC0], 2),
        ]
    );
}

#[cfg(feature = "indexmap")]
#[test]
fn test_indexmap_keeps_insertion_order() {
    let mut map = indexmap::IndexMap::new();
    map.insert(9u8, true);
    map.insert(1u8, true);
    let mut writer = Writer::new(RecordingSink::default()).unwrap();
    writer.write("flags", &map).unwrap();

    let keys: Vec<Vec<u8>> = body(writer.sink())
        .into_iter()
        .filter_map(|e| match e {
            SinkEvent::Entry { key_raw, .. } => Some(key_raw),
            _ => None,
        })
        .collect();
    assert_eq!(keys, vec![vec![9], vec![1]]);
}
