/// Codec-level tests: annotations, lists, and parameter lists encoded into a
/// byte sink, then decoded back from a class-file buffer whose constant pool
/// is the symbol table the encoder filled.
///
/// Each test builds `[class header][constant pool][payload]` so that the
/// payload starts at `reader.header()`.
use annot_attrs::{
    read_annotations, read_parameter_annotations, write_annotations, write_parameter_annotations,
    Annotation, ElementValue, MAX_NESTING_DEPTH,
};
use annot_core::format::{MAX_U16_COUNT, MAX_U8_COUNT};
use annot_core::{ByteVector, ClassReader, Constant, SymbolTable, MAGIC};

// ── helpers ───────────────────────────────────────────────────────────────

fn reader_for(symbols: &SymbolTable, payload: &ByteVector) -> ClassReader {
    let mut out = ByteVector::new();
    out.put_u32(MAGIC).put_u16(0).put_u16(52);
    symbols.write_to(&mut out).unwrap();
    out.put_bytes(payload.as_slice());
    ClassReader::new(out.into_vec()).unwrap()
}

fn encode(annotation: &Annotation) -> (SymbolTable, ByteVector) {
    let mut symbols = SymbolTable::new();
    let mut out = ByteVector::new();
    annotation.write(&mut out, &mut symbols).unwrap();
    (symbols, out)
}

/// `@T ( value = [[...[true]...]] )` with `levels` array wrappers, written
/// byte by byte so the encoder's own limit does not get in the way.
fn nested_array_payload(levels: usize) -> (SymbolTable, ByteVector) {
    let mut symbols = SymbolTable::new();
    let ty = symbols.new_utf8("LT;").unwrap();
    let name = symbols.new_utf8("value").unwrap();
    let one = symbols.new_integer(1).unwrap();
    let mut out = ByteVector::new();
    out.put_u16(ty).put_u16(1).put_u16(name);
    for _ in 0..levels {
        out.put_u8(b'[').put_u16(1);
    }
    out.put_u8(b'Z').put_u16(one);
    (symbols, out)
}

fn kitchen_sink() -> Annotation {
    let nested = Annotation::new("Lcom/example/Inner;").with("value", ElementValue::Int(9));
    Annotation::new("Lcom/example/Everything;")
        .with("b", ElementValue::Byte(-8))
        .with("c", ElementValue::Char(0x263A))
        .with("d", ElementValue::Double(std::f64::consts::PI))
        .with("f", ElementValue::Float(-1.25))
        .with("i", ElementValue::Int(i32::MIN))
        .with("j", ElementValue::Long(i64::MAX))
        .with("s", ElementValue::Short(-300))
        .with("z", ElementValue::Boolean(true))
        .with("str", ElementValue::String("héllo\0wörld".into()))
        .with(
            "e",
            ElementValue::Enum {
                type_name: "Ljava/lang/annotation/ElementType;".into(),
                const_name: "FIELD".into(),
            },
        )
        .with("cls", ElementValue::Class("[Ljava/lang/String;".into()))
        .with("ann", ElementValue::Annotation(nested))
        .with(
            "arr",
            ElementValue::Array(vec![
                ElementValue::Int(1),
                ElementValue::Array(vec![]),
                ElementValue::String("x".into()),
            ]),
        )
}

// ── tests ──────────────────────────────────────────────────────────────────

#[test]
fn test_roundtrip_every_value_kind() {
    let original = kitchen_sink();
    let (symbols, payload) = encode(&original);
    let cr = reader_for(&symbols, &payload);

    let mut buf = Vec::new();
    let (decoded, next) = Annotation::read(&cr, cr.header(), &mut buf).unwrap();
    assert_eq!(decoded, original);
    assert_eq!(next, cr.bytes().len(), "decode should stop exactly at the record end");
}

#[test]
fn test_roundtrip_preserves_pair_order() {
    let mut original = Annotation::new("LOrder;");
    for name in ["z", "a", "m", "b"] {
        original.add(name, ElementValue::Boolean(false));
    }
    let (symbols, payload) = encode(&original);
    let cr = reader_for(&symbols, &payload);
    let (decoded, _) = Annotation::read(&cr, cr.header(), &mut Vec::new()).unwrap();
    let names: Vec<_> = decoded.elements.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["z", "a", "m", "b"]);
}

#[test]
fn test_record_layout_bytes() {
    let a = Annotation::new("LFoo;").with("value", ElementValue::Int(5));
    let (_, payload) = encode(&a);
    // type_index=1, pairs=1, name_index=2, tag 'I', const_value_index=3
    assert_eq!(payload.as_slice(), &[0, 1, 0, 1, 0, 2, b'I', 0, 3]);
}

#[test]
fn test_strings_are_interned_in_iteration_order() {
    let a = Annotation::new("LFoo;")
        .with("second", ElementValue::String("first".into()))
        .with("first", ElementValue::Int(1));
    let (symbols, _) = encode(&a);
    assert_eq!(symbols.get(&Constant::Utf8("LFoo;".into())), Some(1));
    assert_eq!(symbols.get(&Constant::Utf8("second".into())), Some(2));
    assert_eq!(symbols.get(&Constant::Utf8("first".into())), Some(3));
    assert_eq!(symbols.get(&Constant::Integer(1)), Some(4));
}

#[test]
fn test_encoding_is_deterministic() {
    let a = kitchen_sink();
    let (s1, p1) = encode(&a);
    let (s2, p2) = encode(&a);
    assert_eq!(p1, p2);

    let mut pool1 = ByteVector::new();
    let mut pool2 = ByteVector::new();
    s1.write_to(&mut pool1).unwrap();
    s2.write_to(&mut pool2).unwrap();
    assert_eq!(pool1, pool2);
}

#[test]
fn test_shared_names_reuse_indices_across_records() {
    let list = vec![
        Annotation::new("LA;").with("value", ElementValue::Int(1)),
        Annotation::new("LB;").with("value", ElementValue::Int(1)),
    ];
    let mut symbols = SymbolTable::new();
    let mut out = ByteVector::new();
    write_annotations(&list, &mut out, &mut symbols).unwrap();
    // "LA;", "value", 1, "LB;"
    assert_eq!(symbols.len(), 4);
}

#[test]
fn test_empty_list_is_a_bare_zero_count() {
    let mut symbols = SymbolTable::new();
    let mut out = ByteVector::new();
    write_annotations(&[], &mut out, &mut symbols).unwrap();
    assert_eq!(out.as_slice(), &[0, 0]);
    assert!(symbols.is_empty());

    let cr = reader_for(&symbols, &out);
    let (list, next) = read_annotations(&cr, cr.header(), &mut Vec::new()).unwrap();
    assert!(list.is_empty());
    assert_eq!(next - cr.header(), 2);
}

#[test]
fn test_list_cursor_covers_count_plus_records() {
    let list = vec![
        Annotation::new("LMarker;"),
        kitchen_sink(),
        Annotation::new("LNamed;")
            .with("a", ElementValue::Int(1))
            .with("b", ElementValue::Int(2)),
    ];
    let mut symbols = SymbolTable::new();
    let mut out = ByteVector::new();
    write_annotations(&list, &mut out, &mut symbols).unwrap();

    // Re-encoding against the already filled table adds no constants, so
    // each record's standalone size is the size it occupies in the list.
    let record_sizes: usize = list
        .iter()
        .map(|a| {
            let mut one = ByteVector::new();
            a.write(&mut one, &mut symbols).unwrap();
            one.len()
        })
        .sum();

    let cr = reader_for(&symbols, &out);
    let start = cr.header();
    let (decoded, next) = read_annotations(&cr, start, &mut Vec::new()).unwrap();
    assert_eq!(decoded, list);
    assert_eq!(next - start, 2 + record_sizes);
    assert_eq!(next, cr.bytes().len());
}

#[test]
fn test_consecutive_records_decode_by_threading_cursor() {
    let first = Annotation::new("LOne;").with("value", ElementValue::Long(-1));
    let second = Annotation::new("LTwo;");
    let mut symbols = SymbolTable::new();
    let mut out = ByteVector::new();
    first.write(&mut out, &mut symbols).unwrap();
    second.write(&mut out, &mut symbols).unwrap();

    let cr = reader_for(&symbols, &out);
    let mut buf = Vec::new();
    let (a, next) = Annotation::read(&cr, cr.header(), &mut buf).unwrap();
    let (b, end) = Annotation::read(&cr, next, &mut buf).unwrap();
    assert_eq!((a, b), (first, second));
    assert_eq!(end, cr.bytes().len());
}

#[test]
fn test_parameter_lists_roundtrip() {
    let params = vec![
        vec![Annotation::new("LNonNull;")],
        vec![],
        vec![
            Annotation::new("LNamed;").with("value", ElementValue::String("id".into())),
            Annotation::new("LNonNull;"),
        ],
    ];
    let mut symbols = SymbolTable::new();
    let mut out = ByteVector::new();
    write_parameter_annotations(&params, &mut out, &mut symbols).unwrap();
    assert_eq!(out.as_slice()[0], 3, "parameter count is a single byte");

    let cr = reader_for(&symbols, &out);
    let (decoded, next) = read_parameter_annotations(&cr, cr.header(), &mut Vec::new()).unwrap();
    assert_eq!(decoded, params);
    assert_eq!(next, cr.bytes().len());
}

#[test]
fn test_255_parameters_encode() {
    let params = vec![vec![Annotation::new("LP;")]; MAX_U8_COUNT];
    let mut symbols = SymbolTable::new();
    let mut out = ByteVector::new();
    write_parameter_annotations(&params, &mut out, &mut symbols).unwrap();
    assert_eq!(out.as_slice()[0], 255);

    let cr = reader_for(&symbols, &out);
    let (decoded, _) = read_parameter_annotations(&cr, cr.header(), &mut Vec::new()).unwrap();
    assert_eq!(decoded.len(), 255);
}

/// A 256th parameter does not fit the one-byte count. Supplying it is a
/// caller contract violation; the encoder refuses instead of wrapping the
/// count to zero.
#[test]
fn test_256_parameters_violate_the_u8_count() {
    let params: Vec<Vec<Annotation>> = vec![vec![]; MAX_U8_COUNT + 1];
    let mut symbols = SymbolTable::new();
    let mut out = ByteVector::new();
    let err = write_parameter_annotations(&params, &mut out, &mut symbols)
        .unwrap_err()
        .to_string();
    assert!(err.contains("too many annotated parameters"), "got: {err}");
    assert!(out.is_empty(), "nothing should be written on failure");
}

#[test]
fn test_decode_errors_propagate_from_reader() {
    // type_index points at an Integer constant
    let mut symbols = SymbolTable::new();
    let int_index = symbols.new_integer(1).unwrap();
    let mut out = ByteVector::new();
    out.put_u16(int_index).put_u16(0);
    let cr = reader_for(&symbols, &out);
    let err = Annotation::read(&cr, cr.header(), &mut Vec::new())
        .unwrap_err()
        .to_string();
    assert!(err.contains("Integer but Utf8"), "got: {err}");

    // pair count promises a pair the buffer does not hold
    let mut symbols = SymbolTable::new();
    let ty = symbols.new_utf8("LT;").unwrap();
    let mut out = ByteVector::new();
    out.put_u16(ty).put_u16(1);
    let cr = reader_for(&symbols, &out);
    let err = Annotation::read(&cr, cr.header(), &mut Vec::new())
        .unwrap_err()
        .to_string();
    assert!(err.contains("beyond class file size"), "got: {err}");
}

#[test]
fn test_unknown_value_tag_is_an_error() {
    let mut symbols = SymbolTable::new();
    let ty = symbols.new_utf8("LT;").unwrap();
    let name = symbols.new_utf8("value").unwrap();
    let mut out = ByteVector::new();
    out.put_u16(ty).put_u16(1).put_u16(name).put_u8(b'X').put_u16(1);
    let cr = reader_for(&symbols, &out);
    let err = Annotation::read(&cr, cr.header(), &mut Vec::new())
        .unwrap_err()
        .to_string();
    assert!(err.contains("unknown element value tag"), "got: {err}");
}

#[test]
fn test_encode_does_not_mutate_input() {
    let a = kitchen_sink();
    let snapshot = a.clone();
    let _ = encode(&a);
    assert_eq!(a, snapshot);
}

#[test]
fn test_float_bits_survive_roundtrip() {
    let payload_nan = f64::from_bits(0x7ff8_0000_0000_0001);
    let original = Annotation::new("LFloats;")
        .with("fnan", ElementValue::Float(f32::NAN))
        .with("fneg0", ElementValue::Float(-0.0))
        .with("fpos0", ElementValue::Float(0.0))
        .with("dnan", ElementValue::Double(payload_nan))
        .with("dneg0", ElementValue::Double(-0.0))
        .with("dpos0", ElementValue::Double(0.0));
    let (symbols, payload) = encode(&original);
    let cr = reader_for(&symbols, &payload);
    let (decoded, _) = Annotation::read(&cr, cr.header(), &mut Vec::new()).unwrap();

    // NaN != NaN, so compare bit patterns instead of values.
    let bits = |a: &Annotation| -> Vec<u64> {
        a.elements
            .iter()
            .map(|pair| match pair.value {
                ElementValue::Float(v) => v.to_bits() as u64,
                ElementValue::Double(v) => v.to_bits(),
                ref other => panic!("unexpected value {other:?}"),
            })
            .collect()
    };
    assert_eq!(bits(&decoded), bits(&original));
    // -0.0 and 0.0 compare equal but must stay distinct constants.
    assert_eq!(symbols.len(), 1 + 6 + 3 + 3);
}

#[test]
fn test_nesting_at_the_limit_decodes() {
    let (symbols, payload) = nested_array_payload(MAX_NESTING_DEPTH);
    let cr = reader_for(&symbols, &payload);
    let (decoded, next) = Annotation::read(&cr, cr.header(), &mut Vec::new()).unwrap();
    assert_eq!(next, cr.bytes().len());

    let mut depth = 0;
    let mut value = decoded.get("value").unwrap();
    while let ElementValue::Array(values) = value {
        depth += 1;
        value = &values[0];
    }
    assert_eq!(depth, MAX_NESTING_DEPTH);
    assert_eq!(value, &ElementValue::Boolean(true));
}

#[test]
fn test_nesting_past_the_limit_is_an_error() {
    let (symbols, payload) = nested_array_payload(MAX_NESTING_DEPTH + 1);
    let cr = reader_for(&symbols, &payload);
    let err = Annotation::read(&cr, cr.header(), &mut Vec::new())
        .unwrap_err()
        .to_string();
    assert!(err.contains("levels deep"), "got: {err}");
    assert!(err.contains("at offset"), "got: {err}");
}

#[test]
fn test_deeply_nested_body_fails_without_exhausting_the_stack() {
    let (symbols, payload) = nested_array_payload(20_000);
    let cr = reader_for(&symbols, &payload);
    let err = Annotation::read(&cr, cr.header(), &mut Vec::new()).unwrap_err();
    assert!(err.to_string().contains("levels deep"), "got: {err}");
}

#[test]
fn test_oversized_later_record_leaves_sink_and_table_untouched() {
    let list = vec![
        Annotation::new("LFirst;").with("value", ElementValue::Int(1)),
        Annotation::new("LSecond;").with(
            "value",
            ElementValue::Array(vec![ElementValue::Boolean(true); MAX_U16_COUNT + 1]),
        ),
    ];
    let mut symbols = SymbolTable::new();
    let mut out = ByteVector::new();
    let err = write_annotations(&list, &mut out, &mut symbols)
        .unwrap_err()
        .to_string();
    assert!(err.contains("array element value"), "got: {err}");
    assert!(out.is_empty());
    assert!(symbols.is_empty());

    let params = vec![vec![Annotation::new("LOk;")], list];
    let err = write_parameter_annotations(&params, &mut out, &mut symbols).unwrap_err();
    assert!(err.to_string().contains("array element value"), "got: {err}");
    assert!(out.is_empty());
    assert!(symbols.is_empty());
}
