use binobject::compressed::{self, MAX_COMPRESSED_SIZE};
use binobject::{
    ArrayLength, CodecOptions, Endianness, ObjectReader, ObjectStream, Record, SchemaBuilder,
    StringMode, VersionRange,
};
use proptest::prelude::*;
use std::io::Cursor;

#[derive(Debug, Clone, Default, PartialEq)]
struct Sample {
    flag:    bool,
    small:   i8,
    short:   u16,
    word:    i32,
    wide:    u64,
    real:    f64,
    name:    String,
    label:   String,
    count:   u8,
    values:  Vec<i16>,
    fixed:   Vec<u32>,
    newer:   u32,
    ignored: u8,
}

impl Record for Sample {
    fn schema(s: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        s.primitive("flag", |r| r.flag, |r, v| r.flag = v)
         .primitive("small", |r| r.small, |r, v| r.small = v)
         .primitive("short", |r| r.short, |r, v| r.short = v)
         .primitive("word", |r| r.word, |r, v| r.word = v)
         .primitive("wide", |r| r.wide, |r, v| r.wide = v)
         .primitive("real", |r| r.real, |r, v| r.real = v)
         .string("name", StringMode::NullTerminated, |r| &r.name, |r, v| r.name = v)
         .string("label", StringMode::FixedSize(12), |r| &r.label, |r, v| r.label = v)
         .primitive("count", |r| r.count, |r, v| r.count = v)
         .array("values", ArrayLength::Field("count"), |r| &r.values, |r, v| r.values = v)
         .array("fixed", ArrayLength::Fixed(3), |r| &r.fixed, |r, v| r.fixed = v)
         .primitive("newer", |r| r.newer, |r, v| r.newer = v)
         .version(VersionRange::since(2.0))
         .primitive("ignored", |r| r.ignored, |r, v| r.ignored = v)
         .skip_when_reading()
    }
}

fn endianness() -> impl Strategy<Value = Endianness> {
    prop_oneof![Just(Endianness::Little), Just(Endianness::Big)]
}

prop_compose! {
    fn sample()(
        flag in any::<bool>(),
        small in any::<i8>(),
        short in any::<u16>(),
        word in any::<i32>(),
        wide in any::<u64>(),
        real in -1.0e12f64..1.0e12,
        name in "[a-zA-Z0-9 ]{0,24}",
        label in "[a-z]{0,12}",
        values in prop::collection::vec(any::<i16>(), 0..20),
        fixed in prop::collection::vec(any::<u32>(), 3),
        newer in any::<u32>(),
        ignored in any::<u8>(),
    ) -> Sample {
        Sample {
            flag, small, short, word, wide, real, name, label,
            count: values.len() as u8,
            values, fixed, newer, ignored,
        }
    }
}

proptest! {
    #[test]
    fn record_round_trip(value in sample(), e in endianness(), version in 1.0f64..3.0) {
        let options = CodecOptions { endianness: e, version, ..CodecOptions::default() };
        let mut stream = ObjectStream::with_options(options);
        stream.write_record(&value).unwrap();
        stream.set_position(0).unwrap();
        let back: Sample = stream.read_record().unwrap();

        let expected = Sample {
            newer:   if version >= 2.0 { value.newer } else { 0 },
            ignored: 0,
            ..value
        };
        prop_assert_eq!(back, expected);
    }

    #[test]
    fn big_endian_is_reversed_little_endian(block in prop::array::uniform8(any::<u8>())) {
        let mut reversed = block;
        reversed.reverse();
        let le = ObjectReader::new(Cursor::new(block.to_vec()));
        let be = ObjectReader::with_options(
            Cursor::new(reversed.to_vec()),
            CodecOptions::with_endianness(Endianness::Big),
        );

        prop_assert_eq!(le.read_u64_at(0).unwrap(), be.read_u64_at(0).unwrap());
        prop_assert_eq!(le.read_i64_at(0).unwrap(), be.read_i64_at(0).unwrap());
        prop_assert_eq!(le.read_u32_at(4).unwrap(), be.read_u32_at(0).unwrap());
        prop_assert_eq!(le.read_i32_at(4).unwrap(), be.read_i32_at(0).unwrap());
        prop_assert_eq!(le.read_u16_at(6).unwrap(), be.read_u16_at(0).unwrap());
        prop_assert_eq!(le.read_i16_at(6).unwrap(), be.read_i16_at(0).unwrap());
    }

    #[test]
    fn compressed_u32_round_trip(value in any::<u32>(), e in endianness()) {
        let mut buf = [0u8; MAX_COMPRESSED_SIZE];
        let written = compressed::encode_u32(value, e, &mut buf).unwrap();
        prop_assert_eq!(compressed::decode_u32(&buf, e).unwrap(), (value, written));

        let reader = ObjectReader::with_options(Cursor::new(buf[..written].to_vec()), CodecOptions::with_endianness(e));
        prop_assert_eq!(reader.read_compressed_u32_at(0).unwrap(), (value, written));
    }

    #[test]
    fn compressed_i32_round_trip(value in (i32::MIN + 1)..=i32::MAX) {
        let mut buf = [0u8; MAX_COMPRESSED_SIZE];
        let written = compressed::encode_i32(value, Endianness::Little, &mut buf).unwrap();
        prop_assert_eq!(compressed::decode_i32(&buf[..written], Endianness::Little).unwrap(), (value, written));
    }

    #[test]
    fn signed_sign_bit_rule(raw in 0u32..u32::MAX) {
        let magnitude = (raw >> 1) as i64;
        let expected = if raw & 1 == 1 { -(magnitude + 1) } else { magnitude };
        prop_assert_eq!(i64::from(compressed::to_signed(raw)), expected);
    }

    #[test]
    fn fixed_string_layout(text in "[a-z]{0,16}", size in 1usize..20) {
        let mut stream = ObjectStream::new();
        stream.write_fixed_length_string(&text, Some(size)).unwrap();
        let bytes = stream.to_vec();
        prop_assert_eq!(bytes.len(), size);
        let kept = text.len().min(size);
        prop_assert_eq!(&bytes[..kept], &text.as_bytes()[..kept]);
        prop_assert!(bytes[kept..].iter().all(|&b| b == 0));
        prop_assert_eq!(stream.read_fixed_length_string_at(0, size).unwrap(), &text[..kept]);
    }
}
