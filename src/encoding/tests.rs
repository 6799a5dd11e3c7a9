use super::*;
use std::net::SocketAddr;

fn addr(s: &str) -> SocketAddr {
    s.parse().unwrap()
}

// ===== Bit Math =====

#[test]
fn test_log2_and_bits_required() {
    assert_eq!(log2(0), 0);
    assert_eq!(log2(1), 0);
    assert_eq!(log2(2), 1);
    assert_eq!(log2(255), 7);
    assert_eq!(log2(256), 8);
    assert_eq!(log2(u32::MAX), 31);

    assert_eq!(bits_required(0, 0), 0);
    assert_eq!(bits_required(0, 1), 1);
    assert_eq!(bits_required(0, 255), 8);
    assert_eq!(bits_required(0, 256), 9);
    assert_eq!(bits_required(0, u32::MAX), 32);
    assert_eq!(bits_required_signed(-1, 1), 2);
    assert_eq!(bits_required_signed(i32::MIN, i32::MAX), 32);
}

#[test]
fn test_sequence_wraparound() {
    assert!(sequence_greater_than(1, 0));
    assert!(sequence_greater_than(1, 65535));
    assert!(!sequence_greater_than(65535, 1));
    assert!(sequence_greater_than(32768, 0));
    assert!(!sequence_greater_than(0, 32768));
    assert!(!sequence_greater_than(7, 7));

    assert!(sequence_less_than(65535, 1));
    assert!(!sequence_less_than(1, 65535));
}

#[test]
fn test_zigzag() {
    assert_eq!(signed_to_unsigned(0), 0);
    assert_eq!(signed_to_unsigned(-1), 1);
    assert_eq!(signed_to_unsigned(1), 2);
    assert_eq!(signed_to_unsigned(-2), 3);
    assert_eq!(signed_to_unsigned(i32::MAX), u32::MAX - 1);
    assert_eq!(signed_to_unsigned(i32::MIN), u32::MAX);

    for n in [0, 1, -1, 1000, -1000, i32::MAX, i32::MIN] {
        assert_eq!(unsigned_to_signed(signed_to_unsigned(n)), n);
    }
}

// ===== BitWriter / BitReader =====

#[test]
fn test_writer_rejects_unaligned_capacity() {
    assert_eq!(
        BitWriter::new(6).err(),
        Some(EncodingError::InvalidCapacity(6))
    );
    assert!(BitWriter::new(8).is_ok());
}

#[test]
fn test_write_bits_validation() {
    let mut writer = BitWriter::new(4).unwrap();
    assert_eq!(
        writer.write_bits(0, 0),
        Err(EncodingError::InvalidBitCount(0))
    );
    assert_eq!(
        writer.write_bits(0, 33),
        Err(EncodingError::InvalidBitCount(33))
    );
    assert_eq!(
        writer.write_bits(8, 3),
        Err(EncodingError::ValueTooLarge { value: 8, bits: 3 })
    );
    writer.write_bits(u32::MAX, 32).unwrap();
    assert_eq!(
        writer.write_bits(1, 1),
        Err(EncodingError::BufferOverflow {
            requested: 1,
            available: 0
        })
    );
}

#[test]
fn test_bits_pack_lsb_first() {
    let mut writer = BitWriter::new(4).unwrap();
    writer.write_bits(1, 1).unwrap();
    writer.write_bits(0b101, 3).unwrap();
    writer.flush_bits().unwrap();
    assert_eq!(writer.bytes_written(), 1);
    assert_eq!(writer.written_data(), vec![0x0b]);
}

#[test]
fn test_aligned_words_are_little_endian() {
    let mut writer = BitWriter::new(8).unwrap();
    writer.write_bits(0x1122_3344, 32).unwrap();
    writer.write_bits(0xab, 8).unwrap();
    writer.flush_bits().unwrap();
    assert_eq!(writer.written_data(), vec![0x44, 0x33, 0x22, 0x11, 0xab]);
}

#[test]
fn test_reader_round_trip_mixed_widths() {
    let fields: [(u32, u32); 6] = [
        (1, 1),
        (5, 3),
        (0x3ff, 10),
        (0, 7),
        (0xdead_beef, 32),
        (3, 2),
    ];
    let mut writer = BitWriter::new(12).unwrap();
    for (value, bits) in fields {
        writer.write_bits(value, bits).unwrap();
    }
    writer.flush_bits().unwrap();
    let data = writer.written_data();

    let mut reader = BitReader::new(&data);
    for (value, bits) in fields {
        assert_eq!(reader.read_bits(bits).unwrap(), value);
    }
    assert_eq!(reader.bits_read(), 55);
    assert_eq!(reader.read_bits(0).unwrap(), 0);
}

#[test]
fn test_reader_past_end() {
    let mut reader = BitReader::new(&[0xff, 0xff]);
    assert!(reader.would_read_past_end(17));
    assert_eq!(
        reader.read_bits(32),
        Err(EncodingError::ReadPastEnd {
            requested: 32,
            remaining: 16
        })
    );
    assert_eq!(reader.read_bits(16).unwrap(), 0xffff);
    assert_eq!(reader.bits_remaining(), 0);
}

#[test]
fn test_read_align_rejects_nonzero_padding() {
    let mut reader = BitReader::new(&[0xff]);
    reader.read_bits(1).unwrap();
    assert_eq!(reader.read_align(), Err(EncodingError::NonZeroPadding(0x7f)));
}

#[test]
fn test_bytes_require_alignment() {
    let mut writer = BitWriter::new(8).unwrap();
    writer.write_bits(1, 3).unwrap();
    assert_eq!(writer.write_bytes(&[1, 2]), Err(EncodingError::NotAligned(5)));

    let mut reader = BitReader::new(&[0, 0, 0]);
    reader.read_bits(2).unwrap();
    let mut out = [0u8; 1];
    assert_eq!(reader.read_bytes(&mut out), Err(EncodingError::NotAligned(6)));
}

#[test]
fn test_bytes_head_middle_tail_at_every_offset() {
    let payload: Vec<u8> = (0..37u8).map(|i| i.wrapping_mul(7)).collect();

    for lead_bytes in 0..4u32 {
        let mut writer = BitWriter::new(48).unwrap();
        for i in 0..lead_bytes {
            writer.write_bits(0xa0 + i, 8).unwrap();
        }
        writer.write_bytes(&payload).unwrap();
        writer.write_bits(0x5, 3).unwrap();
        writer.flush_bits().unwrap();
        let data = writer.written_data();
        assert_eq!(data.len(), lead_bytes as usize + payload.len() + 1);
        assert_eq!(
            &data[lead_bytes as usize..lead_bytes as usize + payload.len()],
            &payload[..]
        );

        let mut reader = BitReader::new(&data);
        for i in 0..lead_bytes {
            assert_eq!(reader.read_bits(8).unwrap(), 0xa0 + i);
        }
        let mut out = vec![0u8; payload.len()];
        reader.read_bytes(&mut out).unwrap();
        assert_eq!(out, payload);
        assert_eq!(reader.read_bits(3).unwrap(), 0x5);
    }
}

#[test]
fn test_write_bytes_overflow_leaves_writer_untouched() {
    let mut writer = BitWriter::new(4).unwrap();
    writer.write_bits(0xff, 8).unwrap();
    assert_eq!(
        writer.write_bytes(&[0; 4]),
        Err(EncodingError::BufferOverflow {
            requested: 32,
            available: 24
        })
    );
    assert_eq!(writer.bits_written(), 8);
}

// ===== Stream =====

#[test]
fn test_stream_integer_bounds() {
    let mut values = [
        (-10, -10, 10),
        (10, -10, 10),
        (0, 0, 1),
        (1, 0, 1),
        (i32::MIN, i32::MIN, i32::MAX),
        (i32::MAX, i32::MIN, i32::MAX),
    ];

    let mut ws = WriteStream::new(64).unwrap();
    for (value, min, max) in values.iter_mut() {
        ws.serialize_integer(value, *min, *max);
    }
    assert_eq!(ws.bits_processed(), 5 + 5 + 1 + 1 + 32 + 32);
    let data = ws.finish().unwrap();

    let mut rs = ReadStream::new(&data);
    for (expected, min, max) in values {
        let mut value = 0;
        rs.serialize_integer(&mut value, min, max);
        assert_eq!(value, expected);
    }
    rs.result().unwrap();
}

#[test]
fn test_stream_integer_range_errors() {
    let mut ws = WriteStream::new(8).unwrap();
    ws.serialize_integer(&mut 5, 5, 5);
    assert_eq!(
        ws.result(),
        Err(EncodingError::InvalidRange { min: 5, max: 5 })
    );

    let mut ws = WriteStream::new(8).unwrap();
    ws.serialize_integer(&mut 11, 0, 10);
    assert_eq!(
        ws.result(),
        Err(EncodingError::OutOfRange {
            value: 11,
            min: 0,
            max: 10
        })
    );
}

#[test]
fn test_stream_read_rejects_value_above_max() {
    let mut ws = WriteStream::new(4).unwrap();
    ws.serialize_bits(&mut 7, 3);
    let data = ws.finish().unwrap();

    let mut rs = ReadStream::new(&data);
    let mut value = 0;
    rs.serialize_integer(&mut value, 0, 5);
    assert_eq!(
        rs.result(),
        Err(EncodingError::OutOfRange {
            value: 7,
            min: 0,
            max: 5
        })
    );
    assert_eq!(value, 0);
}

#[test]
fn test_stream_primitives_round_trip() {
    let mut flag = true;
    let mut off = false;
    let mut word = 0xcafe_babe_u32;
    let mut wide = 0x0123_4567_89ab_cdef_u64;
    let mut single = f32::from_bits(0x7fc0_0001);
    let mut double = f64::NEG_INFINITY;
    let mut small = -0.5f32;

    let mut ws = WriteStream::new(64).unwrap();
    ws.serialize_bool(&mut flag);
    ws.serialize_bool(&mut off);
    ws.serialize_uint32(&mut word);
    ws.serialize_uint64(&mut wide);
    ws.serialize_float32(&mut single);
    ws.serialize_float64(&mut double);
    ws.serialize_float32(&mut small);
    let data = ws.finish().unwrap();
    assert_eq!(data.len(), (2 + 32 + 64 + 32 + 64 + 32 + 7) / 8);

    let mut rs = ReadStream::new(&data);
    let (mut a, mut b, mut c, mut d) = (false, true, 0u32, 0u64);
    let (mut e, mut f, mut g) = (0f32, 0f64, 0f32);
    rs.serialize_bool(&mut a);
    rs.serialize_bool(&mut b);
    rs.serialize_uint32(&mut c);
    rs.serialize_uint64(&mut d);
    rs.serialize_float32(&mut e);
    rs.serialize_float64(&mut f);
    rs.serialize_float32(&mut g);
    rs.result().unwrap();

    assert!(a);
    assert!(!b);
    assert_eq!(c, word);
    assert_eq!(d, wide);
    assert_eq!(e.to_bits(), 0x7fc0_0001);
    assert_eq!(f, f64::NEG_INFINITY);
    assert_eq!(g, -0.5);
}

#[test]
fn test_stream_uint64_low_word_first() {
    let mut ws = WriteStream::new(8).unwrap();
    ws.serialize_uint64(&mut 0x0102_0304_0506_0708);
    let data = ws.finish().unwrap();
    assert_eq!(data, 0x0102_0304_0506_0708u64.to_le_bytes());
}

#[test]
fn test_stream_bytes_round_trip_after_odd_bits() {
    for len in [1usize, 3, 4, 5, 64, 301] {
        let block: Vec<u8> = (0..len).map(|i| (i * 31 % 251) as u8).collect();
        let mut ws = WriteStream::with_capacity(len + 8);
        ws.serialize_bits(&mut 0b101, 3);
        ws.serialize_bytes(&mut block.clone());
        ws.serialize_bool(&mut true);
        let data = ws.finish().unwrap();
        assert_eq!(data.len(), 1 + len + 1);

        let mut rs = ReadStream::new(&data);
        let mut lead = 0;
        let mut out = vec![0u8; len];
        let mut tail = false;
        rs.serialize_bits(&mut lead, 3);
        rs.serialize_bytes(&mut out);
        rs.serialize_bool(&mut tail);
        rs.result().unwrap();
        assert_eq!(lead, 0b101);
        assert_eq!(out, block);
        assert!(tail);
    }
}

#[test]
fn test_stream_rejects_empty_bytes() {
    let mut ws = WriteStream::new(4).unwrap();
    ws.serialize_bytes(&mut []);
    assert_eq!(ws.result(), Err(EncodingError::EmptyBytes));
}

#[test]
fn test_stream_string_boundaries() {
    let mut longest = "1234567".to_string();
    let mut empty = String::new();
    let mut ws = WriteStream::new(32).unwrap();
    ws.serialize_string(&mut longest, 8);
    ws.serialize_string(&mut empty, 8);
    let data = ws.finish().unwrap();

    let mut rs = ReadStream::new(&data);
    let mut a = String::new();
    let mut b = "stale".to_string();
    rs.serialize_string(&mut a, 8);
    rs.serialize_string(&mut b, 8);
    rs.result().unwrap();
    assert_eq!(a, "1234567");
    assert_eq!(b, "");

    let mut ws = WriteStream::new(32).unwrap();
    ws.serialize_string(&mut "12345678".to_string(), 8);
    assert_eq!(
        ws.result(),
        Err(EncodingError::StringTooLong { len: 8, max: 7 })
    );
}

#[test]
fn test_stream_string_rejects_invalid_utf8() {
    let mut ws = WriteStream::new(8).unwrap();
    ws.serialize_integer(&mut 2, 0, 15);
    ws.serialize_bytes(&mut [0xc3, 0x28]);
    let data = ws.finish().unwrap();

    let mut rs = ReadStream::new(&data);
    let mut s = String::new();
    rs.serialize_string(&mut s, 16);
    assert_eq!(rs.result(), Err(EncodingError::InvalidUtf8));
}

#[test]
fn test_int_relative_tier_widths() {
    let cases: [(i32, usize); 12] = [
        (1, 1),
        (2, 5),
        (6, 5),
        (7, 8),
        (23, 8),
        (24, 13),
        (280, 13),
        (281, 18),
        (4377, 18),
        (4378, 23),
        (69914, 23),
        (69915, 38),
    ];
    let previous = 1000;

    for (delta, expected_bits) in cases {
        let mut current = previous + delta;
        let mut ws = WriteStream::new(8).unwrap();
        ws.serialize_int_relative(previous, &mut current);
        assert_eq!(ws.bits_processed(), expected_bits, "delta {delta}");
        let data = ws.finish().unwrap();

        let mut rs = ReadStream::new(&data);
        let mut decoded = 0;
        rs.serialize_int_relative(previous, &mut decoded);
        rs.result().unwrap();
        assert_eq!(decoded, previous + delta, "delta {delta}");
    }
}

#[test]
fn test_int_relative_requires_increase() {
    let mut ws = WriteStream::new(8).unwrap();
    ws.serialize_int_relative(10, &mut 10);
    assert_eq!(
        ws.result(),
        Err(EncodingError::NotIncreasing {
            previous: 10,
            current: 10
        })
    );
}

#[test]
fn test_int_relative_read_rejects_raw_fallback_not_increasing() {
    // Every tier flag clear, then a raw value that does not move forward.
    let mut ws = WriteStream::new(8).unwrap();
    ws.serialize_bits(&mut 0, 6);
    ws.serialize_uint32(&mut 500);
    let data = ws.finish().unwrap();

    let mut rs = ReadStream::new(&data);
    let mut decoded = 7;
    rs.serialize_int_relative(1000, &mut decoded);
    assert_eq!(
        rs.result(),
        Err(EncodingError::NotIncreasing {
            previous: 1000,
            current: 500
        })
    );
    assert_eq!(decoded, 7);
}

#[test]
fn test_ack_relative() {
    let cases: [(u16, u16, usize); 4] = [
        (100, 99, 7),
        (100, 36, 7),
        (5, 65530, 7),
        (1000, 100, 17),
    ];
    for (sequence, ack, expected_bits) in cases {
        let mut value = ack;
        let mut ws = WriteStream::new(4).unwrap();
        ws.serialize_ack_relative(sequence, &mut value);
        assert_eq!(ws.bits_processed(), expected_bits);
        let data = ws.finish().unwrap();

        let mut rs = ReadStream::new(&data);
        let mut decoded = 0;
        rs.serialize_ack_relative(sequence, &mut decoded);
        rs.result().unwrap();
        assert_eq!(decoded, ack);
    }

    let mut ws = WriteStream::new(4).unwrap();
    ws.serialize_ack_relative(42, &mut 42);
    assert_eq!(ws.result(), Err(EncodingError::AckEqualsSequence(42)));
}

#[test]
fn test_sequence_relative_wraps() {
    for (s1, s2) in [(10u16, 11u16), (65535, 2), (65000, 100), (0, 40000)] {
        let mut value = s2;
        let mut ws = WriteStream::new(8).unwrap();
        ws.serialize_sequence_relative(s1, &mut value);
        let data = ws.finish().unwrap();

        let mut rs = ReadStream::new(&data);
        let mut decoded = 0;
        rs.serialize_sequence_relative(s1, &mut decoded);
        rs.result().unwrap();
        assert_eq!(decoded, s2, "{s1} -> {s2}");
    }
}

#[test]
fn test_stream_address_round_trip() {
    let mut addresses = [
        None,
        Some(addr("10.1.2.3:40000")),
        Some(addr("[2001:db8::ff00:42:8329]:5000")),
    ];
    let mut ws = WriteStream::new(64).unwrap();
    for a in addresses.iter_mut() {
        ws.serialize_address(a);
    }
    // 2 + (2 + 4 align + 32 + 16) + (2 + 128 + 16)
    assert_eq!(ws.bits_processed(), 202);
    let data = ws.finish().unwrap();

    let mut rs = ReadStream::new(&data);
    for expected in addresses {
        let mut decoded = Some(addr("1.1.1.1:1"));
        rs.serialize_address(&mut decoded);
        assert_eq!(decoded, expected);
    }
    rs.result().unwrap();
}

#[test]
fn test_stream_address_rejects_unknown_tag() {
    let mut ws = WriteStream::new(4).unwrap();
    ws.serialize_bits(&mut 3, 2);
    let data = ws.finish().unwrap();

    let mut rs = ReadStream::new(&data);
    let mut decoded = None;
    rs.serialize_address(&mut decoded);
    assert_eq!(rs.result(), Err(EncodingError::InvalidAddressType(3)));
}

#[test]
fn test_stream_poisoning_keeps_first_error() {
    let mut ws = WriteStream::new(4).unwrap();
    ws.serialize_uint64(&mut u64::MAX);
    let first = ws.result().unwrap_err();
    assert!(matches!(first, EncodingError::BufferOverflow { .. }));
    let processed = ws.bits_processed();

    ws.serialize_integer(&mut 50, 0, 10);
    ws.serialize_bool(&mut true);
    ws.serialize_bytes(&mut []);
    assert_eq!(ws.result(), Err(first));
    assert_eq!(ws.bits_processed(), processed);
    assert!(ws.finish().is_err());
}

#[test]
fn test_read_stream_poisoning_leaves_outputs_alone() {
    let mut rs = ReadStream::new(&[0x01]);
    let mut wide = 0u32;
    rs.serialize_uint32(&mut wide);
    assert!(rs.result().is_err());

    let mut flag = false;
    let mut address = Some(addr("9.9.9.9:9"));
    rs.serialize_bool(&mut flag);
    rs.serialize_address(&mut address);
    assert!(!flag);
    assert_eq!(address, Some(addr("9.9.9.9:9")));
    assert_eq!(rs.bits_processed(), 0);
}

#[test]
fn test_stream_bytes_processed() {
    let mut ws = WriteStream::new(8).unwrap();
    ws.serialize_bits(&mut 1, 9);
    assert_eq!(ws.bits_processed(), 9);
    assert_eq!(ws.bytes_processed(), 2);
    assert_eq!(ws.align_bits(), 7);
    ws.serialize_align();
    assert_eq!(ws.bits_processed(), 16);
    assert_eq!(ws.align_bits(), 0);
}

// ===== Address Slot =====

#[test]
fn test_address_slot_layout() {
    let slot = write_address(Some(&addr("127.0.0.1:40000")));
    assert_eq!(slot[0], AddressType::Ipv4.to_byte());
    assert_eq!(&slot[1..5], &[127, 0, 0, 1]);
    assert_eq!(&slot[5..7], &[0x40, 0x9c]);
    assert!(slot[7..].iter().all(|&b| b == 0));

    let v6 = addr("[::1]:258");
    let slot = write_address(Some(&v6));
    assert_eq!(slot[0], 2);
    assert_eq!(slot[16], 1);
    assert_eq!(&slot[17..19], &[0x02, 0x01]);
    assert_eq!(read_address(&slot).unwrap(), Some(v6));

    assert_eq!(write_address(None), [0u8; ADDRESS_BYTES]);
    assert_eq!(read_address(&[0u8; ADDRESS_BYTES]).unwrap(), None);
}

#[test]
fn test_address_slot_rejects_unknown_type() {
    let mut slot = [0u8; ADDRESS_BYTES];
    slot[0] = 9;
    assert_eq!(
        read_address(&slot),
        Err(EncodingError::InvalidAddressType(9))
    );
}

#[test]
fn test_parse_address() {
    assert_eq!(parse_address("10.0.0.1:7000").unwrap(), addr("10.0.0.1:7000"));
    assert_eq!(parse_address(" [::1]:80 ").unwrap(), addr("[::1]:80"));
    assert_eq!(parse_address("192.168.1.1").unwrap(), addr("192.168.1.1:0"));
    assert!(matches!(
        parse_address("relay.example.com:40000"),
        Err(EncodingError::InvalidAddress(_))
    ));
}
