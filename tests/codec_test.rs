//! Wire Format Tests
//!
//! Byte-level checks of the payloads exchanged between components.

use odin::core::{decode_bounds, encode_bounds, read_byte_arrays, write_byte_arrays, Bounds};
use odin::orchestration::messages::SutResponse;
use odin::orchestration::{Command, CommandMessage};
use odin::Error;

#[test]
fn test_bounds_are_two_big_endian_longs() {
    let bytes = encode_bounds(Bounds::new(1, -1));
    assert_eq!(&bytes[..8], &[0, 0, 0, 0, 0, 0, 0, 1]);
    assert_eq!(&bytes[8..], &[0xff; 8]);
    assert_eq!(decode_bounds(&bytes).unwrap(), Bounds::new(1, -1));
    assert!(matches!(decode_bounds(&bytes[..15]), Err(Error::Codec(_))));
}

#[test]
fn test_byte_arrays_are_length_prefixed() {
    let bytes = write_byte_arrays(&[b"ab".as_slice(), b"".as_slice()]);
    assert_eq!(bytes, vec![0, 0, 0, 2, b'a', b'b', 0, 0, 0, 0]);
    assert_eq!(read_byte_arrays(&bytes).unwrap(), vec![b"ab".to_vec(), Vec::new()]);
}

#[test]
fn test_truncated_arrays_are_rejected() {
    let bytes = write_byte_arrays(&[b"abcdef".as_slice()]);
    assert!(matches!(read_byte_arrays(&bytes[..7]), Err(Error::Codec(_))));
    assert!(matches!(read_byte_arrays(&bytes[..2]), Err(Error::Codec(_))));
}

#[test]
fn test_command_message_starts_with_opcode() {
    let message = CommandMessage::new(Command::BroadcastBounds, encode_bounds(Bounds::new(50, 1000)).to_vec());
    let bytes = message.encode();
    assert_eq!(bytes[0], 201);
    assert_eq!(bytes.len(), 17);

    let decoded = CommandMessage::decode(&bytes).unwrap();
    assert_eq!(decoded.command, Command::BroadcastBounds);
    assert_eq!(decode_bounds(&decoded.payload).unwrap(), Bounds::new(50, 1000));

    assert!(matches!(CommandMessage::decode(&[]), Err(Error::Codec(_))));
    assert!(matches!(CommandMessage::decode(&[7]), Err(Error::Codec(_))));
}

#[test]
fn test_negative_task_id_is_rejected() {
    let bytes = write_byte_arrays(&[b"-3".as_slice(), b"{}".as_slice()]);
    assert!(matches!(SutResponse::decode(&bytes), Err(Error::Codec(_))));
}
