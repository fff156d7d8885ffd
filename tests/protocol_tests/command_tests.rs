//! Command Tests
//!
//! Tests for command encoding and parsing.

use std::io::Cursor;

use bytes::Bytes;
use drawvault::protocol::{
    encode_command, read_command, write_blob, write_command, write_string, Command, CommandType,
};
use drawvault::VaultError;

// =============================================================================
// Encoding
// =============================================================================

#[test]
fn test_encode_list() {
    let bytes = encode_command(&Command::List).unwrap();
    assert_eq!(&bytes[..], &[0x00, 0x04, b'l', b'i', b's', b't']);
}

#[test]
fn test_encode_save_layout() {
    let cmd = Command::Save {
        name: "a.xml".to_string(),
        data: Bytes::from_static(&[1, 2, 3]),
    };
    let bytes = encode_command(&cmd).unwrap();

    let mut expected = vec![0x00, 0x04];
    expected.extend_from_slice(b"save");
    expected.extend_from_slice(&[0x00, 0x05]);
    expected.extend_from_slice(b"a.xml");
    expected.extend_from_slice(&[0x00, 0x00, 0x00, 0x03, 1, 2, 3]);

    assert_eq!(&bytes[..], &expected[..]);
}

#[test]
fn test_encode_load_layout() {
    let cmd = Command::Load {
        name: "b.xml".to_string(),
    };
    let bytes = encode_command(&cmd).unwrap();

    let mut expected = vec![0x00, 0x04];
    expected.extend_from_slice(b"load");
    expected.extend_from_slice(&[0x00, 0x05]);
    expected.extend_from_slice(b"b.xml");

    assert_eq!(&bytes[..], &expected[..]);
}

#[test]
fn test_write_command_matches_encoding() {
    let cmd = Command::Save {
        name: "big.xml".to_string(),
        data: Bytes::from(vec![0xAB; 64 * 1024]),
    };

    let mut streamed = Vec::new();
    write_command(&mut streamed, &cmd).unwrap();

    assert_eq!(&streamed[..], &encode_command(&cmd).unwrap()[..]);
}

#[test]
fn test_command_type() {
    assert_eq!(Command::List.command_type(), CommandType::List);
    assert_eq!(
        Command::Load { name: "x.xml".into() }.command_type(),
        CommandType::Load
    );
    assert_eq!(CommandType::Save.as_str(), "save");
    assert_eq!(CommandType::Load.to_string(), "load");
}

// =============================================================================
// Parsing
// =============================================================================

#[test]
fn test_read_each_command() {
    let commands = vec![
        Command::List,
        Command::Save {
            name: "house.xml".to_string(),
            data: Bytes::from_static(b"<drawing/>"),
        },
        Command::Load {
            name: "house.xml".to_string(),
        },
    ];

    let mut buf = Vec::new();
    for cmd in &commands {
        write_command(&mut buf, cmd).unwrap();
    }

    let mut cursor = Cursor::new(buf);
    for expected in commands {
        assert_eq!(read_command(&mut cursor).unwrap(), expected);
    }
}

#[test]
fn test_save_with_empty_payload() {
    let mut buf = Vec::new();
    write_string(&mut buf, "save").unwrap();
    write_string(&mut buf, "empty.xml").unwrap();
    write_blob(&mut buf, &[]).unwrap();

    match read_command(&mut Cursor::new(buf)).unwrap() {
        Command::Save { name, data } => {
            assert_eq!(name, "empty.xml");
            assert!(data.is_empty());
        }
        other => panic!("Expected SAVE command, got {:?}", other),
    }
}

#[test]
fn test_unknown_command() {
    let mut buf = Vec::new();
    write_string(&mut buf, "delete").unwrap();

    let result = read_command(&mut Cursor::new(buf));
    assert!(matches!(result, Err(VaultError::ProtocolViolation(_))));
}

#[test]
fn test_commands_are_case_sensitive() {
    let mut buf = Vec::new();
    write_string(&mut buf, "LIST").unwrap();

    let result = read_command(&mut Cursor::new(buf));
    assert!(matches!(result, Err(VaultError::ProtocolViolation(_))));
}

#[test]
fn test_truncated_save_payload() {
    let mut buf = Vec::new();
    write_string(&mut buf, "save").unwrap();
    write_string(&mut buf, "a.xml").unwrap();
    buf.extend_from_slice(&[0x00, 0x00, 0x00, 0x64, 1, 2, 3]);

    let result = read_command(&mut Cursor::new(buf));
    assert!(matches!(result, Err(VaultError::Framing(_))));
}

#[test]
fn test_load_missing_name() {
    let mut buf = Vec::new();
    write_string(&mut buf, "load").unwrap();

    let result = read_command(&mut Cursor::new(buf));
    assert!(matches!(result, Err(VaultError::Framing(_))));
}

#[test]
fn test_empty_stream() {
    let result = read_command(&mut Cursor::new(Vec::new()));
    assert!(matches!(result, Err(VaultError::Framing(_))));
}
