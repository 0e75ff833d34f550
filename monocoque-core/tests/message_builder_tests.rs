//! Integration tests for `MultipartMessage` frame assembly

use bytes::Bytes;
use monocoque_core::message::{Message, MultipartMessage};

#[test]
fn test_message_builder_basic() {
    let mut msg = MultipartMessage::new();
    msg.push(Message::from_bytes(Bytes::from_static(b"topic")));
    msg.push(Message::from_bytes(Bytes::from_static(b"Hello")));
    msg.push(Message::from_bytes(Bytes::from_static(b"World")));

    assert_eq!(msg.len(), 3);

    let frames = msg.to_frames();
    assert_eq!(frames[0], Bytes::from_static(b"topic"));
    assert_eq!(frames[1], Bytes::from_static(b"Hello"));
    assert_eq!(frames[2], Bytes::from_static(b"World"));
}

#[test]
fn test_message_builder_empty_frames() {
    let msg = MultipartMessage::from_frames(vec![
        Bytes::from_static(b"identity"),
        Bytes::new(),
        Bytes::from_static(b"body"),
    ]);

    let frames = msg.to_frames();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0], Bytes::from_static(b"identity"));
    assert!(frames[1].is_empty());
    assert_eq!(frames[2], Bytes::from_static(b"body"));
}

#[test]
fn test_message_builder_integers() {
    let msg = MultipartMessage::from_frames(vec![
        Bytes::copy_from_slice(&12345u32.to_be_bytes()),
        Bytes::copy_from_slice(&67890u64.to_be_bytes()),
    ]);

    let frames = msg.to_frames();
    assert_eq!(frames.len(), 2);

    let val32 = u32::from_be_bytes(frames[0].as_ref().try_into().unwrap());
    assert_eq!(val32, 12345);

    let val64 = u64::from_be_bytes(frames[1].as_ref().try_into().unwrap());
    assert_eq!(val64, 67890);
}

#[test]
fn test_message_builder_capacity() {
    let msg = MultipartMessage::new();
    assert_eq!(msg.len(), 0);
    assert!(msg.is_empty());

    let msg = MultipartMessage::from_frames(vec![
        Bytes::from_static(b"frame1"),
        Bytes::from_static(b"frame2"),
    ]);

    assert_eq!(msg.len(), 2);
}

#[test]
fn test_message_builder_from_frames() {
    let frames = vec![
        Bytes::from_static(b"a"),
        Bytes::from_static(b"b"),
        Bytes::from_static(b"c"),
    ];

    let msg = MultipartMessage::from_frames(frames.clone());
    assert_eq!(msg.len(), 3);
    assert_eq!(msg.to_frames(), frames);
}

#[test]
fn test_message_builder_conversions() {
    let frames = vec![Bytes::from_static(b"test")];

    let msg = MultipartMessage::from_frames(frames.clone());
    assert_eq!(msg.len(), 1);

    let result = msg.to_frames();
    assert_eq!(result, frames);
}

#[test]
fn test_message_builder_chaining() {
    let mut msg = MultipartMessage::new();
    msg.push(Message::from_bytes(Bytes::from_static(b"a")));
    msg.push(Message::from_bytes(Bytes::from_static(b"b")));
    msg.push(Message::from_bytes(Bytes::new()));
    msg.push(Message::from_bytes(Bytes::from_static(b"c")));
    msg.push(Message::from_bytes(Bytes::copy_from_slice(&100u32.to_be_bytes())));

    assert_eq!(msg.len(), 5);
}
