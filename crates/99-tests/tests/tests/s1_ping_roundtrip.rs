//! Exercises the binary control channel end to end: only the operations
//! that have a wire message type (ping, reset, memory, registers) are
//! reachable here; everything else is CLI-only.

mod common;

use aesp_wire::payloads::{ReadMemoryPayload, WriteMemoryPayload};
use aesp_wire::MessageType;
use net_io::ClientId;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn ping_roundtrips_to_an_ack_frame() {
    let harness = common::Harness::new(common::ram_program_facade(&[0xEA]));
    let (mut client, server) = tokio::io::duplex(4096);
    let client_id = ClientId::next();
    let task = tokio::spawn(common::run_binary_control_connection(
        server,
        client_id,
        harness.control.clone(),
        harness.handler.clone(),
    ));

    let reply = common::roundtrip(&mut client, MessageType::Ping, &[]).await;
    assert_eq!(reply.kind, MessageType::Ack);
    assert!(reply.payload.is_empty());

    drop(client);
    task.await.unwrap();
}

#[tokio::test]
async fn write_then_read_memory_round_trips_over_the_wire() {
    let harness = common::Harness::new(common::ram_program_facade(&[0xEA]));
    let (mut client, server) = tokio::io::duplex(4096);
    let client_id = ClientId::next();
    let task = tokio::spawn(common::run_binary_control_connection(
        server,
        client_id,
        harness.control.clone(),
        harness.handler.clone(),
    ));

    let write_payload = WriteMemoryPayload {
        address: 0x0700,
        bytes: vec![0x11, 0x22, 0x33],
    }
    .encode();
    let reply = common::roundtrip(&mut client, MessageType::WriteMemory, &write_payload).await;
    assert_eq!(reply.kind, MessageType::Ack);

    let read_payload = ReadMemoryPayload {
        address: 0x0700,
        count: 3,
    }
    .encode();
    let reply = common::roundtrip(&mut client, MessageType::ReadMemory, &read_payload).await;
    assert_eq!(reply.kind, MessageType::MemoryReply);
    assert_eq!(reply.payload.as_ref(), &[0x11, 0x22, 0x33]);

    drop(client);
    task.await.unwrap();
}

#[tokio::test]
async fn an_unreachable_message_type_gets_a_protocol_error_frame() {
    let harness = common::Harness::new(common::ram_program_facade(&[0xEA]));
    let (mut client, server) = tokio::io::duplex(4096);
    let client_id = ClientId::next();
    let task = tokio::spawn(common::run_binary_control_connection(
        server,
        client_id,
        harness.control.clone(),
        harness.handler.clone(),
    ));

    // FrameRaw is a server-to-client-only message type; sent inbound it
    // carries no control-channel meaning.
    let reply = common::roundtrip(&mut client, MessageType::FrameRaw, &[]).await;
    assert_eq!(reply.kind, MessageType::Error);

    drop(client);
    task.await.unwrap();
}
