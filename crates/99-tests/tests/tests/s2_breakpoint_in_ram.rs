//! A breakpoint set in RAM is substituted: stepping onto it halts and
//! reports the hit over the CLI endpoint's `EVENT:` channel.

mod common;

use pretty_assertions::assert_eq;

#[tokio::test]
async fn stepping_onto_a_ram_breakpoint_halts_and_reports_its_address() {
    // LDA #$05; STA $0610; loop: JMP loop
    let program = [0xA9, 0x05, 0x8D, 0x10, 0x06, 0x4C, 0x00, 0x06];
    let harness = common::Harness::new(common::ram_program_facade(&program));
    let (mut client, _task) = common::spawn_cli_connection(harness.handler.clone());

    assert_eq!(client.send("breakpoint set $0602").await, "OK:");

    // The request's own OK: reply is written first; the breakpoint event
    // it triggered is written on the following loop iteration.
    assert_eq!(client.send("step").await, "OK:");
    let event = client.read_line().await;
    assert!(event.starts_with("EVENT:breakpoint $0602"));

    let registers = client.send("registers").await;
    assert!(registers.contains("PC=$0602"));
}

#[tokio::test]
async fn reading_a_breakpointed_address_never_shows_the_live_trap_byte() {
    // The 6502 BRK opcode the debugger pokes in to trap execution is never
    // visible to a client: reads go through the shadowed original byte
    // whether or not a breakpoint is currently installed there.
    let program = [0xA9, 0x05, 0x8D, 0x10, 0x06, 0x4C, 0x00, 0x06];
    let harness = common::Harness::new(common::ram_program_facade(&program));
    let (mut client, _task) = common::spawn_cli_connection(harness.handler.clone());

    assert_eq!(client.send("breakpoint set $0600").await, "OK:");
    assert_eq!(client.send("read $0600 1").await, "OK:$0600  $A9");

    assert_eq!(client.send("breakpoint clear $0600").await, "OK:");
    assert_eq!(client.send("read $0600 1").await, "OK:$0600  $A9");
}

#[tokio::test]
async fn breakpoint_list_and_clearall_manage_the_table() {
    let program = [0xA9, 0x05, 0x8D, 0x10, 0x06, 0x4C, 0x00, 0x06];
    let harness = common::Harness::new(common::ram_program_facade(&program));
    let (mut client, _task) = common::spawn_cli_connection(harness.handler.clone());

    assert_eq!(client.send("breakpoint set $0600").await, "OK:");
    assert_eq!(client.send("breakpoint set $0602").await, "OK:");

    let listing = client.send("breakpoint list").await;
    assert!(listing.starts_with("OK:"));
    assert!(listing.contains("$0600 substituted enabled hits=0"));
    assert!(listing.contains("$0602 substituted enabled hits=0"));

    assert_eq!(client.send("breakpoint clearall").await, "OK:");
    assert_eq!(client.send("breakpoint list").await, "OK:no breakpoints set");
}
