//! `stepover` runs an entire subroutine call to completion in one request,
//! landing on the instruction right after the `JSR` rather than descending
//! into it.

mod common;

use pretty_assertions::assert_eq;

#[tokio::test]
async fn stepover_runs_through_a_subroutine_call_and_lands_after_it() {
    // $0600: JSR $0610; NOP
    // $0610: NOP; RTS
    let program = [0x20, 0x10, 0x06, 0xEA];
    let facade = common::ram_program_facade(&program);
    facade.write_block(0x0610, &[0xEA, 0x60]);
    let harness = common::Harness::new(facade);
    let (mut client, _task) = common::spawn_cli_connection(harness.handler.clone());

    assert_eq!(client.send("stepover").await, "OK:");
    let event = client.read_line().await;
    assert_eq!(event, "EVENT:halted user");

    let registers = client.send("registers").await;
    assert!(registers.contains("PC=$0603"));
}

#[tokio::test]
async fn stepover_runs_through_a_jsr_that_is_itself_a_breakpoint() {
    // $0600: JSR $0610; NOP
    // $0610: NOP; RTS
    let program = [0x20, 0x10, 0x06, 0xEA];
    let facade = common::ram_program_facade(&program);
    facade.write_block(0x0610, &[0xEA, 0x60]);
    let harness = common::Harness::new(facade);
    let (mut client, _task) = common::spawn_cli_connection(harness.handler.clone());

    assert_eq!(client.send("breakpoint set $0600").await, "OK:");
    assert_eq!(client.send("step").await, "OK:");
    let event = client.read_line().await;
    assert!(event.starts_with("EVENT:breakpoint $0600"), "got {event}");

    // PC now sits exactly on the breakpoint substituted over the JSR; a
    // step-over from here must still run the whole subroutine rather than
    // single-stepping into it, which would land inside $0610 instead.
    assert_eq!(client.send("stepover").await, "OK:");
    let event = client.read_line().await;
    assert_eq!(event, "EVENT:halted user");

    let registers = client.send("registers").await;
    assert!(registers.contains("PC=$0603"));
}
