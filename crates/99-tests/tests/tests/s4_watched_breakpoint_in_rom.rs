//! A breakpoint set at a ROM address is watched rather than substituted:
//! no trap byte is ever poked into memory, so a read of that address is
//! unaffected before or after the halt it reports.

mod common;

use pretty_assertions::assert_eq;

#[tokio::test]
async fn a_watched_rom_breakpoint_halts_without_touching_memory() {
    // $0600: JMP $D800 (the ROM floor); $D800 holds a placeholder NOP so
    // the "untouched" assertion below means something concrete.
    let facade = common::rom_program_facade(&[0x4C, 0x00, 0xD8], &[0xEA]);
    let harness = common::Harness::new(facade);
    let (mut client, _task) = common::spawn_cli_connection(harness.handler.clone());

    assert_eq!(client.send("read $D800 1").await, "OK:$D800  $EA");

    assert_eq!(client.send("breakpoint set $D800").await, "OK:");

    assert_eq!(client.send("step").await, "OK:");
    let event = client.read_line().await;
    assert!(event.starts_with("EVENT:breakpoint $D800"));

    assert_eq!(client.send("read $D800 1").await, "OK:$D800  $EA");
}
