//! The CLI endpoint's `write`/`read` verbs round-trip through the same
//! debugger-mediated memory access the binary control channel uses.

mod common;

use pretty_assertions::assert_eq;

#[tokio::test]
async fn write_then_read_round_trips_over_the_cli() {
    let harness = common::Harness::new(common::ram_program_facade(&[0xEA]));
    let (mut client, _task) = common::spawn_cli_connection(harness.handler.clone());

    assert_eq!(client.send("write $0700 $11,$22,$33").await, "OK:");
    assert_eq!(client.send("read $0700 3").await, "OK:$0700  $11 $22 $33");
}
