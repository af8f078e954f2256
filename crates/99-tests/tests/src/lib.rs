//! End-to-end test suite for the AESP runtime: binary control channel,
//! CLI endpoint, and channel dispatcher behavior exercised together
//! rather than unit by unit. The scenarios live under `tests/`; this
//! crate exists only to give them a package to build in.
