#![cfg_attr(not(test), no_std)]

//! Hardware-independent core of the LED/Button service firmware: command
//! decoding, attribute handler logic, the servo motion sequencer and the
//! connection lifecycle state machine. Everything here runs on the host
//! under `cargo test`; the firmware glue lives next to `main.rs`.

pub mod command;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod sequencer;
pub mod servo;
