#![no_std]

// Shared logic for the wheel activity tracker.
//
// This crate stays portable across MCU firmware and host tooling by avoiding
// the Rust standard library and exposing collaborator traits (clock, sensor,
// durable store, watchdog, reporting sinks) the other crates can implement.

pub mod capture;
pub mod clock;
pub mod console;
pub mod report;
pub mod schedule;
pub mod session;
pub mod stats;
pub mod store;
pub mod watchdog;
pub mod wheel;
