//! Hardware constants for the interrupt controllers and the legacy timer.
//!
//! This module consolidates register offsets, command bytes and
//! configuration constants used across the drivers crate.

pub mod apic_defs;
pub mod pic_defs;
pub mod pit_defs;
