//! pipcore hardware-facing types.
//!
//! This crate provides the canonical definitions for the values the interrupt
//! layer exchanges with the CPU and the interrupt controllers: segment
//! selectors, gate descriptors, MSR numbers, CPUID leaves and port addresses.
//! Keeping them in one place lets the drivers, the dispatch table and the
//! test doubles agree on a single encoding.

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

pub mod arch;
pub mod error;

pub use error::*;
