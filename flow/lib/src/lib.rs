/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains the flow-control fault-injection countermeasure library.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

mod flow_ctr;

pub use flow_ctr::{FlowCounter, FlowInt, FLOW_INIT};

/// Launder the value to prevent compiler optimization
///
/// # Arguments
///
/// * `val` - Value to launder
///
/// # Returns
///
/// `T` - Same value
pub fn flow_launder<T>(val: T) -> T {
    core::hint::black_box(val)
}
