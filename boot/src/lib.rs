/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains the secure-boot engine crate. The engine owns the boot
    state machine, the protection configurator, the privileged gate and the
    startup self-tests; the hardware seams come in through the `Mcu`
    supertrait from the drivers crate.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
pub mod print;

pub mod gate;
pub mod machine;
pub mod protect;
pub mod selftest;

pub use machine::{run, BootConfig, BootOutcome, BootState};
