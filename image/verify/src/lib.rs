/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the firmware slot verification library.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

mod verifier;

pub use verifier::{
    SlotVerifier, CRYPTO_TOTAL, STEP_AUTH_HEADER, STEP_AUTH_IMAGE, STEP_TRAILER,
};
