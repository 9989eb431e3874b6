/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains a host-side software model of the device the boot engine
    runs on. It implements every driver seam over plain memory, survives
    simulated resets, and exposes fault hooks (power loss, bit flips, MPU
    corruption, activation glitches) for the scenario tests.

--*/

mod image;
mod model;

pub use image::{build_image, fnv64, header_tag, image_tag, HEADER_TAG_SPAN};
pub use model::SoftMcu;
