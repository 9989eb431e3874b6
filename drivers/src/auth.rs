/*++

Licensed under the Apache-2.0 license.

File Name:

    auth.rs

Abstract:

    File contains the image authentication seam. Cryptographic verification
    is a pass/fail black box to the engine.

--*/

use bulwark_error::BulwarkResult;

pub trait ImageAuth {
    /// Check the header tag of the image at `slot_org`.
    fn auth_verify_header(&self, slot_org: u32) -> BulwarkResult<bool>;

    /// Check the full-image tag of the image at `slot_org`.
    fn auth_verify_image(&self, slot_org: u32) -> BulwarkResult<bool>;

    /// Structural image-presence check at `slot_org`; no tag is verified.
    fn auth_detect_image(&self, slot_org: u32) -> BulwarkResult<bool>;
}
