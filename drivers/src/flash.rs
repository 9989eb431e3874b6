/*++

Licensed under the Apache-2.0 license.

File Name:

    flash.rs

Abstract:

    File contains the flash block service seam.

--*/

use bulwark_error::BulwarkResult;

/// Flash block service over device offsets.
///
/// The engine never touches flash cells directly; writes to a destination
/// that was not pre-erased fail, matching hardware that disallows
/// non-monotonic overwrite.
pub trait FlashBlockService {
    /// Read `buf.len()` bytes starting at `offset`.
    fn flash_read(&self, offset: u32, buf: &mut [u8]) -> BulwarkResult<()>;

    /// Program `data` starting at `offset`. The destination must be erased.
    fn flash_write(&mut self, offset: u32, data: &[u8]) -> BulwarkResult<()>;

    /// Erase `len` bytes starting at `offset`.
    fn flash_erase(&mut self, offset: u32, len: u32) -> BulwarkResult<()>;

    /// Configure execute-in-place for the image at `slot_org`, including
    /// on-the-fly decryption where fitted.
    fn flash_configure_execute(&mut self, slot_org: u32) -> BulwarkResult<()>;
}
