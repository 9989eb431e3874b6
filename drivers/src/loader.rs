/*++

Licensed under the Apache-2.0 license.

File Name:

    loader.rs

Abstract:

    File contains the loader communication word and download transport seams.

--*/

use bulwark_error::BulwarkResult;
use bulwark_image_types::DwlSlot;

/// The shared reset-surviving communication word.
///
/// The raw value is untrusted; callers range-check it with
/// `LoaderWord::try_from`.
pub trait LoaderComm {
    fn loader_word_read(&self) -> u32;

    fn loader_word_clear(&mut self);

    /// Whether the external download trigger (button) is held.
    fn download_trigger_pressed(&self) -> bool;
}

/// Outcome of a completed download.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DownloadInfo {
    /// Slot the image was staged into
    pub dwl: DwlSlot,
}

/// Download transport: "deliver N bytes" into a download slot.
pub trait Loader {
    /// Whether a download path exists on this device at all.
    fn loader_available(&self) -> bool;

    /// Receive a new image. The target slot is named by the incoming header,
    /// falling back to the default slot.
    fn loader_download(&mut self) -> BulwarkResult<DownloadInfo>;

    /// Slot the most recent download attempt wrote into.
    fn loader_target(&self) -> DwlSlot;
}
