/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    File contains data structures for firmware image slots, headers, install
    plans and the loader communication word.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

use bulwark_error::BulwarkError;
use zerocopy::{AsBytes, FromBytes};

pub const ACTIVE_SLOT_COUNT: usize = 2;
pub const DWL_SLOT_COUNT: usize = 2;
pub const IMAGE_TAG_BYTE_SIZE: usize = 32;
pub const HEADER_TAG_BYTE_SIZE: usize = 32;
pub const HEADER_BYTE_SIZE: usize = core::mem::size_of::<ImageHeader>();

/// Header magic for images targeting each download slot, "SFU1" / "SFU2".
const DWL_SLOT_MAGIC: [u32; DWL_SLOT_COUNT] = [0x5346_5531, 0x5346_5532];

/// An executable firmware slot.
///
/// Slot numbers are 1-based; "no slot" is expressed as `Option<ActiveSlot>`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ActiveSlot(u8);

impl ActiveSlot {
    pub const SLOT_1: ActiveSlot = ActiveSlot(1);
    pub const SLOT_2: ActiveSlot = ActiveSlot(2);
    pub const ALL: [ActiveSlot; ACTIVE_SLOT_COUNT] = [Self::SLOT_1, Self::SLOT_2];

    pub const fn number(self) -> u8 {
        self.0
    }

    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// The download slot paired with this active slot.
    pub const fn companion(self) -> DwlSlot {
        DwlSlot(self.0)
    }
}

/// The active slot preferred when several hold a valid image, and the install
/// target when no pairing is recorded.
pub const MASTER_SLOT: ActiveSlot = ActiveSlot::SLOT_1;

/// A staging/backup firmware slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DwlSlot(u8);

impl DwlSlot {
    pub const SLOT_1: DwlSlot = DwlSlot(1);
    pub const SLOT_2: DwlSlot = DwlSlot(2);
    pub const ALL: [DwlSlot; DWL_SLOT_COUNT] = [Self::SLOT_1, Self::SLOT_2];

    pub const fn number(self) -> u8 {
        self.0
    }

    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// The active slot paired with this download slot.
    pub const fn companion(self) -> ActiveSlot {
        ActiveSlot(self.0)
    }

    /// The header magic naming this slot.
    pub const fn magic(self) -> u32 {
        DWL_SLOT_MAGIC[(self.0 - 1) as usize]
    }

    /// Map a header magic back to the download slot it names.
    pub fn from_magic(magic: u32) -> Option<DwlSlot> {
        Self::ALL
            .iter()
            .copied()
            .find(|slot| slot.magic() == magic)
    }
}

/// Download slot used when the image header does not name a known one.
pub const DEFAULT_DWL_SLOT: DwlSlot = DwlSlot::SLOT_1;

/// Firmware Image Header
///
/// Fixed-offset metadata at the start of every slot. Read-only to the engine;
/// trusted only after the header tag verifies and the trailing-bytes scan
/// passes.
#[repr(C)]
#[derive(AsBytes, FromBytes, Debug, Copy, Clone, Eq, PartialEq)]
pub struct ImageHeader {
    /// Magic naming the download slot this image targets
    pub magic: u32,

    /// Firmware version, monotonically increasing
    pub fw_version: u32,

    /// Size of the firmware image in bytes, excluding this header
    pub fw_size: u32,

    /// Partial-update offset into the active image, 0 for a full image
    pub partial_offset: u32,

    /// Partial-update size in bytes, 0 for a full image
    pub partial_size: u32,

    /// Authentication tag over the firmware image
    pub image_tag: [u8; IMAGE_TAG_BYTE_SIZE],

    /// Authentication tag over the preceding header fields
    pub header_tag: [u8; HEADER_TAG_BYTE_SIZE],

    /// Pad to 192 bytes
    pub reserved: [u8; 108],
}

impl ImageHeader {
    /// The download slot named by the header magic, if any.
    pub fn dwl_slot(&self) -> Option<DwlSlot> {
        DwlSlot::from_magic(self.magic)
    }
}

impl Default for ImageHeader {
    fn default() -> Self {
        FromBytes::new_zeroed()
    }
}

/// Install Plan
///
/// Derived once per boot from the firmware-image service's non-volatile
/// bookkeeping. Priority when several apply:
/// `RejectedRollback > InterruptedResume > ToInstall`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum InstallPlan {
    /// Nothing pending
    None,

    /// A downloaded image awaits installation
    ToInstall { dwl: DwlSlot },

    /// An installation was interrupted and must be re-driven to completion
    InterruptedResume { active: ActiveSlot, dwl: DwlSlot },

    /// The previous image must be restored over a rejected one
    RejectedRollback { active: ActiveSlot, dwl: DwlSlot },
}

/// Loader communication word
///
/// Lives at a fixed reset-surviving address shared with the application and
/// the standalone loader. Untrusted input; always range-checked via
/// `try_from`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u32)]
pub enum LoaderWord {
    /// No request pending
    None = 0,

    /// Application requested a firmware download on the next boot
    DownloadRequested = 0x375A_A1CC,

    /// Standalone loader requested to be entered directly
    Bypass = 0x15A0_3DE7,

    /// Standalone loader staged an image and requests its installation
    InstallRequested = 0x5C2B_96F3,
}

impl TryFrom<u32> for LoaderWord {
    type Error = BulwarkError;

    fn try_from(val: u32) -> Result<Self, BulwarkError> {
        match val {
            0 => Ok(LoaderWord::None),
            0x375A_A1CC => Ok(LoaderWord::DownloadRequested),
            0x15A0_3DE7 => Ok(LoaderWord::Bypass),
            0x5C2B_96F3 => Ok(LoaderWord::InstallRequested),
            _ => Err(BulwarkError::LOADER_WORD_OUT_OF_RANGE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_size() {
        assert_eq!(HEADER_BYTE_SIZE, 192);
    }

    #[test]
    fn test_slot_pairing() {
        assert_eq!(ActiveSlot::SLOT_1.companion(), DwlSlot::SLOT_1);
        assert_eq!(DwlSlot::SLOT_2.companion(), ActiveSlot::SLOT_2);
        assert_eq!(MASTER_SLOT, ActiveSlot::SLOT_1);
    }

    #[test]
    fn test_magic_mapping() {
        for slot in DwlSlot::ALL {
            assert_eq!(DwlSlot::from_magic(slot.magic()), Some(slot));
        }
        assert_eq!(DwlSlot::from_magic(0xDEAD_BEEF), None);
    }

    #[test]
    fn test_loader_word_range_check() {
        assert_eq!(LoaderWord::try_from(0), Ok(LoaderWord::None));
        assert_eq!(
            LoaderWord::try_from(0x5C2B_96F3),
            Ok(LoaderWord::InstallRequested)
        );
        assert_eq!(
            LoaderWord::try_from(1),
            Err(BulwarkError::LOADER_WORD_OUT_OF_RANGE)
        );
    }
}
