/*++

Licensed under the Apache-2.0 license.

File Name:

    memory_layout.rs

Abstract:

    The file contains the flash and RAM layout of the device. The constants
    defined in this file define the memory layout.

--*/

use bulwark_image_types::{ActiveSlot, DwlSlot};

//
// Flash Addresses
//
pub const ENGINE_ORG: u32 = 0x00000000;
pub const VECTOR_TABLE_ORG: u32 = 0x00000000;
pub const SECRET_ORG: u32 = 0x00018000;
pub const ACTIVE_1_ORG: u32 = 0x00020000;
pub const ACTIVE_2_ORG: u32 = 0x00060000;
pub const DWL_1_ORG: u32 = 0x000A0000;
pub const DWL_2_ORG: u32 = 0x000E0000;

//
// Flash Sizes In Bytes
//
pub const ENGINE_SIZE: u32 = 128 * 1024;
pub const VECTOR_TABLE_SIZE: u32 = 1024;
pub const SECRET_SIZE: u32 = 32 * 1024;
pub const ACTIVE_SLOT_SIZE: u32 = 256 * 1024;
pub const DWL_SLOT_SIZE: u32 = 256 * 1024;
pub const FLASH_SIZE: u32 = 0x00120000;

//
// RAM Addresses
//
pub const STACK_ORG: u32 = 0x20000000;
pub const STACK_SIZE: u32 = 16 * 1024;
pub const ACTIVATION_RAM_ORG: u32 = 0x20004000;
pub const ACTIVATION_RAM_SIZE: u32 = 256;

/// Size of the image header at the start of every slot.
pub const HEADER_SIZE: u32 = bulwark_image_types::HEADER_BYTE_SIZE as u32;

pub const fn active_slot_org(slot: ActiveSlot) -> u32 {
    match slot.number() {
        1 => ACTIVE_1_ORG,
        _ => ACTIVE_2_ORG,
    }
}

pub const fn dwl_slot_org(slot: DwlSlot) -> u32 {
    match slot.number() {
        1 => DWL_1_ORG,
        _ => DWL_2_ORG,
    }
}

/// Entry point of the image executing in the given active slot.
pub const fn active_slot_entry(slot: ActiveSlot) -> u32 {
    active_slot_org(slot) + HEADER_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges_overlap(a: (u32, u32), b: (u32, u32)) -> bool {
        a.0 < b.0 + b.1 && b.0 < a.0 + a.1
    }

    #[test]
    fn test_slot_regions_disjoint() {
        let regions = [
            (ENGINE_ORG, ENGINE_SIZE),
            (ACTIVE_1_ORG, ACTIVE_SLOT_SIZE),
            (ACTIVE_2_ORG, ACTIVE_SLOT_SIZE),
            (DWL_1_ORG, DWL_SLOT_SIZE),
            (DWL_2_ORG, DWL_SLOT_SIZE),
        ];
        for (i, a) in regions.iter().enumerate() {
            for b in regions.iter().skip(i + 1) {
                assert!(!ranges_overlap(*a, *b));
            }
            assert!(a.0 + a.1 <= FLASH_SIZE);
        }
    }

    #[test]
    fn test_secret_range_inside_engine() {
        assert!(SECRET_ORG >= ENGINE_ORG);
        assert!(SECRET_ORG + SECRET_SIZE <= ENGINE_ORG + ENGINE_SIZE);
    }
}
