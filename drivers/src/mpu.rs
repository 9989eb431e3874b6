/*++

Licensed under the Apache-2.0 license.

File Name:

    mpu.rs

Abstract:

    File contains the memory protection unit seam.

--*/

use bulwark_error::BulwarkResult;

bitflags::bitflags! {
    /// Access rights of an MPU region
    pub struct RegionAccess : u8 {
        const READ = 0x01;
        const WRITE = 0x02;
        const EXECUTE = 0x04;
        /// Region accessible to privileged code only
        const PRIV_ONLY = 0x08;
    }
}

/// One MPU region table entry.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MpuRegion {
    pub org: u32,
    pub size: u32,
    pub access: RegionAccess,
}

pub trait Mpu {
    /// Load and enable the region table. Replaces any previous table.
    fn mpu_load_regions(&mut self, regions: &[MpuRegion]) -> BulwarkResult<()>;

    /// Compare the live region table against `regions` without reprogramming.
    fn mpu_verify_regions(&self, regions: &[MpuRegion]) -> BulwarkResult<bool>;

    /// Disable the MPU. Used only on the launch path.
    fn mpu_disable(&mut self) -> BulwarkResult<()>;
}
