/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains the hardware seams the boot engine runs against. Every
    peripheral the engine touches is behind one of these traits; the real
    silicon and the host-side software model implement them alike.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

mod auth;
mod flash;
mod fwimg;
mod loader;
pub mod memory_layout;
mod mpu;
mod option_bytes;
mod periph;
mod privilege;
mod reset;

pub use auth::ImageAuth;
pub use flash::FlashBlockService;
pub use fwimg::FwImgService;
pub use loader::{DownloadInfo, Loader, LoaderComm};
pub use mpu::{Mpu, MpuRegion, RegionAccess};
pub use option_bytes::{ObConfig, ObRange, OptionBytes, RdpLevel};
pub use periph::{
    AntiTamper, DmaLock, DebugPort, Indication, RuntimeProtection, StatusIndicator, Watchdog,
};
pub use privilege::{Launched, PrivilegeControl, PrivilegeLevel, SecureMemActivation};
pub use reset::{ResetCause, ResetControl};

/// Umbrella trait for everything the boot engine needs from the device.
///
/// Auto-implemented for any type providing all the seams, so the engine takes
/// a single generic parameter.
pub trait Mcu:
    FlashBlockService
    + ImageAuth
    + OptionBytes
    + Mpu
    + Watchdog
    + DmaLock
    + DebugPort
    + AntiTamper
    + ResetControl
    + PrivilegeControl
    + SecureMemActivation
    + LoaderComm
    + Loader
    + FwImgService
    + StatusIndicator
{
}

impl<T> Mcu for T where
    T: FlashBlockService
        + ImageAuth
        + OptionBytes
        + Mpu
        + Watchdog
        + DmaLock
        + DebugPort
        + AntiTamper
        + ResetControl
        + PrivilegeControl
        + SecureMemActivation
        + LoaderComm
        + Loader
        + FwImgService
        + StatusIndicator
{
}
