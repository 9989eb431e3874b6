/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains the error type and error constants shared by every crate
    in the workspace.

--*/
#![cfg_attr(not(feature = "std"), no_std)]
use core::convert::From;
use core::num::{NonZeroU32, TryFromIntError};

/// Bulwark Error Type
///
/// Errors are non-zero 32-bit values; the upper 16 bits identify the
/// component that raised the error, the lower 16 bits the condition.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BulwarkError(pub NonZeroU32);

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: BulwarkError = BulwarkError::new_const($value);
        )*

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(&'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl BulwarkError {
    /// Create a bulwark error; intended to only be used from const contexts, as we
    /// don't want runtime panics if val is zero. The preferred way to get a
    /// BulwarkError from a u32 is `BulwarkError::try_from()`.
    pub const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("BulwarkError cannot be 0"),
        }
    }

    // Use the macro to define all error constants
    define_error_constants![
        // Flash block service
        (
            FLASH_READ_OUT_OF_BOUNDS,
            0x0001_0001,
            "Flash read beyond device bounds"
        ),
        (
            FLASH_WRITE_OUT_OF_BOUNDS,
            0x0001_0002,
            "Flash write beyond device bounds"
        ),
        (
            FLASH_WRITE_NOT_ERASED,
            0x0001_0003,
            "Flash write to a destination that was not pre-erased"
        ),
        (
            FLASH_ERASE_OUT_OF_BOUNDS,
            0x0001_0004,
            "Flash erase beyond device bounds"
        ),
        (
            FLASH_EXECUTE_CONFIG,
            0x0001_0005,
            "Execute-in-place configuration of the active slot failed"
        ),
        // Image verification
        (
            IMAGE_VERIFY_HEADER_AUTH_FAILURE,
            0x0002_0001,
            "Image header authentication tag mismatch"
        ),
        (
            IMAGE_VERIFY_IMAGE_AUTH_FAILURE,
            0x0002_0002,
            "Full image authentication tag mismatch"
        ),
        (
            IMAGE_VERIFY_TRAILING_CODE_DETECTED,
            0x0002_0003,
            "Unauthorized bytes found beyond the declared image size"
        ),
        (
            IMAGE_VERIFY_NO_IMAGE,
            0x0002_0004,
            "No image detected in the slot"
        ),
        (
            IMAGE_VERIFY_HEADER_MALFORMED,
            0x0002_0005,
            "Image header could not be parsed"
        ),
        (
            IMAGE_VERIFY_SIZE_OUT_OF_RANGE,
            0x0002_0006,
            "Declared image size exceeds the slot capacity"
        ),
        (
            IMAGE_VERIFY_VERSION_TOO_OLD,
            0x0002_0007,
            "Candidate image version does not exceed the active version"
        ),
        (
            IMAGE_VERIFY_SLOT_NOT_EMPTY,
            0x0002_0008,
            "Slot expected to be empty contains programmed bytes"
        ),
        // Flow-control counters
        (
            FLOW_COUNTER_CORRUPT,
            0x0003_0001,
            "Flow-control counter encoding is corrupt"
        ),
        (
            FLOW_COUNTER_OVERFLOW,
            0x0003_0002,
            "Flow-control counter overflowed"
        ),
        (
            FLOW_COUNTER_MISMATCH,
            0x0003_0003,
            "Flow-control counter does not match the expected total"
        ),
        // Protection configurator
        (
            PROTECT_FLASH_CONFIGURATION,
            0x0004_0001,
            "Flash user configuration (bank mode) is wrong and cannot be fixed live"
        ),
        (
            PROTECT_OPTION_BYTES_PROGRAM,
            0x0004_0002,
            "Programming the option bytes failed"
        ),
        (
            PROTECT_OPTION_BYTES_RELOAD,
            0x0004_0003,
            "Option-byte reload requested; device must reset"
        ),
        (
            PROTECT_WATCHDOG_START,
            0x0004_0004,
            "Independent watchdog could not be started"
        ),
        (
            PROTECT_MPU_CONFIG,
            0x0004_0005,
            "MPU region table could not be loaded"
        ),
        (
            PROTECT_MPU_VERIFY,
            0x0004_0006,
            "MPU region table does not match the target configuration"
        ),
        (
            PROTECT_DMA_LOCK,
            0x0004_0007,
            "DMA controller clocks could not be disabled"
        ),
        (
            PROTECT_DMA_VERIFY,
            0x0004_0008,
            "DMA controllers found re-enabled"
        ),
        (
            PROTECT_DEBUG_LOCK,
            0x0004_0009,
            "Debug port could not be locked"
        ),
        (
            PROTECT_DEBUG_VERIFY,
            0x0004_000A,
            "Debug port found unlocked"
        ),
        (
            PROTECT_TAMPER_CONFIG,
            0x0004_000B,
            "Anti-tamper input could not be configured"
        ),
        (
            PROTECT_TAMPER_VERIFY,
            0x0004_000C,
            "Anti-tamper configuration found altered"
        ),
        // Privilege gate
        (
            GATE_UNKNOWN_SYSCALL,
            0x0005_0001,
            "Unrecognized system-call opcode"
        ),
        (
            GATE_RESET_REQUESTED,
            0x0005_0002,
            "Reset requested through the privilege gate"
        ),
        (
            GATE_ACTIVATION_COPY_MISMATCH,
            0x0005_0003,
            "Activation routine copy in RAM is not byte-identical to flash"
        ),
        (
            GATE_ACTIVATION_NOT_EFFECTIVE,
            0x0005_0004,
            "Secure-memory activation did not take effect on read-back"
        ),
        (
            GATE_LAUNCH_RETURNED,
            0x0005_0005,
            "Launch sequence returned control instead of jumping"
        ),
        // Boot state machine
        (
            BOOT_STATE_REVISITED,
            0x0006_0001,
            "A single-visit state was entered twice in one boot"
        ),
        (
            BOOT_UNCLASSIFIED_FAILURE,
            0x0006_0002,
            "Unclassified failure; treated as a security failure"
        ),
        (
            BOOT_NO_FIRMWARE_NO_LOADER,
            0x0006_0003,
            "No executable firmware and no download path; halting"
        ),
        (
            BOOT_ROLLBACK_NOT_SUPPORTED,
            0x0006_0004,
            "Rollback requested but installation is not swap-capable"
        ),
        (
            BOOT_SELF_TEST_FAILURE,
            0x0006_0005,
            "Embedded self-test failed"
        ),
        (
            BOOT_CRITICAL_FAILURE,
            0x0006_0006,
            "Critical failure with no more specific cause recorded"
        ),
        (
            BOOT_SECURITY_SAFETY_CHECK,
            0x0006_0007,
            "Per-transition security/safety check failed"
        ),
        (
            BOOT_INSTALL_COMPLETE_REBOOT,
            0x0006_0008,
            "Installation completed; rebooting before executing the new image"
        ),
        (
            BOOT_DOWNLOAD_COMPLETE_REBOOT,
            0x0006_0009,
            "Download recorded; rebooting to run the installation"
        ),
        // Loader / download transport
        (
            LOADER_COM_ERROR,
            0x0007_0001,
            "Download transport communication error"
        ),
        (
            LOADER_FW_TOO_BIG,
            0x0007_0002,
            "Downloaded image does not fit the download slot"
        ),
        (
            LOADER_HEADER_AUTH,
            0x0007_0003,
            "Downloaded image header failed authentication"
        ),
        (
            LOADER_FLASH_WRITE,
            0x0007_0004,
            "Writing the downloaded image to flash failed"
        ),
        (
            LOADER_WORD_OUT_OF_RANGE,
            0x0007_0005,
            "Loader communication word holds an out-of-range value"
        ),
        // Firmware image service
        (
            FWIMG_INSTALL_FAILURE,
            0x0008_0001,
            "Image installation failed"
        ),
        (
            FWIMG_RESUME_FAILURE,
            0x0008_0002,
            "Resuming an interrupted installation failed"
        ),
        (
            FWIMG_ROLLBACK_FAILURE,
            0x0008_0003,
            "Rolling back to the previous image failed"
        ),
        (
            FWIMG_BOOKKEEPING_WRITE,
            0x0008_0004,
            "Recording install-at-next-reset bookkeeping failed"
        ),
        (
            FWIMG_SERVICES_LOCKED,
            0x0008_0005,
            "Operation rejected because services are already locked"
        ),
        // Host-side model
        (
            MODEL_POWER_LOSS,
            0x000A_0001,
            "Simulated power loss injected by the test model"
        ),
    ];
}

impl From<BulwarkError> for core::num::NonZeroU32 {
    fn from(val: BulwarkError) -> Self {
        val.0
    }
}

impl From<BulwarkError> for u32 {
    fn from(val: BulwarkError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for BulwarkError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        match NonZeroU32::try_from(val) {
            Ok(val) => Ok(BulwarkError(val)),
            Err(err) => Err(err),
        }
    }
}

pub type BulwarkResult<T> = Result<T, BulwarkError>;
