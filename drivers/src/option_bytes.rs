/*++

Licensed under the Apache-2.0 license.

File Name:

    option_bytes.rs

Abstract:

    File contains the non-volatile option-byte configuration types and seam.

--*/

use bulwark_error::BulwarkResult;

/// Read-out protection level. Level 2 is irreversible.
#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Ord)]
pub enum RdpLevel {
    L0,
    L1,
    L2,
}

/// A flash range covered by an option-byte protection.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct ObRange {
    pub start: u32,
    pub end: u32,
}

impl ObRange {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Whether `other` lies entirely inside this range.
    pub const fn covers(&self, other: &ObRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Snapshot of the option bytes relevant to the engine.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ObConfig {
    /// Read-out protection level
    pub rdp: RdpLevel,

    /// Dual-bank flash user configuration bit
    pub dual_bank: bool,

    /// Write protection range
    pub wrp: ObRange,

    /// Proprietary-code read-out protection range
    pub pcrop: ObRange,

    /// Secure user memory range
    pub secure_memory: ObRange,

    /// Secure-memory single-entry-point flag
    pub single_entry: bool,
}

impl ObConfig {
    /// The configuration the engine drives the device toward: dual-bank
    /// flash, WRP over the engine code and vector table, PCROP over the
    /// secret range, secure memory over the engine with a single entry
    /// point, RDP level 1.
    pub const fn engine_target() -> ObConfig {
        use crate::memory_layout::{ENGINE_ORG, ENGINE_SIZE, SECRET_ORG, SECRET_SIZE};
        ObConfig {
            rdp: RdpLevel::L1,
            dual_bank: true,
            wrp: ObRange::new(ENGINE_ORG, ENGINE_ORG + ENGINE_SIZE),
            pcrop: ObRange::new(SECRET_ORG, SECRET_ORG + SECRET_SIZE),
            secure_memory: ObRange::new(ENGINE_ORG, ENGINE_ORG + ENGINE_SIZE),
            single_entry: true,
        }
    }
}

pub trait OptionBytes {
    /// Snapshot the current option bytes.
    fn ob_read(&self) -> BulwarkResult<ObConfig>;

    /// Stage a new option-byte configuration.
    fn ob_program(&mut self, cfg: &ObConfig) -> BulwarkResult<()>;

    /// Reload the option bytes. On hardware this resets the device; staged
    /// values only take effect through this.
    fn ob_launch(&mut self) -> BulwarkResult<()>;
}
