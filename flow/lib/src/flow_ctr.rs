/*++

Licensed under the Apache-2.0 license.

File Name:

    flow_ctr.rs

Abstract:

    File contains the flow-control integer and counter implementations. The
    counter accumulates per-step constants as a security pass executes and is
    checked against a precomputed total, so a skipped step is detected even
    when the skip was induced by a hardware fault.

--*/

use bulwark_error::{BulwarkError, BulwarkResult};
use core::default::Default;

use crate::flow_launder;

/// Initial counter value, deliberately not a power of two.
pub const FLOW_INIT: u32 = 0x0000_5776;

/// Flow-control integer
///
/// Stores the value twice, once XOR-masked, so a single-word glitch is
/// detectable on read.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct FlowInt {
    /// Actual value
    val: u32,

    /// Masked value
    masked_val: u32,
}

impl FlowInt {
    /// Integer mask with high hamming distance
    const MASK: u32 = 0xA5A5A5A5;

    /// Create integer from raw values
    fn from_raw(val: u32, masked_val: u32) -> Self {
        Self { val, masked_val }
    }

    /// Encode the integer
    fn encode(val: u32) -> Self {
        Self {
            val,
            masked_val: val ^ Self::MASK,
        }
    }

    /// Check if the integer is valid
    fn is_valid(&self) -> bool {
        self.val == self.masked_val ^ Self::MASK
    }
}

impl Default for FlowInt {
    fn default() -> Self {
        Self::encode(FLOW_INIT)
    }
}

/// Flow-control counter
///
/// Owned by the pass that is being protected and threaded through it by
/// value; there is exactly one writer at any time.
#[derive(Debug, Clone)]
pub struct FlowCounter {
    int: FlowInt,
}

impl FlowCounter {
    /// Create a counter holding the initial value
    #[inline(never)]
    pub fn init() -> Self {
        Self {
            int: FlowInt::default(),
        }
    }

    /// Advance the counter by a step constant
    #[inline(never)]
    pub fn advance(&mut self, step: u32) -> BulwarkResult<()> {
        if !self.int.is_valid() {
            return Err(BulwarkError::FLOW_COUNTER_CORRUPT);
        }

        let (new, overflow) = self.int.val.overflowing_add(step);
        if overflow {
            return Err(BulwarkError::FLOW_COUNTER_OVERFLOW);
        }

        self.int = FlowInt::encode(new);
        Ok(())
    }

    /// Check the counter against a precomputed total
    #[inline(never)]
    pub fn check(&self, expected: u32) -> BulwarkResult<()> {
        if !self.int.is_valid() {
            return Err(BulwarkError::FLOW_COUNTER_CORRUPT);
        }
        if self.int.val != expected {
            return Err(BulwarkError::FLOW_COUNTER_MISMATCH);
        }

        // Second check for glitch protection
        if flow_launder(self.int.val) != flow_launder(expected) {
            return Err(BulwarkError::FLOW_COUNTER_MISMATCH);
        }
        Ok(())
    }

    /// Current raw value, for diagnostics
    pub fn value(&self) -> u32 {
        self.int.val
    }

    /// Zero both words of the counter
    pub fn corrupt(&mut self) {
        self.int = FlowInt::from_raw(0, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP_A: u32 = 0x0001_0600;
    const STEP_B: u32 = 0x0024_0000;

    #[test]
    fn test_advance_and_check() {
        let mut ctr = FlowCounter::init();
        ctr.advance(STEP_A).unwrap();
        ctr.advance(STEP_B).unwrap();
        ctr.check(FLOW_INIT + STEP_A + STEP_B).unwrap();
    }

    #[test]
    fn test_skipped_step_detected() {
        let mut ctr = FlowCounter::init();
        ctr.advance(STEP_A).unwrap();
        assert_eq!(
            ctr.check(FLOW_INIT + STEP_A + STEP_B),
            Err(BulwarkError::FLOW_COUNTER_MISMATCH)
        );
    }

    #[test]
    fn test_corrupt_detected() {
        let mut ctr = FlowCounter::init();
        ctr.corrupt();
        assert_eq!(
            ctr.advance(STEP_A),
            Err(BulwarkError::FLOW_COUNTER_CORRUPT)
        );
        assert_eq!(
            ctr.check(FLOW_INIT),
            Err(BulwarkError::FLOW_COUNTER_CORRUPT)
        );
    }

    #[test]
    fn test_overflow_detected() {
        let mut ctr = FlowCounter::init();
        ctr.advance(u32::MAX - FLOW_INIT).unwrap();
        assert_eq!(ctr.advance(1), Err(BulwarkError::FLOW_COUNTER_OVERFLOW));
    }
}
