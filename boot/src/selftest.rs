/*++

Licensed under the Apache-2.0 license.

File Name:

    selftest.rs

Abstract:

    File contains the embedded self-tests run during startup when enabled.
    Known-answer checks of the fault-injection countermeasures themselves;
    a failure means the countermeasures cannot be trusted this boot.

--*/

use bulwark_error::{BulwarkError, BulwarkResult};
use bulwark_flow_lib::{FlowCounter, FLOW_INIT};

const KAT_STEP: u32 = 0x0010_0000;

pub fn execute() -> BulwarkResult<()> {
    cprintln!("[selftest] flow counter known-answer");
    counter_known_answer().map_err(|_| BulwarkError::BOOT_SELF_TEST_FAILURE)?;
    corrupt_detection().map_err(|_| BulwarkError::BOOT_SELF_TEST_FAILURE)?;
    Ok(())
}

fn counter_known_answer() -> BulwarkResult<()> {
    let mut ctr = FlowCounter::init();
    ctr.check(FLOW_INIT)?;
    ctr.advance(KAT_STEP)?;
    ctr.check(FLOW_INIT + KAT_STEP)?;
    // A deliberate mismatch must be caught
    match ctr.check(FLOW_INIT) {
        Err(err) if err == BulwarkError::FLOW_COUNTER_MISMATCH => Ok(()),
        _ => Err(BulwarkError::BOOT_SELF_TEST_FAILURE),
    }
}

fn corrupt_detection() -> BulwarkResult<()> {
    let mut ctr = FlowCounter::init();
    ctr.corrupt();
    match ctr.check(FLOW_INIT) {
        Err(err) if err == BulwarkError::FLOW_COUNTER_CORRUPT => Ok(()),
        _ => Err(BulwarkError::BOOT_SELF_TEST_FAILURE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selftest_passes() {
        execute().unwrap();
    }
}
