/*++

Licensed under the Apache-2.0 license.

File Name:

    boot_flow.rs

Abstract:

    File contains end-to-end boot scenarios run against the software MCU:
    normal launch, the full download/install/execute cycle, power-loss
    recovery, rollback, and the fault-injection halts.

--*/

use bulwark_boot::{run, BootConfig, BootOutcome};
use bulwark_drivers::memory_layout::{
    active_slot_entry, active_slot_org, dwl_slot_org, HEADER_SIZE,
};
use bulwark_drivers::{Indication, ResetCause};
use bulwark_error::BulwarkError;
use bulwark_hw_model::{build_image, SoftMcu};
use bulwark_image_types::{ActiveSlot, DwlSlot, LoaderWord};

fn expect_launch(outcome: BootOutcome) -> u32 {
    match outcome {
        BootOutcome::Launch(launched) => launched.entry(),
        other => panic!("expected launch, got {:?}", other),
    }
}

fn expect_reset(outcome: BootOutcome) -> BulwarkError {
    match outcome {
        BootOutcome::Reset(code) => code,
        other => panic!("expected reset, got {:?}", other),
    }
}

fn expect_halt(outcome: BootOutcome) -> BulwarkError {
    match outcome {
        BootOutcome::Halt(code) => code,
        other => panic!("expected halt, got {:?}", other),
    }
}

fn active_version(mcu: &SoftMcu, slot: ActiveSlot) -> u32 {
    let bytes = mcu.slot_bytes(active_slot_org(slot) + 4, 4);
    u32::from_le_bytes(bytes.try_into().unwrap())
}

#[test]
fn test_empty_device_without_loader_halts() {
    let mut mcu = SoftMcu::new();
    mcu.set_loader_fitted(false);

    let code = expect_halt(run(&mut mcu, &BootConfig::default()));
    assert_eq!(code, BulwarkError::BOOT_NO_FIRMWARE_NO_LOADER);
    assert_eq!(mcu.indications().last(), Some(&Indication::Halt));
    assert_eq!(mcu.launched_entry(), None);
}

#[test]
fn test_valid_image_launches() {
    let mut mcu = SoftMcu::new();
    let image = build_image(DwlSlot::SLOT_1, 1, &[0x20u8; 4096]);
    mcu.load_active_image(ActiveSlot::SLOT_1, &image);

    let entry = expect_launch(run(&mut mcu, &BootConfig::default()));
    assert_eq!(entry, active_slot_entry(ActiveSlot::SLOT_1));
    assert_eq!(mcu.launched_entry(), Some(entry));
    assert_eq!(mcu.indications().first(), Some(&Indication::Startup));
}

#[test]
fn test_full_download_install_execute_cycle() {
    let mut mcu = SoftMcu::new();
    let config = BootConfig::default();
    mcu.load_active_image(ActiveSlot::SLOT_1, &build_image(DwlSlot::SLOT_1, 1, &[0x31u8; 2048]));

    // Boot 1: trigger held, download runs, then a reboot is forced.
    mcu.stage_download(build_image(DwlSlot::SLOT_1, 2, &[0x32u8; 2048]));
    mcu.press_download_trigger();
    let code = expect_reset(run(&mut mcu, &config));
    assert_eq!(code, BulwarkError::BOOT_DOWNLOAD_COMPLETE_REBOOT);
    mcu.release_download_trigger();
    mcu.reset();

    // Boot 2: the pending install runs, then a reboot is forced.
    let code = expect_reset(run(&mut mcu, &config));
    assert_eq!(code, BulwarkError::BOOT_INSTALL_COMPLETE_REBOOT);
    assert_eq!(active_version(&mcu, ActiveSlot::SLOT_1), 2);
    mcu.reset();

    // Boot 3: the new image executes.
    let entry = expect_launch(run(&mut mcu, &config));
    assert_eq!(entry, active_slot_entry(ActiveSlot::SLOT_1));
}

#[test]
fn test_power_cut_during_install_resumes() {
    let mut mcu = SoftMcu::new();
    let config = BootConfig::default();
    mcu.load_dwl_image(DwlSlot::SLOT_1, &build_image(DwlSlot::SLOT_1, 3, &[0x43u8; 8192]));
    mcu.set_loader_word(LoaderWord::InstallRequested as u32);

    // Power fails a few flash operations into the copy.
    mcu.power_cut_after(3);
    let code = expect_reset(run(&mut mcu, &config));
    assert_eq!(code, BulwarkError::FWIMG_INSTALL_FAILURE);
    mcu.reset();

    // Next boot derives the interrupted install and finishes it.
    let code = expect_reset(run(&mut mcu, &config));
    assert_eq!(code, BulwarkError::BOOT_INSTALL_COMPLETE_REBOOT);
    assert_eq!(active_version(&mcu, ActiveSlot::SLOT_1), 3);
    mcu.reset();

    let entry = expect_launch(run(&mut mcu, &config));
    assert_eq!(entry, active_slot_entry(ActiveSlot::SLOT_1));
}

#[test]
fn test_install_power_cut_sweep_recovers() {
    // Cut power at every flash operation across the whole install; the
    // device must come back to a valid launched image every time. An
    // install takes 8 flash operations end to end; the sweep runs past
    // that so the uncut case is covered too.
    for cut in 0..16 {
        let mut mcu = SoftMcu::new();
        let config = BootConfig::default();
        mcu.load_active_image(ActiveSlot::SLOT_1, &build_image(DwlSlot::SLOT_1, 1, &[0x51u8; 4096]));
        mcu.load_dwl_image(DwlSlot::SLOT_1, &build_image(DwlSlot::SLOT_1, 2, &[0x52u8; 4096]));
        mcu.set_loader_word(LoaderWord::InstallRequested as u32);
        mcu.power_cut_after(cut);

        let mut launched = None;
        for _ in 0..6 {
            match run(&mut mcu, &config) {
                BootOutcome::Launch(l) => {
                    launched = Some(l.entry());
                    break;
                }
                BootOutcome::Reset(_) => mcu.reset(),
                BootOutcome::Halt(code) => panic!("cut {}: halted with {:?}", cut, code),
            }
        }

        let entry = launched.unwrap_or_else(|| panic!("cut {}: never launched", cut));
        assert_eq!(entry, active_slot_entry(ActiveSlot::SLOT_1), "cut {}", cut);
        // The request survives any cut, so recovery always ends on the
        // new version.
        assert_eq!(active_version(&mcu, ActiveSlot::SLOT_1), 2, "cut {}", cut);
    }
}

#[test]
fn test_older_candidate_is_rejected() {
    let mut mcu = SoftMcu::new();
    mcu.load_active_image(ActiveSlot::SLOT_1, &build_image(DwlSlot::SLOT_1, 5, &[0x54u8; 1024]));
    mcu.load_dwl_image(DwlSlot::SLOT_1, &build_image(DwlSlot::SLOT_1, 4, &[0x55u8; 1024]));
    mcu.set_loader_word(LoaderWord::InstallRequested as u32);

    let code = expect_reset(run(&mut mcu, &BootConfig::default()));
    assert_eq!(code, BulwarkError::IMAGE_VERIFY_VERSION_TOO_OLD);
    assert_eq!(active_version(&mcu, ActiveSlot::SLOT_1), 5);
    assert_eq!(mcu.launched_entry(), None);
}

#[test]
fn test_body_bit_flip_blocks_launch() {
    let mut mcu = SoftMcu::new();
    mcu.set_loader_fitted(false);
    mcu.load_active_image(ActiveSlot::SLOT_1, &build_image(DwlSlot::SLOT_1, 1, &[0x66u8; 4096]));
    mcu.flip_flash_bit(active_slot_org(ActiveSlot::SLOT_1) + HEADER_SIZE + 1000, 3);

    let code = expect_halt(run(&mut mcu, &BootConfig::default()));
    assert_eq!(code, BulwarkError::BOOT_NO_FIRMWARE_NO_LOADER);
    assert_eq!(mcu.launched_entry(), None);
    // The rejected image's header got wiped in place
    let header = mcu.slot_bytes(active_slot_org(ActiveSlot::SLOT_1), HEADER_SIZE);
    assert!(header.iter().all(|b| *b == 0xFF));
}

#[test]
fn test_header_bit_flip_blocks_launch() {
    let mut mcu = SoftMcu::new();
    mcu.set_loader_fitted(false);
    mcu.load_active_image(ActiveSlot::SLOT_1, &build_image(DwlSlot::SLOT_1, 1, &[0x67u8; 4096]));
    // Flip a bit inside the version field
    mcu.flip_flash_bit(active_slot_org(ActiveSlot::SLOT_1) + 4, 0);

    let code = expect_halt(run(&mut mcu, &BootConfig::default()));
    assert_eq!(code, BulwarkError::BOOT_NO_FIRMWARE_NO_LOADER);
    assert_eq!(mcu.launched_entry(), None);
}

#[test]
fn test_trailing_code_blocks_launch() {
    let mut mcu = SoftMcu::new();
    mcu.set_loader_fitted(false);
    let image = build_image(DwlSlot::SLOT_1, 1, &[0x68u8; 4096]);
    mcu.load_active_image(ActiveSlot::SLOT_1, &image);
    // One programmed byte past the declared image size
    mcu.flip_flash_bit(active_slot_org(ActiveSlot::SLOT_1) + image.len() as u32 + 64, 0);

    let code = expect_halt(run(&mut mcu, &BootConfig::default()));
    assert_eq!(code, BulwarkError::BOOT_NO_FIRMWARE_NO_LOADER);
    assert_eq!(mcu.launched_entry(), None);
}

#[test]
fn test_mpu_corruption_halts() {
    let mut mcu = SoftMcu::new();
    mcu.load_active_image(ActiveSlot::SLOT_1, &build_image(DwlSlot::SLOT_1, 1, &[0x77u8; 1024]));
    mcu.corrupt_mpu_on_load();

    let code = expect_halt(run(&mut mcu, &BootConfig::default()));
    assert_eq!(code, BulwarkError::PROTECT_MPU_VERIFY);
    assert_eq!(mcu.indications().last(), Some(&Indication::Halt));
    assert_eq!(mcu.launched_entry(), None);
}

#[test]
fn test_activation_glitch_halts() {
    let mut mcu = SoftMcu::new();
    mcu.load_active_image(ActiveSlot::SLOT_1, &build_image(DwlSlot::SLOT_1, 1, &[0x88u8; 1024]));
    mcu.glitch_activation();

    let code = expect_halt(run(&mut mcu, &BootConfig::default()));
    assert_eq!(code, BulwarkError::GATE_ACTIVATION_NOT_EFFECTIVE);
    assert_eq!(mcu.launched_entry(), None);
}

#[test]
fn test_factory_device_gets_provisioned_then_boots() {
    let mut mcu = SoftMcu::fresh_factory();
    mcu.load_active_image(ActiveSlot::SLOT_1, &build_image(DwlSlot::SLOT_1, 1, &[0x99u8; 1024]));

    // First boot programs the option bytes and forces a reload reset.
    let code = expect_reset(run(&mut mcu, &BootConfig::default()));
    assert_eq!(code, BulwarkError::PROTECT_OPTION_BYTES_RELOAD);
    assert_eq!(mcu.reset_cause_pending(), Some(ResetCause::OptionByteReload));
    mcu.reset();

    // Second boot finds the target configuration in place and launches.
    let entry = expect_launch(run(&mut mcu, &BootConfig::default()));
    assert_eq!(entry, active_slot_entry(ActiveSlot::SLOT_1));
}

#[test]
fn test_out_of_range_loader_word_is_cleared() {
    let mut mcu = SoftMcu::new();
    mcu.load_active_image(ActiveSlot::SLOT_1, &build_image(DwlSlot::SLOT_1, 1, &[0xAAu8; 1024]));
    mcu.set_loader_word(0xDEAD_BEEF);

    expect_launch(run(&mut mcu, &BootConfig::default()));
    assert_eq!(mcu.loader_word(), 0);
}

#[test]
fn test_download_failure_cleans_slot() {
    let mut mcu = SoftMcu::new();
    let config = BootConfig::default();
    mcu.stage_download(build_image(DwlSlot::SLOT_1, 2, &[0xBBu8; 4096]));
    mcu.fail_download_midway();
    mcu.press_download_trigger();

    let code = expect_reset(run(&mut mcu, &config));
    assert_eq!(code, BulwarkError::LOADER_COM_ERROR);
    // The partial download got erased
    let slot = mcu.slot_bytes(dwl_slot_org(DwlSlot::SLOT_1), 4096);
    assert!(slot.iter().all(|b| *b == 0xFF));
    assert_eq!(mcu.launched_entry(), None);
}

#[test]
fn test_rejected_image_rolls_back() {
    let mut mcu = SoftMcu::new();
    let config = BootConfig::default();
    mcu.set_swap_capable(true);
    mcu.load_active_image(ActiveSlot::SLOT_1, &build_image(DwlSlot::SLOT_1, 1, &[0xCCu8; 1024]));
    mcu.load_dwl_image(DwlSlot::SLOT_1, &build_image(DwlSlot::SLOT_1, 2, &[0xCDu8; 1024]));
    mcu.set_loader_word(LoaderWord::InstallRequested as u32);

    let code = expect_reset(run(&mut mcu, &config));
    assert_eq!(code, BulwarkError::BOOT_INSTALL_COMPLETE_REBOOT);
    assert_eq!(active_version(&mcu, ActiveSlot::SLOT_1), 2);
    mcu.reset();

    expect_launch(run(&mut mcu, &config));
    mcu.reset();

    // The application found the new image defective.
    mcu.mark_rejected(ActiveSlot::SLOT_1, DwlSlot::SLOT_1);
    let code = expect_reset(run(&mut mcu, &config));
    assert_eq!(code, BulwarkError::BOOT_INSTALL_COMPLETE_REBOOT);
    assert_eq!(active_version(&mcu, ActiveSlot::SLOT_1), 1);
    mcu.reset();

    let entry = expect_launch(run(&mut mcu, &config));
    assert_eq!(entry, active_slot_entry(ActiveSlot::SLOT_1));
}

#[test]
fn test_rollback_without_swap_resets() {
    let mut mcu = SoftMcu::new();
    mcu.load_active_image(ActiveSlot::SLOT_1, &build_image(DwlSlot::SLOT_1, 2, &[0xDDu8; 1024]));
    mcu.mark_rejected(ActiveSlot::SLOT_1, DwlSlot::SLOT_1);

    let code = expect_reset(run(&mut mcu, &BootConfig::default()));
    assert_eq!(code, BulwarkError::BOOT_ROLLBACK_NOT_SUPPORTED);
    assert_eq!(mcu.launched_entry(), None);
}
