/*++

Licensed under the Apache-2.0 license.

File Name:

    model.rs

Abstract:

    File contains the software MCU. Flash is a byte vector with per-byte
    programmed tracking, option bytes take effect through launch, and the
    non-volatile installation bookkeeping survives `reset()` while every
    run-time protection is wiped by it.

--*/

use bulwark_drivers::memory_layout::{
    active_slot_org, dwl_slot_org, ACTIVATION_RAM_SIZE, ACTIVE_SLOT_SIZE, DWL_SLOT_SIZE,
    FLASH_SIZE, HEADER_SIZE,
};
use bulwark_drivers::{
    AntiTamper, DebugPort, DmaLock, DownloadInfo, FlashBlockService, FwImgService, ImageAuth,
    Indication, Launched, Loader, LoaderComm, Mpu, MpuRegion, ObConfig, OptionBytes,
    PrivilegeControl, PrivilegeLevel, RdpLevel, RegionAccess, ResetCause, ResetControl,
    SecureMemActivation, StatusIndicator, Watchdog,
};
use bulwark_error::{BulwarkError, BulwarkResult};
use bulwark_image_types::{
    ActiveSlot, DwlSlot, InstallPlan, DEFAULT_DWL_SLOT, HEADER_BYTE_SIZE,
};

use crate::image::header_tag;
use crate::image::HEADER_TAG_SPAN;

const ERASED: u8 = 0xFF;
const COPY_CHUNK: usize = 1024;

/// Flash failures inside the download path report as loader write errors;
/// a simulated power loss keeps its own code.
fn loader_flash_err(err: BulwarkError) -> BulwarkError {
    if err == BulwarkError::MODEL_POWER_LOSS {
        err
    } else {
        BulwarkError::LOADER_FLASH_WRITE
    }
}

/// Non-volatile installation bookkeeping. Survives reset.
#[derive(Debug, Default, Clone)]
struct NvState {
    install_requested: Option<DwlSlot>,
    install_in_progress: Option<(ActiveSlot, DwlSlot)>,
    rejected: Option<(ActiveSlot, DwlSlot)>,
}

/// Host-side software MCU.
pub struct SoftMcu {
    // Non-volatile
    flash: Vec<u8>,
    programmed: Vec<bool>,
    ob: ObConfig,
    ob_staged: Option<ObConfig>,
    nv: NvState,
    loader_word: u32,
    pending_reset_cause: Option<ResetCause>,
    swap_capable: bool,
    loader_fitted: bool,

    // Volatile, wiped by reset()
    reset_cause: ResetCause,
    wdt_running: bool,
    mpu_regions: Vec<MpuRegion>,
    mpu_enabled: bool,
    dma_disabled: bool,
    dap_locked: bool,
    tamper_configured: bool,
    privilege: PrivilegeLevel,
    trusted_stack_cleared: bool,
    activation_ram: Vec<u8>,
    activation_sealed: bool,
    secure_mem_active: bool,
    services_locked: bool,
    xip_configured: Option<u32>,
    indications: Vec<Indication>,
    launched: Option<u32>,
    power_lost: bool,

    // Test inputs and fault hooks
    trigger_pressed: bool,
    pending_download: Option<Vec<u8>>,
    fail_download_midway: bool,
    last_dwl_target: DwlSlot,
    power_cut_after_writes: Option<u32>,
    corrupt_mpu_on_load: bool,
    activation_glitch: bool,
}

impl SoftMcu {
    /// A provisioned device: option bytes already at the engine target.
    pub fn new() -> Self {
        Self::with_ob(ObConfig::engine_target())
    }

    /// A device fresh from the factory: dual-bank set, everything else open.
    pub fn fresh_factory() -> Self {
        Self::with_ob(ObConfig {
            rdp: RdpLevel::L0,
            dual_bank: true,
            wrp: Default::default(),
            pcrop: Default::default(),
            secure_memory: Default::default(),
            single_entry: false,
        })
    }

    fn with_ob(ob: ObConfig) -> Self {
        Self {
            flash: vec![ERASED; FLASH_SIZE as usize],
            programmed: vec![false; FLASH_SIZE as usize],
            ob,
            ob_staged: None,
            nv: NvState::default(),
            loader_word: 0,
            pending_reset_cause: None,
            swap_capable: false,
            loader_fitted: true,
            reset_cause: ResetCause::PowerOn,
            wdt_running: false,
            mpu_regions: Vec::new(),
            mpu_enabled: false,
            dma_disabled: false,
            dap_locked: false,
            tamper_configured: false,
            privilege: PrivilegeLevel::Privileged,
            trusted_stack_cleared: false,
            activation_ram: Vec::new(),
            activation_sealed: false,
            secure_mem_active: false,
            services_locked: false,
            xip_configured: None,
            indications: Vec::new(),
            launched: None,
            power_lost: false,
            trigger_pressed: false,
            pending_download: None,
            fail_download_midway: false,
            last_dwl_target: DEFAULT_DWL_SLOT,
            power_cut_after_writes: None,
            corrupt_mpu_on_load: false,
            activation_glitch: false,
        }
    }

    /// Simulated reset: wipes everything volatile, keeps flash, option
    /// bytes, the loader word and the installation bookkeeping.
    pub fn reset(&mut self) {
        let cause = self
            .pending_reset_cause
            .take()
            .unwrap_or(ResetCause::Software);
        self.reset_cause = cause;
        self.wdt_running = false;
        self.mpu_regions.clear();
        self.mpu_enabled = false;
        self.dma_disabled = false;
        self.dap_locked = false;
        self.tamper_configured = false;
        self.privilege = PrivilegeLevel::Privileged;
        self.trusted_stack_cleared = false;
        self.activation_ram.clear();
        self.activation_sealed = false;
        self.secure_mem_active = false;
        self.services_locked = false;
        self.xip_configured = None;
        self.indications.clear();
        self.launched = None;
        self.power_lost = false;
        self.power_cut_after_writes = None;
    }

    pub fn set_loader_fitted(&mut self, fitted: bool) {
        self.loader_fitted = fitted;
    }

    pub fn set_swap_capable(&mut self, capable: bool) {
        self.swap_capable = capable;
    }

    /// Place an image (header + body) into an active slot. Test setup only;
    /// bypasses the programmed-byte rules.
    pub fn load_active_image(&mut self, slot: ActiveSlot, image: &[u8]) {
        self.load_raw(active_slot_org(slot), image);
    }

    /// Place an image into a download slot. Test setup only.
    pub fn load_dwl_image(&mut self, slot: DwlSlot, image: &[u8]) {
        self.load_raw(dwl_slot_org(slot), image);
    }

    fn load_raw(&mut self, org: u32, image: &[u8]) {
        let org = org as usize;
        self.flash[org..org + image.len()].copy_from_slice(image);
        self.programmed[org..org + image.len()].fill(true);
    }

    /// Flip one bit anywhere in flash. Fault hook.
    pub fn flip_flash_bit(&mut self, offset: u32, bit: u8) {
        self.flash[offset as usize] ^= 1 << bit;
        self.programmed[offset as usize] = true;
    }

    /// Queue an image for the next `loader_download`.
    pub fn stage_download(&mut self, image: Vec<u8>) {
        self.pending_download = Some(image);
    }

    /// Make the next download fail after writing half the image.
    pub fn fail_download_midway(&mut self) {
        self.fail_download_midway = true;
    }

    pub fn press_download_trigger(&mut self) {
        self.trigger_pressed = true;
    }

    pub fn release_download_trigger(&mut self) {
        self.trigger_pressed = false;
    }

    pub fn set_loader_word(&mut self, word: u32) {
        self.loader_word = word;
    }

    /// Fail every flash program/erase once `writes` more have completed.
    pub fn power_cut_after(&mut self, writes: u32) {
        self.power_cut_after_writes = Some(writes);
    }

    /// Corrupt the MPU table as it is loaded, so later verification fails.
    pub fn corrupt_mpu_on_load(&mut self) {
        self.corrupt_mpu_on_load = true;
    }

    /// Make secure-memory activation silently not take effect.
    pub fn glitch_activation(&mut self) {
        self.activation_glitch = true;
    }

    /// Record that the image installed over `active` was rejected and the
    /// backup in `dwl` must be restored.
    pub fn mark_rejected(&mut self, active: ActiveSlot, dwl: DwlSlot) {
        self.nv.rejected = Some((active, dwl));
    }

    pub fn launched_entry(&self) -> Option<u32> {
        self.launched
    }

    pub fn indications(&self) -> &[Indication] {
        &self.indications
    }

    pub fn reset_cause_pending(&self) -> Option<ResetCause> {
        self.pending_reset_cause
    }

    pub fn ob_config(&self) -> ObConfig {
        self.ob
    }

    pub fn loader_word(&self) -> u32 {
        self.loader_word
    }

    pub fn slot_bytes(&self, org: u32, len: u32) -> &[u8] {
        &self.flash[org as usize..(org + len) as usize]
    }

    fn consume_power(&mut self) -> BulwarkResult<()> {
        if self.power_lost {
            return Err(BulwarkError::MODEL_POWER_LOSS);
        }
        if let Some(budget) = &mut self.power_cut_after_writes {
            if *budget == 0 {
                self.power_lost = true;
                return Err(BulwarkError::MODEL_POWER_LOSS);
            }
            *budget -= 1;
        }
        Ok(())
    }

    fn write_internal(&mut self, offset: u32, data: &[u8]) -> BulwarkResult<()> {
        let end = offset as usize + data.len();
        if end > self.flash.len() {
            return Err(BulwarkError::FLASH_WRITE_OUT_OF_BOUNDS);
        }
        self.consume_power()?;
        let offset = offset as usize;
        if self.programmed[offset..end].iter().any(|p| *p) {
            return Err(BulwarkError::FLASH_WRITE_NOT_ERASED);
        }
        self.flash[offset..end].copy_from_slice(data);
        self.programmed[offset..end].fill(true);
        Ok(())
    }

    fn erase_internal(&mut self, offset: u32, len: u32) -> BulwarkResult<()> {
        let end = (offset + len) as usize;
        if end > self.flash.len() {
            return Err(BulwarkError::FLASH_ERASE_OUT_OF_BOUNDS);
        }
        self.consume_power()?;
        let offset = offset as usize;
        self.flash[offset..end].fill(ERASED);
        self.programmed[offset..end].fill(false);
        Ok(())
    }

    fn header_parses(&self, org: u32) -> bool {
        let org = org as usize;
        let header = &self.flash[org..org + HEADER_BYTE_SIZE];
        if header.iter().all(|b| *b == ERASED) {
            return false;
        }
        let magic = u32::from_le_bytes(header[0..4].try_into().unwrap());
        DwlSlot::from_magic(magic).is_some()
    }

    fn fw_size_at(&self, org: u32) -> u32 {
        let org = org as usize;
        u32::from_le_bytes(self.flash[org + 8..org + 12].try_into().unwrap())
    }

    fn slot_size_of(&self, org: u32) -> u32 {
        if ActiveSlot::ALL.iter().any(|s| active_slot_org(*s) == org) {
            ACTIVE_SLOT_SIZE
        } else {
            DWL_SLOT_SIZE
        }
    }

    fn guard_services(&self) -> BulwarkResult<()> {
        if self.services_locked {
            return Err(BulwarkError::FWIMG_SERVICES_LOCKED);
        }
        Ok(())
    }

    /// Copy the staged image from `dwl` over `active`, then release `dwl`.
    /// With swap-capable installation the previous active image ends up in
    /// `dwl` as the rollback backup.
    fn copy_dwl_to_active(&mut self, active: ActiveSlot, dwl: DwlSlot) -> BulwarkResult<()> {
        let act_org = active_slot_org(active);
        let dwl_org = dwl_slot_org(dwl);
        let total = HEADER_SIZE + self.fw_size_at(dwl_org);

        let staged = self.flash[dwl_org as usize..(dwl_org + total) as usize].to_vec();

        if self.swap_capable {
            let backup = if self.header_parses(act_org) {
                let old_total = HEADER_SIZE + self.fw_size_at(act_org);
                Some(self.flash[act_org as usize..(act_org + old_total) as usize].to_vec())
            } else {
                None
            };
            self.erase_internal(dwl_org, DWL_SLOT_SIZE)?;
            if let Some(backup) = backup {
                self.copy_chunked(dwl_org, &backup)?;
            }
        }

        self.erase_internal(act_org, ACTIVE_SLOT_SIZE)?;
        self.copy_chunked(act_org, &staged)?;

        if !self.swap_capable {
            self.erase_internal(dwl_org, DWL_SLOT_SIZE)?;
        }

        self.nv.install_in_progress = None;
        Ok(())
    }

    fn copy_chunked(&mut self, org: u32, data: &[u8]) -> BulwarkResult<()> {
        for (i, chunk) in data.chunks(COPY_CHUNK).enumerate() {
            self.write_internal(org + (i * COPY_CHUNK) as u32, chunk)?;
        }
        Ok(())
    }
}

impl Default for SoftMcu {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashBlockService for SoftMcu {
    fn flash_read(&self, offset: u32, buf: &mut [u8]) -> BulwarkResult<()> {
        let end = offset as usize + buf.len();
        if end > self.flash.len() {
            return Err(BulwarkError::FLASH_READ_OUT_OF_BOUNDS);
        }
        buf.copy_from_slice(&self.flash[offset as usize..end]);
        Ok(())
    }

    fn flash_write(&mut self, offset: u32, data: &[u8]) -> BulwarkResult<()> {
        self.write_internal(offset, data)
    }

    fn flash_erase(&mut self, offset: u32, len: u32) -> BulwarkResult<()> {
        self.erase_internal(offset, len)
    }

    fn flash_configure_execute(&mut self, slot_org: u32) -> BulwarkResult<()> {
        self.xip_configured = Some(slot_org);
        Ok(())
    }
}

impl ImageAuth for SoftMcu {
    fn auth_verify_header(&self, slot_org: u32) -> BulwarkResult<bool> {
        if !self.header_parses(slot_org) {
            return Ok(false);
        }
        let org = slot_org as usize;
        let tag = header_tag(&self.flash[org..org + HEADER_TAG_SPAN]);
        Ok(self.flash[org + HEADER_TAG_SPAN..org + HEADER_TAG_SPAN + 8] == tag)
    }

    fn auth_verify_image(&self, slot_org: u32) -> BulwarkResult<bool> {
        if !self.header_parses(slot_org) {
            return Ok(false);
        }
        let fw_size = self.fw_size_at(slot_org);
        if fw_size == 0 || fw_size > self.slot_size_of(slot_org) - HEADER_SIZE {
            return Ok(false);
        }
        let body_org = (slot_org + HEADER_SIZE) as usize;
        let tag = crate::image::image_tag(&self.flash[body_org..body_org + fw_size as usize]);
        let org = slot_org as usize;
        Ok(self.flash[org + 20..org + 28] == tag)
    }

    fn auth_detect_image(&self, slot_org: u32) -> BulwarkResult<bool> {
        Ok(self.header_parses(slot_org))
    }
}

impl OptionBytes for SoftMcu {
    fn ob_read(&self) -> BulwarkResult<ObConfig> {
        Ok(self.ob)
    }

    fn ob_program(&mut self, cfg: &ObConfig) -> BulwarkResult<()> {
        self.ob_staged = Some(*cfg);
        Ok(())
    }

    fn ob_launch(&mut self) -> BulwarkResult<()> {
        if let Some(staged) = self.ob_staged.take() {
            self.ob = staged;
        }
        self.pending_reset_cause = Some(ResetCause::OptionByteReload);
        Ok(())
    }
}

impl Mpu for SoftMcu {
    fn mpu_load_regions(&mut self, regions: &[MpuRegion]) -> BulwarkResult<()> {
        self.mpu_regions = regions.to_vec();
        if self.corrupt_mpu_on_load {
            if let Some(region) = self.mpu_regions.first_mut() {
                region.access = RegionAccess::all();
            }
        }
        self.mpu_enabled = true;
        Ok(())
    }

    fn mpu_verify_regions(&self, regions: &[MpuRegion]) -> BulwarkResult<bool> {
        Ok(self.mpu_enabled && self.mpu_regions == regions)
    }

    fn mpu_disable(&mut self) -> BulwarkResult<()> {
        self.mpu_enabled = false;
        Ok(())
    }
}

impl Watchdog for SoftMcu {
    fn wdt_start(&mut self, _timeout_ms: u32) -> BulwarkResult<()> {
        self.wdt_running = true;
        Ok(())
    }

    fn wdt_refresh(&mut self) -> BulwarkResult<()> {
        Ok(())
    }
}

impl DmaLock for SoftMcu {
    fn dma_disable(&mut self) -> BulwarkResult<()> {
        self.dma_disabled = true;
        Ok(())
    }

    fn dma_is_disabled(&self) -> BulwarkResult<bool> {
        Ok(self.dma_disabled)
    }
}

impl DebugPort for SoftMcu {
    fn dap_lock(&mut self) -> BulwarkResult<()> {
        self.dap_locked = true;
        Ok(())
    }

    fn dap_is_locked(&self) -> BulwarkResult<bool> {
        Ok(self.dap_locked)
    }
}

impl AntiTamper for SoftMcu {
    fn tamper_configure(&mut self) -> BulwarkResult<()> {
        self.tamper_configured = true;
        Ok(())
    }

    fn tamper_is_configured(&self) -> BulwarkResult<bool> {
        Ok(self.tamper_configured)
    }
}

impl ResetControl for SoftMcu {
    fn reset_cause(&mut self) -> ResetCause {
        core::mem::replace(&mut self.reset_cause, ResetCause::Unknown)
    }
}

impl PrivilegeControl for SoftMcu {
    fn enter_unprivileged(&mut self) -> BulwarkResult<()> {
        self.privilege = PrivilegeLevel::Unprivileged;
        Ok(())
    }

    fn enter_privileged(&mut self) -> BulwarkResult<()> {
        self.privilege = PrivilegeLevel::Privileged;
        Ok(())
    }

    fn privilege_level(&self) -> PrivilegeLevel {
        self.privilege
    }

    fn clear_trusted_stack(&mut self) -> BulwarkResult<()> {
        self.trusted_stack_cleared = true;
        Ok(())
    }
}

impl SecureMemActivation for SoftMcu {
    fn stage_activation(&mut self, blob: &[u8]) -> BulwarkResult<()> {
        if blob.len() > ACTIVATION_RAM_SIZE as usize {
            return Err(BulwarkError::GATE_ACTIVATION_COPY_MISMATCH);
        }
        self.activation_ram = blob.to_vec();
        Ok(())
    }

    fn read_staged(&self, buf: &mut [u8]) -> BulwarkResult<()> {
        if buf.len() > self.activation_ram.len() {
            return Err(BulwarkError::GATE_ACTIVATION_COPY_MISMATCH);
        }
        buf.copy_from_slice(&self.activation_ram[..buf.len()]);
        Ok(())
    }

    fn seal_activation_region(&mut self) -> BulwarkResult<()> {
        self.activation_sealed = true;
        Ok(())
    }

    fn activate(&mut self) -> BulwarkResult<()> {
        if !self.activation_glitch {
            self.secure_mem_active = true;
        }
        Ok(())
    }

    fn secure_memory_active(&self) -> BulwarkResult<bool> {
        Ok(self.secure_mem_active)
    }

    fn jump(&mut self, entry: u32) -> BulwarkResult<Launched> {
        self.mpu_enabled = false;
        self.privilege = PrivilegeLevel::Unprivileged;
        self.launched = Some(entry);
        Ok(Launched::new(entry))
    }
}

impl LoaderComm for SoftMcu {
    fn loader_word_read(&self) -> u32 {
        self.loader_word
    }

    fn loader_word_clear(&mut self) {
        self.loader_word = 0;
    }

    fn download_trigger_pressed(&self) -> bool {
        self.trigger_pressed
    }
}

impl Loader for SoftMcu {
    fn loader_available(&self) -> bool {
        self.loader_fitted
    }

    fn loader_download(&mut self) -> BulwarkResult<DownloadInfo> {
        let image = self
            .pending_download
            .take()
            .ok_or(BulwarkError::LOADER_COM_ERROR)?;
        if image.len() < HEADER_BYTE_SIZE {
            return Err(BulwarkError::LOADER_COM_ERROR);
        }
        let magic = u32::from_le_bytes(image[0..4].try_into().unwrap());
        let dwl = DwlSlot::from_magic(magic).unwrap_or(DEFAULT_DWL_SLOT);
        self.last_dwl_target = dwl;

        if image.len() as u32 > DWL_SLOT_SIZE {
            return Err(BulwarkError::LOADER_FW_TOO_BIG);
        }

        // The header is authenticated on receipt, before flash is touched.
        let tag = header_tag(&image[..HEADER_TAG_SPAN]);
        if image[HEADER_TAG_SPAN..HEADER_TAG_SPAN + 8] != tag {
            return Err(BulwarkError::LOADER_HEADER_AUTH);
        }

        let org = dwl_slot_org(dwl);
        self.erase_internal(org, DWL_SLOT_SIZE)
            .map_err(loader_flash_err)?;
        if self.fail_download_midway {
            self.fail_download_midway = false;
            self.copy_chunked(org, &image[..image.len() / 2])
                .map_err(loader_flash_err)?;
            return Err(BulwarkError::LOADER_COM_ERROR);
        }
        self.copy_chunked(org, &image).map_err(loader_flash_err)?;
        Ok(DownloadInfo { dwl })
    }

    fn loader_target(&self) -> DwlSlot {
        self.last_dwl_target
    }
}

impl FwImgService for SoftMcu {
    fn fwimg_install_plan(&mut self) -> BulwarkResult<InstallPlan> {
        if let Some((active, dwl)) = self.nv.rejected {
            return Ok(InstallPlan::RejectedRollback { active, dwl });
        }
        if let Some((active, dwl)) = self.nv.install_in_progress {
            return Ok(InstallPlan::InterruptedResume { active, dwl });
        }
        if let Some(dwl) = self.nv.install_requested {
            return Ok(InstallPlan::ToInstall { dwl });
        }
        Ok(InstallPlan::None)
    }

    fn fwimg_install_at_next_reset(&mut self, dwl: DwlSlot) -> BulwarkResult<()> {
        self.guard_services()?;
        // The request record is itself a non-volatile write.
        self.consume_power()
            .map_err(|_| BulwarkError::FWIMG_BOOKKEEPING_WRITE)?;
        self.nv.install_requested = Some(dwl);
        Ok(())
    }

    fn fwimg_trigger_installation(
        &mut self,
        active: ActiveSlot,
        dwl: DwlSlot,
    ) -> BulwarkResult<()> {
        self.guard_services()?;
        // The in-progress record goes down before the first destructive
        // write; a cut anywhere after this derives InterruptedResume.
        self.nv.install_in_progress = Some((active, dwl));
        self.nv.install_requested = None;
        self.copy_dwl_to_active(active, dwl)
            .map_err(|_| BulwarkError::FWIMG_INSTALL_FAILURE)
    }

    fn fwimg_trigger_resume(&mut self, active: ActiveSlot, dwl: DwlSlot) -> BulwarkResult<()> {
        self.guard_services()?;
        let dwl_org = dwl_slot_org(dwl);
        if self.header_parses(dwl_org) {
            self.nv.install_in_progress = Some((active, dwl));
            self.copy_dwl_to_active(active, dwl)
                .map_err(|_| BulwarkError::FWIMG_RESUME_FAILURE)
        } else {
            // The copy already completed; finish the bookkeeping.
            self.erase_internal(dwl_org, DWL_SLOT_SIZE)
                .map_err(|_| BulwarkError::FWIMG_RESUME_FAILURE)?;
            self.nv.install_in_progress = None;
            Ok(())
        }
    }

    fn fwimg_trigger_rollback(&mut self, active: ActiveSlot, dwl: DwlSlot) -> BulwarkResult<()> {
        self.guard_services()?;
        if !self.swap_capable {
            return Err(BulwarkError::FWIMG_ROLLBACK_FAILURE);
        }
        let was_swap = self.swap_capable;
        // Restore is a plain copy back; the backup must not be re-stashed.
        self.swap_capable = false;
        let result = self
            .copy_dwl_to_active(active, dwl)
            .map_err(|_| BulwarkError::FWIMG_ROLLBACK_FAILURE);
        self.swap_capable = was_swap;
        if result.is_ok() {
            self.nv.rejected = None;
        }
        result
    }

    fn fwimg_erase_downloaded(&mut self, dwl: DwlSlot) -> BulwarkResult<()> {
        self.erase_internal(dwl_slot_org(dwl), DWL_SLOT_SIZE)
    }

    fn fwimg_invalidate(&mut self, active: ActiveSlot) -> BulwarkResult<()> {
        self.erase_internal(active_slot_org(active), HEADER_SIZE)
    }

    fn fwimg_swap_capable(&self) -> bool {
        self.swap_capable
    }

    fn fwimg_lock_services(&mut self) -> BulwarkResult<()> {
        self.services_locked = true;
        Ok(())
    }
}

impl StatusIndicator for SoftMcu {
    fn indicate(&mut self, indication: Indication) {
        self.indications.push(indication);
    }
}
