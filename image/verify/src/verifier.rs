/*++

Licensed under the Apache-2.0 license.

File Name:

    verifier.rs

Abstract:

    File contains the firmware slot verifier. A slot's image is trusted only
    after its header tag verifies, its full-image tag verifies and the scan
    for unauthorized trailing bytes passes, in that order, with a flow
    counter crediting each step and checked against the exact total at the
    end.

--*/

use bulwark_drivers::memory_layout::HEADER_SIZE;
use bulwark_drivers::{FlashBlockService, ImageAuth};
use bulwark_error::{BulwarkError, BulwarkResult};
use bulwark_flow_lib::{FlowCounter, FLOW_INIT};
use bulwark_image_types::{DwlSlot, ImageHeader, HEADER_BYTE_SIZE};
use zerocopy::FromBytes;

pub const STEP_AUTH_HEADER: u32 = 0x0000_00A0;
pub const STEP_AUTH_IMAGE: u32 = 0x0000_0500;
pub const STEP_TRAILER: u32 = 0x0000_3000;

/// Expected crypto-flow accumulator after a full slot verification.
pub const CRYPTO_TOTAL: u32 = FLOW_INIT + STEP_AUTH_HEADER + STEP_AUTH_IMAGE + STEP_TRAILER;

const SCAN_CHUNK: usize = 256;
const ERASED: u8 = 0xFF;

/// Firmware slot verifier, generic over the flash and authentication seams.
pub struct SlotVerifier<'a, Env: FlashBlockService + ImageAuth> {
    env: &'a Env,
}

impl<'a, Env: FlashBlockService + ImageAuth> SlotVerifier<'a, Env> {
    pub fn new(env: &'a Env) -> Self {
        Self { env }
    }

    /// Read and parse the header at the start of a slot.
    ///
    /// The returned header is untrusted until `verify_slot` passes.
    pub fn read_header(&self, slot_org: u32) -> BulwarkResult<ImageHeader> {
        let mut buf = [0u8; HEADER_BYTE_SIZE];
        self.env.flash_read(slot_org, &mut buf)?;
        if buf.iter().all(|b| *b == ERASED) {
            return Err(BulwarkError::IMAGE_VERIFY_NO_IMAGE);
        }
        let header = ImageHeader::read_from(buf.as_slice())
            .ok_or(BulwarkError::IMAGE_VERIFY_HEADER_MALFORMED)?;
        if DwlSlot::from_magic(header.magic).is_none() {
            return Err(BulwarkError::IMAGE_VERIFY_HEADER_MALFORMED);
        }
        Ok(header)
    }

    /// Structural image-presence check: something is in the slot, its header
    /// parses and its declared size fits. No tag is verified.
    pub fn detect_image(&self, slot_org: u32, slot_size: u32) -> BulwarkResult<bool> {
        if !self.env.auth_detect_image(slot_org)? {
            return Ok(false);
        }
        let header = match self.read_header(slot_org) {
            Ok(header) => header,
            Err(_) => return Ok(false),
        };
        Ok(self.size_in_range(&header, slot_size))
    }

    /// Whether the slot's header area is erased.
    pub fn slot_is_empty(&self, slot_org: u32) -> BulwarkResult<bool> {
        let mut buf = [0u8; HEADER_BYTE_SIZE];
        self.env.flash_read(slot_org, &mut buf)?;
        Ok(buf.iter().all(|b| *b == ERASED))
    }

    /// Full verification of the image in a slot.
    ///
    /// Order is fixed: header tag, full-image tag, trailing-bytes scan. Any
    /// failure is reported without the later steps running; the caller
    /// decides whether to invalidate the slot.
    pub fn verify_slot(&self, slot_org: u32, slot_size: u32) -> BulwarkResult<ImageHeader> {
        let mut ctr = FlowCounter::init();

        let header = self.read_header(slot_org)?;
        if !self.size_in_range(&header, slot_size) {
            return Err(BulwarkError::IMAGE_VERIFY_SIZE_OUT_OF_RANGE);
        }

        if !self.env.auth_verify_header(slot_org)? {
            return Err(BulwarkError::IMAGE_VERIFY_HEADER_AUTH_FAILURE);
        }
        ctr.advance(STEP_AUTH_HEADER)?;

        if !self.env.auth_verify_image(slot_org)? {
            return Err(BulwarkError::IMAGE_VERIFY_IMAGE_AUTH_FAILURE);
        }
        ctr.advance(STEP_AUTH_IMAGE)?;

        self.scan_trailing(slot_org, slot_size, &header)?;
        ctr.advance(STEP_TRAILER)?;

        ctr.check(CRYPTO_TOTAL)?;
        Ok(header)
    }

    /// Check that a slot holds no programmed bytes at all.
    pub fn verify_empty(&self, slot_org: u32, slot_size: u32) -> BulwarkResult<()> {
        self.scan_erased(slot_org, slot_size)
            .map_err(|_| BulwarkError::IMAGE_VERIFY_SLOT_NOT_EMPTY)
    }

    /// Check that a candidate's version strictly exceeds the version in the
    /// target active slot. Callers run this twice, independently.
    pub fn check_candidate_version(
        &self,
        candidate: &ImageHeader,
        active_org: u32,
    ) -> BulwarkResult<()> {
        let active_version = match self.read_header(active_org) {
            Ok(header) => header.fw_version,
            // An empty or unparsable active slot never outranks a candidate.
            Err(_) => return Ok(()),
        };
        if candidate.fw_version <= active_version {
            return Err(BulwarkError::IMAGE_VERIFY_VERSION_TOO_OLD);
        }
        Ok(())
    }

    fn size_in_range(&self, header: &ImageHeader, slot_size: u32) -> bool {
        header.fw_size != 0 && header.fw_size <= slot_size - HEADER_SIZE
    }

    /// Every byte beyond the declared image size must read erased.
    fn scan_trailing(
        &self,
        slot_org: u32,
        slot_size: u32,
        header: &ImageHeader,
    ) -> BulwarkResult<()> {
        let start = slot_org + HEADER_SIZE + header.fw_size;
        let len = slot_size - HEADER_SIZE - header.fw_size;
        self.scan_erased(start, len)
            .map_err(|_| BulwarkError::IMAGE_VERIFY_TRAILING_CODE_DETECTED)
    }

    fn scan_erased(&self, start: u32, len: u32) -> BulwarkResult<()> {
        let mut buf = [0u8; SCAN_CHUNK];
        let mut offset = start;
        let end = start + len;
        while offset < end {
            let chunk = core::cmp::min(SCAN_CHUNK as u32, end - offset);
            let buf = &mut buf[..chunk as usize];
            self.env.flash_read(offset, buf)?;
            if buf.iter().any(|b| *b != ERASED) {
                return Err(BulwarkError::IMAGE_VERIFY_TRAILING_CODE_DETECTED);
            }
            offset += chunk;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulwark_image_types::DwlSlot;
    use zerocopy::AsBytes;

    const SLOT_ORG: u32 = 0x1000;
    const SLOT_SIZE: u32 = 0x2000;

    struct TestEnv {
        flash: Vec<u8>,
        detect: bool,
        header_ok: bool,
        image_ok: bool,
    }

    impl TestEnv {
        fn with_image(fw_size: u32, fw_version: u32) -> Self {
            let mut flash = vec![0xFFu8; (SLOT_ORG + SLOT_SIZE) as usize];
            let header = ImageHeader {
                magic: DwlSlot::SLOT_1.magic(),
                fw_version,
                fw_size,
                ..Default::default()
            };
            let org = SLOT_ORG as usize;
            flash[org..org + HEADER_BYTE_SIZE].copy_from_slice(header.as_bytes());
            let body = org + HEADER_BYTE_SIZE;
            flash[body..body + fw_size as usize].fill(0xAB);
            Self {
                flash,
                detect: true,
                header_ok: true,
                image_ok: true,
            }
        }

        fn empty() -> Self {
            Self {
                flash: vec![0xFFu8; (SLOT_ORG + SLOT_SIZE) as usize],
                detect: false,
                header_ok: false,
                image_ok: false,
            }
        }
    }

    impl FlashBlockService for TestEnv {
        fn flash_read(&self, offset: u32, buf: &mut [u8]) -> BulwarkResult<()> {
            let offset = offset as usize;
            buf.copy_from_slice(&self.flash[offset..offset + buf.len()]);
            Ok(())
        }

        fn flash_write(&mut self, offset: u32, data: &[u8]) -> BulwarkResult<()> {
            let offset = offset as usize;
            self.flash[offset..offset + data.len()].copy_from_slice(data);
            Ok(())
        }

        fn flash_erase(&mut self, offset: u32, len: u32) -> BulwarkResult<()> {
            let offset = offset as usize;
            self.flash[offset..offset + len as usize].fill(0xFF);
            Ok(())
        }

        fn flash_configure_execute(&mut self, _slot_org: u32) -> BulwarkResult<()> {
            Ok(())
        }
    }

    impl ImageAuth for TestEnv {
        fn auth_verify_header(&self, _slot_org: u32) -> BulwarkResult<bool> {
            Ok(self.header_ok)
        }

        fn auth_verify_image(&self, _slot_org: u32) -> BulwarkResult<bool> {
            Ok(self.image_ok)
        }

        fn auth_detect_image(&self, _slot_org: u32) -> BulwarkResult<bool> {
            Ok(self.detect)
        }
    }

    #[test]
    fn test_verify_slot_ok() {
        let env = TestEnv::with_image(0x400, 3);
        let verifier = SlotVerifier::new(&env);
        let header = verifier.verify_slot(SLOT_ORG, SLOT_SIZE).unwrap();
        assert_eq!(header.fw_version, 3);
        assert_eq!(header.fw_size, 0x400);
    }

    #[test]
    fn test_header_auth_failure() {
        let mut env = TestEnv::with_image(0x400, 3);
        env.header_ok = false;
        let verifier = SlotVerifier::new(&env);
        assert_eq!(
            verifier.verify_slot(SLOT_ORG, SLOT_SIZE),
            Err(BulwarkError::IMAGE_VERIFY_HEADER_AUTH_FAILURE)
        );
    }

    #[test]
    fn test_image_auth_failure() {
        let mut env = TestEnv::with_image(0x400, 3);
        env.image_ok = false;
        let verifier = SlotVerifier::new(&env);
        assert_eq!(
            verifier.verify_slot(SLOT_ORG, SLOT_SIZE),
            Err(BulwarkError::IMAGE_VERIFY_IMAGE_AUTH_FAILURE)
        );
    }

    #[test]
    fn test_trailing_code_detected() {
        let mut env = TestEnv::with_image(0x400, 3);
        // One programmed byte just beyond the declared size
        let beyond = (SLOT_ORG + HEADER_SIZE + 0x400) as usize;
        env.flash[beyond] = 0x00;
        let verifier = SlotVerifier::new(&env);
        assert_eq!(
            verifier.verify_slot(SLOT_ORG, SLOT_SIZE),
            Err(BulwarkError::IMAGE_VERIFY_TRAILING_CODE_DETECTED)
        );
    }

    #[test]
    fn test_no_image() {
        let env = TestEnv::empty();
        let verifier = SlotVerifier::new(&env);
        assert_eq!(
            verifier.verify_slot(SLOT_ORG, SLOT_SIZE),
            Err(BulwarkError::IMAGE_VERIFY_NO_IMAGE)
        );
        assert!(verifier.slot_is_empty(SLOT_ORG).unwrap());
        assert!(!verifier.detect_image(SLOT_ORG, SLOT_SIZE).unwrap());
    }

    #[test]
    fn test_size_out_of_range() {
        let mut env = TestEnv::with_image(0x400, 3);
        let mut header = SlotVerifier::new(&env).read_header(SLOT_ORG).unwrap();
        header.fw_size = SLOT_SIZE;
        let org = SLOT_ORG as usize;
        env.flash[org..org + HEADER_BYTE_SIZE].copy_from_slice(header.as_bytes());
        let verifier = SlotVerifier::new(&env);
        assert_eq!(
            verifier.verify_slot(SLOT_ORG, SLOT_SIZE),
            Err(BulwarkError::IMAGE_VERIFY_SIZE_OUT_OF_RANGE)
        );
        assert!(!verifier.detect_image(SLOT_ORG, SLOT_SIZE).unwrap());
    }

    #[test]
    fn test_candidate_version_check() {
        let env = TestEnv::with_image(0x400, 3);
        let verifier = SlotVerifier::new(&env);
        let mut candidate = ImageHeader {
            magic: DwlSlot::SLOT_1.magic(),
            fw_version: 4,
            fw_size: 0x100,
            ..Default::default()
        };
        verifier.check_candidate_version(&candidate, SLOT_ORG).unwrap();

        candidate.fw_version = 3;
        assert_eq!(
            verifier.check_candidate_version(&candidate, SLOT_ORG),
            Err(BulwarkError::IMAGE_VERIFY_VERSION_TOO_OLD)
        );
    }

    #[test]
    fn test_verify_empty() {
        let env = TestEnv::empty();
        let verifier = SlotVerifier::new(&env);
        verifier.verify_empty(SLOT_ORG, SLOT_SIZE).unwrap();

        let env = TestEnv::with_image(0x400, 3);
        let verifier = SlotVerifier::new(&env);
        assert_eq!(
            verifier.verify_empty(SLOT_ORG, SLOT_SIZE),
            Err(BulwarkError::IMAGE_VERIFY_SLOT_NOT_EMPTY)
        );
    }
}
