/*++

Licensed under the Apache-2.0 license.

File Name:

    image.rs

Abstract:

    File contains the image builder and the stand-in authentication tags the
    model verifies against. Tags are FNV-1a-64 digests, which is enough for
    the tests to observe single-bit-flip rejection; real silicon substitutes
    a cryptographic MAC behind the same seam.

--*/

use bulwark_image_types::{DwlSlot, ImageHeader};
use zerocopy::AsBytes;

/// Bytes of the header covered by the header tag: every field up to and
/// including the image tag.
pub const HEADER_TAG_SPAN: usize = 52;

pub fn fnv64(data: &[u8]) -> u64 {
    let mut hash: u64 = 0xCBF2_9CE4_8422_2325;
    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    hash
}

/// Tag over the firmware body.
pub fn image_tag(body: &[u8]) -> [u8; 8] {
    fnv64(body).to_le_bytes()
}

/// Tag over the header prefix (with the image tag already in place).
pub fn header_tag(header_prefix: &[u8]) -> [u8; 8] {
    fnv64(header_prefix).to_le_bytes()
}

/// Build a complete slot image (header + body) targeting `dwl`.
pub fn build_image(dwl: DwlSlot, fw_version: u32, body: &[u8]) -> Vec<u8> {
    let mut header = ImageHeader {
        magic: dwl.magic(),
        fw_version,
        fw_size: body.len() as u32,
        ..Default::default()
    };
    header.image_tag[..8].copy_from_slice(&image_tag(body));

    let tag = header_tag(&header.as_bytes()[..HEADER_TAG_SPAN]);
    header.header_tag[..8].copy_from_slice(&tag);

    let mut image = header.as_bytes().to_vec();
    image.extend_from_slice(body);
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulwark_image_types::HEADER_BYTE_SIZE;
    use zerocopy::FromBytes;

    #[test]
    fn test_build_image_tags_line_up() {
        let body = vec![0x5Au8; 1024];
        let image = build_image(DwlSlot::SLOT_1, 7, &body);
        assert_eq!(image.len(), HEADER_BYTE_SIZE + body.len());

        let header = ImageHeader::read_from(&image[..HEADER_BYTE_SIZE]).unwrap();
        assert_eq!(header.fw_version, 7);
        assert_eq!(&header.image_tag[..8], &image_tag(&body));
        assert_eq!(
            &header.header_tag[..8],
            &header_tag(&image[..HEADER_TAG_SPAN])
        );
    }

    #[test]
    fn test_bit_flip_changes_tag() {
        let mut body = vec![0x5Au8; 1024];
        let tag = image_tag(&body);
        body[100] ^= 0x01;
        assert_ne!(tag, image_tag(&body));
    }
}
