//! EMV code fixtures with correct checksums.

use crate::crc::{crc16_ccitt_false, format_crc};

/// A well-formed static PIX code carrying every mandatory tag.
pub const STATIC_EMV: &str = "00020101021126400014br.gov.bcb.pix0118fulano@example.com5204000053039865802BR5913Fulano de Tal6008BRASILIA62070503***63044080";

/// The Banco Central do Brasil manual's sample static code (no tag 01).
pub const BCB_EMV: &str = "00020126580014br.gov.bcb.pix0136123e4567-e12b-12d1-a456-4266554400005204000053039865802BR5913Fulano de Tal6008BRASILIA62070503***63041D3D";

/// A well-formed dynamic PIX code whose merchant account information
/// carries the endpoint URL [`DYNAMIC_EMV_URL`] in sub-field 25.
pub const DYNAMIC_EMV: &str = "00020101021226520014br.gov.bcb.pix2530pix.example.com/qr/v2/9d36b84f5204000053039865802BR5913Fulano de Tal6008BRASILIA62070503***63046C88";

/// The endpoint URL embedded in [`DYNAMIC_EMV`].
pub const DYNAMIC_EMV_URL: &str = "pix.example.com/qr/v2/9d36b84f";

/// Seals a payload ending in `6304` with its computed CRC.
pub fn emv_with_crc(payload: &str) -> String {
    debug_assert!(payload.ends_with("6304"), "payload must end with the CRC tag");
    format!("{payload}{}", format_crc(crc16_ccitt_false(payload)))
}

/// Builds a well-formed dynamic PIX code pointing at `url`.
pub fn dynamic_emv(url: &str) -> String {
    assert!(url.len() <= 77, "fixture URL too long for one TLV field");
    let account = format!("0014br.gov.bcb.pix25{:02}{url}", url.len());
    let payload = format!(
        "00020101021226{:02}{account}{}",
        account.len(),
        "5204000053039865802BR5913Fulano de Tal6008BRASILIA62070503***6304"
    );
    emv_with_crc(&payload)
}
