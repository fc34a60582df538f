use chrono::Utc;
use image::GenericImageView;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::upload::{decode_data_url, UploadError};

/// Channel value at or above which a pixel still counts as paper.
pub const INK_THRESHOLD: u8 = 250;

pub const CONSENT_TERMS: [&str; 8] = [
    "Tattooing engraves a design directly into the skin with needles and creates a wound. Even when the technique is sound, individual constitutions may react with discomfort. Distortion of the design caused by the client moving in pain is the client's own responsibility.",
    "The studio uses single-use needles and sterilises all equipment touching the skin. Inks, pigments and aftercare products may still cause allergic reactions depending on the individual.",
    "The look of a healed tattoo depends heavily on aftercare. Careless aftercare can thicken scabs, slow healing and cause ink or colour to fall out, so the client must look after the tattoo carefully.",
    "Alcohol, drugs, lack of sleep or leaving the wound exposed can cause infection, spotting or other symptoms, and must be avoided after the session.",
    "Pregnant clients and clients with skin conditions, infectious diseases, heart disease, liver disease, diabetes or similar conditions may not be tattooed.",
    "Clients under 18 must be accompanied by a legal guardian who signs this form. The signer agrees to present identification on request as proof of this undertaking.",
    "Copyright of sketches, drawings and finished work belongs to the studio, which may keep, photograph and publish them online and in the studio.",
    "Having understood all of the above, the signer commissions the studio of their own free will and agrees not to hold the studio or its artists legally liable for any of the listed symptoms.",
];

pub const CONSENT_NOTICES: [&str; 3] = [
    "Complex designs may be completed over several sessions with separate payments; discuss this with your artist.",
    "Deposits already paid are non-refundable.",
    "One free touch-up is included within three months of the session; later touch-ups are charged.",
];

#[derive(Debug, Error)]
pub enum ConsentError {
    #[error("Signer name is required")]
    MissingName,

    #[error("Signer phone number is required")]
    MissingPhone,

    #[error("The consent terms must be accepted")]
    TermsNotAccepted,

    #[error("A signature is required")]
    MissingSignature,

    #[error("The signature is blank")]
    BlankSignature,

    #[error("Signature image could not be read: {0}")]
    UnreadableSignature(#[from] UploadError),

    #[error("This consent form has already been signed")]
    AlreadySigned,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentSubmission {
    pub id: String,
    #[serde(default)]
    pub signer_name: String,
    #[serde(default)]
    pub signer_phone: String,
    #[serde(default)]
    pub agreed_terms: bool,
    #[serde(default)]
    pub signature_data: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignedConsent {
    pub signer_name: String,
    pub signer_phone: String,
    pub signature_data: String,
    pub signed_at: String,
}

impl ConsentSubmission {
    /// Checks name, phone, agreement and signature in that order.
    pub fn validate(&self) -> Result<SignedConsent, ConsentError> {
        let signer_name = self.signer_name.trim();
        if signer_name.is_empty() {
            return Err(ConsentError::MissingName);
        }
        let signer_phone = self.signer_phone.trim();
        if signer_phone.is_empty() {
            return Err(ConsentError::MissingPhone);
        }
        if !self.agreed_terms {
            return Err(ConsentError::TermsNotAccepted);
        }
        let signature = self.signature_data.trim();
        if signature.is_empty() {
            return Err(ConsentError::MissingSignature);
        }
        if !signature_has_ink(signature)? {
            return Err(ConsentError::BlankSignature);
        }

        Ok(SignedConsent {
            signer_name: signer_name.to_string(),
            signer_phone: signer_phone.to_string(),
            signature_data: signature.to_string(),
            signed_at: signed_timestamp(),
        })
    }
}

/// True when any visible pixel is darker than paper white.
pub fn signature_has_ink(data_url: &str) -> Result<bool, ConsentError> {
    let (_, bytes) = decode_data_url(data_url)?;
    let image = image::load_from_memory(&bytes).map_err(UploadError::Decode)?;
    Ok(image.pixels().any(|(_, _, pixel)| {
        let [r, g, b, a] = pixel.0;
        a > 0 && (r < INK_THRESHOLD || g < INK_THRESHOLD || b < INK_THRESHOLD)
    }))
}

pub fn signed_timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::upload::encode_data_url;
    use image::{ImageFormat, Rgba, RgbaImage};
    use rstest::rstest;
    use std::io::Cursor;

    pub(crate) fn signature(ink: bool) -> String {
        let mut canvas = RgbaImage::from_pixel(60, 20, Rgba([255, 255, 255, 255]));
        canvas.put_pixel(5, 5, Rgba([252, 251, 255, 255]));
        if ink {
            for x in 10..40 {
                canvas.put_pixel(x, 10, Rgba([0, 0, 0, 255]));
            }
        }
        let mut bytes = Vec::new();
        canvas
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        encode_data_url("image/png", &bytes)
    }

    fn submission() -> ConsentSubmission {
        ConsentSubmission {
            id: "p1".into(),
            signer_name: " Alice Chen ".into(),
            signer_phone: "0912345678".into(),
            agreed_terms: true,
            signature_data: signature(true),
        }
    }

    #[test]
    fn complete_submission_is_accepted() {
        let signed = submission().validate().unwrap();
        assert_eq!(signed.signer_name, "Alice Chen");
        assert_eq!(signed.signed_at.len(), "2026-10-18 12:00:00".len());
    }

    #[rstest]
    #[case::name(|s: &mut ConsentSubmission| s.signer_name = "  ".into(), "Signer name is required")]
    #[case::phone(|s: &mut ConsentSubmission| s.signer_phone.clear(), "Signer phone number is required")]
    #[case::terms(|s: &mut ConsentSubmission| s.agreed_terms = false, "The consent terms must be accepted")]
    #[case::signature(|s: &mut ConsentSubmission| s.signature_data.clear(), "A signature is required")]
    fn each_missing_piece_is_rejected(
        #[case] breaker: fn(&mut ConsentSubmission),
        #[case] message: &str,
    ) {
        let mut broken = submission();
        breaker(&mut broken);
        assert_eq!(broken.validate().unwrap_err().to_string(), message);
    }

    #[test]
    fn blank_canvas_has_no_ink() {
        assert!(!signature_has_ink(&signature(false)).unwrap());
        assert!(signature_has_ink(&signature(true)).unwrap());

        let mut blank = submission();
        blank.signature_data = signature(false);
        assert!(matches!(blank.validate(), Err(ConsentError::BlankSignature)));
    }

    #[test]
    fn transparent_pixels_are_not_ink() {
        let canvas = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0]));
        let mut bytes = Vec::new();
        canvas
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        assert!(!signature_has_ink(&encode_data_url("image/png", &bytes)).unwrap());
    }

    #[test]
    fn unreadable_signature_is_reported() {
        assert!(matches!(
            signature_has_ink("data:image/png;base64,AAAA"),
            Err(ConsentError::UnreadableSignature(_))
        ));
    }
}
