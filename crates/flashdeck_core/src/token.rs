//! crates/flashdeck_core/src/token.rs
//!
//! Opaque, tamper-evident card references for use in URLs.
//!
//! A token is the URL-safe base64 of the card id XOR-ed with a keyed mask,
//! followed by an HMAC-SHA256 tag over those masked bytes. Without the secret
//! key the id can neither be read nor forged.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::domain::CardId;
use crate::ports::{PortError, PortResult};

type HmacSha256 = Hmac<Sha256>;

/// Reserved token meaning "no explicit card, pick the next one".
pub const NEXT_TOKEN: &str = "next";

const ID_LEN: usize = 8;
const TAG_LEN: usize = 32;
const MASK_CONTEXT: &[u8] = b"flashdeck/card-id-mask";
const TAG_CONTEXT: &[u8] = b"flashdeck/card-id";

#[derive(Clone)]
pub struct TokenCodec {
    mac: HmacSha256,
    mask: [u8; ID_LEN],
}

impl TokenCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> PortResult<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(PortError::InvalidInput("The token secret must not be empty".to_string()));
        }
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| PortError::InvalidInput(format!("Unusable token secret: {}", e)))?;

        let mut mask_mac = mac.clone();
        mask_mac.update(MASK_CONTEXT);
        let digest = mask_mac.finalize().into_bytes();
        let mut mask = [0u8; ID_LEN];
        mask.copy_from_slice(&digest[..ID_LEN]);

        Ok(Self { mac, mask })
    }

    pub fn encode(&self, card_id: CardId) -> String {
        let masked = self.apply_mask(card_id.to_be_bytes());
        let tag = self.tag(&masked);

        let mut raw = Vec::with_capacity(ID_LEN + TAG_LEN);
        raw.extend_from_slice(&masked);
        raw.extend_from_slice(&tag);
        URL_SAFE_NO_PAD.encode(raw)
    }

    /// Returns `None` for the `next` sentinel, malformed input, or a bad signature.
    pub fn decode(&self, token: &str) -> Option<CardId> {
        if token == NEXT_TOKEN {
            return None;
        }
        let raw = URL_SAFE_NO_PAD.decode(token).ok()?;
        if raw.len() != ID_LEN + TAG_LEN {
            return None;
        }
        let (masked, tag) = raw.split_at(ID_LEN);

        let mut mac = self.mac.clone();
        mac.update(TAG_CONTEXT);
        mac.update(masked);
        mac.verify_slice(tag).ok()?;

        let masked: [u8; ID_LEN] = masked.try_into().ok()?;
        Some(CardId::from_be_bytes(self.apply_mask(masked)))
    }

    fn apply_mask(&self, mut bytes: [u8; ID_LEN]) -> [u8; ID_LEN] {
        for (b, m) in bytes.iter_mut().zip(self.mask.iter()) {
            *b ^= m;
        }
        bytes
    }

    fn tag(&self, masked: &[u8]) -> [u8; TAG_LEN] {
        let mut mac = self.mac.clone();
        mac.update(TAG_CONTEXT);
        mac.update(masked);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&mac.finalize().into_bytes());
        tag
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}
