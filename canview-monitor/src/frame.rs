//! ## canview-monitor::frame
//! **Secure frame layout**
//!
//! ```text
//! | IV (16) | frame id (2, BE) | ciphertext (16) | MAC (6) |
//! ```
//!
//! The ciphertext holds `counter (2, BE) || data` padded to one block with
//! the pad length repeated in every pad byte.

use crate::cipher::{mac_matches, FrameCipher};
use crate::error::{DecodeError, MonitorError};

pub const FRAME_LEN: usize = 40;
const BLOCK: usize = 16;
/// Largest payload that fits next to the counter and at least one pad byte.
pub const MAX_PAYLOAD: usize = BLOCK - 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureFrame {
    pub iv: [u8; 16],
    pub frame_id: u16,
    pub ciphertext: [u8; 16],
    pub mac: [u8; 6],
}

/// A frame that passed authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub frame_id: u16,
    pub counter: u16,
    pub data: Vec<u8>,
}

impl DecodedFrame {
    /// Identifier as the monitor reports it, e.g. `0x12c`.
    pub fn can_id(&self) -> String {
        format_can_id(self.frame_id)
    }

    pub fn data_hex(&self) -> String {
        hex::encode(&self.data)
    }
}

pub fn format_can_id(frame_id: u16) -> String {
    format!("{frame_id:#x}")
}

/// Parses `0x12c` or `12c` into a frame id.
pub fn parse_can_id(text: &str) -> Result<u16, MonitorError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u16::from_str_radix(digits, 16).map_err(|_| MonitorError::CanId(text.to_string()))
}

impl SecureFrame {
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != FRAME_LEN {
            return Err(DecodeError::Length(bytes.len()));
        }
        let mut frame = Self {
            iv: [0; 16],
            frame_id: u16::from_be_bytes([bytes[16], bytes[17]]),
            ciphertext: [0; 16],
            mac: [0; 6],
        };
        frame.iv.copy_from_slice(&bytes[..16]);
        frame.ciphertext.copy_from_slice(&bytes[18..34]);
        frame.mac.copy_from_slice(&bytes[34..]);
        Ok(frame)
    }

    pub fn to_bytes(&self) -> [u8; FRAME_LEN] {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[..16].copy_from_slice(&self.iv);
        bytes[16..18].copy_from_slice(&self.frame_id.to_be_bytes());
        bytes[18..34].copy_from_slice(&self.ciphertext);
        bytes[34..].copy_from_slice(&self.mac);
        bytes
    }

    fn authenticated(iv: &[u8; 16], frame_id: u16, ciphertext: &[u8; 16]) -> [u8; 34] {
        let mut message = [0u8; 34];
        message[..16].copy_from_slice(iv);
        message[16..18].copy_from_slice(&frame_id.to_be_bytes());
        message[18..].copy_from_slice(ciphertext);
        message
    }

    pub fn seal(
        cipher: &dyn FrameCipher,
        iv: [u8; 16],
        frame_id: u16,
        counter: u16,
        data: &[u8],
    ) -> Result<Self, MonitorError> {
        if data.len() > MAX_PAYLOAD {
            return Err(MonitorError::PayloadTooLong(data.len()));
        }
        let used = 2 + data.len();
        let pad = (BLOCK - used) as u8;

        let mut block = [pad; BLOCK];
        block[..2].copy_from_slice(&counter.to_be_bytes());
        block[2..used].copy_from_slice(data);
        cipher.encrypt(&iv, &mut block);

        let mac = cipher.mac(&Self::authenticated(&iv, frame_id, &block));
        Ok(Self {
            iv,
            frame_id,
            ciphertext: block,
            mac,
        })
    }

    /// Verifies the MAC, decrypts and strips padding.
    pub fn open(&self, cipher: &dyn FrameCipher) -> Result<DecodedFrame, DecodeError> {
        let expected = cipher.mac(&Self::authenticated(&self.iv, self.frame_id, &self.ciphertext));
        if !mac_matches(&expected, &self.mac) {
            return Err(DecodeError::Authentication);
        }

        let mut block = self.ciphertext;
        cipher.decrypt(&self.iv, &mut block);

        let pad = block[BLOCK - 1];
        if !(1..=16).contains(&pad) {
            return Err(DecodeError::Padding(pad));
        }
        let plain = &block[..BLOCK - pad as usize];
        if plain.len() < 2 {
            return Err(DecodeError::MissingCounter);
        }

        Ok(DecodedFrame {
            frame_id: self.frame_id,
            counter: u16::from_be_bytes([plain[0], plain[1]]),
            data: plain[2..].to_vec(),
        })
    }
}
