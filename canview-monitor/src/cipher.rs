//! Frame cipher seam and the shipped blake3 implementation.
//!
//! The 16-byte block is encrypted under the frame IV and authenticated with a
//! MAC truncated to six bytes. Keys for both operations are derived from one
//! shared secret with distinct contexts.

/// Block cipher and MAC used to seal and open secure frames.
pub trait FrameCipher: Send + Sync {
    fn encrypt(&self, iv: &[u8; 16], block: &mut [u8; 16]);
    fn decrypt(&self, iv: &[u8; 16], block: &mut [u8; 16]);
    fn mac(&self, message: &[u8]) -> [u8; 6];
}

/// Keystream and MAC from keyed blake3.
#[derive(Clone)]
pub struct Blake3FrameCipher {
    stream_key: [u8; 32],
    mac_key: [u8; 32],
}

impl Blake3FrameCipher {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            stream_key: blake3::derive_key("canview 2024 frame keystream", secret),
            mac_key: blake3::derive_key("canview 2024 frame mac", secret),
        }
    }

    fn xor_keystream(&self, iv: &[u8; 16], block: &mut [u8; 16]) {
        let mut keystream = [0u8; 16];
        blake3::Hasher::new_keyed(&self.stream_key)
            .update(iv)
            .finalize_xof()
            .fill(&mut keystream);
        for (byte, key) in block.iter_mut().zip(keystream) {
            *byte ^= key;
        }
    }
}

impl std::fmt::Debug for Blake3FrameCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blake3FrameCipher").finish_non_exhaustive()
    }
}

impl FrameCipher for Blake3FrameCipher {
    fn encrypt(&self, iv: &[u8; 16], block: &mut [u8; 16]) {
        self.xor_keystream(iv, block);
    }

    fn decrypt(&self, iv: &[u8; 16], block: &mut [u8; 16]) {
        self.xor_keystream(iv, block);
    }

    fn mac(&self, message: &[u8]) -> [u8; 6] {
        let hash = blake3::keyed_hash(&self.mac_key, message);
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&hash.as_bytes()[..6]);
        mac
    }
}

/// Compares MACs without an early exit.
pub(crate) fn mac_matches(a: &[u8; 6], b: &[u8; 6]) -> bool {
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keystream_is_symmetric_and_iv_bound() {
        let cipher = Blake3FrameCipher::new(b"sixteenbytekey!!");
        let plain = *b"0123456789abcdef";

        let mut block = plain;
        cipher.encrypt(&[1; 16], &mut block);
        assert_ne!(block, plain);

        let mut other_iv = plain;
        cipher.encrypt(&[2; 16], &mut other_iv);
        assert_ne!(block, other_iv);

        cipher.decrypt(&[1; 16], &mut block);
        assert_eq!(block, plain);
    }

    #[test]
    fn mac_depends_on_key() {
        let a = Blake3FrameCipher::new(b"sixteenbytekey!!");
        let b = Blake3FrameCipher::new(b"another-key-16b!");
        assert_ne!(a.mac(b"frame"), b.mac(b"frame"));
        assert!(mac_matches(&a.mac(b"frame"), &a.mac(b"frame")));
    }
}
