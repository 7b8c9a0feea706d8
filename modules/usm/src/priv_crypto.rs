//! Privacy plugins (C9): DES-CBC (RFC 3414 §8.1) and AES-CFB128
//! (RFC 3826), loaded only when the `privacy` feature is enabled. With the
//! feature disabled, `protocol_for` fails fast with `PrivacyNotSupported`
//! rather than crashing at import.

use crate::credentials::PrivProtocolId;
use crate::error::UsmError;

/// A pluggable privacy (encryption) algorithm (C9).
pub trait PrivacyProtocol: Send + Sync {
    fn id(&self) -> PrivProtocolId;

    /// Encrypt `plaintext` (a serialized ScopedPDU), returning the
    /// ciphertext and the bytes to place in `msgPrivacyParameters`.
    /// `salt_counter` is the caller's monotonically increasing local
    /// counter, advanced by one call.
    fn encrypt(
        &self,
        localized_key: &[u8],
        engine_boots: u32,
        engine_time: u32,
        salt_counter: &mut u32,
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), UsmError>;

    fn decrypt(
        &self,
        localized_key: &[u8],
        engine_boots: u32,
        engine_time: u32,
        priv_params: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, UsmError>;
}

#[cfg(feature = "privacy")]
mod enabled {
    use super::*;
    use aes::Aes128;
    use cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
    use des::Des;

    type DesBlock = GenericArray<u8, <Des as cipher::BlockSizeUser>::BlockSize>;
    type AesBlock = GenericArray<u8, <Aes128 as cipher::BlockSizeUser>::BlockSize>;

    pub struct DesCbc;

    impl PrivacyProtocol for DesCbc {
        fn id(&self) -> PrivProtocolId {
            PrivProtocolId::DesCbc
        }

        fn encrypt(
            &self,
            localized_key: &[u8],
            local_boots: u32,
            _engine_time: u32,
            salt_counter: &mut u32,
            plaintext: &[u8],
        ) -> Result<(Vec<u8>, Vec<u8>), UsmError> {
            if localized_key.len() < 16 {
                return Err(UsmError::UnsupportedSecLevel);
            }
            let des_key = &localized_key[..8];
            let pre_iv = &localized_key[8..16];
            *salt_counter = salt_counter.wrapping_add(1);
            let mut salt = Vec::with_capacity(8);
            salt.extend_from_slice(&local_boots.to_be_bytes());
            salt.extend_from_slice(&salt_counter.to_be_bytes());
            let mut iv = [0u8; 8];
            for i in 0..8 {
                iv[i] = pre_iv[i] ^ salt[i];
            }

            let mut padded = plaintext.to_vec();
            let pad = (8 - padded.len() % 8) % 8;
            padded.extend(std::iter::repeat(0u8).take(pad));

            let cipher = Des::new_from_slice(des_key).map_err(|_| UsmError::DecryptionError)?;
            let mut prev = iv;
            let mut out = Vec::with_capacity(padded.len());
            for chunk in padded.chunks(8) {
                let mut block = [0u8; 8];
                for i in 0..8 {
                    block[i] = chunk[i] ^ prev[i];
                }
                let mut garr: DesBlock = GenericArray::clone_from_slice(&block);
                cipher.encrypt_block(&mut garr);
                out.extend_from_slice(&garr);
                prev.copy_from_slice(&garr);
            }
            Ok((out, salt))
        }

        fn decrypt(
            &self,
            localized_key: &[u8],
            _engine_boots: u32,
            _engine_time: u32,
            priv_params: &[u8],
            ciphertext: &[u8],
        ) -> Result<Vec<u8>, UsmError> {
            if localized_key.len() < 16 || priv_params.len() != 8 {
                return Err(UsmError::DecryptionError);
            }
            if ciphertext.is_empty() || ciphertext.len() % 8 != 0 {
                return Err(UsmError::DecryptionError);
            }
            let des_key = &localized_key[..8];
            let pre_iv = &localized_key[8..16];
            let mut iv = [0u8; 8];
            for i in 0..8 {
                iv[i] = pre_iv[i] ^ priv_params[i];
            }
            let cipher = Des::new_from_slice(des_key).map_err(|_| UsmError::DecryptionError)?;
            let mut prev = iv;
            let mut out = Vec::with_capacity(ciphertext.len());
            for chunk in ciphertext.chunks(8) {
                let ct: DesBlock = GenericArray::clone_from_slice(chunk);
                let mut garr = ct;
                cipher.decrypt_block(&mut garr);
                for i in 0..8 {
                    garr[i] ^= prev[i];
                }
                out.extend_from_slice(&garr);
                prev.copy_from_slice(&ct);
            }
            Ok(out)
        }
    }

    pub struct AesCfb128;

    impl PrivacyProtocol for AesCfb128 {
        fn id(&self) -> PrivProtocolId {
            PrivProtocolId::AesCfb128
        }

        fn encrypt(
            &self,
            localized_key: &[u8],
            engine_boots: u32,
            engine_time: u32,
            salt_counter: &mut u32,
            plaintext: &[u8],
        ) -> Result<(Vec<u8>, Vec<u8>), UsmError> {
            if localized_key.len() < 16 {
                return Err(UsmError::UnsupportedSecLevel);
            }
            let key = &localized_key[..16];
            *salt_counter = salt_counter.wrapping_add(1);
            let mut salt = Vec::with_capacity(8);
            salt.extend_from_slice(&engine_boots.to_be_bytes());
            salt.extend_from_slice(&salt_counter.to_be_bytes());
            let iv = build_iv(engine_boots, engine_time, &salt);
            let cipher = Aes128::new_from_slice(key).map_err(|_| UsmError::DecryptionError)?;
            Ok((cfb128_xor(&cipher, iv, plaintext), salt))
        }

        fn decrypt(
            &self,
            localized_key: &[u8],
            engine_boots: u32,
            engine_time: u32,
            priv_params: &[u8],
            ciphertext: &[u8],
        ) -> Result<Vec<u8>, UsmError> {
            if localized_key.len() < 16 || priv_params.len() != 8 {
                return Err(UsmError::DecryptionError);
            }
            let key = &localized_key[..16];
            let iv = build_iv(engine_boots, engine_time, priv_params);
            let cipher = Aes128::new_from_slice(key).map_err(|_| UsmError::DecryptionError)?;
            // CFB is a stream cipher over the block cipher's keystream, so
            // encrypt/decrypt are the same XOR operation; only the feedback
            // source differs (ciphertext either way).
            Ok(cfb128_xor(&cipher, iv, ciphertext))
        }
    }

    fn build_iv(engine_boots: u32, engine_time: u32, salt: &[u8]) -> [u8; 16] {
        let mut iv = [0u8; 16];
        iv[0..4].copy_from_slice(&engine_boots.to_be_bytes());
        iv[4..8].copy_from_slice(&engine_time.to_be_bytes());
        iv[8..16].copy_from_slice(salt);
        iv
    }

    fn cfb128_xor(cipher: &Aes128, iv: [u8; 16], data: &[u8]) -> Vec<u8> {
        let mut feedback = iv;
        let mut out = Vec::with_capacity(data.len());
        for chunk in data.chunks(16) {
            let mut garr: AesBlock = GenericArray::clone_from_slice(&feedback);
            cipher.encrypt_block(&mut garr);
            let mut block_out = vec![0u8; chunk.len()];
            for i in 0..chunk.len() {
                block_out[i] = chunk[i] ^ garr[i];
            }
            if chunk.len() == 16 {
                feedback.copy_from_slice(chunk);
            }
            out.extend_from_slice(&block_out);
        }
        out
    }
}

#[cfg(feature = "privacy")]
pub use enabled::{AesCfb128, DesCbc};

pub fn protocol_for(id: PrivProtocolId) -> Result<Box<dyn PrivacyProtocol>, UsmError> {
    #[cfg(feature = "privacy")]
    {
        Ok(match id {
            PrivProtocolId::DesCbc => Box::new(DesCbc),
            PrivProtocolId::AesCfb128 => Box::new(AesCfb128),
        })
    }
    #[cfg(not(feature = "privacy"))]
    {
        Err(UsmError::PrivacyNotSupported(id))
    }
}

#[cfg(all(test, feature = "privacy"))]
mod tests {
    use super::enabled::*;
    use super::*;

    #[test]
    fn des_cbc_roundtrip() {
        let key = vec![1u8; 20];
        let mut counter = 0u32;
        let plaintext = b"a scoped pdu payload, not block aligned";
        let (ct, params) = DesCbc.encrypt(&key, 1, 0, &mut counter, plaintext).unwrap();
        let pt = DesCbc.decrypt(&key, 1, 0, &params, &ct).unwrap();
        assert_eq!(&pt[..plaintext.len()], plaintext);
    }

    #[test]
    fn aes_cfb128_roundtrip() {
        let key = vec![7u8; 20];
        let mut counter = 0u32;
        let plaintext = b"another scoped pdu payload of arbitrary length!";
        let (ct, params) = AesCfb128.encrypt(&key, 4, 1000, &mut counter, plaintext).unwrap();
        let pt = AesCfb128.decrypt(&key, 4, 1000, &params, &ct).unwrap();
        assert_eq!(pt, plaintext);
    }
}
