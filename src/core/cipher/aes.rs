//! AES-256-CBC blob encoding.

use aes::Aes256;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::trace;
use zeroize::Zeroizing;

use super::DerivedKey;
use crate::core::constants::IV_LEN;
use crate::error::{CipherError, Result};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Encrypt `plaintext` under `key`.
///
/// Returns base64 text of `IV || ciphertext`. A new random IV is drawn on
/// every call, so equal inputs never produce equal blobs.
///
/// # Errors
///
/// Returns `CipherError::EncryptionFailed` if the cipher cannot be set up.
pub fn encrypt(plaintext: &[u8], key: &DerivedKey) -> Result<String> {
    trace!(plaintext_len = plaintext.len(), "encrypting");

    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let encryptor = Aes256CbcEnc::new_from_slices(key.as_bytes(), &iv)
        .map_err(|e| CipherError::EncryptionFailed(format!("aes init: {}", e)))?;
    let ciphertext = encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut blob = Vec::with_capacity(IV_LEN + ciphertext.len());
    blob.extend_from_slice(&iv);
    blob.extend_from_slice(&ciphertext);

    trace!(ciphertext_len = ciphertext.len(), "encrypted");
    Ok(STANDARD.encode(blob))
}

/// Decrypt a blob produced by [`encrypt`].
///
/// # Errors
///
/// Returns `CipherError::DecryptionFailed` for malformed base64, truncated
/// blobs, and wrong keys alike.
pub fn decrypt(blob: &str, key: &DerivedKey) -> Result<Zeroizing<Vec<u8>>> {
    let data = STANDARD
        .decode(blob.trim())
        .map_err(|e| CipherError::DecryptionFailed(format!("invalid base64: {}", e)))?;

    if data.len() < IV_LEN * 2 || data.len() % IV_LEN != 0 {
        return Err(CipherError::DecryptionFailed(format!(
            "truncated ciphertext ({} bytes)",
            data.len()
        ))
        .into());
    }

    let (iv, ciphertext) = data.split_at(IV_LEN);
    trace!(ciphertext_len = ciphertext.len(), "decrypting");

    let decryptor = Aes256CbcDec::new_from_slices(key.as_bytes(), iv)
        .map_err(|e| CipherError::DecryptionFailed(format!("aes init: {}", e)))?;
    let plaintext = decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CipherError::DecryptionFailed("bad padding (wrong key?)".to_string()))?;

    Ok(Zeroizing::new(plaintext))
}

/// Decrypt a blob whose plaintext must be UTF-8 text.
///
/// # Errors
///
/// Returns `CipherError::DecryptionFailed` on any decryption failure or if
/// the plaintext is not valid UTF-8.
pub fn decrypt_string(blob: &str, key: &DerivedKey) -> Result<String> {
    let bytes = decrypt(blob, key)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| CipherError::DecryptionFailed(format!("UTF-8 error: {}", e)).into())
}
