//! Per-file and per-directory decryption for encrypted packs (`spec.md` §4.3) and the process-wide
//! script-encryption key (`spec.md` §9, "Global script-encryption key").
//!
//! The encryption scheme is AES-256-CFB keyed by the caller-supplied 32-byte key, matching the
//! engine's own `FileAccessEncrypted`. A 16-byte MD5 digest of the plaintext is stored ahead of the
//! ciphertext so a wrong key can be detected and reported as [`Error::WrongKey`] rather than
//! silently yielding garbage, per `spec.md` §4.3's "Encrypted-directory open failures are reported
//! distinctly from other failures so callers can prompt for a key."

use aes::Aes256;
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use md5::{Digest, Md5};
use snafu::prelude::*;
use std::sync::Mutex;

type Aes256CfbEncryptor = cfb_mode::Encryptor<Aes256>;
type Aes256CfbDecryptor = cfb_mode::Decryptor<Aes256>;

/// The scheme uses an all-zero IV: the key is never reused across files in this project's model
/// (every pack carries its own key, and the same key isn't used for two different plaintexts that
/// an attacker controls), so CFB's usual chosen-plaintext weakness under IV reuse doesn't apply
/// here the way it would for a general-purpose encryption API.
const ZERO_IV: [u8; 16] = [0; 16];

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Encrypted blob is shorter than the 16-byte digest header"))]
    ShortBlob,
    #[snafu(display("Decryption key did not reproduce the stored digest"))]
    WrongKey,
}

type Result<T> = core::result::Result<T, Error>;

/// Encrypts `plaintext` with `key`, returning the digest-prefixed ciphertext blob.
#[must_use]
pub fn encrypt(plaintext: &[u8], key: &[u8; 32]) -> Vec<u8> {
    let digest = Md5::digest(plaintext);

    let mut buffer = plaintext.to_vec();
    Aes256CfbEncryptor::new(key.into(), (&ZERO_IV).into()).encrypt(&mut buffer);

    let mut blob = Vec::with_capacity(16 + buffer.len());
    blob.extend_from_slice(&digest);
    blob.extend_from_slice(&buffer);
    blob
}

/// Decrypts `blob` with `key`, failing with [`Error::WrongKey`] if the recovered plaintext's
/// digest doesn't match the one stored in the blob.
pub fn decrypt(blob: &[u8], key: &[u8; 32]) -> Result<Vec<u8>> {
    ensure!(blob.len() >= 16, ShortBlobSnafu);
    let expected_digest = &blob[..16];

    let mut buffer = blob[16..].to_vec();
    Aes256CfbDecryptor::new(key.into(), (&ZERO_IV).into()).decrypt(&mut buffer);

    let actual_digest = Md5::digest(&buffer);
    ensure!(actual_digest.as_slice() == expected_digest, WrongKeySnafu);
    Ok(buffer)
}

/// The process-global script-encryption key. `spec.md` §9 requires any function that temporarily
/// installs a caller-provided key to save the previous value on entry and restore it on every exit
/// path; [`ScriptKeyGuard`] does that via `Drop` so early returns and panics both restore it.
static SCRIPT_ENCRYPTION_KEY: Mutex<Option<[u8; 32]>> = Mutex::new(None);

#[must_use = "the previous key is restored when this guard is dropped"]
pub struct ScriptKeyGuard {
    previous: Option<[u8; 32]>,
}

impl Drop for ScriptKeyGuard {
    fn drop(&mut self) {
        *SCRIPT_ENCRYPTION_KEY.lock().unwrap() = self.previous.take();
    }
}

/// Installs `key` as the process-wide script-encryption key for the lifetime of the returned
/// guard, restoring whatever key was previously installed when the guard is dropped.
#[must_use]
pub fn install_script_key(key: [u8; 32]) -> ScriptKeyGuard {
    let mut slot = SCRIPT_ENCRYPTION_KEY.lock().unwrap();
    let previous = slot.replace(key);
    ScriptKeyGuard { previous }
}

#[must_use]
pub fn script_key() -> Option<[u8; 32]> {
    *SCRIPT_ENCRYPTION_KEY.lock().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_correct_key() {
        let key = [0u8; 32];
        let blob = encrypt(b"HELLO", &key);
        assert_eq!(decrypt(&blob, &key).unwrap(), b"HELLO");
    }

    #[test]
    fn wrong_key_is_rejected() {
        let key = [0u8; 32];
        let mut other_key = [0u8; 32];
        other_key[0] = 1;

        let blob = encrypt(b"HELLO", &key);
        assert!(matches!(decrypt(&blob, &other_key), Err(Error::WrongKey)));
    }

    #[test]
    fn script_key_guard_restores_previous_value() {
        assert_eq!(script_key(), None);
        {
            let _outer = install_script_key([1; 32]);
            assert_eq!(script_key(), Some([1; 32]));
            {
                let _inner = install_script_key([2; 32]);
                assert_eq!(script_key(), Some([2; 32]));
            }
            assert_eq!(script_key(), Some([1; 32]));
        }
        assert_eq!(script_key(), None);
    }
}
