use super::AudiusWallet;
use ethers::types::Address;
use serde::{Deserialize, Serialize};

use std::{env, path::PathBuf};

/// Reference to an encrypted keystore. The password itself is never stored, only the name of the
/// environment variable that holds it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EcdsaKeyfile {
    pub path: PathBuf,
    pub address: Address,
    pub pw_env_var: String,
}

#[derive(Debug, thiserror::Error)]
pub enum KeyfileError {
    #[error("Could not decrypt keyfile: {0}")]
    KeyfileDecryptionError(String),
    #[error(transparent)]
    DialoguerError(#[from] dialoguer::Error),
    #[error("Decrypted keyfile {path} holds {found:?}, expected {expected:?}")]
    AddressMismatch { path: String, expected: Address, found: Address },
}

impl EcdsaKeyfile {
    pub fn new(path: PathBuf, address: Address, pw_env_var: &str) -> Self {
        EcdsaKeyfile { path, address, pw_env_var: pw_env_var.to_owned() }
    }

    /// Decrypts the keystore once to learn its address, then returns the reference. An address
    /// recorded in the keystore must match the decrypted key.
    pub fn import(path: PathBuf, pw_env_var: &str) -> Result<Self, KeyfileError> {
        let recorded = AudiusWallet::keystore_address(&path)
            .map_err(|_| KeyfileError::KeyfileDecryptionError(path.display().to_string()))?;
        let keyfile =
            EcdsaKeyfile::new(path, recorded.unwrap_or_else(Address::zero), pw_env_var);
        let wallet = keyfile.decrypt(&keyfile.password()?)?;
        Ok(EcdsaKeyfile { address: wallet.address(), ..keyfile })
    }

    pub fn decrypt(&self, password: &str) -> Result<AudiusWallet, KeyfileError> {
        let wallet = AudiusWallet::from_keystore(&self.path, password)
            .map_err(|_| KeyfileError::KeyfileDecryptionError(self.path.display().to_string()))?;
        if !self.address.is_zero() && wallet.address() != self.address {
            return Err(KeyfileError::AddressMismatch {
                path: self.path.display().to_string(),
                expected: self.address,
                found: wallet.address(),
            });
        }
        Ok(wallet)
    }

    /// Decrypts with the password from the environment, falling back to `.env` and finally to an
    /// interactive prompt.
    pub fn decrypt_env(&self) -> Result<AudiusWallet, KeyfileError> {
        self.decrypt(&self.password()?)
    }

    fn password(&self) -> Result<String, KeyfileError> {
        if let Ok(pw) = env::var(&self.pw_env_var) {
            return Ok(pw);
        }
        if let Ok(pw) = dotenvy::var(&self.pw_env_var) {
            return Ok(pw);
        }
        let pw = dialoguer::Password::new()
            .with_prompt(format!(
                "{} is not set, enter the password for {}",
                self.pw_env_var,
                self.path.display()
            ))
            .interact()?;
        Ok(pw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    #[serial]
    fn test_import_and_decrypt_from_env() {
        let dir = tempdir().unwrap();
        let wallet = AudiusWallet::new();
        let path = wallet.encrypt_and_store(dir.path(), "sp-owner", "hunter2").unwrap();

        env::set_var("AUDIUS_TEST_KEYFILE_PW", "hunter2");
        let keyfile = EcdsaKeyfile::import(path, "AUDIUS_TEST_KEYFILE_PW").unwrap();
        assert_eq!(keyfile.address, wallet.address());

        let decrypted = keyfile.decrypt_env().unwrap();
        assert_eq!(decrypted.address(), wallet.address());
        env::remove_var("AUDIUS_TEST_KEYFILE_PW");
    }

    #[test]
    fn test_address_mismatch() {
        let dir = tempdir().unwrap();
        let wallet = AudiusWallet::new();
        let path = wallet.encrypt_and_store(dir.path(), "sp-owner", "hunter2").unwrap();

        let other = AudiusWallet::new().address();
        let keyfile = EcdsaKeyfile::new(path, other, "UNUSED");
        assert!(matches!(keyfile.decrypt("hunter2"), Err(KeyfileError::AddressMismatch { .. })));
    }
}
