//! Forging keypair management.
//!
//! Delegate forging secrets live encrypted in the node configuration.
//! At startup [`load_delegates`] decrypts each configured entry with the
//! node's default passphrase, derives the ed25519 keypair from the
//! plaintext secret and matches it against the on-chain delegate
//! account. The resulting keypair map is everything the forger may sign
//! with for the lifetime of the process.
//!
//! Secrets are sealed with ChaCha20-Poly1305 under a key stretched from
//! the passphrase with Argon2id; the entry carries the salt, nonce and
//! detached authentication tag in hex. Decrypted secrets and derived
//! keys are zeroized once the keypair is built.

use std::collections::HashMap;
use std::fmt;

use argon2::{Algorithm, Argon2, Params, ParamsBuilder, Version};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use ed25519_dalek::{Keypair, PublicKey as VerifyKey, SecretKey};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::consensus::context::Accounts;
use crate::types::PublicKey;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Encryption scheme version carried by every entry. Unknown versions
/// are treated as undecryptable.
const SCHEME_VERSION: u32 = 1;

/// Forging section of the node configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ForgingConfig {
    /// Whether to load forging keypairs at all. When `false` the node
    /// never forges, regardless of configured secrets.
    pub force: bool,
    /// Encrypted forging secrets, one per delegate.
    pub secret: Option<Vec<EncryptedEntry>>,
    /// Passphrase used to decrypt every entry.
    pub default_passphrase: String,
}

/// One encrypted forging secret, as provisioned by the operator.
///
/// All binary fields are lowercase hex.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncryptedEntry {
    /// Expected ed25519 public key of the decrypted secret.
    pub public_key: String,
    /// ChaCha20-Poly1305 ciphertext of the secret (tag detached).
    pub encrypted_secret: String,
    /// 12-byte AEAD nonce.
    pub iv: String,
    /// 16-byte Argon2id salt.
    pub salt: String,
    /// 16-byte Poly1305 authentication tag.
    pub tag: String,
    /// Encryption scheme version.
    pub version: u32,
}

/// Errors raised while loading or provisioning forging keypairs.
#[derive(Clone, Debug)]
pub enum ForgingError {
    /// The entry could not be decrypted: malformed fields, unknown
    /// scheme version, wrong passphrase or a forged tag.
    InvalidEncryptedSecret { public_key: String },
    /// The decrypted secret derives a different public key than the
    /// entry claims.
    PublicKeyMismatch,
    /// No account exists for the entry's public key.
    AccountNotFound { public_key: String },
    /// The accounts collaborator failed.
    Accounts(String),
    /// Provisioning (encryption) failed.
    Encrypt(String),
}

impl fmt::Display for ForgingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForgingError::InvalidEncryptedSecret { public_key } => {
                write!(f, "Invalid encryptedSecret for publicKey: {public_key}")
            }
            ForgingError::PublicKeyMismatch => f.write_str("Public keys do not match"),
            ForgingError::AccountNotFound { public_key } => {
                write!(f, "Account with public key: {public_key} not found")
            }
            ForgingError::Accounts(msg) => f.write_str(msg),
            ForgingError::Encrypt(msg) => write!(f, "Failed to encrypt secret: {msg}"),
        }
    }
}

impl std::error::Error for ForgingError {}

/// Decrypts the configured forging secrets and returns the keypairs of
/// all entries that map to delegate accounts, keyed by hex public key.
///
/// The first failing entry aborts the whole load. Entries whose account
/// exists but is not a delegate are skipped silently.
pub fn load_delegates(
    config: &ForgingConfig,
    accounts: &dyn Accounts,
) -> Result<HashMap<String, Keypair>, ForgingError> {
    let mut keypairs = HashMap::new();

    if !config.force {
        return Ok(keypairs);
    }
    let entries = match &config.secret {
        Some(entries) if !entries.is_empty() => entries,
        _ => return Ok(keypairs),
    };

    tracing::info!(entries = entries.len(), "loading forging keypairs");

    for entry in entries {
        let secret = decrypt_entry(entry, &config.default_passphrase).ok_or_else(|| {
            ForgingError::InvalidEncryptedSecret {
                public_key: entry.public_key.clone(),
            }
        })?;
        let keypair = derive_keypair(&secret).map_err(|_| {
            ForgingError::InvalidEncryptedSecret {
                public_key: entry.public_key.clone(),
            }
        })?;

        let derived_hex = hex::encode(keypair.public.to_bytes());
        if !derived_hex.eq_ignore_ascii_case(&entry.public_key) {
            return Err(ForgingError::PublicKeyMismatch);
        }

        let public_key = PublicKey(keypair.public.to_bytes().to_vec());
        let account = accounts
            .get_account(&public_key)
            .map_err(|e| ForgingError::Accounts(e.to_string()))?;
        let Some(account) = account else {
            return Err(ForgingError::AccountNotFound {
                public_key: derived_hex,
            });
        };

        if !account.is_delegate {
            tracing::debug!(public_key = %derived_hex, "forging entry is not a delegate, skipping");
            continue;
        }

        tracing::debug!(public_key = %derived_hex, "forging keypair loaded");
        keypairs.insert(derived_hex, keypair);
    }

    Ok(keypairs)
}

/// Seals a plaintext secret into an [`EncryptedEntry`] under
/// `passphrase`, deriving the entry's public key from the secret itself.
///
/// This is the provisioning counterpart of [`load_delegates`], used by
/// operator tooling and tests.
pub fn encrypt_entry(secret: &str, passphrase: &str) -> Result<EncryptedEntry, ForgingError> {
    let keypair =
        derive_keypair(secret.as_bytes()).map_err(|e| ForgingError::Encrypt(e.to_string()))?;

    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let key = derive_key(passphrase.as_bytes(), &salt)
        .map_err(|e| ForgingError::Encrypt(e.to_string()))?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_ref()));
    let mut sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), secret.as_bytes())
        .map_err(|e| ForgingError::Encrypt(e.to_string()))?;
    let tag = sealed.split_off(sealed.len() - TAG_LEN);

    Ok(EncryptedEntry {
        public_key: hex::encode(keypair.public.to_bytes()),
        encrypted_secret: hex::encode(&sealed),
        iv: hex::encode(nonce),
        salt: hex::encode(salt),
        tag: hex::encode(tag),
        version: SCHEME_VERSION,
    })
}

/// Decrypts one entry; any failure collapses to `None` so callers map
/// every malformation to the same invalid-secret error.
fn decrypt_entry(entry: &EncryptedEntry, passphrase: &str) -> Option<Zeroizing<Vec<u8>>> {
    if entry.version != SCHEME_VERSION {
        return None;
    }

    let salt = hex::decode(&entry.salt).ok()?;
    let nonce = hex::decode(&entry.iv).ok()?;
    let tag = hex::decode(&entry.tag).ok()?;
    let mut sealed = hex::decode(&entry.encrypted_secret).ok()?;
    if salt.len() != SALT_LEN || nonce.len() != NONCE_LEN || tag.len() != TAG_LEN {
        return None;
    }

    let key = derive_key(passphrase.as_bytes(), &salt).ok()?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_ref()));
    sealed.extend_from_slice(&tag);
    let plain = cipher
        .decrypt(Nonce::from_slice(&nonce), sealed.as_slice())
        .ok()?;

    Some(Zeroizing::new(plain))
}

/// Stretches the passphrase into a symmetric key with Argon2id.
fn derive_key(
    passphrase: &[u8],
    salt: &[u8],
) -> Result<Zeroizing<[u8; KEY_LEN]>, argon2::Error> {
    let params = build_params()?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2.hash_password_into(passphrase, salt, key.as_mut())?;
    Ok(key)
}

fn build_params() -> Result<Params, argon2::Error> {
    // Interactive-login cost: this runs once per configured entry at
    // node startup.
    ParamsBuilder::new()
        .m_cost(19_456)
        .t_cost(2)
        .p_cost(1)
        .output_len(KEY_LEN)
        .build()
}

/// Derives an ed25519 keypair from a plaintext secret: the SHA-256 of
/// the secret bytes is the signing seed.
fn derive_keypair(secret: &[u8]) -> Result<Keypair, ed25519_dalek::SignatureError> {
    let seed = Sha256::digest(secret);
    let secret_key = SecretKey::from_bytes(seed.as_slice())?;
    let public = VerifyKey::from(&secret_key);
    Ok(Keypair {
        secret: secret_key,
        public,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, Verifier};

    use crate::consensus::error::ModuleError;
    use crate::types::Account;

    const PASSPHRASE: &str = "wagon stumble garbage weekend tower fine";

    struct DelegateDirectory {
        accounts: Vec<Account>,
    }

    impl Accounts for DelegateDirectory {
        fn get_account(&self, pk: &PublicKey) -> Result<Option<Account>, ModuleError> {
            Ok(self
                .accounts
                .iter()
                .find(|a| a.public_key.as_ref() == Some(pk))
                .cloned())
        }
    }

    fn directory_for(entries: &[EncryptedEntry], is_delegate: bool) -> DelegateDirectory {
        let accounts = entries
            .iter()
            .enumerate()
            .map(|(i, e)| Account {
                address: format!("{i}L"),
                public_key: Some(PublicKey::from_hex(&e.public_key).expect("entry key hex")),
                balance: 0,
                is_delegate,
            })
            .collect();
        DelegateDirectory { accounts }
    }

    fn entries(n: usize) -> Vec<EncryptedEntry> {
        (0..n)
            .map(|i| entry(&format!("delegate secret number {i}")))
            .collect()
    }

    fn entry(secret: &str) -> EncryptedEntry {
        encrypt_entry(secret, PASSPHRASE).expect("encrypt entry")
    }

    fn config(entries: Vec<EncryptedEntry>) -> ForgingConfig {
        ForgingConfig {
            force: true,
            secret: Some(entries),
            default_passphrase: PASSPHRASE.to_string(),
        }
    }

    #[test]
    fn force_disabled_loads_nothing() {
        let fixtures = entries(3);
        let directory = directory_for(&fixtures, true);
        let mut cfg = config(fixtures);
        cfg.force = false;

        let keypairs = load_delegates(&cfg, &directory).expect("load");
        assert!(keypairs.is_empty());
    }

    #[test]
    fn empty_or_missing_secret_list_loads_nothing() {
        let directory = DelegateDirectory {
            accounts: Vec::new(),
        };

        let keypairs = load_delegates(&config(Vec::new()), &directory).expect("load");
        assert!(keypairs.is_empty());

        let cfg = ForgingConfig {
            force: true,
            secret: None,
            default_passphrase: PASSPHRASE.to_string(),
        };
        let keypairs = load_delegates(&cfg, &directory).expect("load");
        assert!(keypairs.is_empty());
    }

    #[test]
    fn truncated_ciphertext_is_an_invalid_secret() {
        let mut fixture = entry("some delegate secret");
        fixture.encrypted_secret.truncate(4);
        let expected_pk = fixture.public_key.clone();
        let directory = directory_for(&[fixture.clone()], true);

        let err = load_delegates(&config(vec![fixture]), &directory).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Invalid encryptedSecret for publicKey: {expected_pk}")
        );
    }

    #[test]
    fn wrong_passphrase_is_an_invalid_secret() {
        let fixture = entry("some delegate secret");
        let directory = directory_for(&[fixture.clone()], true);
        let mut cfg = config(vec![fixture]);
        cfg.default_passphrase = "not the passphrase".to_string();

        let err = load_delegates(&cfg, &directory).unwrap_err();
        assert!(matches!(
            err,
            ForgingError::InvalidEncryptedSecret { .. }
        ));
    }

    #[test]
    fn unknown_scheme_version_is_an_invalid_secret() {
        let mut fixture = entry("some delegate secret");
        fixture.version = 2;
        let directory = directory_for(&[fixture.clone()], true);

        let err = load_delegates(&config(vec![fixture]), &directory).unwrap_err();
        assert!(matches!(
            err,
            ForgingError::InvalidEncryptedSecret { .. }
        ));
    }

    #[test]
    fn mismatched_public_key_aborts_the_load() {
        let mut fixture = entry("some delegate secret");
        let other = entry("a different secret entirely");
        fixture.public_key = other.public_key;
        let directory = directory_for(&[fixture.clone()], true);

        let err = load_delegates(&config(vec![fixture]), &directory).unwrap_err();
        assert_eq!(err.to_string(), "Public keys do not match");
    }

    #[test]
    fn missing_account_aborts_the_load() {
        let fixture = entry("some delegate secret");
        let expected_pk = fixture.public_key.clone();
        let directory = DelegateDirectory {
            accounts: Vec::new(),
        };

        let err = load_delegates(&config(vec![fixture]), &directory).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Account with public key: {expected_pk} not found")
        );
    }

    #[test]
    fn non_delegate_accounts_are_skipped_silently() {
        let fixtures = entries(2);
        let directory = directory_for(&fixtures, false);

        let keypairs = load_delegates(&config(fixtures), &directory).expect("load");
        assert!(keypairs.is_empty());
    }

    #[test]
    fn valid_delegate_entries_all_load() {
        let fixtures = entries(3);
        let expected: Vec<String> = fixtures.iter().map(|e| e.public_key.clone()).collect();
        let directory = directory_for(&fixtures, true);

        let keypairs = load_delegates(&config(fixtures), &directory).expect("load");
        assert_eq!(keypairs.len(), 3);
        for pk in expected {
            assert!(keypairs.contains_key(&pk), "missing keypair for {pk}");
        }
    }

    #[test]
    fn first_failing_entry_aborts_even_with_valid_followers() {
        let mut fixtures = entries(3);
        fixtures[1].tag = hex::encode([0u8; 16]);
        let directory = directory_for(&fixtures, true);

        let err = load_delegates(&config(fixtures), &directory).unwrap_err();
        assert!(matches!(
            err,
            ForgingError::InvalidEncryptedSecret { .. }
        ));
    }

    #[test]
    fn loaded_keypairs_can_sign_for_their_public_key() {
        let fixture = entry("some delegate secret");
        let pk_hex = fixture.public_key.clone();
        let directory = directory_for(&[fixture.clone()], true);

        let keypairs = load_delegates(&config(vec![fixture]), &directory).expect("load");
        let keypair = keypairs.get(&pk_hex).expect("keypair present");

        let message = b"block header bytes";
        let signature = keypair.sign(message);
        assert!(keypair.public.verify(message, &signature).is_ok());
    }

    #[test]
    fn encrypt_entry_roundtrips_through_decrypt() {
        let fixture = entry("roundtrip secret");
        let plain = decrypt_entry(&fixture, PASSPHRASE).expect("decrypts");
        assert_eq!(plain.as_slice(), b"roundtrip secret");
    }
}
