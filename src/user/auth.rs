//! Password hashing

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

mod soundshare_argon2 {
    use anyhow::{anyhow, Result};
    use argon2::{
        password_hash::{
            rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        },
        Argon2,
    };

    pub fn generate_b64_salt() -> String {
        SaltString::generate(&mut OsRng).to_string()
    }

    pub fn hash<T: AsRef<str>>(argon2: &Argon2, plain: &[u8], b64_salt: T) -> Result<String> {
        let salt = SaltString::from_b64(b64_salt.as_ref()).map_err(|err| anyhow!("{}", err))?;
        let hash_string = argon2
            .hash_password(plain, &salt)
            .map_err(|err| anyhow!("{}", err))?
            .to_string();
        Ok(hash_string)
    }

    pub fn verify<T: AsRef<str>>(argon2: &Argon2, plain_pw: &[u8], target_hash: T) -> Result<bool> {
        let password_hash =
            PasswordHash::new(target_hash.as_ref()).map_err(|err| anyhow!("{}", err))?;
        Ok(argon2.verify_password(plain_pw, &password_hash).is_ok())
    }

    #[cfg(feature = "test-fast-hasher")]
    pub fn fast() -> Result<Argon2<'static>> {
        let params = argon2::Params::new(8, 1, 1, None).map_err(|err| anyhow!("{}", err))?;
        Ok(Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            params,
        ))
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum SoundshareHasher {
    Argon2,
    /// Minimal argon2 cost, for tests only.
    #[cfg(feature = "test-fast-hasher")]
    FastArgon2,
}

impl SoundshareHasher {
    /// The hasher new credentials are created with.
    pub fn current() -> Self {
        #[cfg(feature = "test-fast-hasher")]
        return SoundshareHasher::FastArgon2;
        #[cfg(not(feature = "test-fast-hasher"))]
        return SoundshareHasher::Argon2;
    }

    pub fn generate_b64_salt(&self) -> String {
        soundshare_argon2::generate_b64_salt()
    }

    pub fn hash<T: AsRef<str>>(&self, plain: &[u8], b64_salt: T) -> Result<String> {
        match self {
            SoundshareHasher::Argon2 => {
                soundshare_argon2::hash(&argon2::Argon2::default(), plain, b64_salt)
            }
            #[cfg(feature = "test-fast-hasher")]
            SoundshareHasher::FastArgon2 => {
                soundshare_argon2::hash(&soundshare_argon2::fast()?, plain, b64_salt)
            }
        }
    }

    pub fn verify<P: AsRef<str>, H: AsRef<str>>(&self, plain_pw: P, target_hash: H) -> Result<bool> {
        let plain_pw = plain_pw.as_ref().as_bytes();
        match self {
            SoundshareHasher::Argon2 => {
                soundshare_argon2::verify(&argon2::Argon2::default(), plain_pw, target_hash)
            }
            #[cfg(feature = "test-fast-hasher")]
            SoundshareHasher::FastArgon2 => {
                soundshare_argon2::verify(&soundshare_argon2::fast()?, plain_pw, target_hash)
            }
        }
    }
}

impl FromStr for SoundshareHasher {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "argon2" => Ok(SoundshareHasher::Argon2),
            #[cfg(feature = "test-fast-hasher")]
            "argon2-fast" => Ok(SoundshareHasher::FastArgon2),
            _ => bail!("Unknown hasher {}", s),
        }
    }
}

impl fmt::Display for SoundshareHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundshareHasher::Argon2 => write!(f, "argon2"),
            #[cfg(feature = "test-fast-hasher")]
            SoundshareHasher::FastArgon2 => write!(f, "argon2-fast"),
        }
    }
}
