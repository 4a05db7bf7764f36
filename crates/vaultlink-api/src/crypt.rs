// Challenge hashing for the router login handshake.
//
// The router announces a crypt(3) algorithm id in its challenge. Only the
// MD5-based scheme (`$1$`) is implemented; any other id is rejected rather
// than answered with a weaker hash.

use md5::{Digest, Md5};

use crate::error::Error;

/// Crypt id of the MD5-based scheme.
pub const MD5_CRYPT_ID: &str = "1";

const MD5_CRYPT_MAGIC: &[u8] = b"$1$";
const MD5_CRYPT_ROUNDS: usize = 1000;
const ENCODED_LEN: usize = 22;

const CRYPT_ALPHABET: &[u8; 64] =
    b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Source byte order for the 24-bit output groups.
const MD5_CRYPT_GROUPS: [(usize, usize, usize); 5] =
    [(0, 6, 12), (1, 7, 13), (2, 8, 14), (3, 9, 15), (4, 10, 5)];

/// A crypt algorithm the login handshake can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptAlgorithm {
    /// `$1$` -- MD5-crypt.
    Md5,
}

impl CryptAlgorithm {
    /// Resolve the algorithm announced by a challenge.
    pub fn from_id(id: &str) -> Result<Self, Error> {
        match id {
            MD5_CRYPT_ID => Ok(Self::Md5),
            other => Err(Error::UnsupportedAlgorithm {
                alg: other.to_owned(),
            }),
        }
    }

    /// The crypt id this algorithm answers to.
    pub fn id(self) -> &'static str {
        match self {
            Self::Md5 => MD5_CRYPT_ID,
        }
    }

    /// Hash `password` with `salt`, producing the full `$id$salt$hash` string.
    pub fn hash(self, password: &[u8], salt: &str) -> String {
        match self {
            Self::Md5 => md5_crypt(password, salt),
        }
    }
}

/// MD5-crypt as implemented by crypt(3) and `openssl passwd -1`.
///
/// The salt is used verbatim. Output: `$1$<salt>$<22 chars>`.
pub fn md5_crypt(password: &[u8], salt: &str) -> String {
    let salt_bytes = salt.as_bytes();

    let mut alternate = Md5::new();
    alternate.update(password);
    alternate.update(salt_bytes);
    alternate.update(password);
    let alternate = alternate.finalize();

    let mut ctx = Md5::new();
    ctx.update(password);
    ctx.update(MD5_CRYPT_MAGIC);
    ctx.update(salt_bytes);

    let mut remaining = password.len();
    while remaining > 0 {
        let take = remaining.min(alternate.len());
        ctx.update(&alternate[..take]);
        remaining = remaining.saturating_sub(alternate.len());
    }

    // A set bit feeds a NUL byte, a clear bit the first password byte.
    let first = password.first().copied().unwrap_or_default();
    let mut bits = password.len();
    while bits > 0 {
        if bits & 1 == 1 {
            ctx.update([0u8]);
        } else {
            ctx.update([first]);
        }
        bits >>= 1;
    }

    let mut digest: [u8; 16] = ctx.finalize().into();

    for round in 0..MD5_CRYPT_ROUNDS {
        let mut ctx = Md5::new();
        if round % 2 == 1 {
            ctx.update(password);
        } else {
            ctx.update(digest);
        }
        if round % 3 != 0 {
            ctx.update(salt_bytes);
        }
        if round % 7 != 0 {
            ctx.update(password);
        }
        if round % 2 == 1 {
            ctx.update(digest);
        } else {
            ctx.update(password);
        }
        digest = ctx.finalize().into();
    }

    format!("$1${salt}${}", encode_digest(&digest))
}

/// Hex digest sent as the `hash` field of the `login` call.
pub fn login_hash(username: &str, password_hash: &str, nonce: &str) -> String {
    let digest = Md5::digest(format!("{username}:{password_hash}:{nonce}").as_bytes());
    hex::encode(digest)
}

fn encode_digest(digest: &[u8; 16]) -> String {
    let mut out = String::with_capacity(ENCODED_LEN);
    for (a, b, c) in MD5_CRYPT_GROUPS {
        let group =
            (u32::from(digest[a]) << 16) | (u32::from(digest[b]) << 8) | u32::from(digest[c]);
        push_crypt64(&mut out, group, 4);
    }
    push_crypt64(&mut out, u32::from(digest[11]), 2);
    out.truncate(ENCODED_LEN);
    out
}

#[allow(clippy::as_conversions, clippy::cast_possible_truncation)]
fn push_crypt64(out: &mut String, mut value: u32, chars: usize) {
    for _ in 0..chars {
        out.push(char::from(CRYPT_ALPHABET[(value & 0x3f) as usize]));
        value >>= 6;
    }
}
