//! Cryptographic primitives for gitkv.
//!
//! Provides git's object hashing (SHA-1 over a `"{kind} {len}\0"` header),
//! plain digests, HMAC-SHA-256, PBKDF2 key derivation and the AES-256-GCM
//! payload cipher whose IV is derived from caller-chosen material.
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod codec;
pub mod digest;
pub mod error;
pub mod hasher;

pub use codec::{Codec, IvSource, PayloadCipher, IV_LEN, TAG_LEN};
pub use digest::{derive_key, hash, hmac_sha256, DigestAlgorithm, PBKDF2_ROUNDS};
pub use error::{CryptoError, CryptoResult};
pub use hasher::ContentHasher;
