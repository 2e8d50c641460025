// MIT License

//! Credential derivation for the IP module's login endpoint.
//!
//! The module's login page derives both request parameters in JavaScript
//! from the user PIN, the module password and the per-cycle session token:
//!
//! ```text
//! pass_hash    = md5_hex(module_password)
//! session_pass = pass_hash + session_token      (string concatenation)
//! p            = md5_hex(session_pass)
//! u            = rc4_hex(key = session_pass, plaintext = pin)
//! ```
//!
//! The RC4 keystream is keyed directly on the ASCII bytes of
//! `session_pass`; the output is lowercase hex, which the module's firmware
//! decodes. Everything here is pure and testable against fixed vectors.

use md5::{Digest, Md5};

/// The two opaque query parameters expected by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// `u` parameter: RC4-encrypted user PIN, hex encoded.
    pub user: String,
    /// `p` parameter: MD5 of the session password, hex encoded.
    pub pass: String,
}

/// Lowercase hex MD5 digest of a string.
pub fn md5_hex(input: &str) -> String {
    let digest = Md5::digest(input.as_bytes());
    let mut out = String::with_capacity(32);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// RC4-encrypt `plaintext` with `key`, returning lowercase hex.
///
/// Standard KSA/PRGA over the full 256-byte state; no drop-N. The module's
/// decoder consumes exactly this variant.
pub fn rc4_hex(key: &str, plaintext: &str) -> String {
    let key = key.as_bytes();
    let mut state: [u8; 256] = [0; 256];
    for (i, item) in state.iter_mut().enumerate() {
        *item = i as u8;
    }

    // Key scheduling
    let mut j: u8 = 0;
    for i in 0..256 {
        j = j
            .wrapping_add(state[i])
            .wrapping_add(key[i % key.len()]);
        state.swap(i, j as usize);
    }

    // Keystream generation and XOR
    let mut out = String::with_capacity(plaintext.len() * 2);
    let mut i: u8 = 0;
    let mut j: u8 = 0;
    for &byte in plaintext.as_bytes() {
        i = i.wrapping_add(1);
        j = j.wrapping_add(state[i as usize]);
        state.swap(i as usize, j as usize);
        let k = state[(state[i as usize].wrapping_add(state[j as usize])) as usize];
        out.push_str(&format!("{:02x}", byte ^ k));
    }
    out
}

/// Derive the login credentials for one authentication attempt.
///
/// Pure function of its inputs; issues no I/O. The session token must come
/// from the current login cycle or the module will reject the pair.
pub fn derive_credentials(pin: &str, module_password: &str, session_token: &str) -> Credentials {
    let pass_hash = md5_hex(module_password);
    let session_pass = format!("{}{}", pass_hash, session_token);
    Credentials {
        user: rc4_hex(&session_pass, pin),
        pass: md5_hex(&session_pass),
    }
}
