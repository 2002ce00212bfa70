//! Autokey XOR framing used by the local plug protocol.
//!
//! Every byte is XORed with the previous ciphertext byte, seeded with 171.
//! TCP frames carry a 4-byte big-endian length prefix; UDP datagrams do not.

use crate::error::{ExporterError, Result};

const INITIAL_KEY: u8 = 171;

/// Port plugs listen on for both UDP discovery and TCP commands.
pub const PORT: u16 = 9999;

/// Largest response we are willing to buffer from a single plug.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

pub fn encrypt(plain: &[u8]) -> Vec<u8> {
    let mut key = INITIAL_KEY;
    plain
        .iter()
        .map(|&b| {
            key ^= b;
            key
        })
        .collect()
}

pub fn decrypt(cipher: &[u8]) -> Vec<u8> {
    let mut key = INITIAL_KEY;
    cipher
        .iter()
        .map(|&b| {
            let plain = key ^ b;
            key = b;
            plain
        })
        .collect()
}

/// Encrypt and prepend the TCP length header.
pub fn encode_frame(plain: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(plain.len() + 4);
    frame.extend_from_slice(&(plain.len() as u32).to_be_bytes());
    frame.extend_from_slice(&encrypt(plain));
    frame
}

/// Parse the TCP length header, rejecting frames larger than [`MAX_FRAME_LEN`].
pub fn frame_len(header: [u8; 4]) -> Result<usize> {
    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ExporterError::Protocol(format!(
            "frame of {} bytes exceeds limit of {}",
            len, MAX_FRAME_LEN
        )));
    }
    Ok(len)
}
