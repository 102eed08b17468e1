// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kasa smart-home wire codec.
//!
//! Kasa plugs speak JSON obfuscated with an "autokey" XOR cipher. Over TCP
//! (port 9999) every message is prefixed with its length as a big-endian
//! `u32`; UDP discovery datagrams carry the bare ciphertext.
//!
//! # Examples
//!
//! ```
//! use hs100_mqtt::protocol::kasa;
//!
//! let cipher = kasa::encrypt(br#"{"system":{"get_sysinfo":{}}}"#);
//! assert_eq!(kasa::decrypt(&cipher), br#"{"system":{"get_sysinfo":{}}}"#);
//! ```

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;

/// Initial key of the autokey cipher.
const INITIAL_KEY: u8 = 171;

/// Upper bound for a single TCP frame.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Default TCP/UDP port of Kasa devices.
pub const DEFAULT_PORT: u16 = 9999;

/// Encrypts a plaintext payload.
#[must_use]
pub fn encrypt(plain: &[u8]) -> Vec<u8> {
    let mut key = INITIAL_KEY;
    plain
        .iter()
        .map(|&byte| {
            key ^= byte;
            key
        })
        .collect()
}

/// Decrypts a ciphertext payload.
#[must_use]
pub fn decrypt(cipher: &[u8]) -> Vec<u8> {
    let mut key = INITIAL_KEY;
    cipher
        .iter()
        .map(|&byte| {
            let plain = key ^ byte;
            key = byte;
            plain
        })
        .collect()
}

/// Encrypts a payload and prepends the TCP length header.
///
/// # Errors
///
/// Returns `FrameTooLarge` if the payload exceeds [`MAX_FRAME_LEN`].
pub fn encode_frame(plain: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if plain.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(plain.len()));
    }

    // Bounded by MAX_FRAME_LEN above
    #[allow(clippy::cast_possible_truncation)]
    let len = plain.len() as u32;

    let mut frame = Vec::with_capacity(plain.len() + 4);
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend(encrypt(plain));
    Ok(frame)
}

/// Writes one encrypted, length-prefixed frame.
///
/// # Errors
///
/// Returns error if the payload is too large or the write fails.
pub async fn write_frame<W>(writer: &mut W, plain: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(plain)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one length-prefixed frame and returns the decrypted payload.
///
/// # Errors
///
/// Returns error if the stream ends early or announces an oversized frame.
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    reader.read_exact(&mut header).await?;

    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }

    let mut cipher = vec![0u8; len];
    reader.read_exact(&mut cipher).await?;
    Ok(decrypt(&cipher))
}
