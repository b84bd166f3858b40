// ABOUTME: TP-Link Kasa legacy wire codec: XOR autokey cipher and length-prefixed TCP frames
// ABOUTME: UDP discovery datagrams use the bare cipher, TCP requests add a 4-byte length header
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::types::LampError;

/// Seed of the autokey cipher
const INITIAL_KEY: u8 = 171;

/// Largest reply accepted from a device (64 KiB)
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Encrypt a plaintext payload; each ciphertext byte keys the next
pub fn encrypt(plain: &[u8]) -> Vec<u8> {
    let mut key = INITIAL_KEY;
    plain
        .iter()
        .map(|byte| {
            key ^= byte;
            key
        })
        .collect()
}

/// Decrypt a ciphertext payload
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

/// Encrypt and prefix with the big-endian payload length, ready for TCP
pub fn encode_frame(plain: &[u8]) -> Result<Vec<u8>, LampError> {
    let len = u32::try_from(plain.len())
        .map_err(|_| LampError::internal("Kasa request exceeds 4 GiB"))?;
    let mut frame = Vec::with_capacity(4 + plain.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&encrypt(plain));
    Ok(frame)
}

/// Read one length-prefixed frame and return its decrypted payload
///
/// `device` labels errors; I/O failures are transient, oversize frames are protocol errors.
pub async fn read_frame<R>(reader: &mut R, device: &str) -> Result<Vec<u8>, LampError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    reader
        .read_exact(&mut header)
        .await
        .map_err(|e| LampError::transient(device, format!("reading reply header: {e}")))?;

    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(LampError::protocol(format!(
            "{device}: reply of {len} bytes exceeds {MAX_FRAME_BYTES}"
        )));
    }

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| LampError::transient(device, format!("reading reply body: {e}")))?;

    Ok(decrypt(&payload))
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncWriteExt;

    use super::*;
    use crate::types::ErrorKind;

    #[test]
    fn encrypt_matches_known_prefix() {
        // Every Kasa sysinfo query on the wire begins with d0 f2
        let cipher = encrypt(br#"{"system":{"get_sysinfo":{}}}"#);
        assert_eq!(&cipher[..2], &[0xd0, 0xf2]);
    }

    #[test]
    fn decrypt_inverts_encrypt() {
        let plain = br#"{"system":{"set_relay_state":{"state":1}}}"#;
        assert_eq!(decrypt(&encrypt(plain)), plain);
    }

    #[test]
    fn frame_carries_length_header() {
        let frame = encode_frame(b"{}").expect("frame");
        assert_eq!(&frame[..4], &[0, 0, 0, 2]);
        assert_eq!(frame.len(), 6);
    }

    #[tokio::test]
    async fn read_frame_decodes_payload() {
        let (mut client, mut server) = tokio::io::duplex(256);
        let frame = encode_frame(br#"{"ok":1}"#).expect("frame");
        server.write_all(&frame).await.expect("write");

        let payload = read_frame(&mut client, "test").await.expect("read");
        assert_eq!(payload, br#"{"ok":1}"#);
    }

    #[tokio::test]
    async fn oversize_frame_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(16);
        server
            .write_all(&u32::MAX.to_be_bytes())
            .await
            .expect("write");

        let err = read_frame(&mut client, "test").await.expect_err("too big");
        assert_eq!(err.kind, ErrorKind::Protocol);
    }

    #[tokio::test]
    async fn truncated_frame_is_transient() {
        let (mut client, mut server) = tokio::io::duplex(16);
        server.write_all(&[0, 0, 0, 9, 1, 2]).await.expect("write");
        drop(server);

        let err = read_frame(&mut client, "test").await.expect_err("truncated");
        assert_eq!(err.kind, ErrorKind::TransientDevice);
    }
}
