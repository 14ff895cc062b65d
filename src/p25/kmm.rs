//! P25 key management messages.
//!
//! The peer requests keys with a modify-key KMM over the key-request
//! function and receives keysets back over the key-response function. A
//! KMM frame is an 8-byte header (message id, body length, response kind
//! and complete flag, destination and source logical link ids) followed by
//! the message body.

use crate::error::ProtocolError;
use crate::p25::{KMM_MODIFY_KEY_CMD, P25_MI_LENGTH};
use crate::util::bits::{get_u16, set_u16};

/// KMM frame header length.
pub const KMM_FRAME_LENGTH: usize = 8;

/// Decrypt instruction format indicating an MI is present.
pub const KMM_DIF_MI_PRESENT: u8 = 0x40;

/// Width of the key material window in a key item.
pub const KEY_MATERIAL_WIDTH: usize = 32;

/// 8-byte KMM frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmmFrame {
    pub message_id: u8,
    /// Body length in bytes.
    pub message_length: u16,
    /// Response kind (2 bits).
    pub response_kind: u8,
    /// Complete-message flag.
    pub complete: bool,
    pub dst_ll_id: u16,
    pub src_ll_id: u16,
}

impl KmmFrame {
    pub fn new(message_id: u8, message_length: u16) -> Self {
        Self {
            message_id,
            message_length,
            response_kind: 0,
            complete: true,
            dst_ll_id: 0,
            src_ll_id: 0,
        }
    }

    pub fn encode(&self) -> [u8; KMM_FRAME_LENGTH] {
        let mut buf = [0u8; KMM_FRAME_LENGTH];
        buf[0] = self.message_id;
        set_u16(&mut buf, 1, self.message_length);
        buf[3] = (u8::from(self.complete) << 6) | (self.response_kind & 0x03);
        set_u16(&mut buf, 4, self.dst_ll_id);
        set_u16(&mut buf, 6, self.src_ll_id);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < KMM_FRAME_LENGTH {
            return Err(ProtocolError::MalformedMessage("short KMM frame".into()));
        }

        Ok(Self {
            message_id: buf[0],
            message_length: get_u16(buf, 1),
            response_kind: buf[3] & 0x03,
            complete: buf[3] & 0x40 != 0,
            dst_ll_id: get_u16(buf, 4),
            src_ll_id: get_u16(buf, 6),
        })
    }
}

/// One key within a keyset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyItem {
    /// Key format byte; the lower five bits give the key-name length.
    pub key_format: u8,
    /// Storage location number.
    pub sln: u16,
    /// Key identifier.
    pub key_id: u16,
    /// Key material window; only the keyset's `key_length` bytes are valid.
    pub material: [u8; KEY_MATERIAL_WIDTH],
}

impl KeyItem {
    pub fn new(sln: u16, key_id: u16, key: &[u8]) -> Self {
        let mut material = [0u8; KEY_MATERIAL_WIDTH];
        let len = key.len().min(KEY_MATERIAL_WIDTH);
        material[..len].copy_from_slice(&key[..len]);

        Self {
            key_format: 0x80,
            sln,
            key_id,
            material,
        }
    }

    /// Length of the key name carried in the format byte.
    pub fn name_length(&self) -> u8 {
        self.key_format & 0x1F
    }

    /// The valid key material.
    pub fn key(&self, key_length: u8) -> &[u8] {
        &self.material[..usize::from(key_length).min(KEY_MATERIAL_WIDTH)]
    }
}

/// An ordered set of keys sharing a keyset id, algorithm and key length.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeysetItem {
    pub keyset_id: u8,
    pub algorithm_id: u8,
    pub key_length: u8,
    pub keys: Vec<KeyItem>,
}

impl KeysetItem {
    fn encoded_len(&self) -> usize {
        4 + self.keys.len() * (5 + usize::from(self.key_length))
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.keyset_id);
        out.push(self.algorithm_id);
        out.push(self.key_length);
        out.push(self.keys.len() as u8);

        for key in &self.keys {
            out.push(key.key_format);
            out.extend_from_slice(&key.sln.to_be_bytes());
            out.extend_from_slice(&key.key_id.to_be_bytes());
            out.extend_from_slice(key.key(self.key_length));
        }
    }

    fn decode_from(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < 4 {
            return Err(ProtocolError::MalformedMessage("short keyset item".into()));
        }

        let keyset_id = buf[0];
        let algorithm_id = buf[1];
        let key_length = buf[2];
        let key_count = usize::from(buf[3]);

        if usize::from(key_length) > KEY_MATERIAL_WIDTH {
            return Err(ProtocolError::MalformedMessage(format!(
                "key length {key_length} exceeds material window"
            )));
        }

        let item_len = 5 + usize::from(key_length);
        let mut keys = Vec::with_capacity(key_count);
        let mut offset = 4;

        for _ in 0..key_count {
            if buf.len() < offset + item_len {
                return Err(ProtocolError::MalformedMessage("truncated key item".into()));
            }

            let key_format = buf[offset];
            let sln = get_u16(buf, offset + 1);
            let key_id = get_u16(buf, offset + 3);

            let mut material = [0u8; KEY_MATERIAL_WIDTH];
            material[..usize::from(key_length)]
                .copy_from_slice(&buf[offset + 5..offset + item_len]);

            keys.push(KeyItem {
                key_format,
                sln,
                key_id,
                material,
            });
            offset += item_len;
        }

        Ok(Self {
            keyset_id,
            algorithm_id,
            key_length,
            keys,
        })
    }
}

/// Modify-key KMM: the request names an algorithm and key id; the response
/// carries the keyset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmmModifyKey {
    pub frame: KmmFrame,
    /// Decrypt instruction format.
    pub decrypt_info_format: u8,
    pub algorithm_id: u8,
    pub key_id: u16,
    /// Message indicator, present when the DIF says so.
    pub mi: Option<[u8; P25_MI_LENGTH]>,
    pub keyset: KeysetItem,
}

impl KmmModifyKey {
    /// Build the peer's key request for one algorithm/key pair.
    pub fn request(algorithm_id: u8, key_id: u16) -> Self {
        let mut modify = Self {
            frame: KmmFrame::new(KMM_MODIFY_KEY_CMD, 0),
            decrypt_info_format: 0,
            algorithm_id,
            key_id,
            mi: None,
            keyset: KeysetItem {
                algorithm_id,
                ..KeysetItem::default()
            },
        };
        modify.frame.message_length = modify.body_len() as u16;
        modify
    }

    fn body_len(&self) -> usize {
        4 + self.mi.map_or(0, |_| P25_MI_LENGTH) + self.keyset.encoded_len()
    }

    /// Encode the frame header and body.
    pub fn encode(&self) -> Vec<u8> {
        let mut frame = self.frame;
        frame.message_length = self.body_len() as u16;

        let mut out = Vec::with_capacity(KMM_FRAME_LENGTH + self.body_len());
        out.extend_from_slice(&frame.encode());
        out.push(self.decrypt_info_format);
        out.push(self.algorithm_id);
        out.extend_from_slice(&self.key_id.to_be_bytes());

        if let Some(mi) = &self.mi {
            out.extend_from_slice(mi);
        }

        self.keyset.encode_into(&mut out);
        out
    }

    /// Decode a modify-key KMM (frame header included).
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        let frame = KmmFrame::decode(buf)?;
        if frame.message_id != KMM_MODIFY_KEY_CMD {
            return Err(ProtocolError::MalformedMessage(format!(
                "unexpected KMM message id {:#04x}",
                frame.message_id
            )));
        }

        let body = &buf[KMM_FRAME_LENGTH..];
        if body.len() < 4 {
            return Err(ProtocolError::MalformedMessage("short modify-key body".into()));
        }

        let decrypt_info_format = body[0];
        let algorithm_id = body[1];
        let key_id = get_u16(body, 2);

        let mut offset = 4;
        let mi = if decrypt_info_format & KMM_DIF_MI_PRESENT != 0 {
            if body.len() < offset + P25_MI_LENGTH {
                return Err(ProtocolError::MalformedMessage("truncated MI".into()));
            }
            let mut mi = [0u8; P25_MI_LENGTH];
            mi.copy_from_slice(&body[offset..offset + P25_MI_LENGTH]);
            offset += P25_MI_LENGTH;
            Some(mi)
        } else {
            None
        };

        let keyset = KeysetItem::decode_from(&body[offset..])?;

        Ok(Self {
            frame,
            decrypt_info_format,
            algorithm_id,
            key_id,
            mi,
            keyset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::p25::P25_ALGO_AES_256;

    #[test]
    fn test_frame_round_trip() {
        let frame = KmmFrame {
            message_id: KMM_MODIFY_KEY_CMD,
            message_length: 42,
            response_kind: 2,
            complete: true,
            dst_ll_id: 0xFFFF,
            src_ll_id: 0x0001,
        };

        let encoded = frame.encode();
        assert_eq!(KmmFrame::decode(&encoded).unwrap(), frame);
    }

    #[test]
    fn test_request_round_trip() {
        let request = KmmModifyKey::request(P25_ALGO_AES_256, 0x0102);
        let wire = request.encode();

        let decoded = KmmModifyKey::decode(&wire).unwrap();
        assert_eq!(decoded.algorithm_id, P25_ALGO_AES_256);
        assert_eq!(decoded.key_id, 0x0102);
        assert!(decoded.mi.is_none());
        assert!(decoded.keyset.keys.is_empty());
    }

    #[test]
    fn test_response_with_keys_round_trip() {
        let mut response = KmmModifyKey::request(P25_ALGO_AES_256, 0x0001);
        response.decrypt_info_format = KMM_DIF_MI_PRESENT;
        response.mi = Some([9, 8, 7, 6, 5, 4, 3, 2, 1]);
        response.keyset = KeysetItem {
            keyset_id: 1,
            algorithm_id: P25_ALGO_AES_256,
            key_length: 32,
            keys: vec![
                KeyItem::new(0x0001, 0x0001, &[0xAA; 32]),
                KeyItem::new(0x0002, 0x0002, &[0xBB; 32]),
            ],
        };

        let wire = response.encode();
        let decoded = KmmModifyKey::decode(&wire).unwrap();

        assert_eq!(decoded.mi, response.mi);
        assert_eq!(decoded.keyset, response.keyset);
        assert_eq!(decoded.keyset.keys[0].key(32), &[0xAA; 32]);
        assert_eq!(decoded.keyset.keys[1].sln, 0x0002);
        // The encoded frame header carries the recomputed body length.
        assert_eq!(
            usize::from(decoded.frame.message_length),
            wire.len() - KMM_FRAME_LENGTH
        );
    }

    #[test]
    fn test_short_key_material_window() {
        // A 5-byte ARC4 key rides in a 32-byte window; only the declared
        // length is carried on the wire.
        let keyset = KeysetItem {
            keyset_id: 1,
            algorithm_id: crate::p25::P25_ALGO_ARC4,
            key_length: 5,
            keys: vec![KeyItem::new(1, 7, &[1, 2, 3, 4, 5])],
        };

        let mut out = Vec::new();
        keyset.encode_into(&mut out);
        assert_eq!(out.len(), 4 + 5 + 5);

        let decoded = KeysetItem::decode_from(&out).unwrap();
        assert_eq!(decoded.keys[0].key(5), &[1, 2, 3, 4, 5]);
        assert_eq!(decoded.keys[0].material[5..], [0u8; 27]);
    }

    #[test]
    fn test_truncated_rejected() {
        let request = KmmModifyKey::request(P25_ALGO_AES_256, 1);
        let wire = request.encode();
        assert!(KmmModifyKey::decode(&wire[..wire.len() - 2]).is_err());
        assert!(KmmFrame::decode(&wire[..4]).is_err());
    }
}
