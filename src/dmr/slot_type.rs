//! DMR slot type field.

use crate::coding::golay::Golay2087;
use crate::error::CodingError;

use super::DataType;

/// Slot type: colour code and burst data type, protected by Golay(20,8,7).
///
/// The 20-bit field packs into three bytes with the low nibble of the third
/// byte unused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotType {
    /// Colour code (4 bits).
    pub color_code: u8,
    /// Burst data type.
    pub data_type: DataType,
}

impl SlotType {
    pub fn new(color_code: u8, data_type: DataType) -> Self {
        Self {
            color_code: color_code & 0x0F,
            data_type,
        }
    }

    /// Encode into three bytes (20 bits, low nibble of byte 2 zero).
    pub fn encode(self) -> [u8; 3] {
        let data = (self.color_code << 4) | (self.data_type as u8);
        let word = Golay2087::encode(data);

        [
            (word >> 12) as u8,
            (word >> 4) as u8,
            ((word & 0x0F) << 4) as u8,
        ]
    }

    /// Decode three bytes, correcting up to three bit errors.
    pub fn decode(data: &[u8; 3]) -> Result<Self, CodingError> {
        let word = (u32::from(data[0]) << 12) | (u32::from(data[1]) << 4) | u32::from(data[2] >> 4);
        let bits = Golay2087::decode(word)?;

        let data_type = DataType::from_u8(bits & 0x0F).ok_or(CodingError::GolayUncorrectable)?;
        Ok(Self {
            color_code: bits >> 4,
            data_type,
        })
    }
}
