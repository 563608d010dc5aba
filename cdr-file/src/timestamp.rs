//! Four-octet timestamps of the CDR file header

use bytes::{Buf, BufMut};
use cdr_core::{CdrError, CdrResult};
use serde::{Deserialize, Serialize};

/// Encoded size of a [`CdrTimestamp`]
pub const TIMESTAMP_LENGTH: usize = 4;

/// Sign of the UTC offset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OffsetSign {
    #[default]
    Plus = 0,
    Minus = 1,
}

/// File header timestamp, local time plus UTC offset
///
/// # Encoding Format
///
/// Bit packed into one big-endian 32-bit word, most significant field first:
///
/// ```text
/// month(4) day(5) hour(5) minute(6) sign(1) offset hours(5) offset minutes(6)
/// ```
///
/// The sign bit is 0 for `+` and 1 for `-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CdrTimestamp {
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub offset_sign: OffsetSign,
    pub offset_hours: u8,
    pub offset_minutes: u8,
}

impl Default for CdrTimestamp {
    fn default() -> Self {
        Self {
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            offset_sign: OffsetSign::Plus,
            offset_hours: 0,
            offset_minutes: 0,
        }
    }
}

impl CdrTimestamp {
    /// Create a timestamp with a UTC offset of `+00:00`
    pub fn new(month: u8, day: u8, hour: u8, minute: u8) -> Self {
        Self {
            month,
            day,
            hour,
            minute,
            ..Self::default()
        }
    }

    /// Set the UTC offset
    pub fn with_offset(mut self, sign: OffsetSign, hours: u8, minutes: u8) -> Self {
        self.offset_sign = sign;
        self.offset_hours = hours;
        self.offset_minutes = minutes;
        self
    }

    /// Check every field against its calendar range
    pub fn validate(&self) -> CdrResult<()> {
        let fields = [
            ("month", self.month, 1, 12),
            ("day", self.day, 1, 31),
            ("hour", self.hour, 0, 23),
            ("minute", self.minute, 0, 59),
            ("offset hours", self.offset_hours, 0, 23),
            ("offset minutes", self.offset_minutes, 0, 59),
        ];
        for (name, value, min, max) in fields {
            if value < min || value > max {
                return Err(CdrError::ValueOutOfRange(format!(
                    "timestamp {} {} outside {}..{}",
                    name, value, min, max
                )));
            }
        }
        Ok(())
    }

    /// Append the four octets to `buf`
    pub fn encode(&self, buf: &mut impl BufMut) -> CdrResult<()> {
        self.validate()?;
        let word = (self.month as u32) << 28
            | (self.day as u32) << 23
            | (self.hour as u32) << 18
            | (self.minute as u32) << 12
            | (self.offset_sign as u32) << 11
            | (self.offset_hours as u32) << 6
            | self.offset_minutes as u32;
        buf.put_u32(word);
        Ok(())
    }

    /// Read four octets from `buf`
    ///
    /// # Error Handling
    /// Returns `OutOfData` when fewer than four octets remain and
    /// `InvalidData` when a field is outside its range.
    pub fn decode(buf: &mut impl Buf) -> CdrResult<Self> {
        if buf.remaining() < TIMESTAMP_LENGTH {
            return Err(CdrError::out_of_data(
                (TIMESTAMP_LENGTH * 8) as u64,
                (buf.remaining() * 8) as u64,
            ));
        }
        let word = buf.get_u32();
        let timestamp = Self {
            month: (word >> 28) as u8,
            day: (word >> 23 & 0x1F) as u8,
            hour: (word >> 18 & 0x1F) as u8,
            minute: (word >> 12 & 0x3F) as u8,
            offset_sign: if word >> 11 & 1 == 1 {
                OffsetSign::Minus
            } else {
                OffsetSign::Plus
            },
            offset_hours: (word >> 6 & 0x1F) as u8,
            offset_minutes: (word & 0x3F) as u8,
        };
        timestamp
            .validate()
            .map_err(|err| CdrError::InvalidData(err.to_string()))?;
        Ok(timestamp)
    }
}

impl std::fmt::Display for CdrTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = match self.offset_sign {
            OffsetSign::Plus => '+',
            OffsetSign::Minus => '-',
        };
        write!(
            f,
            "{:02}-{:02} {:02}:{:02} {}{:02}{:02}",
            self.month, self.day, self.hour, self.minute, sign, self.offset_hours, self.offset_minutes
        )
    }
}
