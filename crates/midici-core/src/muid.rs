//! MIDI-CI device identifiers.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// 28-bit MIDI-CI device identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Muid(u32);

impl Muid {
    /// Largest representable MUID.
    pub const MAX: u32 = 0x0FFF_FFFF;

    /// Addresses every device on the group.
    pub const BROADCAST: Muid = Muid(Self::MAX);

    /// Start of the block reserved by MIDI-CI; never handed out by [`Muid::random`].
    const RESERVED_START: u32 = 0x0FFF_FF00;

    pub fn new(value: u32) -> Result<Self> {
        if value > Self::MAX {
            return Err(Error::MuidOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Draw a MUID outside the reserved range.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.gen_range(0..Self::RESERVED_START))
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn is_broadcast(self) -> bool {
        self == Self::BROADCAST
    }

    /// Four 7-bit bytes, least significant first.
    pub fn to_bytes(self) -> [u8; 4] {
        [
            (self.0 & 0x7F) as u8,
            ((self.0 >> 7) & 0x7F) as u8,
            ((self.0 >> 14) & 0x7F) as u8,
            ((self.0 >> 21) & 0x7F) as u8,
        ]
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Result<Self> {
        let mut value = 0u32;
        for (index, &byte) in bytes.iter().enumerate() {
            if byte & 0x80 != 0 {
                return Err(Error::MuidByte { index, value: byte });
            }
            value |= u32::from(byte) << (7 * index);
        }
        Ok(Self(value))
    }
}

impl TryFrom<u32> for Muid {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Muid> for u32 {
    fn from(muid: Muid) -> Self {
        muid.0
    }
}

impl fmt::Display for Muid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#09x}", self.0)
    }
}
