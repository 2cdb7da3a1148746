//! Synthetic 12-byte primary keys for imported readings.
//!
//! Layout matches a Mongo ObjectId built by hand: 4 bytes big-endian Unix
//! seconds, then 8 random bytes drawn per document. Collisions are not
//! checked for; a duplicate key fails the insert.

use core::fmt;
use rand::RngCore;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const KEY_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadingKey([u8; KEY_LEN]);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntheticIdError {
    /// Unix seconds do not fit the unsigned 4-byte prefix.
    OutOfRange(i64),
    InvalidLength(usize),
}

impl Display for SyntheticIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SyntheticIdError::OutOfRange(secs) => {
                write!(f, "unix time {} does not fit a 4-byte key prefix", secs)
            }
            SyntheticIdError::InvalidLength(n) => write!(f, "key must be {} bytes, got {}", KEY_LEN, n),
        }
    }
}

impl Error for SyntheticIdError {}

impl ReadingKey {
    pub fn generate_with<R: RngCore + ?Sized>(unix_seconds: i64, rng: &mut R) -> Result<Self, SyntheticIdError> {
        let secs = u32::try_from(unix_seconds).map_err(|_| SyntheticIdError::OutOfRange(unix_seconds))?;
        let mut bytes = [0u8; KEY_LEN];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        rng.fill_bytes(&mut bytes[4..]);
        Ok(ReadingKey(bytes))
    }

    pub fn unix_seconds(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    pub fn to_vec(self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl TryFrom<&[u8]> for ReadingKey {
    type Error = SyntheticIdError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; KEY_LEN] = value
            .try_into()
            .map_err(|_| SyntheticIdError::InvalidLength(value.len()))?;
        Ok(ReadingKey(bytes))
    }
}

impl Display for ReadingKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}
