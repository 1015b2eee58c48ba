//! Byte archive for the cluster payload
//!
//! One `map_*` call both writes (saving) and reads (loading) a field, so the
//! field order is declared once and cannot drift between the two directions.

use bytemuck::Pod;

/// Cluster payload could not be decoded
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ArchiveError {
    /// Fewer bytes than the next field needs
    #[error("payload truncated: {needed} bytes needed, {available} available")]
    Truncated {
        /// Bytes the field needs
        needed: usize,
        /// Bytes left in the payload
        available: usize,
    },

    /// Sender runs a different protocol or payload version
    #[error("payload version {major}.{minor} (data {data}) is not supported")]
    VersionMismatch {
        /// Sender's major version
        major: u32,
        /// Sender's minor version
        minor: u32,
        /// Sender's payload data version
        data: u32,
    },
}

enum Mode<'a> {
    Saving(&'a mut Vec<u8>),
    Loading { bytes: &'a [u8], cursor: usize },
}

/// Bidirectional byte archive
pub struct Archive<'a> {
    mode: Mode<'a>,
}

impl<'a> Archive<'a> {
    /// Archive appending mapped fields to `out`
    pub fn saving(out: &'a mut Vec<u8>) -> Self {
        Self {
            mode: Mode::Saving(out),
        }
    }

    /// Archive reading mapped fields from `bytes`
    pub const fn loading(bytes: &'a [u8]) -> Self {
        Self {
            mode: Mode::Loading { bytes, cursor: 0 },
        }
    }

    /// Whether fields are being written
    pub const fn is_saving(&self) -> bool {
        matches!(self.mode, Mode::Saving(_))
    }

    /// Write or read raw bytes
    pub fn map_bytes(&mut self, value: &mut [u8]) -> Result<(), ArchiveError> {
        match &mut self.mode {
            Mode::Saving(out) => out.extend_from_slice(value),
            Mode::Loading { bytes, cursor } => {
                let available = bytes.len() - *cursor;
                if available < value.len() {
                    return Err(ArchiveError::Truncated {
                        needed: value.len(),
                        available,
                    });
                }
                value.copy_from_slice(&bytes[*cursor..*cursor + value.len()]);
                *cursor += value.len();
            }
        }
        Ok(())
    }

    /// Write or read a plain-old-data value in native byte order
    pub fn map_pod<T: Pod>(&mut self, value: &mut T) -> Result<(), ArchiveError> {
        self.map_bytes(bytemuck::bytes_of_mut(value))
    }

    /// Write or read a `u32`
    pub fn map_u32(&mut self, value: &mut u32) -> Result<(), ArchiveError> {
        self.map_pod(value)
    }

    /// Write or read a `bool` as one byte
    pub fn map_bool(&mut self, value: &mut bool) -> Result<(), ArchiveError> {
        let mut byte = u8::from(*value);
        self.map_pod(&mut byte)?;
        *value = byte != 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_come_back_in_order() {
        let mut bytes = Vec::new();
        let mut ar = Archive::saving(&mut bytes);
        assert!(ar.is_saving());
        ar.map_u32(&mut 7).unwrap();
        ar.map_bool(&mut true).unwrap();
        ar.map_pod(&mut 2.5_f64).unwrap();
        assert_eq!(bytes.len(), 4 + 1 + 8);

        let mut ar = Archive::loading(&bytes);
        let (mut number, mut flag, mut value) = (0_u32, false, 0.0_f64);
        ar.map_u32(&mut number).unwrap();
        ar.map_bool(&mut flag).unwrap();
        ar.map_pod(&mut value).unwrap();
        assert_eq!((number, flag, value), (7, true, 2.5));
    }

    #[test]
    fn test_truncated_payload() {
        let bytes = [1_u8, 0];
        let mut ar = Archive::loading(&bytes);
        let mut number = 0_u32;
        assert_eq!(
            ar.map_u32(&mut number),
            Err(ArchiveError::Truncated {
                needed: 4,
                available: 2
            })
        );
    }
}
