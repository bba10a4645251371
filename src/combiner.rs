//! Packing several small values into one primitive slot, and back.
//!
//! A [`Combiner`] appends values one after the other and converts the accumulated bytes into a
//! single scalar. An [`Extractor`] takes that scalar apart in the same order. Neither is tied to a
//! [`Writer`](crate::Writer); any `Serializable::write` implementation may use them.
//!
//! ```rust
//! use bot_encoder::{Combiner, Extractor, Tribyte};
//!
//! let t: Tribyte = Combiner::with_capacity(3)
//!     .combine(255u8)
//!     .combine(10u8)
//!     .combine(180u8)
//!     .to()
//!     .unwrap();
//! assert_eq!(u32::from(t), 0xB4_0A_FF);
//!
//! let mut extractor = Extractor::new(t);
//! assert_eq!(extractor.extract::<u8>().unwrap(), 255);
//! assert_eq!(extractor.extract::<u8>().unwrap(), 10);
//! assert_eq!(extractor.extract::<u8>().unwrap(), 180);
//! ```

use crate::*;
use crate::scalar::sealed::Sealed;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Accumulates little-endian bytes of successive values.
#[derive(Debug, Default, Clone)]
pub struct Combiner {
    data: BytesMut,
}

impl Combiner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use when the total number of bytes to combine is known.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
        }
    }

    /// Appends `value` in little-endian order.
    pub fn combine<T: Scalar>(mut self, value: T) -> Self {
        value.put_le(&mut self.data);
        self
    }

    /// Appends raw bytes as they are, without any byte order correction.
    pub fn combine_bytes(mut self, bytes: &[u8]) -> Self {
        self.data.put_slice(bytes);
        self
    }

    /// Number of bytes accumulated so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Converts the first `T::NATIVE.width()` accumulated bytes into a `T`.
    ///
    /// # Errors
    /// Returns `EncoderError::Bounds` if fewer bytes than `T` requires have been accumulated.
    pub fn to<T: Scalar>(&self) -> Result<T> {
        let needed = T::NATIVE.width();
        if self.data.len() < needed {
            return Err(EncoderError::Bounds {
                needed,
                available: self.data.len(),
            });
        }
        let mut reader = &self.data[..needed];
        Ok(<T as Sealed>::get_le(&mut reader))
    }

    /// Converts every accumulated byte into a `T`, zero-filling the bytes above them.
    ///
    /// # Errors
    /// Returns `EncoderError::Size` if more bytes than `T` holds have been accumulated.
    pub fn to_padded<T: Scalar>(&self) -> Result<T> {
        let width = T::NATIVE.width();
        if self.data.len() > width {
            return Err(EncoderError::Size(format!(
                "{} combined bytes do not fit {:?}",
                self.data.len(),
                T::NATIVE
            )));
        }
        let mut padded = BytesMut::with_capacity(width);
        padded.put_slice(&self.data);
        padded.put_bytes(0, width - self.data.len());
        let mut reader = &padded[..];
        Ok(<T as Sealed>::get_le(&mut reader))
    }
}

/// Consumes values sequentially from the bytes of one scalar.
#[derive(Debug, Clone)]
pub struct Extractor {
    data: Bytes,
}

impl Extractor {
    /// Starts extracting from the little-endian representation of `value`.
    pub fn new<T: Scalar>(value: T) -> Self {
        let mut data = BytesMut::with_capacity(T::NATIVE.width());
        value.put_le(&mut data);
        Self {
            data: data.freeze(),
        }
    }

    /// Starts extracting from raw little-endian bytes.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self { data: bytes.into() }
    }

    /// Bytes left to extract.
    pub fn remaining(&self) -> usize {
        self.data.remaining()
    }

    /// Reads the next `T` and advances the cursor.
    ///
    /// # Errors
    /// Returns `EncoderError::Bounds` if fewer bytes than `T` requires remain.
    pub fn extract<T: Scalar>(&mut self) -> Result<T> {
        let needed = T::NATIVE.width();
        self.check(needed)?;
        Ok(<T as Sealed>::get_le(&mut self.data))
    }

    /// Same as [`extract`](Self::extract), storing into `out` so calls can be chained.
    pub fn extract_into<T: Scalar>(&mut self, out: &mut T) -> Result<&mut Self> {
        *out = self.extract()?;
        Ok(self)
    }

    /// Reads the next `len` bytes as they are.
    pub fn extract_bytes(&mut self, len: usize) -> Result<Bytes> {
        self.check(len)?;
        Ok(self.data.split_to(len))
    }

    fn check(&self, needed: usize) -> Result<()> {
        if self.data.remaining() < needed {
            return Err(EncoderError::Bounds {
                needed,
                available: self.data.remaining(),
            });
        }
        Ok(())
    }
}
