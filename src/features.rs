#[cfg(feature = "indexmap")]
use indexmap::IndexMap;
#[cfg(feature = "uuid")]
use uuid::Uuid;
#[cfg(feature = "half")]
use half::f16;

#[allow(unused_imports)]
use crate::*;

// --- IndexMap ---
/// Written as a dictionary, in insertion order.
#[cfg(feature = "indexmap")]
impl<K: Scalar, V: Scalar, H> Field for IndexMap<K, V, H> {
    fn is_default_value(&self) -> bool {
        self.is_empty()
    }

    fn write_field<S: Sink>(&self, writer: &mut Writer<S>, name: &str, size: SizeClass) -> Result<()> {
        writer.write_dictionary(name, self.iter(), size)
    }
}

#[cfg(feature = "indexmap")]
impl<K, V, H> ArrayElement for IndexMap<K, V, H> {
    fn describe(_members: &[&Self], _descriptors: &mut Vec<Tag>) -> Result<()> {
        Ok(())
    }

    fn push_members<S: Sink>(
        _run: &[Self],
        _writer: &mut Writer<S>,
        _descriptors: &[Tag],
        _depth: usize,
    ) -> Result<()> {
        Err(EncoderError::Shape(
            "dictionaries cannot be nested inside arrays".to_string(),
        ))
    }
}

// Foreign leaf types go through `SerializedAs`, the same path `#[derive(Primitive)]` generates.
#[allow(unused_macros)]
macro_rules! impl_field_via_repr {
    ($ty:ty) => {
        impl Field for $ty {
            fn is_default_value(&self) -> bool {
                self.is_default_repr()
            }

            fn write_field<S: Sink>(
                &self,
                writer: &mut Writer<S>,
                name: &str,
                _size: SizeClass,
            ) -> Result<()> {
                writer.write_serialized(name, self)
            }
        }

        impl ArrayElement for $ty {
            fn describe(_members: &[&Self], descriptors: &mut Vec<Tag>) -> Result<()> {
                descriptors.push(tag_of::<<$ty as SerializedAs>::Repr>());
                Ok(())
            }

            fn push_members<S: Sink>(
                run: &[Self],
                writer: &mut Writer<S>,
                _descriptors: &[Tag],
                _depth: usize,
            ) -> Result<()> {
                push_serialized(run, writer)
            }
        }
    };
}

// --- Uuid ---
/// A UUID occupies the 16-byte `Big` slot, bytes in RFC 4122 order. The nil UUID is omitted.
#[cfg(feature = "uuid")]
impl SerializedAs for Uuid {
    type Repr = BigInt;

    fn to_repr(&self) -> Result<BigInt> {
        Ok(BigInt::from_bytes(*self.as_bytes()))
    }
}

#[cfg(feature = "uuid")]
impl_field_via_repr!(Uuid);

// --- f16 ---
/// Half floats share the `Short` slot with 16-bit integers and compare by bit pattern, so `-0.0`
/// is written.
#[cfg(feature = "half")]
impl SerializedAs for f16 {
    type Repr = u16;

    fn to_repr(&self) -> Result<u16> {
        Ok(self.to_bits())
    }
}

#[cfg(feature = "half")]
impl_field_via_repr!(f16);
