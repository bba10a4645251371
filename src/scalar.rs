use crate::*;
use bytes::{Buf, BufMut};

pub(crate) mod sealed {
    use bytes::Buf;

    /// Reading back is crate-internal: callers must have checked that `reader` holds at least
    /// `NATIVE.width()` bytes, which `Combiner::to` and `Extractor::extract` do.
    pub trait Sealed: Sized {
        fn get_le(reader: &mut impl Buf) -> Self;
    }
}

/// A value that occupies exactly one primitive slot on the wire.
///
/// The set of implementors is closed: the native integer and float types, `bool`, and the
/// fixed-width types from [`crate::fixed`]. Values are always written little-endian, whatever the
/// host byte order.
///
/// Reading a value back is only possible through [`Extractor`] (or [`Combiner::to`]), which check
/// the length first:
///
/// ```rust,compile_fail
/// use bot_encoder::Scalar;
///
/// let mut empty: &[u8] = &[];
/// let _ = <u32 as Scalar>::get_le(&mut empty);
/// ```
pub trait Scalar: Copy + sealed::Sealed {
    /// Native type descriptor, which fixes the tag and the width.
    const NATIVE: NativeType;

    /// Appends the little-endian representation (`NATIVE.width()` bytes).
    fn put_le(&self, writer: &mut impl BufMut);

    /// True when the value equals the type's zero value and the field should be omitted.
    fn is_zero(&self) -> bool;
}

macro_rules! impl_scalar_int {
    ($($ty:ty => $native:ident, $put:ident, $get:ident;)*) => {
        $(
            impl sealed::Sealed for $ty {
                #[inline]
                fn get_le(reader: &mut impl Buf) -> Self {
                    reader.$get()
                }
            }

            impl Scalar for $ty {
                const NATIVE: NativeType = NativeType::$native;

                #[inline]
                fn put_le(&self, writer: &mut impl BufMut) {
                    writer.$put(*self);
                }

                #[inline]
                fn is_zero(&self) -> bool {
                    *self == 0
                }
            }
        )*
    };
}

impl_scalar_int! {
    u8 => U8, put_u8, get_u8;
    i8 => I8, put_i8, get_i8;
    u16 => U16, put_u16_le, get_u16_le;
    i16 => I16, put_i16_le, get_i16_le;
    u32 => U32, put_u32_le, get_u32_le;
    i32 => I32, put_i32_le, get_i32_le;
    u64 => U64, put_u64_le, get_u64_le;
    i64 => I64, put_i64_le, get_i64_le;
}

impl sealed::Sealed for bool {
    /// Any non-zero byte reads as `true`.
    #[inline]
    fn get_le(reader: &mut impl Buf) -> Self {
        reader.get_u8() != 0
    }
}

impl Scalar for bool {
    const NATIVE: NativeType = NativeType::Bool;

    #[inline]
    fn put_le(&self, writer: &mut impl BufMut) {
        writer.put_u8(*self as u8);
    }

    #[inline]
    fn is_zero(&self) -> bool {
        !*self
    }
}

// Floats compare by bit pattern so that -0.0 is still written.
impl sealed::Sealed for f32 {
    #[inline]
    fn get_le(reader: &mut impl Buf) -> Self {
        reader.get_f32_le()
    }
}

impl Scalar for f32 {
    const NATIVE: NativeType = NativeType::F32;

    #[inline]
    fn put_le(&self, writer: &mut impl BufMut) {
        writer.put_f32_le(*self);
    }

    #[inline]
    fn is_zero(&self) -> bool {
        self.to_bits() == 0
    }
}

impl sealed::Sealed for f64 {
    #[inline]
    fn get_le(reader: &mut impl Buf) -> Self {
        reader.get_f64_le()
    }
}

impl Scalar for f64 {
    const NATIVE: NativeType = NativeType::F64;

    #[inline]
    fn put_le(&self, writer: &mut impl BufMut) {
        writer.put_f64_le(*self);
    }

    #[inline]
    fn is_zero(&self) -> bool {
        self.to_bits() == 0
    }
}

macro_rules! impl_scalar_fixed {
    ($($ty:ident => $native:ident;)*) => {
        $(
            impl sealed::Sealed for $ty {
                fn get_le(reader: &mut impl Buf) -> Self {
                    let mut bytes = [0u8; $ty::WIDTH];
                    reader.copy_to_slice(&mut bytes);
                    $ty::from_bytes(bytes)
                }
            }

            impl Scalar for $ty {
                const NATIVE: NativeType = NativeType::$native;

                #[inline]
                fn put_le(&self, writer: &mut impl BufMut) {
                    writer.put_slice(self.as_bytes());
                }

                #[inline]
                fn is_zero(&self) -> bool {
                    $ty::is_zero(self)
                }
            }
        )*
    };
}

impl_scalar_fixed! {
    Tribyte => Tribyte;
    Pentabyte => Pentabyte;
    Hexabyte => Hexabyte;
    Heptabyte => Heptabyte;
    LargeInt => Large;
    BigInt => Big;
    GreatInt => Great;
    HugeInt => Huge;
    GiantInt => Giant;
}

/// Appends the little-endian bytes of every value in `values`.
pub(crate) fn put_run<T: Scalar>(values: &[T], writer: &mut impl BufMut) {
    for value in values {
        value.put_le(writer);
    }
}
