//! Odd-width integer containers.
//!
//! Each type is an opaque little-endian byte vector of a fixed width. Widths up to 8 bytes convert
//! to and from the next larger native integer, truncating on the way in.

macro_rules! fixed_width {
    ($(#[$doc:meta])* $name:ident, $width:expr) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name([u8; $width]);

        impl $name {
            pub const WIDTH: usize = $width;

            /// Builds the value from its little-endian bytes.
            #[inline]
            pub const fn from_bytes(bytes: [u8; $width]) -> Self {
                Self(bytes)
            }

            #[inline]
            pub const fn to_bytes(self) -> [u8; $width] {
                self.0
            }

            #[inline]
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self([0; $width])
            }
        }

        impl From<[u8; $width]> for $name {
            fn from(bytes: [u8; $width]) -> Self {
                Self(bytes)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}(0x", stringify!($name))?;
                for b in self.0.iter().rev() {
                    write!(f, "{:02x}", b)?;
                }
                f.write_str(")")
            }
        }
    };
}

macro_rules! numeric_conversion {
    ($name:ident, $width:expr, $native:ty) => {
        impl From<$native> for $name {
            /// Keeps the low `WIDTH` bytes.
            fn from(value: $native) -> Self {
                let mut bytes = [0u8; $width];
                bytes.copy_from_slice(&value.to_le_bytes()[..$width]);
                Self(bytes)
            }
        }

        impl From<$name> for $native {
            fn from(value: $name) -> $native {
                let mut bytes = [0u8; std::mem::size_of::<$native>()];
                bytes[..$width].copy_from_slice(&value.0);
                <$native>::from_le_bytes(bytes)
            }
        }
    };
}

fixed_width!(
    /// 3-byte value.
    Tribyte,
    3
);
fixed_width!(
    /// 5-byte value.
    Pentabyte,
    5
);
fixed_width!(Hexabyte, 6);
fixed_width!(Heptabyte, 7);
fixed_width!(
    /// 12-byte value.
    LargeInt,
    12
);
fixed_width!(
    /// 16-byte value. A UUID fits exactly.
    BigInt,
    16
);
fixed_width!(GreatInt, 24);
fixed_width!(HugeInt, 32);
fixed_width!(
    /// 64-byte value, the widest primitive slot.
    GiantInt,
    64
);

numeric_conversion!(Tribyte, 3, u32);
numeric_conversion!(Pentabyte, 5, u64);
numeric_conversion!(Hexabyte, 6, u64);
numeric_conversion!(Heptabyte, 7, u64);
