//! # bot-encoder
//!
//! Encoder for a compact, self-describing binary object format.
//!
//! - Every field is a name preceded by a one-byte [`Tag`]; fields equal to their default value are
//!   omitted, so sparse objects stay small
//! - Primitives cover the native integers and floats plus odd widths (3, 5, 6, 7, 12, 16, 24, 32
//!   and 64 bytes, see [`fixed`])
//! - Collection counts use the narrowest of eight [`SizeClass`]es, picked from the element count
//! - Nested and jagged arrays are flattened into a descriptor list plus dimension markers
//! - [`Combiner`] and [`Extractor`] pack unrelated small values into a single primitive slot
//!
//! The bytes themselves are produced by a [`Sink`]. [`StreamSink`] writes the reference layout to
//! any `std::io::Write`; [`RecordingSink`] records the calls.
//!
//! ## Derive Macro
//!
//! `#[derive(Serializable)]` implements [`Serializable`], [`Field`] and [`ArrayElement`] for a
//! struct. Field attributes:
//!
//! - `#[bot(rename = "name")]`: Writes the field under the given name.
//! - `#[bot(skip)]`: The field is neither written nor considered by `is_default`.
//! - `#[bot(size = "tiny")]`: Explicit size class for a collection field (`tiny`, `small`,
//!   `short`, `medium`, `large`, `big`, `great`, `huge`).
//!
//! `#[derive(Primitive)]` writes a type through its [`SerializedAs`] representation, as a scalar
//! field or an array leaf. With the container attribute `#[bot(repr = "u64")]` it also implements
//! `SerializedAs` by combining the fields, in declaration order, into the given scalar.
//!
//! ## Feature Flags
//!
//! - `indexmap`: `IndexMap` fields are written as dictionaries.
//! - `uuid`: `uuid::Uuid` is written in the 16-byte `Big` slot.
//! - `half`: `half::f16` is written in the 2-byte `Short` slot.

pub mod combiner;
pub mod core;
mod features;
pub mod fixed;
mod scalar;
pub mod shape;
pub mod sink;
mod writer;

pub use crate::core::*;
pub use bot_encoder_derive::{Primitive, Serializable};
pub use combiner::{Combiner, Extractor};
pub use fixed::*;
pub use scalar::Scalar;
pub use shape::{push_objects, push_serialized, resolve_shape, ArrayElement};
pub use sink::{RecordingSink, Sink, SinkEvent, StreamSink, DEFAULT_MAX_DEPTH};
pub use writer::{Writer, WriterBuilder};

use bytes::Bytes;

/// Errors that can occur while encoding.
///
/// None of them are recoverable within a session: output may already have reached the sink.
#[derive(Debug, thiserror::Error)]
pub enum EncoderError {
    /// A byte or type could not be mapped to a tag of the expected class.
    #[error("Classification error: {0}")]
    Classification(String),
    /// The session's name mode was not configured correctly.
    #[error("Mode error: {0}")]
    Mode(String),
    /// A count or length does not fit its size class, or a value has no primitive representation.
    #[error("Size error: {0}")]
    Size(String),
    /// A combiner or extractor ran out of bytes.
    #[error("Not enough bytes: needed {needed}, available {available}")]
    Bounds { needed: usize, available: usize },
    /// A collection's descriptor chain does not end in a leaf.
    #[error("Shape error: {0}")]
    Shape(String),
    /// Object nesting went past the sink's maximum depth.
    #[error("Maximum object depth of {max} exceeded")]
    Depth { max: u8 },
    #[error("Invalid field name: {0}")]
    InvalidName(String),
    /// Scope begin/end calls or leaf payloads are inconsistent.
    #[error("Scope error: {0}")]
    Scope(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, EncoderError>;

/// An object that writes its named fields through a [`Writer`].
///
/// Most users should use `#[derive(Serializable)]` instead of a manual implementation.
///
/// ```rust
/// use bot_encoder::{Result, Serializable, Sink, Tribyte, Writer};
///
/// struct Cell {
///     position: (i32, i32),
///     color: Tribyte,
/// }
///
/// impl Serializable for Cell {
///     fn is_default(&self) -> bool {
///         self.position == (0, 0) && self.color.is_zero()
///     }
///
///     fn write<S: Sink>(&self, writer: &mut Writer<S>) -> Result<()> {
///         writer.write("x", &self.position.0)?;
///         writer.write("y", &self.position.1)?;
///         writer.write("color", &self.color)
///     }
/// }
/// ```
pub trait Serializable {
    /// True when every field is default, in which case the whole object is omitted.
    fn is_default(&self) -> bool;

    /// Writes the fields. Called between the object's scope begin and end.
    fn write<S: Sink>(&self, writer: &mut Writer<S>) -> Result<()>;
}

/// A value that can be a named field.
///
/// Implemented for scalars, `Option`, `Box`, arrays (`Vec<T>`, `[T; N]`, `[T]`), blobs
/// (`bytes::Bytes`) and maps of scalars. `#[derive(Serializable)]` implements it for the derived
/// type as a nested object.
pub trait Field {
    /// True when the field must be omitted.
    fn is_default_value(&self) -> bool;

    /// Writes the field under `name`. `size` only matters for collections.
    fn write_field<S: Sink>(&self, writer: &mut Writer<S>, name: &str, size: SizeClass)
        -> Result<()>;
}

/// A type written through a primitive representation.
///
/// `#[derive(Primitive)]` turns an implementation into `Field` and `ArrayElement` impls, so the
/// type can be a scalar field or an array leaf.
///
/// ```rust
/// use bot_encoder::{Primitive, Result, SerializedAs};
///
/// #[derive(Primitive)]
/// struct Celsius(f64);
///
/// impl SerializedAs for Celsius {
///     type Repr = i16;
///
///     fn to_repr(&self) -> Result<i16> {
///         Ok((self.0 * 100.0).round() as i16)
///     }
/// }
/// ```
pub trait SerializedAs {
    type Repr: Scalar;

    fn to_repr(&self) -> Result<Self::Repr>;

    /// True when the representation is zero. A failed conversion is not default, so the error
    /// surfaces when the field is written.
    fn is_default_repr(&self) -> bool {
        self.to_repr().map_or(false, |repr| repr.is_zero())
    }
}

/// Convenience function to encode an object into the reference byte layout.
///
/// Uses default options and [`DEFAULT_MAX_DEPTH`]. A default object produces only the header.
///
/// # Example
/// ```rust
/// use bot_encoder::{to_bytes, Serializable};
///
/// #[derive(Serializable)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// let bytes = to_bytes("origin", &Point { x: 0, y: 0 }).unwrap();
/// assert_eq!(&bytes[..], &[0x00]);
/// ```
pub fn to_bytes<T: Serializable + ?Sized>(name: &str, value: &T) -> Result<Bytes> {
    let mut writer = Writer::new(StreamSink::in_memory(DEFAULT_MAX_DEPTH))?;
    writer.write_object(name, value)?;
    let out = writer.finish()?.close()?;
    Ok(Bytes::from(out))
}
