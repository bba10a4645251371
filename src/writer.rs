use crate::shape::{push_run, resolve_shape};
use crate::*;
use bytes::{Bytes, BytesMut};
use std::collections::{BTreeMap, HashMap};

/// Session configuration for a [`Writer`].
///
/// The name mode is resolved here, once: a `Writer` only exists after [`build`](Self::build) has
/// initialised the sink and, in fixed-name-length mode, declared the name width.
///
/// ```rust
/// use bot_encoder::{RecordingSink, Writer};
///
/// let mut writer = Writer::builder(RecordingSink::default())
///     .fixed_name_length(8)
///     .build()
///     .unwrap();
/// writer.write("answer", &42u32).unwrap();
/// ```
#[derive(Debug)]
pub struct WriterBuilder<S: Sink> {
    sink: S,
    options: Options,
    name_length: Option<u8>,
}

impl<S: Sink> WriterBuilder<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            options: Options::default(),
            name_length: None,
        }
    }

    /// Replaces all file options.
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Enables fixed-width names of `width` bytes.
    pub fn fixed_name_length(mut self, width: u8) -> Self {
        self.options.fixed_name_length = true;
        self.name_length = Some(width);
        self
    }

    pub fn full_width(mut self, width: FullWidth) -> Self {
        self.options.full_width = Some(width);
        self
    }

    /// Writes the file header and returns the writable session.
    ///
    /// # Errors
    /// Returns `EncoderError::Mode` if fixed-name-length mode is enabled without a width.
    pub fn build(mut self) -> Result<Writer<S>> {
        self.sink.init(self.options)?;
        if self.sink.has_name_length() {
            let width = self.name_length.ok_or_else(|| {
                EncoderError::Mode(
                    "fixed name length option is enabled but no name length was given"
                        .to_string(),
                )
            })?;
            self.sink.set_name_length(width)?;
        }
        Ok(Writer { sink: self.sink })
    }
}

/// Streams named fields into a [`Sink`].
///
/// The writer keeps no copy of anything it is given. Every failure is fatal to the session:
/// partial output may already have reached the sink.
#[derive(Debug)]
pub struct Writer<S: Sink> {
    sink: S,
}

impl<S: Sink> Writer<S> {
    pub fn builder(sink: S) -> WriterBuilder<S> {
        WriterBuilder::new(sink)
    }

    /// Writer with default options (variable-length names, no full width).
    pub fn new(sink: S) -> Result<Self> {
        WriterBuilder::new(sink).build()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Direct access to the sink, for `ArrayElement` implementations pushing their own payload.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Flushes and returns the sink.
    pub fn finish(mut self) -> Result<S> {
        self.sink.flush()?;
        Ok(self.sink)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()
    }

    /// Writes any field. Default values are omitted.
    pub fn write<F: Field + ?Sized>(&mut self, name: &str, value: &F) -> Result<()> {
        self.write_sized(name, value, SizeClass::Auto)
    }

    /// Same as [`write`](Self::write) with an explicit size class for collection fields.
    pub fn write_sized<F: Field + ?Sized>(
        &mut self,
        name: &str,
        value: &F,
        size: SizeClass,
    ) -> Result<()> {
        if value.is_default_value() {
            return Ok(());
        }
        value.write_field(self, name, size)
    }

    /// Writes one primitive field, unless it is zero.
    pub fn write_scalar<T: Scalar>(&mut self, name: &str, value: T) -> Result<()> {
        if value.is_zero() {
            return Ok(());
        }
        let mut raw = BytesMut::with_capacity(T::NATIVE.width());
        value.put_le(&mut raw);
        self.sink.write_scalar(name, T::NATIVE, &raw)
    }

    /// Writes a value through its primitive representation, unless that is zero.
    pub fn write_serialized<T: SerializedAs + ?Sized>(
        &mut self,
        name: &str,
        value: &T,
    ) -> Result<()> {
        let repr = value.to_repr()?;
        self.write_scalar(name, repr)
    }

    /// Writes a nested object scope, unless the object is default.
    pub fn write_object<T: Serializable + ?Sized>(&mut self, name: &str, object: &T) -> Result<()> {
        if object.is_default() {
            return Ok(());
        }
        self.sink.begin_object(name)?;
        object.write(self)?;
        self.sink.end_object()
    }

    /// Writes an array field: header, descriptor list, count, then the contents.
    ///
    /// Empty arrays are omitted; empty nested members are written with a length of 0. Arrays whose
    /// shape cannot be described (dictionaries nested inside arrays) are omitted with a warning.
    pub fn write_array<T: ArrayElement>(
        &mut self,
        name: &str,
        items: &[T],
        size: SizeClass,
    ) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let descriptors = match resolve_shape(items) {
            Ok(descriptors) => descriptors,
            Err(EncoderError::Shape(reason)) => {
                tracing::warn!(field = name, %reason, "array field omitted");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let count = items.len() as u64;
        let tag = self.header_tag(CollectionKind::Array, size, count)?;
        tracing::debug!(field = name, ?tag, count, "writing array");
        self.sink.begin_collection(name, tag, count)?;
        self.sink.write_descriptor_list(&descriptors)?;
        self.sink.write_count(count)?;
        push_run(items, self, &descriptors, 0)
    }

    /// Writes a dictionary field: header, `[key tag, value tag]`, count, one entry per pair.
    pub fn write_dictionary<'a, K, V, I>(
        &mut self,
        name: &str,
        entries: I,
        size: SizeClass,
    ) -> Result<()>
    where
        K: Scalar + 'a,
        V: Scalar + 'a,
        I: IntoIterator<Item = (&'a K, &'a V)>,
        I::IntoIter: ExactSizeIterator,
    {
        let entries = entries.into_iter();
        let count = entries.len() as u64;
        if count == 0 {
            return Ok(());
        }
        let tag = self.header_tag(CollectionKind::Dictionary, size, count)?;
        tracing::debug!(field = name, ?tag, count, "writing dictionary");
        self.sink.begin_collection(name, tag, count)?;
        self.sink
            .write_descriptor_list(&[tag_of::<K>(), tag_of::<V>()])?;
        self.sink.write_count(count)?;
        let mut key_raw = BytesMut::with_capacity(K::NATIVE.width());
        let mut value_raw = BytesMut::with_capacity(V::NATIVE.width());
        for (key, value) in entries {
            key_raw.clear();
            value_raw.clear();
            key.put_le(&mut key_raw);
            value.put_le(&mut value_raw);
            self.sink
                .push_entry(K::NATIVE, &key_raw, V::NATIVE, &value_raw)?;
        }
        Ok(())
    }

    /// Writes a blob field: header, byte count, then the bytes as one run.
    pub fn write_blob(&mut self, name: &str, bytes: &[u8], size: SizeClass) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let count = bytes.len() as u64;
        let tag = self.header_tag(CollectionKind::Blob, size, count)?;
        tracing::debug!(field = name, ?tag, count, "writing blob");
        self.sink.begin_collection(name, tag, count)?;
        self.sink.write_count(count)?;
        self.sink.push_leaf_array(NativeType::U8, bytes, count)
    }

    /// Header tag for a collection; `Auto` honours the file's full width as a minimum.
    fn header_tag(&self, kind: CollectionKind, size: SizeClass, count: u64) -> Result<Tag> {
        let mut class = size.resolve(count)?;
        if size == SizeClass::Auto {
            if let Some(minimum) = self.sink.full_width() {
                class = class.max(minimum);
            }
        }
        collection_tag(kind, class, count)
    }
}

// --- Field impls ---

macro_rules! impl_field_scalar {
    ($($ty:ty),*) => {
        $(
            impl Field for $ty {
                #[inline]
                fn is_default_value(&self) -> bool {
                    self.is_zero()
                }

                fn write_field<S: Sink>(
                    &self,
                    writer: &mut Writer<S>,
                    name: &str,
                    _size: SizeClass,
                ) -> Result<()> {
                    writer.write_scalar(name, *self)
                }
            }
        )*
    };
}

impl_field_scalar!(
    bool, u8, i8, u16, i16, u32, i32, f32, u64, i64, f64, Tribyte, Pentabyte, Hexabyte,
    Heptabyte, LargeInt, BigInt, GreatInt, HugeInt, GiantInt
);

/// `None` is omitted like any other default value.
impl<T: Field> Field for Option<T> {
    fn is_default_value(&self) -> bool {
        match self {
            Some(value) => value.is_default_value(),
            None => true,
        }
    }

    fn write_field<S: Sink>(&self, writer: &mut Writer<S>, name: &str, size: SizeClass) -> Result<()> {
        match self {
            Some(value) => value.write_field(writer, name, size),
            None => Ok(()),
        }
    }
}

impl<T: Field + ?Sized> Field for Box<T> {
    fn is_default_value(&self) -> bool {
        (**self).is_default_value()
    }

    fn write_field<S: Sink>(&self, writer: &mut Writer<S>, name: &str, size: SizeClass) -> Result<()> {
        (**self).write_field(writer, name, size)
    }
}

impl<T: ArrayElement> Field for Vec<T> {
    fn is_default_value(&self) -> bool {
        self.is_empty()
    }

    fn write_field<S: Sink>(&self, writer: &mut Writer<S>, name: &str, size: SizeClass) -> Result<()> {
        writer.write_array(name, self, size)
    }
}

impl<T: ArrayElement, const N: usize> Field for [T; N] {
    fn is_default_value(&self) -> bool {
        N == 0
    }

    fn write_field<S: Sink>(&self, writer: &mut Writer<S>, name: &str, size: SizeClass) -> Result<()> {
        writer.write_array(name, self, size)
    }
}

impl<T: ArrayElement> Field for [T] {
    fn is_default_value(&self) -> bool {
        self.is_empty()
    }

    fn write_field<S: Sink>(&self, writer: &mut Writer<S>, name: &str, size: SizeClass) -> Result<()> {
        writer.write_array(name, self, size)
    }
}

/// `Bytes` is the blob type. A top-level `Vec<u8>` stays an array of bytes, while byte sequences
/// nested inside arrays become blob leaves.
impl Field for Bytes {
    fn is_default_value(&self) -> bool {
        self.is_empty()
    }

    fn write_field<S: Sink>(&self, writer: &mut Writer<S>, name: &str, size: SizeClass) -> Result<()> {
        writer.write_blob(name, self, size)
    }
}

impl<K: Scalar, V: Scalar, H> Field for HashMap<K, V, H> {
    fn is_default_value(&self) -> bool {
        self.is_empty()
    }

    fn write_field<S: Sink>(&self, writer: &mut Writer<S>, name: &str, size: SizeClass) -> Result<()> {
        writer.write_dictionary(name, self.iter(), size)
    }
}

impl<K: Scalar, V: Scalar> Field for BTreeMap<K, V> {
    fn is_default_value(&self) -> bool {
        self.is_empty()
    }

    fn write_field<S: Sink>(&self, writer: &mut Writer<S>, name: &str, size: SizeClass) -> Result<()> {
        writer.write_dictionary(name, self.iter(), size)
    }
}
