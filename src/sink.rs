//! The byte-producing side of the encoder.
//!
//! A [`Writer`](crate::Writer) decides *what* to write; a [`Sink`] decides how it ends up as bytes.
//! Two sinks are provided:
//!
//! - [`StreamSink`] buffers the stream in memory and drains it to any `std::io::Write` on flush.
//! - [`RecordingSink`] records every call as a [`SinkEvent`], which is what the tests use to check
//!   the encoder's output shape without committing to a byte layout.

use crate::*;
use bytes::{BufMut, BytesMut};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Default maximum object nesting depth.
pub const DEFAULT_MAX_DEPTH: u8 = 10;

/// Contract between the encoder and whatever persists the stream.
///
/// A sink owns the scope stack of exactly one session. Any error leaves the stream in an
/// unspecified state and the whole session must be discarded.
pub trait Sink {
    /// Writes the file header.
    fn init(&mut self, options: Options) -> Result<()>;

    /// True when the file uses fixed-width names.
    fn has_name_length(&self) -> bool;

    fn has_full_width(&self) -> bool;

    /// Minimum size class for automatically sized collections, if the file declares one.
    fn full_width(&self) -> Option<SizeClass>;

    /// Declares the fixed name width. Only valid once, and only in fixed-name-length mode.
    fn set_name_length(&mut self, width: u8) -> Result<()>;

    fn begin_object(&mut self, name: &str) -> Result<()>;

    fn end_object(&mut self) -> Result<()>;

    /// Writes one primitive field. `raw` holds exactly `native.width()` little-endian bytes.
    fn write_scalar(&mut self, name: &str, native: NativeType, raw: &[u8]) -> Result<()>;

    /// Opens a collection field. `tag` already carries the kind and the size class.
    fn begin_collection(&mut self, name: &str, tag: Tag, count: u64) -> Result<()>;

    fn write_descriptor_list(&mut self, tags: &[Tag]) -> Result<()>;

    /// Writes the element count of the collection opened last.
    fn write_count(&mut self, count: u64) -> Result<()>;

    /// Marks the start of a nested dimension of `len` elements.
    fn push_dimension(&mut self, len: u64, class: SizeClass) -> Result<()>;

    /// Pushes `count` leaf values of one native type as a single run.
    fn push_leaf_array(&mut self, native: NativeType, raw: &[u8], count: u64) -> Result<()>;

    /// Pushes one dictionary entry.
    fn push_entry(
        &mut self,
        key: NativeType,
        key_raw: &[u8],
        value: NativeType,
        value_raw: &[u8],
    ) -> Result<()>;

    fn flush(&mut self) -> Result<()>;
}

/// Name-mode bookkeeping shared by the provided sinks.
#[derive(Debug, Default, Clone, Copy)]
struct NameRules {
    fixed: bool,
    width: Option<u8>,
}

impl NameRules {
    fn set_width(&mut self, width: u8) -> Result<()> {
        if !self.fixed {
            return Err(EncoderError::Mode(
                "name length can only be set when the fixed name length option is enabled"
                    .to_string(),
            ));
        }
        if self.width.is_some() {
            return Err(EncoderError::Mode(
                "name length is already set for this session".to_string(),
            ));
        }
        if width == 0 {
            return Err(EncoderError::Mode("name length must not be 0".to_string()));
        }
        self.width = Some(width);
        Ok(())
    }

    fn check(&self, name: &str) -> Result<()> {
        match (self.fixed, self.width) {
            (true, None) => Err(EncoderError::Mode(
                "fixed name length option is enabled but no name length was set".to_string(),
            )),
            (true, Some(width)) if name.len() > width as usize => Err(EncoderError::InvalidName(
                format!("'{}' is longer than the fixed name length {}", name, width),
            )),
            (false, _) if name.len() > u8::MAX as usize => Err(EncoderError::InvalidName(
                format!("'{}' is longer than {} bytes", name, u8::MAX),
            )),
            _ => Ok(()),
        }
    }
}

/// Object nesting counter.
#[derive(Debug, Clone, Copy)]
struct Depth {
    max: u8,
    current: u8,
}

impl Depth {
    fn enter(&mut self) -> Result<()> {
        if self.current >= self.max {
            return Err(EncoderError::Depth { max: self.max });
        }
        self.current += 1;
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        self.current = self.current.checked_sub(1).ok_or_else(|| {
            EncoderError::Scope("end_object called without an open object".to_string())
        })?;
        Ok(())
    }
}

fn check_run(native: NativeType, raw: &[u8], count: u64) -> Result<()> {
    if raw.len() as u64 != count * native.width() as u64 {
        return Err(EncoderError::Scope(format!(
            "{} bytes do not hold {} values of {:?}",
            raw.len(),
            count,
            native
        )));
    }
    Ok(())
}

fn resolved(class: SizeClass) -> Result<SizeClass> {
    if class == SizeClass::Auto {
        return Err(EncoderError::Size(
            "size class must be resolved before writing".to_string(),
        ));
    }
    Ok(class)
}

/// Dimension lengths are stored as is; a nested run may be empty.
fn unbiased(len: u64, class: SizeClass) -> Result<u64> {
    if len > resolved(class)?.max_value() {
        return Err(EncoderError::Size(format!(
            "length {} does not fit a {:?} prefix",
            len, class
        )));
    }
    Ok(len)
}

/// Collection counts are stored minus one, so zero cannot be represented.
fn biased(value: u64, class: SizeClass) -> Result<u64> {
    resolved(class)?;
    let stored = value
        .checked_sub(1)
        .ok_or_else(|| EncoderError::Size("count of 0 cannot be written".to_string()))?;
    if stored > class.max_value() {
        return Err(EncoderError::Size(format!(
            "{} does not fit a {:?} prefix",
            value, class
        )));
    }
    Ok(stored)
}

/// Byte sink writing the reference layout.
///
/// The stream is assembled in a `BytesMut` and drained into `inner` on [`flush`](Sink::flush).
/// Call [`close`](StreamSink::close) (or `flush`) before dropping it, nothing is written on drop.
///
/// Layout:
/// - header: option byte, then the name width byte in fixed-name-length mode
/// - name: `u8` length + UTF-8 bytes, or exactly `width` zero-padded bytes in fixed mode
/// - object: `0x00`, name, fields, `0xFF`
/// - scalar: tag, name, value
/// - collection: tag, name, descriptor count + descriptors (arrays and dictionaries), count,
///   payload; counts are stored minus one and dimension lengths as is, little-endian, in the
///   width of their size class
#[derive(Debug)]
pub struct StreamSink<W: Write> {
    inner: W,
    buffer: BytesMut,
    options: Options,
    names: NameRules,
    depth: Depth,
    header_class: Option<SizeClass>,
}

impl<W: Write> StreamSink<W> {
    pub fn new(inner: W, max_depth: u8) -> Self {
        Self {
            inner,
            buffer: BytesMut::new(),
            options: Options::default(),
            names: NameRules::default(),
            depth: Depth {
                max: max_depth,
                current: 0,
            },
            header_class: None,
        }
    }

    /// Current object nesting depth.
    pub fn depth(&self) -> u8 {
        self.depth.current
    }

    /// Bytes written since the last flush.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Flushes everything and hands back the underlying writer.
    ///
    /// # Errors
    /// Returns `EncoderError::Scope` if an object scope is still open.
    pub fn close(mut self) -> Result<W> {
        Sink::flush(&mut self)?;
        if self.depth.current != 0 {
            return Err(EncoderError::Scope(format!(
                "{} object scope(s) still open",
                self.depth.current
            )));
        }
        Ok(self.inner)
    }

    fn put_name(&mut self, name: &str) -> Result<()> {
        self.names.check(name)?;
        match self.names.width {
            Some(width) if self.names.fixed => {
                self.buffer.put_slice(name.as_bytes());
                self.buffer.put_bytes(0, width as usize - name.len());
            }
            _ => {
                self.buffer.put_u8(name.len() as u8);
                self.buffer.put_slice(name.as_bytes());
            }
        }
        Ok(())
    }
}

impl StreamSink<Vec<u8>> {
    pub fn in_memory(max_depth: u8) -> Self {
        Self::new(Vec::new(), max_depth)
    }
}

impl StreamSink<BufWriter<File>> {
    /// Creates (or truncates) the file at `path`.
    pub fn create(path: impl AsRef<Path>, max_depth: u8) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), max_depth))
    }
}

impl<W: Write> Sink for StreamSink<W> {
    fn init(&mut self, options: Options) -> Result<()> {
        self.options = options;
        self.names = NameRules {
            fixed: options.fixed_name_length,
            width: None,
        };
        self.buffer.put_u8(options.bits());
        Ok(())
    }

    fn has_name_length(&self) -> bool {
        self.options.fixed_name_length
    }

    fn has_full_width(&self) -> bool {
        self.options.full_width.is_some()
    }

    fn full_width(&self) -> Option<SizeClass> {
        self.options.full_width.map(FullWidth::size_class)
    }

    fn set_name_length(&mut self, width: u8) -> Result<()> {
        self.names.set_width(width)?;
        self.buffer.put_u8(width);
        Ok(())
    }

    fn begin_object(&mut self, name: &str) -> Result<()> {
        self.depth.enter()?;
        tracing::trace!(name, depth = self.depth.current, "begin object");
        self.buffer.put_u8(Tag::OBJECT.byte());
        self.put_name(name)
    }

    fn end_object(&mut self) -> Result<()> {
        self.depth.leave()?;
        tracing::trace!(depth = self.depth.current, "end object");
        self.buffer.put_u8(Tag::OBJECT_END.byte());
        Ok(())
    }

    fn write_scalar(&mut self, name: &str, native: NativeType, raw: &[u8]) -> Result<()> {
        check_run(native, raw, 1)?;
        self.buffer.put_u8(native.tag().byte());
        self.put_name(name)?;
        self.buffer.put_slice(raw);
        Ok(())
    }

    fn begin_collection(&mut self, name: &str, tag: Tag, count: u64) -> Result<()> {
        let class = size_class_of(tag)?;
        biased(count, class)?;
        self.header_class = Some(class);
        self.buffer.put_u8(tag.byte());
        self.put_name(name)
    }

    fn write_descriptor_list(&mut self, tags: &[Tag]) -> Result<()> {
        let len = u8::try_from(tags.len()).map_err(|_| {
            EncoderError::Size(format!("{} descriptors exceed the limit of 255", tags.len()))
        })?;
        self.buffer.put_u8(len);
        for tag in tags {
            self.buffer.put_u8(tag.byte());
        }
        Ok(())
    }

    fn write_count(&mut self, count: u64) -> Result<()> {
        let class = self.header_class.ok_or_else(|| {
            EncoderError::Scope("count written before any collection header".to_string())
        })?;
        let stored = biased(count, class)?;
        self.buffer.put_uint_le(stored, class.prefix_width());
        Ok(())
    }

    fn push_dimension(&mut self, len: u64, class: SizeClass) -> Result<()> {
        let stored = unbiased(len, class)?;
        self.buffer.put_uint_le(stored, class.prefix_width());
        Ok(())
    }

    fn push_leaf_array(&mut self, native: NativeType, raw: &[u8], count: u64) -> Result<()> {
        check_run(native, raw, count)?;
        self.buffer.put_slice(raw);
        Ok(())
    }

    fn push_entry(
        &mut self,
        key: NativeType,
        key_raw: &[u8],
        value: NativeType,
        value_raw: &[u8],
    ) -> Result<()> {
        check_run(key, key_raw, 1)?;
        check_run(value, value_raw, 1)?;
        self.buffer.put_slice(key_raw);
        self.buffer.put_slice(value_raw);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        tracing::trace!(bytes = self.buffer.len(), "flushing stream sink");
        self.inner.write_all(&self.buffer)?;
        self.buffer.clear();
        self.inner.flush()?;
        Ok(())
    }
}

/// One recorded sink call.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Init(Options),
    NameLength(u8),
    BeginObject(String),
    EndObject,
    Scalar {
        name: String,
        native: NativeType,
        raw: Vec<u8>,
    },
    BeginCollection {
        name: String,
        tag: Tag,
        count: u64,
    },
    Descriptors(Vec<Tag>),
    Count(u64),
    Dimension {
        len: u64,
        class: SizeClass,
    },
    LeafArray {
        native: NativeType,
        raw: Vec<u8>,
        count: u64,
    },
    Entry {
        key: NativeType,
        key_raw: Vec<u8>,
        value: NativeType,
        value_raw: Vec<u8>,
    },
    Flush,
}

/// Sink that keeps every call as a [`SinkEvent`].
///
/// Enforces the same name-mode and depth rules as [`StreamSink`].
#[derive(Debug)]
pub struct RecordingSink {
    events: Vec<SinkEvent>,
    options: Options,
    names: NameRules,
    depth: Depth,
}

impl RecordingSink {
    pub fn new(max_depth: u8) -> Self {
        Self {
            events: Vec::new(),
            options: Options::default(),
            names: NameRules::default(),
            depth: Depth {
                max: max_depth,
                current: 0,
            },
        }
    }

    pub fn events(&self) -> &[SinkEvent] {
        &self.events
    }

    /// Events after the header (`Init`, `NameLength`), without flushes.
    pub fn body(&self) -> Vec<&SinkEvent> {
        self.events
            .iter()
            .filter(|e| {
                !matches!(
                    e,
                    SinkEvent::Init(_) | SinkEvent::NameLength(_) | SinkEvent::Flush
                )
            })
            .collect()
    }

    pub fn into_events(self) -> Vec<SinkEvent> {
        self.events
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl Sink for RecordingSink {
    fn init(&mut self, options: Options) -> Result<()> {
        self.options = options;
        self.names = NameRules {
            fixed: options.fixed_name_length,
            width: None,
        };
        self.events.push(SinkEvent::Init(options));
        Ok(())
    }

    fn has_name_length(&self) -> bool {
        self.options.fixed_name_length
    }

    fn has_full_width(&self) -> bool {
        self.options.full_width.is_some()
    }

    fn full_width(&self) -> Option<SizeClass> {
        self.options.full_width.map(FullWidth::size_class)
    }

    fn set_name_length(&mut self, width: u8) -> Result<()> {
        self.names.set_width(width)?;
        self.events.push(SinkEvent::NameLength(width));
        Ok(())
    }

    fn begin_object(&mut self, name: &str) -> Result<()> {
        self.names.check(name)?;
        self.depth.enter()?;
        self.events.push(SinkEvent::BeginObject(name.to_string()));
        Ok(())
    }

    fn end_object(&mut self) -> Result<()> {
        self.depth.leave()?;
        self.events.push(SinkEvent::EndObject);
        Ok(())
    }

    fn write_scalar(&mut self, name: &str, native: NativeType, raw: &[u8]) -> Result<()> {
        self.names.check(name)?;
        self.events.push(SinkEvent::Scalar {
            name: name.to_string(),
            native,
            raw: raw.to_vec(),
        });
        Ok(())
    }

    fn begin_collection(&mut self, name: &str, tag: Tag, count: u64) -> Result<()> {
        self.names.check(name)?;
        self.events.push(SinkEvent::BeginCollection {
            name: name.to_string(),
            tag,
            count,
        });
        Ok(())
    }

    fn write_descriptor_list(&mut self, tags: &[Tag]) -> Result<()> {
        self.events.push(SinkEvent::Descriptors(tags.to_vec()));
        Ok(())
    }

    fn write_count(&mut self, count: u64) -> Result<()> {
        self.events.push(SinkEvent::Count(count));
        Ok(())
    }

    fn push_dimension(&mut self, len: u64, class: SizeClass) -> Result<()> {
        self.events.push(SinkEvent::Dimension { len, class });
        Ok(())
    }

    fn push_leaf_array(&mut self, native: NativeType, raw: &[u8], count: u64) -> Result<()> {
        self.events.push(SinkEvent::LeafArray {
            native,
            raw: raw.to_vec(),
            count,
        });
        Ok(())
    }

    fn push_entry(
        &mut self,
        key: NativeType,
        key_raw: &[u8],
        value: NativeType,
        value_raw: &[u8],
    ) -> Result<()> {
        self.events.push(SinkEvent::Entry {
            key,
            key_raw: key_raw.to_vec(),
            value,
            value_raw: value_raw.to_vec(),
        });
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.events.push(SinkEvent::Flush);
        Ok(())
    }
}
