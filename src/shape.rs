//! Flattening nested, possibly jagged collections.
//!
//! A collection field is described by a *descriptor list*: one tag per nesting level, outermost
//! first, ending in a primitive, object or blob tag. Each nested level's size class comes from the
//! widest member found anywhere at that level. Element types are uniform per level because they
//! are static Rust types, so only lengths need runtime inspection.
//!
//! After the header, the contents are pushed depth first: every nested run is announced by a
//! dimension marker carrying its length in the size class of the level above, then either recursed
//! into or pushed as one typed leaf run. Nested runs may be empty: the marker then carries 0 and
//! the leaf run holds no values.
//!
//! Nested sequences of bytes (`Vec<Vec<u8>>`, `Vec<[i8; 4]>`, ...) end in a blob descriptor
//! rather than an array of `U8` leaves, the same layout as an array of [`Bytes`].

use crate::scalar::put_run;
use crate::*;
use bytes::{Bytes, BytesMut};
use std::collections::{BTreeMap, HashMap};

/// A type that can appear as an element of an array field.
///
/// Implemented for every [`Scalar`], `Vec<T>` and `[T; N]` (nested levels), `bytes::Bytes`
/// (blob leaves), maps (dictionary levels, which cannot be nested in arrays) and, through
/// `#[derive(Serializable)]`, for objects.
pub trait ArrayElement: Sized {
    /// True for single-byte integers. Nested runs of such elements are described as blobs.
    const BYTE_LIKE: bool = false;

    /// Appends the descriptors for this level and everything below it.
    ///
    /// `members` holds every value of this type found at this level, across all outer members.
    fn describe(members: &[&Self], descriptors: &mut Vec<Tag>) -> Result<()>;

    /// Pushes the contents of `run`, a collection whose elements are described by
    /// `descriptors[depth]`. The dimension marker for `run` itself has already been pushed.
    fn push_members<S: Sink>(
        run: &[Self],
        writer: &mut Writer<S>,
        descriptors: &[Tag],
        depth: usize,
    ) -> Result<()>;
}

/// Builds the descriptor list of `items`.
///
/// # Errors
/// - `EncoderError::Shape` if no descriptor can be built or the chain does not end in a
///   primitive, object or blob tag (a dictionary nested inside an array).
/// - `EncoderError::Size` if `items` is empty.
pub fn resolve_shape<T: ArrayElement>(items: &[T]) -> Result<Vec<Tag>> {
    if items.is_empty() {
        return Err(EncoderError::Size(
            "count is 0, the collection must not be serialized".to_string(),
        ));
    }
    let members: Vec<&T> = items.iter().collect();
    let mut descriptors = Vec::new();
    T::describe(&members, &mut descriptors)?;
    match descriptors.last() {
        None => Err(EncoderError::Shape(
            "element type has no descriptor".to_string(),
        )),
        Some(last) if last.is_array() || last.is_dictionary() => Err(EncoderError::Shape(
            format!("descriptor chain {:?} has no terminal leaf", descriptors),
        )),
        Some(_) => {
            tracing::debug!(?descriptors, "resolved collection shape");
            Ok(descriptors)
        }
    }
}

/// Pushes `run` at `depth`, preceded by its dimension marker when nested.
pub fn push_run<T: ArrayElement, S: Sink>(
    run: &[T],
    writer: &mut Writer<S>,
    descriptors: &[Tag],
    depth: usize,
) -> Result<()> {
    if depth > 0 {
        let class = size_class_of(descriptors[depth - 1])?;
        writer.sink_mut().push_dimension(run.len() as u64, class)?;
    }
    T::push_members(run, writer, descriptors, depth)
}

/// Tag of a nested level whose longest member holds `widest` elements.
///
/// Dimension lengths are stored as is, so the class must hold `widest` itself rather than
/// `widest - 1`, and an all-empty level still gets the smallest class.
fn nested_tag<I: Iterator<Item = usize>>(kind: CollectionKind, lengths: I) -> Result<Tag> {
    let widest = lengths.max().unwrap_or(0) as u64;
    collection_tag(kind, SizeClass::Auto, widest + 1)
}

/// Descriptors of a nested level holding `T` elements.
fn describe_nested<T, M>(members: &[&M], descriptors: &mut Vec<Tag>) -> Result<()>
where
    T: ArrayElement,
    M: AsRef<[T]>,
{
    let runs: Vec<&[T]> = members.iter().map(|m| <M as AsRef<[T]>>::as_ref(*m)).collect();
    let lengths = runs.iter().map(|run| run.len());
    if T::BYTE_LIKE {
        descriptors.push(nested_tag(CollectionKind::Blob, lengths)?);
        return Ok(());
    }
    descriptors.push(nested_tag(CollectionKind::Array, lengths)?);
    let inner: Vec<&T> = runs.iter().flat_map(|run| run.iter()).collect();
    T::describe(&inner, descriptors)
}

macro_rules! impl_array_element_scalar {
    ($($ty:ty),*) => {
        $(
            impl ArrayElement for $ty {
                const BYTE_LIKE: bool = matches!(<$ty>::NATIVE, NativeType::U8 | NativeType::I8);

                fn describe(_members: &[&Self], descriptors: &mut Vec<Tag>) -> Result<()> {
                    descriptors.push(tag_of::<$ty>());
                    Ok(())
                }

                fn push_members<S: Sink>(
                    run: &[Self],
                    writer: &mut Writer<S>,
                    _descriptors: &[Tag],
                    _depth: usize,
                ) -> Result<()> {
                    let mut raw = BytesMut::with_capacity(run.len() * <$ty>::NATIVE.width());
                    put_run(run, &mut raw);
                    writer
                        .sink_mut()
                        .push_leaf_array(<$ty>::NATIVE, &raw, run.len() as u64)
                }
            }
        )*
    };
}

impl_array_element_scalar!(
    bool, u8, i8, u16, i16, u32, i32, f32, u64, i64, f64, Tribyte, Pentabyte, Hexabyte,
    Heptabyte, LargeInt, BigInt, GreatInt, HugeInt, GiantInt
);

/// Byte-like runs are pushed exactly like blobs: their marker uses the blob descriptor's class,
/// followed by one leaf run.
impl<T: ArrayElement> ArrayElement for Vec<T> {
    fn describe(members: &[&Self], descriptors: &mut Vec<Tag>) -> Result<()> {
        describe_nested::<T, Self>(members, descriptors)
    }

    fn push_members<S: Sink>(
        run: &[Self],
        writer: &mut Writer<S>,
        descriptors: &[Tag],
        depth: usize,
    ) -> Result<()> {
        for member in run {
            push_run(member, writer, descriptors, depth + 1)?;
        }
        Ok(())
    }
}

impl<T: ArrayElement, const N: usize> ArrayElement for [T; N] {
    fn describe(members: &[&Self], descriptors: &mut Vec<Tag>) -> Result<()> {
        describe_nested::<T, Self>(members, descriptors)
    }

    fn push_members<S: Sink>(
        run: &[Self],
        writer: &mut Writer<S>,
        descriptors: &[Tag],
        depth: usize,
    ) -> Result<()> {
        for member in run {
            push_run(member, writer, descriptors, depth + 1)?;
        }
        Ok(())
    }
}

/// Blob leaves: each blob is announced by its own length, in the blob descriptor's class.
impl ArrayElement for Bytes {
    fn describe(members: &[&Self], descriptors: &mut Vec<Tag>) -> Result<()> {
        descriptors.push(nested_tag(CollectionKind::Blob, members.iter().map(|m| m.len()))?);
        Ok(())
    }

    fn push_members<S: Sink>(
        run: &[Self],
        writer: &mut Writer<S>,
        descriptors: &[Tag],
        depth: usize,
    ) -> Result<()> {
        let class = size_class_of(descriptors[depth])?;
        let sink = writer.sink_mut();
        for blob in run {
            sink.push_dimension(blob.len() as u64, class)?;
            sink.push_leaf_array(NativeType::U8, blob, blob.len() as u64)?;
        }
        Ok(())
    }
}

fn nested_dictionary() -> EncoderError {
    EncoderError::Shape("dictionaries cannot be nested inside arrays".to_string())
}

/// Dictionaries contribute no descriptor, so arrays of them are never written.
impl<K, V, H> ArrayElement for HashMap<K, V, H> {
    fn describe(_members: &[&Self], _descriptors: &mut Vec<Tag>) -> Result<()> {
        Ok(())
    }

    fn push_members<S: Sink>(
        _run: &[Self],
        _writer: &mut Writer<S>,
        _descriptors: &[Tag],
        _depth: usize,
    ) -> Result<()> {
        Err(nested_dictionary())
    }
}

impl<K, V> ArrayElement for BTreeMap<K, V> {
    fn describe(_members: &[&Self], _descriptors: &mut Vec<Tag>) -> Result<()> {
        Ok(())
    }

    fn push_members<S: Sink>(
        _run: &[Self],
        _writer: &mut Writer<S>,
        _descriptors: &[Tag],
        _depth: usize,
    ) -> Result<()> {
        Err(nested_dictionary())
    }
}

/// Pushes a run of values as one leaf run of their representation.
///
/// Used by the `ArrayElement` impls generated by `#[derive(Primitive)]`. Every element is
/// converted before anything reaches the sink.
pub fn push_serialized<T: SerializedAs, S: Sink>(run: &[T], writer: &mut Writer<S>) -> Result<()> {
    let native = <T::Repr as Scalar>::NATIVE;
    let mut raw = BytesMut::with_capacity(run.len() * native.width());
    for value in run {
        value.to_repr()?.put_le(&mut raw);
    }
    writer
        .sink_mut()
        .push_leaf_array(native, &raw, run.len() as u64)
}

/// Pushes a run of object leaves, one anonymous object scope per element.
///
/// Default elements still get an (empty) scope so the element count is preserved. Used by the
/// `ArrayElement` impls generated by `#[derive(Serializable)]`.
pub fn push_objects<T: Serializable, S: Sink>(run: &[T], writer: &mut Writer<S>) -> Result<()> {
    for object in run {
        writer.sink_mut().begin_object("")?;
        object.write(writer)?;
        writer.sink_mut().end_object()?;
    }
    Ok(())
}
