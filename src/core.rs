use crate::*;

/// A single byte identifying what follows in the stream.
///
/// The tag space is partitioned into fixed ranges:
///
/// - `0x00` opens an object scope, `0xFF` closes it.
/// - `0x01..=0x0E` are primitives, ordered by width.
/// - `0x0F..=0x16` arrays, `0x17..=0x1E` dictionaries, `0x1F..=0x26` blobs. Each block spans the
///   eight size classes `Tiny..=Huge`, so a collection tag is always `kind base + size class`.
///
/// Tags are stable and part of the wire format.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(u8);

impl Tag {
    pub const OBJECT: Tag = Tag(0x00);
    pub const BOOL: Tag = Tag(0x01);
    pub const BYTE: Tag = Tag(0x02);
    pub const SHORT: Tag = Tag(0x03);
    pub const TRIBYTE: Tag = Tag(0x04);
    /// 4 bytes, shared by `u32`, `i32` and `f32`
    pub const INT: Tag = Tag(0x05);
    pub const PENTABYTE: Tag = Tag(0x06);
    pub const HEXABYTE: Tag = Tag(0x07);
    pub const HEPTABYTE: Tag = Tag(0x08);
    /// 8 bytes, shared by `u64`, `i64` and `f64`
    pub const LONG: Tag = Tag(0x09);
    pub const LARGE: Tag = Tag(0x0A);
    pub const BIG: Tag = Tag(0x0B);
    pub const GREAT: Tag = Tag(0x0C);
    pub const HUGE: Tag = Tag(0x0D);
    pub const GIANT: Tag = Tag(0x0E);

    pub const TINY_ARRAY: Tag = Tag(0x0F);
    pub const SMALL_ARRAY: Tag = Tag(0x10);
    pub const SHORT_ARRAY: Tag = Tag(0x11);
    pub const MEDIUM_ARRAY: Tag = Tag(0x12);
    pub const LARGE_ARRAY: Tag = Tag(0x13);
    pub const BIG_ARRAY: Tag = Tag(0x14);
    pub const GREAT_ARRAY: Tag = Tag(0x15);
    pub const HUGE_ARRAY: Tag = Tag(0x16);

    pub const TINY_DICT: Tag = Tag(0x17);
    pub const SMALL_DICT: Tag = Tag(0x18);
    pub const SHORT_DICT: Tag = Tag(0x19);
    pub const MEDIUM_DICT: Tag = Tag(0x1A);
    pub const LARGE_DICT: Tag = Tag(0x1B);
    pub const BIG_DICT: Tag = Tag(0x1C);
    pub const GREAT_DICT: Tag = Tag(0x1D);
    pub const HUGE_DICT: Tag = Tag(0x1E);

    pub const TINY_BLOB: Tag = Tag(0x1F);
    pub const SMALL_BLOB: Tag = Tag(0x20);
    pub const SHORT_BLOB: Tag = Tag(0x21);
    pub const MEDIUM_BLOB: Tag = Tag(0x22);
    pub const LARGE_BLOB: Tag = Tag(0x23);
    pub const BIG_BLOB: Tag = Tag(0x24);
    pub const GREAT_BLOB: Tag = Tag(0x25);
    pub const HUGE_BLOB: Tag = Tag(0x26);

    /// Closes an object scope
    pub const OBJECT_END: Tag = Tag(0xFF);

    /// The raw byte written on the wire.
    #[inline]
    pub const fn byte(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn is_object(self) -> bool {
        self == Tag::OBJECT
    }

    #[inline]
    pub fn is_primitive(self) -> bool {
        (Tag::BOOL..=Tag::GIANT).contains(&self)
    }

    #[inline]
    pub fn is_collection(self) -> bool {
        (Tag::TINY_ARRAY..=Tag::HUGE_BLOB).contains(&self)
    }

    #[inline]
    pub fn is_array(self) -> bool {
        (Tag::TINY_ARRAY..=Tag::HUGE_ARRAY).contains(&self)
    }

    #[inline]
    pub fn is_dictionary(self) -> bool {
        (Tag::TINY_DICT..=Tag::HUGE_DICT).contains(&self)
    }

    #[inline]
    pub fn is_blob(self) -> bool {
        (Tag::TINY_BLOB..=Tag::HUGE_BLOB).contains(&self)
    }

    #[inline]
    pub fn is_special(self) -> bool {
        self == Tag::OBJECT_END
    }

    /// The collection kind of this tag, if it is a collection tag.
    pub fn collection_kind(self) -> Option<CollectionKind> {
        if self.is_array() {
            Some(CollectionKind::Array)
        } else if self.is_dictionary() {
            Some(CollectionKind::Dictionary)
        } else if self.is_blob() {
            Some(CollectionKind::Blob)
        } else {
            None
        }
    }

    fn name(self) -> &'static str {
        const PRIMITIVES: [&str; 15] = [
            "Object", "Bool", "Byte", "Short", "Tribyte", "Int", "Pentabyte", "Hexabyte",
            "Heptabyte", "Long", "Large", "Big", "Great", "Huge", "Giant",
        ];
        match self.collection_kind() {
            Some(CollectionKind::Array) => "Array",
            Some(CollectionKind::Dictionary) => "Dict",
            Some(CollectionKind::Blob) => "Blob",
            None if self.is_special() => "Object_End",
            None => PRIMITIVES[self.0 as usize],
        }
    }
}

impl TryFrom<u8> for Tag {
    type Error = EncoderError;

    fn try_from(byte: u8) -> Result<Self> {
        let tag = Tag(byte);
        if byte <= Tag::HUGE_BLOB.0 || tag.is_special() {
            Ok(tag)
        } else {
            Err(EncoderError::Classification(format!(
                "0x{:02X} is not a valid tag",
                byte
            )))
        }
    }
}

impl From<Tag> for u8 {
    fn from(tag: Tag) -> u8 {
        tag.0
    }
}

impl std::fmt::Debug for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self
            .collection_kind()
            .and_then(|kind| SizeClass::from_index(self.0 - kind.base()))
        {
            Some(class) => write!(f, "{}({:?})", self.name(), class),
            None => f.write_str(self.name()),
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Width tier of a collection's length/count prefix.
///
/// `Auto` is resolved from the element count before anything is written and never appears on the
/// wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum SizeClass {
    #[default]
    Auto = 0,
    Tiny = 1,
    Small = 2,
    Short = 3,
    Medium = 4,
    Large = 5,
    Big = 6,
    Great = 7,
    Huge = 8,
}

impl SizeClass {
    const CONCRETE: [SizeClass; 8] = [
        SizeClass::Tiny,
        SizeClass::Small,
        SizeClass::Short,
        SizeClass::Medium,
        SizeClass::Large,
        SizeClass::Big,
        SizeClass::Great,
        SizeClass::Huge,
    ];

    /// Number of bytes used by a length/count prefix of this class (0 for `Auto`).
    #[inline]
    pub const fn prefix_width(self) -> usize {
        self as usize
    }

    /// Largest value the prefix of this class can hold.
    pub fn max_value(self) -> u64 {
        match self {
            SizeClass::Auto => 0,
            SizeClass::Huge => u64::MAX,
            other => (1u64 << (8 * other.prefix_width())) - 1,
        }
    }

    /// Picks the smallest class able to describe `count` elements.
    ///
    /// The prefix stores `count - 1`, so 256 elements still fit in `Tiny`.
    ///
    /// # Errors
    /// Returns `EncoderError::Size` if `count` is zero: empty collections are never written.
    pub fn from_count(count: u64) -> Result<SizeClass> {
        if count == 0 {
            return Err(EncoderError::Size(
                "count is 0, the collection must not be serialized".to_string(),
            ));
        }
        let m = count - 1;
        Ok(Self::CONCRETE
            .into_iter()
            .find(|class| m <= class.max_value())
            .unwrap_or(SizeClass::Huge))
    }

    /// Resolves `Auto` from `count`; concrete classes are returned as is.
    pub fn resolve(self, count: u64) -> Result<SizeClass> {
        match self {
            SizeClass::Auto => SizeClass::from_count(count),
            class => Ok(class),
        }
    }

    pub(crate) fn from_index(index: u8) -> Option<SizeClass> {
        match index {
            1..=8 => Some(Self::CONCRETE[(index - 1) as usize]),
            _ => None,
        }
    }
}

/// The three collection kinds, each owning a block of eight tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Array,
    Dictionary,
    Blob,
}

impl CollectionKind {
    /// First tag of the kind's block minus one, so that `base + class` is the tag.
    #[inline]
    pub const fn base(self) -> u8 {
        match self {
            CollectionKind::Array => Tag::TINY_ARRAY.0 - 1,
            CollectionKind::Dictionary => Tag::TINY_DICT.0 - 1,
            CollectionKind::Blob => Tag::TINY_BLOB.0 - 1,
        }
    }
}

/// Inverts the collection tag arithmetic.
///
/// # Errors
/// Returns `EncoderError::Classification` if `tag` is not a collection tag.
pub fn size_class_of(tag: Tag) -> Result<SizeClass> {
    let kind = tag.collection_kind().ok_or_else(|| {
        EncoderError::Classification(format!("need a collection tag, got {:?}", tag))
    })?;
    SizeClass::from_index(tag.0 - kind.base()).ok_or_else(|| {
        EncoderError::Classification(format!("invalid size from tag 0x{:02X}", tag.0))
    })
}

/// Builds the tag for a collection of `kind`, resolving `Auto` from `count`.
///
/// # Errors
/// Returns `EncoderError::Size` if `count` is zero or does not fit an explicit `size`.
pub fn collection_tag(kind: CollectionKind, size: SizeClass, count: u64) -> Result<Tag> {
    if count == 0 {
        return Err(EncoderError::Size(
            "count is 0, the collection must not be serialized".to_string(),
        ));
    }
    let class = size.resolve(count)?;
    if count - 1 > class.max_value() {
        return Err(EncoderError::Size(format!(
            "{} elements do not fit a {:?} prefix",
            count, class
        )));
    }
    Ok(Tag(kind.base() + class as u8))
}

/// The closed set of native value types that map onto a primitive tag.
///
/// Floating point types share the `Int`/`Long` slots: the tag records width, not numeric domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NativeType {
    Bool,
    U8,
    I8,
    U16,
    I16,
    Tribyte,
    U32,
    I32,
    F32,
    Pentabyte,
    Hexabyte,
    Heptabyte,
    U64,
    I64,
    F64,
    Large,
    Big,
    Great,
    Huge,
    Giant,
}

impl NativeType {
    pub const fn tag(self) -> Tag {
        match self {
            NativeType::Bool => Tag::BOOL,
            NativeType::U8 | NativeType::I8 => Tag::BYTE,
            NativeType::U16 | NativeType::I16 => Tag::SHORT,
            NativeType::Tribyte => Tag::TRIBYTE,
            NativeType::U32 | NativeType::I32 | NativeType::F32 => Tag::INT,
            NativeType::Pentabyte => Tag::PENTABYTE,
            NativeType::Hexabyte => Tag::HEXABYTE,
            NativeType::Heptabyte => Tag::HEPTABYTE,
            NativeType::U64 | NativeType::I64 | NativeType::F64 => Tag::LONG,
            NativeType::Large => Tag::LARGE,
            NativeType::Big => Tag::BIG,
            NativeType::Great => Tag::GREAT,
            NativeType::Huge => Tag::HUGE,
            NativeType::Giant => Tag::GIANT,
        }
    }

    /// Encoded width in bytes.
    pub const fn width(self) -> usize {
        match self {
            NativeType::Bool | NativeType::U8 | NativeType::I8 => 1,
            NativeType::U16 | NativeType::I16 => 2,
            NativeType::Tribyte => 3,
            NativeType::U32 | NativeType::I32 | NativeType::F32 => 4,
            NativeType::Pentabyte => 5,
            NativeType::Hexabyte => 6,
            NativeType::Heptabyte => 7,
            NativeType::U64 | NativeType::I64 | NativeType::F64 => 8,
            NativeType::Large => 12,
            NativeType::Big => 16,
            NativeType::Great => 24,
            NativeType::Huge => 32,
            NativeType::Giant => 64,
        }
    }

    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, NativeType::F32 | NativeType::F64)
    }
}

/// Returns the primitive tag of a scalar type.
///
/// Types outside the supported set do not implement [`Scalar`] and are rejected at compile time.
pub fn tag_of<T: Scalar>() -> Tag {
    T::NATIVE.tag()
}

/// File-level minimum width for automatically sized collection headers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FullWidth {
    Tiny,
    Small,
    Medium,
    Large,
    Big,
    Great,
}

impl FullWidth {
    const fn bits(self) -> u8 {
        match self {
            FullWidth::Tiny => 0b0000_0010,
            FullWidth::Small => 0b0000_0100,
            FullWidth::Medium => 0b0000_0110,
            FullWidth::Large => 0b0000_1000,
            FullWidth::Big => 0b0000_1010,
            FullWidth::Great => 0b0000_1110,
        }
    }

    pub const fn size_class(self) -> SizeClass {
        match self {
            FullWidth::Tiny => SizeClass::Tiny,
            FullWidth::Small => SizeClass::Small,
            FullWidth::Medium => SizeClass::Medium,
            FullWidth::Large => SizeClass::Large,
            FullWidth::Big => SizeClass::Big,
            FullWidth::Great => SizeClass::Great,
        }
    }
}

/// Options written at file initialisation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Options {
    /// Every field name occupies the same declared number of bytes.
    pub fixed_name_length: bool,
    pub full_width: Option<FullWidth>,
}

impl Options {
    pub const FIXED_NAME_LENGTH: u8 = 0b0000_0001;

    /// The option flag byte.
    pub fn bits(&self) -> u8 {
        let mut bits = 0;
        if self.fixed_name_length {
            bits |= Self::FIXED_NAME_LENGTH;
        }
        if let Some(width) = self.full_width {
            bits |= width.bits();
        }
        bits
    }
}
