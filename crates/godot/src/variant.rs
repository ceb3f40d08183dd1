//! The engine's dynamically typed value and its binary codec.
//!
//! A [`Variant`] is a tagged union over primitives, math types, containers, and object references.
//! [`decode`]/[`encode`] implement the wire format described for the "Variant codec" component:
//! two schemas selected by the resource file's format version, a fixed tag-number table that must
//! match exactly for binary compatibility, and a handful of encoder promotion rules (int widening,
//! float-to-double widening, narrowest-encoding-wins).

use gdpack_core::prelude::{DataCursorTrait, EndianRead};
use snafu::prelude::*;

use crate::legacy::LegacyImage;
use crate::stream::{ByteWriter, GodotReader};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("{source}"))]
    Stream { source: crate::stream::Error },
    #[snafu(display("Unknown variant tag {tag}"))]
    UnknownTag { tag: u32 },
}

impl From<crate::stream::Error> for Error {
    #[inline]
    fn from(source: crate::stream::Error) -> Self {
        Self::Stream { source }
    }
}

impl From<gdpack_core::data::Error> for Error {
    #[inline]
    fn from(source: gdpack_core::data::Error) -> Self {
        Self::Stream { source: source.into() }
    }
}

impl crate::error::HasErrorKind for Error {
    fn kind(&self) -> crate::error::ErrorKind {
        match self {
            Self::Stream { .. } => crate::error::ErrorKind::FileCorrupt,
            Self::UnknownTag { .. } => crate::error::ErrorKind::FileUnsupported,
        }
    }
}

type Result<T> = core::result::Result<T, Error>;

/// Which of the two wire schemas a resource file uses, selected by its format version
/// (`spec.md` §4.2). Every tag in [`mod@self`]'s table is legal to decode regardless of schema;
/// the distinction matters for the resource deserializer's heuristics, not the tag payloads
/// themselves, since the original engine never changed how a given tag's bytes are laid out once
/// introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// Engine major <= 2, format versions 0-1.
    A,
    /// Format versions >= 2.
    B,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vector2i {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect2 {
    pub position: Vector2,
    pub size: Vector2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2i {
    pub position: Vector2i,
    pub size: Vector2i,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vector3i {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector4 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vector4i {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub w: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3,
    pub d: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub position: Vector3,
    pub size: Vector3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Basis {
    pub rows: [Vector3; 3],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform3D {
    pub basis: Basis,
    pub origin: Vector3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    pub columns: [Vector2; 3],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub columns: [Vector4; 4],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodePath {
    pub names: Vec<String>,
    pub subnames: Vec<String>,
    pub absolute: bool,
}

/// The sub-tag carried by an `OBJECT` variant (`spec.md` §4.2 "OBJECT encoding").
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectRef {
    Empty,
    ExternalByPath { type_name: String, path: String },
    InternalByIndex(u32),
    ExternalByIndex(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dictionary {
    pub entries: Vec<(Variant, Variant)>,
    pub shared: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    pub items: Vec<Variant>,
    pub shared: bool,
}

/// The engine's dynamically typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Vector2(Vector2),
    Vector2i(Vector2i),
    Rect2(Rect2),
    Rect2i(Rect2i),
    Vector3(Vector3),
    Vector3i(Vector3i),
    Vector4(Vector4),
    Vector4i(Vector4i),
    Plane(Plane),
    Quaternion(Quaternion),
    Aabb(Aabb),
    Basis(Basis),
    Transform3D(Transform3D),
    Transform2D(Transform2D),
    Projection(Projection),
    Color(Color),
    Image(LegacyImage),
    NodePath(NodePath),
    Rid(u32),
    Object(ObjectRef),
    /// `INPUT_EVENT`, `CALLABLE`, `SIGNAL` all decode to this per `spec.md` §9: "decode into empty
    /// values with a warning."
    UnrepresentableEmpty,
    Dictionary(Dictionary),
    Array(ArrayValue),
    PackedByteArray(Vec<u8>),
    PackedInt32Array(Vec<i32>),
    PackedInt64Array(Vec<i64>),
    PackedFloat32Array(Vec<f32>),
    PackedFloat64Array(Vec<f64>),
    PackedStringArray(Vec<String>),
    PackedVector2Array(Vec<Vector2>),
    PackedVector3Array(Vec<Vector3>),
    PackedVector4Array(Vec<Vector4>),
    PackedColorArray(Vec<Color>),
    StringName(String),
}

mod tag {
    pub const NIL: u32 = 1;
    pub const BOOL: u32 = 2;
    pub const INT: u32 = 3;
    pub const FLOAT: u32 = 4;
    pub const STRING: u32 = 5;
    pub const VECTOR2: u32 = 10;
    pub const RECT2: u32 = 11;
    pub const VECTOR3: u32 = 12;
    pub const PLANE: u32 = 13;
    pub const QUATERNION: u32 = 14;
    pub const AABB: u32 = 15;
    pub const BASIS: u32 = 16;
    pub const TRANSFORM3D: u32 = 17;
    pub const TRANSFORM2D: u32 = 18;
    pub const COLOR: u32 = 20;
    pub const IMAGE: u32 = 21;
    pub const NODE_PATH: u32 = 22;
    pub const RID: u32 = 23;
    pub const OBJECT: u32 = 24;
    pub const INPUT_EVENT: u32 = 25;
    pub const DICTIONARY: u32 = 26;
    pub const ARRAY: u32 = 30;
    pub const PACKED_BYTE_ARRAY: u32 = 31;
    pub const PACKED_INT32_ARRAY: u32 = 32;
    pub const PACKED_FLOAT32_ARRAY: u32 = 33;
    pub const PACKED_STRING_ARRAY: u32 = 34;
    pub const PACKED_VECTOR3_ARRAY: u32 = 35;
    pub const PACKED_COLOR_ARRAY: u32 = 36;
    pub const PACKED_VECTOR2_ARRAY: u32 = 37;
    pub const INT64: u32 = 40;
    pub const DOUBLE: u32 = 41;
    pub const CALLABLE: u32 = 42;
    pub const SIGNAL: u32 = 43;
    pub const STRING_NAME: u32 = 44;
    pub const VECTOR2I: u32 = 45;
    pub const RECT2I: u32 = 46;
    pub const VECTOR3I: u32 = 47;
    pub const PACKED_INT64_ARRAY: u32 = 48;
    pub const PACKED_FLOAT64_ARRAY: u32 = 49;
    pub const VECTOR4: u32 = 50;
    pub const VECTOR4I: u32 = 51;
    pub const PROJECTION: u32 = 52;
    pub const PACKED_VECTOR4_ARRAY: u32 = 53;

    /// The high bit of the `DICTIONARY`/`ARRAY` count word marks `is_shared`.
    pub const SHARED_BIT: u32 = 0x8000_0000;
}

/// A format-version value new enough that no legacy quirk applies; callers decoding a variant
/// outside a binary resource file's own versioning (bytecode constant tables, for instance) pass
/// this so the current-format path is always taken.
pub const CURRENT_FORMAT_VERSION: u32 = u32::MAX;

/// Below this resource format version, a `NODE_PATH`'s encoded subname list carries a trailing
/// property-field slot that legacy readers strip back out (`spec.md` §4.2).
const NO_NODEPATH_PROPERTY_FORMAT_VERSION: u32 = 3;

/// Reads a string-table-indexed name. In the resource deserializer's body pass, property/dict
/// string keys are sometimes inlined (high bit of the length set) rather than indexed; that case
/// is handled by the caller, not here, since only the deserializer tracks the string table.
pub fn decode(reader: &mut GodotReader<'_>, schema: Schema, format_version: u32) -> Result<Variant> {
    let header = reader.read_u32()?;
    let type_tag = header & 0x7FFF_FFFF;
    decode_tagged(reader, schema, format_version, type_tag, header)
}

fn decode_tagged(reader: &mut GodotReader<'_>, schema: Schema, format_version: u32, type_tag: u32, header: u32) -> Result<Variant> {
    Ok(match type_tag {
        tag::NIL => Variant::Nil,
        tag::BOOL => Variant::Bool(reader.read_u32()? != 0),
        tag::INT => Variant::Int(i64::from(reader.read_i32()?)),
        tag::FLOAT => Variant::Float(reader.read_real()?),
        tag::STRING => Variant::String(reader.read_length_prefixed_utf8()?),
        tag::VECTOR2 => Variant::Vector2(decode_vector2(reader)?),
        tag::RECT2 => Variant::Rect2(Rect2 { position: decode_vector2(reader)?, size: decode_vector2(reader)? }),
        tag::VECTOR3 => Variant::Vector3(decode_vector3(reader)?),
        tag::PLANE => Variant::Plane(Plane { normal: decode_vector3(reader)?, d: reader.read_real()? }),
        tag::QUATERNION => Variant::Quaternion(Quaternion {
            x: reader.read_real()?,
            y: reader.read_real()?,
            z: reader.read_real()?,
            w: reader.read_real()?,
        }),
        tag::AABB => Variant::Aabb(Aabb { position: decode_vector3(reader)?, size: decode_vector3(reader)? }),
        tag::BASIS => Variant::Basis(Basis {
            rows: [decode_vector3(reader)?, decode_vector3(reader)?, decode_vector3(reader)?],
        }),
        tag::TRANSFORM3D => Variant::Transform3D(Transform3D {
            basis: Basis { rows: [decode_vector3(reader)?, decode_vector3(reader)?, decode_vector3(reader)?] },
            origin: decode_vector3(reader)?,
        }),
        tag::TRANSFORM2D => Variant::Transform2D(Transform2D {
            columns: [decode_vector2(reader)?, decode_vector2(reader)?, decode_vector2(reader)?],
        }),
        tag::COLOR => Variant::Color(decode_color(reader)?),
        tag::IMAGE => Variant::Image(crate::legacy::decode_legacy_image(reader)?),
        tag::NODE_PATH => Variant::NodePath(decode_node_path(reader, format_version)?),
        tag::RID => {
            log::warn!("RID variant decoded as opaque handle; cannot be faithfully re-emitted if non-empty");
            Variant::Rid(reader.read_u32()?)
        }
        tag::OBJECT => Variant::Object(decode_object_ref(reader)?),
        tag::INPUT_EVENT => {
            log::warn!("INPUT_EVENT variant has no stored payload; decoding as empty");
            Variant::UnrepresentableEmpty
        }
        tag::DICTIONARY => Variant::Dictionary(decode_dictionary(reader, schema, format_version, header)?),
        tag::ARRAY => Variant::Array(decode_array(reader, schema, format_version, header)?),
        tag::PACKED_BYTE_ARRAY => {
            let count = reader.read_u32()? as usize;
            let bytes = reader.get_slice(count)?.to_vec();
            reader.align4()?;
            Variant::PackedByteArray(bytes)
        }
        tag::PACKED_INT32_ARRAY => Variant::PackedInt32Array(decode_packed(reader, |r| r.read_i32().map_err(Into::into))?),
        tag::PACKED_FLOAT32_ARRAY => Variant::PackedFloat32Array(decode_packed(reader, |r| r.read_f32().map_err(Into::into))?),
        tag::PACKED_STRING_ARRAY => {
            Variant::PackedStringArray(decode_packed(reader, |r| Ok(r.read_length_prefixed_utf8()?))?)
        }
        tag::PACKED_VECTOR3_ARRAY => Variant::PackedVector3Array(decode_packed(reader, decode_vector3)?),
        tag::PACKED_COLOR_ARRAY => Variant::PackedColorArray(decode_packed(reader, decode_color)?),
        tag::PACKED_VECTOR2_ARRAY => Variant::PackedVector2Array(decode_packed(reader, decode_vector2)?),
        tag::INT64 => Variant::Int(reader.read_i64()?),
        tag::DOUBLE => Variant::Float(reader.read_f64()?),
        tag::CALLABLE => {
            log::warn!("CALLABLE variant has no stored payload; decoding as empty");
            Variant::UnrepresentableEmpty
        }
        tag::SIGNAL => {
            log::warn!("SIGNAL variant has no stored payload; decoding as empty");
            Variant::UnrepresentableEmpty
        }
        tag::STRING_NAME => Variant::StringName(reader.read_length_prefixed_utf8()?),
        tag::VECTOR2I => Variant::Vector2i(Vector2i { x: reader.read_i32()?, y: reader.read_i32()? }),
        tag::RECT2I => Variant::Rect2i(Rect2i {
            position: Vector2i { x: reader.read_i32()?, y: reader.read_i32()? },
            size: Vector2i { x: reader.read_i32()?, y: reader.read_i32()? },
        }),
        tag::VECTOR3I => {
            Variant::Vector3i(Vector3i { x: reader.read_i32()?, y: reader.read_i32()?, z: reader.read_i32()? })
        }
        tag::PACKED_INT64_ARRAY => Variant::PackedInt64Array(decode_packed(reader, |r| r.read_i64().map_err(Into::into))?),
        tag::PACKED_FLOAT64_ARRAY => Variant::PackedFloat64Array(decode_packed(reader, |r| r.read_f64().map_err(Into::into))?),
        tag::VECTOR4 => Variant::Vector4(decode_vector4(reader)?),
        tag::VECTOR4I => Variant::Vector4i(Vector4i {
            x: reader.read_i32()?,
            y: reader.read_i32()?,
            z: reader.read_i32()?,
            w: reader.read_i32()?,
        }),
        tag::PROJECTION => Variant::Projection(Projection {
            columns: [decode_vector4(reader)?, decode_vector4(reader)?, decode_vector4(reader)?, decode_vector4(reader)?],
        }),
        tag::PACKED_VECTOR4_ARRAY => Variant::PackedVector4Array(decode_packed(reader, decode_vector4)?),
        other => return UnknownTagSnafu { tag: other }.fail(),
    })
}

fn decode_vector2(reader: &mut GodotReader<'_>) -> Result<Vector2> {
    Ok(Vector2 { x: reader.read_real()?, y: reader.read_real()? })
}

fn decode_vector3(reader: &mut GodotReader<'_>) -> Result<Vector3> {
    Ok(Vector3 { x: reader.read_real()?, y: reader.read_real()?, z: reader.read_real()? })
}

fn decode_vector4(reader: &mut GodotReader<'_>) -> Result<Vector4> {
    Ok(Vector4 { x: reader.read_real()?, y: reader.read_real()?, z: reader.read_real()?, w: reader.read_real()? })
}

fn decode_color(reader: &mut GodotReader<'_>) -> Result<Color> {
    Ok(Color { r: reader.read_f32()?, g: reader.read_f32()?, b: reader.read_f32()?, a: reader.read_f32()? })
}

fn decode_packed<T>(
    reader: &mut GodotReader<'_>,
    mut read_one: impl FnMut(&mut GodotReader<'_>) -> Result<T>,
) -> Result<Vec<T>> {
    let count = reader.read_u32()? as usize;
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(read_one(reader)?);
    }
    Ok(values)
}

fn decode_node_path(reader: &mut GodotReader<'_>, format_version: u32) -> Result<NodePath> {
    let name_count = reader.read_u16()?;
    let raw_subname_count = reader.read_u16()?;
    let absolute = raw_subname_count & 0x8000 != 0;
    let subname_count = raw_subname_count & 0x7FFF;

    let mut names = Vec::with_capacity(name_count as usize);
    for _ in 0..name_count {
        names.push(reader.read_length_prefixed_utf8()?);
    }
    let mut subnames = Vec::with_capacity(subname_count as usize);
    for _ in 0..subname_count {
        subnames.push(reader.read_length_prefixed_utf8()?);
    }
    // Godot 2.x wrote a property field as a trailing subname slot; a reader for a later format
    // strips it back out so the path's subname list matches what the engine itself sees.
    if format_version < NO_NODEPATH_PROPERTY_FORMAT_VERSION && subnames.last().is_some_and(String::is_empty) {
        subnames.pop();
    }
    Ok(NodePath { names, subnames, absolute })
}

fn decode_object_ref(reader: &mut GodotReader<'_>) -> Result<ObjectRef> {
    Ok(match reader.read_u32()? {
        0 => ObjectRef::Empty,
        1 => ObjectRef::ExternalByPath {
            type_name: reader.read_length_prefixed_utf8()?,
            path: reader.read_length_prefixed_utf8()?,
        },
        2 => ObjectRef::InternalByIndex(reader.read_u32()?),
        3 => ObjectRef::ExternalByIndex(reader.read_u32()?),
        other => return UnknownTagSnafu { tag: other }.fail(),
    })
}

fn decode_dictionary(reader: &mut GodotReader<'_>, schema: Schema, format_version: u32, header: u32) -> Result<Dictionary> {
    let count = reader.read_u32()? & !tag::SHARED_BIT;
    let shared = header & tag::SHARED_BIT != 0;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let key = decode(reader, schema, format_version)?;
        let value = decode(reader, schema, format_version)?;
        entries.push((key, value));
    }
    Ok(Dictionary { entries, shared })
}

fn decode_array(reader: &mut GodotReader<'_>, schema: Schema, format_version: u32, header: u32) -> Result<ArrayValue> {
    let count = reader.read_u32()? & !tag::SHARED_BIT;
    let shared = header & tag::SHARED_BIT != 0;
    let mut items = Vec::with_capacity(count as usize);
    for _ in 0..count {
        items.push(decode(reader, schema, format_version)?);
    }
    Ok(ArrayValue { items, shared })
}

/// Encodes `value`, applying the promotion rules from `spec.md` §4.2: `INT` widens to `INT64` when
/// it doesn't fit in 32 bits; `FLOAT` widens to `DOUBLE` when narrowing to `f32` would lose
/// precision; otherwise the narrowest tag wins.
pub fn encode(writer: &mut ByteWriter, value: &Variant, format_version: u32) {
    match value {
        Variant::Nil => writer.write_u32(tag::NIL),
        Variant::Bool(v) => {
            writer.write_u32(tag::BOOL);
            writer.write_u32(u32::from(*v));
        }
        Variant::Int(v) => encode_int(writer, *v),
        Variant::Float(v) => encode_float(writer, *v),
        Variant::String(v) => {
            writer.write_u32(tag::STRING);
            writer.write_length_prefixed_utf8(v);
        }
        Variant::Vector2(v) => {
            writer.write_u32(tag::VECTOR2);
            encode_vector2(writer, v);
        }
        Variant::Vector2i(v) => {
            writer.write_u32(tag::VECTOR2I);
            writer.write_i32(v.x);
            writer.write_i32(v.y);
        }
        Variant::Rect2(v) => {
            writer.write_u32(tag::RECT2);
            encode_vector2(writer, &v.position);
            encode_vector2(writer, &v.size);
        }
        Variant::Rect2i(v) => {
            writer.write_u32(tag::RECT2I);
            writer.write_i32(v.position.x);
            writer.write_i32(v.position.y);
            writer.write_i32(v.size.x);
            writer.write_i32(v.size.y);
        }
        Variant::Vector3(v) => {
            writer.write_u32(tag::VECTOR3);
            encode_vector3(writer, v);
        }
        Variant::Vector3i(v) => {
            writer.write_u32(tag::VECTOR3I);
            writer.write_i32(v.x);
            writer.write_i32(v.y);
            writer.write_i32(v.z);
        }
        Variant::Vector4(v) => {
            writer.write_u32(tag::VECTOR4);
            encode_vector4(writer, v);
        }
        Variant::Vector4i(v) => {
            writer.write_u32(tag::VECTOR4I);
            writer.write_i32(v.x);
            writer.write_i32(v.y);
            writer.write_i32(v.z);
            writer.write_i32(v.w);
        }
        Variant::Plane(v) => {
            writer.write_u32(tag::PLANE);
            encode_vector3(writer, &v.normal);
            writer.write_real(v.d);
        }
        Variant::Quaternion(v) => {
            writer.write_u32(tag::QUATERNION);
            writer.write_real(v.x);
            writer.write_real(v.y);
            writer.write_real(v.z);
            writer.write_real(v.w);
        }
        Variant::Aabb(v) => {
            writer.write_u32(tag::AABB);
            encode_vector3(writer, &v.position);
            encode_vector3(writer, &v.size);
        }
        Variant::Basis(v) => {
            writer.write_u32(tag::BASIS);
            for row in &v.rows {
                encode_vector3(writer, row);
            }
        }
        Variant::Transform3D(v) => {
            writer.write_u32(tag::TRANSFORM3D);
            for row in &v.basis.rows {
                encode_vector3(writer, row);
            }
            encode_vector3(writer, &v.origin);
        }
        Variant::Transform2D(v) => {
            writer.write_u32(tag::TRANSFORM2D);
            for column in &v.columns {
                encode_vector2(writer, column);
            }
        }
        Variant::Projection(v) => {
            writer.write_u32(tag::PROJECTION);
            for column in &v.columns {
                encode_vector4(writer, column);
            }
        }
        Variant::Color(v) => {
            writer.write_u32(tag::COLOR);
            encode_color(writer, v);
        }
        Variant::Image(image) => {
            writer.write_u32(tag::IMAGE);
            crate::legacy::encode_legacy_image(writer, image);
        }
        Variant::NodePath(v) => {
            writer.write_u32(tag::NODE_PATH);
            encode_node_path(writer, v, format_version);
        }
        Variant::Rid(v) => {
            writer.write_u32(tag::RID);
            writer.write_u32(*v);
        }
        Variant::Object(v) => {
            writer.write_u32(tag::OBJECT);
            encode_object_ref(writer, v);
        }
        Variant::UnrepresentableEmpty => {
            // Conservatively round-trips as INPUT_EVENT; callers that need CALLABLE/SIGNAL byte
            // fidelity must track the original tag themselves (spec.md §9 flags this as lossy).
            writer.write_u32(tag::INPUT_EVENT);
        }
        Variant::Dictionary(dict) => {
            let header = tag::DICTIONARY | if dict.shared { tag::SHARED_BIT } else { 0 };
            writer.write_u32(header);
            writer.write_u32(dict.entries.len() as u32);
            for (key, value) in &dict.entries {
                encode(writer, key, format_version);
                encode(writer, value, format_version);
            }
        }
        Variant::Array(array) => {
            let header = tag::ARRAY | if array.shared { tag::SHARED_BIT } else { 0 };
            writer.write_u32(header);
            writer.write_u32(array.items.len() as u32);
            for item in &array.items {
                encode(writer, item, format_version);
            }
        }
        Variant::PackedByteArray(bytes) => {
            writer.write_u32(tag::PACKED_BYTE_ARRAY);
            writer.write_u32(bytes.len() as u32);
            writer.write_bytes(bytes);
            writer.align4();
        }
        Variant::PackedInt32Array(values) => encode_packed(writer, tag::PACKED_INT32_ARRAY, values, ByteWriter::write_i32),
        Variant::PackedInt64Array(values) => encode_packed(writer, tag::PACKED_INT64_ARRAY, values, ByteWriter::write_i64),
        Variant::PackedFloat32Array(values) => {
            encode_packed(writer, tag::PACKED_FLOAT32_ARRAY, values, ByteWriter::write_f32)
        }
        Variant::PackedFloat64Array(values) => {
            encode_packed(writer, tag::PACKED_FLOAT64_ARRAY, values, ByteWriter::write_f64)
        }
        Variant::PackedStringArray(values) => {
            writer.write_u32(tag::PACKED_STRING_ARRAY);
            writer.write_u32(values.len() as u32);
            for value in values {
                writer.write_length_prefixed_utf8(value);
            }
        }
        Variant::PackedVector2Array(values) => {
            writer.write_u32(tag::PACKED_VECTOR2_ARRAY);
            writer.write_u32(values.len() as u32);
            for value in values {
                encode_vector2(writer, value);
            }
        }
        Variant::PackedVector3Array(values) => {
            writer.write_u32(tag::PACKED_VECTOR3_ARRAY);
            writer.write_u32(values.len() as u32);
            for value in values {
                encode_vector3(writer, value);
            }
        }
        Variant::PackedVector4Array(values) => {
            writer.write_u32(tag::PACKED_VECTOR4_ARRAY);
            writer.write_u32(values.len() as u32);
            for value in values {
                encode_vector4(writer, value);
            }
        }
        Variant::PackedColorArray(values) => {
            writer.write_u32(tag::PACKED_COLOR_ARRAY);
            writer.write_u32(values.len() as u32);
            for value in values {
                encode_color(writer, value);
            }
        }
        Variant::StringName(v) => {
            writer.write_u32(tag::STRING_NAME);
            writer.write_length_prefixed_utf8(v);
        }
    }
}

fn encode_int(writer: &mut ByteWriter, value: i64) {
    if i32::try_from(value).is_ok() {
        writer.write_u32(tag::INT);
        writer.write_i32(value as i32);
    } else {
        writer.write_u32(tag::INT64);
        writer.write_i64(value);
    }
}

fn encode_float(writer: &mut ByteWriter, value: f64) {
    let narrowed = value as f32;
    if f64::from(narrowed) == value {
        writer.write_u32(tag::FLOAT);
        writer.write_real(value);
    } else {
        writer.write_u32(tag::DOUBLE);
        writer.write_f64(value);
    }
}

fn encode_vector2(writer: &mut ByteWriter, value: &Vector2) {
    writer.write_real(value.x);
    writer.write_real(value.y);
}

fn encode_vector3(writer: &mut ByteWriter, value: &Vector3) {
    writer.write_real(value.x);
    writer.write_real(value.y);
    writer.write_real(value.z);
}

fn encode_vector4(writer: &mut ByteWriter, value: &Vector4) {
    writer.write_real(value.x);
    writer.write_real(value.y);
    writer.write_real(value.z);
    writer.write_real(value.w);
}

fn encode_color(writer: &mut ByteWriter, value: &Color) {
    writer.write_f32(value.r);
    writer.write_f32(value.g);
    writer.write_f32(value.b);
    writer.write_f32(value.a);
}

fn encode_packed<T: Copy>(writer: &mut ByteWriter, tag_value: u32, values: &[T], mut write_one: impl FnMut(&mut ByteWriter, T)) {
    writer.write_u32(tag_value);
    writer.write_u32(values.len() as u32);
    for &value in values {
        write_one(writer, value);
    }
}

fn encode_node_path(writer: &mut ByteWriter, path: &NodePath, format_version: u32) {
    writer.write_u16(path.names.len() as u16);
    // Restore the trailing empty property-field slot a legacy reader strips on decode, so the
    // re-encoded subname count matches what that format version actually wrote to disk.
    let legacy = format_version < NO_NODEPATH_PROPERTY_FORMAT_VERSION;
    let subname_count = path.subnames.len() as u16 + u16::from(legacy);
    let mut stored_subname_count = subname_count;
    if path.absolute {
        stored_subname_count |= 0x8000;
    }
    writer.write_u16(stored_subname_count);
    for name in &path.names {
        writer.write_length_prefixed_utf8(name);
    }
    for subname in &path.subnames {
        writer.write_length_prefixed_utf8(subname);
    }
    if legacy {
        writer.write_length_prefixed_utf8("");
    }
}

fn encode_object_ref(writer: &mut ByteWriter, reference: &ObjectRef) {
    match reference {
        ObjectRef::Empty => writer.write_u32(0),
        ObjectRef::ExternalByPath { type_name, path } => {
            writer.write_u32(1);
            writer.write_length_prefixed_utf8(type_name);
            writer.write_length_prefixed_utf8(path);
        }
        ObjectRef::InternalByIndex(index) => {
            writer.write_u32(2);
            writer.write_u32(*index);
        }
        ObjectRef::ExternalByIndex(index) => {
            writer.write_u32(3);
            writer.write_u32(*index);
        }
    }
}

impl ByteWriter {
    fn write_u16(&mut self, value: u16) {
        let bytes = value.to_le_bytes();
        self.write_bytes(&bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdpack_core::prelude::Endian;

    fn round_trip(value: Variant, schema: Schema) -> Variant {
        round_trip_versioned(value, schema, CURRENT_FORMAT_VERSION)
    }

    fn round_trip_versioned(value: Variant, schema: Schema, format_version: u32) -> Variant {
        let mut writer = ByteWriter::new(Endian::Little, false);
        encode(&mut writer, &value, format_version);
        let bytes = writer.into_inner();
        let mut reader = GodotReader::new(&bytes, Endian::Little, false);
        decode(&mut reader, schema, format_version).unwrap()
    }

    #[test]
    fn round_trips_primitives() {
        assert_eq!(round_trip(Variant::Nil, Schema::B), Variant::Nil);
        assert_eq!(round_trip(Variant::Bool(true), Schema::B), Variant::Bool(true));
        assert_eq!(round_trip(Variant::Int(42), Schema::B), Variant::Int(42));
        assert_eq!(round_trip(Variant::String("x".into()), Schema::B), Variant::String("x".into()));
    }

    #[test]
    fn int_promotes_to_int64_above_32_bits() {
        let mut writer = ByteWriter::new(Endian::Little, false);
        let large = i64::from(i32::MAX) + 1;
        encode(&mut writer, &Variant::Int(large), CURRENT_FORMAT_VERSION);
        let bytes = writer.into_inner();
        let header = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        assert_eq!(header, tag::INT64);

        let mut reader = GodotReader::new(&bytes, Endian::Little, false);
        assert_eq!(decode(&mut reader, Schema::B, CURRENT_FORMAT_VERSION).unwrap(), Variant::Int(large));
    }

    #[test]
    fn dictionary_round_trips_with_shared_bit() {
        let dict = Dictionary {
            entries: vec![
                (Variant::String("a".into()), Variant::Int(1)),
                (Variant::String("b".into()), Variant::Bool(true)),
            ],
            shared: true,
        };
        let decoded = round_trip(Variant::Dictionary(dict.clone()), Schema::B);
        assert_eq!(decoded, Variant::Dictionary(dict));
    }

    #[test]
    fn node_path_round_trips() {
        let path = NodePath { names: vec!["A".into()], subnames: vec!["b".into()], absolute: false };
        let decoded = round_trip(Variant::NodePath(path.clone()), Schema::B);
        assert_eq!(decoded, Variant::NodePath(path));
    }

    #[test]
    fn legacy_node_path_strips_and_restores_the_property_field() {
        let legacy_format_version = 2;

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&tag::NODE_PATH.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // name count
        bytes.extend_from_slice(&2u16.to_le_bytes()); // subname count, not absolute
        write_len_prefixed(&mut bytes, "A");
        write_len_prefixed(&mut bytes, "b");
        write_len_prefixed(&mut bytes, "");

        let mut reader = GodotReader::new(&bytes, Endian::Little, false);
        let decoded = decode(&mut reader, Schema::B, legacy_format_version).unwrap();
        let expected = NodePath { names: vec!["A".into()], subnames: vec!["b".into()], absolute: false };
        assert_eq!(decoded, Variant::NodePath(expected.clone()));

        let mut writer = ByteWriter::new(Endian::Little, false);
        encode(&mut writer, &Variant::NodePath(expected), legacy_format_version);
        assert_eq!(writer.into_inner(), bytes);
    }

    fn write_len_prefixed(bytes: &mut Vec<u8>, value: &str) {
        bytes.extend_from_slice(&(value.len() as u32 + 1).to_le_bytes());
        bytes.extend_from_slice(value.as_bytes());
        bytes.push(0);
    }
}
