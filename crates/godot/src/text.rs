//! The textual `gd_scene`/`gd_resource` resource form (`spec.md` §4.4's "Text serializer").
//!
//! This module only emits; the core has no text-format reader of its own, matching the engine's
//! own split between its binary and text resource loaders (the latter built on a hand-written
//! tokenizer this crate has no need to reproduce for a write-only path).

use crate::resource::{CompatMetadata, ExternalRef};
use crate::variant::{NodePath, ObjectRef, Variant};

/// A scene node, in the shape `[node]` blocks are emitted from. `groups` preserves insertion
/// order since the original format does.
#[derive(Debug, Clone, Default)]
pub struct SceneNode {
    pub name: String,
    pub type_name: Option<String>,
    pub parent: Option<String>,
    pub owner: Option<String>,
    pub index: Option<i64>,
    pub groups: Vec<String>,
    pub properties: Vec<(String, Variant)>,
}

#[derive(Debug, Clone)]
pub struct Connection {
    pub signal: String,
    pub from: String,
    pub to: String,
    pub method: String,
}

#[derive(Debug, Clone)]
pub struct Editable {
    pub path: String,
}

/// Everything needed to emit a complete text resource: the header, the reference tables, and the
/// body (either a flat list of sub-resources, for a `.tres`, or nodes/connections/editables, for a
/// `.tscn`).
#[derive(Debug, Clone, Default)]
pub struct TextResource {
    pub load_steps: u32,
    pub externals: Vec<ExternalRef>,
    pub sub_resources: Vec<(String, Vec<(String, Variant)>)>,
    pub nodes: Vec<SceneNode>,
    pub connections: Vec<Connection>,
    pub editables: Vec<Editable>,
}

/// Emits `resource` as `gd_scene` text if it has any scene nodes, `gd_resource` otherwise.
#[must_use]
pub fn emit(compat: &CompatMetadata, resource: &TextResource) -> String {
    let mut output = String::new();
    emit_header(&mut output, compat, resource);
    output.push('\n');

    for (index, external) in resource.externals.iter().enumerate() {
        emit_ext_resource(&mut output, compat, external, index);
    }
    if !resource.externals.is_empty() {
        output.push('\n');
    }

    for (index, (type_name, properties)) in resource.sub_resources.iter().enumerate() {
        emit_sub_resource(&mut output, compat, type_name, &format_id(compat.format_version, index), properties);
    }

    for node in &resource.nodes {
        emit_node(&mut output, compat, node);
    }

    for connection in &resource.connections {
        output.push_str(&format!(
            "[connection signal=\"{}\" from=\"{}\" to=\"{}\" method=\"{}\"]\n\n",
            connection.signal, connection.from, connection.to, connection.method
        ));
    }

    for editable in &resource.editables {
        output.push_str(&format!("[editable path=\"{}\"]\n\n", editable.path));
    }

    output
}

fn emit_header(output: &mut String, compat: &CompatMetadata, resource: &TextResource) {
    let tag = if resource.nodes.is_empty() { "gd_resource" } else { "gd_scene" };
    output.push('[');
    output.push_str(tag);
    output.push_str(&format!(" type=\"{}\"", compat.main_type));
    output.push_str(&format!(" load_steps={}", resource.load_steps));
    output.push_str(&format!(" format={}", compat.format_version));
    if let Some(uid) = compat.uid {
        output.push_str(&format!(" uid=\"uid://{uid:x}\""));
    }
    if let Some(script_class) = &compat.script_class {
        output.push_str(&format!(" script_class=\"{script_class}\""));
    }
    output.push_str("]\n");
}

fn emit_ext_resource(output: &mut String, compat: &CompatMetadata, external: &ExternalRef, index: usize) {
    output.push_str(&format!("[ext_resource type=\"{}\"", external.type_name));
    if let Some(uid) = external.uid {
        output.push_str(&format!(" uid=\"uid://{uid:x}\""));
    }
    output.push_str(&format!(" path=\"{}\" id={}]\n", external.path, format_id(compat.format_version, index)));
}

/// Format versions ≤ 2 identify references by bare integer; format ≥ 3 uses a quoted string id
/// (`spec.md` §4.4).
fn format_id(format_version: u32, index: usize) -> String {
    if format_version <= 2 { (index + 1).to_string() } else { format!("\"{}\"", index + 1) }
}

fn emit_sub_resource(output: &mut String, compat: &CompatMetadata, type_name: &str, id: &str, properties: &[(String, Variant)]) {
    output.push_str(&format!("\n[sub_resource type=\"{type_name}\" id={id}]\n"));
    emit_properties(output, compat, properties);
}

fn emit_node(output: &mut String, compat: &CompatMetadata, node: &SceneNode) {
    output.push_str(&format!("\n[node name=\"{}\"", node.name));
    if let Some(type_name) = &node.type_name {
        output.push_str(&format!(" type=\"{type_name}\""));
    }
    if let Some(parent) = &node.parent {
        output.push_str(&format!(" parent=\"{parent}\""));
    }
    if let Some(owner) = &node.owner {
        output.push_str(&format!(" owner=\"{owner}\""));
    }
    if let Some(index) = node.index {
        output.push_str(&format!(" index=\"{index}\""));
    }
    if !node.groups.is_empty() {
        let groups = node.groups.iter().map(|group| format!("\"{group}\"")).collect::<Vec<_>>().join(", ");
        output.push_str(&format!(" groups=[{groups}]"));
    }
    output.push_str("]\n");
    emit_properties(output, compat, &node.properties);
}

fn emit_properties(output: &mut String, compat: &CompatMetadata, properties: &[(String, Variant)]) {
    // Format 1 left a blank line between a header and its first property; later formats don't.
    if compat.format_version == 1 && !properties.is_empty() {
        output.push('\n');
    }
    for (name, value) in properties {
        output.push_str(&format!("{name} = {}\n", format_value(value)));
    }
}

/// Renders `value` the way the engine's `VariantWriter` does for the text format's property
/// assignments and array/dictionary literals.
#[must_use]
pub fn format_value(value: &Variant) -> String {
    match value {
        Variant::Nil => "null".to_owned(),
        Variant::Bool(v) => v.to_string(),
        Variant::Int(v) => v.to_string(),
        Variant::Float(v) => format_float(*v),
        Variant::String(v) | Variant::StringName(v) => format!("\"{}\"", escape(v)),
        Variant::Vector2(v) => format!("Vector2({}, {})", format_float(v.x), format_float(v.y)),
        Variant::Vector2i(v) => format!("Vector2i({}, {})", v.x, v.y),
        Variant::Vector3(v) => format!("Vector3({}, {}, {})", format_float(v.x), format_float(v.y), format_float(v.z)),
        Variant::Vector3i(v) => format!("Vector3i({}, {}, {})", v.x, v.y, v.z),
        Variant::Vector4(v) => {
            format!("Vector4({}, {}, {}, {})", format_float(v.x), format_float(v.y), format_float(v.z), format_float(v.w))
        }
        Variant::Vector4i(v) => format!("Vector4i({}, {}, {}, {})", v.x, v.y, v.z, v.w),
        Variant::Color(v) => format!("Color({}, {}, {}, {})", v.r, v.g, v.b, v.a),
        Variant::NodePath(path) => format!("NodePath(\"{}\")", format_node_path(path)),
        Variant::Array(array) => {
            let items = array.items.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{items}]")
        }
        Variant::Dictionary(dictionary) => {
            let entries = dictionary
                .entries
                .iter()
                .map(|(key, value)| format!("{}: {}", format_value(key), format_value(value)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{{entries}}}")
        }
        Variant::PackedByteArray(bytes) => format_packed("PackedByteArray", bytes.iter().map(u8::to_string)),
        Variant::PackedInt32Array(items) => format_packed("PackedInt32Array", items.iter().map(i32::to_string)),
        Variant::PackedInt64Array(items) => format_packed("PackedInt64Array", items.iter().map(i64::to_string)),
        Variant::PackedFloat32Array(items) => format_packed("PackedFloat32Array", items.iter().map(|v| format_float(f64::from(*v)))),
        Variant::PackedFloat64Array(items) => format_packed("PackedFloat64Array", items.iter().map(|v| format_float(*v))),
        Variant::PackedStringArray(items) => format_packed("PackedStringArray", items.iter().map(|v| format!("\"{}\"", escape(v)))),
        Variant::Object(object_ref) => format_object_ref(object_ref),
        // Everything else (legacy image, RID, the unrepresentable tags) has no stable text
        // literal in this crate's scope; callers needing those should special-case them before
        // calling into a property-value position.
        _ => "null".to_owned(),
    }
}

/// Inline object references always use the `SubResource("id")`/`ExtResource("id")` string-id
/// form in property-value position, regardless of the owning resource's format version (that
/// version only affects the `id=` attribute on the referenced block's own header).
fn format_object_ref(object_ref: &ObjectRef) -> String {
    match object_ref {
        ObjectRef::Empty => "null".to_owned(),
        ObjectRef::ExternalByPath { path, .. } => format!("ExtResource(\"{}\")", escape(path)),
        ObjectRef::InternalByIndex(index) => format!("SubResource(\"{}\")", index + 1),
        ObjectRef::ExternalByIndex(index) => format!("ExtResource(\"{}\")", index + 1),
    }
}

/// Renders a [`NodePath`]'s engine-standard string form: a leading `/` when absolute, the names
/// joined by `/`, then a `:`-prefixed, `:`-joined subname suffix when there are any.
fn format_node_path(path: &NodePath) -> String {
    let mut text = String::new();
    if path.absolute {
        text.push('/');
    }
    text.push_str(&path.names.join("/"));
    if !path.subnames.is_empty() {
        text.push(':');
        text.push_str(&path.subnames.join(":"));
    }
    text
}

fn format_packed(label: &str, items: impl Iterator<Item = String>) -> String {
    format!("{label}({})", items.collect::<Vec<_>>().join(", "))
}

fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() { format!("{value:.1}") } else { value.to_string() }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceFlags;
    use gdpack_core::prelude::Endian;

    fn compat() -> CompatMetadata {
        CompatMetadata {
            format_version: 3,
            engine_major: 4,
            engine_minor: 0,
            endian: Endian::Little,
            real_is_64: false,
            main_type: "Resource".to_owned(),
            script_class: None,
            uid: None,
            flags: ResourceFlags::empty(),
            compressed: false,
            suspect_version: false,
        }
    }

    #[test]
    fn emits_header_and_property() {
        let resource = TextResource {
            load_steps: 1,
            sub_resources: vec![("Resource".to_owned(), vec![("value".to_owned(), Variant::Int(3))])],
            ..Default::default()
        };
        let text = emit(&compat(), &resource);
        assert!(text.starts_with("[gd_resource type=\"Resource\" load_steps=1 format=3]"));
        assert!(text.contains("value = 3"));
    }

    #[test]
    fn format_version_1_keeps_the_blank_line_quirk() {
        let mut metadata = compat();
        metadata.format_version = 1;
        let resource = TextResource {
            load_steps: 1,
            sub_resources: vec![("Resource".to_owned(), vec![("value".to_owned(), Variant::Int(3))])],
            ..Default::default()
        };
        let text = emit(&metadata, &resource);
        assert!(text.contains("[sub_resource type=\"Resource\" id=1]\n\nvalue = 3\n"));
    }

    #[test]
    fn array_and_dictionary_literals_nest_correctly() {
        let value = Variant::Array(crate::variant::ArrayValue {
            items: vec![Variant::Int(1), Variant::String("a".into())],
            shared: false,
        });
        assert_eq!(format_value(&value), "[1, \"a\"]");
    }

    #[test]
    fn node_path_literal_includes_absolute_marker_and_subnames() {
        let path = NodePath { names: vec!["parent".to_owned(), "child".to_owned()], subnames: vec!["subname".to_owned()], absolute: true };
        assert_eq!(format_value(&Variant::NodePath(path)), "NodePath(\"/parent/child:subname\")");

        let relative = NodePath { names: vec!["a".to_owned()], subnames: vec![], absolute: false };
        assert_eq!(format_value(&Variant::NodePath(relative)), "NodePath(\"a\")");
    }
}
