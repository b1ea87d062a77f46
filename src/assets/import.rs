use super::AssetError;
use crate::scene::{
    AnimationClip, Channel, ChannelValues, Interpolation, Model, ModelNode, NodeTransform,
    Primitive,
};
use glam::{Quat, Vec3};
use gltf::animation::util::ReadOutputs;
use gltf::animation::Property;
use gltf::mesh::Mode;
use std::path::Path;

/// Geometry encodings this importer cannot decode.
const UNSUPPORTED_REQUIRED: [&str; 3] = [
    "KHR_draco_mesh_compression",
    "EXT_meshopt_compression",
    "KHR_mesh_quantization",
];

/// Parse a `.glb` or `.gltf` into a [`Model`]. External buffers are read
/// relative to `base`; images are never decoded.
pub fn parse_gltf(bytes: &[u8], base: Option<&Path>) -> Result<Model, AssetError> {
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes)?;
    if let Some(ext) = document
        .extensions_required()
        .find(|ext| UNSUPPORTED_REQUIRED.contains(ext))
    {
        return Err(AssetError::UnsupportedExtension(ext.to_string()));
    }
    let buffers = gltf::import_buffers(&document, base, blob)?;
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or(AssetError::NoScene)?;

    let mut nodes: Vec<ModelNode> = document
        .nodes()
        .map(|node| {
            let (translation, rotation, scale) = node.transform().decomposed();
            ModelNode {
                name: node.name().map(str::to_string),
                transform: NodeTransform {
                    translation: Vec3::from_array(translation),
                    rotation: Quat::from_array(rotation),
                    scale: Vec3::from_array(scale),
                },
                children: node.children().map(|child| child.index()).collect(),
                primitives: Vec::new(),
            }
        })
        .collect();

    // Meshes instanced by several nodes become one primitive per instance.
    let mut primitives = Vec::new();
    for node in document.nodes() {
        let Some(mesh) = node.mesh() else {
            continue;
        };
        for primitive in mesh.primitives() {
            match read_primitive(&primitive, &buffers, node.index()) {
                Some(p) => {
                    nodes[node.index()].primitives.push(primitives.len());
                    primitives.push(p);
                }
                None => log::debug!(
                    "Skipping primitive {} of mesh {:?}: not a readable triangle set",
                    primitive.index(),
                    mesh.name()
                ),
            }
        }
    }

    let clips = document
        .animations()
        .filter_map(|animation| read_animation(&animation, &buffers))
        .collect();

    let roots = scene.nodes().map(|node| node.index()).collect();
    Ok(Model::new(nodes, roots, primitives, clips))
}

fn read_primitive(
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
    node: usize,
) -> Option<Primitive> {
    let mode = primitive.mode();
    if !matches!(mode, Mode::Triangles | Mode::TriangleStrip | Mode::TriangleFan) {
        return None;
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
    let positions: Vec<Vec3> = reader.read_positions()?.map(Vec3::from_array).collect();
    let normals = reader
        .read_normals()
        .map(|normals| normals.map(Vec3::from_array).collect());
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    let indices = match mode {
        Mode::TriangleStrip => strip_to_list(&indices),
        Mode::TriangleFan => fan_to_list(&indices),
        _ => indices,
    };
    let base_color = primitive
        .material()
        .pbr_metallic_roughness()
        .base_color_factor();
    Primitive::new(node, positions, normals, indices, base_color)
}

fn strip_to_list(strip: &[u32]) -> Vec<u32> {
    let mut list = Vec::with_capacity(strip.len().saturating_sub(2) * 3);
    for i in 0..strip.len().saturating_sub(2) {
        if i % 2 == 0 {
            list.extend([strip[i], strip[i + 1], strip[i + 2]]);
        } else {
            list.extend([strip[i + 1], strip[i], strip[i + 2]]);
        }
    }
    list
}

fn fan_to_list(fan: &[u32]) -> Vec<u32> {
    let mut list = Vec::with_capacity(fan.len().saturating_sub(2) * 3);
    for i in 1..fan.len().saturating_sub(1) {
        list.extend([fan[0], fan[i], fan[i + 1]]);
    }
    list
}

fn read_animation(
    animation: &gltf::Animation<'_>,
    buffers: &[gltf::buffer::Data],
) -> Option<AnimationClip> {
    let name = animation
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("clip{}", animation.index()));
    let mut channels = Vec::new();
    for channel in animation.channels() {
        let node = channel.target().node().index();
        let (interpolation, cubic) = match channel.sampler().interpolation() {
            gltf::animation::Interpolation::Linear => (Interpolation::Linear, false),
            gltf::animation::Interpolation::Step => (Interpolation::Step, false),
            // Tangents are dropped; keys are blended linearly.
            gltf::animation::Interpolation::CubicSpline => (Interpolation::Linear, true),
        };
        let reader =
            channel.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
        let Some(inputs) = reader.read_inputs() else {
            continue;
        };
        let times: Vec<f32> = inputs.collect();
        let Some(outputs) = reader.read_outputs() else {
            continue;
        };
        let values = match (channel.target().property(), outputs) {
            (Property::Translation, ReadOutputs::Translations(values)) => {
                ChannelValues::Translation(key_values(values.map(Vec3::from_array), cubic))
            }
            (Property::Scale, ReadOutputs::Scales(values)) => {
                ChannelValues::Scale(key_values(values.map(Vec3::from_array), cubic))
            }
            (Property::Rotation, ReadOutputs::Rotations(rotations)) => ChannelValues::Rotation(
                key_values(rotations.into_f32().map(Quat::from_array), cubic),
            ),
            _ => continue,
        };
        if times.is_empty() || values.len() != times.len() {
            log::warn!(
                "Animation '{name}' channel on node {node} has {} keys for {} times; skipping",
                values.len(),
                times.len()
            );
            continue;
        }
        if !keyframes_are_ordered(&times) {
            log::warn!(
                "Animation '{name}' channel on node {node} has non-finite or unsorted keyframe times; skipping"
            );
            continue;
        }
        channels.push(Channel {
            node,
            times,
            values,
            interpolation,
        });
    }
    if channels.is_empty() {
        return None;
    }
    Some(AnimationClip::new(name, channels))
}

/// Keyframe times must be finite and non-decreasing for sampling to be defined.
fn keyframes_are_ordered(times: &[f32]) -> bool {
    times.iter().all(|t| t.is_finite()) && times.windows(2).all(|pair| pair[0] <= pair[1])
}

/// Cubic-spline outputs are stored as (in-tangent, value, out-tangent) triples.
fn key_values<T>(values: impl Iterator<Item = T>, cubic: bool) -> Vec<T> {
    if cubic {
        values
            .enumerate()
            .filter_map(|(i, v)| (i % 3 == 1).then_some(v))
            .collect()
    } else {
        values.collect()
    }
}

#[cfg(test)]
pub(super) mod tests {
    use super::*;

    /// Assemble a binary glTF container from a JSON document and one buffer.
    pub(crate) fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let mut bin = bin.to_vec();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }
        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&json);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(&bin);
        out
    }

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    const TRIANGLE: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];

    /// One node with one unindexed triangle.
    pub(crate) fn triangle_glb() -> Vec<u8> {
        let json = r#"{
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "name": "roof", "mesh": 0 }],
            "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
            "buffers": [{ "byteLength": 36 }],
            "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }],
            "accessors": [{
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            }]
        }"#;
        glb(json, &f32_bytes(&TRIANGLE))
    }

    /// Root "house" with children "roof" then "door", both instancing mesh 0,
    /// plus a linear translation clip on "door".
    fn house_glb() -> Vec<u8> {
        house_glb_with_times([0.0, 2.0])
    }

    fn house_glb_with_times(times: [f32; 2]) -> Vec<u8> {
        let mut bin = f32_bytes(&TRIANGLE); // 0..36 positions
        bin.extend(f32_bytes(&times)); // 36..44 times
        bin.extend(f32_bytes(&[0.0, 0.0, 0.0, 4.0, 0.0, 0.0])); // 44..68 translations
        let json = r#"{
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [{ "nodes": [0] }],
            "nodes": [
                { "name": "house", "children": [1, 2], "translation": [0.0, 10.0, 0.0] },
                { "name": "roof", "mesh": 0 },
                { "name": "door", "mesh": 0 }
            ],
            "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
            "animations": [{
                "name": "swing",
                "channels": [{ "sampler": 0, "target": { "node": 2, "path": "translation" } }],
                "samplers": [{ "input": 1, "output": 2, "interpolation": "LINEAR" }]
            }],
            "buffers": [{ "byteLength": 68 }],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
                { "buffer": 0, "byteOffset": 36, "byteLength": 8 },
                { "buffer": 0, "byteOffset": 44, "byteLength": 24 }
            ],
            "accessors": [
                { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                  "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
                { "bufferView": 1, "componentType": 5126, "count": 2, "type": "SCALAR",
                  "min": [0.0], "max": [2.0] },
                { "bufferView": 2, "componentType": 5126, "count": 2, "type": "VEC3" }
            ]
        }"#;
        glb(json, &bin)
    }

    #[test]
    fn parses_a_single_triangle() {
        let model = parse_gltf(&triangle_glb(), None).expect("parse");
        assert_eq!(model.primitives().len(), 1);
        let primitive = &model.primitives()[0];
        assert_eq!(primitive.indices, vec![0, 1, 2]);
        assert_eq!(primitive.normals.len(), 3);
        assert_eq!(model.nodes()[0].name.as_deref(), Some("roof"));
    }

    #[test]
    fn instanced_meshes_follow_the_hierarchy() {
        let model = parse_gltf(&house_glb(), None).expect("parse");
        assert_eq!(model.roots(), &[0]);
        assert_eq!(model.primitives().len(), 2);
        assert_eq!(model.mesh_order(), vec![0, 1]);
        assert_eq!(model.primitives()[0].node, 1);
        assert_eq!(model.primitives()[1].node, 2);

        let door = model.node_world(2).transform_point3(Vec3::ZERO);
        assert!((door - Vec3::new(0.0, 10.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn animations_become_clips() {
        let model = parse_gltf(&house_glb(), None).expect("parse");
        assert_eq!(model.clips().len(), 1);
        let clip = &model.clips()[0];
        assert_eq!(clip.name, "swing");
        assert_eq!(clip.duration, 2.0);
        assert_eq!(clip.channels[0].node, 2);
        assert!(matches!(
            clip.channels[0].values,
            ChannelValues::Translation(ref v) if v[1] == Vec3::new(4.0, 0.0, 0.0)
        ));
    }

    #[test]
    fn unsorted_keyframes_are_dropped() {
        let model = parse_gltf(&house_glb_with_times([2.0, 0.0]), None).expect("parse");
        assert!(model.clips().is_empty());
        assert!(keyframes_are_ordered(&[0.0, 0.0, 1.0]));
        assert!(!keyframes_are_ordered(&[f32::NAN, 1.0]));
        assert!(!keyframes_are_ordered(&[0.0, f32::INFINITY]));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            parse_gltf(b"definitely not gltf", None),
            Err(AssetError::ParseGltf(_))
        ));
    }

    #[test]
    fn strips_and_fans_become_lists() {
        assert_eq!(strip_to_list(&[0, 1, 2, 3]), vec![0, 1, 2, 2, 1, 3]);
        assert_eq!(fan_to_list(&[0, 1, 2, 3]), vec![0, 1, 2, 0, 2, 3]);
        assert!(strip_to_list(&[0, 1]).is_empty());
    }

    #[test]
    fn cubic_spline_keeps_the_middle_value() {
        let values = key_values([9, 1, 9, 9, 2, 9].into_iter(), true);
        assert_eq!(values, vec![1, 2]);
    }
}
