//! Small in-memory models shared by unit tests across modules.

use super::{AnimationClip, Model, ModelNode, NodeTransform, Primitive};
use glam::Vec3;

/// A 2x2 quad facing +Z, centred on (0, 0, `z`) in the local space of `node`.
pub fn quad(node: usize, z: f32) -> Primitive {
    let positions = vec![
        Vec3::new(-1.0, -1.0, z),
        Vec3::new(1.0, -1.0, z),
        Vec3::new(1.0, 1.0, z),
        Vec3::new(-1.0, 1.0, z),
    ];
    Primitive::new(node, positions, None, vec![0, 1, 2, 0, 2, 3], [1.0; 4])
        .expect("quad has vertices")
}

/// One root node per quad, each translated to (0, 0, z).
pub fn quad_model(depths: &[f32]) -> Model {
    let placed: Vec<Vec3> = depths.iter().map(|z| Vec3::new(0.0, 0.0, *z)).collect();
    placed_quads(&placed, Vec::new())
}

/// One root node per quad, each translated to the given offset.
pub fn placed_quads(offsets: &[Vec3], clips: Vec<AnimationClip>) -> Model {
    let mut nodes = Vec::with_capacity(offsets.len());
    let mut primitives = Vec::with_capacity(offsets.len());
    for (index, offset) in offsets.iter().enumerate() {
        nodes.push(ModelNode {
            name: Some(format!("quad{index}")),
            transform: NodeTransform::from_translation(*offset),
            children: Vec::new(),
            primitives: vec![index],
        });
        primitives.push(quad(index, 0.0));
    }
    let roots = (0..nodes.len()).collect();
    Model::new(nodes, roots, primitives, clips)
}
