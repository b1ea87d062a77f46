pub mod animation;
pub mod sections;
#[cfg(test)]
pub mod testing;

pub use animation::{AnimationClip, Channel, ChannelValues, Interpolation, Mixer};
pub use sections::{assign_sections, SectionMesh};

use glam::{Mat4, Quat, Vec3};

/// A navigable part of the site, mapped onto part of the model.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Section {
    pub key: String,
    pub title: String,
    pub path: String,
}

impl Section {
    pub fn new(key: &str, title: &str, path: &str) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            path: path.to_string(),
        }
    }
}

/// The rooms of the house, in the order they are dealt out across the model.
pub fn default_sections() -> Vec<Section> {
    vec![
        Section::new("projects", "Projects - Roof Section", "/projects"),
        Section::new("experience", "Experience - Foundation", "/experience"),
        Section::new("cv", "CV - Blueprint", "/cv"),
        Section::new("courses", "Courses - Library", "/courses"),
        Section::new("transcript", "Transcript - Records", "/transcript"),
        Section::new("leadership", "Leadership - Meeting Room", "/leadership"),
        Section::new("social", "Social Media - Windows", "/social"),
        Section::new("contact", "Contact - Door", "/contact"),
    ]
}

/// Hemisphere light data - sky colour from above, ground colour from below
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HemisphereLightData {
    pub sky_color: [f32; 3],
    pub ground_color: [f32; 3],
    pub intensity: f32,
}

impl Default for HemisphereLightData {
    fn default() -> Self {
        Self {
            sky_color: [1.0, 1.0, 1.0],
            ground_color: [0.267, 0.267, 0.267],
            intensity: 0.6,
        }
    }
}

/// Directional light data - shines from `position` towards the origin
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DirectionalLightData {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: [f32; 3],
}

impl Default for DirectionalLightData {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            intensity: 0.8,
            position: [50.0, 50.0, 100.0],
        }
    }
}

impl DirectionalLightData {
    /// Unit vector pointing from the scene towards the light.
    pub fn to_light(&self) -> Vec3 {
        Vec3::from_array(self.position).normalize_or(Vec3::Y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LightRig {
    pub hemisphere: HemisphereLightData,
    pub directional: DirectionalLightData,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl NodeTransform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelNode {
    pub name: Option<String>,
    pub transform: NodeTransform,
    pub children: Vec<usize>,
    pub primitives: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let first = *points.first()?;
        let (min, max) = points
            .iter()
            .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p)));
        Some(Self { min, max })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn transformed(&self, matrix: Mat4) -> Aabb {
        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];
        let moved: Vec<Vec3> = corners
            .iter()
            .map(|corner| matrix.transform_point3(*corner))
            .collect();
        Aabb::from_points(&moved).unwrap_or(*self)
    }
}

/// One drawable, hit-testable triangle set in the local space of its node.
#[derive(Debug, Clone)]
pub struct Primitive {
    pub node: usize,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub bounds: Aabb,
    pub base_color: [f32; 4],
}

impl Primitive {
    /// Missing normals are rebuilt from the triangle faces.
    pub fn new(
        node: usize,
        positions: Vec<Vec3>,
        normals: Option<Vec<Vec3>>,
        indices: Vec<u32>,
        base_color: [f32; 4],
    ) -> Option<Self> {
        let bounds = Aabb::from_points(&positions)?;
        let normals = match normals {
            Some(normals) if normals.len() == positions.len() => normals,
            _ => vertex_normals(&positions, &indices),
        };
        Some(Self {
            node,
            positions,
            normals,
            indices,
            bounds,
            base_color,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangle(&self, index: usize) -> Option<[Vec3; 3]> {
        let base = index.checked_mul(3)?;
        let ids = self.indices.get(base..base + 3)?;
        Some([
            *self.positions.get(ids[0] as usize)?,
            *self.positions.get(ids[1] as usize)?,
            *self.positions.get(ids[2] as usize)?,
        ])
    }
}

fn vertex_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let ids = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if ids.iter().any(|id| *id >= positions.len()) {
            continue;
        }
        let face = (positions[ids[1]] - positions[ids[0]])
            .cross(positions[ids[2]] - positions[ids[0]]);
        for id in ids {
            normals[id] += face;
        }
    }
    normals
        .into_iter()
        .map(|n| n.normalize_or(Vec3::Y))
        .collect()
}

/// A loaded asset: node hierarchy, primitives, clips and cached world matrices.
#[derive(Debug, Clone)]
pub struct Model {
    nodes: Vec<ModelNode>,
    roots: Vec<usize>,
    primitives: Vec<Primitive>,
    clips: Vec<AnimationClip>,
    placement: Mat4,
    world: Vec<Mat4>,
}

impl Model {
    pub fn new(
        nodes: Vec<ModelNode>,
        roots: Vec<usize>,
        primitives: Vec<Primitive>,
        clips: Vec<AnimationClip>,
    ) -> Self {
        let world = vec![Mat4::IDENTITY; nodes.len()];
        let mut model = Self {
            nodes,
            roots,
            primitives,
            clips,
            placement: Mat4::IDENTITY,
            world,
        };
        model.update_world_transforms();
        model
    }

    pub fn nodes(&self) -> &[ModelNode] {
        &self.nodes
    }

    pub fn node_mut(&mut self, index: usize) -> Option<&mut ModelNode> {
        self.nodes.get_mut(index)
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn primitive(&self, index: usize) -> Option<&Primitive> {
        self.primitives.get(index)
    }

    pub fn clips(&self) -> &[AnimationClip] {
        &self.clips
    }

    pub fn placement(&self) -> Mat4 {
        self.placement
    }

    /// Place the whole model at a uniform scale and origin.
    pub fn set_placement(&mut self, scale: f32, position: Vec3) {
        self.placement =
            Mat4::from_scale_rotation_translation(Vec3::splat(scale), Quat::IDENTITY, position);
        self.update_world_transforms();
    }

    pub fn node_world(&self, node: usize) -> Mat4 {
        self.world.get(node).copied().unwrap_or(self.placement)
    }

    pub fn primitive_world(&self, primitive: usize) -> Mat4 {
        match self.primitives.get(primitive) {
            Some(p) => self.node_world(p.node),
            None => self.placement,
        }
    }

    pub fn update_world_transforms(&mut self) {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack: Vec<(usize, Mat4)> = self
            .roots
            .iter()
            .rev()
            .map(|root| (*root, self.placement))
            .collect();
        while let Some((node, parent)) = stack.pop() {
            let Some(seen) = visited.get_mut(node) else {
                continue;
            };
            if *seen {
                continue;
            }
            *seen = true;
            let world = parent * self.nodes[node].transform.matrix();
            self.world[node] = world;
            for child in self.nodes[node].children.iter().rev() {
                stack.push((*child, world));
            }
        }
    }

    /// Primitive ids in depth-first pre-order: roots in document order, a
    /// node's own primitives before its children.
    pub fn mesh_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.primitives.len());
        let mut visited = vec![false; self.nodes.len()];
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            let Some(seen) = visited.get_mut(node) else {
                continue;
            };
            if *seen {
                continue;
            }
            *seen = true;
            order.extend(
                self.nodes[node]
                    .primitives
                    .iter()
                    .copied()
                    .filter(|id| *id < self.primitives.len()),
            );
            stack.extend(self.nodes[node].children.iter().rev().copied());
        }
        order
    }

    /// World-space bounds over every primitive.
    pub fn bounds(&self) -> Option<Aabb> {
        self.primitives
            .iter()
            .enumerate()
            .map(|(id, p)| p.bounds.transformed(self.primitive_world(id)))
            .reduce(|acc, b| acc.union(&b))
    }
}

/// The scene graph owned by one controller: lights and, once loaded, the model.
#[derive(Debug, Clone)]
pub struct SceneState {
    pub lights: LightRig,
    model: Option<Model>,
}

impl SceneState {
    pub fn new(lights: LightRig) -> Self {
        Self {
            lights,
            model: None,
        }
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    pub fn model_mut(&mut self) -> Option<&mut Model> {
        self.model.as_mut()
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Insert the model once; a second insert is refused.
    pub fn insert_model(&mut self, model: Model) -> bool {
        if self.model.is_some() {
            return false;
        }
        self.model = Some(model);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{quad, quad_model};
    use super::*;

    #[test]
    fn default_sections_match_the_house_rooms() {
        let sections = default_sections();
        assert_eq!(sections.len(), 8);
        assert_eq!(sections[0].title, "Projects - Roof Section");
        assert_eq!(sections[0].path, "/projects");
        assert_eq!(sections[7].key, "contact");
    }

    #[test]
    fn mesh_order_is_depth_first_pre_order() {
        // root0 -> (child2 -> grandchild3), root1
        let mut nodes = vec![ModelNode::default(); 4];
        nodes[0].children = vec![2];
        nodes[2].children = vec![3];
        nodes[0].primitives = vec![0];
        nodes[1].primitives = vec![1];
        nodes[2].primitives = vec![2, 3];
        nodes[3].primitives = vec![4];
        let primitives = vec![
            quad(0, 0.0),
            quad(1, 0.0),
            quad(2, 0.0),
            quad(2, 0.0),
            quad(3, 0.0),
        ];
        let model = Model::new(nodes, vec![0, 1], primitives, Vec::new());
        assert_eq!(model.mesh_order(), vec![0, 2, 3, 4, 1]);
    }

    #[test]
    fn world_transforms_compose_parent_and_placement() {
        let mut nodes = vec![ModelNode::default(); 2];
        nodes[0].transform = NodeTransform::from_translation(Vec3::new(10.0, 0.0, 0.0));
        nodes[0].children = vec![1];
        nodes[1].transform = NodeTransform::from_translation(Vec3::new(0.0, 5.0, 0.0));
        let mut model = Model::new(nodes, vec![0], Vec::new(), Vec::new());
        model.set_placement(0.1, Vec3::ZERO);

        let origin = model.node_world(1).transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(1.0, 0.5, 0.0)).length() < 1e-5);
    }

    #[test]
    fn cyclic_hierarchy_does_not_hang() {
        let mut nodes = vec![ModelNode::default(); 2];
        nodes[0].children = vec![1];
        nodes[1].children = vec![0];
        nodes[1].primitives = vec![0];
        let model = Model::new(nodes, vec![0], vec![quad(1, 0.0)], Vec::new());
        assert_eq!(model.mesh_order(), vec![0]);
    }

    #[test]
    fn missing_normals_are_rebuilt() {
        let p = quad(0, 0.0);
        assert_eq!(p.normals.len(), p.positions.len());
        for n in &p.normals {
            assert!((n.z - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn scene_accepts_exactly_one_model() {
        let mut scene = SceneState::new(LightRig::default());
        assert!(!scene.has_model());
        assert!(scene.insert_model(quad_model(&[0.0])));
        assert!(!scene.insert_model(quad_model(&[1.0])));
        assert_eq!(scene.model().map(|m| m.primitives().len()), Some(1));
    }

    #[test]
    fn bounds_cover_all_primitives() {
        let model = quad_model(&[0.0, -10.0]);
        let bounds = model.bounds().expect("bounds");
        assert!((bounds.min.z + 10.0).abs() < 1e-5);
        assert!(bounds.max.z.abs() < 1e-5);
        assert!((bounds.extent().x - 2.0).abs() < 1e-5);
    }
}
