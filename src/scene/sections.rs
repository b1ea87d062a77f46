use super::Section;

/// A primitive that answers hover and click for one section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionMesh {
    pub primitive: usize,
    pub section: Section,
}

/// Deal sections out over the primitives round-robin: the i-th primitive in
/// traversal order gets `sections[i % len]`. No sections means nothing is
/// interactive.
pub fn assign_sections(mesh_order: &[usize], sections: &[Section]) -> Vec<SectionMesh> {
    if sections.is_empty() {
        return Vec::new();
    }
    mesh_order
        .iter()
        .enumerate()
        .map(|(i, primitive)| SectionMesh {
            primitive: *primitive,
            section: sections[i % sections.len()].clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::default_sections;

    #[test]
    fn sections_wrap_around_in_traversal_order() {
        let sections = default_sections();
        let order: Vec<usize> = (0..20).map(|i| 100 + i).collect();
        let assigned = assign_sections(&order, &sections);

        assert_eq!(assigned.len(), 20);
        for (i, mesh) in assigned.iter().enumerate() {
            assert_eq!(mesh.primitive, 100 + i);
            assert_eq!(mesh.section, sections[i % 8]);
        }
        assert_eq!(assigned[8].section.key, "projects");
        assert_eq!(assigned[19].section.key, "courses");
    }

    #[test]
    fn fewer_meshes_than_sections_leaves_the_rest_unused() {
        let sections = default_sections();
        let assigned = assign_sections(&[7, 3], &sections);
        let keys: Vec<&str> = assigned.iter().map(|m| m.section.key.as_str()).collect();
        assert_eq!(keys, ["projects", "experience"]);
    }

    #[test]
    fn no_sections_means_no_interactive_meshes() {
        assert!(assign_sections(&[0, 1, 2], &[]).is_empty());
        assert!(assign_sections(&[], &default_sections()).is_empty());
    }
}
