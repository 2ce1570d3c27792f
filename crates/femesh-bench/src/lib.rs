//! Benchmark profiles for the femesh region engine.
//!
//! - [`reference_mesh`]: 10x10x10 cubes (1331 nodes) with faces and lines
//! - [`split_mesh`]: the reference block split into two regions sharing
//!   the nodes of the cut plane, for merge benchmarks
//! - [`jitter_coordinates`]: deterministic coordinate noise via seed

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use femesh_core::{MeshError, NodeId};
use femesh_region::{Region, RegionConfig};
use femesh_test_utils::fixtures::{coordinate_field, Grid};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Cubes along each direction of the reference block.
pub const REFERENCE_CUBES: u32 = 10;

/// Build the reference profile: a 10x10x10 cube block with shared faces
/// and lines, coordinates jittered by `seed`.
pub fn reference_mesh(seed: u64) -> Result<Region, MeshError> {
    let region = Region::new(RegionConfig::default())?;
    Grid::new(&[REFERENCE_CUBES; 3]).build_with_faces(&region)?;
    jitter_coordinates(&region, seed, 0.1)?;
    Ok(region)
}

/// Build the reference block, without faces, as two halves in separate
/// regions.
///
/// Both halves use the reference block's node numbering, so the nodes on
/// the cut plane have the same identifiers (and the same jittered
/// coordinates) in both, and merging the second into the first
/// reproduces the whole block.
pub fn split_mesh(seed: u64) -> Result<(Region, Region), MeshError> {
    let half = REFERENCE_CUBES / 2;
    let lower = Region::new(RegionConfig::default())?;
    let upper = Region::new(RegionConfig::default())?;
    Grid::new(&[REFERENCE_CUBES, REFERENCE_CUBES, half]).build(&lower)?;
    let nodes_per_layer = (REFERENCE_CUBES + 1) * (REFERENCE_CUBES + 1);
    let elements_per_layer = REFERENCE_CUBES * REFERENCE_CUBES;
    Grid::new(&[REFERENCE_CUBES, REFERENCE_CUBES, REFERENCE_CUBES - half])
        .with_origin([0.0, 0.0, f64::from(half)])
        .with_first_node(1 + half * nodes_per_layer)
        .with_first_element(1 + half * elements_per_layer)
        .build(&upper)?;
    jitter_coordinates(&lower, seed, 0.1)?;
    jitter_coordinates(&upper, seed, 0.1)?;
    Ok((lower, upper))
}

/// Add uniform noise in `[-amplitude / 2, amplitude / 2)` to every
/// coordinate of every node, reproducibly for a given `seed`.
///
/// Nodes are visited in identifier order, so two regions holding the same
/// node receive the same perturbation for it. An `amplitude` of zero
/// leaves coordinates untouched.
pub fn jitter_coordinates(region: &Region, seed: u64, amplitude: f64) -> Result<(), MeshError> {
    if amplitude == 0.0 {
        return Ok(());
    }
    let coordinates = coordinate_field(region)?;
    region.begin_change();
    let result = region.for_each_node(|node| {
        let mut rng = ChaCha8Rng::seed_from_u64(seed ^ u64::from(node.identifier().0));
        let Some(mut position) = node.real_values(&coordinates) else {
            return Ok(());
        };
        for x in &mut position {
            *x += (unit_sample(&mut rng) - 0.5) * amplitude;
        }
        region.set_node_real_values(node, &coordinates, &position)
    });
    region.end_change()?;
    result
}

/// Uniform sample in `[0, 1)` from the top 53 bits of the generator.
fn unit_sample(rng: &mut ChaCha8Rng) -> f64 {
    (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
}

/// Identifier of the node at grid position `at` of the reference block.
pub fn reference_node(at: [u32; 3]) -> NodeId {
    Grid::new(&[REFERENCE_CUBES; 3]).node_id(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use femesh_core::ElementKind;

    #[test]
    fn reference_mesh_has_shared_faces() {
        let region = reference_mesh(42).unwrap();
        assert_eq!(region.number_of_nodes(), 11 * 11 * 11);
        assert_eq!(region.number_of_elements_of_kind(ElementKind::Element), 1000);
        // 3 * 11 * 10 * 10 faces, 3 * 11 * 11 * 10 lines
        assert_eq!(region.number_of_elements_of_kind(ElementKind::Face), 3300);
        assert_eq!(region.number_of_elements_of_kind(ElementKind::Line), 3630);
    }

    #[test]
    fn split_halves_share_the_cut_plane() {
        let (lower, upper) = split_mesh(7).unwrap();
        assert_eq!(lower.number_of_nodes(), 11 * 11 * 6);
        assert_eq!(upper.number_of_nodes(), 11 * 11 * 6);
        let cut = reference_node([3, 4, 5]);
        assert!(lower.get_node_from_identifier(cut).is_some());
        assert!(upper.get_node_from_identifier(cut).is_some());
    }

    #[test]
    fn merging_halves_rebuilds_the_block() {
        let (lower, upper) = split_mesh(7).unwrap();
        femesh_region::merge(&lower, &upper).unwrap();
        assert_eq!(lower.number_of_nodes(), 11 * 11 * 11);
        assert_eq!(lower.number_of_elements(), 1000);
        assert_eq!(upper.number_of_nodes(), 11 * 11 * 6);
    }

    #[test]
    fn jitter_is_deterministic() {
        let a = reference_mesh(42).unwrap();
        let b = reference_mesh(42).unwrap();
        let field_a = a.get_field_from_name("coordinates").unwrap();
        let field_b = b.get_field_from_name("coordinates").unwrap();
        let id = reference_node([5, 5, 5]);
        let pa = a.get_node_from_identifier(id).unwrap().real_values(&field_a).unwrap();
        let pb = b.get_node_from_identifier(id).unwrap().real_values(&field_b).unwrap();
        assert_eq!(pa, pb);
        for (x, exact) in pa.iter().zip([5.0, 5.0, 5.0]) {
            assert!((x - exact).abs() <= 0.05, "jitter {x} out of range");
        }
    }
}
