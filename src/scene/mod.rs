use crate::registry::InstanceId;
use crate::spatial::{Pose, Ray};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Handle referencing a node within the scene graph.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Owned description of a node tree, produced by template factories and
/// handed to the graph on insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSubtree {
    pub label: String,
    pub local: Pose,
    /// Radius of a bounding sphere around the node origin, in local units.
    /// Nodes without bounds are never returned by ray casts.
    pub bounds_radius: Option<f32>,
    pub children: Vec<SceneSubtree>,
}

impl SceneSubtree {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            local: Pose::IDENTITY,
            bounds_radius: None,
            children: Vec::new(),
        }
    }

    pub fn with_local(mut self, local: Pose) -> Self {
        self.local = local;
        self
    }

    pub fn with_bounds(mut self, radius: f32) -> Self {
        self.bounds_radius = Some(radius);
        self
    }

    pub fn with_child(mut self, child: SceneSubtree) -> Self {
        self.children.push(child);
        self
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SceneSubtree::node_count).sum::<usize>()
    }
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub label: String,
    pub local: Pose,
    pub bounds_radius: Option<f32>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    owner: Option<InstanceId>,
}

impl SceneNode {
    pub fn owner(&self) -> Option<InstanceId> {
        self.owner
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneHit {
    pub node: NodeId,
    pub distance: f32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("node {0:?} does not exist in this scene")]
    NoSuchNode(NodeId),
}

/// Arena of scene nodes. Every node inserted on behalf of a placed instance
/// carries that instance's id, so resolving a hit node to its owner is a
/// single lookup.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    roots: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn get(&self, node: NodeId) -> Option<&SceneNode> {
        self.nodes.get(node.0 as usize)
    }

    /// Takes ownership of `subtree`, tags every node with `owner` and returns
    /// the id of the new root.
    pub fn insert_subtree(&mut self, subtree: SceneSubtree, owner: Option<InstanceId>) -> NodeId {
        let root = self.insert_node(subtree, None, owner);
        self.roots.push(root);
        root
    }

    fn insert_node(
        &mut self,
        subtree: SceneSubtree,
        parent: Option<NodeId>,
        owner: Option<InstanceId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SceneNode {
            label: subtree.label,
            local: subtree.local,
            bounds_radius: subtree.bounds_radius,
            parent,
            children: Vec::with_capacity(subtree.children.len()),
            owner,
        });

        for child in subtree.children {
            let child_id = self.insert_node(child, Some(id), owner);
            self.nodes[id.0 as usize].children.push(child_id);
        }
        id
    }

    pub fn owner(&self, node: NodeId) -> Option<InstanceId> {
        self.get(node).and_then(SceneNode::owner)
    }

    pub fn set_local_pose(&mut self, node: NodeId, pose: Pose) -> Result<(), SceneError> {
        let entry = self
            .nodes
            .get_mut(node.0 as usize)
            .ok_or(SceneError::NoSuchNode(node))?;
        entry.local = pose;
        Ok(())
    }

    pub fn world_pose(&self, node: NodeId) -> Option<Pose> {
        let entry = self.get(node)?;
        let local = entry.local;
        match entry.parent {
            Some(parent) => Some(self.world_pose(parent)?.compose(&local)),
            None => Some(local),
        }
    }

    /// Nearest node whose bounding sphere the ray enters.
    pub fn raycast(&self, ray: &Ray) -> Option<SceneHit> {
        let mut best: Option<SceneHit> = None;
        for (index, entry) in self.nodes.iter().enumerate() {
            let Some(radius) = entry.bounds_radius else {
                continue;
            };
            let node = NodeId(index as u32);
            let Some(world) = self.world_pose(node) else {
                continue;
            };
            let Some(distance) = ray.intersect_sphere(world.position, radius * world.max_scale())
            else {
                continue;
            };
            if best.map_or(true, |hit| distance < hit.distance) {
                best = Some(SceneHit { node, distance });
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::Vec3;

    fn chair() -> SceneSubtree {
        SceneSubtree::new("chair")
            .with_child(
                SceneSubtree::new("seat")
                    .with_local(Pose::from_position(Vec3::new(0.0, 0.5, 0.0)))
                    .with_bounds(0.4),
            )
            .with_child(SceneSubtree::new("legs"))
    }

    #[test]
    fn insert_tags_every_node_with_owner() {
        let mut scene = SceneGraph::new();
        let owner = InstanceId::from_raw(3);
        let root = scene.insert_subtree(chair(), Some(owner));

        assert_eq!(scene.len(), 3);
        assert_eq!(scene.roots(), &[root]);
        for child in scene.get(root).expect("root").children.clone() {
            assert_eq!(scene.owner(child), Some(owner));
            assert_eq!(scene.get(child).expect("child").parent, Some(root));
        }
    }

    #[test]
    fn raycast_returns_nearest_bounded_node() {
        let mut scene = SceneGraph::new();
        let near = scene.insert_subtree(
            SceneSubtree::new("near")
                .with_local(Pose::from_position(Vec3::new(0.0, 0.0, -2.0)))
                .with_bounds(0.5),
            None,
        );
        scene.insert_subtree(
            SceneSubtree::new("far")
                .with_local(Pose::from_position(Vec3::new(0.0, 0.0, -6.0)))
                .with_bounds(0.5),
            None,
        );

        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z).expect("ray");
        let hit = scene.raycast(&ray).expect("hit");
        assert_eq!(hit.node, near);
        assert!((hit.distance - 1.5).abs() < 1.0e-4);
    }

    #[test]
    fn raycast_uses_parent_transform_for_children() {
        let mut scene = SceneGraph::new();
        let root = scene.insert_subtree(chair(), None);
        scene
            .set_local_pose(root, Pose::from_position(Vec3::new(4.0, 0.0, 0.0)))
            .expect("root exists");

        let down = Ray::new(Vec3::new(4.0, 5.0, 0.0), Vec3::NEG_Y).expect("ray");
        let hit = scene.raycast(&down).expect("seat hit");
        assert_eq!(scene.get(hit.node).expect("node").label, "seat");

        let old_spot = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y).expect("ray");
        assert!(scene.raycast(&old_spot).is_none());
    }

    #[test]
    fn set_pose_on_unknown_node_fails() {
        let mut scene = SceneGraph::new();
        let err = scene
            .set_local_pose(NodeId(42), Pose::IDENTITY)
            .expect_err("missing node");
        assert_eq!(err, SceneError::NoSuchNode(NodeId(42)));
    }

    #[test]
    fn subtree_counts_nested_nodes() {
        assert_eq!(chair().node_count(), 3);
    }
}
