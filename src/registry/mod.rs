use crate::catalog::ModelTemplate;
use crate::scene::{NodeId, SceneGraph};
use crate::spatial::Pose;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(u64);

impl InstanceId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

#[derive(Debug, Clone)]
pub struct PlacedInstance {
    id: InstanceId,
    template: usize,
    root: NodeId,
    pub pose: Pose,
    selected: bool,
}

impl PlacedInstance {
    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn template(&self) -> usize {
        self.template
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }
}

/// Serializable view of one placed instance, for host overlays and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    pub id: InstanceId,
    pub template: usize,
    pub pose: Pose,
    pub selected: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("instance {0:?} is not registered")]
    UnknownInstance(InstanceId),
}

/// Owns every placed instance, the scene they live in, and the single
/// selection slot.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    scene: SceneGraph,
    instances: Vec<PlacedInstance>,
    lookup: HashMap<InstanceId, usize>,
    selected: Option<InstanceId>,
    next_id: u64,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlacedInstance> {
        self.instances.iter()
    }

    pub fn get(&self, id: InstanceId) -> Option<&PlacedInstance> {
        self.lookup.get(&id).map(|&slot| &self.instances[slot])
    }

    /// Instantiates `template` at `pose`, adds it to the scene and makes it
    /// the selected instance.
    pub fn spawn(&mut self, template: &ModelTemplate, pose: Pose) -> InstanceId {
        let id = InstanceId(self.next_id);
        self.next_id += 1;

        let subtree = template.instantiate().with_local(pose);
        let root = self.scene.insert_subtree(subtree, Some(id));

        self.lookup.insert(id, self.instances.len());
        self.instances.push(PlacedInstance {
            id,
            template: template.index(),
            root,
            pose,
            selected: false,
        });
        log::info!(
            "[registry] spawned {:?} from {} at {:?}",
            id,
            template.asset(),
            pose.position
        );

        self.mark_selected(id);
        id
    }

    pub fn select(&mut self, id: InstanceId) -> Result<(), RegistryError> {
        if !self.lookup.contains_key(&id) {
            return Err(RegistryError::UnknownInstance(id));
        }
        self.mark_selected(id);
        Ok(())
    }

    pub fn deselect(&mut self) {
        if let Some(previous) = self.selected.take() {
            if let Some(instance) = self.instance_mut(previous) {
                instance.selected = false;
            }
        }
    }

    pub fn selected(&self) -> Option<&PlacedInstance> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn selected_id(&self) -> Option<InstanceId> {
        self.selected
    }

    /// Resolves any node of a placed subtree to the instance that owns it.
    pub fn find_root(&self, node: NodeId) -> Option<InstanceId> {
        self.scene
            .owner(node)
            .filter(|id| self.lookup.contains_key(id))
    }

    /// Applies `edit` to the selected instance's pose and mirrors the result
    /// onto its scene root. Returns `false` when nothing is selected.
    pub fn edit_selected<F>(&mut self, edit: F) -> bool
    where
        F: FnOnce(&mut Pose),
    {
        let Some(id) = self.selected else {
            return false;
        };
        let Some(&slot) = self.lookup.get(&id) else {
            return false;
        };

        let instance = &mut self.instances[slot];
        edit(&mut instance.pose);
        let (root, pose) = (instance.root, instance.pose);
        if let Err(err) = self.scene.set_local_pose(root, pose) {
            log::error!("[registry] {:?} lost its scene root: {err}", id);
        }
        true
    }

    pub fn snapshot(&self) -> Vec<InstanceSnapshot> {
        self.instances
            .iter()
            .map(|instance| InstanceSnapshot {
                id: instance.id,
                template: instance.template,
                pose: instance.pose,
                selected: instance.selected,
            })
            .collect()
    }

    fn mark_selected(&mut self, id: InstanceId) {
        self.deselect();
        if let Some(instance) = self.instance_mut(id) {
            instance.selected = true;
            self.selected = Some(id);
        }
    }

    fn instance_mut(&mut self, id: InstanceId) -> Option<&mut PlacedInstance> {
        let slot = *self.lookup.get(&id)?;
        self.instances.get_mut(slot)
    }
}
