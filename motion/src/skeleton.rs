//! Rig descriptor: an ordered arena of named bones with parent indices.
//!
//! Built once when a rig is assembled and queried by name or semantic bone
//! afterwards, so no component ever walks a live transform hierarchy.

use std::collections::HashMap;

use bevy::transform::components::Transform;
use common::HumanBone;
use serde::{Deserialize, Serialize};

use crate::error::RigError;

/// Index of a bone inside a [`RigDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoneId(pub u16);

impl BoneId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoneDef {
    pub name: String,
    pub parent: Option<BoneId>,
    pub semantic: Option<HumanBone>,
}

/// Serializable bone entry used by rig files and the builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoneEntry {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub semantic: Option<HumanBone>,
}

#[derive(Debug, Clone)]
pub struct RigDescriptor {
    bones: Vec<BoneDef>,
    by_name: HashMap<String, BoneId>,
    by_semantic: HashMap<HumanBone, BoneId>,
}

impl RigDescriptor {
    pub fn builder() -> RigDescriptorBuilder {
        RigDescriptorBuilder::default()
    }

    pub fn from_entries(entries: &[BoneEntry]) -> Result<Self, RigError> {
        let mut builder = Self::builder();
        for entry in entries {
            builder = builder.entry(entry.clone());
        }
        builder.build()
    }

    /// Standard biped: a `Root` bone followed by every [`HumanBone`] in
    /// hierarchy order.
    pub fn humanoid() -> Self {
        let mut builder = Self::builder().bone("Root", None);
        for bone in HumanBone::ALL {
            let parent = bone.parent().map(|parent| parent.name()).unwrap_or("Root");
            builder = builder.semantic_bone(bone.name(), Some(parent), bone);
        }
        // Names come from a fixed table whose parents precede children.
        match builder.build() {
            Ok(descriptor) => descriptor,
            Err(error) => unreachable!("built-in humanoid rig is malformed: {error}"),
        }
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bone(&self, id: BoneId) -> Option<&BoneDef> {
        self.bones.get(id.index())
    }

    pub fn find(&self, name: &str) -> Option<BoneId> {
        self.by_name.get(name).copied()
    }

    pub fn semantic(&self, bone: HumanBone) -> Option<BoneId> {
        self.by_semantic.get(&bone).copied()
    }

    pub fn require(&self, bone: HumanBone) -> Result<BoneId, RigError> {
        self.semantic(bone).ok_or(RigError::MissingBone(bone))
    }

    /// First bone without a parent.
    pub fn root(&self) -> Option<BoneId> {
        self.bones
            .iter()
            .position(|bone| bone.parent.is_none())
            .map(|index| BoneId(index as u16))
    }

    pub fn parent(&self, id: BoneId) -> Option<BoneId> {
        self.bone(id).and_then(|bone| bone.parent)
    }

    pub fn ids(&self) -> impl Iterator<Item = BoneId> + '_ {
        (0..self.bones.len()).map(|index| BoneId(index as u16))
    }

    pub fn is_descendant_of(&self, bone: BoneId, ancestor: BoneId) -> bool {
        let mut current = Some(bone);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// `start` followed by every bone below it. Parents always precede
    /// children in the arena, so a single forward scan suffices.
    pub fn descendants(&self, start: BoneId) -> Vec<BoneId> {
        self.ids()
            .skip(start.index())
            .filter(|id| self.is_descendant_of(*id, start))
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct RigDescriptorBuilder {
    entries: Vec<BoneEntry>,
}

impl RigDescriptorBuilder {
    pub fn bone(self, name: &str, parent: Option<&str>) -> Self {
        self.entry(BoneEntry {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            semantic: None,
        })
    }

    pub fn semantic_bone(self, name: &str, parent: Option<&str>, semantic: HumanBone) -> Self {
        self.entry(BoneEntry {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            semantic: Some(semantic),
        })
    }

    pub fn entry(mut self, entry: BoneEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn build(self) -> Result<RigDescriptor, RigError> {
        let mut bones = Vec::with_capacity(self.entries.len());
        let mut by_name = HashMap::with_capacity(self.entries.len());
        let mut by_semantic = HashMap::new();

        for entry in self.entries {
            let id = BoneId(bones.len() as u16);
            if by_name.contains_key(&entry.name) {
                return Err(RigError::DuplicateBone(entry.name));
            }

            // Parents must already be declared, which keeps the arena
            // topologically ordered.
            let parent = match entry.parent {
                Some(parent_name) => match by_name.get(&parent_name) {
                    Some(parent) => Some(*parent),
                    None => {
                        return Err(RigError::UnknownParent {
                            bone: entry.name,
                            parent: parent_name,
                        });
                    }
                },
                None => None,
            };

            if let Some(semantic) = entry.semantic {
                by_semantic.entry(semantic).or_insert(id);
            }
            by_name.insert(entry.name.clone(), id);
            bones.push(BoneDef {
                name: entry.name,
                parent,
                semantic: entry.semantic,
            });
        }

        Ok(RigDescriptor {
            bones,
            by_name,
            by_semantic,
        })
    }
}

/// World-space snapshot of every bone, indexed like the descriptor it was
/// captured from.
#[derive(Debug, Clone, Default)]
pub struct StoredPose {
    transforms: Vec<Option<Transform>>,
}

impl StoredPose {
    pub fn capture(
        rig: &RigDescriptor,
        mut lookup: impl FnMut(BoneId) -> Option<Transform>,
    ) -> Self {
        Self {
            transforms: rig.ids().map(&mut lookup).collect(),
        }
    }

    pub fn get(&self, bone: BoneId) -> Option<&Transform> {
        self.transforms.get(bone.index()).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}
