use serde::{Deserialize, Serialize};

/// Semantic humanoid bone names.
///
/// Rigs name their joints however their authoring tool likes; components look
/// bones up by these semantic names instead, through the rig descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum HumanBone {
    // ==================== Torso ====================
    Hips = 0,
    Spine = 1,
    Chest = 2,
    UpperChest = 3,
    Neck = 4,
    Head = 5,

    // ==================== Left Arm ====================
    LeftShoulder = 10,
    LeftUpperArm = 11,
    LeftLowerArm = 12,
    LeftHand = 13,

    // ==================== Right Arm ====================
    RightShoulder = 20,
    RightUpperArm = 21,
    RightLowerArm = 22,
    RightHand = 23,

    // ==================== Left Leg ====================
    LeftUpperLeg = 30,
    LeftLowerLeg = 31,
    LeftFoot = 32,
    LeftToes = 33,

    // ==================== Right Leg ====================
    RightUpperLeg = 40,
    RightLowerLeg = 41,
    RightFoot = 42,
    RightToes = 43,
}

impl HumanBone {
    pub const ALL: [HumanBone; 22] = [
        HumanBone::Hips,
        HumanBone::Spine,
        HumanBone::Chest,
        HumanBone::UpperChest,
        HumanBone::Neck,
        HumanBone::Head,
        HumanBone::LeftShoulder,
        HumanBone::LeftUpperArm,
        HumanBone::LeftLowerArm,
        HumanBone::LeftHand,
        HumanBone::RightShoulder,
        HumanBone::RightUpperArm,
        HumanBone::RightLowerArm,
        HumanBone::RightHand,
        HumanBone::LeftUpperLeg,
        HumanBone::LeftLowerLeg,
        HumanBone::LeftFoot,
        HumanBone::LeftToes,
        HumanBone::RightUpperLeg,
        HumanBone::RightLowerLeg,
        HumanBone::RightFoot,
        HumanBone::RightToes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HumanBone::Hips => "Hips",
            HumanBone::Spine => "Spine",
            HumanBone::Chest => "Chest",
            HumanBone::UpperChest => "UpperChest",
            HumanBone::Neck => "Neck",
            HumanBone::Head => "Head",
            HumanBone::LeftShoulder => "LeftShoulder",
            HumanBone::LeftUpperArm => "LeftUpperArm",
            HumanBone::LeftLowerArm => "LeftLowerArm",
            HumanBone::LeftHand => "LeftHand",
            HumanBone::RightShoulder => "RightShoulder",
            HumanBone::RightUpperArm => "RightUpperArm",
            HumanBone::RightLowerArm => "RightLowerArm",
            HumanBone::RightHand => "RightHand",
            HumanBone::LeftUpperLeg => "LeftUpperLeg",
            HumanBone::LeftLowerLeg => "LeftLowerLeg",
            HumanBone::LeftFoot => "LeftFoot",
            HumanBone::LeftToes => "LeftToes",
            HumanBone::RightUpperLeg => "RightUpperLeg",
            HumanBone::RightLowerLeg => "RightLowerLeg",
            HumanBone::RightFoot => "RightFoot",
            HumanBone::RightToes => "RightToes",
        }
    }

    /// Case-insensitive lookup by [`HumanBone::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|bone| bone.name().eq_ignore_ascii_case(name))
    }

    /// The bone this one hangs from in the standard humanoid hierarchy.
    /// `None` for the hips, which hang from the rig root.
    pub fn parent(&self) -> Option<HumanBone> {
        match self {
            HumanBone::Hips => None,
            HumanBone::Spine => Some(HumanBone::Hips),
            HumanBone::Chest => Some(HumanBone::Spine),
            HumanBone::UpperChest => Some(HumanBone::Chest),
            HumanBone::Neck => Some(HumanBone::UpperChest),
            HumanBone::Head => Some(HumanBone::Neck),
            HumanBone::LeftShoulder | HumanBone::RightShoulder => Some(HumanBone::UpperChest),
            HumanBone::LeftUpperArm => Some(HumanBone::LeftShoulder),
            HumanBone::LeftLowerArm => Some(HumanBone::LeftUpperArm),
            HumanBone::LeftHand => Some(HumanBone::LeftLowerArm),
            HumanBone::RightUpperArm => Some(HumanBone::RightShoulder),
            HumanBone::RightLowerArm => Some(HumanBone::RightUpperArm),
            HumanBone::RightHand => Some(HumanBone::RightLowerArm),
            HumanBone::LeftUpperLeg | HumanBone::RightUpperLeg => Some(HumanBone::Hips),
            HumanBone::LeftLowerLeg => Some(HumanBone::LeftUpperLeg),
            HumanBone::LeftFoot => Some(HumanBone::LeftLowerLeg),
            HumanBone::LeftToes => Some(HumanBone::LeftFoot),
            HumanBone::RightLowerLeg => Some(HumanBone::RightUpperLeg),
            HumanBone::RightFoot => Some(HumanBone::RightLowerLeg),
            HumanBone::RightToes => Some(HumanBone::RightFoot),
        }
    }
}

impl std::fmt::Display for HumanBone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for bone in HumanBone::ALL {
            assert_eq!(HumanBone::from_name(bone.name()), Some(bone));
        }
        assert_eq!(HumanBone::from_name("lefttoes"), Some(HumanBone::LeftToes));
        assert_eq!(HumanBone::from_name("tail"), None);
    }

    #[test]
    fn every_parent_chain_reaches_the_hips() {
        for bone in HumanBone::ALL {
            let mut current = bone;
            let mut hops = 0;
            while let Some(parent) = current.parent() {
                current = parent;
                hops += 1;
                assert!(hops < HumanBone::ALL.len(), "cycle at {bone}");
            }
            assert_eq!(current, HumanBone::Hips);
        }
    }

    #[test]
    fn parents_precede_children_in_all() {
        for (index, bone) in HumanBone::ALL.iter().enumerate() {
            if let Some(parent) = bone.parent() {
                let parent_index = HumanBone::ALL
                    .iter()
                    .position(|candidate| *candidate == parent)
                    .unwrap();
                assert!(parent_index < index, "{parent} listed after {bone}");
            }
        }
    }
}
