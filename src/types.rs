use cgmath::{Quaternion as CgQuaternion, Rotation, Vector3};
use std::fmt;
use std::str::FromStr;

use crate::error::{BvhError, Result};
use crate::kinematics;

/////////////////////////////////////////////////////////////////////////////////////////////////

pub type Index = usize;
pub type ParentIndex = isize; // -1 if joint has no parent
pub type Quaternion = CgQuaternion<f64>;
pub type Position = Vector3<f64>;
pub type Depth = usize;

/// Parent index of the root joint.
pub const ROOT_PARENT: ParentIndex = -1;

/////////////////////////////////////////////////////////////////////////////////////////////////

/// One animated degree of freedom as declared on a `CHANNELS` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Xposition,
    Yposition,
    Zposition,
    Xrotation,
    Yrotation,
    Zrotation,
}

impl Channel {
    pub fn is_position(&self) -> bool {
        matches!(
            self,
            Channel::Xposition | Channel::Yposition | Channel::Zposition
        )
    }

    pub fn is_rotation(&self) -> bool {
        !self.is_position()
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Xposition" => Ok(Channel::Xposition),
            "Yposition" => Ok(Channel::Yposition),
            "Zposition" => Ok(Channel::Zposition),
            "Xrotation" => Ok(Channel::Xrotation),
            "Yrotation" => Ok(Channel::Yrotation),
            "Zrotation" => Ok(Channel::Zrotation),
            _ => Err(format!("unknown channel `{s}`")),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: String,
    pub index: Index,
    pub parent_index: ParentIndex,
    pub depth: Depth,
    /// Translation from the parent joint, in the parent's local frame (rest pose).
    pub offset: Position,
    pub channels: Vec<Channel>,
    pub children: Vec<Index>,
    pub is_leaf: bool,
    pub endsite: Option<Endsite>,
}

/// Terminal `End Site` block. It has no name, index or channels; only the length of the leaf bone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Endsite {
    pub offset: Position,
}

impl Joint {
    pub fn is_root(&self) -> bool {
        self.parent_index == ROOT_PARENT
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Joint table produced by the hierarchy parser. Joints are stored in depth-first order,
/// so every parent precedes its children.
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    pub joints: Vec<Joint>,
}

impl Skeleton {
    pub fn num_joints(&self) -> usize {
        self.joints.len()
    }

    /// Number of channels declared on all `CHANNELS` lines.
    pub fn num_channels(&self) -> usize {
        self.joints.iter().map(|joint| joint.channels.len()).sum()
    }

    pub fn root(&self) -> Option<&Joint> {
        self.joints.first()
    }

    pub fn names(&self) -> Vec<&str> {
        self.joints.iter().map(|joint| joint.name.as_str()).collect()
    }

    pub fn parents(&self) -> Vec<ParentIndex> {
        self.joints.iter().map(|joint| joint.parent_index).collect()
    }

    pub fn offsets(&self) -> Vec<Position> {
        self.joints.iter().map(|joint| joint.offset).collect()
    }

    pub fn find_joint_by_name(&self, name: &str) -> Option<&Joint> {
        self.joints.iter().find(|joint| joint.name == name)
    }

    pub fn find_joint_by_index(&self, index: Index) -> Option<&Joint> {
        self.joints.get(index)
    }

    /// Global rest pose positions, i.e. offsets accumulated from the root down.
    pub fn rest_positions(&self) -> Vec<Position> {
        let mut positions: Vec<Position> = Vec::with_capacity(self.joints.len());
        for joint in &self.joints {
            let position = if joint.is_root() {
                joint.offset
            } else {
                positions[joint.parent_index as Index] + joint.offset
            };
            positions.push(position);
        }
        positions
    }

    /// Returns the kinematic chains of the skeleton like \[\[0,1,2,3\],\[4,5,6,7,8\],\[9,10,11\]\].
    /// Usually the chains are: left leg, right leg, left arm, right arm and spine+head.
    /// A new chain starts whenever a joint is not the child of the joint right before it.
    pub fn kinematic_chains(&self) -> Vec<Vec<Index>> {
        let mut kinematic_chains: Vec<Vec<Index>> = Vec::new();
        let mut chain: Vec<Index> = Vec::new();
        for joint in &self.joints {
            let continues_chain = chain
                .last()
                .is_some_and(|&last| joint.parent_index == last as ParentIndex);
            if !continues_chain && !chain.is_empty() {
                kinematic_chains.push(std::mem::take(&mut chain));
            }
            chain.push(joint.index);
        }
        if !chain.is_empty() {
            kinematic_chains.push(chain);
        }
        kinematic_chains
    }

    /// Forward kinematics for one frame using this skeleton's parent and offset tables.
    pub fn evaluate(&self, motion: &MotionData, frame: usize) -> Result<Pose> {
        kinematics::forward_kinematics(&self.parents(), &self.offsets(), motion, frame)
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Dense frame x channel matrix read from the `MOTION` section.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionData {
    /// Seconds per frame, from the `Frame Time:` line.
    pub frame_time: f64,
    /// Count from the `Frames:` line, if the document had one.
    pub declared_frames: Option<usize>,
    pub rows: Vec<Vec<f64>>,
}

impl MotionData {
    pub fn num_frames(&self) -> usize {
        self.rows.len()
    }

    pub fn num_channels(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// fps is the reciprocal of frame_time, rounded to the nearest integer
    pub fn fps(&self) -> u32 {
        if self.frame_time > 0.0 {
            (1.0 / self.frame_time).round() as u32
        } else {
            0
        }
    }

    pub fn row(&self, frame: usize) -> Result<&[f64]> {
        self.rows
            .get(frame)
            .map(Vec::as_slice)
            .ok_or(BvhError::FrameOutOfRange {
                frame,
                num_frames: self.rows.len(),
            })
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// World-space transforms of every named joint for a single frame, in joint table order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pose {
    pub positions: Vec<Position>,
    pub orientations: Vec<Quaternion>,
}

impl Pose {
    pub fn positions_xyz(&self) -> Vec<[f64; 3]> {
        self.positions.iter().map(|p| [p.x, p.y, p.z]).collect()
    }

    /// Orientations with component order (x, y, z, w).
    pub fn orientations_xyzw(&self) -> Vec<[f64; 4]> {
        self.orientations
            .iter()
            .map(|q| [q.v.x, q.v.y, q.v.z, q.s])
            .collect()
    }

    /// World positions of the end sites as `(owning joint index, position)` pairs.
    pub fn end_site_positions(&self, skeleton: &Skeleton) -> Vec<(Index, Position)> {
        skeleton
            .joints
            .iter()
            .filter_map(|joint| {
                let endsite = joint.endsite.as_ref()?;
                let position = *self.positions.get(joint.index)?;
                let orientation = *self.orientations.get(joint.index)?;
                Some((joint.index, position + orientation.rotate_vector(endsite.offset)))
            })
            .collect()
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// A parsed document: skeleton plus motion.
#[derive(Debug, Clone, PartialEq)]
pub struct Bvh {
    pub skeleton: Skeleton,
    pub motion: MotionData,
}

impl Bvh {
    pub fn num_frames(&self) -> usize {
        self.motion.num_frames()
    }

    pub fn pose_at(&self, frame: usize) -> Result<Pose> {
        self.skeleton.evaluate(&self.motion, frame)
    }

    /// Poses of every frame, in frame order.
    #[cfg(not(feature = "parallel"))]
    pub fn poses(&self) -> Result<Vec<Pose>> {
        let parents = self.skeleton.parents();
        let offsets = self.skeleton.offsets();
        (0..self.num_frames())
            .map(|frame| kinematics::forward_kinematics(&parents, &offsets, &self.motion, frame))
            .collect()
    }

    /// Poses of every frame, in frame order. Frames are evaluated on the rayon pool.
    #[cfg(feature = "parallel")]
    pub fn poses(&self) -> Result<Vec<Pose>> {
        use rayon::prelude::*;

        let parents = self.skeleton.parents();
        let offsets = self.skeleton.offsets();
        (0..self.num_frames())
            .into_par_iter()
            .map(|frame| kinematics::forward_kinematics(&parents, &offsets, &self.motion, frame))
            .collect()
    }
}
