use cgmath::{Decomposed, One, Rotation};
use log::trace;

use crate::error::{BvhError, Result};
use crate::types::*;
use crate::utils;

/// Number of leading motion channels holding the root translation.
pub const ROOT_TRANSLATION_CHANNELS: usize = 3;

/// Decode the local rotation of every joint at `frame`.
/// Channel layout is the root translation followed by one XYZ euler triplet (degrees) per joint.
pub fn local_rotations(motion: &MotionData, frame: usize, num_joints: usize) -> Result<Vec<Quaternion>> {
    let row = motion.row(frame)?;
    let needed = ROOT_TRANSLATION_CHANNELS + 3 * num_joints;
    if row.len() < needed {
        return Err(BvhError::ChannelMismatch {
            needed,
            available: row.len(),
        });
    }

    Ok(row[ROOT_TRANSLATION_CHANNELS..needed]
        .chunks_exact(3)
        .map(|eul| utils::euler_xyz_to_quat(eul[0], eul[1], eul[2]))
        .collect())
}

/// Check that every parent comes before its child and that there is exactly one root.
fn validate_parents(parents: &[ParentIndex]) -> Result<()> {
    let mut num_roots = 0;
    for (i, &parent) in parents.iter().enumerate() {
        if parent == ROOT_PARENT {
            num_roots += 1;
            if num_roots > 1 {
                return Err(BvhError::InvalidHierarchy(format!(
                    "joint {i} is a second root"
                )));
            }
        } else if parent < 0 || parent as Index >= i {
            return Err(BvhError::InvalidHierarchy(format!(
                "joint {i} has parent {parent}, parents must come before their children"
            )));
        }
    }
    if num_roots == 0 && !parents.is_empty() {
        return Err(BvhError::InvalidHierarchy("no root joint".to_string()));
    }
    Ok(())
}

/// Global position and rotation of every joint at `frame`. Basically forward kinematics.
///
/// Joints are visited in index order, which is parent-before-child, so each joint is composed
/// with its already finished parent:
/// `R[i] = R[parent] * R_local[i]` and `pos[i] = pos[parent] + R[parent] * offset[i]`.
/// The root takes its position straight from the first three channels.
pub fn forward_kinematics(
    parents: &[ParentIndex],
    offsets: &[Position],
    motion: &MotionData,
    frame: usize,
) -> Result<Pose> {
    if parents.len() != offsets.len() {
        return Err(BvhError::ShapeMismatch {
            parents: parents.len(),
            offsets: offsets.len(),
        });
    }
    validate_parents(parents)?;

    let row = motion.row(frame)?;
    let local_rotations = local_rotations(motion, frame, parents.len())?;
    let root_position = Position::new(row[0], row[1], row[2]);

    let mut pose = Pose {
        positions: Vec::with_capacity(parents.len()),
        orientations: Vec::with_capacity(parents.len()),
    };
    for (i, &parent_index) in parents.iter().enumerate() {
        let transform = if parent_index == ROOT_PARENT {
            Decomposed {
                scale: 1.0,
                rot: local_rotations[i],
                disp: root_position,
            }
        } else {
            let parent = parent_index as Index;
            let parent_transform = Decomposed {
                scale: 1.0,
                rot: pose.orientations[parent],
                disp: pose.positions[parent],
            };
            let transform = Decomposed {
                scale: 1.0,
                rot: local_rotations[i],
                disp: offsets[i],
            };
            parent_transform * transform
        };
        pose.positions.push(transform.disp);
        pose.orientations.push(transform.rot);
    }

    trace!("evaluated frame {frame} for {} joints", parents.len());
    Ok(pose)
}

/// Rest pose as a [`Pose`]: offsets accumulated from the origin, every orientation identity.
pub fn rest_pose(skeleton: &Skeleton) -> Pose {
    let positions = skeleton.rest_positions();
    let orientations = vec![Quaternion::one(); positions.len()];
    Pose {
        positions,
        orientations,
    }
}

/// Local rotation of `child` relative to `parent`, both given as global orientations.
/// Inverse of the composition used by [`forward_kinematics`].
pub fn relative_rotation(parent: Quaternion, child: Quaternion) -> Quaternion {
    parent.invert() * child
}
