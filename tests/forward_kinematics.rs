use bvh_kinematics::kinematics::{local_rotations, rest_pose};
use bvh_kinematics::types::{Position, Quaternion, ROOT_PARENT};
use bvh_kinematics::{forward_kinematics, load_bvh_from_string, BvhError, MotionData};
use cgmath::{InnerSpace, Rotation, Zero};

const FIGURE: &str = include_str!("data/figure.bvh");
const TWO_JOINTS: &str = include_str!("data/two_joints.bvh");
const TOLERANCE: f64 = 1e-6;

fn assert_position_close(actual: Position, expected: Position) {
    assert!(
        (actual - expected).magnitude() < TOLERANCE,
        "{actual:?} != {expected:?}"
    );
}

fn assert_quat_close(actual: Quaternion, expected: Quaternion) {
    let components = [
        actual.v.x - expected.v.x,
        actual.v.y - expected.v.y,
        actual.v.z - expected.v.z,
        actual.s - expected.s,
    ];
    assert!(
        components.iter().all(|c| c.abs() < TOLERANCE),
        "{actual:?} != {expected:?}"
    );
}

#[test]
fn unrotated_chain() {
    let bvh = load_bvh_from_string(TWO_JOINTS).unwrap();
    let pose = bvh.pose_at(0).unwrap();
    assert_eq!(pose.positions_xyz(), vec![[0.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    assert_eq!(pose.orientations_xyzw(), vec![[0.0, 0.0, 0.0, 1.0]; 2]);
}

#[test]
fn root_turned_ninety_degrees_about_z() {
    let bvh = load_bvh_from_string(TWO_JOINTS).unwrap();
    let pose = bvh.pose_at(1).unwrap();
    assert_position_close(pose.positions[1], Position::new(-1.0, 0.0, 0.0));
    assert_quat_close(pose.orientations[1], pose.orientations[0]);

    let half = std::f64::consts::FRAC_1_SQRT_2;
    let [x, y, z, w] = pose.orientations_xyzw()[0];
    assert!(x.abs() < TOLERANCE && y.abs() < TOLERANCE);
    assert!((z - half).abs() < TOLERANCE && (w - half).abs() < TOLERANCE);
}

#[test]
fn end_site_follows_the_rotation() {
    let bvh = load_bvh_from_string(TWO_JOINTS).unwrap();
    let pose = bvh.pose_at(1).unwrap();
    let tips = pose.end_site_positions(&bvh.skeleton);
    assert_eq!(tips.len(), 1);
    assert_eq!(tips[0].0, 1);
    assert_position_close(tips[0].1, Position::new(-2.0, 0.0, 0.0));
}

#[test]
fn frame_one_past_the_end() {
    let bvh = load_bvh_from_string(TWO_JOINTS).unwrap();
    let result = bvh.pose_at(bvh.num_frames());
    assert!(matches!(
        result,
        Err(BvhError::FrameOutOfRange { frame: 2, num_frames: 2 })
    ));
}

#[test]
fn root_position_is_the_translation_channels() {
    let bvh = load_bvh_from_string(FIGURE).unwrap();
    for frame in 0..bvh.num_frames() {
        let pose = bvh.pose_at(frame).unwrap();
        let row = &bvh.motion.rows[frame];
        assert_eq!(pose.positions[0], Position::new(row[0], row[1], row[2]));
    }
}

#[test]
fn every_joint_follows_the_chain_recurrence() {
    let bvh = load_bvh_from_string(FIGURE).unwrap();
    let parents = bvh.skeleton.parents();
    let offsets = bvh.skeleton.offsets();
    for frame in 0..bvh.num_frames() {
        let pose = bvh.pose_at(frame).unwrap();
        let local = local_rotations(&bvh.motion, frame, parents.len()).unwrap();
        for (i, &parent) in parents.iter().enumerate() {
            if parent == ROOT_PARENT {
                assert_quat_close(pose.orientations[i], local[i]);
                continue;
            }
            let parent = parent as usize;
            let parent_orientation = pose.orientations[parent];
            assert_quat_close(pose.orientations[i], parent_orientation * local[i]);
            assert_position_close(
                pose.positions[i],
                pose.positions[parent] + parent_orientation.rotate_vector(offsets[i]),
            );
        }
    }
}

#[test]
fn orientations_stay_unit_length() {
    let bvh = load_bvh_from_string(FIGURE).unwrap();
    for pose in bvh.poses().unwrap() {
        for orientation in pose.orientations {
            assert!((orientation.magnitude() - 1.0).abs() < TOLERANCE);
        }
    }
}

#[test]
fn poses_match_single_frame_evaluation() {
    let bvh = load_bvh_from_string(FIGURE).unwrap();
    let poses = bvh.poses().unwrap();
    assert_eq!(poses.len(), 3);
    for (frame, pose) in poses.iter().enumerate() {
        assert_eq!(pose, &bvh.pose_at(frame).unwrap());
    }
}

#[test]
fn zero_motion_matches_rest_pose() {
    let bvh = load_bvh_from_string(FIGURE).unwrap();
    let mut row = vec![0.0; bvh.motion.num_channels()];
    let rest = rest_pose(&bvh.skeleton);
    let root_offset = bvh.skeleton.offsets()[0];
    row[..3].copy_from_slice(&[root_offset.x, root_offset.y, root_offset.z]);
    let motion = MotionData {
        frame_time: bvh.motion.frame_time,
        declared_frames: None,
        rows: vec![row],
    };
    let pose = bvh.skeleton.evaluate(&motion, 0).unwrap();
    for (actual, expected) in pose.positions.iter().zip(&rest.positions) {
        assert_position_close(*actual, *expected);
    }
    for (actual, expected) in pose.orientations.iter().zip(&rest.orientations) {
        assert_quat_close(*actual, *expected);
    }
}

#[test]
fn too_few_channels_for_the_skeleton() {
    let bvh = load_bvh_from_string(FIGURE).unwrap();
    let motion = MotionData {
        frame_time: 0.1,
        declared_frames: None,
        rows: vec![vec![0.0; 30]],
    };
    assert!(matches!(
        bvh.skeleton.evaluate(&motion, 0),
        Err(BvhError::ChannelMismatch { needed: 33, available: 30 })
    ));
}

#[test]
fn raw_tables_without_a_parsed_skeleton() {
    let parents = [-1, 0];
    let offsets = [Position::zero(), Position::new(0.0, 1.0, 0.0)];
    let motion = MotionData {
        frame_time: 0.1,
        declared_frames: None,
        rows: vec![vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]],
    };
    let pose = forward_kinematics(&parents, &offsets, &motion, 0).unwrap();
    assert_eq!(pose.positions_xyz(), vec![[1.0, 1.0, 1.0], [1.0, 2.0, 1.0]]);
}
