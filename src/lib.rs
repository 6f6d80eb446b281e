//! Parser for .bvh (Biovision Hierarchy) motion capture files with forward kinematics.
//!
//! ```no_run
//! use bvh_kinematics::parse::load_bvh_from_file;
//!
//! let bvh = load_bvh_from_file("./walk.bvh")?;
//! let pose = bvh.pose_at(0)?;
//! for (name, position) in bvh.skeleton.names().iter().zip(pose.positions_xyz()) {
//!     println!("{name}: {position:?}");
//! }
//! # Ok::<(), bvh_kinematics::error::BvhError>(())
//! ```

pub mod error;
pub mod kinematics;
pub mod parse;
pub mod types;
pub mod utils;

pub use error::{BvhError, Result};
pub use kinematics::forward_kinematics;
pub use parse::{load_bvh_from_file, load_bvh_from_string, load_motion, parse_hierarchy};
pub use types::{Bvh, Joint, MotionData, Pose, Skeleton};
