//! Forward and inverse kinematics for the 3-DOF arm.
//!
//! The arm is a base yaw joint carrying a planar two-link pitch chain
//! (shoulder + elbow). Both directions are closed-form and pure: no I/O,
//! no shared state, safe to call from any thread.

use thiserror::Error;

/// Planar radius below which the base yaw is geometrically undefined.
const YAW_EPSILON: f64 = 1e-9;

/// Minimum target distance; guards the shoulder solution against a
/// division by zero when the links are equal length and the target sits
/// on the shoulder axis.
const MIN_REACH_EPSILON: f64 = 1e-9;

/// Error from the inverse solver.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum KinematicsError {
    /// No real joint solution exists for the requested target.
    #[error(
        "target ({x:.3}, {y:.3}, {z:.3}) at distance {distance:.3} is outside \
         the reach envelope [{min_reach:.3}, {max_reach:.3}]"
    )]
    Unreachable {
        x: f64,
        y: f64,
        z: f64,
        distance: f64,
        min_reach: f64,
        max_reach: f64,
    },
}

/// Which of the two law-of-cosines elbow solutions the solver returns.
///
/// The triangle over the two links admits a mirrored elbow pair for every
/// reachable target; the solver commits to one branch so round trips are
/// deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElbowBranch {
    /// Principal value of the inverse cosine: elbow angle in `[0, pi]`.
    #[default]
    Principal,
}

/// End-effector position in the arm's base frame, millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartesianTarget {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl CartesianTarget {
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Straight-line distance from the shoulder pivot.
    #[inline]
    pub fn distance(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Joint angles fully describing the arm configuration, radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmPose {
    /// Base yaw toward the target.
    pub base: f64,
    /// Shoulder pitch above the horizontal plane.
    pub shoulder: f64,
    /// Interior elbow angle between the two links.
    pub elbow: f64,
}

/// The physical arm: its two fixed link lengths, millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arm {
    l1: f64,
    l2: f64,
}

impl Arm {
    /// Elbow disambiguation policy used by [`Arm::coords_to_pose`].
    pub const ELBOW_BRANCH: ElbowBranch = ElbowBranch::Principal;

    pub const fn new(l1: f64, l2: f64) -> Self {
        Self { l1, l2 }
    }

    /// Farthest reachable distance (arm fully extended).
    #[inline]
    pub fn max_reach(&self) -> f64 {
        self.l1 + self.l2
    }

    /// Closest reachable distance (arm fully folded).
    #[inline]
    pub fn min_reach(&self) -> f64 {
        (self.l1 - self.l2).abs().max(MIN_REACH_EPSILON)
    }

    /// Forward kinematics: joint angles to end-effector position.
    ///
    /// Closed-form planar two-link evaluation rotated by the base yaw.
    /// Infallible.
    pub fn pose_to_coords(&self, pose: &ArmPose) -> CartesianTarget {
        let forearm = pose.elbow + pose.shoulder;
        let radius = self.l1 * pose.shoulder.cos() - self.l2 * forearm.cos();
        CartesianTarget {
            x: radius * pose.base.cos(),
            y: radius * pose.base.sin(),
            z: self.l1 * pose.shoulder.sin() - self.l2 * forearm.sin(),
        }
    }

    /// Inverse kinematics: end-effector position to joint angles.
    ///
    /// The base yaw is resolved with `atan2`, so it points toward the
    /// target in every quadrant. A target on the yaw axis (`x = y = 0`)
    /// has no defined yaw; the solver returns the stable default `pi/2`
    /// rather than a numeric error. The elbow takes the
    /// [`ElbowBranch::Principal`] solution.
    pub fn coords_to_pose(&self, target: &CartesianTarget) -> Result<ArmPose, KinematicsError> {
        let CartesianTarget { x, y, z } = *target;
        let d_squared = x * x + y * y + z * z;
        let distance = d_squared.sqrt();

        let unreachable = KinematicsError::Unreachable {
            x,
            y,
            z,
            distance,
            min_reach: self.min_reach(),
            max_reach: self.max_reach(),
        };

        // Law of cosines over (l1, l2, d). An argument outside [-1, 1]
        // means the triangle does not close: too far or too folded.
        let cos_elbow = (self.l1 * self.l1 + self.l2 * self.l2 - d_squared)
            / (2.0 * self.l1 * self.l2);
        if !(-1.0..=1.0).contains(&cos_elbow) || distance < self.min_reach() {
            return Err(unreachable);
        }
        let elbow = cos_elbow.acos();

        let radius = (x * x + y * y).sqrt();
        let base = if radius < YAW_EPSILON {
            std::f64::consts::FRAC_PI_2
        } else {
            y.atan2(x)
        };

        // Triangle angle between the upper link and the target line,
        // lifted by the elevation toward the target. Reachability is
        // already proven, so the clamp only absorbs rounding spill.
        let cos_shoulder = ((self.l1 * self.l1 + d_squared - self.l2 * self.l2)
            / (2.0 * self.l1 * distance))
            .clamp(-1.0, 1.0);
        let shoulder = cos_shoulder.acos() + z.atan2(radius);

        Ok(ArmPose {
            base,
            shoulder,
            elbow,
        })
    }
}
