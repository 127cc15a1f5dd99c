use glam::Mat4;

use crate::errors::{Result, UmbraError};

/// Upper bound on joints per skeleton; matches the skin palette size the
/// GPU backends allocate per draw.
pub const MAX_JOINTS: usize = 128;

/// Parent sentinel used by the binary mesh format for root joints.
pub const ROOT_JOINT: u8 = 255;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Joint {
    /// Index of the parent joint, `None` for a root.
    pub parent: Option<usize>,
    /// Transforms mesh-space vertices into this joint's bind space.
    pub inverse_bind_pose: Mat4,
}

impl Joint {
    #[must_use]
    pub fn root(inverse_bind_pose: Mat4) -> Self {
        Self {
            parent: None,
            inverse_bind_pose,
        }
    }

    #[must_use]
    pub fn child(parent: usize, inverse_bind_pose: Mat4) -> Self {
        Self {
            parent: Some(parent),
            inverse_bind_pose,
        }
    }
}

/// Static joint hierarchy.
///
/// Joints live in a flat arena and reference their parent by index, so the
/// hierarchy is never walked through owning pointers. Construction rejects
/// out-of-range parents and cycles; parents may appear after their children.
#[derive(Debug, Clone)]
pub struct Skeleton {
    pub name: String,
    joints: Vec<Joint>,
}

impl Skeleton {
    pub fn new(name: &str, joints: Vec<Joint>) -> Result<Self> {
        if joints.is_empty() {
            return Err(UmbraError::InvalidSkeleton(format!(
                "skeleton '{name}' has no joints"
            )));
        }
        if joints.len() > MAX_JOINTS {
            return Err(UmbraError::InvalidSkeleton(format!(
                "skeleton '{name}' has {} joints, limit is {MAX_JOINTS}",
                joints.len()
            )));
        }

        for (index, joint) in joints.iter().enumerate() {
            match joint.parent {
                Some(parent) if parent >= joints.len() => {
                    return Err(UmbraError::InvalidSkeleton(format!(
                        "joint {index} references missing parent {parent}"
                    )));
                }
                Some(parent) if parent == index => {
                    return Err(UmbraError::InvalidSkeleton(format!(
                        "joint {index} is its own parent"
                    )));
                }
                _ => {}
            }
        }

        Self::check_acyclic(&joints)?;

        Ok(Self {
            name: name.to_string(),
            joints,
        })
    }

    /// Builds a skeleton from loader output, where roots carry [`ROOT_JOINT`].
    pub fn from_raw_parents(name: &str, parents: &[u8], inverse_bind_poses: &[Mat4]) -> Result<Self> {
        if parents.len() != inverse_bind_poses.len() {
            return Err(UmbraError::InvalidSkeleton(format!(
                "{} parent entries but {} bind poses",
                parents.len(),
                inverse_bind_poses.len()
            )));
        }

        let joints = parents
            .iter()
            .zip(inverse_bind_poses)
            .map(|(&parent, &ibp)| Joint {
                parent: (parent != ROOT_JOINT).then_some(parent as usize),
                inverse_bind_pose: ibp,
            })
            .collect();

        Self::new(name, joints)
    }

    // Iterative three-colour walk over the parent links.
    fn check_acyclic(joints: &[Joint]) -> Result<()> {
        const UNVISITED: u8 = 0;
        const IN_PROGRESS: u8 = 1;
        const DONE: u8 = 2;

        let mut state = vec![UNVISITED; joints.len()];
        let mut chain = Vec::with_capacity(joints.len());

        for start in 0..joints.len() {
            let mut cursor = Some(start);
            while let Some(index) = cursor {
                match state[index] {
                    DONE => break,
                    IN_PROGRESS => {
                        return Err(UmbraError::InvalidSkeleton(format!(
                            "joint hierarchy contains a cycle through joint {index}"
                        )));
                    }
                    _ => {
                        state[index] = IN_PROGRESS;
                        chain.push(index);
                        cursor = joints[index].parent;
                    }
                }
            }
            for index in chain.drain(..) {
                state[index] = DONE;
            }
        }

        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    #[inline]
    #[must_use]
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    #[inline]
    #[must_use]
    pub fn joint(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    #[inline]
    #[must_use]
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.joints.get(index).and_then(|j| j.parent)
    }
}
