//! Skeletons: the VES container decoder and the animation playback runtime.

mod ves;

use ahash::HashMap;
use glam::{Quat, Vec3};

use crate::{error::DecodeError, handle::ResourceHandle, interpolate::Interpolate};

/// Static data for one bone: its name and rest head/tail positions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoneDetail {
    pub name: String,
    pub head: Vec3,
    pub tail: Vec3,
}

/// Animated state of one bone in one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneState {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for BoneState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

/// One keyframe: the state of every bone, indexed by bone index.
pub type FrameState = Vec<BoneState>;

/// A named clip: an ordered list of keyframes.
pub type Action = Vec<FrameState>;

/// Map from bone name to a dense bone index. Renderers that address bones
/// with their own indexing pass one of these at query time.
pub type BoneNameToIndex = HashMap<String, usize>;

/// A skeleton with keyframed actions and the runtime state to play them.
///
/// [`update`](Self::update) advances the continuous frame cursor once per
/// simulation tick; [`current_frame_state`](Self::current_frame_state)
/// interpolates between the two keyframes surrounding the cursor. The cursor
/// stays in `[0, frame_count)` of the active action, wrapping cyclically.
#[derive(Clone, Debug)]
pub struct Skeleton {
    frame_rate: f32,
    current_frame: f32,
    bone_name_to_index: BoneNameToIndex,
    bone_index_to_detail: HashMap<usize, BoneDetail>,
    actions: HashMap<String, Action>,
    current_action: String,
}

impl Default for Skeleton {
    fn default() -> Self {
        Self {
            frame_rate: 25.0,
            current_frame: 0.0,
            bone_name_to_index: HashMap::default(),
            bone_index_to_detail: HashMap::default(),
            actions: HashMap::default(),
            current_action: String::new(),
        }
    }
}

impl Skeleton {
    pub fn set_frame_rate(&mut self, frame_rate: f32) {
        self.frame_rate = frame_rate;
    }

    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    pub fn current_frame(&self) -> f32 {
        self.current_frame
    }

    pub fn current_action(&self) -> &str {
        &self.current_action
    }

    pub fn bone_count(&self) -> usize {
        self.bone_index_to_detail.len()
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn bone_detail(&self, index: usize) -> Option<&BoneDetail> {
        self.bone_index_to_detail.get(&index)
    }

    /// The skeleton's own name lookup, the inverse of its bone map.
    pub fn bone_name_to_index(&self) -> &BoneNameToIndex {
        &self.bone_name_to_index
    }

    /// Install the bone map and derive the inverse name lookup from it.
    pub fn set_bone_map(&mut self, bones: HashMap<usize, BoneDetail>) {
        self.bone_name_to_index = bones
            .iter()
            .map(|(&index, detail)| (detail.name.clone(), index))
            .collect();
        self.bone_index_to_detail = bones;
    }

    /// Add a named action. The first action added becomes the active one.
    pub fn add_action(&mut self, name: impl Into<String>, action: Action) {
        let name = name.into();
        if self.current_action.is_empty() {
            self.current_action = name.clone();
        }
        self.actions.insert(name, action);
    }

    /// Switch the active action. Unknown names are logged and ignored.
    pub fn set_action(&mut self, name: &str) {
        if !self.actions.contains_key(name) {
            tracing::warn!("action '{name}' not found");
            return;
        }

        self.current_action = name.to_string();
    }

    /// Advance the frame cursor by `delta_time` seconds, wrapping at the end
    /// of the active action. The fractional remainder survives the wrap, so
    /// playback never snaps back to exactly zero.
    pub fn update(&mut self, delta_time: f32) {
        let Some(action) = self.actions.get(&self.current_action) else {
            return;
        };

        self.current_frame += self.frame_rate * delta_time;

        let whole = self.current_frame as usize;
        if whole >= action.len() {
            self.current_frame -= whole as f32;
        }
    }

    /// Interpolated bone states at the current playhead.
    ///
    /// Each bone's output slot is found by looking its *name* up in `remap`,
    /// or in the skeleton's own name table when `None`. A single-frame
    /// action is static and returned as-is.
    pub fn current_frame_state(&self, remap: Option<&BoneNameToIndex>) -> FrameState {
        let Some(action) = self.actions.get(&self.current_action) else {
            return FrameState::new();
        };

        if action.len() == 1 {
            return action[0].clone();
        }

        let previous = (self.current_frame as usize).min(action.len() - 1);
        let next = (previous + 1) % action.len();
        let alpha = self.current_frame - previous as f32;

        let left = &action[previous];
        let right = &action[next];

        let names = remap.unwrap_or(&self.bone_name_to_index);
        let mut out = vec![BoneState::default(); left.len()];
        for (index, (a, b)) in left.iter().zip(right).enumerate() {
            let state = BoneState {
                position: Vec3::interpolate(a.position, b.position, alpha),
                rotation: Quat::interpolate(a.rotation, b.rotation, alpha),
            };

            let Some(&slot) = self
                .bone_index_to_detail
                .get(&index)
                .and_then(|detail| names.get(&detail.name))
            else {
                tracing::warn!("no output slot for bone {index}");
                continue;
            };
            if let Some(slot_state) = out.get_mut(slot) {
                *slot_state = state;
            }
        }

        out
    }

    /// Static bone details reindexed through `remap`, or through the
    /// skeleton's own name table when `None`.
    pub fn bone_detail_map(&self, remap: Option<&BoneNameToIndex>) -> Vec<BoneDetail> {
        let names = remap.unwrap_or(&self.bone_name_to_index);
        let mut out = vec![BoneDetail::default(); self.bone_index_to_detail.len()];
        for detail in self.bone_index_to_detail.values() {
            let Some(&slot) = names.get(&detail.name) else {
                tracing::warn!("no output slot for bone '{}'", detail.name);
                continue;
            };
            if let Some(slot_detail) = out.get_mut(slot) {
                *slot_detail = detail.clone();
            }
        }

        out
    }
}

/// Decode a VES buffer and wrap the skeleton in a loaded resource handle.
pub fn decode_skeleton(data: &[u8]) -> Result<ResourceHandle<Skeleton>, DecodeError> {
    let skeleton = Skeleton::from_memory(data)?;
    let handle = ResourceHandle::new(skeleton);
    handle.set_loaded();
    Ok(handle)
}
