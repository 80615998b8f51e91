use ahash::HashMap;

use crate::{error::DecodeError, reader::ByteReader};

use super::{Action, BoneDetail, BoneState, FrameState, Skeleton};

const MAGIC: &[u8] = b"VULS";
const VERSION: u16 = 1;

impl Skeleton {
    /* VES container layout:
        magic(4): "VULS"
        version(2): u16, 1
        bone count(1): u8
        action count(1): u8
        frame rate(4): f32
        bones, per bone:
            bone index(1), name length(1), name bytes
            head position: 3 x f32
            tail position: 3 x f32
        actions, per action:
            name length(1), name bytes
            frame count(2): u16
            frames, per frame:
                positions: 3 x f32 per bone
                rotations: 4 x f32 per bone, stored (w, x, y, z)
    */
    pub fn from_memory(data: &[u8]) -> Result<Self, DecodeError> {
        let mut r = ByteReader::new(data);
        r.expect_magic(MAGIC, "skeleton container")?;

        let version = r.read_u16_le()?;
        if version != VERSION {
            return Err(DecodeError::Format(format!(
                "unsupported skeleton version {version}"
            )));
        }

        let bone_count = r.read_u8()? as usize;
        if bone_count == 0 {
            return Err(DecodeError::Dimension("no bones".into()));
        }
        let action_count = r.read_u8()? as usize;
        if action_count == 0 {
            return Err(DecodeError::Dimension("no actions".into()));
        }

        let mut skeleton = Skeleton::default();
        skeleton.set_frame_rate(r.read_f32_le()?);

        let mut bones = HashMap::default();
        for _ in 0..bone_count {
            let index = r.read_u8()? as usize;
            let name = r.read_short_string()?;
            let head = r.read_vec3()?;
            let tail = r.read_vec3()?;
            bones.insert(index, BoneDetail { name, head, tail });
        }
        skeleton.set_bone_map(bones);

        for _ in 0..action_count {
            let name = r.read_short_string()?;
            let frame_count = r.read_u16_le()? as usize;

            let mut action = Action::with_capacity(frame_count);
            for _ in 0..frame_count {
                action.push(read_frame(&mut r, bone_count)?);
            }

            skeleton.add_action(name, action);
        }

        Ok(skeleton)
    }
}

/// One keyframe: all bone positions, then all bone rotations, zipped
/// pairwise by bone index.
fn read_frame(r: &mut ByteReader, bone_count: usize) -> Result<FrameState, DecodeError> {
    let mut positions = Vec::with_capacity(bone_count);
    for _ in 0..bone_count {
        positions.push(r.read_vec3()?);
    }

    let mut frame = FrameState::with_capacity(bone_count);
    for position in positions {
        frame.push(BoneState {
            position,
            rotation: r.read_quat_wxyz()?,
        });
    }

    Ok(frame)
}
