//! Decoders and the skeletal animation runtime for Vulpes engine assets.
//!
//! The crate turns raw in-memory byte buffers into validated asset data:
//! block-compressed textures (DDS family), Radiance HDR images, VEM mesh
//! containers and VES skeleton containers, plus the runtime that plays back
//! the decoded skeletal animations. File and cache I/O stays with the
//! caller; every decoder takes a `&[u8]` that has already been read.
//!
//! Decoded results are handed back through [`ResourceHandle`], the crate's
//! shared-ownership wrapper.

mod error;
mod handle;
mod interpolate;
mod reader;

pub mod image;
pub mod mesh;
pub mod skeleton;

pub use error::DecodeError;
pub use handle::ResourceHandle;
pub use interpolate::Interpolate;

pub use image::{Image, ImageInfo, decode_image};
pub use mesh::{MeshData, decode_mesh};
pub use skeleton::{Skeleton, decode_skeleton};
