pub mod adpcm;
pub mod asset;
pub mod bse;
pub mod error;
pub mod kvag;
pub mod layout;
pub mod mesh;
pub mod pixel;
pub mod postprocess;
mod reader;
pub mod rle;
pub mod s16;
pub mod spt;
pub mod tgc;

pub use adpcm::{AdpcmChannel, decode_mono, decode_stereo};
pub use asset::{
    Asset, AssetKind, AssetSummary, CompanionTextures, companion_textures,
    load_companion_textures,
};
pub use bse::{Bse, BseRgb, BseTriangle, BseUv, BseVertex};
pub use error::{FormatError, Result};
pub use kvag::Kvag;
pub use layout::SptLayout;
pub use mesh::{DrawBatch, MeshAnimation, MeshBuffers, MeshVertex};
pub use pixel::RgbaFrame;
pub use postprocess::{
    CammoTarget, CammoTexture, apply_cammo, apply_first_pixel_alpha_mask, compose_alpha_plane,
    compose_alpha_plane_1555, mask_black_pixels, model_texture,
};
pub use rle::decode_rle16;
pub use s16::{S16, S16Frame};
pub use spt::{Spt, SptFrame};
pub use tgc::Tgc;
