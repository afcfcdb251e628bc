//! Point cloud export.
mod ply;
pub use ply::{
    write_context_ply, write_labeled_ply, write_ply, write_ply_image, write_vertices, PlyVertex,
    CONTEXT_HIGHLIGHT, LABEL_PALETTE,
};
