//! Build a 2D segmentation dataset from a 3D one by keeping, for every
//! volume, the axial slice with the most labelled voxels.

pub mod common;
pub mod dataset;
pub mod driver;
pub mod save;
pub mod task;
pub mod transforms;
