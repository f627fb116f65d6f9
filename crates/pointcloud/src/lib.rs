//! # Pointcloud
//!
//! Depth-to-points stage: deprojection, texture mapping, occlusion
//! correction.
//!
//! Responsibilities:
//! - Inverse/forward camera model (deproject, project, rigid transform)
//! - The point-cloud processing stage with live recalibration support
//! - Occlusion filtering of geometrically inconsistent texels
//!
//! ## Usage Example
//!
//! ```ignore
//! use pointcloud::PointCloud;
//! use contracts::{StreamFilter, StreamKind, PixelFormat};
//!
//! let stage = PointCloud::new(allocator, graph);
//! stage.map_to(StreamFilter::new(StreamKind::Color, PixelFormat::Rgb8, Some(0)));
//! stage.set_output_callback(Arc::new(|points_frame| {
//!     // vertices + texture coordinates
//! }));
//!
//! // Feed depth+color composites (or bare depth frames)
//! stage.invoke(frame);
//! ```

mod camera_model;
mod occlusion;
mod stage;

pub use camera_model::{
    deproject_pixel_to_point, pixel_to_texcoord, project_point_to_pixel, transform_point_to_point,
};
pub use occlusion::{OcclusionFilter, OcclusionMode, ScanDirection};
pub use stage::PointCloud;
