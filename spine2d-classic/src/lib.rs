//! Pure Rust runtime for Spine 3.5 skeletal animation data (unofficial).
//!
//! This crate is renderer-agnostic: it poses skeletons, applies and mixes animations, and
//! produces per-slot vertex data through [`build_draw_list`] for a renderer to consume.

#![forbid(unsafe_code)]

mod atlas;
mod error;
mod geometry;
mod ids;
mod math;
mod model;
mod render;
mod runtime;

#[cfg(feature = "json")]
pub mod json;

pub use atlas::*;
pub use error::*;
pub use geometry::*;
pub use ids::*;
pub use math::*;
pub use model::*;
pub use render::*;
pub use runtime::*;

#[cfg(feature = "json")]
pub use json::SkeletonJson;




#[cfg(all(test, feature = "json"))]
mod json_scale_tests;
