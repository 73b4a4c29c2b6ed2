//! Common types used across the application.

pub mod id;
pub mod money;
pub mod pagination;

pub use id::*;
pub use money::{STORAGE_SCALE, SubBucket, TOLERANCE, approx_eq, exceeds_tolerance, fits_storage_scale};
pub use pagination::{PageMeta, PageRequest, PageResponse};
