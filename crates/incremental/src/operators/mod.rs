//! Incrementally maintained set views.
//!
//! This module provides derived collections that follow their upstream
//! collections:
//! - Union: values held by at least one source
//! - Intersection: values held by every source
//! - Difference: values of one source held by none of the subtracted sets

mod difference;
mod intersection;
mod union;

pub use difference::Difference;
pub use intersection::Intersection;
pub use union::Union;
