pub mod batch;
pub mod compose;
pub mod transform;
