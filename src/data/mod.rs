pub mod cache;
pub mod frame;
pub mod matrix;

pub use cache::ProgramCache;
pub use frame::{frame_to_matrix, split_frame};
pub use matrix::Matrix;
