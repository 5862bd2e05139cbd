pub mod clean;
pub mod decision;
pub mod normalizer;

pub use clean::{clean_bytes_mut, clean_path, clean_path_bytes, clean_path_vec, is_clean};
