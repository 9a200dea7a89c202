//! Ragged claims triangles and the algebra the estimators and simulator share

mod matrix;
mod transform;
pub mod horizon;

pub use matrix::Triangle;
pub use transform::{
    build_base_triangle, mask_unobserved, mask_weights, sum_reverse_diagonal, to_loss_ratio,
    validate_observed_shape, zero_to_nan,
};
