//! Activation function.
//!
//! Every layer computes a pre-activation value `z = W x + b` and then applies ReLU
//! element-wise: `a = relu(z)`.
//!
//! Only the *post-activation* values are cached in `Scratch`. Because `relu(z) > 0`
//! exactly when `z > 0`, the derivative can be read off the cached output, so
//! backprop never needs a separate `z` buffer.

/// Rectified linear unit, `max(0, x)`.
///
/// A NaN input maps to `0.0` (see [`f32::max`]).
#[inline]
pub fn relu(x: f32) -> f32 {
    x.max(0.0)
}

/// Derivative of ReLU: `1` when `x > 0`, otherwise `0`.
///
/// Called with either a pre-activation or a cached post-activation value; the
/// result is the same for both.
#[inline]
pub fn relu_grad(x: f32) -> f32 {
    if x > 0.0 { 1.0 } else { 0.0 }
}
