//! # Activation Functions Module
//!
//! The policy network only needs three activations:
//!
//! - **ReLU**: `max(0, x)` for the hidden layers
//! - **Linear**: identity, useful for probing raw layer outputs
//! - **Softmax**: row-wise normalization turning the output layer into an
//!   action distribution
//!
//! ## Usage Example
//!
//! ```rust
//! use penguin_ai::activations::Activation;
//! use ndarray::array;
//!
//! let mut logits = array![[1.0, 2.0, 3.0, 4.0]];
//! Activation::Softmax.apply_batch(&mut logits);
//! assert!((logits.sum() - 1.0).abs() < 1e-5);
//! ```

pub mod functions;

pub use functions::Activation;
