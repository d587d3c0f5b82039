use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::config::MindConfig;
use crate::error::{MindError, Result};
use crate::layers::{BatchNormLayer, DenseLayer, DropoutLayer, NetworkLayer, WeightInit};
use crate::optimizer::{Adam, Optimizer};

/// Smallest probability fed into the cross-entropy log
const LOG_FLOOR: f32 = 1e-7;

/// A feed-forward network: a stack of dense, batch-norm and dropout layers
/// plus the optimizer that owns the per-layer training state.
///
/// Inference (`infer`, `forward`) borrows the network immutably and never
/// touches the training caches, so a consistent parameter snapshot is
/// guaranteed by the borrow checker; training needs `&mut self`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NeuralNetwork {
    pub layers: Vec<NetworkLayer>,
    pub optimizer: Adam,
}

impl NeuralNetwork {
    pub fn new(layers: Vec<NetworkLayer>, optimizer: Adam) -> Result<Self> {
        let mut width: Option<usize> = None;
        for layer in &layers {
            let (input, output) = match layer {
                NetworkLayer::Dense(dense) => (dense.input_size(), dense.output_size()),
                NetworkLayer::BatchNorm(norm) => (norm.num_features(), norm.num_features()),
                NetworkLayer::Dropout(_) => continue,
            };
            if let Some(w) = width {
                if w != input {
                    return Err(MindError::dimension_mismatch(
                        format!("layer input {}", w),
                        format!("layer input {}", input),
                    ));
                }
            } else if !matches!(layer, NetworkLayer::Dense(_)) {
                return Err(MindError::invalid_parameter("layers", "network must start with a dense layer"));
            }
            width = Some(output);
        }
        if width.is_none() {
            return Err(MindError::invalid_parameter("layers", "network needs at least one dense layer"));
        }
        let shapes: Vec<_> = layers.iter().filter_map(NetworkLayer::parameter_shapes).collect();
        if !optimizer.matches(shapes.iter().copied()) {
            return Err(MindError::dimension_mismatch(
                format!("optimizer state for {} trainable layers", shapes.len()),
                format!("optimizer state for {} layers", optimizer.layer_count()),
            ));
        }
        Ok(NeuralNetwork { layers, optimizer })
    }

    /// Build the policy architecture described by `config`:
    /// ReLU hidden layers (He-normal, L2 on the leading ones, batch norm and
    /// dropout where configured) ending in a softmax layer over the action
    /// set, trained with Adam.
    pub fn for_policy<R: Rng + ?Sized>(config: &MindConfig, rng: &mut R) -> Result<Self> {
        let sizes = config.layer_sizes();
        let net = &config.network;
        let hidden_count = sizes.len() - 2;
        let mut layers = Vec::with_capacity(hidden_count * 3 + 1);

        for (i, window) in sizes.windows(2).enumerate() {
            let (input_size, output_size) = (window[0], window[1]);
            if i < hidden_count {
                let mut dense = DenseLayer::new(input_size, output_size, Activation::Relu, WeightInit::HeNormal, rng)?;
                if i < net.l2_layers {
                    dense = dense.with_l2(net.l2);
                }
                layers.push(NetworkLayer::Dense(dense));
                if net.batch_norm_layers.contains(&i) {
                    layers.push(NetworkLayer::BatchNorm(BatchNormLayer::with_defaults(output_size)?));
                }
                if let Some(&rate) = net.dropout_rates.get(i) {
                    layers.push(NetworkLayer::Dropout(DropoutLayer::new(output_size, rate)?));
                }
            } else {
                let output = DenseLayer::new(
                    input_size,
                    output_size,
                    Activation::Softmax,
                    WeightInit::for_activation(Activation::Softmax),
                    rng,
                )?;
                layers.push(NetworkLayer::Dense(output));
            }
        }

        let adam = Adam::with_defaults(layers.iter().filter_map(NetworkLayer::parameter_shapes));
        Self::new(layers, adam)
    }

    fn dense_layers(&self) -> impl Iterator<Item = &DenseLayer> {
        self.layers.iter().filter_map(NetworkLayer::as_dense)
    }

    pub fn input_size(&self) -> usize {
        self.dense_layers().next().map_or(0, DenseLayer::input_size)
    }

    pub fn output_size(&self) -> usize {
        self.dense_layers().last().map_or(0, DenseLayer::output_size)
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(NetworkLayer::parameter_count).sum()
    }

    fn check_width(&self, width: usize) -> Result<()> {
        if width != self.input_size() {
            return Err(MindError::dimension_mismatch(
                format!("input width {}", self.input_size()),
                format!("input width {}", width),
            ));
        }
        Ok(())
    }

    /// Inference for a batch of rows. Dropout is inactive and batch norm
    /// uses its running statistics.
    pub fn infer(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_width(inputs.ncols())?;
        let mut current = inputs.to_owned();
        for layer in &self.layers {
            current = match layer {
                NetworkLayer::Dense(dense) => dense.infer(current.view()),
                NetworkLayer::BatchNorm(norm) => norm.infer(current.view()),
                NetworkLayer::Dropout(_) => current,
            };
        }
        Ok(current)
    }

    /// Inference for a single input vector.
    pub fn forward(&self, input: ArrayView1<f32>) -> Result<Array1<f32>> {
        let output = self.infer(input.insert_axis(Axis(0)))?;
        Ok(output.index_axis_move(Axis(0), 0))
    }

    fn forward_train<R: Rng + ?Sized>(&mut self, inputs: ArrayView2<f32>, rng: &mut R) -> Array2<f32> {
        let mut current = inputs.to_owned();
        for layer in &mut self.layers {
            current = match layer {
                NetworkLayer::Dense(dense) => dense.forward_batch(current.view()),
                NetworkLayer::BatchNorm(norm) => norm.forward_batch(current.view()),
                NetworkLayer::Dropout(dropout) => dropout.forward_batch(current.view(), rng),
            };
        }
        current
    }

    fn running_stats(&self) -> Vec<(Array1<f32>, Array1<f32>)> {
        self.layers
            .iter()
            .filter_map(|layer| match layer {
                NetworkLayer::BatchNorm(norm) => Some((norm.running_mean.clone(), norm.running_var.clone())),
                _ => None,
            })
            .collect()
    }

    fn restore_running_stats(&mut self, saved: Vec<(Array1<f32>, Array1<f32>)>) {
        let norms = self.layers.iter_mut().filter_map(|layer| match layer {
            NetworkLayer::BatchNorm(norm) => Some(norm),
            _ => None,
        });
        for (norm, (mean, var)) in norms.zip(saved) {
            norm.running_mean = mean;
            norm.running_var = var;
        }
    }

    /// Gradients for each trainable layer, in layer order. Batch norm
    /// reports gamma as a one-row weight gradient.
    fn backward(&self, output_errors: Array2<f32>) -> Result<Vec<(Array2<f32>, Array1<f32>)>> {
        let mut gradients = Vec::new();
        let mut current_error = output_errors;

        for layer in self.layers.iter().rev() {
            current_error = match layer {
                NetworkLayer::Dense(dense) => {
                    let (input_errors, weight_gradients, bias_gradients) = dense.backward_batch(current_error.view())?;
                    gradients.push((weight_gradients, bias_gradients));
                    input_errors
                }
                NetworkLayer::BatchNorm(norm) => {
                    let (input_errors, gamma_gradients, beta_gradients) = norm.backward_batch(current_error.view())?;
                    gradients.push((gamma_gradients.insert_axis(Axis(0)), beta_gradients));
                    input_errors
                }
                NetworkLayer::Dropout(dropout) => dropout.backward_batch(current_error.view()),
            };
        }

        gradients.reverse();
        Ok(gradients)
    }

    /// Fit the network toward `targets` with one optimizer step over the
    /// batch, using the softmax/cross-entropy gradient `output - target`
    /// averaged over rows. Returns the cross-entropy (plus L2 penalty) of
    /// the updated network on the same batch.
    pub fn train_minibatch<R: Rng + ?Sized>(
        &mut self,
        inputs: ArrayView2<f32>,
        targets: ArrayView2<f32>,
        learning_rate: f32,
        rng: &mut R,
    ) -> Result<f32> {
        self.check_width(inputs.ncols())?;
        if inputs.nrows() == 0 {
            return Err(MindError::TrainingBatch("empty batch".to_string()));
        }
        if targets.dim() != (inputs.nrows(), self.output_size()) {
            return Err(MindError::dimension_mismatch(
                format!("targets {:?}", (inputs.nrows(), self.output_size())),
                format!("targets {:?}", targets.dim()),
            ));
        }

        let running = self.running_stats();
        let outputs = self.forward_train(inputs, rng);
        let output_errors = (&outputs - &targets) / inputs.nrows() as f32;
        let gradients = self.backward(output_errors).and_then(|gradients| {
            if gradients.iter().any(|(w, b)| w.iter().chain(b.iter()).any(|g| !g.is_finite())) {
                Err(MindError::Numerical("non-finite gradient".to_string()))
            } else {
                Ok(gradients)
            }
        });
        for layer in &mut self.layers {
            layer.clear_cache();
        }
        let gradients = match gradients {
            Ok(gradients) => gradients,
            Err(e) => {
                // A rejected batch leaves no trace in the normalization statistics
                self.restore_running_stats(running);
                return Err(e);
            }
        };

        let trainable = self
            .layers
            .iter_mut()
            .filter(|layer| !matches!(layer, NetworkLayer::Dropout(_)));
        for (i, (layer, (weight_gradients, bias_gradients))) in trainable.zip(gradients).enumerate() {
            match layer {
                NetworkLayer::Dense(dense) => {
                    self.optimizer.update_weights(i, &mut dense.weights, &weight_gradients, learning_rate);
                    self.optimizer.update_biases(i, &mut dense.biases, &bias_gradients, learning_rate);
                }
                NetworkLayer::BatchNorm(norm) => {
                    let mut gamma = norm.gamma.view().insert_axis(Axis(0)).to_owned();
                    self.optimizer.update_weights(i, &mut gamma, &weight_gradients, learning_rate);
                    norm.gamma = gamma.index_axis_move(Axis(0), 0);
                    self.optimizer.update_biases(i, &mut norm.beta, &bias_gradients, learning_rate);
                }
                NetworkLayer::Dropout(_) => {}
            }
        }
        self.optimizer.step();

        let predictions = self.infer(inputs)?;
        let cross_entropy = (&targets * &predictions.mapv(|p| p.max(LOG_FLOOR).ln()))
            .sum_axis(Axis(1))
            .mean()
            .map(|v| -v)
            .unwrap_or(f32::INFINITY);
        let penalty: f32 = self.dense_layers().map(DenseLayer::l2_penalty).sum();
        Ok(cross_entropy + penalty)
    }

}
