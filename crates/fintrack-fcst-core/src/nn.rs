//! Minimal feed-forward regressor used by both predictors.
//!
//! A single sigmoid hidden layer and a sigmoid output unit, trained by
//! stochastic gradient descent on squared error. All activations live in
//! `(0, 1)`, which is exactly the co-domain of the normalized series the
//! models operate on: a raw prediction can never leave the scale range it
//! is later denormalized with.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::windowing::WindowedSample;

/// Sigmoid activation.
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Xavier-style initialization for a weight matrix.
fn xavier_init(rows: usize, cols: usize, rng: &mut impl Rng) -> Vec<Vec<f64>> {
    let scale = (2.0 / (rows + cols) as f64).sqrt();
    (0..rows)
        .map(|_| (0..cols).map(|_| rng.gen_range(-scale..scale)).collect())
        .collect()
}

/// Matrix-vector product `W * x`.
fn mat_vec_mul(w: &[Vec<f64>], x: &[f64]) -> Vec<f64> {
    w.iter()
        .map(|row| row.iter().zip(x.iter()).map(|(a, b)| a * b).sum())
        .collect()
}

/// A fully connected `input -> hidden -> 1` regressor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedForwardNet {
    /// Hidden layer weights, `[hidden x input]`.
    w1: Vec<Vec<f64>>,
    /// Hidden layer biases, `[hidden]`.
    b1: Vec<f64>,
    /// Output weights, `[hidden]`.
    w2: Vec<f64>,
    /// Output bias.
    b2: f64,
}

impl FeedForwardNet {
    /// Create a network with Xavier-initialized weights and zero biases.
    /// Both sizes must be at least 1; callers validate their configs.
    pub fn new(input_size: usize, hidden_size: usize, rng: &mut impl Rng) -> Self {
        let w1 = xavier_init(hidden_size, input_size, rng);
        let b1 = vec![0.0; hidden_size];
        let w2 = xavier_init(1, hidden_size, rng).remove(0);
        let b2 = 0.0;

        FeedForwardNet { w1, b1, w2, b2 }
    }

    /// Number of inputs the network expects.
    pub fn input_size(&self) -> usize {
        self.w1.first().map_or(0, Vec::len)
    }

    /// Forward pass returning the hidden activations and the output.
    fn forward(&self, input: &[f64]) -> (Vec<f64>, f64) {
        let hidden: Vec<f64> = mat_vec_mul(&self.w1, input)
            .iter()
            .zip(self.b1.iter())
            .map(|(z, b)| sigmoid(z + b))
            .collect();

        let z2: f64 = self
            .w2
            .iter()
            .zip(hidden.iter())
            .map(|(w, h)| w * h)
            .sum::<f64>()
            + self.b2;

        (hidden, sigmoid(z2))
    }

    /// Predict the next value for an input window. Output is in `(0, 1)`.
    pub fn predict(&self, input: &[f64]) -> f64 {
        self.forward(input).1
    }

    /// One gradient step over a minibatch.
    ///
    /// Every sample's input must match the network's input size. Gradients
    /// are averaged over the batch before the update. Returns the summed
    /// squared error of the batch as seen before the update, so an epoch's
    /// mean error is the sum over batches divided by the sample count.
    pub fn train_step(&mut self, batch: &[&WindowedSample], learning_rate: f64) -> Result<f64> {
        if batch.is_empty() {
            return Ok(0.0);
        }

        let hidden_size = self.b1.len();
        let input_size = self.input_size();

        if let Some(bad) = batch.iter().find(|s| s.input.len() != input_size) {
            return Err(ForecastError::InvalidInput(format!(
                "sample input length {} does not match the network input size {}",
                bad.input.len(),
                input_size
            )));
        }

        let mut grad_w1 = vec![vec![0.0; input_size]; hidden_size];
        let mut grad_b1 = vec![0.0; hidden_size];
        let mut grad_w2 = vec![0.0; hidden_size];
        let mut grad_b2 = 0.0;
        let mut squared_error = 0.0;

        for sample in batch {
            let (hidden, output) = self.forward(&sample.input);
            let err = output - sample.target;
            squared_error += err * err;

            // Output delta for squared-error loss through the sigmoid.
            let delta_out = err * output * (1.0 - output);
            grad_b2 += delta_out;
            for j in 0..hidden_size {
                grad_w2[j] += delta_out * hidden[j];

                let delta_hidden = delta_out * self.w2[j] * hidden[j] * (1.0 - hidden[j]);
                grad_b1[j] += delta_hidden;
                for i in 0..input_size {
                    grad_w1[j][i] += delta_hidden * sample.input[i];
                }
            }
        }

        let step = learning_rate / batch.len() as f64;
        self.b2 -= step * grad_b2;
        for j in 0..hidden_size {
            self.w2[j] -= step * grad_w2[j];
            self.b1[j] -= step * grad_b1[j];
            for i in 0..input_size {
                self.w1[j][i] -= step * grad_w1[j][i];
            }
        }

        Ok(squared_error)
    }

    /// Mean squared error over a sample set, without updating weights.
    pub fn evaluate(&self, samples: &[WindowedSample]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let total: f64 = samples
            .iter()
            .map(|s| {
                let err = self.predict(&s.input) - s.target;
                err * err
            })
            .sum();
        total / samples.len() as f64
    }
}
