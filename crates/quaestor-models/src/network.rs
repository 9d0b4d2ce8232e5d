// Fixed-topology feed-forward network with sigmoid activations

use quaestor_core::config::NetworkConfig;
use quaestor_core::domain::QuaestorError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Upper bound (exclusive) for freshly drawn weights, biases and activations.
pub const INITIAL_RANGE: f64 = 5.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("hidden layer count {declared} does not match {sizes} layer sizes")]
    LayerCountMismatch { declared: usize, sizes: usize },

    #[error("layer {layer} has no neurons")]
    EmptyLayer { layer: usize },

    #[error("network needs at least one input and one output")]
    EmptyShape,

    #[error("neuron {neuron} of layer {layer} has {found} weights, expected {expected}")]
    WeightCount {
        layer: usize,
        neuron: usize,
        expected: usize,
        found: usize,
    },
}

impl From<NetworkError> for QuaestorError {
    fn from(e: NetworkError) -> Self {
        QuaestorError::Network(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neuron {
    pub bias: f64,
    /// Carried through initialization and mutation; the forward pass never reads it.
    pub activation: f64,
    pub weights: Vec<f64>,
}

impl Neuron {
    pub fn random<R: Rng + ?Sized>(weights_count: usize, highest: f64, rng: &mut R) -> Self {
        let weights = (0..weights_count).map(|_| rng.gen::<f64>() * highest).collect();
        Self {
            bias: rng.gen::<f64>() * highest,
            activation: rng.gen::<f64>() * highest,
            weights,
        }
    }

    /// `sigmoid(weights · inputs + bias)`. Inputs shorter than the weight
    /// vector count as zero-padded.
    pub fn fire(&self, inputs: &[f64]) -> f64 {
        let total: f64 = self.weights.iter().zip(inputs).map(|(w, x)| w * x).sum();
        sigmoid(total + self.bias)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub hidden_layers: Vec<Vec<Neuron>>,
    pub output_layer: Vec<Neuron>,
}

impl Network {
    /// Sentinel returned when construction fails.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.output_layer.is_empty() && self.hidden_layers.iter().all(|l| l.is_empty())
    }

    /// Hidden layers in order, then the output layer.
    pub fn layers(&self) -> impl Iterator<Item = &[Neuron]> {
        self.hidden_layers
            .iter()
            .map(|l| l.as_slice())
            .chain(std::iter::once(self.output_layer.as_slice()))
    }

    pub fn input_size(&self) -> usize {
        self.layers()
            .next()
            .and_then(|layer| layer.first())
            .map(|n| n.weights.len())
            .unwrap_or(0)
    }

    pub fn output_size(&self) -> usize {
        self.output_layer.len()
    }

    pub fn neuron_count(&self) -> usize {
        self.layers().map(|l| l.len()).sum()
    }

    /// Neuron at a flat index over hidden layers then the output layer.
    pub fn neuron_at_mut(&mut self, mut index: usize) -> Option<&mut Neuron> {
        for layer in self.hidden_layers.iter_mut() {
            if index < layer.len() {
                return layer.get_mut(index);
            }
            index -= layer.len();
        }
        self.output_layer.get_mut(index)
    }

    /// Checks that every neuron has one weight per neuron of the previous layer.
    pub fn validate(&self) -> Result<(), NetworkError> {
        let mut expected = self.input_size();
        if expected == 0 || self.output_layer.is_empty() {
            return Err(NetworkError::EmptyShape);
        }
        for (layer_idx, layer) in self.layers().enumerate() {
            if layer.is_empty() {
                return Err(NetworkError::EmptyLayer { layer: layer_idx });
            }
            for (neuron_idx, neuron) in layer.iter().enumerate() {
                if neuron.weights.len() != expected {
                    return Err(NetworkError::WeightCount {
                        layer: layer_idx,
                        neuron: neuron_idx,
                        expected,
                        found: neuron.weights.len(),
                    });
                }
            }
            expected = layer.len();
        }
        Ok(())
    }
}

/// Layer sizes used when generating random networks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkShape {
    pub input_size: usize,
    pub hidden_layers: Vec<usize>,
    pub output_size: usize,
    pub initial_range: f64,
}

impl Default for NetworkShape {
    fn default() -> Self {
        Self {
            input_size: 14,
            hidden_layers: vec![12, 12, 12],
            output_size: 3,
            initial_range: INITIAL_RANGE,
        }
    }
}

impl From<&NetworkConfig> for NetworkShape {
    fn from(config: &NetworkConfig) -> Self {
        Self {
            input_size: config.input_size,
            hidden_layers: config.hidden_layers.clone(),
            output_size: config.output_size,
            initial_range: config.initial_range,
        }
    }
}

impl NetworkShape {
    pub fn try_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Network, NetworkError> {
        try_random_net(
            self.input_size,
            self.hidden_layers.len(),
            &self.hidden_layers,
            self.output_size,
            self.initial_range,
            rng,
        )
    }

    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Network {
        random_net_in_range(
            self.input_size,
            self.hidden_layers.len(),
            &self.hidden_layers,
            self.output_size,
            self.initial_range,
            rng,
        )
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Runs `input` through the hidden layers in order, then the output layer.
pub fn compute(input: &[f64], net: &Network) -> Vec<f64> {
    if net.is_empty() {
        return Vec::new();
    }
    let mut activations = input.to_vec();
    for layer in net.layers() {
        activations = layer.iter().map(|n| n.fire(&activations)).collect();
    }
    activations
}

pub fn try_random_net<R: Rng + ?Sized>(
    input_size: usize,
    hidden_layer_count: usize,
    hidden_layer_sizes: &[usize],
    output_size: usize,
    highest: f64,
    rng: &mut R,
) -> Result<Network, NetworkError> {
    if hidden_layer_count != hidden_layer_sizes.len() {
        return Err(NetworkError::LayerCountMismatch {
            declared: hidden_layer_count,
            sizes: hidden_layer_sizes.len(),
        });
    }
    if input_size == 0 || output_size == 0 {
        return Err(NetworkError::EmptyShape);
    }
    if let Some(layer) = hidden_layer_sizes.iter().position(|&n| n == 0) {
        return Err(NetworkError::EmptyLayer { layer });
    }

    let mut hidden_layers = Vec::with_capacity(hidden_layer_count);
    let mut inputs = input_size;
    for &size in hidden_layer_sizes {
        let layer: Vec<Neuron> = (0..size).map(|_| Neuron::random(inputs, highest, rng)).collect();
        hidden_layers.push(layer);
        inputs = size;
    }
    let output_layer = (0..output_size)
        .map(|_| Neuron::random(inputs, highest, rng))
        .collect();

    Ok(Network {
        hidden_layers,
        output_layer,
    })
}

/// Random network with every parameter drawn from `[0, highest)`. A bad
/// shape is logged and yields the empty sentinel network.
pub fn random_net_in_range<R: Rng + ?Sized>(
    input_size: usize,
    hidden_layer_count: usize,
    hidden_layer_sizes: &[usize],
    output_size: usize,
    highest: f64,
    rng: &mut R,
) -> Network {
    match try_random_net(
        input_size,
        hidden_layer_count,
        hidden_layer_sizes,
        output_size,
        highest,
        rng,
    ) {
        Ok(net) => net,
        Err(e) => {
            error!("Invalid network config: {}", e);
            Network::empty()
        }
    }
}

pub fn random_net<R: Rng + ?Sized>(
    input_size: usize,
    hidden_layer_count: usize,
    hidden_layer_sizes: &[usize],
    output_size: usize,
    rng: &mut R,
) -> Network {
    random_net_in_range(
        input_size,
        hidden_layer_count,
        hidden_layer_sizes,
        output_size,
        INITIAL_RANGE,
        rng,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_net_shape() {
        let mut rng = StdRng::seed_from_u64(1);
        let net = random_net(14, 3, &[12, 8, 6], 3, &mut rng);
        assert_eq!(net.hidden_layers.len(), 3);
        assert_eq!(net.hidden_layers[0][0].weights.len(), 14);
        assert_eq!(net.hidden_layers[1][0].weights.len(), 12);
        assert_eq!(net.hidden_layers[2][0].weights.len(), 8);
        assert_eq!(net.output_layer.len(), 3);
        assert_eq!(net.output_layer[0].weights.len(), 6);
        assert_eq!(net.neuron_count(), 12 + 8 + 6 + 3);
        assert!(net.validate().is_ok());
    }

    #[test]
    fn test_random_parameters_in_range() {
        let mut rng = StdRng::seed_from_u64(2);
        let net = random_net(5, 1, &[4], 2, &mut rng);
        for layer in net.layers() {
            for neuron in layer {
                assert!((0.0..INITIAL_RANGE).contains(&neuron.bias));
                assert!((0.0..INITIAL_RANGE).contains(&neuron.activation));
                assert!(neuron.weights.iter().all(|w| (0.0..INITIAL_RANGE).contains(w)));
            }
        }
    }

    #[test]
    fn test_layer_count_mismatch_yields_sentinel() {
        let mut rng = StdRng::seed_from_u64(3);
        let net = random_net(14, 2, &[12, 12, 12], 3, &mut rng);
        assert!(net.is_empty());
        assert!(compute(&[1.0; 14], &net).is_empty());
        assert_eq!(
            try_random_net(14, 2, &[12, 12, 12], 3, INITIAL_RANGE, &mut rng),
            Err(NetworkError::LayerCountMismatch { declared: 2, sizes: 3 })
        );
    }

    #[test]
    fn test_shape_errors_convert() {
        let shape = NetworkShape {
            input_size: 0,
            ..NetworkShape::default()
        };
        let err = shape.try_random(&mut StdRng::seed_from_u64(9)).unwrap_err();
        assert_eq!(err, NetworkError::EmptyShape);
        assert!(matches!(QuaestorError::from(err), QuaestorError::Network(_)));
    }

    #[test]
    fn test_compute_shape_and_range() {
        let mut rng = StdRng::seed_from_u64(4);
        let net = NetworkShape::default().random(&mut rng);
        let out = compute(&[0.5; 13], &net);
        assert_eq!(out.len(), 3);
        // Large weighted sums saturate the sigmoid to exactly 1.0 in f64.
        assert!(out.iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v)));

        let out = compute(&[-3.0, 2.0, 0.0, 1e3, -1e3, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9], &net);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_compute_hand_built_network() {
        let net = Network {
            hidden_layers: vec![vec![Neuron {
                bias: 0.0,
                activation: 99.0,
                weights: vec![1.0, -1.0],
            }]],
            output_layer: vec![Neuron {
                bias: -0.5,
                activation: 0.0,
                weights: vec![1.0],
            }],
        };
        let hidden = sigmoid(2.0 - 1.0);
        let expected = sigmoid(hidden - 0.5);
        let out = compute(&[2.0, 1.0], &net);
        assert!((out[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_compute_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(5);
        let net = NetworkShape::default().random(&mut rng);
        let input: Vec<f64> = (0..14).map(|i| i as f64 / 14.0).collect();
        assert_eq!(compute(&input, &net), compute(&input, &net));
    }

    #[test]
    fn test_sigmoid_values() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(40.0) <= 1.0);
        assert!(sigmoid(-40.0) >= 0.0);
    }

    #[test]
    fn test_neuron_at_mut_spans_output_layer() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut net = random_net(3, 2, &[2, 2], 1, &mut rng);
        assert!(net.neuron_at_mut(4).is_some());
        assert!(net.neuron_at_mut(5).is_none());
        net.neuron_at_mut(4).unwrap().bias = -7.0;
        assert_eq!(net.output_layer[0].bias, -7.0);
    }

    #[test]
    fn test_validate_catches_bad_weights() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut net = random_net(3, 1, &[2], 1, &mut rng);
        net.output_layer[0].weights.push(1.0);
        assert!(matches!(net.validate(), Err(NetworkError::WeightCount { layer: 1, .. })));
    }

    #[test]
    fn test_moderate_sums_stay_strictly_inside_unit_range() {
        let neuron = |bias: f64, weights: Vec<f64>| Neuron { bias, activation: 0.0, weights };
        let net = Network {
            hidden_layers: vec![vec![neuron(0.5, vec![1.0, -2.0]), neuron(-1.0, vec![0.25, 0.75])]],
            output_layer: vec![neuron(0.0, vec![3.0, -3.0]), neuron(2.0, vec![-1.0, 1.0])],
        };
        let out = compute(&[0.4, 0.9], &net);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|v| *v > 0.0 && *v < 1.0));

        let hidden = [sigmoid(0.5 + 0.4 - 1.8), sigmoid(-1.0 + 0.1 + 0.675)];
        assert!((out[0] - sigmoid(3.0 * hidden[0] - 3.0 * hidden[1])).abs() < 1e-12);
        assert!((out[1] - sigmoid(2.0 - hidden[0] + hidden[1])).abs() < 1e-12);
    }

    #[test]
    fn test_network_serde_round_trip() {
        let mut rng = StdRng::seed_from_u64(8);
        let net = random_net(2, 1, &[2], 1, &mut rng);
        let json = serde_json::to_string(&net).unwrap();
        let back: Network = serde_json::from_str(&json).unwrap();
        assert_eq!(back, net);
    }
}
