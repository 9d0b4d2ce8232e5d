use crate::network::{Network, Neuron};
use rand::Rng;

/// Largest single nudge applied to an activation.
pub const ACTIVATION_STEP: f64 = 1.0;
/// Largest single nudge applied to a bias.
pub const BIAS_STEP: f64 = 1.0;
/// Largest single nudge applied to a weight.
pub const WEIGHT_STEP: f64 = 5.0;

/// Parameter of a neuron touched by one mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gene {
    Activation,
    Bias,
    Weight(usize),
}

/// Returns a mutated copy of `net`. Each of the `mutation_count` mutations
/// picks a neuron uniformly over every hidden and output neuron and nudges
/// one of its parameters. The parent is left untouched.
pub fn mutate<R: Rng + ?Sized>(net: &Network, mutation_count: usize, rng: &mut R) -> Network {
    let mut child = net.clone();
    let total = child.neuron_count();
    if total == 0 {
        return child;
    }

    for _ in 0..mutation_count {
        let pick = rng.gen_range(0..total);
        if let Some(neuron) = child.neuron_at_mut(pick) {
            mutate_neuron(neuron, rng);
        }
    }
    child
}

/// Nudges one parameter of `neuron` up or down with equal probability.
pub fn mutate_neuron<R: Rng + ?Sized>(neuron: &mut Neuron, rng: &mut R) -> Gene {
    let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    let gene = match rng.gen_range(0..3) {
        0 => Gene::Activation,
        1 => Gene::Bias,
        // A neuron without weights falls back to its bias.
        _ if neuron.weights.is_empty() => Gene::Bias,
        _ => Gene::Weight(rng.gen_range(0..neuron.weights.len())),
    };

    match gene {
        Gene::Activation => neuron.activation += sign * rng.gen::<f64>() * ACTIVATION_STEP,
        Gene::Bias => neuron.bias += sign * rng.gen::<f64>() * BIAS_STEP,
        Gene::Weight(idx) => neuron.weights[idx] += sign * rng.gen::<f64>() * WEIGHT_STEP,
    }
    gene
}

/// Mutation count drawn uniformly from `min..=max`.
pub fn mutation_count<R: Rng + ?Sized>(min: usize, max: usize, rng: &mut R) -> usize {
    if max <= min {
        return min;
    }
    rng.gen_range(min..=max)
}
