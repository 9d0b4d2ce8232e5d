pub mod features;
pub mod mutation;
pub mod network;
pub mod signal;

pub use features::{features, FEATURE_WIDTH};
pub use mutation::mutate;
pub use network::{compute, random_net, sigmoid, Network, NetworkError, NetworkShape, Neuron};
pub use signal::{decide, Signal};
