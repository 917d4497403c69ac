pub mod rng;
pub mod telemetry;
