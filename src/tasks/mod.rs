pub mod latency;
pub mod plot;
pub mod results;
pub mod throughput;
