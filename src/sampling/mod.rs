mod controller;
mod loop_worker;

pub use controller::SamplingService;
pub use loop_worker::sampling_loop;
