mod service;

pub use service::CommandQueue;
