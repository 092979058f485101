pub mod builder;
pub mod gc;
pub mod ports;
