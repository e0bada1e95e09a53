mod convert;
mod inputs;

pub use convert::run_convert;
