pub mod serial;

pub use serial::SerialChannel;
