//! Data models for printer hardware configuration

pub mod artifact;
pub mod configuration;
pub mod hardware;
pub mod motion;
pub mod options;
pub mod printer;
pub mod rail;
pub mod toolhead;

pub use artifact::*;
pub use configuration::*;
pub use hardware::*;
pub use motion::*;
pub use options::*;
pub use printer::*;
pub use rail::*;
pub use toolhead::*;
