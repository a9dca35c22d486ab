//! Shared fixtures for unit tests.

mod fakes;

pub use fakes::*;
pub use image::*;
