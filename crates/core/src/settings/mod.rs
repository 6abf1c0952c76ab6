//! Engine settings supplied by the host application.

mod settings_model;

pub use settings_model::*;
