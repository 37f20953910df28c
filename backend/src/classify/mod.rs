pub mod classify_service;

pub use classify_service::{ClassifyError, ClassifyService};
