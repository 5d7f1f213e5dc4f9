pub mod classify;
pub mod flatten;
pub mod length;
pub mod measure;

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("flattening tolerance must be positive, got {0}")]
        InvalidTolerance(f64),
    }
}

pub use flatten::{CurveFlattener, DeBoorFlattener};
pub use measure::{MeasurementResult, Measurer};
