use std::sync::OnceLock;

use log::{error, info};
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;

use crate::classifier::ClassifierError;

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// ONNX Runtime settings applied to every model session.
#[derive(Debug)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization_level: GraphOptimizationLevel,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inter_threads: 0, // Let ONNX Runtime decide
            intra_threads: 1, // Bag-of-words models are tiny; one thread avoids pool overhead
            optimization_level: GraphOptimizationLevel::Level3,
        }
    }
}

impl Clone for RuntimeConfig {
    fn clone(&self) -> Self {
        Self {
            inter_threads: self.inter_threads,
            intra_threads: self.intra_threads,
            optimization_level: copy_level(&self.optimization_level),
        }
    }
}

fn copy_level(level: &GraphOptimizationLevel) -> GraphOptimizationLevel {
    match level {
        GraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
        GraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
        GraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        GraphOptimizationLevel::Disable => GraphOptimizationLevel::Disable,
    }
}

impl RuntimeConfig {
    /// Maps a numeric level (0 = disabled, 1-3) onto ONNX Runtime's graph optimization levels.
    pub fn with_optimization(mut self, level: u8) -> Result<Self, ClassifierError> {
        self.optimization_level = match level {
            0 => GraphOptimizationLevel::Disable,
            1 => GraphOptimizationLevel::Level1,
            2 => GraphOptimizationLevel::Level2,
            3 => GraphOptimizationLevel::Level3,
            other => {
                return Err(ClassifierError::ValidationError(format!(
                    "Optimization level must be between 0 and 3, got {}",
                    other
                )))
            }
        };
        Ok(self)
    }
}

fn init_onnx_environment() -> Result<(), String> {
    ort::init()
        .with_name("wordbag")
        .commit()
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Initializes the process-wide ONNX Runtime environment once.
pub fn ensure_initialized() -> Result<(), ClassifierError> {
    let result = INIT.get_or_init(|| {
        let result = init_onnx_environment();
        match &result {
            Ok(()) => info!("ONNX Runtime environment initialized"),
            Err(e) => error!("Failed to initialize ONNX Runtime environment: {}", e),
        }
        result
    });
    result.clone().map_err(ClassifierError::ModelError)
}

pub fn create_session_builder(config: &RuntimeConfig) -> Result<SessionBuilder, ClassifierError> {
    ensure_initialized()?;
    let mut builder = Session::builder()?;

    // Configure threading
    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }

    builder = builder.with_optimization_level(copy_level(&config.optimization_level))?;

    Ok(builder)
}
