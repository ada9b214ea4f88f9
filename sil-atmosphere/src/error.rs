//! Erros da telemetria atmosférica

use thiserror::Error;

pub type AtmosphereResult<T> = Result<T, AtmosphereError>;

/// Erros do agente de telemetria
#[derive(Debug, Error)]
pub enum AtmosphereError {
    #[error("Sensor read failed: {0}")]
    SensorRead(String),

    #[error("Sensor initialization failed: {0}")]
    SensorInit(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

impl AtmosphereError {
    /// Falhas de leitura são as únicas que o loop tenta novamente
    pub fn is_transient(&self) -> bool {
        matches!(self, AtmosphereError::SensorRead(_))
    }
}
