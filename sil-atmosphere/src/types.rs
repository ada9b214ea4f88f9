//! Tipos de dados atmosféricos

use crate::error::{AtmosphereError, AtmosphereResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Pressão ao nível do mar do local de instalação original (Arlington, VA)
pub const DEFAULT_SEA_LEVEL_PRESSURE_HPA: f32 = 1017.60;

/// Constante de tempo padrão do baseline VOC em segundos
pub const DEFAULT_BASELINE_TIME_CONSTANT_SECS: f32 = 600.0;

/// Leitura do sensor barométrico/umidade
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrimaryReading {
    /// Temperatura em graus Celsius
    pub temperature_c: f32,

    /// Umidade relativa (0.0 - 100.0)
    pub relative_humidity_pct: f32,

    /// Pressão atmosférica em hPa
    pub pressure_hpa: f32,
}

/// Amostra bruta de um tick: leitura primária + sinal do sensor de gás
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub temperature_c: f32,
    pub relative_humidity_pct: f32,
    pub pressure_hpa: f32,
    /// Sinal bruto do sensor MOX (ticks SRAW)
    pub voc_raw_signal: u16,
}

impl RawSample {
    pub fn new(primary: PrimaryReading, voc_raw_signal: u16) -> Self {
        Self {
            temperature_c: primary.temperature_c,
            relative_humidity_pct: primary.relative_humidity_pct,
            pressure_hpa: primary.pressure_hpa,
            voc_raw_signal,
        }
    }
}

/// Registro derivado emitido uma vez por tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Segundos desde a época Unix
    pub timestamp: i64,
    pub temperature_c: f32,
    pub relative_humidity_pct: f32,
    pub pressure_hpa: f32,
    /// Altitude derivada da pressão, em metros
    pub altitude_m: f32,
    /// Índice VOC na escala 0-500
    pub voc_index: u16,
}

impl Reading {
    pub fn from_sample(timestamp: i64, sample: &RawSample, altitude_m: f32, voc_index: u16) -> Self {
        Self {
            timestamp,
            temperature_c: sample.temperature_c,
            relative_humidity_pct: sample.relative_humidity_pct,
            pressure_hpa: sample.pressure_hpa,
            altitude_m,
            voc_index,
        }
    }

    /// Linha CSV do contrato de saída (sem quebra de linha)
    pub fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            self.timestamp,
            self.temperature_c,
            self.relative_humidity_pct,
            self.pressure_hpa,
            self.altitude_m,
            self.voc_index
        )
    }
}

/// Formato do fluxo de registros
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordFormat {
    #[default]
    Csv,
    /// Uma linha JSON por registro
    Json,
}

impl FromStr for RecordFormat {
    type Err = AtmosphereError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(RecordFormat::Csv),
            "json" | "jsonl" => Ok(RecordFormat::Json),
            other => Err(AtmosphereError::InvalidConfig(format!(
                "unknown record format '{other}' (expected csv or json)"
            ))),
        }
    }
}

/// Configuração do agente, lida uma vez na inicialização
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Intervalo entre amostras em segundos
    pub poll_interval_secs: u64,
    /// Pressão de referência ao nível do mar (hPa)
    pub sea_level_pressure_hpa: f32,
    /// Eco legível no fluxo de diagnóstico
    pub debug_echo: bool,
    pub format: RecordFormat,
    /// Encerra após N registros (None = indefinidamente)
    pub max_records: Option<u64>,
    /// Constante de tempo do baseline VOC (s)
    pub baseline_time_constant_secs: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 1,
            sea_level_pressure_hpa: DEFAULT_SEA_LEVEL_PRESSURE_HPA,
            debug_echo: false,
            format: RecordFormat::Csv,
            max_records: None,
            baseline_time_constant_secs: DEFAULT_BASELINE_TIME_CONSTANT_SECS,
        }
    }
}

impl AgentConfig {
    /// Falha cedo com `InvalidConfig` antes de o loop iniciar
    pub fn validate(&self) -> AtmosphereResult<()> {
        if self.poll_interval_secs == 0 {
            return Err(AtmosphereError::InvalidConfig(
                "Poll interval must be > 0 seconds".into(),
            ));
        }

        if !(self.sea_level_pressure_hpa.is_finite() && self.sea_level_pressure_hpa > 0.0) {
            return Err(AtmosphereError::InvalidConfig(format!(
                "Sea-level pressure must be > 0 hPa (got {})",
                self.sea_level_pressure_hpa
            )));
        }

        if !(self.baseline_time_constant_secs.is_finite() && self.baseline_time_constant_secs > 0.0)
        {
            return Err(AtmosphereError::InvalidConfig(
                "Baseline time constant must be > 0 seconds".into(),
            ));
        }

        if self.max_records == Some(0) {
            return Err(AtmosphereError::InvalidConfig(
                "Record count must be > 0 when given".into(),
            ));
        }

        Ok(())
    }
}
