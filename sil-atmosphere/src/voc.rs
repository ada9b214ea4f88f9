//! Compensador VOC: sinal bruto MOX → índice 0-500
//!
//! O sensor MOX entrega um sinal bruto (ticks SRAW) cuja resistência depende
//! tanto da concentração de VOC quanto da umidade e temperatura ambiente. O
//! compensador:
//!
//! 1. remove o efeito de umidade/temperatura do sinal bruto;
//! 2. compara o sinal compensado com um baseline de longo prazo;
//! 3. mapeia o desvio relativo para a escala 0-500 (ar limpo ≈ 100);
//! 4. atualiza o baseline com um filtro passa-baixa.
//!
//! O baseline depende do histórico: as chamadas devem seguir a ordem
//! cronológica das amostras, exatamente uma vez por amostra.

use crate::error::{AtmosphereError, AtmosphereResult};
use crate::types::DEFAULT_BASELINE_TIME_CONSTANT_SECS;
use serde::{Deserialize, Serialize};

/// Menor sinal bruto aceito (0 indica falha do sensor)
pub const RAW_MIN: u16 = 1;
/// Maior sinal bruto aceito
pub const RAW_MAX: u16 = u16::MAX;

/// Índice do ar limpo (sinal no baseline)
pub const INDEX_BASELINE: f32 = 100.0;
/// Limite superior da escala
pub const INDEX_MAX: u16 = 500;

/// Amostras até o baseline ser considerado estável
pub const WARMUP_SAMPLES: u64 = 45;

const TEMPERATURE_RANGE_C: (f32, f32) = (-20.0, 55.0);
const HUMIDITY_RANGE_PCT: (f32, f32) = (0.0, 100.0);

// Sensibilidade relativa do sinal por %UR e por °C em torno de 50 %UR / 25 °C
const K_HUMIDITY: f32 = 0.003;
const K_TEMPERATURE: f32 = 0.002;
const REFERENCE_HUMIDITY_PCT: f32 = 50.0;
const REFERENCE_TEMPERATURE_C: f32 = 25.0;

const GAIN_UP: f32 = 1.5;
const GAIN_DOWN: f32 = 3.0;

/// Configuração do filtro de baseline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VocConfig {
    /// Intervalo entre chamadas em segundos
    pub sampling_interval_secs: f32,
    /// Constante de tempo do baseline em segundos
    pub baseline_time_constant_secs: f32,
}

impl Default for VocConfig {
    fn default() -> Self {
        Self {
            sampling_interval_secs: 1.0,
            baseline_time_constant_secs: DEFAULT_BASELINE_TIME_CONSTANT_SECS,
        }
    }
}

impl VocConfig {
    pub fn validate(&self) -> AtmosphereResult<()> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !positive(self.sampling_interval_secs) {
            return Err(AtmosphereError::InvalidConfig(
                "VOC sampling interval must be > 0".into(),
            ));
        }
        if !positive(self.baseline_time_constant_secs) {
            return Err(AtmosphereError::InvalidConfig(
                "VOC baseline time constant must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Ganho do filtro em regime permanente, em (0, 1]
    pub fn steady_alpha(&self) -> f32 {
        (self.sampling_interval_secs / self.baseline_time_constant_secs).clamp(f32::MIN_POSITIVE, 1.0)
    }
}

/// Estado interno do compensador
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CompensatorState {
    /// Estimativa do sinal compensado em ar limpo (0 = frio)
    pub baseline_estimate: f32,
    /// Chamadas processadas desde o início
    pub sample_count: u64,
}

/// Converte sinal bruto + umidade/temperatura em índice VOC.
#[derive(Debug, Clone)]
pub struct VocCompensator {
    config: VocConfig,
    steady_alpha: f32,
    state: CompensatorState,
}

impl VocCompensator {
    /// Compensador com configuração padrão (1 Hz, τ = 600 s)
    pub fn new() -> Self {
        let config = VocConfig::default();
        Self {
            steady_alpha: config.steady_alpha(),
            config,
            state: CompensatorState::default(),
        }
    }

    pub fn with_config(config: VocConfig) -> AtmosphereResult<Self> {
        config.validate()?;
        Ok(Self {
            steady_alpha: config.steady_alpha(),
            config,
            state: CompensatorState::default(),
        })
    }

    pub fn config(&self) -> &VocConfig {
        &self.config
    }

    pub fn state(&self) -> CompensatorState {
        self.state
    }

    pub fn sample_count(&self) -> u64 {
        self.state.sample_count
    }

    pub fn is_warmed_up(&self) -> bool {
        self.state.sample_count >= WARMUP_SAMPLES
    }

    /// Volta ao estado frio
    pub fn reset(&mut self) {
        self.state = CompensatorState::default();
    }

    /// Mede o índice VOC desta amostra e atualiza o baseline.
    ///
    /// Não é idempotente: cada chamada entra no histórico do filtro.
    pub fn measure_index(&mut self, raw_signal: u16, temperature_c: f32, relative_humidity_pct: f32) -> u16 {
        let compensated = compensate(raw_signal, temperature_c, relative_humidity_pct);

        if self.state.sample_count == 0 || self.state.baseline_estimate <= 0.0 {
            self.state.baseline_estimate = compensated;
        }

        let baseline = self.state.baseline_estimate;
        let deviation = (compensated - baseline) / baseline;
        let index = deviation_to_index(deviation);

        self.state.sample_count = self.state.sample_count.saturating_add(1);
        let warmup_alpha = 1.0 / self.state.sample_count as f32;
        let alpha = warmup_alpha.max(self.steady_alpha);
        self.state.baseline_estimate = baseline + alpha * (compensated - baseline);

        tracing::trace!(
            raw_signal,
            compensated,
            baseline = self.state.baseline_estimate,
            index,
            "voc sample"
        );

        index
    }
}

impl Default for VocCompensator {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FUNÇÕES PURAS
// ═══════════════════════════════════════════════════════════════════════════════

/// Sinal bruto corrigido para 50 %UR / 25 °C.
///
/// Entradas fora da faixa do sensor são saturadas; o resultado é sempre > 0.
pub fn compensate(raw_signal: u16, temperature_c: f32, relative_humidity_pct: f32) -> f32 {
    let raw = f32::from(raw_signal.clamp(RAW_MIN, RAW_MAX));
    let t = finite_or(temperature_c, REFERENCE_TEMPERATURE_C)
        .clamp(TEMPERATURE_RANGE_C.0, TEMPERATURE_RANGE_C.1);
    let rh = finite_or(relative_humidity_pct, REFERENCE_HUMIDITY_PCT)
        .clamp(HUMIDITY_RANGE_PCT.0, HUMIDITY_RANGE_PCT.1);

    let humidity_factor = 1.0 + K_HUMIDITY * (rh - REFERENCE_HUMIDITY_PCT);
    let temperature_factor = 1.0 + K_TEMPERATURE * (t - REFERENCE_TEMPERATURE_C);

    raw / humidity_factor / temperature_factor
}

/// Desvio relativo ao baseline → índice [0, 500], monotônico e saturante
pub fn deviation_to_index(deviation: f32) -> u16 {
    if !deviation.is_finite() {
        return if deviation > 0.0 { INDEX_MAX } else { 0 };
    }

    let headroom = f32::from(INDEX_MAX) - INDEX_BASELINE;
    let index = if deviation >= 0.0 {
        INDEX_BASELINE + headroom * (GAIN_UP * deviation).tanh()
    } else {
        INDEX_BASELINE * (1.0 + (GAIN_DOWN * deviation).tanh())
    };

    index.round().clamp(0.0, f32::from(INDEX_MAX)) as u16
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}
