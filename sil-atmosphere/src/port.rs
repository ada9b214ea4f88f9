//! Porta de sensores e implementações sem hardware
//!
//! O loop de amostragem só conhece [`SensorPort`]. O adaptador real fica em
//! [`crate::hardware`] (feature `rpi`); aqui ficam o dublê roteirizado usado
//! nos testes e o sensor simulado usado pela CLI com `--simulate`.

use crate::error::{AtmosphereError, AtmosphereResult};
use crate::types::PrimaryReading;
use std::collections::VecDeque;

/// Capacidade de leitura dos dois sensores do barramento.
///
/// Cada tick chama `read_primary` e depois `read_gas_raw`, por um único
/// chamador; implementações não precisam ser thread-safe.
pub trait SensorPort {
    /// Nome para logs
    fn name(&self) -> &str;

    /// Temperatura, umidade e pressão do sensor barométrico
    fn read_primary(&mut self) -> AtmosphereResult<PrimaryReading>;

    /// Sinal bruto do sensor de gás
    fn read_gas_raw(&mut self) -> AtmosphereResult<u16>;
}

impl<S: SensorPort + ?Sized> SensorPort for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn read_primary(&mut self) -> AtmosphereResult<PrimaryReading> {
        (**self).read_primary()
    }

    fn read_gas_raw(&mut self) -> AtmosphereResult<u16> {
        (**self).read_gas_raw()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SENSOR ROTEIRIZADO
// ═══════════════════════════════════════════════════════════════════════════════

/// Passo do roteiro: resultado de uma amostra completa
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Sample(PrimaryReading, u16),
    /// Falha na leitura primária
    PrimaryFault(String),
    /// Leitura primária ok, falha no sensor de gás
    GasFault(PrimaryReading, String),
}

/// Dublê de teste que reproduz uma sequência fixa de leituras.
///
/// Com o roteiro esgotado, repete a última amostra válida (ou falha, se nunca
/// houve uma).
#[derive(Debug, Clone, Default)]
pub struct ScriptedSensor {
    script: VecDeque<ScriptStep>,
    pending_gas: Option<Result<u16, String>>,
    last_sample: Option<(PrimaryReading, u16)>,
    primary_reads: u64,
    gas_reads: u64,
}

impl ScriptedSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sensor que sempre devolve a mesma amostra
    pub fn constant(primary: PrimaryReading, gas_raw: u16) -> Self {
        let mut sensor = Self::new();
        sensor.last_sample = Some((primary, gas_raw));
        sensor
    }

    pub fn push(&mut self, step: ScriptStep) -> &mut Self {
        self.script.push_back(step);
        self
    }

    pub fn push_sample(&mut self, primary: PrimaryReading, gas_raw: u16) -> &mut Self {
        self.push(ScriptStep::Sample(primary, gas_raw))
    }

    pub fn push_fault(&mut self, message: impl Into<String>) -> &mut Self {
        self.push(ScriptStep::PrimaryFault(message.into()))
    }

    pub fn primary_reads(&self) -> u64 {
        self.primary_reads
    }

    pub fn gas_reads(&self) -> u64 {
        self.gas_reads
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl SensorPort for ScriptedSensor {
    fn name(&self) -> &str {
        "ScriptedSensor"
    }

    fn read_primary(&mut self) -> AtmosphereResult<PrimaryReading> {
        self.primary_reads += 1;

        let step = match self.script.pop_front() {
            Some(step) => step,
            None => match self.last_sample {
                Some((primary, gas)) => ScriptStep::Sample(primary, gas),
                None => ScriptStep::PrimaryFault("script exhausted".into()),
            },
        };

        match step {
            ScriptStep::Sample(primary, gas) => {
                self.last_sample = Some((primary, gas));
                self.pending_gas = Some(Ok(gas));
                Ok(primary)
            }
            ScriptStep::PrimaryFault(msg) => {
                self.pending_gas = None;
                Err(AtmosphereError::SensorRead(msg))
            }
            ScriptStep::GasFault(primary, msg) => {
                self.pending_gas = Some(Err(msg));
                Ok(primary)
            }
        }
    }

    fn read_gas_raw(&mut self) -> AtmosphereResult<u16> {
        self.gas_reads += 1;
        self.pending_gas
            .take()
            .unwrap_or_else(|| Err("gas read without primary read".into()))
            .map_err(AtmosphereError::SensorRead)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SENSOR SIMULADO
// ═══════════════════════════════════════════════════════════════════════════════

/// Gera condições ambientais sintéticas mas realistas, sem hardware.
///
/// Variação diurna lenta de temperatura/umidade, pressão quase estável e
/// um pico de VOC a cada `spike_period` amostras.
#[derive(Debug, Clone)]
pub struct SimulatedSensor {
    sample_count: u64,
    spike_period: u64,
    last_primary: PrimaryReading,
}

impl SimulatedSensor {
    pub fn new() -> Self {
        Self {
            sample_count: 0,
            spike_period: 300,
            last_primary: PrimaryReading {
                temperature_c: 22.0,
                relative_humidity_pct: 50.0,
                pressure_hpa: 1013.25,
            },
        }
    }

    pub fn with_spike_period(mut self, period: u64) -> Self {
        self.spike_period = period.max(1);
        self
    }

    fn cycle(&self) -> f32 {
        use std::f32::consts::PI;
        (self.sample_count as f32 * 0.01) % (2.0 * PI)
    }
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for SimulatedSensor {
    fn name(&self) -> &str {
        "SimulatedSensor"
    }

    fn read_primary(&mut self) -> AtmosphereResult<PrimaryReading> {
        self.sample_count += 1;
        let cycle = self.cycle();

        // 18-26 °C, umidade inversamente correlacionada
        let reading = PrimaryReading {
            temperature_c: 22.0 + 4.0 * cycle.sin(),
            relative_humidity_pct: 55.0 - 15.0 * cycle.sin(),
            pressure_hpa: 1013.25 + 3.5 * (cycle * 0.5).sin(),
        };
        self.last_primary = reading;
        Ok(reading)
    }

    fn read_gas_raw(&mut self) -> AtmosphereResult<u16> {
        let cycle = self.cycle();
        let rh = self.last_primary.relative_humidity_pct;

        // Sinal acompanha a umidade; o compensador deve cancelar esse efeito
        let mut raw = 30000.0 * (1.0 + 0.003 * (rh - 50.0)) + 150.0 * (cycle * 3.0).cos();

        let phase = self.sample_count % self.spike_period;
        if phase < 10 {
            raw += 2500.0 * (1.0 - phase as f32 / 10.0);
        }

        Ok(raw.clamp(1.0, f32::from(u16::MAX)) as u16)
    }
}
