//! # 🌡️ sil-atmosphere — Telemetria Atmosférica Periódica
//!
//! Lê temperatura, umidade e pressão de um sensor barométrico (BME280) e o
//! sinal bruto de um sensor de gás MOX (SGP40) no mesmo barramento, deriva
//! altitude e índice VOC, e emite um registro CSV por intervalo de amostragem.
//!
//! ## Arquitetura
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐
//! │  SensorPort  │────▶│ AltitudeModel  │──┐
//! │ (hardware ou │     └────────────────┘  │   ┌──────────────┐   ┌───────────────┐
//! │   dublê)     │     ┌────────────────┐  ├──▶│ SamplingLoop │──▶│ RecordEmitter │
//! │              │────▶│ VocCompensator │──┘   │ (prazos abs.)│   │ (stdout/CSV)  │
//! └──────────────┘     └────────────────┘      └──────────────┘   └───────────────┘
//! ```
//!
//! O único estado que vive o processo inteiro é o baseline do
//! [`VocCompensator`]; todo o resto é criado e descartado a cada tick.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use sil_atmosphere::{AgentConfig, ManualClock, PrimaryReading, RecordEmitter, SamplingLoop, ScriptedSensor};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sensor = ScriptedSensor::constant(
//!     PrimaryReading { temperature_c: 22.5, relative_humidity_pct: 45.3, pressure_hpa: 1013.2 },
//!     30000,
//! );
//! let config = AgentConfig { max_records: Some(3), ..Default::default() };
//! let emitter = RecordEmitter::new(Vec::new(), std::io::sink(), config.format, false);
//!
//! let mut sampler = SamplingLoop::new(&config, sensor, ManualClock::starting_at_secs(1_700_000_000), emitter)?;
//! let summary = sampler.run(std::future::pending()).await?;
//! assert_eq!(summary.records_emitted, 3);
//! # Ok(())
//! # }
//! ```
//!
//! ## Módulos
//!
//! - [`altitude`] - Fórmula barométrica
//! - [`voc`] - Compensação e índice VOC
//! - [`port`] - Porta de sensores, dublê roteirizado e sensor simulado
//! - [`clock`] - Relógio do sistema e relógio manual
//! - [`sampler`] - Loop de amostragem
//! - [`emitter`] - Emissão de registros
//! - `hardware` - Adaptador Raspberry Pi (feature `rpi`)

pub mod altitude;
pub mod clock;
pub mod emitter;
pub mod error;
#[cfg(feature = "rpi")]
pub mod hardware;
pub mod port;
pub mod sampler;
pub mod types;
pub mod voc;

pub use altitude::{altitude, checked_altitude};
pub use clock::{Clock, ManualClock, SystemClock};
pub use emitter::RecordEmitter;
pub use error::{AtmosphereError, AtmosphereResult};
#[cfg(feature = "rpi")]
pub use hardware::RpiAtmosphericSensor;
pub use port::{ScriptStep, ScriptedSensor, SensorPort, SimulatedSensor};
pub use sampler::{LoopSummary, SamplingLoop};
pub use types::{AgentConfig, PrimaryReading, RawSample, Reading, RecordFormat};
pub use voc::{CompensatorState, VocCompensator, VocConfig};

#[cfg(test)]
mod tests;
