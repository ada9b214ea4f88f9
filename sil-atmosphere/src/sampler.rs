//! Loop de amostragem
//!
//! Estado único *Polling*: ler → derivar → emitir → dormir até o próximo
//! prazo absoluto. Os prazos avançam em múltiplos exatos do intervalo
//! (`deadline += interval`), então a latência de processamento não acumula
//! deriva. O primeiro prazo é alinhado ao próximo segundo inteiro, e cada
//! registro leva o prazo do seu tick como timestamp.
//!
//! O encerramento só é observado entre ticks; um tick nunca é interrompido.

use crate::altitude::altitude;
use crate::clock::{Clock, next_whole_second};
use crate::emitter::RecordEmitter;
use crate::error::{AtmosphereError, AtmosphereResult};
use crate::port::SensorPort;
use crate::types::{AgentConfig, RawSample, Reading};
use crate::voc::{VocCompensator, VocConfig};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::io::Write;
use std::time::Duration;

/// Espera antes da única nova tentativa de leitura
pub const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Resumo devolvido quando o loop termina normalmente
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopSummary {
    pub records_emitted: u64,
    /// Leituras que falharam na primeira tentativa e passaram na segunda
    pub retries: u64,
    /// Prazos pulados por excesso de processamento
    pub missed_ticks: u64,
}

pub struct SamplingLoop<S, C, W, D>
where
    S: SensorPort,
    C: Clock,
    W: Write,
    D: Write,
{
    sensor: S,
    clock: C,
    compensator: VocCompensator,
    emitter: RecordEmitter<W, D>,
    interval: Duration,
    sea_level_pressure_hpa: f32,
    max_records: Option<u64>,
    summary: LoopSummary,
}

impl<S, C, W, D> SamplingLoop<S, C, W, D>
where
    S: SensorPort,
    C: Clock,
    W: Write,
    D: Write,
{
    /// Valida a configuração antes de montar o loop
    pub fn new(config: &AgentConfig, sensor: S, clock: C, emitter: RecordEmitter<W, D>) -> AtmosphereResult<Self> {
        config.validate()?;

        let compensator = VocCompensator::with_config(VocConfig {
            sampling_interval_secs: config.poll_interval_secs as f32,
            baseline_time_constant_secs: config.baseline_time_constant_secs,
        })?;

        Ok(Self {
            sensor,
            clock,
            compensator,
            emitter,
            interval: Duration::from_secs(config.poll_interval_secs),
            sea_level_pressure_hpa: config.sea_level_pressure_hpa,
            max_records: config.max_records,
            summary: LoopSummary::default(),
        })
    }

    pub fn summary(&self) -> LoopSummary {
        self.summary
    }

    pub fn compensator(&self) -> &VocCompensator {
        &self.compensator
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn into_parts(self) -> (S, C, RecordEmitter<W, D>) {
        (self.sensor, self.clock, self.emitter)
    }

    /// Roda até `shutdown` completar, atingir `max_records` ou falhar.
    ///
    /// Erros de sensor persistentes e falhas de saída encerram o loop sem
    /// emitir registro parcial.
    pub async fn run<F>(&mut self, shutdown: F) -> AtmosphereResult<LoopSummary>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut deadline = next_whole_second(self.clock.now());
        tracing::info!(
            sensor = self.sensor.name(),
            interval_secs = self.interval.as_secs(),
            "sampling loop started"
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!(records = self.summary.records_emitted, "shutdown requested");
                    return Ok(self.summary);
                }
                _ = self.clock.sleep_until(deadline) => {}
            }

            let reading = self.tick(deadline).await?;
            self.emitter.emit(&reading)?;
            self.summary.records_emitted += 1;

            if self
                .max_records
                .is_some_and(|max| self.summary.records_emitted >= max)
            {
                tracing::info!(records = self.summary.records_emitted, "record limit reached");
                return Ok(self.summary);
            }

            deadline = self.next_deadline(deadline);
        }
    }

    /// Uma iteração completa: leitura (com nova tentativa), altitude, VOC
    async fn tick(&mut self, deadline: Duration) -> AtmosphereResult<Reading> {
        let sample = self.read_with_retry().await?;

        let altitude_m = altitude(sample.pressure_hpa, self.sea_level_pressure_hpa);

        // Exatamente uma vez por tick bem-sucedido
        let voc_index = self.compensator.measure_index(
            sample.voc_raw_signal,
            sample.temperature_c,
            sample.relative_humidity_pct,
        );

        // Prazos ficam na grade de segundos inteiros
        let timestamp = deadline.as_secs() as i64;
        Ok(Reading::from_sample(timestamp, &sample, altitude_m, voc_index))
    }

    async fn read_with_retry(&mut self) -> AtmosphereResult<RawSample> {
        match self.read_sample() {
            Ok(sample) => Ok(sample),
            Err(err) if err.is_transient() => {
                tracing::warn!(
                    error = %err,
                    backoff_ms = RETRY_BACKOFF.as_millis() as u64,
                    "sensor read failed, retrying"
                );
                self.clock.sleep(RETRY_BACKOFF).await;

                let sample = self.read_sample().inspect_err(|err| {
                    tracing::error!(error = %err, "sensor read failed after retry");
                })?;
                self.summary.retries += 1;
                Ok(sample)
            }
            Err(err) => Err(err),
        }
    }

    fn read_sample(&mut self) -> AtmosphereResult<RawSample> {
        let primary = self.sensor.read_primary()?;
        if !(primary.pressure_hpa.is_finite() && primary.pressure_hpa > 0.0) {
            return Err(AtmosphereError::SensorRead(format!(
                "implausible pressure {} hPa",
                primary.pressure_hpa
            )));
        }
        let gas = self.sensor.read_gas_raw()?;
        Ok(RawSample::new(primary, gas))
    }

    /// Próximo prazo na grade; prazos já vencidos são pulados
    fn next_deadline(&mut self, current: Duration) -> Duration {
        let next = current + self.interval;
        let now = self.clock.now();
        if now <= next {
            return next;
        }

        let behind = now - next;
        let missed = u32::try_from(behind.as_nanos() / self.interval.as_nanos())
            .unwrap_or(u32::MAX)
            .saturating_add(1);
        self.summary.missed_ticks = self.summary.missed_ticks.saturating_add(u64::from(missed));
        tracing::warn!(missed, "tick overran its slot, skipping missed deadlines");

        match self
            .interval
            .checked_mul(missed)
            .and_then(|skip| next.checked_add(skip))
        {
            Some(deadline) if deadline > now => deadline,
            // Salto de relógio além da grade: recomeça a partir de agora
            _ => now.saturating_add(self.interval),
        }
    }
}
