//! Testes integrados do módulo sil-atmosphere

use crate::*;
use std::future::pending;
use std::time::Duration;

const T0: u64 = 1_700_000_000;

fn primary(temperature_c: f32, relative_humidity_pct: f32, pressure_hpa: f32) -> PrimaryReading {
    PrimaryReading {
        temperature_c,
        relative_humidity_pct,
        pressure_hpa,
    }
}

fn capture_emitter() -> RecordEmitter<Vec<u8>, Vec<u8>> {
    RecordEmitter::new(Vec::new(), Vec::new(), RecordFormat::Csv, false)
}

fn output_lines<S: SensorPort, C: Clock>(sampler: SamplingLoop<S, C, Vec<u8>, Vec<u8>>) -> Vec<String> {
    let (_, _, emitter) = sampler.into_parts();
    let (out, _) = emitter.into_inner();
    String::from_utf8(out)
        .unwrap()
        .lines()
        .map(str::to_owned)
        .collect()
}

/// Sensor que consome tempo do relógio manual a cada leitura
struct SlowSensor {
    inner: ScriptedSensor,
    clock: ManualClock,
    latencies: Vec<Duration>,
    reads: usize,
}

impl SensorPort for SlowSensor {
    fn name(&self) -> &str {
        "SlowSensor"
    }

    fn read_primary(&mut self) -> AtmosphereResult<PrimaryReading> {
        let latency = self.latencies[self.reads % self.latencies.len()];
        self.reads += 1;
        self.clock.advance(latency);
        self.inner.read_primary()
    }

    fn read_gas_raw(&mut self) -> AtmosphereResult<u16> {
        self.clock.advance(Duration::from_millis(30));
        self.inner.read_gas_raw()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PIPELINE COMPLETO
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_end_to_end_first_record() {
    let sensor = ScriptedSensor::constant(primary(22.5, 45.3, 1013.2), 30000);
    let config = AgentConfig {
        sea_level_pressure_hpa: 1013.25,
        max_records: Some(1),
        ..Default::default()
    };

    let mut sampler =
        SamplingLoop::new(&config, sensor, ManualClock::starting_at_secs(T0), capture_emitter()).unwrap();
    sampler.run(pending()).await.unwrap();

    let lines = output_lines(sampler);
    assert_eq!(lines.len(), 1);

    let fields: Vec<&str> = lines[0].split(',').collect();
    assert_eq!(fields.len(), 6);
    assert_eq!(fields[0], "1700000000");
    assert_eq!(fields[1], "22.5");
    assert_eq!(fields[2], "45.3");
    assert_eq!(fields[3], "1013.2");

    let altitude: f32 = fields[4].parse().unwrap();
    assert!((altitude - 0.42).abs() < 0.01, "altitude {altitude}");

    let voc_index: u16 = fields[5].parse().unwrap();
    assert!(voc_index <= 500);
    assert_eq!(voc_index, 100, "cold start maps to clean air");
}

#[tokio::test]
async fn test_cadence_is_drift_free_under_processing_delay() {
    let clock = ManualClock::starting_at_secs(T0);
    let sensor = SlowSensor {
        inner: ScriptedSensor::constant(primary(21.0, 40.0, 1005.0), 30000),
        clock: clock.clone(),
        latencies: vec![
            Duration::from_millis(40),
            Duration::from_millis(870),
            Duration::from_millis(5),
            Duration::from_millis(610),
        ],
        reads: 0,
    };

    let interval = 5;
    let ticks = 20;
    let config = AgentConfig {
        poll_interval_secs: interval,
        max_records: Some(ticks),
        ..Default::default()
    };

    let mut sampler = SamplingLoop::new(&config, sensor, clock.clone(), capture_emitter()).unwrap();
    let summary = sampler.run(pending()).await.unwrap();
    assert_eq!(summary.records_emitted, ticks);
    assert_eq!(summary.missed_ticks, 0);

    let timestamps: Vec<i64> = output_lines(sampler)
        .iter()
        .map(|line| line.split(',').next().unwrap().parse().unwrap())
        .collect();

    assert_eq!(timestamps.len(), ticks as usize);
    for (i, ts) in timestamps.iter().enumerate() {
        assert_eq!(*ts, T0 as i64 + i as i64 * interval as i64);
    }
}

#[tokio::test]
async fn test_overrun_skips_missed_deadlines() {
    let clock = ManualClock::starting_at_secs(T0);
    let sensor = SlowSensor {
        inner: ScriptedSensor::constant(primary(21.0, 40.0, 1005.0), 30000),
        clock: clock.clone(),
        latencies: vec![Duration::from_millis(100), Duration::from_millis(2_500), Duration::from_millis(100)],
        reads: 0,
    };

    let config = AgentConfig {
        max_records: Some(3),
        ..Default::default()
    };
    let mut sampler = SamplingLoop::new(&config, sensor, clock.clone(), capture_emitter()).unwrap();
    let summary = sampler.run(pending()).await.unwrap();

    // Segundo tick (T0+1) termina em T0+3.53: prazos T0+2 e T0+3 são pulados
    assert_eq!(summary.missed_ticks, 2);

    let timestamps: Vec<i64> = output_lines(sampler)
        .iter()
        .map(|line| line.split(',').next().unwrap().parse().unwrap())
        .collect();
    assert_eq!(timestamps, vec![T0 as i64, T0 as i64 + 1, T0 as i64 + 4]);
}

#[tokio::test]
async fn test_slow_read_within_slot_stays_on_grid() {
    let clock = ManualClock::starting_at_secs(T0);
    let sensor = SlowSensor {
        inner: ScriptedSensor::constant(primary(21.0, 40.0, 1005.0), 30000),
        clock: clock.clone(),
        latencies: vec![Duration::from_millis(100), Duration::from_millis(1_500)],
        reads: 0,
    };

    let config = AgentConfig {
        poll_interval_secs: 5,
        max_records: Some(4),
        ..Default::default()
    };
    let mut sampler = SamplingLoop::new(&config, sensor, clock.clone(), capture_emitter()).unwrap();
    let summary = sampler.run(pending()).await.unwrap();
    assert_eq!(summary.missed_ticks, 0);

    let timestamps: Vec<i64> = output_lines(sampler)
        .iter()
        .map(|line| line.split(',').next().unwrap().parse().unwrap())
        .collect();
    let start = T0 as i64;
    assert_eq!(timestamps, vec![start, start + 5, start + 10, start + 15]);
}

#[tokio::test]
async fn test_persistent_failure_terminates_without_record() {
    let mut sensor = ScriptedSensor::new();
    sensor
        .push_sample(primary(22.0, 50.0, 1010.0), 30000)
        .push_fault("i2c timeout")
        .push_fault("i2c timeout");

    let mut sampler = SamplingLoop::new(
        &AgentConfig::default(),
        sensor,
        ManualClock::starting_at_secs(T0),
        capture_emitter(),
    )
    .unwrap();

    let result = sampler.run(pending()).await;
    assert!(matches!(result, Err(AtmosphereError::SensorRead(_))));

    // Apenas o primeiro tick gerou registro e entrou no baseline
    assert_eq!(sampler.compensator().sample_count(), 1);
    assert_eq!(sampler.sensor().primary_reads(), 3);
    let lines = output_lines(sampler);
    assert_eq!(lines.len(), 1);
}

#[tokio::test]
async fn test_failure_on_first_tick_emits_nothing() {
    let mut sensor = ScriptedSensor::new();
    sensor.push_fault("nack").push_fault("nack");

    let mut sampler = SamplingLoop::new(
        &AgentConfig::default(),
        sensor,
        ManualClock::starting_at_secs(T0),
        capture_emitter(),
    )
    .unwrap();

    assert!(sampler.run(pending()).await.is_err());
    assert_eq!(sampler.compensator().sample_count(), 0);
    assert!(output_lines(sampler).is_empty());
}

#[tokio::test]
async fn test_simulated_sensor_stream_stays_in_range() {
    let config = AgentConfig {
        max_records: Some(600),
        ..Default::default()
    };
    let mut sampler = SamplingLoop::new(
        &config,
        SimulatedSensor::new().with_spike_period(120),
        ManualClock::starting_at_secs(T0),
        capture_emitter(),
    )
    .unwrap();
    sampler.run(pending()).await.unwrap();

    let lines = output_lines(sampler);
    assert_eq!(lines.len(), 600);
    for line in lines {
        let voc: u16 = line.rsplit(',').next().unwrap().parse().unwrap();
        assert!(voc <= 500);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPRIEDADES DO COMPENSADOR
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_constant_input_converges_within_50_calls() {
    let mut voc = VocCompensator::new();
    let outputs: Vec<u16> = (0..50).map(|_| voc.measure_index(30000, 25.0, 50.0)).collect();

    let last = outputs[49];
    let previous = outputs[48];
    assert!(last.abs_diff(previous) <= 1);
    assert!(last.abs_diff(100) <= 1);
}

#[test]
fn test_warmup_from_drifting_start_converges() {
    // Sensor aquecendo: sinal cai até estabilizar em 30000
    let mut voc = VocCompensator::new();
    for i in 0..20u16 {
        voc.measure_index(36000 - i * 300, 25.0, 50.0);
    }

    let outputs: Vec<u16> = (0..5000).map(|_| voc.measure_index(30000, 25.0, 50.0)).collect();

    let diffs: Vec<u16> = outputs.windows(2).map(|w| w[0].abs_diff(w[1])).collect();
    let early: u16 = diffs[..100].iter().copied().max().unwrap();
    let late: u16 = diffs[diffs.len() - 100..].iter().copied().max().unwrap();
    assert!(late <= early);
    assert!(late <= 1);
    assert!(outputs.last().unwrap().abs_diff(100) <= 1);
}

#[test]
fn test_step_change_decays_back_to_baseline() {
    let mut voc = VocCompensator::new();
    for _ in 0..200 {
        voc.measure_index(30000, 25.0, 50.0);
    }

    let spike = voc.measure_index(33000, 25.0, 50.0);
    assert!(spike > 150, "got {spike}");

    let mut last = spike;
    for _ in 0..6000 {
        let index = voc.measure_index(33000, 25.0, 50.0);
        assert!(index <= last, "index must settle monotonically");
        last = index;
    }
    assert!(last.abs_diff(100) <= 1);
}

#[test]
fn test_index_monotonic_in_raw_signal() {
    let mut voc = VocCompensator::new();
    for _ in 0..500 {
        voc.measure_index(30000, 24.0, 48.0);
    }

    let mut previous = 0;
    for raw in (0..=u16::MAX).step_by(257) {
        let mut trial = voc.clone();
        let index = trial.measure_index(raw, 24.0, 48.0);
        assert!(index >= previous, "index decreased at raw {raw}");
        assert!(index <= 500);
        previous = index;
    }
}

#[test]
fn test_identical_history_is_deterministic() {
    let history: Vec<(u16, f32, f32)> = (0..400u32)
        .map(|i| {
            let raw = 28000 + ((i * 7919) % 5000) as u16;
            let t = 18.0 + (i % 13) as f32 * 0.7;
            let rh = 35.0 + (i % 29) as f32;
            (raw, t, rh)
        })
        .collect();

    let run = |history: &[(u16, f32, f32)]| -> Vec<u16> {
        let mut voc = VocCompensator::new();
        history.iter().map(|&(raw, t, rh)| voc.measure_index(raw, t, rh)).collect()
    };

    assert_eq!(run(&history), run(&history));
}

#[test]
fn test_order_matters() {
    // τ curto: o filtro sai do regime de média acumulada após 10 amostras
    let config = VocConfig {
        sampling_interval_secs: 1.0,
        baseline_time_constant_secs: 10.0,
    };
    let mut forward = VocCompensator::with_config(config).unwrap();
    let mut reverse = VocCompensator::with_config(config).unwrap();
    let raws: Vec<u16> = (0..100).map(|i| 28000 + i * 40).collect();

    for &raw in &raws {
        forward.measure_index(raw, 25.0, 50.0);
    }
    for &raw in raws.iter().rev() {
        reverse.measure_index(raw, 25.0, 50.0);
    }

    // O baseline pesa as amostras recentes
    assert!(forward.state().baseline_estimate > reverse.state().baseline_estimate);
}

#[test]
fn test_humidity_swing_is_compensated() {
    let mut voc = VocCompensator::new();
    for _ in 0..300 {
        voc.measure_index(30000, 25.0, 50.0);
    }

    // Sinal bruto sobe só por causa da umidade: índice fica próximo do ar limpo
    let humid_raw = (30000.0 * (1.0 + 0.003 * 20.0)) as u16;
    let index = voc.measure_index(humid_raw, 25.0, 70.0);
    assert!(index.abs_diff(100) <= 2, "got {index}");
}
