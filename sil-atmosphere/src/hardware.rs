//! Adaptador Raspberry Pi: BME280 + SGP40 no mesmo barramento I2C
//!
//! Cada sensor recebe seu próprio handle `I2c` do mesmo barramento. O BME280
//! é lido registrador a registrador (datasheet Bosch, seção 4.2.3,
//! compensação em ponto flutuante); o SGP40 fica com o driver `sgp40`, que
//! cuida do enquadramento dos comandos e do CRC Sensirion.

use crate::error::{AtmosphereError, AtmosphereResult};
use crate::port::SensorPort;
use crate::types::PrimaryReading;
use rppal::hal::Delay;
use rppal::i2c::I2c;
use sgp40::Sgp40;
use std::thread;
use std::time::Duration;

pub const BME280_ADDR: u16 = 0x77;
pub const SGP40_ADDR: u8 = 0x59;

const BME280_CHIP_ID: u8 = 0x60;
const REG_CHIP_ID: u8 = 0xD0;
const REG_RESET: u8 = 0xE0;
const REG_CTRL_HUM: u8 = 0xF2;
const REG_STATUS: u8 = 0xF3;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_CONFIG: u8 = 0xF5;
const REG_CALIB_00: u8 = 0x88;
const REG_CALIB_H1: u8 = 0xA1;
const REG_CALIB_26: u8 = 0xE1;
const REG_ADC_VALUE: u8 = 0xF7;

const SOFT_RESET: u8 = 0xB6;
const STATUS_IM_UPDATE: u8 = 0x01;


fn bus_error(context: &str, err: rppal::i2c::Error) -> AtmosphereError {
    AtmosphereError::SensorRead(format!("{context}: {err}"))
}

// ═══════════════════════════════════════════════════════════════════════════════
// BME280
// ═══════════════════════════════════════════════════════════════════════════════

/// Coeficientes de calibração gravados de fábrica
#[derive(Debug, Clone, Copy, Default)]
struct Bme280Calibration {
    t1: u16,
    t2: i16,
    t3: i16,
    p1: u16,
    p2: i16,
    p3: i16,
    p4: i16,
    p5: i16,
    p6: i16,
    p7: i16,
    p8: i16,
    p9: i16,
    h1: u8,
    h2: i16,
    h3: u8,
    h4: i16,
    h5: i16,
    h6: i8,
}

impl Bme280Calibration {
    fn parse(block0: &[u8; 24], h1: u8, block1: &[u8; 7]) -> Self {
        let (block0, block1): (&[u8], &[u8]) = (block0, block1);
        let u16le = |b: &[u8], i: usize| u16::from_le_bytes([b[i], b[i + 1]]);
        let i16le = |b: &[u8], i: usize| i16::from_le_bytes([b[i], b[i + 1]]);

        Self {
            t1: u16le(block0, 0),
            t2: i16le(block0, 2),
            t3: i16le(block0, 4),
            p1: u16le(block0, 6),
            p2: i16le(block0, 8),
            p3: i16le(block0, 10),
            p4: i16le(block0, 12),
            p5: i16le(block0, 14),
            p6: i16le(block0, 16),
            p7: i16le(block0, 18),
            p8: i16le(block0, 20),
            p9: i16le(block0, 22),
            h1,
            h2: i16le(block1, 0),
            h3: block1[2],
            // h4/h5 são 12 bits com sinal compartilhando o nibble de 0xE5
            h4: (i16::from(block1[3] as i8) << 4) | i16::from(block1[4] & 0x0F),
            h5: (i16::from(block1[5] as i8) << 4) | i16::from(block1[4] >> 4),
            h6: block1[6] as i8,
        }
    }

    /// Retorna (°C, t_fine)
    fn temperature(&self, adc_t: u32) -> (f64, f64) {
        let adc_t = f64::from(adc_t);
        let t1 = f64::from(self.t1);
        let v1 = (adc_t / 16384.0 - t1 / 1024.0) * f64::from(self.t2);
        let v2 = (adc_t / 131072.0 - t1 / 8192.0).powi(2) * f64::from(self.t3);
        let t_fine = v1 + v2;
        (t_fine / 5120.0, t_fine)
    }

    /// Pressão em hPa
    fn pressure(&self, adc_p: u32, t_fine: f64) -> Option<f64> {
        let mut v1 = t_fine / 2.0 - 64000.0;
        let mut v2 = v1 * v1 * f64::from(self.p6) / 32768.0;
        v2 += v1 * f64::from(self.p5) * 2.0;
        v2 = v2 / 4.0 + f64::from(self.p4) * 65536.0;
        v1 = (f64::from(self.p3) * v1 * v1 / 524288.0 + f64::from(self.p2) * v1) / 524288.0;
        v1 = (1.0 + v1 / 32768.0) * f64::from(self.p1);
        if v1 == 0.0 {
            return None;
        }
        let mut p = 1048576.0 - f64::from(adc_p);
        p = (p - v2 / 4096.0) * 6250.0 / v1;
        v1 = f64::from(self.p9) * p * p / 2147483648.0;
        v2 = p * f64::from(self.p8) / 32768.0;
        p += (v1 + v2 + f64::from(self.p7)) / 16.0;
        Some(p / 100.0)
    }

    /// Umidade relativa em %, saturada em [0, 100]
    fn humidity(&self, adc_h: u32, t_fine: f64) -> f64 {
        let h = t_fine - 76800.0;
        let h = (f64::from(adc_h) - (f64::from(self.h4) * 64.0 + f64::from(self.h5) / 16384.0 * h))
            * (f64::from(self.h2) / 65536.0
                * (1.0
                    + f64::from(self.h6) / 67108864.0
                        * h
                        * (1.0 + f64::from(self.h3) / 67108864.0 * h)));
        let h = h * (1.0 - f64::from(self.h1) * h / 524288.0);
        h.clamp(0.0, 100.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADAPTADOR
// ═══════════════════════════════════════════════════════════════════════════════

/// BME280 + SGP40 via I2C do Raspberry Pi
pub struct RpiAtmosphericSensor {
    i2c: I2c,
    bme280_addr: u16,
    sgp40: Sgp40<I2c, Delay>,
    calibration: Bme280Calibration,
    // O SGP40 usa a última leitura primária como compensação on-chip
    last_primary: Option<PrimaryReading>,
}

impl RpiAtmosphericSensor {
    /// Abre o barramento `/dev/i2c-<bus>` com os endereços padrão
    pub fn open(bus: u8) -> AtmosphereResult<Self> {
        let open = || {
            I2c::with_bus(bus)
                .map_err(|e| AtmosphereError::SensorInit(format!("cannot open I2C bus {bus}: {e}")))
        };
        Self::new(open()?, BME280_ADDR, open()?, SGP40_ADDR)
    }

    /// Inicializa o BME280 (reset, calibração, modo normal)
    pub fn new(bme280_i2c: I2c, bme280_addr: u16, sgp40_i2c: I2c, sgp40_addr: u8) -> AtmosphereResult<Self> {
        let mut sensor = Self {
            i2c: bme280_i2c,
            bme280_addr,
            sgp40: Sgp40::new(sgp40_i2c, sgp40_addr, Delay::new()),
            calibration: Bme280Calibration::default(),
            last_primary: None,
        };
        sensor
            .init_bme280()
            .map_err(|e| AtmosphereError::SensorInit(e.to_string()))?;
        tracing::info!(bme280 = bme280_addr, sgp40 = sgp40_addr, "atmospheric sensors initialized");
        Ok(sensor)
    }

    fn select(&mut self, addr: u16) -> AtmosphereResult<()> {
        self.i2c
            .set_slave_address(addr)
            .map_err(|e| bus_error("set slave address", e))
    }

    fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> AtmosphereResult<()> {
        self.i2c
            .write_read(&[reg], buf)
            .map_err(|e| bus_error("register read", e))
    }

    fn write_register(&mut self, reg: u8, value: u8) -> AtmosphereResult<()> {
        self.i2c
            .smbus_write_byte(reg, value)
            .map_err(|e| bus_error("register write", e))
    }

    fn init_bme280(&mut self) -> AtmosphereResult<()> {
        self.select(self.bme280_addr)?;

        let mut id = [0u8; 1];
        self.read_registers(REG_CHIP_ID, &mut id)?;
        if id[0] != BME280_CHIP_ID {
            return Err(AtmosphereError::SensorInit(format!(
                "unexpected BME280 chip id 0x{:02X}",
                id[0]
            )));
        }

        self.write_register(REG_RESET, SOFT_RESET)?;
        thread::sleep(Duration::from_millis(10));

        let mut status = [STATUS_IM_UPDATE];
        while status[0] & STATUS_IM_UPDATE != 0 {
            thread::sleep(Duration::from_millis(2));
            self.read_registers(REG_STATUS, &mut status)?;
        }

        let mut block0 = [0u8; 24];
        let mut h1 = [0u8; 1];
        let mut block1 = [0u8; 7];
        self.read_registers(REG_CALIB_00, &mut block0)?;
        self.read_registers(REG_CALIB_H1, &mut h1)?;
        self.read_registers(REG_CALIB_26, &mut block1)?;
        self.calibration = Bme280Calibration::parse(&block0, h1[0], &block1);

        // Oversampling x1 em tudo, modo normal, standby 125 ms, filtro desligado.
        // ctrl_hum só vale após escrita em ctrl_meas.
        self.write_register(REG_CTRL_HUM, 0b001)?;
        self.write_register(REG_CONFIG, 0b010 << 5)?;
        self.write_register(REG_CTRL_MEAS, (0b001 << 5) | (0b001 << 2) | 0b11)?;
        Ok(())
    }

    fn measure_sgp40(&mut self, relative_humidity_pct: f32, temperature_c: f32) -> AtmosphereResult<u16> {
        let (rh, t) = sgp40_compensation(relative_humidity_pct, temperature_c);
        self.sgp40
            .measure_raw_with_rht(rh, t)
            .map_err(|e| AtmosphereError::SensorRead(format!("SGP40 measurement: {e:?}")))
    }
}

impl SensorPort for RpiAtmosphericSensor {
    fn name(&self) -> &str {
        "RpiAtmosphericSensor"
    }

    fn read_primary(&mut self) -> AtmosphereResult<PrimaryReading> {
        let mut data = [0u8; 8];
        self.read_registers(REG_ADC_VALUE, &mut data)?;
        let adc_p = (u32::from(data[0]) << 12) | (u32::from(data[1]) << 4) | (u32::from(data[2]) >> 4);
        let adc_t = (u32::from(data[3]) << 12) | (u32::from(data[4]) << 4) | (u32::from(data[5]) >> 4);
        let adc_h = (u32::from(data[6]) << 8) | u32::from(data[7]);

        let (temperature_c, t_fine) = self.calibration.temperature(adc_t);
        let pressure_hpa = self
            .calibration
            .pressure(adc_p, t_fine)
            .ok_or_else(|| AtmosphereError::SensorRead("BME280 pressure compensation failed".into()))?;
        let relative_humidity_pct = self.calibration.humidity(adc_h, t_fine);

        let reading = PrimaryReading {
            temperature_c: temperature_c as f32,
            relative_humidity_pct: relative_humidity_pct as f32,
            pressure_hpa: pressure_hpa as f32,
        };
        self.last_primary = Some(reading);
        Ok(reading)
    }

    fn read_gas_raw(&mut self) -> AtmosphereResult<u16> {
        // Sem leitura primária: valores padrão do comando (50 %UR, 25 °C)
        let (rh, t) = self
            .last_primary
            .map(|p| (p.relative_humidity_pct, p.temperature_c))
            .unwrap_or((50.0, 25.0));
        self.measure_sgp40(rh, t)
    }
}

/// Compensação do SGP40 nas unidades do driver: %UR e °C inteiros,
/// saturados na faixa de operação do sensor
fn sgp40_compensation(relative_humidity_pct: f32, temperature_c: f32) -> (u16, i16) {
    let rh = if relative_humidity_pct.is_nan() { 50.0 } else { relative_humidity_pct };
    let t = if temperature_c.is_nan() { 25.0 } else { temperature_c };
    (rh.clamp(0.0, 100.0).round() as u16, t.clamp(-45.0, 130.0).round() as i16)
}
