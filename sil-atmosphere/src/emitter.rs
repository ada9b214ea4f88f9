//! Emissor de registros
//!
//! Uma linha por leitura no fluxo principal, com flush imediato. O eco de
//! depuração vai para um fluxo separado e nunca altera o principal.

use crate::error::AtmosphereResult;
use crate::types::{Reading, RecordFormat};
use std::io::{self, Stderr, Stdout, Write};

pub struct RecordEmitter<W: Write, D: Write> {
    primary: W,
    diagnostic: D,
    format: RecordFormat,
    debug_echo: bool,
    emitted: u64,
}

impl RecordEmitter<Stdout, Stderr> {
    /// Registros em stdout, eco em stderr
    pub fn stdio(format: RecordFormat, debug_echo: bool) -> Self {
        Self::new(io::stdout(), io::stderr(), format, debug_echo)
    }
}

impl<W: Write, D: Write> RecordEmitter<W, D> {
    pub fn new(primary: W, diagnostic: D, format: RecordFormat, debug_echo: bool) -> Self {
        Self {
            primary,
            diagnostic,
            format,
            debug_echo,
            emitted: 0,
        }
    }

    pub fn emit(&mut self, reading: &Reading) -> AtmosphereResult<()> {
        if self.debug_echo {
            // Falha no eco não interrompe o fluxo de registros
            if let Err(err) = self.write_echo(reading) {
                tracing::debug!(error = %err, "debug echo failed");
            }
        }

        match self.format {
            RecordFormat::Csv => writeln!(self.primary, "{}", reading.to_csv())?,
            RecordFormat::Json => {
                serde_json::to_writer(&mut self.primary, reading).map_err(io::Error::from)?;
                writeln!(self.primary)?;
            }
        }
        self.primary.flush()?;
        self.emitted += 1;

        Ok(())
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn format(&self) -> RecordFormat {
        self.format
    }

    fn write_echo(&mut self, reading: &Reading) -> io::Result<()> {
        writeln!(self.diagnostic, "Temperature: {:.1} C", reading.temperature_c)?;
        writeln!(self.diagnostic, "Humidity: {:.1} %", reading.relative_humidity_pct)?;
        writeln!(self.diagnostic, "Pressure: {:.1} hPa", reading.pressure_hpa)?;
        writeln!(self.diagnostic, "Altitude = {:.2} meters", reading.altitude_m)?;
        writeln!(self.diagnostic, "VOC Index: {}", reading.voc_index)?;
        self.diagnostic.flush()
    }

    pub fn into_inner(self) -> (W, D) {
        (self.primary, self.diagnostic)
    }
}
