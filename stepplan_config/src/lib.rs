#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and move-program parsing for the step planner.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Move programs are CSV files with strict headers, one linear move per row.
use serde::Deserialize;

/// Move program CSV schema.
///
/// Expected headers:
/// x,y,z,duration_us,mm
///
/// Example:
/// x,y,z,duration_us,mm
/// 1000,0,0,1000000,10.0
/// 0,-500,0,500000,5.0
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct MoveRow {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub duration_us: u32,
    pub mm: f64,
}

impl MoveRow {
    #[inline]
    pub fn steps(&self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Machine {
    /// Calibration per axis (X, Y, Z)
    pub steps_per_mm: [f64; 3],
    /// Rated constant linear acceleration
    pub acceleration_mm_s2: f64,
    /// Largest speed discontinuity tolerated at a junction
    pub max_jerk_mm_min: f64,
    /// How often the pulse generator adjusts its step rate
    pub acceleration_ticks_per_second: u32,
}

impl Default for Machine {
    fn default() -> Self {
        Self {
            steps_per_mm: [100.0, 100.0, 100.0],
            acceleration_mm_s2: 25.0,
            max_jerk_mm_min: 300.0,
            acceleration_ticks_per_second: 50,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PlannerCfg {
    /// Ring capacity in slots; one slot always stays free
    pub block_buffer_size: usize,
    /// Trapezoid shaping and look-ahead; false means instantaneous speed changes
    pub acceleration_management: bool,
}

impl Default for PlannerCfg {
    fn default() -> Self {
        Self {
            block_buffer_size: 16,
            acceleration_management: true,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct StepperCfg {
    /// Pace pulses against the wall clock instead of virtual time
    pub realtime: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub machine: Machine,
    #[serde(default)]
    pub planner: PlannerCfg,
    #[serde(default)]
    pub stepper: StepperCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Machine
        for (axis, spm) in ["x", "y", "z"].iter().zip(self.machine.steps_per_mm) {
            if !(spm.is_finite() && spm > 0.0) {
                eyre::bail!("machine.steps_per_mm.{axis} must be > 0");
            }
        }
        if !(self.machine.acceleration_mm_s2.is_finite() && self.machine.acceleration_mm_s2 > 0.0)
        {
            eyre::bail!("machine.acceleration_mm_s2 must be > 0");
        }
        if !self.machine.max_jerk_mm_min.is_finite() || self.machine.max_jerk_mm_min < 0.0 {
            eyre::bail!("machine.max_jerk_mm_min must be >= 0");
        }
        if self.machine.acceleration_ticks_per_second == 0 {
            eyre::bail!("machine.acceleration_ticks_per_second must be > 0");
        }
        if self.machine.acceleration_ticks_per_second > 100_000 {
            eyre::bail!("machine.acceleration_ticks_per_second is unreasonably large (>100k)");
        }

        // Planner
        if self.planner.block_buffer_size < 2 {
            eyre::bail!("planner.block_buffer_size must be >= 2");
        }
        if self.planner.block_buffer_size > 4096 {
            eyre::bail!("planner.block_buffer_size is unreasonably large (>4096)");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

fn check_headers(headers: &csv::StringRecord, origin: &str) -> eyre::Result<()> {
    let expected = ["x", "y", "z", "duration_us", "mm"];
    let actual: Vec<String> = headers.iter().map(|s| s.trim().to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "move CSV {origin} must have headers 'x,y,z,duration_us,mm', got: {}",
            actual.join(",")
        );
    }
    Ok(())
}

/// Parse a move program from any reader (strict headers, row-numbered errors).
pub fn read_moves_csv<R: std::io::Read>(reader: R) -> eyre::Result<Vec<MoveRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read move CSV headers: {}", e))?
        .clone();
    check_headers(&headers, "input")?;

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<MoveRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid move CSV row {}: {}", idx + 2, e);
            }
        }
    }
    Ok(rows)
}

pub fn load_moves_csv(path: &std::path::Path) -> eyre::Result<Vec<MoveRow>> {
    let file = std::fs::File::open(path)
        .map_err(|e| eyre::eyre!("open move CSV {:?}: {}", path, e))?;
    read_moves_csv(file).map_err(|e| eyre::eyre!("{:?}: {}", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = load_toml("").expect("parse");
        assert_eq!(cfg.planner.block_buffer_size, 16);
        assert!(cfg.planner.acceleration_management);
        assert_eq!(cfg.machine.steps_per_mm, [100.0; 3]);
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn rejects_unknown_rotation() {
        let cfg = load_toml("[logging]\nrotation = \"weekly\"\n").expect("parse");
        let err = cfg.validate().expect_err("weekly is not a policy");
        assert!(err.to_string().contains("logging.rotation"));
    }
}
