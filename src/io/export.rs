//! CSV export of trajectories, spills and converter HMRs.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::balance::PigIronBalance;
use crate::sim::engine::Simulation;
use crate::sim::event::SpillOrigin;
use crate::sim::types::TIME_FORMAT;

const TRAJECTORY_HEADER: [&str; 3] = ["time", "value_t", "kind"];
const SPILL_HEADER: [&str; 2] = ["time", "origin"];
const CONVERTER_HEADER: [&str; 5] = ["index", "time", "line_id", "hmr", "post_event_value_t"];

/// Exports the trajectory of `simulation` to a CSV file at `path`.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_trajectory_csv(simulation: &Simulation, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_trajectory_csv(simulation, io::BufWriter::new(file))
}

/// Writes one row per trajectory sample. Identical passes give identical bytes.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_trajectory_csv(simulation: &Simulation, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(TRAJECTORY_HEADER)?;

    for s in simulation.trajectory() {
        wtr.write_record(&[
            s.time.format(TIME_FORMAT).to_string(),
            format!("{:.6}", s.value),
            s.kind.as_str().to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes one row per spill, scheduled and automatic.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_spills_csv(simulation: &Simulation, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(SPILL_HEADER)?;

    for s in simulation.spills() {
        let origin = match s.origin {
            SpillOrigin::Scheduled => "scheduled",
            SpillOrigin::Auto => "auto",
        };
        wtr.write_record([s.time.format(TIME_FORMAT).to_string(), origin.to_string()])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes one row per converter with its current HMR and, when the balance
/// has been simulated, its post-event value.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_converters_csv(balance: &PigIronBalance, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(CONVERTER_HEADER)?;

    let simulation = balance.simulation();
    for c in balance.converters() {
        let post_event = simulation
            .and_then(|s| s.post_event_value(c.index))
            .map(|v| format!("{v:.6}"))
            .unwrap_or_default();
        wtr.write_record(&[
            c.index.to_string(),
            c.time.format(TIME_FORMAT).to_string(),
            c.line_id.clone(),
            format!("{:.6}", c.hmr),
            post_event,
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::balance::BalanceInputs;
    use crate::sim::event::ConverterEvent;
    use crate::sim::types::BalanceState;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn at(minutes: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 6, 2)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|t| t + Duration::minutes(minutes))
            .unwrap_or_default()
    }

    fn simulated() -> PigIronBalance {
        let inputs = BalanceInputs::new(
            BalanceState::initial(at(0), 1900.0),
            600.0,
            2000.0,
            vec![ConverterEvent::new(at(90), 0.9, "cv_1")],
        );
        let Ok(mut balance) = PigIronBalance::new(inputs) else {
            panic!("valid inputs");
        };
        assert!(balance.simulate().is_ok());
        balance
    }

    fn to_string(write: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        write(&mut buf).ok();
        String::from_utf8(buf).unwrap_or_default()
    }

    #[test]
    fn trajectory_has_header_and_one_row_per_sample() {
        let balance = simulated();
        let Some(sim) = balance.simulation() else {
            panic!("simulated");
        };
        let out = to_string(|buf| write_trajectory_csv(sim, buf));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.first().copied(), Some("time,value_t,kind"));
        assert_eq!(lines.len(), sim.trajectory().len() + 1);
        assert!(lines[1].ends_with(",initial"));
        assert!(lines.last().is_some_and(|l| l.ends_with(",horizon")));
    }

    #[test]
    fn spills_are_labelled_auto() {
        let balance = simulated();
        let Some(sim) = balance.simulation() else {
            panic!("simulated");
        };
        let out = to_string(|buf| write_spills_csv(sim, buf));
        let rows: Vec<&str> = out.lines().skip(1).collect();
        assert_eq!(rows.len(), sim.spills().len());
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|r| r.ends_with(",auto")));
    }

    #[test]
    fn converter_rows_carry_post_event_values() {
        let balance = simulated();
        let out = to_string(|buf| write_converters_csv(&balance, buf));
        let mut rdr = csv::ReaderBuilder::new().from_reader(out.as_bytes());
        let records: Vec<csv::StringRecord> = rdr.records().filter_map(Result::ok).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get(2), Some("cv_1"));
        assert!(records[0].get(4).is_some_and(|v| v.parse::<f64>().is_ok()));
    }

    #[test]
    fn deterministic_output() {
        let a = simulated();
        let b = simulated();
        let (Some(sa), Some(sb)) = (a.simulation(), b.simulation()) else {
            panic!("simulated");
        };
        let out_a = to_string(|buf| write_trajectory_csv(sa, buf));
        let out_b = to_string(|buf| write_trajectory_csv(sb, buf));
        assert_eq!(out_a, out_b);
    }
}
