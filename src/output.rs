//! This module is in charge of outputting the final selection results to the
//! log and to the cutflow file

use crate::{
    cutflow::{CutflowHistograms, LabelledHistogram},
    scheduling::RunReport,
};

use eyre::{Result, WrapErr};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::info;

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    time::Duration,
};

// Number of significant digits in file output
//
// One less than the precision of the histogram bins, so that the last printed
// digit is always meaningful.
//
const SIG_DIGITS: usize = (f64::DIGITS - 1) as usize;

/// Output the selection results to the log and to disk
pub fn dump_results(
    path: impl AsRef<Path>,
    histograms: &CutflowHistograms,
    report: &RunReport,
    elapsed_time: Duration,
) -> Result<()> {
    let path = path.as_ref();

    // Print out a summary of the run
    let cutflow = &report.cutflow;
    info!(
        events = report.events_processed,
        kept = report.events_kept,
        objects_seen = cutflow.objects_seen(),
        objects_passed = cutflow.objects_passed(),
        weighted_events_passed = cutflow.weighted_events_passed(),
        "Selection done in {:.3}s",
        elapsed_time.as_secs_f64()
    );

    // Compute a timestamp of when the run ended
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .wrap_err("Failed to format the timestamp")?;

    // Write the cutflow file
    let file = File::create(path)
        .wrap_err_with(|| format!("Could not create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_cutflow(&mut writer, &timestamp, histograms, report, elapsed_time)
        .and_then(|()| writer.flush())
        .wrap_err_with(|| format!("Could not write {}", path.display()))?;
    info!(file = %path.display(), "Wrote cutflow histograms");
    Ok(())
}

/// Write down the cutflow histograms and run statistics
fn write_cutflow(
    writer: &mut impl Write,
    timestamp: &str,
    histograms: &CutflowHistograms,
    report: &RunReport,
    elapsed_time: Duration,
) -> io::Result<()> {
    writeln!(writer, "{timestamp}")?;
    for histogram in [&histograms.raw, &histograms.weighted] {
        write_histogram(writer, histogram)?;
    }

    writeln!(writer, "---------------------------------------------")?;
    writeln_kv(writer, "Events processed", report.events_processed)?;
    writeln_kv(writer, "Events kept", report.events_kept)?;
    let elapsed_secs = elapsed_time.as_secs_f64();
    writeln_kv(writer, "Elapsed time (s)", elapsed_secs)?;
    if report.events_processed > 0 {
        let secs_per_ev = elapsed_secs / (report.events_processed as f64);
        writeln_kv(writer, "Elapsed time per event (s)", secs_per_ev)?;
    }
    Ok(())
}

/// Write down the bins of a labelled histogram
fn write_histogram(writer: &mut impl Write, histogram: &LabelledHistogram) -> io::Result<()> {
    writeln!(writer, "---------------------------------------------")?;
    writeln!(writer, "{}", histogram.name())?;
    for (label, content) in histogram.bins() {
        writeln_kv(writer, label, content)?;
    }
    Ok(())
}

/// Key-value output that uses fixed-size columns for better readability
fn writeln_kv(writer: &mut impl Write, key: &str, value: impl WriteValue) -> io::Result<()> {
    write!(writer, " {key:<31}: ")?;
    value.write(writer)?;
    writeln!(writer)
}

/// Values which can be printed in the cutflow file
trait WriteValue {
    /// Write down `self` to the output
    fn write(self, writer: &mut impl Write) -> io::Result<()>;
}

impl WriteValue for u64 {
    fn write(self, writer: &mut impl Write) -> io::Result<()> {
        write!(writer, "{self}")
    }
}

impl WriteValue for f64 {
    // Similar to the %g format of printf
    fn write(self, writer: &mut impl Write) -> io::Result<()> {
        write_engineering(writer, self, SIG_DIGITS)
    }
}

/// Write a floating-point number using "engineering" notation
///
/// Analogous to the %g format of the C printf function, this method switches
/// between naive and scientific notation for floating-point numbers when the
/// number being printed becomes so small that printing leading zeroes could end
/// up larger than the scientific notation, or so large that we would be forced
/// to print more significant digits than requested.
///
fn write_engineering(writer: &mut impl Write, x: f64, sig_digits: usize) -> io::Result<()> {
    let mut precision = sig_digits - 1;
    if x == 0. {
        // Zero is special because you can't take its log
        write!(writer, "0")
    } else {
        // Numbers with more integer digits than requested go scientific
        let log_x = x.abs().log10();
        if (-3. ..(sig_digits as f64)).contains(&log_x) {
            // Rust's precision controls the number of digits after the decimal
            // point, so it must be adjusted to the order of magnitude
            precision = (precision as isize - log_x.trunc() as isize) as usize;

            // The leading zero of numbers smaller than 1 is not significant
            if log_x < 0. {
                precision += 1
            }

            // Trailing zeros and decimal point are not expected here
            let str_with_zeros = format!("{x:.precision$}");
            if str_with_zeros.contains('.') {
                write!(
                    writer,
                    "{}",
                    str_with_zeros.trim_end_matches('0').trim_end_matches('.')
                )
            } else {
                write!(writer, "{str_with_zeros}")
            }
        } else {
            write!(writer, "{x:.precision$e}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cutflow::Cutflow;

    fn engineering(x: f64) -> String {
        let mut out = Vec::new();
        write_engineering(&mut out, x, 6).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn engineering_notation() {
        assert_eq!(engineering(0.), "0");
        assert_eq!(engineering(42.), "42");
        assert_eq!(engineering(1234.5), "1234.5");
        assert_eq!(engineering(0.25), "0.25");
        assert_eq!(engineering(-3.5), "-3.5");
        assert_eq!(engineering(1.5e-7), "1.50000e-7");
        assert_eq!(engineering(2.5e12), "2.50000e12");
        assert_eq!(engineering(999999.), "999999");
    }

    #[test]
    fn engineering_notation_at_precision_limit() {
        assert_eq!(engineering(1e6), "1.00000e6");
        assert_eq!(engineering(-1e6), "-1.00000e6");

        for sig_digits in [5, SIG_DIGITS] {
            let mut out = Vec::new();
            let x = 10f64.powi(sig_digits as i32);
            write_engineering(&mut out, x, sig_digits).unwrap();
            let expected = format!("1.{}e{sig_digits}", "0".repeat(sig_digits - 1));
            assert_eq!(String::from_utf8(out).unwrap(), expected);
        }
    }

    #[test]
    fn large_event_counts() {
        let mut histograms = CutflowHistograms::new();
        histograms.set("all", 1e5, 1e14);
        histograms.set("ElectronSelector", 16_777_217., 0.5);
        let mut out = Vec::new();
        let report = RunReport::default();
        write_cutflow(&mut out, "now", &histograms, &report, Duration::ZERO).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(&format!(" {:<31}: 100000\n", "all")));
        assert!(text.contains(&format!(" {:<31}: 16777217\n", "ElectronSelector")));
        assert!(text.contains(&format!(" {:<31}: 1.0000000000000e14\n", "all")));
    }

    #[test]
    fn cutflow_file_layout() {
        let mut histograms = CutflowHistograms::new();
        histograms.set("all", 3., 2.5);
        let mut cutflow = Cutflow::new();
        cutflow.record(2, 1, true, 1.5);
        cutflow.record(1, 0, false, 1.);
        cutflow.clone().flush("ElectronSelector", &mut histograms);
        let report = RunReport {
            cutflow,
            events_processed: 2,
            events_kept: 1,
        };

        let mut out = Vec::new();
        let elapsed = Duration::from_secs(4);
        write_cutflow(&mut out, "2026-10-19T12:00:00Z", &histograms, &report, elapsed).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "2026-10-19T12:00:00Z");
        assert_eq!(lines[2], "cutflow");
        assert_eq!(lines[3], format!(" {:<31}: 3", "all"));
        assert_eq!(lines[4], format!(" {:<31}: 1", "ElectronSelector"));
        assert_eq!(lines[6], "cutflow_weighted");
        assert_eq!(lines[7], format!(" {:<31}: 2.5", "all"));
        assert_eq!(lines[8], format!(" {:<31}: 1.5", "ElectronSelector"));
        assert_eq!(lines[10], format!(" {:<31}: 2", "Events processed"));
        assert_eq!(lines[11], format!(" {:<31}: 1", "Events kept"));
        assert_eq!(lines[12], format!(" {:<31}: 4", "Elapsed time (s)"));
        assert_eq!(lines[13], format!(" {:<31}: 2", "Elapsed time per event (s)"));
    }

    #[test]
    fn write_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cutflow.txt");
        let histograms = CutflowHistograms::new();
        let report = RunReport::default();
        dump_results(&path, &histograms, &report, Duration::ZERO).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("cutflow_weighted"));
        // No per-event timing without events
        assert!(!text.contains("per event"));

        let unreachable = dir.path().join("missing").join("cutflow.txt");
        assert!(dump_results(unreachable, &histograms, &report, Duration::ZERO).is_err());
    }
}
