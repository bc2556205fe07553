//! Reading of the events to be selected
//!
//! Events are stored as JSON lines, one event store per line. Blank lines are
//! ignored.

use crate::event::EventStore;

use eyre::{Result, WrapErr};
use tracing::info;

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

/// Load all events from a JSON lines file
pub fn read_events(path: impl AsRef<Path>) -> Result<Vec<EventStore>> {
    let path = path.as_ref();
    let file =
        File::open(path).wrap_err_with(|| format!("Could not open {}", path.display()))?;
    let events = parse_events(BufReader::new(file))
        .wrap_err_with(|| format!("Could not read events from {}", path.display()))?;
    info!(count = events.len(), file = %path.display(), "Loaded events");
    Ok(events)
}

/// Decode events from any source of JSON lines
pub fn parse_events(reader: impl BufRead) -> Result<Vec<EventStore>> {
    let mut events = Vec::new();
    for (line_idx, line) in reader.lines().enumerate() {
        let line = line.wrap_err_with(|| format!("I/O error on line {}", line_idx + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str(&line)
            .wrap_err_with(|| format!("Malformed event on line {}", line_idx + 1))?;
        events.push(event);
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    const EVENT: &str = r#"{"info": {"eventNumber": 7, "mcEventWeight": 1.0}, "vertices": {"PrimaryVertices": [{"z": 0.5, "vertexType": 1}]}, "electrons": {"Electrons": [{"pt": 30000.0, "eta": 0.4, "author": 1, "track": {"d0": 0.01, "z0": 0.4, "theta": 1.2, "definingParametersCovMatrix": [0.01, 0, 1, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 1]}}]}}"#;

    #[test]
    fn skip_blank_lines() {
        let text = format!("{EVENT}\n\n   \n{EVENT}\n");
        let events = parse_events(text.as_bytes()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].info.event_number, 7);
        assert_eq!(events[0].electrons("Electrons").unwrap()[0].pt, 30000.);
    }

    #[test]
    fn report_malformed_line() {
        let text = format!("{EVENT}\n{{\"info\": 42}}\n");
        let err = parse_events(text.as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "Malformed event on line 2");
    }

    #[test]
    fn read_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{EVENT}").unwrap();
        let events = read_events(file.path()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].primary_vertex().unwrap().z, 0.5);

        assert!(read_events(file.path().with_extension("missing")).is_err());
    }
}
