//! Rendering of an [`AggregationReport`] into a buffered text message.

use std::io::{self, Write};

use tracing::warn;

use crate::{
    config::Unit,
    model::{AggregationReport, RainInterval},
};

/// Destination for a cycle's report.
///
/// Per cycle the renderer calls `start_message`, any number of `write_message`, then
/// `end_message`, which flushes everything written since the start.
pub trait ReportSink: Send {
    fn start_message(&mut self);
    fn write_message(&mut self, line: &str);
    fn end_message(&mut self);
}

/// Buffers a report and prints it to stdout as one block.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    buffer: String,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportSink for ConsoleSink {
    fn start_message(&mut self) {
        self.buffer.clear();
        self.buffer.push('\n');
    }

    fn write_message(&mut self, line: &str) {
        self.buffer.push_str(line);
        self.buffer.push('\n');
    }

    fn end_message(&mut self) {
        let mut stdout = io::stdout().lock();
        if let Err(err) = writeln!(stdout, "{}", self.buffer).and_then(|_| stdout.flush()) {
            warn!(error = %err, "Failed to write report to stdout");
        }
    }
}

/// Render every section with data; sections without a contributing source are omitted.
pub fn render(report: &AggregationReport, unit: Unit, sink: &mut dyn ReportSink) {
    sink.start_message();

    if let Some(pressure) = report.pressure {
        sink.write_message(&format!("Average pressure: {pressure:.1} hPa"));
    }

    if let Some(buckets) = &report.temperature_by_day {
        sink.write_message("Average temperature");
        for bucket in buckets {
            sink.write_message(&format!(
                "{} : {:.1} {}",
                bucket.date.format("%d.%m.%Y"),
                bucket.average_temperature,
                unit.temperature_symbol()
            ));
        }
    }

    if let Some(intervals) = &report.rain_intervals {
        sink.write_message("Rains");
        for interval in intervals {
            sink.write_message(&rain_line(interval));
        }
    }

    sink.end_message();
}

fn rain_line(interval: &RainInterval) -> String {
    format!(
        "{} - {}",
        interval.start.format("%d.%m.%Y %H:%M"),
        interval.end.format("%H:%M")
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::DayBucket;
    use chrono::{NaiveDate, NaiveDateTime};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Event {
        Start,
        Line(String),
        End,
    }

    /// Records every call so tests can assert on the exact sequence.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSink {
        pub(crate) events: Vec<Event>,
    }

    impl RecordingSink {
        pub(crate) fn lines(&self) -> Vec<&str> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Line(l) => Some(l.as_str()),
                    _ => None,
                })
                .collect()
        }
    }

    impl ReportSink for RecordingSink {
        fn start_message(&mut self) {
            self.events.push(Event::Start);
        }

        fn write_message(&mut self, line: &str) {
            self.events.push(Event::Line(line.to_string()));
        }

        fn end_message(&mut self) {
            self.events.push(Event::End);
        }
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").expect("valid test timestamp")
    }

    #[test]
    fn empty_report_renders_only_start_and_end() {
        let mut sink = RecordingSink::default();

        render(&AggregationReport::default(), Unit::Metric, &mut sink);

        assert_eq!(sink.events, vec![Event::Start, Event::End]);
    }

    #[test]
    fn renders_all_sections_in_order() {
        let report = AggregationReport {
            pressure: Some(1013.27),
            temperature_by_day: Some(vec![
                DayBucket {
                    date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    average_temperature: 20.0,
                },
                DayBucket {
                    date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                    average_temperature: 18.44,
                },
            ]),
            rain_intervals: Some(vec![
                RainInterval { start: at("2024-01-01 22:00"), end: at("2024-01-02 00:00") },
                RainInterval { start: at("2024-01-02 00:00"), end: at("2024-01-02 04:00") },
            ]),
        };
        let mut sink = RecordingSink::default();

        render(&report, Unit::Imperial, &mut sink);

        assert_eq!(sink.events.first(), Some(&Event::Start));
        assert_eq!(sink.events.last(), Some(&Event::End));
        assert_eq!(
            sink.lines(),
            vec![
                "Average pressure: 1013.3 hPa",
                "Average temperature",
                "01.01.2024 : 20.0 °F",
                "02.01.2024 : 18.4 °F",
                "Rains",
                "01.01.2024 22:00 - 00:00",
                "02.01.2024 00:00 - 04:00",
            ]
        );
    }

    #[test]
    fn missing_sections_are_omitted() {
        let report = AggregationReport { pressure: Some(1000.0), ..Default::default() };
        let mut sink = RecordingSink::default();

        render(&report, Unit::Metric, &mut sink);

        assert_eq!(sink.lines(), vec!["Average pressure: 1000.0 hPa"]);
    }

    #[test]
    fn console_sink_buffers_between_start_and_end() {
        let mut sink = ConsoleSink::new();

        sink.start_message();
        sink.write_message("Rains");

        assert_eq!(sink.buffer, "\nRains\n");
    }
}
