use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::metrics::counters;
use crate::path::normalizer::Normalizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// One canonical path per line.
    Text,
    /// One JSON object per line.
    Json,
}

/// One cleaned input.
#[derive(Debug, Clone)]
pub struct PathRecord {
    pub ts: DateTime<Utc>,
    pub input: String,
    pub path: String,
    pub canonical: bool,
}

/// Serialized form of a record line.
#[derive(Serialize)]
struct RecordLine<'a> {
    #[serde(rename = "@timestamp")]
    ts: &'a DateTime<Utc>,
    input: &'a str,
    path: &'a str,
    canonical: bool,
}

impl PathRecord {
    pub fn new(input: &str) -> Self {
        let path = Normalizer::normalize_path(input);
        let canonical = *path == *input;
        counters::on_path("cli", input.len(), canonical);
        Self {
            ts: Utc::now(),
            input: input.to_string(),
            path: path.into_owned(),
            canonical,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub rewritten: usize,
}

pub struct Reporter<W: Write> {
    out: W,
    format: Format,
    summary: Summary,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: Format) -> Self {
        Self {
            out,
            format,
            summary: Summary::default(),
        }
    }

    pub fn write(&mut self, rec: &PathRecord) -> Result<()> {
        self.summary.total += 1;
        if !rec.canonical {
            self.summary.rewritten += 1;
            tracing::debug!(input = %rec.input, path = %rec.path, "path rewritten");
        }

        match self.format {
            Format::Text => writeln!(self.out, "{}", rec.path)?,
            Format::Json => {
                let line = RecordLine {
                    ts: &rec.ts,
                    input: &rec.input,
                    path: &rec.path,
                    canonical: rec.canonical,
                };
                serde_json::to_writer(&mut self.out, &line).context("encode record")?;
                self.out.write_all(b"\n")?;
            }
        }
        Ok(())
    }

    pub fn clean_all<'a, I>(&mut self, inputs: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for input in inputs {
            self.write(&PathRecord::new(input))?;
        }
        Ok(())
    }

    /// Cleans every line of `reader`.
    pub fn clean_lines<R: BufRead>(&mut self, reader: R) -> Result<()> {
        for line in reader.lines() {
            let line = line.context("read input line")?;
            self.write(&PathRecord::new(&line))?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<Summary> {
        self.out.flush()?;
        Ok(self.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_output_one_path_per_line() {
        let mut buf = Vec::new();
        let mut rep = Reporter::new(&mut buf, Format::Text);
        rep.clean_all(["/abc//def//ghi", "abc/./../def", "", "/ok"]).unwrap();
        let summary = rep.finish().unwrap();

        assert_eq!(String::from_utf8(buf).unwrap(), "/abc/def/ghi\n/def\n/\n/ok\n");
        assert_eq!(summary, Summary { total: 4, rewritten: 3 });
    }

    #[test]
    fn json_lines_carry_input_and_outcome() {
        let mut buf = Vec::new();
        let mut rep = Reporter::new(&mut buf, Format::Json);
        rep.clean_all(["//abc//", "/abc/"]).unwrap();
        rep.finish().unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["input"], "//abc//");
        assert_eq!(lines[0]["path"], "/abc/");
        assert_eq!(lines[0]["canonical"], false);
        assert_eq!(lines[1]["canonical"], true);
        assert!(lines[0]["@timestamp"].is_string());
    }

    #[test]
    fn reads_lines_with_crlf() {
        let input = "a/b\r\n/c/../d\n\n";
        let mut buf = Vec::new();
        let mut rep = Reporter::new(&mut buf, Format::Text);
        rep.clean_lines(input.as_bytes()).unwrap();
        let summary = rep.finish().unwrap();

        assert_eq!(String::from_utf8(buf).unwrap(), "/a/b\n/d\n/\n");
        assert_eq!(summary.total, 3);
    }
}
