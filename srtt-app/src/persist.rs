use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use srtt_experiment::{ExportRow, SessionSummary};
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFiles {
    pub log: PathBuf,
    pub summary: PathBuf,
}

/// `srtt_participant_<id>_<YYYYmmdd_HHMMSS>`, with anything unsafe in a
/// file name replaced by `_`.
pub fn file_stem(participant_id: &str, started: DateTime<Local>) -> String {
    let id: String = participant_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("srtt_participant_{id}_{}", started.format("%Y%m%d_%H%M%S"))
}

/// Writes the attempt log as CSV and the summary as JSON into `dir`.
pub fn write_results(
    dir: &Path,
    participant_id: &str,
    started: DateTime<Local>,
    rows: &[ExportRow],
    summary: &SessionSummary,
) -> Result<ResultFiles> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let stem = file_stem(participant_id, started);
    let files = ResultFiles {
        log: dir.join(format!("{stem}.csv")),
        summary: dir.join(format!("{stem}_summary.json")),
    };

    let file = File::create(&files.log)
        .with_context(|| format!("creating {}", files.log.display()))?;
    let mut out = BufWriter::new(file);
    write_csv(&mut out, rows)?;
    out.flush()?;

    let file = File::create(&files.summary)
        .with_context(|| format!("creating {}", files.summary.display()))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, summary)?;
    out.flush()?;

    info!(
        log = %files.log.display(),
        summary = %files.summary.display(),
        rows = rows.len(),
        "results written"
    );
    Ok(files)
}

pub fn write_csv<W: Write>(out: &mut W, rows: &[ExportRow]) -> std::io::Result<()> {
    writeln!(out, "{}", ExportRow::COLUMNS.join(","))?;
    for row in rows {
        let fields = row.fields();
        let line: Vec<Cow<'_, str>> = fields.iter().map(|f| escape_field(f)).collect();
        writeln!(out, "{}", line.join(","))?;
    }
    Ok(())
}

fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use srtt_core::{Attempt, BlockType, Position, TrialKey, TrialRecord};
    use srtt_experiment::SessionRecorder;

    fn recorder(participant_id: &str) -> SessionRecorder {
        let mut recorder = SessionRecorder::new();
        let key = TrialKey {
            participant_id,
            block_number: 1,
            block_type: BlockType::Structured,
            trial_number: 1,
            position: Position::new(2),
        };
        for (n, rt, correct) in [(1, 412.345, false), (2, 380.0, true)] {
            let record = TrialRecord::new(&key, Attempt::new(n, rt, correct), 5000.0).unwrap();
            recorder.append(record);
        }
        recorder
    }

    #[test]
    fn stem_uses_id_and_start_time() {
        let started = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            file_stem("p 01/x", started),
            "srtt_participant_p_01_x_20240309_140507"
        );
    }

    #[test]
    fn csv_has_header_then_rows_in_order() {
        let rows = recorder("p01").export_rows();
        let mut out = Vec::new();
        write_csv(&mut out, &rows).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "participant_id,block,block_type,trial,position,reaction_time,correct,attempt,timestamp"
        );
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("p01,1,structured,1,3,412.35,false,1,"));
        assert!(lines[2].starts_with("p01,1,structured,1,3,380.00,true,2,"));
    }

    #[test]
    fn fields_with_commas_are_quoted() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn writes_log_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = recorder("p01");
        let started = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let files = write_results(
            dir.path(),
            "p01",
            started,
            &recorder.export_rows(),
            &recorder.summarize(),
        )
        .unwrap();

        assert!(files.log.ends_with("srtt_participant_p01_20240309_140507.csv"));
        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&files.summary).unwrap()).unwrap();
        assert_eq!(summary["total_attempts"], 2);
        assert!(summary["random"]["mean_correct_rt_ms"].is_null());
        assert!(summary["learning_effect_ms"].is_null());
    }
}
