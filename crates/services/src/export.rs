//! CSV exports of session results and leaderboards.

use csv::Writer;

use exam_core::model::{ExamSession, Leaderboard, SessionResult, Verdict, option_label};

use crate::error::ExportError;

/// One row per question, in session order.
///
/// # Errors
///
/// Returns `ExportError` if a record cannot be written.
pub fn results_csv(result: &SessionResult, session: &ExamSession) -> Result<String, ExportError> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(["position", "question_id", "question", "chosen", "correct", "verdict"])?;

    for outcome in result.outcomes() {
        let text = session
            .question(&outcome.question_id)
            .map(|q| q.text().to_owned())
            .unwrap_or_default();
        let chosen = outcome.chosen.map(option_label).unwrap_or_default();
        writer.write_record([
            (outcome.position + 1).to_string(),
            outcome.question_id.to_string(),
            text,
            chosen,
            option_label(outcome.correct),
            verdict_label(outcome.verdict).to_owned(),
        ])?;
    }

    finish(writer)
}

/// Ranked standings with a header row.
///
/// # Errors
///
/// Returns `ExportError` if a record cannot be written.
pub fn leaderboard_csv(board: &Leaderboard) -> Result<String, ExportError> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(["rank", "participant", "score", "total", "duration_secs"])?;
    for ranked in board.entries() {
        writer.write_record([
            ranked.rank.to_string(),
            ranked.entry.participant.clone(),
            ranked.entry.score.to_string(),
            ranked.entry.total.to_string(),
            ranked.entry.duration_secs.to_string(),
        ])?;
    }
    finish(writer)
}

fn verdict_label(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Correct => "correct",
        Verdict::Incorrect => "incorrect",
        Verdict::Unanswered => "unanswered",
    }
}

fn finish(writer: Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Flush(err.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}
