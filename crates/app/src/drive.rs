//! Line-oriented exam driver over stdin/stdout.

use std::path::Path;

use tokio::io::{AsyncBufReadExt, BufReader};

use exam_core::model::{ExamMode, option_label};
use exam_core::text::{question_readout, speakable_text};
use services::export::results_csv;
use services::{ActiveExam, ExamSessionService, QueueNotifier, SessionError};

const HELP: &str = "commands: n(ext) p(rev) g <number> a <option> r(eveal) e(xplain) b(ookmark) \
read report <text> s(ubmit) q(uit, keep progress) x (discard) h(elp)";

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Next,
    Previous,
    Go(i64),
    Answer(u32),
    Reveal,
    Explain,
    Bookmark,
    Read,
    Report(String),
    Submit,
    Quit,
    Discard,
    Help,
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    Some(match word {
        "n" | "next" => Input::Next,
        "p" | "prev" => Input::Previous,
        "g" | "go" => Input::Go(rest.parse::<i64>().ok()?.saturating_sub(1)),
        "a" | "answer" => Input::Answer(parse_option(rest)?),
        "r" | "reveal" => Input::Reveal,
        "e" | "explain" => Input::Explain,
        "b" | "bookmark" => Input::Bookmark,
        "read" => Input::Read,
        "report" => Input::Report(rest.to_owned()),
        "s" | "submit" => Input::Submit,
        "q" | "quit" => Input::Quit,
        "x" | "discard" => Input::Discard,
        "h" | "help" | "?" => Input::Help,
        _ => return None,
    })
}

/// `b`, `B` and `2` all name the second option.
fn parse_option(raw: &str) -> Option<u32> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            Some(u32::from(c.to_ascii_uppercase()) - u32::from('A') + 1)
        }
        _ => raw.parse().ok(),
    }
}

fn render(sessions: &ExamSessionService, exam: &ActiveExam) {
    let session = exam.session();
    let progress = sessions.progress(exam);
    let question = session.current_question();
    let id = question.id();

    println!();
    print!("[{}/{}] {}", progress.current_index + 1, progress.total, exam.key());
    if progress.bookmarked_current {
        print!(" *bookmarked*");
    }
    if let Some(left) = progress.remaining {
        print!(" ({}m{:02}s left)", left.num_minutes(), left.num_seconds() % 60);
    }
    println!();
    println!("{}", speakable_text(question.text()));

    let chosen = session.answer(id);
    let show_key = session.is_studied(id) || session.is_submitted();
    for (idx, text) in (1_u32..).zip(question.options()) {
        let picked = if chosen == Some(idx) { ">" } else { " " };
        let mark = if show_key && question.is_correct(idx) { " (correct)" } else { "" };
        println!(" {picked} {}. {}{mark}", option_label(idx), speakable_text(text));
    }
    if session.explanation_visible(id) {
        match question.explanation() {
            Some(text) => println!("  Explanation: {}", speakable_text(text)),
            None => println!("  No explanation available."),
        }
    }
}

fn flush_notices(notifier: &QueueNotifier) {
    for notice in notifier.drain() {
        println!("! {}", notice.message);
    }
}

/// Drive `exam` until it is submitted, quit or discarded.
///
/// # Errors
///
/// Returns stdin, storage and export failures. Rejected commands are printed and
/// the loop continues.
pub async fn run(
    sessions: &ExamSessionService,
    mut exam: ActiveExam,
    notifier: &QueueNotifier,
    export: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    if exam.resumed() {
        println!("Resuming {}", exam.key());
    }
    println!("{HELP}");
    render(sessions, &exam);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        flush_notices(notifier);

        if exam.mode() == ExamMode::Mock && sessions.progress(&exam).expired {
            println!("Time is up.");
            break;
        }

        let Some(line) = lines.next_line().await? else {
            // End of input keeps the snapshot for the next run.
            return Ok(());
        };
        let Some(input) = parse_input(&line) else {
            println!("{HELP}");
            continue;
        };

        let id = exam.session().current_question().id().clone();
        let outcome: Result<(), SessionError> = match input {
            Input::Next => sessions.next(&mut exam).await.map(drop),
            Input::Previous => sessions.previous(&mut exam).await.map(drop),
            Input::Go(index) => sessions.navigate(&mut exam, index).await.map(drop),
            Input::Answer(ordinal) => sessions
                .select_option(&mut exam, &id, ordinal)
                .await
                .map(|changed| {
                    if !changed && exam.session().is_frozen(&id) {
                        println!("That answer is locked.");
                    }
                }),
            Input::Reveal => sessions.reveal(&mut exam, &id).await.map(drop),
            Input::Explain => sessions.toggle_explanation(&mut exam, &id).await.map(drop),
            Input::Bookmark => sessions.toggle_bookmark(&mut exam, &id).map(drop),
            Input::Read => {
                println!("{}", question_readout(exam.session().current_question()));
                Ok(())
            }
            Input::Report(text) => sessions.report(&exam, &id, &text).await,
            Input::Submit => break,
            Input::Quit => {
                println!("Progress saved.");
                return Ok(());
            }
            Input::Discard => {
                sessions.exit(exam).await?;
                println!("Session discarded.");
                return Ok(());
            }
            Input::Help => {
                println!("{HELP}");
                Ok(())
            }
        };

        match outcome {
            Ok(()) => render(sessions, &exam),
            Err(err) if err.is_invalid_input() => println!("{err}"),
            Err(SessionError::NetworkFailure(_)) => {}
            Err(err) => return Err(err.into()),
        }
    }

    let result = sessions.finish(&mut exam).await?;
    flush_notices(notifier);
    println!(
        "Score: {}/{} ({:.0}%), answered {}, took {}s",
        result.correct(),
        result.total(),
        result.percentage(),
        result.answered(),
        result.duration().num_seconds()
    );
    if let Some(path) = export {
        std::fs::write(path, results_csv(&result, exam.session())?)?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_parse_as_letters_or_numbers() {
        assert_eq!(parse_option("b"), Some(2));
        assert_eq!(parse_option("D"), Some(4));
        assert_eq!(parse_option("3"), Some(3));
        assert_eq!(parse_option(""), None);
    }

    #[test]
    fn commands_parse() {
        assert_eq!(parse_input("g 3"), Some(Input::Go(2)));
        assert_eq!(parse_input(" a c "), Some(Input::Answer(3)));
        assert_eq!(
            parse_input("report typo in B"),
            Some(Input::Report("typo in B".into()))
        );
        assert_eq!(parse_input("s"), Some(Input::Submit));
        assert_eq!(parse_input("dance"), None);
        assert_eq!(parse_input("g x"), None);
    }
}
