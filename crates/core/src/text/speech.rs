use std::iter::Peekable;
use std::str::Chars;

use crate::model::{Question, option_label};
use crate::text::math::{Segment, split_math};

/// Clean question or explanation text for a speech synthesiser.
///
/// Drops HTML tags and markdown markers, decodes the common entities, reads math
/// aloud ("x squared" style phrases for the usual LaTeX commands) and collapses
/// whitespace.
#[must_use]
pub fn speakable_text(input: &str) -> String {
    let plain = decode_entities(&strip_html_tags(input));
    let mut out = String::with_capacity(plain.len());
    for segment in split_math(&plain) {
        match segment {
            Segment::Text(text) => out.push_str(&strip_markdown(&text)),
            Segment::InlineMath(expr) | Segment::DisplayMath(expr) => {
                out.push(' ');
                out.push_str(&verbalize_latex(&expr));
                out.push(' ');
            }
        }
    }
    collapse_whitespace(&out)
}

/// Readback for a question followed by its lettered options.
#[must_use]
pub fn question_readout(question: &Question) -> String {
    let mut parts = vec![speakable_text(question.text())];
    for (ordinal, option) in (1_u32..).zip(question.options()) {
        parts.push(format!(
            "Option {}: {}.",
            option_label(ordinal),
            speakable_text(option)
        ));
    }
    parts.join(" ")
}

/// A `<` only opens a tag when followed by a letter, `/` or `!`, so comparisons
/// such as `x < 5` survive.
fn strip_html_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '<' if !in_tag
                && chars
                    .peek()
                    .is_some_and(|next| next.is_ascii_alphabetic() || matches!(next, '/' | '!')) =>
            {
                in_tag = true;
            }
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if in_tag => {}
            _ => out.push(ch),
        }
    }
    out
}

fn decode_entities(input: &str) -> String {
    input
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn strip_markdown(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for (idx, line) in input.split('\n').enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        let line = line.trim_start();
        let line = line.trim_start_matches('#').trim_start_matches('>');
        let line = line
            .strip_prefix("- ")
            .or_else(|| line.strip_prefix("* "))
            .unwrap_or(line);
        out.push_str(&line.replace("**", "").replace("__", "").replace('`', ""));
    }
    out
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Read a LaTeX expression aloud.
#[must_use]
pub fn verbalize_latex(expr: &str) -> String {
    let mut out = String::new();
    let mut chars = expr.chars().peekable();
    speak_until(&mut chars, &mut out, None);
    collapse_whitespace(&out)
}

fn speak_until(chars: &mut Peekable<Chars<'_>>, out: &mut String, stop: Option<char>) {
    while let Some(ch) = chars.next() {
        if Some(ch) == stop {
            return;
        }
        match ch {
            '\\' => speak_command(chars, out),
            '^' => {
                let exponent = read_group(chars);
                match exponent.as_str() {
                    "2" => out.push_str(" squared "),
                    "3" => out.push_str(" cubed "),
                    _ => {
                        out.push_str(" to the power of ");
                        out.push_str(&exponent);
                        out.push(' ');
                    }
                }
            }
            '_' => {
                out.push_str(" sub ");
                out.push_str(&read_group(chars));
                out.push(' ');
            }
            '{' => speak_until(chars, out, Some('}')),
            '}' => {}
            '=' => out.push_str(" equals "),
            '+' => out.push_str(" plus "),
            '-' => out.push_str(" minus "),
            '*' => out.push_str(" times "),
            '/' => out.push_str(" over "),
            '<' => out.push_str(" less than "),
            '>' => out.push_str(" greater than "),
            _ => out.push(ch),
        }
    }
}

/// Read one argument: a braced group, a command, or a single character.
fn read_group(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut out = String::new();
    match chars.next() {
        Some('{') => speak_until(chars, &mut out, Some('}')),
        Some('\\') => speak_command(chars, &mut out),
        Some(ch) => out.push(ch),
        None => {}
    }
    collapse_whitespace(&out)
}

fn speak_command(chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    let mut name = String::new();
    while let Some(&ch) = chars.peek() {
        if !ch.is_ascii_alphabetic() {
            break;
        }
        name.push(ch);
        chars.next();
    }

    if name.is_empty() {
        // Escaped symbol or spacing command such as `\,` or `\{`.
        if let Some(ch) = chars.next() {
            match ch {
                '%' => out.push_str(" percent "),
                '{' | '}' | ',' | ';' | ':' | '!' | ' ' => out.push(' '),
                other => out.push(other),
            }
        }
        return;
    }

    let spoken = match name.as_str() {
        "frac" | "dfrac" | "tfrac" => {
            let numerator = read_group(chars);
            let denominator = read_group(chars);
            format!(" {numerator} over {denominator} ")
        }
        "sqrt" => format!(" square root of {} ", read_group(chars)),
        "times" | "cdot" => " times ".into(),
        "div" => " divided by ".into(),
        "pm" => " plus or minus ".into(),
        "le" | "leq" => " less than or equal to ".into(),
        "ge" | "geq" => " greater than or equal to ".into(),
        "ne" | "neq" => " not equal to ".into(),
        "approx" => " approximately ".into(),
        "infty" => " infinity ".into(),
        "degree" | "circ" => " degrees ".into(),
        "left" | "right" | "displaystyle" | "mathrm" | "text" | "mathbf" => " ".into(),
        other => format!(" {other} "),
    };
    out.push_str(&spoken);
}
