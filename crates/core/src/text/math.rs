/// A run of question text, either plain or a math expression to typeset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    InlineMath(String),
    DisplayMath(String),
}

impl Segment {
    #[must_use]
    pub fn is_math(&self) -> bool {
        !matches!(self, Segment::Text(_))
    }
}

/// Split `input` into text and math segments.
///
/// Recognised delimiters: `$$…$$` and `\[…\]` (display), `$…$` and `\(…\)`
/// (inline). `\$` is a literal dollar. A single `$` only opens math when followed
/// by a non-space, and only closes it when preceded by a non-space and not
/// followed by a digit, so prices like "$5 and $10" stay text. Unclosed or empty
/// delimiters are kept as text. Adjacent text is merged.
#[must_use]
pub fn split_math(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    while i < input.len() {
        let rest = &input[i..];

        if rest.starts_with("\\$") {
            text.push('$');
            i += 2;
            continue;
        }

        if let Some((segment, consumed)) = delimited(rest) {
            if !text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }
            segments.push(segment);
            i += consumed;
            continue;
        }

        let Some(ch) = rest.chars().next() else {
            break;
        };
        text.push(ch);
        i += ch.len_utf8();
    }

    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    segments
}

/// Try to read one math segment at the start of `rest`; returns it and the bytes consumed.
fn delimited(rest: &str) -> Option<(Segment, usize)> {
    if let Some(body) = rest.strip_prefix("$$") {
        let end = body.find("$$")?;
        let expr = body[..end].trim();
        return (!expr.is_empty()).then(|| (Segment::DisplayMath(expr.to_owned()), end + 4));
    }
    if let Some(body) = rest.strip_prefix("\\[") {
        let end = body.find("\\]")?;
        let expr = body[..end].trim();
        return (!expr.is_empty()).then(|| (Segment::DisplayMath(expr.to_owned()), end + 4));
    }
    if let Some(body) = rest.strip_prefix("\\(") {
        let end = body.find("\\)")?;
        let expr = body[..end].trim();
        return (!expr.is_empty()).then(|| (Segment::InlineMath(expr.to_owned()), end + 4));
    }
    if let Some(body) = rest.strip_prefix('$') {
        if body.starts_with(char::is_whitespace) {
            return None;
        }
        let end = closing_dollar(body)?;
        return Some((Segment::InlineMath(body[..end].to_owned()), end + 2));
    }
    None
}

fn closing_dollar(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut search = 0;
    while let Some(offset) = body[search..].find('$') {
        let pos = search + offset;
        let escaped = pos > 0 && bytes[pos - 1] == b'\\';
        let after_space = pos > 0 && bytes[pos - 1].is_ascii_whitespace();
        let before_digit = bytes.get(pos + 1).is_some_and(u8::is_ascii_digit);
        if pos > 0 && !escaped && !after_space && !before_digit {
            return Some(pos);
        }
        search = pos + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Segment {
        Segment::Text(s.into())
    }

    #[test]
    fn plain_text_is_one_segment() {
        assert_eq!(split_math("no math here"), vec![text("no math here")]);
        assert!(split_math("").is_empty());
    }

    #[test]
    fn splits_inline_and_display() {
        let got = split_math("Solve $x^2 = 4$ then $$\\frac{a}{b}$$ done");
        assert_eq!(
            got,
            vec![
                text("Solve "),
                Segment::InlineMath("x^2 = 4".into()),
                text(" then "),
                Segment::DisplayMath("\\frac{a}{b}".into()),
                text(" done"),
            ]
        );
    }

    #[test]
    fn bracket_delimiters() {
        let got = split_math("\\(a+b\\) and \\[ c \\]");
        assert_eq!(
            got,
            vec![
                Segment::InlineMath("a+b".into()),
                text(" and "),
                Segment::DisplayMath("c".into()),
            ]
        );
    }

    #[test]
    fn prices_stay_text() {
        assert_eq!(split_math("costs $5 and $10"), vec![text("costs $5 and $10")]);
    }

    #[test]
    fn escaped_dollar_is_literal() {
        assert_eq!(split_math("pay \\$3 now"), vec![text("pay $3 now")]);
    }

    #[test]
    fn unclosed_delimiters_are_text() {
        assert_eq!(split_math("open $$x+1 only"), vec![text("open $$x+1 only")]);
        assert_eq!(split_math("\\(never closed"), vec![text("\\(never closed")]);
    }

    #[test]
    fn handles_multibyte_text() {
        let got = split_math("área é $\\pi r^2$");
        assert_eq!(got[0], text("área é "));
        assert!(got[1].is_math());
    }
}
