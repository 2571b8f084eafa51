use std::borrow::Cow;

/// Elements whose text content is never part of the readable body.
const SKIPPED_ELEMENTS: [&str; 2] = ["script", "style"];

/// Converts an HTML fragment into a single line of plain text.
///
/// Tags are removed (each tag boundary becomes a space so adjacent blocks do
/// not run together), `<script>`/`<style>` bodies and comments are dropped,
/// character entities are decoded, and whitespace runs collapse to a single
/// space. Plain text passes through with only whitespace normalization.
///
/// Malformed markup is handled best-effort: a `<` that does not start a tag
/// is kept as text, and an unterminated tag swallows the rest of the input.
///
/// # Examples
///
/// ```
/// use rss_digest::util::html_to_text;
///
/// assert_eq!(html_to_text("<p>Hello<br/>world</p>"), "Hello world");
/// assert_eq!(html_to_text("  a &amp;\n\tb "), "a & b");
/// ```
pub fn html_to_text(html: &str) -> String {
    let stripped = strip_tags(html);
    let decoded = decode_entities(&stripped);
    collapse_whitespace(&decoded)
}

/// Collapses every whitespace run (spaces, tabs, newlines, NBSP) into one
/// space and trims both ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        let after = &rest[lt + 1..];

        if let Some(comment) = after.strip_prefix("!--") {
            rest = comment.find("-->").map_or("", |end| &comment[end + 3..]);
            out.push(' ');
            continue;
        }

        if !starts_tag(after) {
            out.push('<');
            rest = after;
            continue;
        }

        let Some(gt) = after.find('>') else {
            // Unterminated tag: nothing after it is reliable text.
            rest = "";
            break;
        };
        let tag = &after[..gt];
        rest = &after[gt + 1..];
        out.push(' ');

        if let Some(name) = skipped_element(tag) {
            rest = skip_past_closing_tag(rest, name);
        }
    }

    out.push_str(rest);
    out
}

fn starts_tag(after_lt: &str) -> bool {
    after_lt
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'))
}

fn skipped_element(tag: &str) -> Option<&'static str> {
    let name: String = tag
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    let self_closing = tag.trim_end().ends_with('/');
    SKIPPED_ELEMENTS
        .into_iter()
        .find(|skipped| *skipped == name && !self_closing)
}

fn skip_past_closing_tag<'a>(rest: &'a str, name: &str) -> &'a str {
    let closing = format!("</{}", name);
    let lower = rest.to_ascii_lowercase();
    match lower.find(&closing) {
        // ASCII lowercasing keeps byte offsets identical.
        Some(pos) => {
            let tail = &rest[pos..];
            tail.find('>').map_or("", |gt| &tail[gt + 1..])
        }
        None => "",
    }
}

/// Decodes the common named entities and all numeric character references.
/// Unknown or malformed references are left untouched.
fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];

        // Entity names are short; bound the search so a stray '&' in a long
        // paragraph does not pair with a far-away ';'.
        let decoded = after
            .char_indices()
            .take(12)
            .find(|(_, c)| *c == ';')
            .and_then(|(semi, _)| decode_reference(&after[..semi]).map(|c| (c, semi)));

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_reference(name: &str) -> Option<char> {
    if let Some(numeric) = name.strip_prefix('#') {
        let code = match numeric.strip_prefix(|c| c == 'x' || c == 'X') {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }

    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "copy" => '\u{a9}',
        "reg" => '\u{ae}',
        "trade" => '\u{2122}',
        _ => return None,
    };
    Some(c)
}

/// Strips terminal control characters and ANSI escape sequences from
/// feed-supplied text before it reaches a terminal or a plain-text email.
///
/// Removes C0 controls (except tab, newline, carriage return), DEL, CSI
/// sequences (`ESC [` ... final byte), OSC sequences (`ESC ]` ... BEL or
/// `ESC \`), and bare ESC bytes.
///
/// Returns `Cow::Borrowed` when nothing needs stripping.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    fn is_control(b: u8) -> bool {
        b == 0x1b || b == 0x7f || (b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r'))
    }

    let bytes = s.as_bytes();
    if !bytes.iter().any(|&b| is_control(b)) {
        return Cow::Borrowed(s);
    }

    let len = bytes.len();
    let mut out = String::with_capacity(len);
    let mut i = 0;

    while i < len {
        match bytes[i] {
            0x1b if bytes.get(i + 1) == Some(&b'[') => {
                i += 2;
                while i < len {
                    let c = bytes[i];
                    i += 1;
                    if (0x40..=0x7e).contains(&c) {
                        break;
                    }
                }
            }
            0x1b if bytes.get(i + 1) == Some(&b']') => {
                i += 2;
                while i < len {
                    if bytes[i] == 0x07 {
                        i += 1;
                        break;
                    }
                    if bytes[i] == 0x1b && bytes.get(i + 1) == Some(&b'\\') {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            b if is_control(b) => i += 1,
            _ => {
                let start = i;
                while i < len && !is_control(bytes[i]) {
                    i += 1;
                }
                // Only ASCII bytes stop the run, so the slice is on a char boundary.
                out.push_str(&s[start..i]);
            }
        }
    }

    Cow::Owned(out)
}
