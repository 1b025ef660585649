//! Terminal output sanitization
//!
//! Titles and message text come straight from uploaded archives. Before the CLI prints them,
//! escape sequences are removed so an archive cannot clear the screen, move the cursor,
//! or set the window title through OSC sequences.

const ESC: char = '\x1b';
const BEL: char = '\x07';

/// Removes CSI and OSC escape sequences and other control characters
///
/// Tabs and newlines survive only when `multiline` is set; otherwise every control character
/// (newlines included) becomes a single space so the text fits on one line.
///
/// # Examples
///
/// ```
/// use chatvault::utils::terminal::sanitize_terminal_text;
///
/// assert_eq!(sanitize_terminal_text("\x1b[31mred\x1b[0m\nnext", false), "red next");
/// ```
pub fn sanitize_terminal_text(text: &str, multiline: bool) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == ESC {
            match chars.peek() {
                // CSI: ESC [ params final-byte
                Some('[') => {
                    chars.next();
                    for next in chars.by_ref() {
                        if next.is_ascii_alphabetic() || next == '~' {
                            break;
                        }
                    }
                }
                // OSC: ESC ] ... terminated by BEL or ESC \
                Some(']') => {
                    chars.next();
                    while let Some(next) = chars.next() {
                        if next == BEL {
                            break;
                        }
                        if next == ESC && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            }
            continue;
        }

        if ch.is_control() {
            if multiline && (ch == '\n' || ch == '\t') {
                result.push(ch);
            } else if !multiline && !result.ends_with(' ') {
                result.push(' ');
            }
            continue;
        }

        result.push(ch);
    }

    result
}
