//! IRC text formatting (mIRC control codes)

const BOLD: char = '\x02';
const COLOR: char = '\x03';
const RESET: char = '\x0f';
const ITALIC: char = '\x1d';
const UNDERLINE: char = '\x1f';
const REVERSE: char = '\x16';

/// The 16-colour mIRC palette
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    White = 0,
    Black = 1,
    Blue = 2,
    Green = 3,
    Red = 4,
    Brown = 5,
    Purple = 6,
    Orange = 7,
    Yellow = 8,
    LightGreen = 9,
    Cyan = 10,
    LightCyan = 11,
    LightBlue = 12,
    Pink = 13,
    Grey = 14,
    LightGrey = 15,
}

impl Color {
    pub fn code(self) -> u8 {
        self as u8
    }
}

pub fn bold(text: &str) -> String {
    format!("{BOLD}{text}{BOLD}")
}

pub fn color(text: &str, color: Color) -> String {
    format!("{COLOR}{:02}{text}{COLOR}", color.code())
}

/// Remove formatting codes, e.g. before printing to a terminal
pub fn strip(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            BOLD | RESET | ITALIC | UNDERLINE | REVERSE => {}
            COLOR => {
                // up to two digits of foreground, optionally ",NN" background
                for _ in 0..2 {
                    if chars.next_if(char::is_ascii_digit).is_none() {
                        break;
                    }
                }
                if chars.peek() == Some(&',') {
                    let mut lookahead = chars.clone();
                    lookahead.next();
                    if lookahead.peek().is_some_and(char::is_ascii_digit) {
                        chars.next();
                        for _ in 0..2 {
                            if chars.next_if(char::is_ascii_digit).is_none() {
                                break;
                            }
                        }
                    }
                }
            }
            _ => out.push(ch),
        }
    }
    out
}
