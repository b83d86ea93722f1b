//! Package script format.
//!
//! One command per line, arguments separated by whitespace. Lines starting
//! with `#` and blank lines are skipped.
//!
//! ```text
//! clear
//! text 0 0 "Hello"
//! repeat 3
//!   rect 10 12 20 8 fill
//!   show
//!   wait 200
//!   clear
//!   show
//!   wait 200
//! end
//! await select 5000
//! ```

use thiserror::Error;

use crate::hardware::Button;

/// Deepest allowed `repeat` nesting
pub const MAX_DEPTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Line {line}: {message}")]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

impl ScriptError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Fill(bool),
    Pixel {
        x: i32,
        y: i32,
        on: bool,
    },
    Rect {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        filled: bool,
    },
    Text {
        x: i32,
        y: i32,
        text: String,
    },
    Show,
    Wait(u64),
    Await {
        button: Button,
        timeout_ms: Option<u64>,
    },
    Repeat {
        count: u32,
        body: Vec<Op>,
    },
}

/// A parsed package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    pub ops: Vec<Op>,
}

struct Block {
    count: u32,
    opened_on: usize,
    ops: Vec<Op>,
}

pub fn parse(source: &str) -> Result<Script, ScriptError> {
    let mut top = Vec::new();
    let mut blocks: Vec<Block> = Vec::new();

    for (index, raw) in source.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (command, rest) = split_word(trimmed);
        let op = match command.to_ascii_lowercase().as_str() {
            "repeat" => {
                if blocks.len() == MAX_DEPTH {
                    return Err(ScriptError::new(line, "repeat nested too deep"));
                }
                let args = Args::new(line, rest, 1)?;
                blocks.push(Block {
                    count: args.number(0, "count")?,
                    opened_on: line,
                    ops: Vec::new(),
                });
                continue;
            }
            "end" => {
                Args::new(line, rest, 0)?;
                let block = blocks
                    .pop()
                    .ok_or_else(|| ScriptError::new(line, "end without repeat"))?;
                Op::Repeat {
                    count: block.count,
                    body: block.ops,
                }
            }
            "clear" => {
                Args::new(line, rest, 0)?;
                Op::Fill(false)
            }
            "fill" => {
                let args = Args::new(line, rest, 1)?;
                Op::Fill(args.switch(0)?)
            }
            "pixel" => {
                let args = Args::between(line, rest, 2, 3)?;
                Op::Pixel {
                    x: args.number(0, "x")?,
                    y: args.number(1, "y")?,
                    on: if args.len() == 3 { args.switch(2)? } else { true },
                }
            }
            "rect" => {
                let args = Args::between(line, rest, 4, 5)?;
                let filled = match args.get(4) {
                    None => false,
                    Some("fill") => true,
                    Some(other) => {
                        return Err(ScriptError::new(line, format!("expected fill, got {other}")))
                    }
                };
                Op::Rect {
                    x: args.number(0, "x")?,
                    y: args.number(1, "y")?,
                    width: args.size(2, "width")?,
                    height: args.size(3, "height")?,
                    filled,
                }
            }
            "text" => {
                let (x, rest) = split_word(rest);
                let (y, message) = split_word(rest);
                let position = format!("{x} {y}");
                let coords = Args::new(line, &position, 2)?;
                Op::Text {
                    x: coords.number(0, "x")?,
                    y: coords.number(1, "y")?,
                    text: unquote(message.trim()).to_string(),
                }
            }
            "show" => {
                Args::new(line, rest, 0)?;
                Op::Show
            }
            "wait" => {
                let args = Args::new(line, rest, 1)?;
                Op::Wait(args.number(0, "milliseconds")?)
            }
            "await" => {
                let args = Args::between(line, rest, 1, 2)?;
                let name = args.get(0).unwrap_or_default();
                let button = Button::from_name(name)
                    .ok_or_else(|| ScriptError::new(line, format!("unknown button {name}")))?;
                let timeout_ms = if args.len() == 2 {
                    Some(args.number(1, "timeout")?)
                } else {
                    None
                };
                Op::Await { button, timeout_ms }
            }
            other => return Err(ScriptError::new(line, format!("unknown command {other}"))),
        };

        match blocks.last_mut() {
            Some(block) => block.ops.push(op),
            None => top.push(op),
        }
    }

    if let Some(open) = blocks.last() {
        return Err(ScriptError::new(open.opened_on, "repeat without end"));
    }
    Ok(Script { ops: top })
}

/// Leading word and the remainder, both trimmed at the split
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(at) => (&s[..at], s[at..].trim_start()),
        None => (s, ""),
    }
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(s)
}

struct Args<'a> {
    line: usize,
    words: Vec<&'a str>,
}

impl<'a> Args<'a> {
    fn new(line: usize, rest: &'a str, exactly: usize) -> Result<Self, ScriptError> {
        Self::between(line, rest, exactly, exactly)
    }

    fn between(line: usize, rest: &'a str, min: usize, max: usize) -> Result<Self, ScriptError> {
        let words: Vec<&str> = rest.split_whitespace().collect();
        if words.len() < min || words.len() > max {
            let expected = if min == max {
                format!("{min}")
            } else {
                format!("{min}-{max}")
            };
            return Err(ScriptError::new(
                line,
                format!("expected {expected} argument(s), got {}", words.len()),
            ));
        }
        Ok(Self { line, words })
    }

    fn len(&self) -> usize {
        self.words.len()
    }

    fn get(&self, index: usize) -> Option<&'a str> {
        self.words.get(index).copied()
    }

    fn number<T: std::str::FromStr>(&self, index: usize, what: &str) -> Result<T, ScriptError> {
        let word = self.get(index).unwrap_or_default();
        word.parse()
            .map_err(|_| ScriptError::new(self.line, format!("bad {what} {word:?}")))
    }

    fn size(&self, index: usize, what: &str) -> Result<i32, ScriptError> {
        let value: i32 = self.number(index, what)?;
        if value < 0 {
            return Err(ScriptError::new(self.line, format!("negative {what}")));
        }
        Ok(value)
    }

    fn switch(&self, index: usize) -> Result<bool, ScriptError> {
        match self.get(index) {
            Some("on") | Some("1") => Ok(true),
            Some("off") | Some("0") => Ok(false),
            other => Err(ScriptError::new(
                self.line,
                format!("expected on/off, got {:?}", other.unwrap_or_default()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_drawing_commands() {
        let script = parse(
            "# splash\n\
             clear\n\
             pixel 1 2\n\
             pixel 3 4 off\n\
             rect 0 0 10 5 fill\n\
             text 0 10 \"Hi there\"\n\
             show\n",
        )
        .unwrap();

        assert_eq!(
            script.ops,
            vec![
                Op::Fill(false),
                Op::Pixel { x: 1, y: 2, on: true },
                Op::Pixel { x: 3, y: 4, on: false },
                Op::Rect {
                    x: 0,
                    y: 0,
                    width: 10,
                    height: 5,
                    filled: true
                },
                Op::Text {
                    x: 0,
                    y: 10,
                    text: "Hi there".to_string()
                },
                Op::Show,
            ]
        );
    }

    #[test]
    fn test_text_keeps_inner_spacing() {
        let script = parse("text 2 20   a  b # c").unwrap();
        assert_eq!(
            script.ops,
            vec![Op::Text {
                x: 2,
                y: 20,
                text: "a  b # c".to_string()
            }]
        );
    }

    #[test]
    fn test_nested_repeat() {
        let script = parse("repeat 2\n  repeat 3\n    show\n  end\n  wait 10\nend\n").unwrap();
        assert_eq!(
            script.ops,
            vec![Op::Repeat {
                count: 2,
                body: vec![
                    Op::Repeat {
                        count: 3,
                        body: vec![Op::Show]
                    },
                    Op::Wait(10),
                ]
            }]
        );
    }

    #[test]
    fn test_await_with_and_without_timeout() {
        let script = parse("await Select\nawait home 1500").unwrap();
        assert_eq!(
            script.ops,
            vec![
                Op::Await {
                    button: Button::Select,
                    timeout_ms: None
                },
                Op::Await {
                    button: Button::Home,
                    timeout_ms: Some(1500)
                },
            ]
        );
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        assert_eq!(parse("clear\nblink 3").unwrap_err().line, 2);
        assert_eq!(parse("\n\npixel x 1").unwrap_err().line, 3);
        assert_eq!(parse("show\nend").unwrap_err().line, 2);
        assert_eq!(parse("repeat 2\nshow\n").unwrap_err().line, 1);
        assert_eq!(parse("rect 0 0 -1 4").unwrap_err().line, 1);
        assert_eq!(parse("await left").unwrap_err().line, 1);
    }

    #[test]
    fn test_depth_limit() {
        let deep = "repeat 1\n".repeat(MAX_DEPTH + 1);
        let err = parse(&deep).unwrap_err();
        assert_eq!(err.line, MAX_DEPTH + 1);

        let ok = format!("{}{}", "repeat 1\n".repeat(MAX_DEPTH), "end\n".repeat(MAX_DEPTH));
        assert!(parse(&ok).is_ok());
    }

    #[test]
    fn test_error_display() {
        let err = parse("fill maybe").unwrap_err();
        assert_eq!(err.to_string(), "Line 1: expected on/off, got \"maybe\"");
    }
}
