use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, multispace0, space0},
    combinator::map,
    multi::many0,
    sequence::{delimited, preceded, separated_pair},
    IResult,
};

use crate::error::{Error, Result};

/// One syntactic element of an SFZ line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Section header, e.g. `<region>` yields `Header("region")`
    Header(&'a str),
    /// `name=value` pair
    Opcode(&'a str, &'a str),
}

/// Split one line of SFZ text into headers and opcodes
///
/// A line may hold several headers and opcodes. Opcode values run until the
/// next header, the next `name=` or the end of the line, so values may
/// contain spaces (`sample=Piano C4.wav`). `//` starts a comment; lines
/// starting with `#` are preprocessor directives and are ignored.
pub fn tokenize_line(line: &str, line_number: usize) -> Result<Vec<Token<'_>>> {
    let line = strip_comment(line);
    if line.trim_start().starts_with('#') {
        log::debug!("Ignoring directive at line {}: {}", line_number, line.trim());
        return Ok(Vec::new());
    }

    let (rest, tokens) = many0(token)(line).map_err(|e| Error::Parse {
        line: line_number,
        message: e.to_string(),
    })?;

    let rest = rest.trim();
    if !rest.is_empty() {
        return Err(Error::Parse {
            line: line_number,
            message: format!("unexpected input '{}'", rest),
        });
    }
    Ok(tokens)
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn token(input: &str) -> IResult<&str, Token<'_>> {
    preceded(
        multispace0,
        alt((
            map(header, Token::Header),
            map(opcode, |(name, value)| Token::Opcode(name, value)),
        )),
    )(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn header(input: &str) -> IResult<&str, &str> {
    delimited(
        char('<'),
        delimited(space0, identifier, space0),
        char('>'),
    )(input)
}

fn opcode(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(identifier, char('='), opcode_value)(input)
}

fn opcode_value(input: &str) -> IResult<&str, &str> {
    let end = value_end(input);
    let (value, rest) = input.split_at(end);
    Ok((rest, value.trim_end()))
}

/// Byte index where an opcode value ends.
fn value_end(input: &str) -> usize {
    for (i, c) in input.char_indices() {
        if c == '<' {
            return i;
        }
        if c.is_whitespace() {
            let next = input[i..].trim_start();
            if next.starts_with('<') || starts_with_opcode(next) {
                return i;
            }
        }
    }
    input.len()
}

fn starts_with_opcode(input: &str) -> bool {
    matches!(identifier(input), Ok((rest, _)) if rest.starts_with('='))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_opcodes_on_one_line() {
        let tokens = tokenize_line("<region> sample=a.wav lokey=60 hikey=62", 1).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Header("region"),
                Token::Opcode("sample", "a.wav"),
                Token::Opcode("lokey", "60"),
                Token::Opcode("hikey", "62"),
            ]
        );
    }

    #[test]
    fn test_values_with_spaces() {
        let tokens = tokenize_line("sample=Grand Piano C4.wav volume=-3", 1).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Opcode("sample", "Grand Piano C4.wav"),
                Token::Opcode("volume", "-3"),
            ]
        );
    }

    #[test]
    fn test_comments_and_directives() {
        assert_eq!(
            tokenize_line("key=60 // middle C", 1).unwrap(),
            vec![Token::Opcode("key", "60")]
        );
        assert!(tokenize_line("// just a comment", 1).unwrap().is_empty());
        assert!(tokenize_line("#define $KEY 60", 1).unwrap().is_empty());
        assert!(tokenize_line("   ", 1).unwrap().is_empty());
    }

    #[test]
    fn test_header_followed_by_header() {
        let tokens = tokenize_line("<group><region>sample=a.wav", 1).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Header("group"),
                Token::Header("region"),
                Token::Opcode("sample", "a.wav"),
            ]
        );
    }

    #[test]
    fn test_malformed_input() {
        let err = tokenize_line("<region sample=a.wav", 7).unwrap_err();
        match err {
            Error::Parse { line, .. } => assert_eq!(line, 7),
            other => panic!("unexpected error: {other}"),
        }
        assert!(tokenize_line("just words", 1).is_err());
    }
}
