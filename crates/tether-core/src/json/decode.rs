//! Recursive-descent JSON parser.

use std::io::Read;

use super::{JsonError, Map, Recognizer, Value};

/// Deepest array/object nesting accepted before the input is rejected.
const MAX_DEPTH: usize = 512;

/// Decode JSON text, offering every object to `recognizers` in order.
///
/// Objects are offered innermost first; the first recognizer that returns a
/// value replaces the object wherever it appears. Anything other than
/// whitespace after the top-level value is rejected.
pub fn decode(text: &str, recognizers: &[&dyn Recognizer]) -> Result<Value, JsonError> {
    let mut parser = Parser {
        text,
        bytes: text.as_bytes(),
        pos: 0,
        depth: 0,
        recognizers,
    };
    let value = parser.parse_value()?;
    parser.skip_whitespace();
    if parser.pos < parser.bytes.len() {
        return Err(parser.error("unexpected trailing characters"));
    }
    Ok(value)
}

/// Decode UTF-8 JSON from a byte stream.
pub fn decode_reader<R: Read>(
    mut reader: R,
    recognizers: &[&dyn Recognizer],
) -> Result<Value, JsonError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    decode(&text, recognizers)
}

struct Parser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
    recognizers: &'a [&'a dyn Recognizer],
}

impl Parser<'_> {
    fn error(&self, message: impl Into<String>) -> JsonError {
        JsonError::malformed(message, self.pos)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: u8) -> Result<(), JsonError> {
        self.skip_whitespace();
        match self.peek() {
            Some(b) if b == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(self.error(format!(
                "expected '{}' but found '{}'",
                expected as char, b as char
            ))),
            None => Err(self.error(format!(
                "expected '{}' but reached end of input",
                expected as char
            ))),
        }
    }

    fn parse_value(&mut self) -> Result<Value, JsonError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some(b'"') => self.parse_string().map(Value::String),
            Some(b'{') => self.nested(Self::parse_object),
            Some(b'[') => self.nested(Self::parse_array),
            Some(b't') => self.parse_literal("true", Value::Bool(true)),
            Some(b'f') => self.parse_literal("false", Value::Bool(false)),
            Some(b'n') => self.parse_literal("null", Value::Null),
            Some(b'-' | b'0'..=b'9') => self.parse_number(),
            Some(b) => Err(self.error(format!("unexpected character '{}'", b as char))),
        }
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Value, JsonError>,
    ) -> Result<Value, JsonError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(format!("nesting deeper than {}", MAX_DEPTH)));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_literal(&mut self, word: &str, value: Value) -> Result<Value, JsonError> {
        if self.text[self.pos..].starts_with(word) {
            self.pos += word.len();
            Ok(value)
        } else {
            Err(self.error(format!("expected '{}'", word)))
        }
    }

    fn parse_number(&mut self) -> Result<Value, JsonError> {
        let start = self.pos;
        while let Some(b'0'..=b'9' | b'+' | b'-' | b'.' | b'e' | b'E') = self.peek() {
            self.pos += 1;
        }
        let literal = &self.text[start..self.pos];
        let invalid = || JsonError::malformed(format!("invalid number '{}'", literal), start);
        if literal.contains(['.', 'e', 'E']) {
            literal.parse::<f64>().map(Value::Double).map_err(|_| invalid())
        } else {
            literal.parse::<i64>().map(Value::integer).map_err(|_| invalid())
        }
    }

    fn parse_array(&mut self) -> Result<Value, JsonError> {
        self.expect(b'[')?;
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Value::List(items));
        }
        loop {
            items.push(self.parse_value()?);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    return Ok(Value::List(items));
                }
                Some(b) => {
                    return Err(self.error(format!(
                        "expected ',' or ']' in array but found '{}'",
                        b as char
                    )))
                }
                None => return Err(self.error("unterminated array")),
            }
        }
    }

    fn parse_object(&mut self) -> Result<Value, JsonError> {
        self.expect(b'{')?;
        let mut map = Map::new();
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(self.recognize(map));
        }
        loop {
            self.skip_whitespace();
            if self.peek() != Some(b'"') {
                return Err(self.error("object keys must be quoted strings"));
            }
            let key = self.parse_string()?;
            self.expect(b':')?;
            let value = self.parse_value()?;
            map.insert(key, value);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(self.recognize(map));
                }
                Some(b) => {
                    return Err(self.error(format!(
                        "expected ',' or '}}' in object but found '{}'",
                        b as char
                    )))
                }
                None => return Err(self.error("unterminated object")),
            }
        }
    }

    fn recognize(&self, map: Map) -> Value {
        for recognizer in self.recognizers {
            if let Some(value) = recognizer.recognize(&map) {
                return value;
            }
        }
        Value::Map(map)
    }

    fn parse_string(&mut self) -> Result<String, JsonError> {
        self.expect(b'"')?;
        let mut out = String::new();
        loop {
            let run_start = self.pos;
            while let Some(b) = self.peek() {
                if b == b'"' || b == b'\\' {
                    break;
                }
                self.pos += 1;
            }
            // Quote and backslash are ASCII, so the run ends on a char boundary.
            out.push_str(&self.text[run_start..self.pos]);
            match self.peek() {
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(_) => {
                    self.pos += 1;
                    self.parse_escape(&mut out)?;
                }
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<(), JsonError> {
        let Some(b) = self.peek() else {
            return Err(self.error("unterminated escape sequence"));
        };
        self.pos += 1;
        match b {
            b'"' => out.push('"'),
            b'\\' => out.push('\\'),
            b'/' => out.push('/'),
            b'b' => out.push('\u{8}'),
            b'f' => out.push('\u{c}'),
            b'n' => out.push('\n'),
            b'r' => out.push('\r'),
            b't' => out.push('\t'),
            b'u' => {
                let start = self.pos - 2;
                let first = self.parse_hex4()?;
                let c = match first {
                    0xD800..=0xDBFF => {
                        if !self.text[self.pos..].starts_with("\\u") {
                            return Err(JsonError::malformed("unpaired surrogate", start));
                        }
                        self.pos += 2;
                        let second = self.parse_hex4()?;
                        if !(0xDC00..=0xDFFF).contains(&second) {
                            return Err(JsonError::malformed("unpaired surrogate", start));
                        }
                        let scalar = 0x10000
                            + ((u32::from(first) - 0xD800) << 10)
                            + (u32::from(second) - 0xDC00);
                        char::from_u32(scalar)
                    }
                    0xDC00..=0xDFFF => None,
                    other => char::from_u32(u32::from(other)),
                };
                match c {
                    Some(c) => out.push(c),
                    None => return Err(JsonError::malformed("unpaired surrogate", start)),
                }
            }
            other => {
                return Err(JsonError::malformed(
                    format!("invalid escape '\\{}'", other as char),
                    self.pos - 2,
                ))
            }
        }
        Ok(())
    }

    fn parse_hex4(&mut self) -> Result<u16, JsonError> {
        let digits = self
            .bytes
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| self.error("truncated unicode escape"))?;
        let mut unit = 0u16;
        for &d in digits {
            let nibble = (d as char)
                .to_digit(16)
                .ok_or_else(|| self.error("invalid unicode escape"))?;
            unit = (unit << 4) | nibble as u16;
        }
        self.pos += 4;
        Ok(unit)
    }
}
