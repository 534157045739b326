use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::ast::Value;
use crate::error::{Position, SorrelError};
use crate::seq::List;

/// Reader macro, keyed by its trigger rune. Macros can be plugged into
/// the reader to extend, override or remove behavior per trigger.
pub type ReaderMacro = Arc<dyn Fn(&mut Reader, char) -> Result<Value, SorrelError> + Send + Sync>;

const DISPATCH_TRIGGER: char = '#';

static CHAR_LITERALS: Lazy<HashMap<&'static str, char>> = Lazy::new(|| {
    let mut table = HashMap::new();
    table.insert("tab", '\t');
    table.insert("space", ' ');
    table.insert("newline", '\n');
    table.insert("return", '\r');
    table.insert("backspace", '\u{0008}');
    table.insert("formfeed", '\u{000C}');
    table.insert("null", '\0');
    table
});

/// Configuration for `Reader::with_options`. `None` fields fall back
/// to the builtin number macro and the nil/true/false symbol map.
#[derive(Clone, Default)]
pub struct ReaderOptions {
    pub source_name: Option<String>,
    pub number_macro: Option<ReaderMacro>,
    pub predef_symbols: Option<HashMap<String, Value>>,
}

impl ReaderOptions {
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    pub fn with_number_macro(mut self, number_macro: ReaderMacro) -> Self {
        self.number_macro = Some(number_macro);
        self
    }

    /// Symbols resolved to values directly by the reader instead of
    /// being returned as symbols.
    pub fn with_predef_symbols(mut self, symbols: HashMap<String, Value>) -> Self {
        self.predef_symbols = Some(symbols);
        self
    }
}

fn default_predef() -> HashMap<String, Value> {
    let mut symbols = HashMap::new();
    symbols.insert("nil".to_string(), Value::Nil);
    symbols.insert("true".to_string(), Value::Bool(true));
    symbols.insert("false".to_string(), Value::Bool(false));
    symbols
}

/// Recursive-descent reader: turns a rune stream into a restartable
/// sequence of values via a table of macros keyed by trigger rune.
pub struct Reader {
    chars: Vec<char>,
    index: usize,
    source_name: String,
    macros: HashMap<char, ReaderMacro>,
    dispatch: HashMap<char, ReaderMacro>,
    number_macro: ReaderMacro,
    predef: HashMap<String, Value>,
}

impl Reader {
    pub fn new(source: &str) -> Self {
        Self::with_options(source, ReaderOptions::default())
    }

    pub fn with_options(source: &str, options: ReaderOptions) -> Self {
        let mut macros: HashMap<char, ReaderMacro> = HashMap::new();
        macros.insert('"', Arc::new(read_string));
        macros.insert(';', Arc::new(read_comment));
        macros.insert('(', Arc::new(read_list));
        macros.insert(')', unmatched_delimiter());
        macros.insert(']', unmatched_delimiter());
        macros.insert('}', unmatched_delimiter());
        macros.insert('\\', Arc::new(read_character));
        macros.insert(':', Arc::new(read_keyword));
        macros.insert('\'', quote_form_reader("quote"));
        macros.insert('~', quote_form_reader("unquote"));
        macros.insert('`', quote_form_reader("syntax-quote"));

        Self {
            chars: source.chars().collect(),
            index: 0,
            source_name: options
                .source_name
                .unwrap_or_else(|| "<string>".to_string()),
            macros,
            dispatch: HashMap::new(),
            number_macro: options.number_macro.unwrap_or_else(|| Arc::new(read_number)),
            predef: options.predef_symbols.unwrap_or_else(default_predef),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        Ok(Self::with_options(
            &source,
            ReaderOptions::default().with_source_name(path.display().to_string()),
        ))
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Install, override or remove the macro for `trigger`. Dispatch
    /// macros are reached via the two-rune `#<trigger>` prefix.
    /// Removing a macro falls back to default symbol reading for that
    /// trigger.
    pub fn set_macro(&mut self, trigger: char, dispatch: bool, macro_fn: Option<ReaderMacro>) {
        let table = if dispatch {
            &mut self.dispatch
        } else {
            &mut self.macros
        };
        match macro_fn {
            Some(m) => {
                table.insert(trigger, m);
            }
            None => {
                table.remove(&trigger);
            }
        }
    }

    /// Read the next form, transparently retrying past no-op forms
    /// such as comments.
    pub fn one(&mut self) -> Result<Value, SorrelError> {
        loop {
            match self.read_one() {
                Ok(value) => return Ok(value),
                Err(SorrelError::Skip) => continue,
                Err(err) => return Err(self.annotate(err)),
            }
        }
    }

    /// Read forms until end of input. The first error aborts the
    /// remaining reads.
    pub fn all(&mut self) -> Result<Vec<Value>, SorrelError> {
        let mut forms = Vec::new();
        loop {
            match self.one() {
                Ok(value) => forms.push(value),
                Err(SorrelError::Eof { .. }) => break,
                Err(err) => return Err(err),
            }
        }
        Ok(forms)
    }

    pub fn next_rune(&mut self) -> Result<char, SorrelError> {
        match self.chars.get(self.index) {
            Some(&c) => {
                self.index += 1;
                Ok(c)
            }
            None => Err(SorrelError::eof()),
        }
    }

    /// Step back one rune. No-op at the start of input.
    pub fn unread(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    /// True for whitespace (commas included), the dispatch trigger and
    /// every registered macro trigger.
    pub fn is_terminal(&self, r: char) -> bool {
        is_space(r) || r == DISPATCH_TRIGGER || self.macros.contains_key(&r)
    }

    pub fn skip_spaces(&mut self) {
        while let Some(&c) = self.chars.get(self.index) {
            if !is_space(c) {
                break;
            }
            self.index += 1;
        }
    }

    /// Collect runes starting with `init` until a terminal rune, which
    /// is left unconsumed.
    pub fn token(&mut self, init: Option<char>) -> Result<String, SorrelError> {
        let mut out = String::new();
        if let Some(c) = init {
            out.push(c);
        }
        loop {
            match self.next_rune() {
                Ok(r) => {
                    if self.is_terminal(r) {
                        self.unread();
                        break;
                    }
                    out.push(r);
                }
                Err(SorrelError::Eof { .. }) => break,
                Err(err) => return Err(err),
            }
        }
        Ok(out)
    }

    /// Read forms until `end`, skipping no-op forms. `kind` names the
    /// containing form in end-of-input errors.
    pub fn container(&mut self, end: char, kind: &str) -> Result<Vec<Value>, SorrelError> {
        let mut forms = Vec::new();
        loop {
            self.skip_spaces();
            match self.peek() {
                None => return Err(SorrelError::eof_in(kind)),
                Some(c) if c == end => {
                    self.index += 1;
                    break;
                }
                Some(_) => match self.read_one() {
                    Ok(value) => forms.push(value),
                    Err(SorrelError::Skip) => continue,
                    Err(err) => return Err(err),
                },
            }
        }
        Ok(forms)
    }

    /// Current line/column, 1-based.
    pub fn position(&self) -> Position {
        let mut line = 1;
        let mut col = 1;
        for &c in &self.chars[..self.index] {
            if c == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        Position { line, col }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn annotate(&self, err: SorrelError) -> SorrelError {
        err.with_file(self.source_name.clone()).with_pos(self.position())
    }

    /// Read exactly one form; comments surface as the skip signal.
    fn read_one(&mut self) -> Result<Value, SorrelError> {
        self.skip_spaces();
        let r = self.next_rune()?;

        if r.is_ascii_digit() {
            let number_macro = Arc::clone(&self.number_macro);
            return number_macro(self, r);
        }

        // A sign is only a number prefix when a digit follows.
        if r == '+' || r == '-' {
            if let Some(next) = self.peek() {
                if next.is_ascii_digit() {
                    let number_macro = Arc::clone(&self.number_macro);
                    return number_macro(self, r);
                }
            }
        }

        if r == DISPATCH_TRIGGER {
            if let Some(next) = self.peek() {
                if let Some(m) = self.dispatch.get(&next).cloned() {
                    self.index += 1;
                    return m(self, next);
                }
            }
        }

        if let Some(m) = self.macros.get(&r).cloned() {
            return m(self, r);
        }

        self.read_symbol(r)
    }

    fn read_symbol(&mut self, init: char) -> Result<Value, SorrelError> {
        let token = self.token(Some(init))?;
        if let Some(value) = self.predef.get(&token) {
            return Ok(value.clone());
        }
        Ok(Value::Symbol(token))
    }
}

fn is_space(r: char) -> bool {
    r.is_whitespace() || r == ','
}

fn unmatched_delimiter() -> ReaderMacro {
    Arc::new(|_rd, init| Err(SorrelError::unmatched_delimiter(init)))
}

fn quote_form_reader(expand: &'static str) -> ReaderMacro {
    Arc::new(move |rd, _init| match rd.read_one() {
        Ok(form) => Ok(Value::list(vec![Value::symbol(expand), form])),
        Err(SorrelError::Skip) => Err(SorrelError::invalid_form(format!(
            "cannot quote a no-op form after '{}'",
            expand
        ))),
        Err(SorrelError::Eof { .. }) => Err(SorrelError::eof_in(expand)),
        Err(err) => Err(err),
    })
}

fn read_number(rd: &mut Reader, init: char) -> Result<Value, SorrelError> {
    let token = rd.token(Some(init))?;

    let has_decimal = token.contains('.');
    let has_radix = token.contains('r');
    let has_scientific = token.contains('e');

    if has_radix && (has_decimal || has_scientific) {
        return Err(SorrelError::number_format(&token));
    }

    if has_scientific {
        return parse_scientific(&token);
    }

    if has_decimal {
        return token
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| SorrelError::number_format(&token));
    }

    if has_radix {
        return parse_radix(&token);
    }

    parse_int(&token)
        .map(Value::Int)
        .ok_or_else(|| SorrelError::number_format(&token))
}

/// `<mantissa>e<exponent>` with an integer exponent.
fn parse_scientific(token: &str) -> Result<Value, SorrelError> {
    let parts: Vec<&str> = token.split('e').collect();
    if parts.len() != 2 {
        return Err(SorrelError::number_format(token));
    }
    if parts[0].parse::<f64>().is_err() || parts[1].parse::<i64>().is_err() {
        return Err(SorrelError::number_format(token));
    }
    token
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| SorrelError::number_format(token))
}

/// `<base>r<digits>` with an optionally signed base in 2..=36.
fn parse_radix(token: &str) -> Result<Value, SorrelError> {
    let parts: Vec<&str> = token.split('r').collect();
    if parts.len() != 2 {
        return Err(SorrelError::number_format(token));
    }

    let mut base: i64 = parts[0]
        .parse()
        .map_err(|_| SorrelError::number_format(token))?;
    let negative = base < 0;
    if negative {
        base = -base;
    }
    if !(2..=36).contains(&base) {
        return Err(SorrelError::number_format(token));
    }

    let digits = parts[1];
    if digits.starts_with('+') || digits.starts_with('-') {
        return Err(SorrelError::number_format(token));
    }
    let value = i64::from_str_radix(digits, base as u32)
        .map_err(|_| SorrelError::number_format(token))?;

    Ok(Value::Int(if negative { -value } else { value }))
}

/// Signed integer with auto-detected base: `0x` hex, `0b` binary,
/// `0o` or a leading zero octal, decimal otherwise.
fn parse_int(token: &str) -> Option<i64> {
    let (negative, rest) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token.strip_prefix('+').unwrap_or(token)),
    };

    let (base, digits) = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        (16, hex)
    } else if let Some(bin) = rest.strip_prefix("0b").or_else(|| rest.strip_prefix("0B")) {
        (2, bin)
    } else if let Some(oct) = rest.strip_prefix("0o").or_else(|| rest.strip_prefix("0O")) {
        (8, oct)
    } else if rest.len() > 1 && rest.starts_with('0') {
        (8, &rest[1..])
    } else {
        (10, rest)
    };

    if digits.is_empty() || digits.starts_with('+') || digits.starts_with('-') {
        return None;
    }

    let value = i64::from_str_radix(digits, base).ok()?;
    Some(if negative { -value } else { value })
}

fn read_string(rd: &mut Reader, _init: char) -> Result<Value, SorrelError> {
    let mut out = String::new();
    loop {
        let r = match rd.next_rune() {
            Ok(r) => r,
            Err(SorrelError::Eof { .. }) => return Err(SorrelError::eof_in("string")),
            Err(err) => return Err(err),
        };

        if r == '\\' {
            let escape = match rd.next_rune() {
                Ok(r) => r,
                Err(SorrelError::Eof { .. }) => return Err(SorrelError::eof_in("string")),
                Err(err) => return Err(err),
            };
            out.push(escape_char(escape)?);
        } else if r == '"' {
            break;
        } else {
            out.push(r);
        }
    }
    Ok(Value::Str(out))
}

fn escape_char(c: char) -> Result<char, SorrelError> {
    match c {
        '"' => Ok('"'),
        '\\' => Ok('\\'),
        'n' => Ok('\n'),
        't' => Ok('\t'),
        'r' => Ok('\r'),
        'f' => Ok('\u{000C}'),
        'b' => Ok('\u{0008}'),
        other => Err(SorrelError::unknown_escape(other)),
    }
}

/// Discards through end of line and yields the skip signal.
fn read_comment(rd: &mut Reader, _init: char) -> Result<Value, SorrelError> {
    loop {
        match rd.next_rune() {
            Ok('\n') => break,
            Ok(_) => {}
            Err(err) => return Err(err),
        }
    }
    Err(SorrelError::Skip)
}

fn read_keyword(rd: &mut Reader, _init: char) -> Result<Value, SorrelError> {
    let token = rd.token(None)?;
    Ok(Value::Keyword(token))
}

fn read_character(rd: &mut Reader, _init: char) -> Result<Value, SorrelError> {
    let r = match rd.next_rune() {
        Ok(r) => r,
        Err(SorrelError::Eof { .. }) => return Err(SorrelError::eof_in("character")),
        Err(err) => return Err(err),
    };

    let token = rd.token(Some(r))?;
    let runes: Vec<char> = token.chars().collect();
    if runes.len() == 1 {
        return Ok(Value::Char(runes[0]));
    }

    if let Some(&c) = CHAR_LITERALS.get(token.as_str()) {
        return Ok(Value::Char(c));
    }

    if let Some(hex) = token.strip_prefix('u') {
        return parse_unicode_char(&token, hex);
    }

    Err(SorrelError::unsupported_char(token))
}

/// `u` followed by exactly four hex digits naming a Unicode scalar.
fn parse_unicode_char(token: &str, hex: &str) -> Result<Value, SorrelError> {
    if hex.chars().count() != 4 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SorrelError::invalid_unicode(token));
    }
    let code = u32::from_str_radix(hex, 16).map_err(|_| SorrelError::invalid_unicode(token))?;
    char::from_u32(code)
        .map(Value::Char)
        .ok_or_else(|| SorrelError::invalid_unicode(token))
}

fn read_list(rd: &mut Reader, _init: char) -> Result<Value, SorrelError> {
    let forms = rd.container(')', "list")?;
    Ok(Value::List(List::from_vec(forms)))
}
