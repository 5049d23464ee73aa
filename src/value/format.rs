//! Format pipelines applied to resolved values
//!
//! A pipeline is the colon-separated tail of a variable, e.g. the
//! `lower:strip` in `{project.name:lower:strip}`. Each operator is either a
//! named text transform or a generic specifier:
//!
//! ```text
//! upper lower title strip lstrip rstrip    named transforms
//! 04d  >8  .2f  #x  ,                      [[fill]align][sign][#][0][width][,|_][.precision][type]
//! %Y-%m-%d                                 strftime, for date values
//! ```

use std::fmt::Write;
use std::ops::Range;

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveTime;

use crate::error::TemplateError;
use crate::value::Value;

/// One step of a format pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum FormatOp {
    Upper,
    Lower,
    Title,
    Strip,
    LStrip,
    RStrip,
    /// Standard format specifier (`04d`, `>8`, `.2f`)
    Spec(FormatSpec),
    /// strftime pattern for dates (`%Y-%m-%d`)
    Strftime(String),
}

impl FormatOp {
    /// Parse a single operator; the error is a human-readable message
    pub fn parse(op: &str) -> Result<FormatOp, String> {
        let named = match op {
            "upper" => Some(FormatOp::Upper),
            "lower" => Some(FormatOp::Lower),
            "title" => Some(FormatOp::Title),
            "strip" => Some(FormatOp::Strip),
            "lstrip" => Some(FormatOp::LStrip),
            "rstrip" => Some(FormatOp::RStrip),
            _ => None,
        };
        if let Some(named) = named {
            return Ok(named);
        }

        match FormatSpec::parse(op) {
            Ok(spec) => Ok(FormatOp::Spec(spec)),
            Err(_) if op.contains('%') => {
                if StrftimeItems::new(op).any(|item| matches!(item, Item::Error)) {
                    Err(format!("invalid date format '{}'", op))
                } else {
                    Ok(FormatOp::Strftime(op.to_string()))
                }
            }
            Err(message) => Err(message),
        }
    }

    /// Apply this operator to the output of the previous one
    pub fn apply(&self, value: Value) -> Result<Value, TemplateError> {
        let text = match self {
            FormatOp::Upper => value.to_string().to_uppercase(),
            FormatOp::Lower => value.to_string().to_lowercase(),
            FormatOp::Title => title_case(&value.to_string()),
            FormatOp::Strip => value.to_string().trim().to_string(),
            FormatOp::LStrip => value.to_string().trim_start().to_string(),
            FormatOp::RStrip => value.to_string().trim_end().to_string(),
            FormatOp::Spec(spec) => spec.apply(&value).map_err(|message| TemplateError::Format {
                spec: spec.text.clone(),
                value: value.to_string(),
                message,
            })?,
            FormatOp::Strftime(pattern) => {
                strftime(&value, pattern).map_err(|message| TemplateError::Format {
                    spec: pattern.clone(),
                    value: value.to_string(),
                    message,
                })?
            }
        };
        Ok(Value::String(text))
    }
}

/// Ordered list of format operators
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pipeline {
    ops: Vec<FormatOp>,
}

impl Pipeline {
    pub fn new(ops: Vec<FormatOp>) -> Self {
        Self { ops }
    }

    /// Parse the text after a variable's first colon
    ///
    /// On failure returns the byte range of the offending operator within
    /// `text` together with a message.
    pub fn parse(text: &str) -> Result<Self, (Range<usize>, String)> {
        if text.is_empty() {
            return Ok(Self::default());
        }

        let mut ops = Vec::new();
        let mut offset = 0;
        for op in text.split(':') {
            let parsed = FormatOp::parse(op).map_err(|message| (offset..offset + op.len(), message))?;
            ops.push(parsed);
            offset += op.len() + 1;
        }
        Ok(Self { ops })
    }

    pub fn ops(&self) -> &[FormatOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Run the pipeline left to right and render the final value
    pub fn apply(&self, value: &Value) -> Result<String, TemplateError> {
        let mut current = value.clone();
        for op in &self.ops {
            current = op.apply(current)?;
        }
        Ok(current.to_string())
    }
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_cased = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_cased {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_cased = true;
        } else {
            out.push(c);
            prev_cased = false;
        }
    }
    out
}

fn strftime(value: &Value, pattern: &str) -> Result<String, String> {
    let mut out = String::new();
    let written = match value {
        Value::Date(date) => write!(out, "{}", date.and_time(NaiveTime::MIN).format(pattern)),
        Value::DateTime(dt) => write!(out, "{}", dt.format(pattern)),
        other => {
            return Err(format!(
                "date format applied to a {} value",
                other.type_name()
            ))
        }
    };
    written.map_err(|_| format!("'{}' does not apply to a {}", pattern, value.type_name()))?;
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Center,
    /// Padding goes between the sign and the digits (`=`)
    AfterSign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
    Space,
}

/// A parsed standard format specifier
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormatSpec {
    pub text: String,
    pub fill: Option<char>,
    pub align: Option<Align>,
    pub sign: Option<Sign>,
    pub alternate: bool,
    pub zero: bool,
    pub width: Option<usize>,
    pub grouping: Option<char>,
    pub precision: Option<usize>,
    pub kind: Option<char>,
}

const SPEC_TYPES: &str = "sdnboxXeEfFgG%";

fn align_of(c: char) -> Option<Align> {
    match c {
        '<' => Some(Align::Left),
        '>' => Some(Align::Right),
        '^' => Some(Align::Center),
        '=' => Some(Align::AfterSign),
        _ => None,
    }
}

impl FormatSpec {
    pub fn parse(text: &str) -> Result<Self, String> {
        let chars: Vec<char> = text.chars().collect();
        let mut spec = FormatSpec {
            text: text.to_string(),
            ..Default::default()
        };
        let mut i = 0;

        if chars.len() >= 2 && align_of(chars[1]).is_some() {
            spec.fill = Some(chars[0]);
            spec.align = align_of(chars[1]);
            i = 2;
        } else if let Some(align) = chars.first().and_then(|c| align_of(*c)) {
            spec.align = Some(align);
            i = 1;
        }

        spec.sign = match chars.get(i) {
            Some('+') => Some(Sign::Plus),
            Some('-') => Some(Sign::Minus),
            Some(' ') => Some(Sign::Space),
            _ => None,
        };
        if spec.sign.is_some() {
            i += 1;
        }

        if chars.get(i) == Some(&'#') {
            spec.alternate = true;
            i += 1;
        }
        if chars.get(i) == Some(&'0') {
            spec.zero = true;
            i += 1;
        }

        let start = i;
        while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
            i += 1;
        }
        if i > start {
            spec.width = Some(parse_number(&chars[start..i])?);
        }

        if let Some(&c) = chars.get(i).filter(|c| **c == ',' || **c == '_') {
            spec.grouping = Some(c);
            i += 1;
        }

        if chars.get(i) == Some(&'.') {
            i += 1;
            let start = i;
            while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
                i += 1;
            }
            if i == start {
                return Err(format!("format '{}' is missing a precision", text));
            }
            spec.precision = Some(parse_number(&chars[start..i])?);
        }

        if let Some(&c) = chars.get(i).filter(|c| SPEC_TYPES.contains(**c)) {
            spec.kind = Some(c);
            i += 1;
        }

        if i != chars.len() {
            return Err(format!("invalid format specifier '{}'", text));
        }
        Ok(spec)
    }

    /// Render `value` according to this specifier
    pub fn apply(&self, value: &Value) -> Result<String, String> {
        match value {
            Value::Int(i) => self.format_int(*i),
            Value::Float(x) => self.format_float(*x),
            Value::Bool(b) if !self.text.is_empty() => self.format_int(i64::from(*b)),
            other => self.format_text(&other.to_string(), other.type_name()),
        }
    }

    fn format_text(&self, text: &str, type_name: &str) -> Result<String, String> {
        if let Some(kind) = self.kind.filter(|k| *k != 's') {
            return Err(format!("unknown format code '{}' for a {} value", kind, type_name));
        }
        if self.sign.is_some() {
            return Err("sign not allowed for text".to_string());
        }
        if self.align == Some(Align::AfterSign) {
            return Err("'=' alignment not allowed for text".to_string());
        }
        if self.grouping.is_some() {
            return Err("grouping not allowed for text".to_string());
        }
        let body: String = match self.precision {
            Some(p) => text.chars().take(p).collect(),
            None => text.to_string(),
        };
        Ok(self.pad("", &body, false))
    }

    fn format_int(&self, value: i64) -> Result<String, String> {
        let kind = self.kind.unwrap_or('d');
        if matches!(kind, 'e' | 'E' | 'f' | 'F' | 'g' | 'G' | '%') {
            return self.format_float(value as f64);
        }
        if kind == 's' {
            return Err("unknown format code 's' for an int value".to_string());
        }
        if self.precision.is_some() {
            return Err("precision not allowed for integer formats".to_string());
        }

        let magnitude = value.unsigned_abs();
        let (digits, prefix, group_size) = match kind {
            'b' => (format!("{:b}", magnitude), "0b", 4),
            'o' => (format!("{:o}", magnitude), "0o", 4),
            'x' => (format!("{:x}", magnitude), "0x", 4),
            'X' => (format!("{:X}", magnitude), "0X", 4),
            _ => (magnitude.to_string(), "", 3),
        };
        let digits = match self.grouping {
            Some(sep) => group_digits(&digits, sep, group_size),
            None => digits,
        };

        let mut lead = self.sign_text(value < 0);
        if self.alternate {
            lead.push_str(prefix);
        }
        Ok(self.pad(&lead, &digits, true))
    }

    fn format_float(&self, value: f64) -> Result<String, String> {
        let kind = self.kind;
        if let Some(k) = kind.filter(|k| matches!(k, 's' | 'd' | 'n' | 'b' | 'o' | 'x' | 'X')) {
            return Err(format!("unknown format code '{}' for a float value", k));
        }

        let negative = value.is_sign_negative() && !value.is_nan();
        let magnitude = value.abs();
        let upper = matches!(kind, Some('E' | 'F' | 'G'));

        let body = if !magnitude.is_finite() {
            if magnitude.is_nan() { "nan" } else { "inf" }.to_string()
        } else {
            match kind {
                Some('f' | 'F') => format!("{:.*}", self.precision.unwrap_or(6), magnitude),
                Some('e' | 'E') => exponent_form(magnitude, self.precision.unwrap_or(6)),
                Some('%') => format!("{:.*}%", self.precision.unwrap_or(6), magnitude * 100.0),
                Some(_) => general_form(magnitude, self.precision.unwrap_or(6), self.alternate, false),
                None => match self.precision {
                    Some(p) => general_form(magnitude, p, self.alternate, true),
                    None => Value::Float(magnitude).to_string(),
                },
            }
        };
        let body = if upper { body.to_uppercase() } else { body };

        let body = match self.grouping {
            Some(sep) if magnitude.is_finite() => {
                let split = body.find(['.', 'e', 'E', '%']).unwrap_or(body.len());
                format!("{}{}", group_digits(&body[..split], sep, 3), &body[split..])
            }
            _ => body,
        };

        Ok(self.pad(&self.sign_text(negative), &body, true))
    }

    fn sign_text(&self, negative: bool) -> String {
        if negative {
            return "-".to_string();
        }
        match self.sign {
            Some(Sign::Plus) => "+".to_string(),
            Some(Sign::Space) => " ".to_string(),
            _ => String::new(),
        }
    }

    fn pad(&self, lead: &str, body: &str, numeric: bool) -> String {
        let len = lead.chars().count() + body.chars().count();
        let width = self.width.unwrap_or(0);
        if len >= width {
            return format!("{}{}", lead, body);
        }

        let count = width - len;
        let fill = self.fill.unwrap_or(if self.zero { '0' } else { ' ' });
        let align = self.align.unwrap_or(match (numeric, self.zero) {
            (true, true) => Align::AfterSign,
            (true, false) => Align::Right,
            (false, _) => Align::Left,
        });
        let filler = |n: usize| fill.to_string().repeat(n);

        match align {
            Align::Left => format!("{}{}{}", lead, body, filler(count)),
            Align::Right => format!("{}{}{}", filler(count), lead, body),
            Align::Center => {
                let left = count / 2;
                format!("{}{}{}{}", filler(left), lead, body, filler(count - left))
            }
            Align::AfterSign => format!("{}{}{}", lead, filler(count), body),
        }
    }
}

fn parse_number(digits: &[char]) -> Result<usize, String> {
    let text: String = digits.iter().collect();
    text.parse()
        .map_err(|_| format!("number '{}' is too large", text))
}

fn group_digits(digits: &str, sep: char, size: usize) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut out = String::with_capacity(digits.len() + digits.len() / size);
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % size == 0 {
            out.push(sep);
        }
        out.push(*c);
    }
    out
}

/// `1234.5` with precision 2 -> `1.23e+03`
fn exponent_form(value: f64, precision: usize) -> String {
    let raw = format!("{:.*e}", precision, value);
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            format!(
                "{}e{}{:02}",
                mantissa,
                if exp < 0 { '-' } else { '+' },
                exp.abs()
            )
        }
        None => raw,
    }
}

/// General format: fixed or exponent notation depending on magnitude,
/// with `precision` significant digits and trailing zeros removed
fn general_form(value: f64, precision: usize, keep_zeros: bool, min_one_decimal: bool) -> String {
    let precision = precision.max(1);
    let raw = format!("{:.*e}", precision - 1, value);
    let exp: i32 = raw
        .split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);

    if exp >= -4 && exp < precision as i32 {
        let decimals = (precision as i32 - 1 - exp).max(0) as usize;
        let fixed = format!("{:.*}", decimals, value);
        let mut fixed = if keep_zeros {
            fixed
        } else {
            strip_zeros(&fixed)
        };
        if min_one_decimal && !fixed.contains('.') {
            fixed.push_str(".0");
        }
        fixed
    } else {
        let formatted = exponent_form(value, precision - 1);
        match formatted.split_once('e') {
            Some((mantissa, exp)) if !keep_zeros => format!("{}e{}", strip_zeros(mantissa), exp),
            _ => formatted,
        }
    }
}

fn strip_zeros(number: &str) -> String {
    if number.contains('.') {
        number
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        number.to_string()
    }
}
