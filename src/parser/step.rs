use std::collections::BTreeMap;

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum StepValue {
    String(String),
    Real(f64),
    Integer(i64),
    Boolean(bool),
    Enum(String),
    Reference(u64),
    List(Vec<StepValue>),
    /// Select value wrapped in its type, e.g. `IFCLENGTHMEASURE(2.5)`.
    Typed {
        type_name: String,
        value: Box<StepValue>,
    },
    Null,
    Derived,
}

impl StepValue {
    /// The value with any type wrapper removed.
    #[must_use]
    pub fn untyped(&self) -> &StepValue {
        match self {
            StepValue::Typed { value, .. } => value.untyped(),
            other => other,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        match self {
            StepValue::Typed { type_name, .. } => Some(type_name),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_reference(&self) -> Option<u64> {
        match self {
            StepValue::Reference(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self.untyped() {
            StepValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_enum(&self) -> Option<&str> {
        match self.untyped() {
            StepValue::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// Numeric value; integers are widened since STEP writers emit `0` and `0.` interchangeably.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self.untyped() {
            StepValue::Real(f) => Some(*f),
            StepValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[StepValue]> {
        match self.untyped() {
            StepValue::List(list) => Some(list),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StepEntity {
    pub id: u64,
    pub entity_type: String,
    pub values: Vec<StepValue>,
}

impl StepEntity {
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&StepValue> {
        self.values.get(index)
    }

    /// Attribute as a string, `None` for `$` and for non-string values.
    #[must_use]
    pub fn get_str(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(StepValue::as_str)
    }

    #[must_use]
    pub fn get_ref(&self, index: usize) -> Option<u64> {
        self.get(index).and_then(StepValue::as_reference)
    }

    #[must_use]
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(StepValue::as_f64)
    }

    #[must_use]
    pub fn get_list(&self, index: usize) -> Option<&[StepValue]> {
        self.get(index).and_then(StepValue::as_list)
    }

    /// References held in a list attribute, ignoring non-reference items.
    #[must_use]
    pub fn get_ref_list(&self, index: usize) -> Vec<u64> {
        self.get_list(index)
            .map(|list| list.iter().filter_map(StepValue::as_reference).collect())
            .unwrap_or_default()
    }
}

/// A parsed ISO 10303-21 exchange file.
///
/// Entities are keyed by instance id, so iteration follows file numbering.
#[derive(Debug)]
pub struct StepFile {
    pub entities: BTreeMap<u64, StepEntity>,
    pub schema: String,
}

impl StepFile {
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        let mut entities = BTreeMap::new();
        let mut schema = String::new();
        let mut in_data = false;
        let mut saw_data = false;

        for statement in split_statements(content) {
            let statement = statement.trim();

            if statement.starts_with("FILE_SCHEMA") {
                // FILE_SCHEMA(('IFC4')): a single parameter holding a list of names
                let first_name = statement
                    .find('(')
                    .map(|start| parse_single_value(&statement[start..]))
                    .and_then(|params| match params {
                        StepValue::List(mut params) if !params.is_empty() => {
                            Some(params.swap_remove(0))
                        }
                        _ => None,
                    });
                if let Some(StepValue::List(names)) = first_name {
                    if let Some(StepValue::String(name)) = names.first() {
                        schema.clone_from(name);
                    }
                }
                continue;
            }

            if statement == "DATA" || statement.starts_with("DATA(") {
                in_data = true;
                saw_data = true;
                continue;
            }
            if statement == "ENDSEC" {
                in_data = false;
                continue;
            }

            if in_data && statement.starts_with('#') {
                let entity = parse_entity(statement).ok_or_else(|| ParseError::InvalidStep {
                    message: format!("malformed entity instance '{}'", abbreviate(statement)),
                })?;
                entities.insert(entity.id, entity);
            }
        }

        if !saw_data {
            return Err(ParseError::InvalidStep {
                message: "missing DATA section".to_string(),
            });
        }

        Ok(StepFile { entities, schema })
    }

    #[must_use]
    pub fn get_entity(&self, id: u64) -> Option<&StepEntity> {
        self.entities.get(&id)
    }

    #[must_use]
    pub fn get_entities_by_type(&self, entity_type: &str) -> Vec<&StepEntity> {
        self.entities
            .values()
            .filter(|e| e.entity_type == entity_type)
            .collect()
    }
}

/// Splits the file into `;`-terminated statements, skipping comments and
/// keeping string literals intact.
fn split_statements(content: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' => {
                in_string = !in_string;
                current.push(ch);
            }
            '/' if !in_string && chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = '\0';
                for c in chars.by_ref() {
                    if previous == '*' && c == '/' {
                        break;
                    }
                    previous = c;
                }
            }
            ';' if !in_string => {
                statements.push(std::mem::take(&mut current));
            }
            '\r' | '\n' if !in_string => current.push(' '),
            _ => current.push(ch),
        }
    }

    statements
}

fn parse_entity(statement: &str) -> Option<StepEntity> {
    // Format: #123=IFCWALL('guid',#ref,'name',...)
    let eq_pos = statement.find('=')?;
    let id: u64 = statement[1..eq_pos].trim().parse().ok()?;

    let rest = statement[eq_pos + 1..].trim();
    let paren_pos = rest.find('(')?;
    let entity_type = rest[..paren_pos].trim().to_ascii_uppercase();
    if entity_type.is_empty() || !rest.ends_with(')') {
        return None;
    }

    let values = parse_values(&rest[paren_pos + 1..rest.len() - 1]);

    Some(StepEntity {
        id,
        entity_type,
        values,
    })
}

fn parse_values(s: &str) -> Vec<StepValue> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut paren_depth = 0usize;

    for ch in s.chars() {
        match ch {
            '\'' => {
                in_string = !in_string;
                current.push(ch);
            }
            '(' if !in_string => {
                paren_depth += 1;
                current.push(ch);
            }
            ')' if !in_string => {
                paren_depth = paren_depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if !in_string && paren_depth == 0 => {
                values.push(parse_single_value(&current));
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() || !values.is_empty() {
        values.push(parse_single_value(&current));
    }

    values
}

fn parse_single_value(s: &str) -> StepValue {
    let s = s.trim();

    match s {
        "$" | "" => return StepValue::Null,
        "*" => return StepValue::Derived,
        _ => {}
    }

    if let Some(id) = s.strip_prefix('#').and_then(|r| r.parse::<u64>().ok()) {
        return StepValue::Reference(id);
    }
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
        return StepValue::String(decode_step_string(&s[1..s.len() - 1]));
    }
    if s.len() >= 2 && s.starts_with('.') && s.ends_with('.') {
        return match &s[1..s.len() - 1] {
            "T" => StepValue::Boolean(true),
            "F" => StepValue::Boolean(false),
            inner => StepValue::Enum(inner.to_string()),
        };
    }
    if s.starts_with('(') && s.ends_with(')') {
        return StepValue::List(parse_values(&s[1..s.len() - 1]));
    }
    if let Ok(i) = s.parse::<i64>() {
        return StepValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return StepValue::Real(f);
    }
    // Typed value like IFCLENGTHMEASURE(2.5)
    if let Some(paren_pos) = s.find('(') {
        if s.ends_with(')') {
            return StepValue::Typed {
                type_name: s[..paren_pos].trim().to_ascii_uppercase(),
                value: Box::new(parse_single_value(&s[paren_pos + 1..s.len() - 1])),
            };
        }
    }

    StepValue::String(s.to_string())
}

fn abbreviate(statement: &str) -> String {
    const LIMIT: usize = 60;
    match statement.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &statement[..cut]),
        None => statement.to_string(),
    }
}

/// Decodes the escape sequences of a STEP string literal body.
///
/// Handles `''`, `\\`, `\S\c` (ISO 8859 upper half), `\X\hh` (8-bit code
/// point) and `\X2\hhhh...\X0\` / `\X4\hhhhhhhh...\X0\` (UCS-2 / UCS-4 runs).
fn decode_step_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(ch) = rest.chars().next() {
        if let Some(after) = rest.strip_prefix("''") {
            out.push('\'');
            rest = after;
        } else if let Some(after) = rest.strip_prefix("\\\\") {
            out.push('\\');
            rest = after;
        } else if let Some(after) = rest.strip_prefix("\\S\\") {
            let mut tail = after.chars();
            if let Some(c) = tail.next() {
                if let Some(shifted) = char::from_u32(u32::from(c) + 0x80) {
                    out.push(shifted);
                }
            }
            rest = tail.as_str();
        } else if let Some(after) = rest.strip_prefix("\\X\\") {
            let code = after.get(..2).and_then(|h| u32::from_str_radix(h, 16).ok());
            match code.and_then(char::from_u32) {
                Some(c) => {
                    out.push(c);
                    rest = &after[2..];
                }
                None => {
                    out.push_str("\\X\\");
                    rest = after;
                }
            }
        } else if let Some((width, after)) = rest
            .strip_prefix("\\X2\\")
            .map(|a| (4, a))
            .or_else(|| rest.strip_prefix("\\X4\\").map(|a| (8, a)))
        {
            let end = after.find("\\X0\\").unwrap_or(after.len());
            let hex = &after[..end];
            for chunk in hex.as_bytes().chunks(width) {
                let decoded = std::str::from_utf8(chunk)
                    .ok()
                    .and_then(|h| u32::from_str_radix(h, 16).ok())
                    .and_then(char::from_u32);
                if let Some(c) = decoded {
                    out.push(c);
                }
            }
            rest = after.get(end + 4..).unwrap_or("");
        } else {
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }

    out
}
