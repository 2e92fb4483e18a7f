//! Filename templates.
//!
//! A template such as `{id}_{memo}.save.sm` is used in both directions: it is
//! formatted with concrete field values to produce a filename, and compiled
//! into an anchored regular expression that recovers those values from a
//! filename. Every placeholder becomes a lazy `(.*?)` group, so captured text
//! is assigned back to fields purely by position. A field value containing the
//! literal text that follows its placeholder is therefore split at the wrong
//! place when matched.

use std::fmt;

use regex::Regex;

use crate::archive::{CoreError, CoreErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Slot,
    Annotation,
}

impl Field {
    fn from_placeholder(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "slot" => Some(Self::Slot),
            "annotation" | "memo" => Some(Self::Annotation),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Id => "id",
            Self::Slot => "slot",
            Self::Annotation => "annotation",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// Concrete values substituted into a template by [`Template::format`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FieldValues<'a> {
    pub id: Option<u64>,
    pub slot: Option<&'a str>,
    pub annotation: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
    pattern: Regex,
}

impl Template {
    /// Parses `source`, accepting `{{` and `}}` as literal braces.
    pub fn parse(source: &str) -> Result<Self, CoreError> {
        let segments = parse_segments(source)?;

        let mut seen = Vec::new();
        for segment in &segments {
            if let Segment::Field(field) = segment {
                if seen.contains(field) {
                    return Err(CoreError::configuration(format!(
                        "template '{source}' uses placeholder {{{field}}} more than once"
                    )));
                }
                seen.push(*field);
            }
        }

        let mut raw = String::from("^");
        for segment in &segments {
            match segment {
                Segment::Literal(text) => raw.push_str(&regex::escape(text)),
                Segment::Field(_) => raw.push_str("(.*?)"),
            }
        }
        raw.push('$');
        let pattern = Regex::new(&raw).map_err(|e| {
            CoreError::configuration(format!("template '{source}' produced invalid pattern: {e}"))
        })?;

        Ok(Self {
            source: source.to_string(),
            segments,
            pattern,
        })
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Placeholders in the order they appear.
    pub fn fields(&self) -> Vec<Field> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Field(field) => Some(*field),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    fn position(&self, field: Field) -> Option<usize> {
        self.fields().iter().position(|f| *f == field)
    }

    pub fn require(&self, field: Field) -> Result<(), CoreError> {
        if self.position(field).is_none() {
            return Err(CoreError::configuration(format!(
                "template '{}' is missing required placeholder {{{field}}}",
                self.source
            )));
        }
        Ok(())
    }

    pub fn require_order(&self, before: Field, after: Field) -> Result<(), CoreError> {
        self.require(before)?;
        self.require(after)?;
        if self.position(before) > self.position(after) {
            return Err(CoreError::configuration(format!(
                "template '{}' must place {{{before}}} before {{{after}}}",
                self.source
            )));
        }
        Ok(())
    }

    pub fn allow_only(&self, allowed: &[Field]) -> Result<(), CoreError> {
        if let Some(field) = self.fields().into_iter().find(|f| !allowed.contains(f)) {
            return Err(CoreError::configuration(format!(
                "template '{}' cannot use placeholder {{{field}}}",
                self.source
            )));
        }
        Ok(())
    }

    pub fn format(&self, values: &FieldValues<'_>) -> Result<String, CoreError> {
        let mut out = String::with_capacity(self.source.len() + 16);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(Field::Id) => match values.id {
                    Some(id) => out.push_str(&id.to_string()),
                    None => return Err(self.missing_value(Field::Id)),
                },
                Segment::Field(Field::Slot) => match values.slot {
                    Some(slot) => out.push_str(slot),
                    None => return Err(self.missing_value(Field::Slot)),
                },
                Segment::Field(Field::Annotation) => match values.annotation {
                    Some(annotation) => out.push_str(annotation),
                    None => return Err(self.missing_value(Field::Annotation)),
                },
            }
        }
        Ok(out)
    }

    /// Captured text for each placeholder, in template order.
    pub fn match_name<'a>(&self, name: &'a str) -> Option<Vec<&'a str>> {
        let captures = self.pattern.captures(name)?;
        Some(
            captures
                .iter()
                .skip(1)
                .map(|group| group.map_or("", |m| m.as_str()))
                .collect(),
        )
    }

    fn missing_value(&self, field: Field) -> CoreError {
        CoreError::configuration(format!(
            "no value supplied for {{{field}}} in template '{}'",
            self.source
        ))
    }
}

fn parse_segments(source: &str) -> Result<Vec<Segment>, CoreError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => {
                            return Err(CoreError::configuration(format!(
                                "template '{source}' has an unclosed placeholder"
                            )));
                        }
                        Some(other) => name.push(other),
                    }
                }
                let field = Field::from_placeholder(name.trim()).ok_or_else(|| {
                    CoreError::configuration(format!(
                        "template '{source}' has unknown placeholder {{{name}}}"
                    ))
                })?;
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Field(field));
            }
            '}' => {
                return Err(CoreError::new(
                    CoreErrorCode::Configuration,
                    format!("template '{source}' has an unmatched '}}'"),
                ));
            }
            other => literal.push(other),
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Locates the external game's save file for a slot.
#[derive(Debug, Clone)]
pub struct GameSaveCodec {
    template: Template,
}

impl GameSaveCodec {
    pub fn new(source: &str) -> Result<Self, CoreError> {
        let template = Template::parse(source)?;
        template.require(Field::Slot)?;
        template.allow_only(&[Field::Slot])?;
        Ok(Self { template })
    }

    pub fn format(&self, slot: &str) -> Result<String, CoreError> {
        self.template.format(&FieldValues {
            slot: Some(slot),
            ..FieldValues::default()
        })
    }

    pub fn slot<'a>(&self, name: &'a str) -> Option<&'a str> {
        self.template.match_name(name)?.first().copied()
    }
}

/// Archived payload names, carrying `(id, annotation)`.
#[derive(Debug, Clone)]
pub struct PayloadCodec {
    template: Template,
}

impl PayloadCodec {
    pub fn new(source: &str) -> Result<Self, CoreError> {
        let template = Template::parse(source)?;
        template.require_order(Field::Id, Field::Annotation)?;
        template.allow_only(&[Field::Id, Field::Annotation])?;
        Ok(Self { template })
    }

    pub fn format(&self, id: u64, annotation: &str) -> Result<String, CoreError> {
        self.template.format(&FieldValues {
            id: Some(id),
            annotation: Some(annotation),
            ..FieldValues::default()
        })
    }

    /// Returns the raw `(id, annotation)` text; the id is not yet validated.
    pub fn decode<'a>(&self, name: &'a str) -> Option<(&'a str, &'a str)> {
        match self.template.match_name(name)?.as_slice() {
            [id, annotation] => Some((*id, *annotation)),
            _ => None,
        }
    }
}

/// Slot marker names, carrying `(slot, id)`.
#[derive(Debug, Clone)]
pub struct MarkerCodec {
    template: Template,
}

impl MarkerCodec {
    pub fn new(source: &str) -> Result<Self, CoreError> {
        let template = Template::parse(source)?;
        template.require_order(Field::Slot, Field::Id)?;
        template.allow_only(&[Field::Slot, Field::Id])?;
        Ok(Self { template })
    }

    pub fn format(&self, slot: &str, id: u64) -> Result<String, CoreError> {
        self.template.format(&FieldValues {
            id: Some(id),
            slot: Some(slot),
            ..FieldValues::default()
        })
    }

    /// Returns the raw `(slot, id)` text; the id is not yet validated.
    pub fn decode<'a>(&self, name: &'a str) -> Option<(&'a str, &'a str)> {
        match self.template.match_name(name)?.as_slice() {
            [slot, id] => Some((*slot, *id)),
            _ => None,
        }
    }
}
