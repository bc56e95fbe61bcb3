//! Graph mutations
//!
//! A [`Mutation`] is a batch of set and delete edits. Edits can be built in
//! code or parsed from the RDF N-Quad subset:
//!
//! ```text
//! _:alice <xid> "xid-1" .
//! _:alice <friend> _:bob .
//! <0x2a>  <name> "Bob \"the\" builder" .
//! <0x2a>  <nick> * .            # delete edits only
//! ```

use tessera_core::{Error, Result, Uid};

/// Entity an edit applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subject {
    /// New entity named within the transaction (`_:label`)
    Blank(String),
    /// Existing entity (`<0x2a>`)
    Uid(Uid),
}

/// Right-hand side of an edit
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Untyped literal, converted using the predicate's schema type
    Literal(String),
    /// Edge to an existing entity
    Uid(Uid),
    /// Edge to a blank node of the same transaction
    Blank(String),
    /// Every value (delete edits only)
    Star,
}

/// A single `subject <predicate> object` edit
#[derive(Debug, Clone, PartialEq)]
pub struct Edit {
    /// Entity being changed
    pub subject: Subject,
    /// Attribute name
    pub predicate: String,
    /// New value or value to remove
    pub object: Object,
}

impl Edit {
    /// Edit with a literal object
    pub fn literal(subject: Subject, predicate: impl Into<String>, literal: impl Into<String>) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object: Object::Literal(literal.into()),
        }
    }
}

/// Batch of edits applied within one transaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mutation {
    /// Values to write
    pub set: Vec<Edit>,
    /// Values to remove
    pub delete: Vec<Edit>,
    /// Commit the transaction right after applying the edits
    pub commit_now: bool,
}

impl Mutation {
    /// Empty mutation
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutation whose set edits are parsed from N-Quads
    pub fn from_set_nquads(text: &str) -> Result<Self> {
        Ok(Self {
            set: parse_nquads(text, false)?,
            ..Self::default()
        })
    }

    /// Mutation whose delete edits are parsed from N-Quads
    pub fn from_delete_nquads(text: &str) -> Result<Self> {
        Ok(Self {
            delete: parse_nquads(text, true)?,
            ..Self::default()
        })
    }

    /// Append a set edit
    pub fn with_set(mut self, edit: Edit) -> Self {
        self.set.push(edit);
        self
    }

    /// Append a delete edit
    pub fn with_delete(mut self, edit: Edit) -> Self {
        self.delete.push(edit);
        self
    }

    /// Commit as part of the mutate call
    pub fn commit_now(mut self) -> Self {
        self.commit_now = true;
        self
    }

    /// Whether there is nothing to apply
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.delete.is_empty()
    }
}

/// Parse N-Quad lines into edits
///
/// `*` objects are accepted only when `allow_star` is set.
pub fn parse_nquads(text: &str, allow_star: bool) -> Result<Vec<Edit>> {
    let mut edits = Vec::new();
    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let edit = Cursor::new(line)
            .edit(allow_star)
            .map_err(|msg| Error::InvalidInput(format!("nquad line {}: {}", line_no + 1, msg)))?;
        edits.push(edit);
    }
    Ok(edits)
}

struct Cursor<'a> {
    rest: &'a str,
}

type ParseResult<T> = std::result::Result<T, String>;

impl<'a> Cursor<'a> {
    fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    fn edit(mut self, allow_star: bool) -> ParseResult<Edit> {
        let subject = match self.term()? {
            Term::Iri(iri) => Subject::Uid(parse_uid(iri)?),
            Term::Blank(label) => Subject::Blank(label.to_string()),
            _ => return Err("subject must be a uid or blank node".into()),
        };
        let predicate = match self.term()? {
            Term::Iri(iri) if !iri.is_empty() => iri.to_string(),
            _ => return Err("predicate must be <name>".into()),
        };
        let object = match self.term()? {
            Term::Iri(iri) => Object::Uid(parse_uid(iri)?),
            Term::Blank(label) => Object::Blank(label.to_string()),
            Term::Literal(value) => Object::Literal(value),
            Term::Star if allow_star => Object::Star,
            Term::Star => return Err("'*' is only valid in delete edits".into()),
            Term::Dot => return Err("missing object".into()),
        };

        match self.term()? {
            Term::Dot => {}
            _ => return Err("expected '.' after object".into()),
        }
        self.skip_ws();
        if !self.rest.is_empty() && !self.rest.starts_with('#') {
            return Err(format!("trailing input {:?}", self.rest));
        }

        Ok(Edit {
            subject,
            predicate,
            object,
        })
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn term(&mut self) -> ParseResult<Term<'a>> {
        self.skip_ws();
        let rest = self.rest;
        let mut chars = rest.chars();
        match chars.next() {
            None => Err("unexpected end of line".into()),
            Some('<') => {
                let end = rest.find('>').ok_or("unterminated '<'")?;
                self.rest = &rest[end + 1..];
                Ok(Term::Iri(&rest[1..end]))
            }
            Some('_') => {
                let body = rest.strip_prefix("_:").ok_or("blank nodes start with '_:'")?;
                let end = body
                    .find(|c: char| c.is_whitespace())
                    .unwrap_or(body.len());
                if end == 0 {
                    return Err("empty blank node label".into());
                }
                self.rest = &body[end..];
                Ok(Term::Blank(&body[..end]))
            }
            Some('"') => self.literal(),
            Some('*') => {
                self.rest = &rest[1..];
                Ok(Term::Star)
            }
            Some('.') => {
                self.rest = &rest[1..];
                Ok(Term::Dot)
            }
            Some(c) => Err(format!("unexpected character {:?}", c)),
        }
    }

    fn literal(&mut self) -> ParseResult<Term<'a>> {
        let text = self.rest;
        let mut value = String::new();
        let mut chars = text.char_indices().skip(1);
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.rest = &text[i + 1..];
                    if self.rest.starts_with("^^") || self.rest.starts_with('@') {
                        return Err("typed and language-tagged literals are not supported".into());
                    }
                    return Ok(Term::Literal(value));
                }
                '\\' => match chars.next() {
                    Some((_, '"')) => value.push('"'),
                    Some((_, '\\')) => value.push('\\'),
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, other)) => return Err(format!("unknown escape \\{}", other)),
                    None => break,
                },
                other => value.push(other),
            }
        }
        Err("unterminated string literal".into())
    }
}

enum Term<'a> {
    Iri(&'a str),
    Blank(&'a str),
    Literal(String),
    Star,
    Dot,
}

fn parse_uid(iri: &str) -> ParseResult<Uid> {
    Uid::parse(iri).ok_or_else(|| format!("invalid uid <{}>", iri))
}
