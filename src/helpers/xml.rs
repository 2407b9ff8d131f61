//! Pull-style reading of workbook XML parts.
//!
//! Readers loop over events with [`match_xml_events!`](crate::match_xml_events), read
//! attributes through [`AttrLookup`] and collect character data with [`TextAppend`].

use crate::error::RustyExtractError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Unknown XML entity '&{0};'")]
    UnknownEntity(String),

    #[error("Attribute '{name}' has unexpected value '{value}'")]
    InvalidAttribute { name: String, value: String },
}

pub(crate) struct XmlReader<R: BufRead> {
    inner: Reader<R>,
    scratch: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(source: R) -> XmlReader<R> {
        let mut inner = Reader::from_reader(source);
        let settings = inner.config_mut();
        settings.check_comments = false;
        settings.check_end_names = false;
        // `<c r="A1"/>` must still produce a Start/End pair for the cell loops
        settings.expand_empty_elements = true;
        settings.trim_text(false);
        XmlReader { inner, scratch: Vec::with_capacity(4096) }
    }

    /// Next event of the part, `None` once the document ends.
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, RustyExtractError> {
        self.scratch.clear();
        let event = self.inner.read_event_into(&mut self.scratch)?;
        Ok(match event {
            Event::Eof => None,
            event => Some(event),
        })
    }
}

/// Unescaped text of one attribute
pub(crate) fn attr_text<'a>(attribute: &Attribute<'a>) -> Result<Cow<'a, str>, RustyExtractError> {
    Ok(attribute.unescape_value()?)
}

pub(crate) trait AttrLookup<'a> {
    /// Unescaped value of the attribute with this qualified name, if present
    fn attr(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, RustyExtractError>;

    /// Like [`AttrLookup::attr`], parsed; a value that does not parse is an error
    fn attr_as<T: FromStr>(&self, name: &str) -> Result<Option<T>, RustyExtractError>;
}

impl<'a> AttrLookup<'a> for BytesStart<'a> {
    fn attr(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, RustyExtractError> {
        match self.try_get_attribute(name)? {
            Some(attribute) => Ok(Some(attr_text(&attribute)?)),
            None => Ok(None),
        }
    }

    fn attr_as<T: FromStr>(&self, name: &str) -> Result<Option<T>, RustyExtractError> {
        let Some(attribute) = self.try_get_attribute(name)? else {
            return Ok(None);
        };
        let text = attr_text(&attribute)?;
        match text.trim().parse::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(_) => Err(XmlError::InvalidAttribute {
                name: name.to_owned(),
                value: text.to_string(),
            }
            .into()),
        }
    }
}

/// Character data arrives split into text runs and entity/character references.
pub(crate) trait TextAppend {
    fn append_text(&mut self, text: &BytesText) -> Result<(), RustyExtractError>;

    fn append_reference(&mut self, reference: &BytesRef) -> Result<(), RustyExtractError>;
}

impl TextAppend for String {
    fn append_text(&mut self, text: &BytesText) -> Result<(), RustyExtractError> {
        self.push_str(&text.xml_content()?);
        Ok(())
    }

    fn append_reference(&mut self, reference: &BytesRef) -> Result<(), RustyExtractError> {
        let name = reference.xml_content()?;
        match name.strip_prefix('#') {
            Some(code) => {
                let code = match code.strip_prefix('x') {
                    Some(hex) => u32::from_str_radix(hex, 16)?,
                    None => code.parse::<u32>()?,
                };
                // invalid code points are dropped
                self.extend(char::from_u32(code));
            }
            None => {
                let entity = resolve_xml_entity(&name).ok_or_else(|| XmlError::UnknownEntity(name.to_string()))?;
                self.push_str(entity);
            }
        }
        Ok(())
    }
}

/// Drives an `XmlReader` to the end of the document, dispatching each event to the given arms.
/// Unmatched events are ignored; `break` leaves the loop early.
#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(event) = $reader.next()? {
            match event {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}
