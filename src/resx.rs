/*!
 * Reading and writing .resx resource documents.
 *
 * A document is streamed event by event: `<data name="..."><value>` pairs are
 * collected as entries, and a translated copy is produced by replaying the
 * same events with each value's text swapped. Everything else in the file
 * (schema, headers, comments, formatting) is written back untouched.
 */

use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::path::{Path, PathBuf};

use crate::errors::ResxError;

/// One translatable resource entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResxEntry {
    /// Resource key (`name` attribute of `<data>`)
    pub key: String,
    /// Source text of `<value>`
    pub value: String,
}

/// A loaded base resource document
#[derive(Debug, Clone)]
pub struct ResxDocument {
    path: PathBuf,
    content: String,
    entries: Vec<ResxEntry>,
}

impl ResxDocument {
    /// Load and parse a document from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ResxError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::parse(path, content)
    }

    /// Parse document content
    pub fn parse(path: impl Into<PathBuf>, content: String) -> Result<Self, ResxError> {
        let entries = read_entries(&content)?;
        Ok(Self {
            path: path.into(),
            content,
            entries,
        })
    }

    /// Source file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Page name (file stem without extension)
    pub fn page_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Translatable entries in document order (empty values are skipped)
    pub fn entries(&self) -> &[ResxEntry] {
        &self.entries
    }

    /// Entries as (key, source text) pairs
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|e| (e.key.clone(), e.value.clone()))
            .collect()
    }

    /// Render the document with translated values
    ///
    /// `translations` lines up with `entries()`; `None` keeps the source text.
    pub fn render_translated(&self, translations: &[Option<String>]) -> Result<String, ResxError> {
        if translations.len() != self.entries.len() {
            return Err(ResxError::EntryCountMismatch {
                expected: self.entries.len(),
                actual: translations.len(),
            });
        }
        replace_values(&self.content, translations)
    }

    /// Write `<stem>.<lang>.resx` next to the base file
    pub fn write_translated(&self, language: &str, translations: &[Option<String>]) -> Result<PathBuf, ResxError> {
        let rendered = self.render_translated(translations)?;
        let out_path = translated_path(&self.path, language);
        std::fs::write(&out_path, rendered)?;
        Ok(out_path)
    }
}

/// Output path for a language: `Home.resx` -> `Home.fr.resx`
pub fn translated_path(base: &Path, language: &str) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    base.with_file_name(format!("{}.{}.resx", stem, language))
}

fn xml_error(e: impl std::fmt::Display) -> ResxError {
    ResxError::Xml(e.to_string())
}

fn event_text(event: &Event<'_>) -> Result<String, ResxError> {
    match event {
        Event::Text(t) => Ok(t.unescape().map_err(xml_error)?.into_owned()),
        Event::CData(t) => Ok(String::from_utf8_lossy(t).into_owned()),
        _ => Ok(String::new()),
    }
}

/// Value of the `name` attribute of a `<data>` element
fn data_name(element: &BytesStart<'_>) -> Result<Option<String>, ResxError> {
    element
        .try_get_attribute("name")
        .map_err(xml_error)?
        .map(|a| a.unescape_value().map(|v| v.into_owned()))
        .transpose()
        .map_err(xml_error)
}

/// Collect `<data name><value>` pairs with non-blank values
pub fn read_entries(xml: &str) -> Result<Vec<ResxEntry>, ResxError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut entries = Vec::new();
    let mut current_key: Option<String> = None;
    let mut value: Option<String> = None;

    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Eof => break,
            Event::Start(e) if e.name().as_ref() == b"data" => current_key = data_name(e)?,
            Event::End(e) if e.name().as_ref() == b"data" => current_key = None,
            Event::Start(e) if e.name().as_ref() == b"value" && current_key.is_some() => {
                value = Some(String::new());
            }
            Event::Text(_) | Event::CData(_) => {
                if let Some(text) = value.as_mut() {
                    text.push_str(&event_text(&event)?);
                }
            }
            Event::End(e) if e.name().as_ref() == b"value" => {
                if let (Some(key), Some(text)) = (current_key.as_ref(), value.take()) {
                    if !text.trim().is_empty() {
                        entries.push(ResxEntry {
                            key: key.clone(),
                            value: text,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    Ok(entries)
}

/// Element boundaries that matter when rewriting values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    DataStart,
    DataEnd,
    ValueStart,
    ValueEnd,
    Other,
}

fn boundary(event: &Event<'_>) -> Boundary {
    match event {
        Event::Start(e) if e.name().as_ref() == b"data" => Boundary::DataStart,
        Event::End(e) if e.name().as_ref() == b"data" => Boundary::DataEnd,
        Event::Start(e) if e.name().as_ref() == b"value" => Boundary::ValueStart,
        Event::End(e) if e.name().as_ref() == b"value" => Boundary::ValueEnd,
        _ => Boundary::Other,
    }
}

/// Replay the document, swapping the text of each non-blank value in order
fn replace_values(xml: &str, translations: &[Option<String>]) -> Result<String, ResxError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::new());

    // Only named <data> elements are entries
    let mut in_data = false;
    let mut buffered: Option<Vec<Event<'_>>> = None;
    let mut next = translations.iter();

    loop {
        let event = reader.read_event()?;
        if matches!(event, Event::Eof) {
            break;
        }

        match boundary(&event) {
            Boundary::DataStart => {
                if let Event::Start(e) = &event {
                    in_data = data_name(e)?.is_some();
                }
            }
            Boundary::DataEnd => in_data = false,
            Boundary::ValueStart if in_data => {
                writer.write_event(event).map_err(xml_error)?;
                buffered = Some(Vec::new());
                continue;
            }
            Boundary::ValueEnd => {
                if let Some(original) = buffered.take() {
                    let mut text = String::new();
                    for inner in &original {
                        text.push_str(&event_text(inner)?);
                    }

                    let replacement = if text.trim().is_empty() {
                        None
                    } else {
                        next.next().cloned().flatten()
                    };

                    match replacement {
                        Some(translated) => {
                            let escaped = partial_escape(translated.as_str());
                            writer
                                .write_event(Event::Text(BytesText::from_escaped(escaped)))
                                .map_err(xml_error)?;
                        }
                        None => {
                            for inner in original {
                                writer.write_event(inner).map_err(xml_error)?;
                            }
                        }
                    }
                }
            }
            _ => {
                if let Some(events) = buffered.as_mut() {
                    events.push(event);
                    continue;
                }
            }
        }

        writer.write_event(event).map_err(xml_error)?;
    }

    String::from_utf8(writer.into_inner()).map_err(xml_error)
}
