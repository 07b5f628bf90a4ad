//! quick-xml front-end: tokenizes XHTML and drives a [`Pipeline`].

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::config::PipelineOptions;
use crate::error::{ErrorPhase, PipelineError};
use crate::output::OutputUnit;
use crate::pipeline::Pipeline;
use crate::registry::HandlerRegistry;
use crate::tag::Attributes;

/// Error code for tokenizer and decode failures.
pub const PARSE_TOKENIZE_ERROR: &str = "PARSE_TOKENIZE_ERROR";

/// Convert an XHTML document into root output units.
pub fn convert_xhtml(
    html: &str,
    registry: &HandlerRegistry,
    options: &PipelineOptions,
) -> Result<Vec<OutputUnit>, PipelineError> {
    let mut out = Vec::new();
    convert_xhtml_with(html, registry, options, |unit| {
        out.push(unit);
        Ok(())
    })?;
    Ok(out)
}

/// Convert an XHTML document, streaming each root output unit to `on_unit`
/// as soon as it is complete.
///
/// Adjacent text, CDATA and entity references are merged into one text run
/// before dispatch. An error returned by `on_unit` aborts the conversion:
/// no further markup is tokenized and the error is returned with the
/// current token offset attached.
pub fn convert_xhtml_with<F>(
    html: &str,
    registry: &HandlerRegistry,
    options: &PipelineOptions,
    mut on_unit: F,
) -> Result<(), PipelineError>
where
    F: FnMut(OutputUnit) -> Result<(), PipelineError>,
{
    let mut pipeline = Pipeline::new(registry, options.clone());
    let mut reader = Reader::from_reader(html.as_bytes());
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = false;
    let mut buf = Vec::with_capacity(64);
    let mut pending = String::new();
    let mut entity_buf = String::with_capacity(16);

    loop {
        let offset = reader_token_offset(&reader);
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                flush_text(&mut pipeline, &mut pending, offset, &mut on_unit)?;
                let (name, attributes) = decode_start(&reader, &e)?;
                pipeline
                    .open_tag(&name, attributes, &mut on_unit)
                    .map_err(|err| at_offset(err, offset))?;
            }
            Ok(Event::Empty(e)) => {
                flush_text(&mut pipeline, &mut pending, offset, &mut on_unit)?;
                let (name, attributes) = decode_start(&reader, &e)?;
                pipeline
                    .open_tag(&name, attributes, &mut on_unit)
                    .and_then(|()| pipeline.close_tag(&name, &mut on_unit))
                    .map_err(|err| at_offset(err, offset))?;
            }
            Ok(Event::End(e)) => {
                flush_text(&mut pipeline, &mut pending, offset, &mut on_unit)?;
                let name = decode_tag_name(&reader, e.name().as_ref())?;
                pipeline
                    .close_tag(&name, &mut on_unit)
                    .map_err(|err| at_offset(err, offset))?;
            }
            Ok(Event::Text(e)) => {
                let text = e.decode().map_err(|err| {
                    tokenize_error(format!("Decode error: {:?}", err), &reader)
                })?;
                pending.push_str(&text);
            }
            Ok(Event::CData(e)) => {
                let text = reader.decoder().decode(&e).map_err(|err| {
                    tokenize_error(format!("Decode error: {:?}", err), &reader)
                })?;
                pending.push_str(&text);
            }
            Ok(Event::GeneralRef(e)) => {
                let entity_name = e.decode().map_err(|err| {
                    tokenize_error(format!("Decode error: {:?}", err), &reader)
                })?;
                entity_buf.clear();
                entity_buf.push('&');
                entity_buf.push_str(&entity_name);
                entity_buf.push(';');
                match quick_xml::escape::unescape(&entity_buf) {
                    Ok(resolved) => pending.push_str(&resolved),
                    Err(_) => match html_entity(&entity_name) {
                        Some(ch) => pending.push(ch),
                        None => {
                            log::debug!("Passing through unknown entity {}", entity_buf);
                            pending.push_str(&entity_buf);
                        }
                    },
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(tokenize_error(format!("XML error: {:?}", err), &reader));
            }
        }
        buf.clear();
    }

    let offset = reader_token_offset(&reader);
    flush_text(&mut pipeline, &mut pending, offset, &mut on_unit)?;
    pipeline.finish(&mut on_unit)
}

fn flush_text<F>(
    pipeline: &mut Pipeline<'_>,
    pending: &mut String,
    offset: usize,
    on_unit: &mut F,
) -> Result<(), PipelineError>
where
    F: FnMut(OutputUnit) -> Result<(), PipelineError>,
{
    if pending.is_empty() {
        return Ok(());
    }
    let result = pipeline.text(pending.as_str(), on_unit);
    pending.clear();
    result.map_err(|err| at_offset(err, offset))
}

fn decode_start(
    reader: &Reader<&[u8]>,
    e: &BytesStart<'_>,
) -> Result<(String, Attributes), PipelineError> {
    let name = decode_tag_name(reader, e.name().as_ref())?;
    let mut attributes = Attributes::new();
    for attr in e.attributes().flatten() {
        let key = match reader.decoder().decode(attr.key.as_ref()) {
            Ok(v) => v.to_ascii_lowercase(),
            Err(_) => continue,
        };
        let raw = match reader.decoder().decode(&attr.value) {
            Ok(v) => v,
            Err(_) => continue,
        };
        let value = match quick_xml::escape::unescape(&raw) {
            Ok(v) => v.into_owned(),
            Err(_) => raw.into_owned(),
        };
        let key = key.rsplit(':').next().unwrap_or(key.as_str());
        attributes.insert(key, value);
    }
    Ok((name, attributes))
}

fn decode_tag_name(reader: &Reader<&[u8]>, raw: &[u8]) -> Result<String, PipelineError> {
    let decoded = reader
        .decoder()
        .decode(raw)
        .map_err(|err| tokenize_error(format!("Decode error: {:?}", err), reader))?;
    let local_name = decoded.rsplit(':').next().unwrap_or(decoded.as_ref());
    Ok(local_name.to_ascii_lowercase())
}

fn html_entity(name: &str) -> Option<char> {
    match name {
        "nbsp" => Some('\u{a0}'),
        "mdash" => Some('\u{2014}'),
        "ndash" => Some('\u{2013}'),
        "hellip" => Some('\u{2026}'),
        "lsquo" => Some('\u{2018}'),
        "rsquo" => Some('\u{2019}'),
        "ldquo" => Some('\u{201c}'),
        "rdquo" => Some('\u{201d}'),
        "copy" => Some('\u{a9}'),
        _ => None,
    }
}

fn tokenize_error(message: String, reader: &Reader<&[u8]>) -> PipelineError {
    PipelineError::new_with_phase(ErrorPhase::Parse, PARSE_TOKENIZE_ERROR, message)
        .with_token_offset(reader_token_offset(reader))
}

fn at_offset(err: PipelineError, offset: usize) -> PipelineError {
    if err.token_offset.is_some() {
        err
    } else {
        err.with_token_offset(offset)
    }
}

fn reader_token_offset(reader: &Reader<&[u8]>) -> usize {
    usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX)
}
