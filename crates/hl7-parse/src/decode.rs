use hl7_model::{FieldInstance, Message, Repetition, SegmentInstance, Separators};

use crate::error::ParseError;
use crate::escape::unescape;

/// Parse ER7 text into a message tree.
///
/// The delimiter set comes from MSH-1/MSH-2. Content-level problems
/// (unknown segments, bad codes, type mismatches) are left in the tree for
/// the validator; only a structurally unusable envelope errors here.
pub fn parse(raw: &str) -> Result<Message, ParseError> {
    let mut lines = raw
        .split(['\r', '\n'])
        .map(str::trim_end)
        .filter(|line| !line.is_empty());

    let header = lines.next().ok_or(ParseError::Empty)?;
    if !header.starts_with("MSH") {
        return Err(ParseError::MissingHeader);
    }

    let (separators, msh) = parse_header(header)?;
    let mut message = Message {
        separators,
        segments: vec![msh],
    };

    for line in lines {
        message.segments.push(parse_segment(line, &separators)?);
    }

    Ok(message)
}

fn parse_header(line: &str) -> Result<(Separators, SegmentInstance), ParseError> {
    let mut indices = line.char_indices().skip(3);
    let (sep_index, field) = indices.next().ok_or(ParseError::TruncatedHeader)?;
    let rest = &line[sep_index + field.len_utf8()..];

    let mut tokens = rest.split(field);
    let encoding = tokens.next().ok_or(ParseError::TruncatedHeader)?;
    let mut encoding_chars = encoding.chars();
    let (Some(component), Some(repetition), Some(escape), Some(subcomponent)) = (
        encoding_chars.next(),
        encoding_chars.next(),
        encoding_chars.next(),
        encoding_chars.next(),
    ) else {
        return Err(ParseError::InvalidEncodingCharacters);
    };

    let separators = Separators {
        field,
        component,
        repetition,
        escape,
        subcomponent,
    };
    let mut distinct = [field, component, repetition, escape, subcomponent];
    distinct.sort_unstable();
    if distinct.windows(2).any(|pair| pair[0] == pair[1]) {
        return Err(ParseError::InvalidEncodingCharacters);
    }

    let mut msh = SegmentInstance::new("MSH");
    msh.set_field(1, FieldInstance::single(field.to_string()));
    msh.set_field(2, FieldInstance::single(encoding.to_string()));
    for (offset, token) in tokens.enumerate() {
        let position = offset as u16 + 3;
        msh.set_field(position, parse_field(token, &separators));
    }
    Ok((separators, msh))
}

fn parse_segment(line: &str, separators: &Separators) -> Result<SegmentInstance, ParseError> {
    let mut tokens = line.split(separators.field);
    let code = tokens.next().unwrap_or_default();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ParseError::InvalidSegmentCode(code.to_string()));
    }

    let mut segment = SegmentInstance::new(code);
    for (offset, token) in tokens.enumerate() {
        let position = offset as u16 + 1;
        segment.set_field(position, parse_field(token, separators));
    }
    Ok(segment)
}

fn parse_field(token: &str, separators: &Separators) -> FieldInstance {
    if token.is_empty() {
        return FieldInstance::absent();
    }
    let repetitions = token
        .split(separators.repetition)
        .map(|rep| Repetition {
            components: rep
                .split(separators.component)
                .map(|component| unescape(component, separators))
                .collect(),
        })
        .collect();
    FieldInstance { repetitions }
}
