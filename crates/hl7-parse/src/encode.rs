use hl7_model::{FieldInstance, Message, Repetition, SegmentInstance, Separators};

use crate::escape::escape;

/// Render a message tree back to ER7 text, one segment per `\r` line.
pub fn render(message: &Message) -> String {
    let separators = &message.separators;
    let mut out = String::new();
    for segment in &message.segments {
        if segment.code == "MSH" {
            render_header(segment, separators, &mut out);
        } else {
            render_segment(segment, separators, &mut out);
        }
        out.push('\r');
    }
    out
}

fn render_header(segment: &SegmentInstance, separators: &Separators, out: &mut String) {
    out.push_str("MSH");
    out.push(separators.field);
    // MSH-1 is the separator itself and MSH-2 the encoding characters;
    // both come from the delimiter set, never escaped.
    out.push_str(&separators.encoding_characters());
    let last = last_present_position(segment);
    for position in 3..=last {
        out.push(separators.field);
        if let Some(field) = segment.field(position) {
            render_field(field, separators, out);
        }
    }
}

fn render_segment(segment: &SegmentInstance, separators: &Separators, out: &mut String) {
    out.push_str(&segment.code);
    let last = last_present_position(segment);
    for position in 1..=last {
        out.push(separators.field);
        if let Some(field) = segment.field(position) {
            render_field(field, separators, out);
        }
    }
}

fn last_present_position(segment: &SegmentInstance) -> u16 {
    segment
        .fields
        .iter()
        .rposition(FieldInstance::is_present)
        .map(|index| index as u16 + 1)
        .unwrap_or(0)
}

fn render_field(field: &FieldInstance, separators: &Separators, out: &mut String) {
    for (index, repetition) in field.repetitions.iter().enumerate() {
        if index > 0 {
            out.push(separators.repetition);
        }
        render_repetition(repetition, separators, out);
    }
}

fn render_repetition(repetition: &Repetition, separators: &Separators, out: &mut String) {
    let mut components: &[String] = &repetition.components;
    while let Some(last) = components.last() {
        if last.is_empty() {
            components = &components[..components.len() - 1];
        } else {
            break;
        }
    }
    for (index, component) in components.iter().enumerate() {
        if index > 0 {
            out.push(separators.component);
        }
        out.push_str(&escape(component, separators));
    }
}
