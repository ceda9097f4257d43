//! ER7 (pipe-and-hat) codec.
//!
//! Parsing reads the delimiter set from MSH-1/MSH-2, so messages using
//! non-standard separators decode correctly. A structurally unusable
//! payload (no MSH header, truncated header) is a hard [`ParseError`];
//! unknown segment codes parse fine and are left to the validator to flag.

mod decode;
mod encode;
mod escape;
mod error;

pub use decode::parse;
pub use encode::render;
pub use error::ParseError;

#[cfg(test)]
mod tests {
    use hl7_model::FieldPath;

    use super::*;

    const ADT: &str = "MSH|^~\\&|REG^X|DEMO_HOSPITAL|||20240102030405||ADT^A01^ADT_A01|MSG00001|T|2.5.1\r\
                       EVN||20240102030405\r\
                       PID|1||12345^^^DEMO^MR||Rivera^Ana||19850201|F\r";

    #[test]
    fn parses_separators_fields_and_components() {
        let message = parse(ADT).expect("parse ADT");
        assert_eq!(message.segments.len(), 3);
        assert_eq!(message.separators.field, '|');
        assert_eq!(
            message.first_value(&FieldPath::field("PID", 5)),
            Some("Rivera".to_string())
        );
        assert_eq!(
            message.first_value(&FieldPath::component("PID", 5, 2)),
            Some("Ana".to_string())
        );
        assert_eq!(message.message_type(), Some("ADT^A01".to_string()));
    }

    #[test]
    fn round_trips_through_render() {
        let message = parse(ADT).expect("parse ADT");
        let rendered = render(&message);
        let reparsed = parse(&rendered).expect("reparse rendered output");
        assert_eq!(message, reparsed);
    }

    #[test]
    fn unescapes_reserved_characters() {
        let raw = "MSH|^~\\&|APP|FAC|||20240102030405||ADT^A01|1|T|2.5.1\r\
                   NTE|1||Smith \\T\\ Jones \\F\\ note\r";
        let message = parse(raw).expect("parse");
        assert_eq!(
            message.first_value(&FieldPath::field("NTE", 3)),
            Some("Smith & Jones | note".to_string())
        );
        let rendered = render(&message);
        assert!(rendered.contains("Smith \\T\\ Jones \\F\\ note"));
    }

    #[test]
    fn rejects_messages_without_header() {
        assert!(matches!(parse(""), Err(ParseError::Empty)));
        assert!(matches!(
            parse("PID|1||12345\r"),
            Err(ParseError::MissingHeader)
        ));
        assert!(matches!(parse("MSH"), Err(ParseError::TruncatedHeader)));
        assert!(matches!(
            parse("MSH|^~"),
            Err(ParseError::InvalidEncodingCharacters)
        ));
    }

    #[test]
    fn honors_alternate_separators() {
        let raw = "MSH#*~\\&#APP#FAC###20240102030405##ADT*A01#1#T#2.5.1\r";
        let message = parse(raw).expect("parse alternate separators");
        assert_eq!(message.separators.field, '#');
        assert_eq!(message.separators.component, '*');
        assert_eq!(message.message_type(), Some("ADT^A01".to_string()));
        let rendered = render(&message);
        assert!(rendered.starts_with("MSH#*~\\&#"));
    }
}
