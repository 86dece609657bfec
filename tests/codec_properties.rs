//! Property tests for the wire codec and the response format.

use std::io::Cursor;

use cfbridge::protocol::{
    encode_response, read_response, DataFlow, Edit, Fix, Flow, Location, Measure, Message,
    Symbol, TextRange, WireReader, WireWriter,
};
use cfbridge::ProtocolFault;
use proptest::collection::vec;
use proptest::prelude::*;

prop_compose! {
    fn text_range()(a in any::<i32>(), b in any::<i32>(), c in any::<i32>(), d in any::<i32>()) -> TextRange {
        TextRange::new(a, b, c, d)
    }
}

prop_compose! {
    fn location()(filename in "[a-z/]{0,12}\\.cpp", text_range in text_range(), message_text in ".{0,16}") -> Location {
        Location { filename, text_range, message_text }
    }
}

prop_compose! {
    fn data_flow()(description in ".{0,16}", steps in vec(location(), 0..4)) -> DataFlow {
        DataFlow { description, steps }
    }
}

prop_compose! {
    fn fix()(message in ".{0,16}", edits in vec((text_range(), ".{0,8}"), 0..3)) -> Fix {
        let edits = edits
            .into_iter()
            .map(|(text_range, text)| Edit { text_range, text })
            .collect();
        Fix { message, edits }
    }
}

prop_compose! {
    fn message()(
        rule_key in "S[0-9]{1,4}",
        filename in ".{0,16}",
        text_range in text_range(),
        remediation_effort in any::<i32>(),
        message_text in ".{0,32}",
        part_of_effective_profile in any::<bool>(),
        flows in vec(location(), 0..4),
        data_flows in vec(data_flow(), 0..3),
        fixes in vec(fix(), 0..3),
    ) -> Message {
        // A flow on the wire is exactly one location.
        let flows = flows.into_iter().map(|l| Flow { locations: vec![l] }).collect();
        Message {
            rule_key,
            filename,
            text_range,
            remediation_effort,
            message_text,
            part_of_effective_profile,
            flows,
            data_flows,
            fixes,
        }
    }
}

prop_compose! {
    fn measure()(
        filename in ".{0,16}",
        counts in any::<(i32, i32, i32, i32, i32)>(),
        executable_lines in vec(any::<u8>(), 0..64),
    ) -> Measure {
        let (classes, functions, statements, complexity, cognitive_complexity) = counts;
        Measure {
            filename,
            classes,
            functions,
            statements,
            complexity,
            cognitive_complexity,
            executable_lines,
        }
    }
}

prop_compose! {
    fn symbol()(fields in any::<(i32, i32, i32, i32, i32, i32)>()) -> Symbol {
        let (line, column, end_line, end_column, reference_count, kind) = fields;
        Symbol { line, column, end_line, end_column, reference_count, kind }
    }
}

proptest! {
    #[test]
    fn prop_primitives_read_back_in_order(
        text in ".*",
        number in any::<i32>(),
        flag in any::<bool>(),
        buf in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        let mut w = WireWriter::new(Vec::new());
        w.write_utf(&text).unwrap();
        w.write_int(number).unwrap();
        w.write_bool(flag).unwrap();
        w.write_bytes(&buf).unwrap();

        let mut r = WireReader::new(Cursor::new(w.into_inner()));
        prop_assert_eq!(r.read_utf("text").unwrap(), text);
        prop_assert_eq!(r.read_int("number").unwrap(), number);
        prop_assert_eq!(r.read_bool("flag").unwrap(), flag);
        prop_assert_eq!(r.read_bytes("buf").unwrap(), buf);
    }

    #[test]
    fn prop_any_truncation_of_a_string_faults(text in ".{1,64}", keep in 0usize..100) {
        let mut w = WireWriter::new(Vec::new());
        w.write_utf(&text).unwrap();
        let mut bytes = w.into_inner();
        let keep = keep % bytes.len();
        bytes.truncate(keep);

        let mut r = WireReader::new(Cursor::new(bytes));
        let is_truncated = matches!(r.read_utf("text"), Err(ProtocolFault::Truncated { .. }));
        prop_assert!(is_truncated);
    }

    #[test]
    fn prop_response_reads_back_what_was_encoded(
        messages in vec(message(), 0..5),
        measures in vec(measure(), 0..4),
        symbols in vec(symbol(), 0..6),
    ) {
        let bytes = encode_response(&messages, &measures, &symbols).unwrap();
        let mut decoded = Vec::new();
        let summary = read_response(Cursor::new(bytes), |m| decoded.push(m)).unwrap();
        prop_assert_eq!(summary.issue_count, messages.len());
        prop_assert_eq!(decoded, messages);
        prop_assert_eq!(summary.measures, measures);
        prop_assert_eq!(summary.symbols, symbols);
    }
}
