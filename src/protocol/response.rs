//! Section state machine for the analyzer response.
//!
//! A well-formed response is:
//!
//! ```text
//! "OUT"
//! ( <issue marker> <message> )*
//! "measures" <count> <measure>*
//! "symbols"  <count> <symbol>*
//! "END"
//! ```
//!
//! Any token other than `"measures"` at the top of the issue loop is taken as
//! an issue marker. The analyzer itself writes `"message"`.

use std::io::{self, Read, Write};

use super::codec::{WireReader, WireWriter};
use super::types::{DataFlow, Edit, Fix, Flow, Location, Measure, Message, Symbol, TextRange};
use crate::error::ProtocolFault;

pub const TOKEN_OUT: &str = "OUT";
pub const TOKEN_MESSAGE: &str = "message";
pub const TOKEN_MEASURES: &str = "measures";
pub const TOKEN_SYMBOLS: &str = "symbols";
pub const TOKEN_END: &str = "END";

/// Everything in a response except the issues, which are streamed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseSummary {
    pub issue_count: usize,
    pub measures: Vec<Measure>,
    pub symbols: Vec<Symbol>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Issues,
    Symbols,
    End,
    Done,
    Faulted,
}

/// Lazily decodes a response, yielding one message at a time.
///
/// The iterator is one pass: it ends after `"END"` or after the first fault.
pub struct ResponseReader<R> {
    wire: WireReader<R>,
    state: State,
    summary: ResponseSummary,
}

impl<R: Read> ResponseReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            wire: WireReader::new(inner),
            state: State::Start,
            summary: ResponseSummary::default(),
        }
    }

    /// True once the terminal `"END"` token has been read.
    pub fn is_complete(&self) -> bool {
        self.state == State::Done
    }

    /// The summary, available only for a completely decoded response.
    pub fn into_summary(self) -> Option<ResponseSummary> {
        if self.is_complete() {
            Some(self.summary)
        } else {
            None
        }
    }

    fn advance(&mut self) -> Result<Option<Message>, ProtocolFault> {
        loop {
            match self.state {
                State::Start => {
                    self.wire.expect_token(TOKEN_OUT)?;
                    self.state = State::Issues;
                }
                State::Issues => {
                    let token = self.wire.read_utf("section token")?;
                    if token == TOKEN_MEASURES {
                        self.summary.measures = read_measures(&mut self.wire)?;
                        self.state = State::Symbols;
                        continue;
                    }
                    let message = read_message(&mut self.wire)?;
                    self.summary.issue_count += 1;
                    return Ok(Some(message));
                }
                State::Symbols => {
                    self.wire.expect_token(TOKEN_SYMBOLS)?;
                    self.summary.symbols = read_symbols(&mut self.wire)?;
                    self.state = State::End;
                }
                State::End => {
                    self.wire.expect_token(TOKEN_END)?;
                    self.state = State::Done;
                }
                State::Done | State::Faulted => return Ok(None),
            }
        }
    }
}

impl<R: Read> Iterator for ResponseReader<R> {
    type Item = Result<Message, ProtocolFault>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(message) => message.map(Ok),
            Err(fault) => {
                self.state = State::Faulted;
                Some(Err(fault))
            }
        }
    }
}

impl<R: Read> std::iter::FusedIterator for ResponseReader<R> {}

/// Decode a full response, handing each message to `sink` as soon as it is read.
///
/// Messages already passed to the sink stay delivered if a later fault occurs.
pub fn read_response<R, F>(input: R, mut sink: F) -> Result<ResponseSummary, ProtocolFault>
where
    R: Read,
    F: FnMut(Message),
{
    let mut reader = ResponseReader::new(input);
    for message in reader.by_ref() {
        sink(message?);
    }
    // The iterator only ends without a fault in the Done state.
    Ok(reader.into_summary().unwrap_or_default())
}

fn read_range<R: Read>(wire: &mut WireReader<R>) -> Result<TextRange, ProtocolFault> {
    let start_line = wire.read_int("startLine")?;
    let start_offset = wire.read_int("startOffset")?;
    let end_line = wire.read_int("endLine")?;
    let end_offset = wire.read_int("endOffset")?;
    Ok(TextRange::new(start_line, end_line, start_offset, end_offset))
}

fn read_location<R: Read>(wire: &mut WireReader<R>) -> Result<Location, ProtocolFault> {
    let filename = wire.read_utf("location filename")?;
    let text_range = read_range(wire)?;
    let message_text = wire.read_utf("location message")?;
    Ok(Location {
        filename,
        text_range,
        message_text,
    })
}

fn read_message<R: Read>(wire: &mut WireReader<R>) -> Result<Message, ProtocolFault> {
    let rule_key = wire.read_utf("ruleKey")?;
    let filename = wire.read_utf("filename")?;
    let text_range = read_range(wire)?;
    let remediation_effort = wire.read_int("remediationEffort")?;
    let message_text = wire.read_utf("messageText")?;
    let part_of_effective_profile = wire.read_bool("partOfEffectiveProfile")?;

    let flow_count = wire.read_count("flowCount")?;
    let mut flows = Vec::with_capacity(flow_count.min(1024));
    for _ in 0..flow_count {
        flows.push(Flow {
            locations: vec![read_location(wire)?],
        });
    }

    let data_flow_count = wire.read_count("dataFlowCount")?;
    let mut data_flows = Vec::with_capacity(data_flow_count.min(1024));
    for _ in 0..data_flow_count {
        let description = wire.read_utf("dataFlow description")?;
        let step_count = wire.read_count("dataFlow stepCount")?;
        let mut steps = Vec::with_capacity(step_count.min(1024));
        for _ in 0..step_count {
            steps.push(read_location(wire)?);
        }
        data_flows.push(DataFlow { description, steps });
    }

    // The flag is redundant with the count that follows; both are on the wire.
    let _has_fixes = wire.read_bool("hasFixes")?;
    let fix_count = wire.read_count("fixCount")?;
    let mut fixes = Vec::with_capacity(fix_count.min(1024));
    for _ in 0..fix_count {
        let message = wire.read_utf("fix message")?;
        let edit_count = wire.read_count("fix editCount")?;
        let mut edits = Vec::with_capacity(edit_count.min(1024));
        for _ in 0..edit_count {
            let text_range = read_range(wire)?;
            let text = wire.read_utf("edit text")?;
            edits.push(Edit { text_range, text });
        }
        fixes.push(Fix { message, edits });
    }

    Ok(Message {
        rule_key,
        filename,
        text_range,
        remediation_effort,
        message_text,
        part_of_effective_profile,
        flows,
        data_flows,
        fixes,
    })
}

fn read_measures<R: Read>(wire: &mut WireReader<R>) -> Result<Vec<Measure>, ProtocolFault> {
    let count = wire.read_count("measureCount")?;
    let mut measures = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        measures.push(Measure {
            filename: wire.read_utf("measure filename")?,
            classes: wire.read_int("classes")?,
            functions: wire.read_int("functions")?,
            statements: wire.read_int("statements")?,
            complexity: wire.read_int("complexity")?,
            cognitive_complexity: wire.read_int("cognitiveComplexity")?,
            executable_lines: wire.read_bytes("executableLines")?,
        });
    }
    Ok(measures)
}

fn read_symbols<R: Read>(wire: &mut WireReader<R>) -> Result<Vec<Symbol>, ProtocolFault> {
    let count = wire.read_count("symbolCount")?;
    let mut symbols = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        symbols.push(Symbol {
            line: wire.read_int("symbol line")?,
            column: wire.read_int("symbol column")?,
            end_line: wire.read_int("symbol endLine")?,
            end_column: wire.read_int("symbol endColumn")?,
            reference_count: wire.read_int("symbol referenceCount")?,
            kind: wire.read_int("symbol kind")?,
        });
    }
    Ok(symbols)
}

/// Encodes a response in the analyzer's format.
///
/// Call `begin`, then `message` per issue, then `measures`, `symbols` and `end`.
pub struct ResponseWriter<W> {
    wire: WireWriter<W>,
}

impl<W: Write> ResponseWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            wire: WireWriter::new(inner),
        }
    }

    pub fn begin(&mut self) -> io::Result<()> {
        self.wire.write_utf(TOKEN_OUT)
    }

    /// Write one issue.
    ///
    /// Each flow travels as a single location, so a flow with any other
    /// number of locations is rejected with `InvalidInput` before anything
    /// is written.
    pub fn message(&mut self, message: &Message) -> io::Result<()> {
        if let Some(flow) = message.flows.iter().find(|flow| flow.locations.len() != 1) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "flow of issue {} has {} locations, the wire format carries exactly one",
                    message.rule_key,
                    flow.locations.len()
                ),
            ));
        }

        let w = &mut self.wire;
        w.write_utf(TOKEN_MESSAGE)?;
        w.write_utf(&message.rule_key)?;
        w.write_utf(&message.filename)?;
        write_range(w, &message.text_range)?;
        w.write_int(message.remediation_effort)?;
        w.write_utf(&message.message_text)?;
        w.write_bool(message.part_of_effective_profile)?;

        w.write_count(message.flows.len())?;
        for flow in &message.flows {
            write_location(w, &flow.locations[0])?;
        }

        w.write_count(message.data_flows.len())?;
        for data_flow in &message.data_flows {
            w.write_utf(&data_flow.description)?;
            w.write_count(data_flow.steps.len())?;
            for step in &data_flow.steps {
                write_location(w, step)?;
            }
        }

        w.write_bool(!message.fixes.is_empty())?;
        w.write_count(message.fixes.len())?;
        for fix in &message.fixes {
            w.write_utf(&fix.message)?;
            w.write_count(fix.edits.len())?;
            for edit in &fix.edits {
                write_range(w, &edit.text_range)?;
                w.write_utf(&edit.text)?;
            }
        }
        Ok(())
    }

    pub fn measures(&mut self, measures: &[Measure]) -> io::Result<()> {
        let w = &mut self.wire;
        w.write_utf(TOKEN_MEASURES)?;
        w.write_count(measures.len())?;
        for m in measures {
            w.write_utf(&m.filename)?;
            w.write_int(m.classes)?;
            w.write_int(m.functions)?;
            w.write_int(m.statements)?;
            w.write_int(m.complexity)?;
            w.write_int(m.cognitive_complexity)?;
            w.write_bytes(&m.executable_lines)?;
        }
        Ok(())
    }

    pub fn symbols(&mut self, symbols: &[Symbol]) -> io::Result<()> {
        let w = &mut self.wire;
        w.write_utf(TOKEN_SYMBOLS)?;
        w.write_count(symbols.len())?;
        for s in symbols {
            w.write_int(s.line)?;
            w.write_int(s.column)?;
            w.write_int(s.end_line)?;
            w.write_int(s.end_column)?;
            w.write_int(s.reference_count)?;
            w.write_int(s.kind)?;
        }
        Ok(())
    }

    pub fn end(&mut self) -> io::Result<()> {
        self.wire.write_utf(TOKEN_END)?;
        self.wire.flush()
    }

    pub fn into_inner(self) -> W {
        self.wire.into_inner()
    }
}

/// Encode a complete response into a byte vector.
pub fn encode_response(
    messages: &[Message],
    measures: &[Measure],
    symbols: &[Symbol],
) -> io::Result<Vec<u8>> {
    let mut writer = ResponseWriter::new(Vec::new());
    writer.begin()?;
    for message in messages {
        writer.message(message)?;
    }
    writer.measures(measures)?;
    writer.symbols(symbols)?;
    writer.end()?;
    Ok(writer.into_inner())
}

fn write_range<W: Write>(w: &mut WireWriter<W>, range: &TextRange) -> io::Result<()> {
    w.write_int(range.start_line)?;
    w.write_int(range.start_offset)?;
    w.write_int(range.end_line)?;
    w.write_int(range.end_offset)
}

fn write_location<W: Write>(w: &mut WireWriter<W>, location: &Location) -> io::Result<()> {
    w.write_utf(&location.filename)?;
    write_range(w, &location.text_range)?;
    w.write_utf(&location.message_text)
}
