//! Binary protocol spoken by the native analyzer on its standard output.
//!
//! - `codec`: length-prefixed primitives (strings, integers, booleans, buffers)
//! - `response`: the section state machine (`OUT` → issues → `measures` →
//!   `symbols` → `END`)
//! - `types`: the decoded records

pub mod codec;
mod response;
mod types;

pub use codec::{WireReader, WireWriter};
pub use response::{
    encode_response, read_response, ResponseReader, ResponseSummary, ResponseWriter, TOKEN_END,
    TOKEN_MEASURES, TOKEN_MESSAGE, TOKEN_OUT, TOKEN_SYMBOLS,
};
pub use types::{DataFlow, Edit, Fix, Flow, Location, Measure, Message, Symbol, TextRange};
