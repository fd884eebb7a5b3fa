// Compass Core — engine library
//
// The context pipeline behind the Compass advising assistant:
//   atoms    — error enum, core types, policy constants
//   engine   — classifier, memory, search, commands, continuity, chat turn
//
// Everything UI- and transport-facing lives outside this crate; callers get
// structured values (Classification, SearchResponse, CommandEvent, …) and
// decide how to render or ship them.

pub mod atoms;
pub mod engine;

pub use atoms::error::{EngineError, EngineResult};
