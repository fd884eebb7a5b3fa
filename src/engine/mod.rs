// Compass Core — engine modules
//
// A chat turn flows: input → commands (short-circuits if a slash command is
// recognized) → classifier → continuity manager attaches/creates the
// conversation → memory extraction runs in the background when the
// classifier says the message is memory-worthy. Search is invoked on
// demand (explicit /search or assistant-initiated lookups).

pub mod chat;
pub mod classifier;
pub mod commands;
pub mod continuity;
pub mod memory;
pub mod search;
pub mod store;
