// ── Compass Atoms ──────────────────────────────────────────────────────────
// Leaf-level building blocks with no dependency on the engine modules.

pub mod constants;
pub mod error;
pub mod types;
