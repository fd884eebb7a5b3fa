// ── Compass Atoms: Policy Constants ────────────────────────────────────────
// Central home for tunable policy values. The retrieval constants are
// empirical; nothing downstream depends on their exact values.

/// A conversation goes stale after this much idle time; the next message
/// rotates to a fresh conversation. Fixed policy, not configurable.
pub const IDLE_WINDOW_MINUTES: i64 = 30;

/// Memory reads/writes are a personalization side-channel: bound them hard
/// and treat a timeout as a soft failure.
pub const MEMORY_TIMEOUT_SECS: u64 = 3;

/// Search sits on the critical reply path; give it more headroom.
pub const SEARCH_TIMEOUT_SECS: u64 = 15;

/// Classifier confidence below this suppresses memory work even when the
/// rule itself says the message is memory-worthy.
pub const MEMORY_CONFIDENCE_FLOOR: f64 = 0.6;

// ── Retrieval ranking ──────────────────────────────────────────────────────

/// Score multiplier for hits on a trusted domain, clamped to 1.0.
pub const TRUST_BOOST: f64 = 1.5;

/// Confidence when at least one trusted hit came back:
/// min(CAP, BASE + PER_HIT × trusted_hits).
pub const TRUSTED_CONFIDENCE_BASE: f64 = 0.6;
pub const TRUSTED_CONFIDENCE_PER_HIT: f64 = 0.1;
pub const TRUSTED_CONFIDENCE_CAP: f64 = 0.9;

/// Confidence cap when no trusted hit came back: min(CAP, top score).
pub const UNTRUSTED_CONFIDENCE_CAP: f64 = 0.5;

pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Appended to every query so results skew toward institutional sources.
pub const SITE_RESTRICTION: &str = "(site:.edu OR site:.gov OR site:.org)";

/// Hostnames (exact or dot-suffix) whose hits get the trust boost.
pub const TRUSTED_DOMAINS: [&str; 11] = [
    "nsf.gov",
    "nih.gov",
    "grants.gov",
    "nasa.gov",
    "energy.gov",
    "noaa.gov",
    "nist.gov",
    "usda.gov",
    "si.edu",
    "aaas.org",
    "acs.org",
];

/// Noise domains excluded from every search, merged with caller exclusions.
pub const NOISE_DOMAINS: [&str; 8] = [
    "reddit.com",
    "quora.com",
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "tiktok.com",
    "pinterest.com",
];
