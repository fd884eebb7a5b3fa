// ── Compass: Command Parser & Suggestion Engine ────────────────────────────
//
// A small finite-state command UI inside the chat input:
//   • CommandRegistry — fixed ordered list of slash commands with handlers
//     that emit structured CommandEvents toward the chat surface.
//   • CommandPalette  — the suggestion state machine (Idle | Suggesting),
//     transitioned by pure (state, event) functions. Strictly synchronous:
//     one computation per keystroke, bounded by registry size.
//
// Selecting a suggestion only completes the token ("/search "); execution
// happens on submit, independent of the suggestion UI.

use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::atoms::types::CommandEvent;

// ── Registry ───────────────────────────────────────────────────────────────

pub type CommandHandler = Box<dyn Fn(&str, &str) -> Option<CommandEvent> + Send + Sync>;

pub struct SlashCommand {
    pub id: &'static str,
    pub trigger: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    handler: CommandHandler,
}

/// Result of submitting text: was it consumed as a command, and what (if
/// anything) did the handler emit. `consumed == false` means the caller
/// should send the text as ordinary chat — an unrecognized trigger is not
/// an error.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub consumed: bool,
    pub event: Option<CommandEvent>,
}

pub struct CommandRegistry {
    commands: Vec<SlashCommand>,
}

const HELP_TEXT: &str = "Commands: /search <query> — look up opportunities from trusted sources; \
/save — store your profile and goals for next time; /help — this list.";

impl CommandRegistry {
    /// The fixed built-in registry, in display order.
    pub fn with_builtins() -> Self {
        CommandRegistry {
            commands: vec![
                SlashCommand {
                    id: "search",
                    trigger: "/search",
                    description: "Search trusted sources for opportunities",
                    icon: "magnifier",
                    handler: Box::new(|arg, _raw| {
                        if arg.is_empty() {
                            None
                        } else {
                            Some(CommandEvent::SearchIntent { query: arg.to_string() })
                        }
                    }),
                },
                SlashCommand {
                    id: "save",
                    trigger: "/save",
                    description: "Store your profile and goals for next time",
                    icon: "bookmark",
                    handler: Box::new(|_arg, _raw| Some(CommandEvent::SaveProfile)),
                },
                SlashCommand {
                    id: "help",
                    trigger: "/help",
                    description: "List what I can do in chat",
                    icon: "question",
                    handler: Box::new(|_arg, _raw| {
                        Some(CommandEvent::Notice { text: HELP_TEXT.to_string() })
                    }),
                },
            ],
        }
    }

    pub fn commands(&self) -> &[SlashCommand] {
        &self.commands
    }

    /// Parse submitted text and run the matching handler.
    pub fn dispatch(&self, raw: &str) -> DispatchOutcome {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r"(?s)^/(\w+)(.*)$").expect("dispatch regex"));

        let Some(caps) = re.captures(raw) else {
            return DispatchOutcome { consumed: false, event: None };
        };
        let name = &caps[1];
        let remainder = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        let Some(command) = self
            .commands
            .iter()
            .find(|c| c.trigger.strip_prefix('/') == Some(name))
        else {
            return DispatchOutcome { consumed: false, event: None };
        };

        let event = (command.handler)(remainder.trim(), raw);
        DispatchOutcome { consumed: true, event }
    }
}

// ── Suggestion state machine ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteState {
    Idle,
    Suggesting { filter: String, highlighted: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteKey {
    Down,
    Up,
    Enter,
    Escape,
    Other,
}

/// What the UI should do with the keystroke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Consumed by the palette; suppress default handling.
    Handled,
    /// Enter on a valid entry: replace the input with `input` (the trigger
    /// plus one trailing space) and suppress the default submit.
    Completed { input: String },
    /// Not a palette key; let default key processing apply.
    NotHandled,
}

pub struct CommandPalette {
    registry: Arc<CommandRegistry>,
    state: PaletteState,
}

impl CommandPalette {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        CommandPalette { registry, state: PaletteState::Idle }
    }

    pub fn state(&self) -> &PaletteState {
        &self.state
    }

    pub fn is_suggesting(&self) -> bool {
        matches!(self.state, PaletteState::Suggesting { .. })
    }

    /// Runs on every input-change event. Only a bare `/token` (no spaces,
    /// nothing after the word) opens suggestions.
    pub fn on_input_change(&mut self, input: &str) {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r"^/(\w*)$").expect("detect regex"));

        self.state = match re.captures(input) {
            Some(caps) => PaletteState::Suggesting { filter: caps[1].to_string(), highlighted: 0 },
            None => PaletteState::Idle,
        };
    }

    /// Entries visible under the current filter (trigger or description
    /// contains it, case-insensitive); all entries when the filter is empty.
    /// Empty while idle.
    pub fn visible(&self) -> Vec<&SlashCommand> {
        match &self.state {
            PaletteState::Idle => Vec::new(),
            PaletteState::Suggesting { filter, .. } => filtered(&self.registry, filter),
        }
    }

    pub fn highlighted_index(&self) -> Option<usize> {
        match &self.state {
            PaletteState::Idle => None,
            PaletteState::Suggesting { highlighted, .. } => Some(*highlighted),
        }
    }

    /// Keyboard contract while suggesting: Down/Up cycle with wraparound,
    /// Enter completes, Escape closes without touching the input, anything
    /// else is reported not-handled.
    pub fn on_key(&mut self, key: PaletteKey) -> KeyOutcome {
        let (filter, highlighted) = match &self.state {
            PaletteState::Idle => return KeyOutcome::NotHandled,
            PaletteState::Suggesting { filter, highlighted } => (filter.clone(), *highlighted),
        };
        let items = filtered(&self.registry, &filter);

        match key {
            PaletteKey::Down if !items.is_empty() => {
                let next = (highlighted + 1) % items.len();
                self.state = PaletteState::Suggesting { filter, highlighted: next };
                KeyOutcome::Handled
            }
            PaletteKey::Up if !items.is_empty() => {
                let next = (highlighted + items.len() - 1) % items.len();
                self.state = PaletteState::Suggesting { filter, highlighted: next };
                KeyOutcome::Handled
            }
            PaletteKey::Enter => match items.get(highlighted) {
                Some(command) => {
                    let input = format!("{} ", command.trigger);
                    self.state = PaletteState::Idle;
                    KeyOutcome::Completed { input }
                }
                None => KeyOutcome::NotHandled,
            },
            PaletteKey::Escape => {
                self.state = PaletteState::Idle;
                KeyOutcome::Handled
            }
            _ => KeyOutcome::NotHandled,
        }
    }
}

fn filtered<'r>(registry: &'r CommandRegistry, filter: &str) -> Vec<&'r SlashCommand> {
    let needle = filter.to_lowercase();
    registry
        .commands()
        .iter()
        .filter(|c| {
            needle.is_empty()
                || c.trigger.to_lowercase().contains(&needle)
                || c.description.to_lowercase().contains(&needle)
        })
        .collect()
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn palette() -> CommandPalette {
        CommandPalette::new(Arc::new(CommandRegistry::with_builtins()))
    }

    #[test]
    fn bare_slash_shows_all_commands() {
        let mut p = palette();
        p.on_input_change("/");
        assert!(p.is_suggesting());
        assert_eq!(p.visible().len(), 3);
        assert_eq!(p.highlighted_index(), Some(0));
    }

    #[test]
    fn filter_narrows_by_trigger_or_description() {
        let mut p = palette();
        p.on_input_change("/se");
        let visible = p.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].trigger, "/search");
    }

    #[test]
    fn non_command_shapes_close_suggestions() {
        let mut p = palette();
        p.on_input_change("/");
        assert!(p.is_suggesting());
        for input in ["/search q", "hello", "", " /search", "/sea rch"] {
            p.on_input_change("/");
            p.on_input_change(input);
            assert!(!p.is_suggesting(), "still suggesting after {input:?}");
        }
    }

    #[test]
    fn arrows_wrap_in_both_directions() {
        let mut p = palette();
        p.on_input_change("/");

        assert_eq!(p.on_key(PaletteKey::Down), KeyOutcome::Handled);
        assert_eq!(p.highlighted_index(), Some(1));
        p.on_key(PaletteKey::Down);
        assert_eq!(p.highlighted_index(), Some(2));
        p.on_key(PaletteKey::Down); // past the end → wraps
        assert_eq!(p.highlighted_index(), Some(0));

        p.on_key(PaletteKey::Up); // before the start → wraps
        assert_eq!(p.highlighted_index(), Some(2));
    }

    #[test]
    fn enter_completes_the_token() {
        let mut p = palette();
        p.on_input_change("/se");
        match p.on_key(PaletteKey::Enter) {
            KeyOutcome::Completed { input } => assert_eq!(input, "/search "),
            other => panic!("expected completion, got {other:?}"),
        }
        assert!(!p.is_suggesting());
    }

    #[test]
    fn escape_closes_without_completion() {
        let mut p = palette();
        p.on_input_change("/");
        assert_eq!(p.on_key(PaletteKey::Escape), KeyOutcome::Handled);
        assert!(!p.is_suggesting());
    }

    #[test]
    fn other_keys_fall_through() {
        let mut p = palette();
        p.on_input_change("/");
        assert_eq!(p.on_key(PaletteKey::Other), KeyOutcome::NotHandled);
        assert!(p.is_suggesting());

        // Idle palette never intercepts keys.
        p.on_input_change("plain text");
        assert_eq!(p.on_key(PaletteKey::Enter), KeyOutcome::NotHandled);
    }

    #[test]
    fn enter_with_no_visible_entry_is_not_handled() {
        let mut p = palette();
        p.on_input_change("/zzz");
        assert!(p.is_suggesting());
        assert!(p.visible().is_empty());
        assert_eq!(p.on_key(PaletteKey::Enter), KeyOutcome::NotHandled);
        assert_eq!(p.on_key(PaletteKey::Down), KeyOutcome::NotHandled);
    }

    #[test]
    fn dispatch_search_with_argument() {
        let reg = CommandRegistry::with_builtins();
        let out = reg.dispatch("/search quantum computing labs");
        assert!(out.consumed);
        assert_eq!(
            out.event,
            Some(CommandEvent::SearchIntent { query: "quantum computing labs".to_string() })
        );
    }

    #[test]
    fn dispatch_search_without_argument_is_consumed_but_silent() {
        let reg = CommandRegistry::with_builtins();
        let out = reg.dispatch("/search   ");
        assert!(out.consumed);
        assert!(out.event.is_none());
    }

    #[test]
    fn dispatch_unknown_or_plain_text_is_not_consumed() {
        let reg = CommandRegistry::with_builtins();
        assert!(!reg.dispatch("/unknowncmd foo").consumed);
        assert!(!reg.dispatch("just chatting").consumed);
        assert!(!reg.dispatch("/").consumed);
    }

    #[test]
    fn dispatch_help_and_save() {
        let reg = CommandRegistry::with_builtins();
        match reg.dispatch("/help").event {
            Some(CommandEvent::Notice { text }) => assert!(text.contains("/search")),
            other => panic!("expected notice, got {other:?}"),
        }
        assert_eq!(reg.dispatch("/save").event, Some(CommandEvent::SaveProfile));
    }
}
