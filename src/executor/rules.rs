//! Ordered instruction patterns.
//!
//! A [`RuleTable`] is an immutable, ordered list of `(regex, action)` pairs.
//! Resolution is a pure function: the first rule whose pattern matches
//! anywhere in the instruction wins, and its capture groups become the
//! positional arguments of the action.

use regex::Regex;

use crate::errors::{DeskPilotError, DeskPilotResult};

/// Handler bound to a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// `[text]`
    Click,
    /// `[text, field]`
    TypeInto,
    /// `[key]`
    PressKey,
    RunTerminal,
    /// `[application]`
    OpenApplication,
    /// `[seconds]`
    Wait,
    /// `[direction, amount?]`
    Scroll,
    /// `[query]`
    Search,
    AnalyzeScreen,
    ActOnFeedback,
}

#[derive(Debug, Clone)]
pub struct PatternRule {
    pub pattern: Regex,
    pub action: Action,
}

impl PatternRule {
    /// Compile `pattern` case-insensitively.
    pub fn new(pattern: &str, action: Action) -> DeskPilotResult<Self> {
        let pattern = Regex::new(&format!("(?i){pattern}"))
            .map_err(|e| DeskPilotError::Config(format!("invalid pattern for {action:?}: {e}")))?;
        Ok(Self { pattern, action })
    }
}

/// A resolved instruction: the action plus its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub action: Action,
    /// One entry per capture group; optional groups that did not take part
    /// in the match are `None`.
    pub args: Vec<Option<String>>,
}

impl RuleMatch {
    /// Argument `i`, trimmed; `None` when absent or blank.
    pub fn arg(&self, i: usize) -> Option<&str> {
        self.args
            .get(i)
            .and_then(|a| a.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

// Quotes, a trailing widget noun and a trailing period are not part of
// the captured value.
const BUILTIN_RULES: &[(&str, Action)] = &[
    (
        r#"\bclick(?:\s+on)?\s+(?:the\s+)?(?:button\s+)?['"]?(.+?)['"]?(?:\s+button)?\.?\s*$"#,
        Action::Click,
    ),
    (
        r#"\btype\s+['"]?(.+?)['"]?\s+(?:into|in)\s+(?:the\s+)?(?:field\s+)?['"]?(.+?)['"]?(?:\s+field)?\.?\s*$"#,
        Action::TypeInto,
    ),
    (
        r#"\bpress\s+(?:the\s+)?(?:key\s+)?['"]?(.+?)['"]?(?:\s+key)?\.?\s*$"#,
        Action::PressKey,
    ),
    (
        r"\b(?:run|open|launch|start)\s+(?:a\s+|the\s+)?terminal\b",
        Action::RunTerminal,
    ),
    (
        r#"\bopen\s+(?:the\s+)?(?:app\s+|application\s+)?['"]?(.+?)['"]?\.?\s*$"#,
        Action::OpenApplication,
    ),
    (r"\bwait\s+(?:for\s+)?(\d+)(?:\s*seconds?)?", Action::Wait),
    (r"\bscroll\s+(up|down)(?:\s+by\s+(\d+))?", Action::Scroll),
    (
        r#"\bsearch\s+(?:for\s+)?['"]?(.+?)['"]?\.?\s*$"#,
        Action::Search,
    ),
    (r"\banaly[sz]e\s+(?:the\s+)?screen\b", Action::AnalyzeScreen),
    (
        r"\bperform\s+actions?\s+based\s+on\s+(?:the\s+)?(?:visual\s+)?feedback\b",
        Action::ActOnFeedback,
    ),
];

#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<PatternRule>,
}

impl RuleTable {
    pub fn new(rules: Vec<PatternRule>) -> Self {
        Self { rules }
    }

    /// The built-in instruction vocabulary.
    pub fn builtin() -> DeskPilotResult<Self> {
        let rules = BUILTIN_RULES
            .iter()
            .map(|(pattern, action)| PatternRule::new(pattern, *action))
            .collect::<DeskPilotResult<Vec<_>>>()?;
        Ok(Self::new(rules))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First matching rule, in table order.
    pub fn resolve(&self, step: &str) -> Option<RuleMatch> {
        self.rules.iter().find_map(|rule| {
            let caps = rule.pattern.captures(step)?;
            let args = (1..caps.len())
                .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
                .collect();
            Some(RuleMatch {
                action: rule.action,
                args,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RuleTable {
        RuleTable::builtin().unwrap()
    }

    fn resolve(step: &str) -> (Action, Vec<Option<String>>) {
        let m = table().resolve(step).unwrap_or_else(|| panic!("no rule for {step:?}"));
        (m.action, m.args)
    }

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn builtin_rules_compile() {
        assert_eq!(table().len(), BUILTIN_RULES.len());
    }

    #[test]
    fn click_captures_the_whole_label() {
        assert_eq!(resolve("click Submit"), (Action::Click, vec![some("Submit")]));
        assert_eq!(resolve("Click on the \"Sign in\" button."), (Action::Click, vec![some("Sign in")]));
        assert_eq!(resolve("click the button OK"), (Action::Click, vec![some("OK")]));
    }

    #[test]
    fn type_into_captures_text_and_field() {
        assert_eq!(
            resolve("Type 'hello world' into the field Username"),
            (Action::TypeInto, vec![some("hello world"), some("Username")])
        );
        assert_eq!(
            resolve("type secret in Password field"),
            (Action::TypeInto, vec![some("secret"), some("Password")])
        );
    }

    #[test]
    fn press_key_strips_noise_words() {
        assert_eq!(resolve("Press the Enter key"), (Action::PressKey, vec![some("Enter")]));
        assert_eq!(resolve("press tab"), (Action::PressKey, vec![some("tab")]));
    }

    #[test]
    fn verbs_inside_other_words_do_not_match() {
        assert!(table().resolve("ship it by express delivery").is_none());
        assert!(table().resolve("unclick OK").is_none());
        assert_eq!(resolve("then press enter").0, Action::PressKey);
    }

    #[test]
    fn terminal_wins_over_generic_open() {
        assert_eq!(resolve("open a terminal").0, Action::RunTerminal);
        assert_eq!(resolve("Run terminal").0, Action::RunTerminal);
        assert_eq!(resolve("open the application Firefox"), (Action::OpenApplication, vec![some("Firefox")]));
    }

    #[test]
    fn wait_and_scroll_capture_numbers() {
        assert_eq!(resolve("wait for 3 seconds"), (Action::Wait, vec![some("3")]));
        assert_eq!(resolve("Scroll down by 10"), (Action::Scroll, vec![some("down"), some("10")]));
        assert_eq!(resolve("scroll up"), (Action::Scroll, vec![some("up"), None]));
    }

    #[test]
    fn search_and_plan_defaults() {
        assert_eq!(resolve("search for rust crates"), (Action::Search, vec![some("rust crates")]));
        assert_eq!(resolve("Analyze screen").0, Action::AnalyzeScreen);
        assert_eq!(resolve("Perform actions based on visual feedback").0, Action::ActOnFeedback);
    }

    #[test]
    fn first_match_wins_in_table_order() {
        // Matches both the click and the search rule: click is earlier.
        assert_eq!(resolve("click search for cats").0, Action::Click);
        // A custom table with the order reversed picks the other one.
        let reversed = RuleTable::new(vec![
            PatternRule::new(r"\bsearch\s+(?:for\s+)?(.+)$", Action::Search).unwrap(),
            PatternRule::new(r"\bclick\s+(.+)$", Action::Click).unwrap(),
        ]);
        assert_eq!(reversed.resolve("click search for cats").unwrap().action, Action::Search);
    }

    #[test]
    fn unmatched_and_empty_tables_resolve_to_none() {
        assert!(table().resolve("do a little dance").is_none());
        assert!(table().resolve("clicked nothing").is_none());
        assert!(RuleTable::default().resolve("click Submit").is_none());
    }

    #[test]
    fn arg_trims_and_filters_blank() {
        let m = RuleMatch {
            action: Action::Scroll,
            args: vec![some("  down "), None, some("   ")],
        };
        assert_eq!(m.arg(0), Some("down"));
        assert_eq!(m.arg(1), None);
        assert_eq!(m.arg(2), None);
        assert_eq!(m.arg(9), None);
    }
}
