//! Lexical pattern detection over aggregated edit text
//!
//! Rules live in plain data tables keyed by language family, so supporting a
//! new language means adding a table entry. Rules are compiled once on first
//! use; a rule that fails to compile is logged and skipped, and never stops
//! the remaining rules from running.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::warn;

/// Pattern tags emitted by the detector
pub mod tags {
    pub const FUNCTION_DEFINITION: &str = "function_definition";
    pub const CLASS_DEFINITION: &str = "class_definition";
    pub const TYPE_DEFINITION: &str = "type_definition";
    pub const ASYNC_CODE: &str = "async_code";
    pub const IMPORT: &str = "import";
    pub const EXPORT: &str = "export";
    pub const ERROR_HANDLING: &str = "error_handling";
    pub const TEST: &str = "test";
    pub const DECORATOR: &str = "decorator";
    pub const TODO: &str = "todo";
    pub const DEBUG_OUTPUT: &str = "debug_output";

    /// Tags that mark a structural definition
    pub const STRUCTURAL: &[&str] = &[FUNCTION_DEFINITION, CLASS_DEFINITION, TYPE_DEFINITION];
}

use tags::*;

/// Language families sharing one rule table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageFamily {
    JavaScript,
    Python,
    Rust,
    Go,
    Java,
    Generic,
}

impl LanguageFamily {
    /// Map a host language tag onto a rule family
    pub fn from_tag(language: &str) -> Self {
        match language.to_ascii_lowercase().as_str() {
            "javascript" | "javascriptreact" | "typescript" | "typescriptreact" | "js" | "jsx"
            | "ts" | "tsx" | "vue" | "svelte" => LanguageFamily::JavaScript,
            "python" | "py" => LanguageFamily::Python,
            "rust" | "rs" => LanguageFamily::Rust,
            "go" | "golang" => LanguageFamily::Go,
            "java" | "kotlin" | "scala" => LanguageFamily::Java,
            _ => LanguageFamily::Generic,
        }
    }
}

/// One (regex, tag) rule
struct PatternRule {
    pattern: &'static str,
    tag: &'static str,
}

const fn rule(pattern: &'static str, tag: &'static str) -> PatternRule {
    PatternRule { pattern, tag }
}

const JAVASCRIPT_RULES: &[PatternRule] = &[
    rule(r"\bfunction\s*\*?\s*[A-Za-z_$][\w$]*\s*\(", FUNCTION_DEFINITION),
    rule(
        r"\b(?:const|let|var)\s+[A-Za-z_$][\w$]*\s*=\s*(?:async\s*)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*=>",
        FUNCTION_DEFINITION,
    ),
    rule(r"\bclass\s+[A-Za-z_$][\w$]*", CLASS_DEFINITION),
    rule(r"\b(?:interface|type)\s+[A-Z][\w$]*", TYPE_DEFINITION),
    rule(r"\basync\b|\bawait\b|\.then\(", ASYNC_CODE),
    rule(r"(?m)^\s*import\s|\brequire\(", IMPORT),
    rule(r"(?m)^\s*export\s|\bmodule\.exports\b", EXPORT),
    rule(r"\btry\s*\{|\bcatch\s*\(|\.catch\(|\bthrow\s", ERROR_HANDLING),
    rule(r"\b(?:describe|it|test)\s*\(\s*['`]", TEST),
    rule(r"(?m)^\s*@[A-Za-z_$][\w$]*", DECORATOR),
];

const PYTHON_RULES: &[PatternRule] = &[
    rule(r"(?m)^\s*(?:async\s+)?def\s+\w+\s*\(", FUNCTION_DEFINITION),
    rule(r"(?m)^\s*class\s+\w+", CLASS_DEFINITION),
    rule(r"\basync\s+def\b|\bawait\b|\basyncio\.", ASYNC_CODE),
    rule(r"(?m)^\s*(?:import|from)\s+[\w.]+", IMPORT),
    rule(r"(?m)^\s*(?:try|except|finally)\b|\braise\s", ERROR_HANDLING),
    rule(r"(?m)^\s*def\s+test_\w+|\bunittest\.|\bpytest\.", TEST),
    rule(r"(?m)^\s*@[\w.]+", DECORATOR),
];

const RUST_RULES: &[PatternRule] = &[
    rule(r"\bfn\s+\w+", FUNCTION_DEFINITION),
    rule(r"\b(?:struct|enum|trait|union)\s+\w+|\bimpl\b", TYPE_DEFINITION),
    rule(r"\basync\b|\.await\b", ASYNC_CODE),
    rule(r"(?m)^\s*(?:pub\s+)?use\s+[\w:{]+", IMPORT),
    rule(r"\bpub(?:\([\w:]+\))?\s+(?:fn|struct|enum|trait|mod|const|type)\b", EXPORT),
    rule(r"\bResult<|\?;|\.map_err\(|\bpanic!\(", ERROR_HANDLING),
    rule(r"#\[(?:tokio::)?test\]|#\[cfg\(test\)\]", TEST),
    rule(r"#\[\w+", DECORATOR),
];

const GO_RULES: &[PatternRule] = &[
    rule(r"(?m)^\s*func\s+(?:\([^)]*\)\s*)?\w+\s*\(", FUNCTION_DEFINITION),
    rule(r"\btype\s+\w+\s+(?:struct|interface)\b", TYPE_DEFINITION),
    rule(r"\bgo\s+\w+|\bchan\b|<-", ASYNC_CODE),
    rule(r"(?m)^\s*import\s", IMPORT),
    rule(r"\bif\s+err\s*!=\s*nil\b|\berrors\.New\(|\bpanic\(", ERROR_HANDLING),
    rule(r"\bfunc\s+Test\w*\s*\(\s*t\s+\*testing\.T", TEST),
];

const JAVA_RULES: &[PatternRule] = &[
    rule(
        r"(?:public|private|protected|static|final|\s)+[\w<>\[\],\s]+\s+\w+\s*\([^)]*\)\s*(?:throws\s+[\w.,\s]+)?\{",
        FUNCTION_DEFINITION,
    ),
    rule(r"\b(?:class|interface|enum|record)\s+\w+", CLASS_DEFINITION),
    rule(r"\bCompletableFuture\b|\bExecutorService\b|\bsuspend\s+fun\b", ASYNC_CODE),
    rule(r"(?m)^\s*import\s+[\w.]+", IMPORT),
    rule(r"\btry\s*\{|\bcatch\s*\(|\bthrows?\s", ERROR_HANDLING),
    rule(r"@Test\b", TEST),
    rule(r"(?m)^\s*@\w+", DECORATOR),
];

const GENERIC_RULES: &[PatternRule] = &[
    rule(r"\b(?:function|def|fn|func)\s+\w+", FUNCTION_DEFINITION),
    rule(r"\bclass\s+\w+", CLASS_DEFINITION),
];

/// Applied regardless of language
const UNIVERSAL_RULES: &[PatternRule] = &[
    rule(r"\b(?:TODO|FIXME|HACK|XXX)\b", TODO),
    rule(
        r"\bconsole\.(?:log|debug|trace)\(|\bprint(?:ln)?!?\(|\bdbg!\(|\bfmt\.Print|\bSystem\.out\.print|\blogger\.debug\(",
        DEBUG_OUTPUT,
    ),
];

const LANGUAGE_RULES: &[(LanguageFamily, &[PatternRule])] = &[
    (LanguageFamily::JavaScript, JAVASCRIPT_RULES),
    (LanguageFamily::Python, PYTHON_RULES),
    (LanguageFamily::Rust, RUST_RULES),
    (LanguageFamily::Go, GO_RULES),
    (LanguageFamily::Java, JAVA_RULES),
    (LanguageFamily::Generic, GENERIC_RULES),
];

struct CompiledRule {
    regex: Regex,
    tag: &'static str,
}

fn compile(rules: &[PatternRule]) -> Vec<CompiledRule> {
    rules
        .iter()
        .filter_map(|r| match Regex::new(r.pattern) {
            Ok(regex) => Some(CompiledRule { regex, tag: r.tag }),
            Err(e) => {
                warn!("Pattern rule for {:?} failed to compile, skipping: {}", r.tag, e);
                None
            }
        })
        .collect()
}

static COMPILED_LANGUAGE_RULES: Lazy<Vec<(LanguageFamily, Vec<CompiledRule>)>> = Lazy::new(|| {
    LANGUAGE_RULES
        .iter()
        .map(|(family, rules)| (*family, compile(rules)))
        .collect()
});

static COMPILED_UNIVERSAL_RULES: Lazy<Vec<CompiledRule>> = Lazy::new(|| compile(UNIVERSAL_RULES));

/// Detect pattern tags in `text` using the rules for `language`
pub fn detect_patterns(text: &str, language: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    if text.trim().is_empty() {
        return found;
    }

    let family = LanguageFamily::from_tag(language);
    let language_rules = COMPILED_LANGUAGE_RULES
        .iter()
        .find(|(f, _)| *f == family)
        .map(|(_, rules)| rules.as_slice())
        .unwrap_or_default();

    for rule in language_rules.iter().chain(COMPILED_UNIVERSAL_RULES.iter()) {
        if !found.contains(rule.tag) && rule.regex.is_match(text) {
            found.insert(rule.tag.to_string());
        }
    }

    found
}

/// Whether any structural-definition tag is present
pub fn has_structural(patterns: &BTreeSet<String>) -> bool {
    STRUCTURAL.iter().any(|tag| patterns.contains(*tag))
}
