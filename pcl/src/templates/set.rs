//! Template parsing with `<{[ … ]}>` delimiters

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use handlebars::{Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderErrorReason};
use tracing::{debug, info};

use super::TemplateError;
use crate::paths::{base_name, matching_files};
use crate::vars::VariableSet;

/// Opening delimiter of a template action
pub const OPEN_DELIM: &str = "<{[";

/// Closing delimiter of a template action
pub const CLOSE_DELIM: &str = "]}>";

/// Glob for rule templates at the top level of a source directory
pub const TEMPLATE_PATTERN: &str = "*.yaml";

/// Internal helper that emits literal brace and backslash runs
const LITERAL_HELPER: &str = "__literal";

/// Parsed rule templates, keyed by base file name
///
/// Variable lookups are strict: a template referring to a variable that is
/// not set fails to render instead of producing an empty string. Output is
/// never HTML-escaped.
pub struct TemplateSet {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// Template names in file-name order
    names: Vec<String>,
}

impl std::fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSet").field("names", &self.names).finish()
    }
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateSet {
    /// Create an empty template set
    pub fn new() -> Self {
        let mut hbs = Handlebars::new();
        hbs.set_strict_mode(true);
        hbs.register_escape_fn(handlebars::no_escape);
        hbs.register_helper(LITERAL_HELPER, Box::new(literal_helper));
        Self { hbs, names: Vec::new() }
    }

    /// Parse every `*.yaml` at the top level of `dir`
    ///
    /// Subdirectories (including the fixture directory) are not descended
    /// into. The first template that fails to parse aborts the whole load.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let dir = dir.as_ref();
        debug!(?dir, "TemplateSet::load_dir: called");

        let files = matching_files(dir, TEMPLATE_PATTERN).map_err(|source| TemplateError::Pattern {
            dir: dir.to_path_buf(),
            source,
        })?;

        let mut set = Self::new();
        for path in files {
            let source = fs::read_to_string(&path).map_err(|source| TemplateError::Read {
                path: PathBuf::from(&path),
                source,
            })?;
            set.add(&base_name(&path), &source)?;
        }

        info!("Parsed {} template(s) from {}", set.len(), dir.display());
        Ok(set)
    }

    /// Parse and register a single template under `name`
    pub fn add(&mut self, name: &str, source: &str) -> Result<(), TemplateError> {
        debug!(%name, len = source.len(), "TemplateSet::add: called");
        self.hbs
            .register_template_string(name, translate_delimiters(source))
            .map_err(|source| TemplateError::Syntax {
                name: name.to_string(),
                source,
            })?;
        if !self.names.iter().any(|n| n == name) {
            self.names.push(name.to_string());
        }
        Ok(())
    }

    /// Render one template with the given variables
    pub fn render(&self, name: &str, vars: &VariableSet) -> Result<String, handlebars::RenderError> {
        debug!(%name, layer = %vars.layer(), "TemplateSet::render: called");
        self.hbs.render(name, vars.values())
    }

    /// Template names in file-name order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Rewrite `<{[ … ]}>` actions into Handlebars syntax
///
/// Text outside actions is copied so that it renders unchanged. An
/// unterminated action is left open so the parser reports it.
fn translate_delimiters(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find(OPEN_DELIM) {
        push_literal(&mut out, &rest[..start], true);
        let after = &rest[start + OPEN_DELIM.len()..];
        out.push_str("{{");
        match after.find(CLOSE_DELIM) {
            Some(end) => {
                out.push_str(&strip_leading_dot(&after[..end]));
                out.push_str("}}");
                rest = &after[end + CLOSE_DELIM.len()..];
            }
            None => {
                out.push_str(after);
                rest = "";
            }
        }
    }

    push_literal(&mut out, rest, false);
    out
}

/// Copy literal text into Handlebars source
///
/// Handlebars reads `{{` as a tag, backslashes before `{{` as escapes, and
/// `{` before a tag as part of it. Runs of `\` and `{` where that would
/// happen are written through the literal helper instead.
fn push_literal(out: &mut String, text: &str, before_tag: bool) {
    let special = |c: char| c == '\\' || c == '{';
    let mut rest = text;

    while let Some(start) = rest.find(special) {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let len = tail.find(|c: char| !special(c)).unwrap_or(tail.len());
        let (run, after) = tail.split_at(len);

        if run.contains("{{") || (after.is_empty() && before_tag) {
            out.push_str("{{");
            out.push_str(LITERAL_HELPER);
            for c in run.chars() {
                out.push_str(&format!(" {}", u32::from(c)));
            }
            out.push_str("}}");
        } else {
            out.push_str(run);
        }
        rest = after;
    }

    out.push_str(rest);
}

/// Write back the characters whose code points are given as parameters
fn literal_helper(
    h: &Helper<'_>,
    _: &Handlebars<'_>,
    _: &Context,
    _: &mut RenderContext<'_, '_>,
    out: &mut dyn Output,
) -> HelperResult {
    for param in h.params() {
        let c = param
            .value()
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .and_then(char::from_u32)
            .ok_or(RenderErrorReason::InvalidParamType("character code"))?;
        out.write(c.encode_utf8(&mut [0; 4]))?;
    }
    Ok(())
}

/// Accept `.name` as a synonym for `name`
fn strip_leading_dot(action: &str) -> Cow<'_, str> {
    let trimmed = action.trim_start();
    let leading = &action[..action.len() - trimmed.len()];
    match trimmed.strip_prefix('.') {
        Some(rest) if rest.starts_with(|c: char| c.is_alphabetic() || c == '_') => {
            Cow::Owned(format!("{}{}", leading, rest))
        }
        _ => Cow::Borrowed(action),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn vars(pairs: &[(&str, &str)]) -> VariableSet {
        VariableSet::from_pairs("test", pairs.iter().copied())
    }

    #[test]
    fn test_translate_delimiters() {
        assert_eq!(translate_delimiters("a <{[ x ]}> b"), "a {{ x }} b");
        assert_eq!(translate_delimiters("<{[.context]}>"), "{{context}}");
        assert_eq!(translate_delimiters("{{ $value }}"), "{{__literal 123 123}} $value }}");
        assert_eq!(translate_delimiters("up{<{[ m ]}>}"), "up{{__literal 123}}{{ m }}}");
        assert_eq!(translate_delimiters("a{b\\c"), "a{b\\c");
        assert_eq!(translate_delimiters("no actions"), "no actions");
    }

    #[test]
    fn test_render_substitutes_variables() {
        let mut set = TemplateSet::new();
        set.add("t.yaml", "env: <{[ context ]}>\nfor: <{[ pending ]}>\n").unwrap();

        let out = set
            .render("t.yaml", &vars(&[("context", "prod"), ("pending", "5m")]))
            .unwrap();
        assert_eq!(out, "env: prod\nfor: 5m\n");
    }

    #[test]
    fn test_render_accepts_dotted_names() {
        let mut set = TemplateSet::new();
        set.add("t.yaml", "<{[ .context ]}>").unwrap();
        assert_eq!(set.render("t.yaml", &vars(&[("context", "c1")])).unwrap(), "c1");
    }

    #[test]
    fn test_render_passes_prometheus_braces_through() {
        let mut set = TemplateSet::new();
        let source = "summary: \"{{ $labels.instance }} down in <{[ context ]}>\"\n";
        set.add("t.yaml", source).unwrap();

        let out = set.render("t.yaml", &vars(&[("context", "prod")])).unwrap();
        assert_eq!(out, "summary: \"{{ $labels.instance }} down in prod\"\n");
    }

    #[test]
    fn test_render_keeps_backslash_before_braces() {
        let mut set = TemplateSet::new();
        let source = "x\\{{ y }}\nexpr: foo{path=~\"a\\\\.b{{\"} # <{[ context ]}>\n";
        set.add("t.yaml", source).unwrap();

        let out = set.render("t.yaml", &vars(&[("context", "prod")])).unwrap();
        assert_eq!(out, "x\\{{ y }}\nexpr: foo{path=~\"a\\\\.b{{\"} # prod\n");
    }

    #[test]
    fn test_render_keeps_characters_next_to_actions() {
        let mut set = TemplateSet::new();
        set.add("t.yaml", "up{<{[ matchers ]}>} \\<{[ context ]}> {{<{[ context ]}>").unwrap();

        let out = set
            .render("t.yaml", &vars(&[("matchers", "job=\"node\""), ("context", "prod")]))
            .unwrap();
        assert_eq!(out, "up{job=\"node\"} \\prod {{prod");
    }

    proptest! {
        #[test]
        fn text_without_actions_renders_unchanged(text in "[a-z{}\\\\$.\"][a-z {}\\\\$.\"]{0,40}") {
            let mut set = TemplateSet::new();
            set.add("t.yaml", &text).unwrap();
            let out = set.render("t.yaml", &vars(&[])).unwrap();
            prop_assert_eq!(out, text);
        }
    }

    #[test]
    fn test_render_does_not_html_escape() {
        let mut set = TemplateSet::new();
        set.add("t.yaml", "expr: <{[ expr ]}>").unwrap();
        let out = set.render("t.yaml", &vars(&[("expr", "rate(x[5m]) > 0 && y < 1")])).unwrap();
        assert_eq!(out, "expr: rate(x[5m]) > 0 && y < 1");
    }

    #[test]
    fn test_render_missing_variable_is_error() {
        let mut set = TemplateSet::new();
        set.add("t.yaml", "value: <{[ undefined_thing ]}>").unwrap();
        assert!(set.render("t.yaml", &vars(&[])).is_err());
    }

    #[test]
    fn test_add_rejects_unterminated_action() {
        let mut set = TemplateSet::new();
        let err = set.add("broken.yaml", "value: <{[ context").unwrap_err();
        assert!(err.to_string().contains("broken.yaml"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_load_dir_is_top_level_only() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("t2.yaml"), "b").unwrap();
        fs::write(temp.path().join("t1.yaml"), "a").unwrap();
        fs::write(temp.path().join("default.vars"), "x: y").unwrap();
        fs::create_dir(temp.path().join("tests")).unwrap();
        fs::write(temp.path().join("tests").join("t3.yaml"), "c").unwrap();

        let set = TemplateSet::load_dir(temp.path()).unwrap();
        assert_eq!(set.names(), ["t1.yaml", "t2.yaml"]);
    }

    #[test]
    fn test_load_dir_fails_on_malformed_template() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("good.yaml"), "<{[ context ]}>").unwrap();
        fs::write(temp.path().join("bad.yaml"), "value: <{[ context").unwrap();

        let err = TemplateSet::load_dir(temp.path()).unwrap_err();
        match err {
            TemplateError::Syntax { name, .. } => assert_eq!(name, "bad.yaml"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
