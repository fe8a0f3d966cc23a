//! Rule hooks written as data in the settings file.
//!
//! ```yaml
//! require: [LookupActivity]
//! rules:
//!   - exclude: all
//!   - include: { function: LookupActivity }
//!   - include: { class: CBaseAnimating }
//!   - include: { match: { all_of: [ { within: CBaseAnimating }, { access: public } ] } }
//!   - rename: { select: { class: CBaseAnimating }, to: BaseAnimating }
//!   - suppress: { select: { name: GetModelPtr }, code: W1050 }
//!   - transform: { select: { name: GetBonePosition }, tag: output_args }
//!   - include: { class: C_BaseEntity }
//!     when: client
//! ```

use regex::Regex;
use serde_yml::Value;

use super::invalid;
use crate::decl::{Access, DeclKind};
use crate::error::{ConfigError, RuleError};
use crate::matcher::{Matcher, Predicate};
use crate::module::{HookContext, RuleHook, Target};
use crate::rules::{Action, Rule, RuleSet, Selector};

/// A hook whose rules were fixed at load time. Every symbol in `require`
/// must be present in the parse result or the pass fails.
#[derive(Debug, Clone, Default)]
pub struct DeclarativeHook {
    require: Vec<String>,
    rules: Vec<Rule>,
}

impl DeclarativeHook {
    pub fn new(require: Vec<String>, rules: Vec<Rule>) -> Self {
        Self { require, rules }
    }

    pub fn configured_rules(&self) -> &[Rule] {
        &self.rules
    }
}

impl RuleHook for DeclarativeHook {
    fn rules(&self, ctx: &HookContext<'_>) -> Result<RuleSet, RuleError> {
        for symbol in &self.require {
            ctx.require(symbol)?;
        }
        let mut set = RuleSet::new();
        set.extend(self.rules.iter().cloned());
        Ok(set)
    }
}

const ACTIONS: [&str; 5] = ["include", "exclude", "rename", "transform", "suppress"];

pub fn parse_rules(value: &Value, module: &str) -> Result<Vec<Rule>, ConfigError> {
    let seq = value
        .as_sequence()
        .ok_or_else(|| invalid(format!("module `{module}`: `rules` must be a list")))?;
    seq.iter()
        .enumerate()
        .map(|(i, item)| {
            parse_rule(item).map_err(|msg| invalid(format!("module `{module}` rule #{i}: {msg}")))
        })
        .collect()
}

fn parse_rule(value: &Value) -> Result<Rule, String> {
    let map = value.as_mapping().ok_or("rule must be a mapping")?;

    let mut action_key = None;
    for (key, _) in map {
        let key = key.as_str().ok_or("rule keys must be strings")?;
        if ACTIONS.contains(&key) {
            if action_key.is_some() {
                return Err("rule has more than one action".to_string());
            }
            action_key = Some(key);
        } else if key != "when" {
            return Err(format!("unknown rule key `{key}`"));
        }
    }
    let action_key = action_key.ok_or("rule has no action")?;
    let body = value.get(action_key).ok_or("rule has no action")?;

    let (selector, action) = match action_key {
        "include" => (parse_selector(body)?, Action::Include),
        "exclude" => (parse_selector(body)?, Action::Exclude),
        "rename" => {
            let (selector, to) = selector_with(body, "to")?;
            (selector, Action::Rename(to))
        }
        "transform" => {
            let (selector, tag) = selector_with(body, "tag")?;
            (selector, Action::Transform(tag))
        }
        _ => {
            let (selector, code) = selector_with(body, "code")?;
            (selector, Action::SuppressWarning(code))
        }
    };

    let mut rule = Rule::new(selector, action);
    if let Some(when) = value.get("when") {
        let name = when.as_str().ok_or("`when` must be a string")?;
        let target = Target::from_str(name).ok_or_else(|| format!("unknown target `{name}`"))?;
        rule = rule.only_for(target);
    }
    Ok(rule)
}

/// `{ select: <selector>, <key>: <string> }`
fn selector_with(body: &Value, key: &str) -> Result<(Selector, String), String> {
    let select = body
        .get("select")
        .ok_or_else(|| "missing `select`".to_string())?;
    let arg = body
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing `{key}`"))?;
    Ok((parse_selector(select)?, arg.to_string()))
}

fn single_entry(value: &Value, what: &str) -> Result<(String, Value), String> {
    let map = value
        .as_mapping()
        .ok_or_else(|| format!("{what} must be a mapping with one key"))?;
    let mut iter = map.iter();
    match (iter.next(), iter.next()) {
        (Some((k, v)), None) => {
            let key = k.as_str().ok_or_else(|| format!("{what} key must be a string"))?;
            Ok((key.to_string(), v.clone()))
        }
        _ => Err(format!("{what} must be a mapping with one key")),
    }
}

fn parse_selector(value: &Value) -> Result<Selector, String> {
    if value.as_str() == Some("all") {
        return Ok(Selector::All);
    }
    let (key, arg) = single_entry(value, "selector")?;
    if key == "match" {
        return Ok(Selector::Matching(parse_matcher(&arg)?));
    }
    let name = arg
        .as_str()
        .ok_or_else(|| format!("selector `{key}` takes a string"))?;
    match key.as_str() {
        "name" => Ok(Selector::name(name)),
        "path" => Ok(Selector::path(name)),
        "namespace" => Ok(Selector::namespace(name)),
        "function" => Ok(Selector::free_function(name)),
        "method" => Ok(Selector::member_function(name)),
        "class" => Ok(Selector::class(name)),
        "enum" => Ok(Selector::enum_(name)),
        "variable" => Ok(Selector::variable(name)),
        other => Err(format!("unknown selector `{other}`")),
    }
}

fn parse_matcher(value: &Value) -> Result<Matcher, String> {
    let (key, arg) = single_entry(value, "matcher")?;
    let text = || {
        arg.as_str()
            .map(String::from)
            .ok_or_else(|| format!("matcher `{key}` takes a string"))
    };
    let list = || -> Result<Vec<Matcher>, String> {
        arg.as_sequence()
            .ok_or_else(|| format!("matcher `{key}` takes a list"))?
            .iter()
            .map(parse_matcher)
            .collect()
    };

    let matcher = match key.as_str() {
        "all_of" => Matcher::And(list()?),
        "any_of" => Matcher::Or(list()?),
        "not" => parse_matcher(&arg)?.negate(),
        "name" => Matcher::name(text()?),
        "path" => Matcher::path(text()?),
        "regex" => {
            let pattern = text()?;
            let re = Regex::new(&pattern).map_err(|e| format!("bad regex `{pattern}`: {e}"))?;
            Matcher::Leaf(Predicate::NameRegex(re))
        }
        "kind" => {
            let kind = text()?;
            Matcher::kind(DeclKind::from_str(&kind).ok_or_else(|| format!("unknown kind `{kind}`"))?)
        }
        "access" => {
            let access = text()?;
            Matcher::access(
                Access::from_str(&access).ok_or_else(|| format!("unknown access `{access}`"))?,
            )
        }
        "type" => Matcher::uses_type(&text()?),
        "type_decl" => Matcher::uses_type_decl(text()?),
        "within" => Matcher::within(text()?),
        "member" => match arg.as_bool() {
            Some(true) => Matcher::member(),
            Some(false) => Matcher::member().negate(),
            None => return Err("matcher `member` takes a boolean".to_string()),
        },
        other => return Err(format!("unknown matcher `{other}`")),
    };
    Ok(matcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{PassScope, Variant};
    use crate::testutil::anim_tree;

    fn rules_from(yaml: &str) -> Result<Vec<Rule>, ConfigError> {
        let value: Value = serde_yml::from_str(yaml).unwrap();
        parse_rules(&value, "anim")
    }

    fn included(rules: Vec<Rule>, scope: PassScope) -> Vec<String> {
        let tree = anim_tree();
        let hook = DeclarativeHook::new(vec![], rules);
        let ctx = HookContext::new("anim", scope, &tree);
        let set = RuleHook::rules(&hook, &ctx).unwrap();
        let filtered = set.filter(tree.clone(), &scope).unwrap();
        filtered
            .summary()
            .into_iter()
            .map(|d| format!("{}={}", d.qualified_name, d.exposed_name))
            .collect()
    }

    fn client() -> PassScope {
        PassScope::new(Variant::Client, Target::Client)
    }

    #[test]
    fn allow_list_rules() {
        let rules = rules_from(
            "- exclude: all\n- include: { function: LookupActivity }\n",
        )
        .unwrap();
        assert_eq!(included(rules, client()), vec!["LookupActivity=LookupActivity"]);
    }

    #[test]
    fn rename_transform_suppress() {
        let rules = rules_from(
            "\
- include: { class: CBaseAnimating }
- include: { namespace: CBaseAnimating }
- rename: { select: { class: CBaseAnimating }, to: BaseAnimating }
- suppress: { select: { method: SetSequence }, code: W1020 }
- transform: { select: { method: SetSequence }, tag: release_gil }
",
        )
        .unwrap();
        assert_eq!(rules.len(), 5);
        assert_eq!(rules[2].action, Action::Rename("BaseAnimating".to_string()));
        assert_eq!(rules[3].action, Action::SuppressWarning("W1020".to_string()));
        assert_eq!(rules[4].action, Action::Transform("release_gil".to_string()));
        assert_eq!(
            included(rules, client()),
            vec![
                "CBaseAnimating=BaseAnimating",
                "CBaseAnimating::SetSequence=SetSequence",
                "CBaseAnimating::ResetSequenceInfo=ResetSequenceInfo",
            ]
        );
    }

    #[test]
    fn matcher_expressions() {
        let rules = rules_from(
            "\
- include:
    match:
      all_of:
        - kind: function
        - member: false
        - type_decl: 'const char *'
        - not: { regex: '^LookupSeq' }
- include: { match: { all_of: [ { within: CBaseAnimating }, { access: private } ] } }
",
        )
        .unwrap();
        assert_eq!(
            included(rules, client()),
            vec![
                "LookupActivity=LookupActivity",
                "CBaseAnimating::ResetSequenceInfo=ResetSequenceInfo",
            ]
        );
    }

    #[test]
    fn when_scopes_rules_to_a_target() {
        let rules = rules_from("- include: { name: LookupSequence }\n  when: server\n").unwrap();
        assert_eq!(rules[0].only, Some(Target::Server));
        let semi_client = PassScope::new(Variant::SemiShared, Target::Client);
        let semi_server = PassScope::new(Variant::SemiShared, Target::Server);
        assert!(included(rules.clone(), semi_client).is_empty());
        assert_eq!(included(rules, semi_server), vec!["LookupSequence=LookupSequence"]);
    }

    #[test]
    fn required_symbols() {
        let tree = anim_tree();
        let ctx = HookContext::new("anim", client(), &tree);
        let ok = DeclarativeHook::new(vec!["CBaseAnimating::SetSequence".to_string()], vec![]);
        assert!(RuleHook::rules(&ok, &ctx).is_ok());
        let missing = DeclarativeHook::new(vec!["CTakeDamageInfo".to_string()], vec![]);
        assert!(matches!(
            RuleHook::rules(&missing, &ctx),
            Err(RuleError::MissingSymbol(name)) if name == "CTakeDamageInfo"
        ));
    }

    #[test]
    fn malformed_rules_name_the_module_and_index() {
        for (yaml, needle) in [
            ("- frobnicate: all\n", "rule #0: unknown rule key `frobnicate`"),
            ("- {}\n", "rule #0: rule has no action"),
            ("- include: all\n  exclude: all\n", "more than one action"),
            ("- include: { klass: X }\n", "unknown selector `klass`"),
            ("- rename: { select: all }\n", "missing `to`"),
            ("- include: { match: { regex: '(' } }\n", "bad regex"),
            ("- include: { match: { kind: typedef } }\n", "unknown kind `typedef`"),
            ("- include: all\n  when: mobile\n", "unknown target `mobile`"),
            ("- include: { name: a, path: b }\n", "one key"),
        ] {
            let err = rules_from(yaml).unwrap_err().to_string();
            assert!(err.contains("module `anim`"), "{err}");
            assert!(err.contains(needle), "expected `{needle}` in `{err}`");
        }
    }
}
