use indexmap::IndexSet;
use log;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static BUILTIN_IGNORE_RULES: Lazy<IgnoreRuleSet> = Lazy::new(|| {
    let yaml_content = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../data/builtin_ignores.yaml"
    ));
    serde_yml::from_str(yaml_content).expect("Failed to parse embedded data/builtin_ignores.yaml")
});

pub fn get_builtin_ignore_rules() -> &'static IgnoreRuleSet {
    &BUILTIN_IGNORE_RULES
}

/// Directory names and file extensions excluded from counting.
///
/// Both fields are insertion-ordered sets: iteration order is stable for
/// reproducible command lines, while equality ignores order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreRuleSet {
    #[serde(default)]
    pub exclude_dir: IndexSet<String>,
    #[serde(default)]
    pub exclude_ext: IndexSet<String>,
}

/// The user-supplied half of the rules, as written in `[ignore]`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialIgnoreRules {
    #[serde(default, alias = "excludeDir")]
    pub exclude_dir: Vec<String>,
    #[serde(default, alias = "excludeExt")]
    pub exclude_ext: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolvedIgnoreRules {
    pub rules: IgnoreRuleSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl IgnoreRuleSet {
    /// Union of `self` and `additions`. Existing entries keep their position;
    /// new ones are appended in the order given.
    pub fn merged_with(&self, additions: &PartialIgnoreRules) -> IgnoreRuleSet {
        let mut merged = self.clone();
        for dir in additions.exclude_dir.iter().filter_map(|d| clean_entry(d, false)) {
            if merged.exclude_dir.insert(dir.clone()) {
                log::trace!("Added user exclude dir: {}", dir);
            }
        }
        for ext in additions.exclude_ext.iter().filter_map(|e| clean_entry(e, true)) {
            if merged.exclude_ext.insert(ext.clone()) {
                log::trace!("Added user exclude ext: {}", ext);
            }
        }
        merged
    }

    /// Comma-joined value for cloc's `--exclude-dir`, `None` when empty.
    pub fn exclude_dir_arg(&self) -> Option<String> {
        join_non_empty(&self.exclude_dir)
    }

    /// Comma-joined value for cloc's `--exclude-ext`, `None` when empty.
    pub fn exclude_ext_arg(&self) -> Option<String> {
        join_non_empty(&self.exclude_ext)
    }

    pub fn len(&self) -> usize {
        self.exclude_dir.len() + self.exclude_ext.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exclude_dir.is_empty() && self.exclude_ext.is_empty()
    }
}

fn clean_entry(raw: &str, is_ext: bool) -> Option<String> {
    let mut entry = raw.trim();
    if is_ext {
        entry = entry.trim_start_matches('.');
    }
    if entry.is_empty() {
        return None;
    }
    if entry.contains(',') {
        log::warn!(
            "Ignoring exclude entry '{}': commas are not allowed in rule names",
            raw
        );
        return None;
    }
    Some(entry.to_string())
}

fn join_non_empty(set: &IndexSet<String>) -> Option<String> {
    if set.is_empty() {
        None
    } else {
        Some(set.iter().map(String::as_str).collect::<Vec<_>>().join(","))
    }
}

/// Merges the built-in rules with the raw `[ignore]` section of the config.
///
/// Never fails: if the user section is not a table of string lists, the
/// built-in rules are returned unchanged together with a warning.
pub fn resolve_ignore_rules(
    builtin: &IgnoreRuleSet,
    user_section: Option<&toml::Value>,
) -> ResolvedIgnoreRules {
    log::debug!("Resolving ignore rules...");
    let Some(raw) = user_section else {
        log::debug!("No user ignore rules configured, using built-in rules.");
        return ResolvedIgnoreRules {
            rules: builtin.clone(),
            warning: None,
        };
    };

    match raw.clone().try_into::<PartialIgnoreRules>() {
        Ok(additions) => {
            let rules = builtin.merged_with(&additions);
            log::info!(
                "Resolved {} exclude dirs and {} exclude extensions ({} user additions).",
                rules.exclude_dir.len(),
                rules.exclude_ext.len(),
                rules.len().saturating_sub(builtin.len())
            );
            ResolvedIgnoreRules {
                rules,
                warning: None,
            }
        }
        Err(e) => {
            let warning = format!(
                "Ignoring malformed [ignore] section ({}); expected lists of strings under exclude_dir/exclude_ext. Using built-in rules only.",
                e.to_string().trim()
            );
            log::warn!("{}", warning);
            ResolvedIgnoreRules {
                rules: builtin.clone(),
                warning: Some(warning),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin() -> IgnoreRuleSet {
        IgnoreRuleSet {
            exclude_dir: ["node_modules", ".git"].into_iter().map(String::from).collect(),
            exclude_ext: ["md", "lock"].into_iter().map(String::from).collect(),
        }
    }

    fn section(toml_src: &str) -> toml::Value {
        let table: toml::Table = toml::from_str(toml_src).unwrap();
        table.get("ignore").cloned().unwrap()
    }

    #[test]
    fn test_builtin_rules_cover_common_cases() {
        let rules = get_builtin_ignore_rules();
        for dir in [".git", "node_modules", "target", "tests", "docs", "examples"] {
            assert!(rules.exclude_dir.contains(dir), "missing dir {}", dir);
        }
        for ext in ["md", "lock", "toml", "png", "d.ts", "class"] {
            assert!(rules.exclude_ext.contains(ext), "missing ext {}", ext);
        }
    }

    #[test]
    fn test_no_user_section_returns_builtin() {
        let resolved = resolve_ignore_rules(&builtin(), None);
        assert_eq!(resolved.rules, builtin());
        assert!(resolved.warning.is_none());
    }

    #[test]
    fn test_union_deduplicates_and_keeps_order() {
        let user = section(
            r#"
[ignore]
exclude_dir = ["my-test", ".git", "my-test"]
exclude_ext = [".bak", "md"]
"#,
        );
        let resolved = resolve_ignore_rules(&builtin(), Some(&user));
        let dirs: Vec<&str> = resolved.rules.exclude_dir.iter().map(String::as_str).collect();
        assert_eq!(dirs, vec!["node_modules", ".git", "my-test"]);
        let exts: Vec<&str> = resolved.rules.exclude_ext.iter().map(String::as_str).collect();
        assert_eq!(exts, vec!["md", "lock", "bak"]);
        assert!(resolved.warning.is_none());
    }

    #[test]
    fn test_camel_case_keys_accepted() {
        let user = section("[ignore]\nexcludeDir = [\"local-docs\"]\n");
        let resolved = resolve_ignore_rules(&builtin(), Some(&user));
        assert!(resolved.rules.exclude_dir.contains("local-docs"));
    }

    #[test]
    fn test_user_order_does_not_change_rule_set() {
        let xy = section("[ignore]\nexclude_dir = [\"x\", \"y\"]\n");
        let yx = section("[ignore]\nexclude_dir = [\"y\", \"x\"]\n");
        assert_eq!(
            resolve_ignore_rules(&builtin(), Some(&xy)).rules,
            resolve_ignore_rules(&builtin(), Some(&yx)).rules
        );
    }

    #[test]
    fn test_malformed_section_falls_back_with_warning() {
        for src in [
            "ignore = \"node_modules\"",
            "[ignore]\nexclude_dir = \"vendor\"\n",
            "[ignore]\nexclude_dir = [1, 2]\n",
            "[ignore]\nexclude_dirs = [\"typo\"]\n",
        ] {
            let user = section(src);
            let resolved = resolve_ignore_rules(&builtin(), Some(&user));
            assert_eq!(resolved.rules, builtin(), "input: {}", src);
            assert!(resolved.warning.is_some(), "input: {}", src);
        }
    }

    #[test]
    fn test_blank_and_comma_entries_are_dropped() {
        let additions = PartialIgnoreRules {
            exclude_dir: vec!["  ".into(), "a,b".into(), " gen2 ".into()],
            exclude_ext: vec![".".into()],
        };
        let merged = builtin().merged_with(&additions);
        assert_eq!(merged.exclude_dir.len(), 3);
        assert!(merged.exclude_dir.contains("gen2"));
        assert_eq!(merged.exclude_ext, builtin().exclude_ext);
    }

    #[test]
    fn test_cloc_arguments() {
        let rules = builtin();
        assert_eq!(rules.exclude_dir_arg().as_deref(), Some("node_modules,.git"));
        assert_eq!(rules.exclude_ext_arg().as_deref(), Some("md,lock"));
        assert_eq!(IgnoreRuleSet::default().exclude_dir_arg(), None);
        assert!(IgnoreRuleSet::default().is_empty());
        assert_eq!(rules.len(), 4);
    }
}
