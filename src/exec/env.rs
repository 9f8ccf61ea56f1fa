// src/exec/env.rs

//! The environment handed to every child process.

use std::collections::BTreeMap;
use std::path::Path;

use tokio::process::Command;

use crate::config::EnvSpec;

/// Placeholder in `[env.set]` values replaced by the target root.
pub const ROOT_PLACEHOLDER: &str = "${ROOT}";

/// Resolved child environment: name to value, or `None` for an explicit unset.
///
/// Applying it clears the caller's environment first, so only what is listed
/// here reaches the child.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, Option<String>>,
}

impl Environment {
    /// Build the environment from `spec`, copying passthrough variables out of
    /// `inherited`.
    ///
    /// Precedence, lowest first: passthrough, `HOME` override, log variable,
    /// `[env.set]`, `[env.unset]`.
    pub fn resolve<I>(spec: &EnvSpec, root: &Path, log_path: &Path, inherited: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut vars = BTreeMap::new();

        for (name, value) in inherited {
            let passed = spec.passthrough.iter().any(|p| *p == name);
            let scrubbed = spec.scrub_prefixes.iter().any(|p| name.starts_with(p.as_str()));
            if passed && !scrubbed {
                vars.insert(name, Some(value));
            }
        }

        if let Some(home) = &spec.home {
            vars.insert(
                "HOME".to_string(),
                Some(root.join(home).display().to_string()),
            );
        }

        vars.insert(spec.log_var.clone(), Some(log_path.display().to_string()));

        let root_str = root.display().to_string();
        for (name, value) in spec.set.iter() {
            vars.insert(name.clone(), Some(value.replace(ROOT_PLACEHOLDER, &root_str)));
        }

        for name in spec.unset.iter() {
            vars.insert(name.clone(), None);
        }

        Self { vars }
    }

    /// [`Environment::resolve`] against the current process environment.
    pub fn from_current(spec: &EnvSpec, root: &Path, log_path: &Path) -> Self {
        let inherited = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
        Self::resolve(spec, root, log_path, inherited)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).and_then(|v| v.as_deref())
    }

    pub fn is_unset(&self, name: &str) -> bool {
        matches!(self.vars.get(name), Some(None))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Replace `cmd`'s environment with this one.
    pub fn apply(&self, cmd: &mut Command) {
        cmd.env_clear();
        for (name, value) in self.iter() {
            match value {
                Some(v) => {
                    cmd.env(name, v);
                }
                None => {
                    cmd.env_remove(name);
                }
            }
        }
    }
}
