//! Runner-side scripts the generated jobs call into.
//!
//! Every job that runs a helper script first installs the script bundle
//! with [`setup_scripts_step`]; helpers are then invoked through
//! `actions/github-script` by file name.

use crate::emitter::Step;

/// Action that unpacks the helper scripts.
pub const SETUP_ACTION: &str = "githubnext/gh-aw/actions/setup@v0";
/// Directory the helper scripts are unpacked into.
pub const SCRIPTS_DIR: &str = "/tmp/gh-aw/actions";
pub const GITHUB_SCRIPT_ACTION: &str = "actions/github-script@v8";

pub fn setup_scripts_step() -> Step {
    Step::uses("Setup scripts", SETUP_ACTION).with_input("destination", SCRIPTS_DIR)
}

/// Path of a helper script by name (`check_membership`).
pub fn script_path(name: &str) -> String {
    format!("{}/{}.cjs", SCRIPTS_DIR, name)
}

/// A `github-script` step that runs one helper's `main`.
pub fn script_step(name: impl Into<String>, script: &str) -> Step {
    Step::uses(name, GITHUB_SCRIPT_ACTION).with_input(
        "script",
        format!(
            "const {{ main }} = require('{}');\nawait main();\n",
            script_path(script)
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    #[test]
    fn script_step_requires_helper() {
        let step = script_step("Check", "check_membership");
        assert_eq!(step.uses.as_deref(), Some(GITHUB_SCRIPT_ACTION));
        assert_eq!(
            step.with["script"],
            Value::from(
                "const { main } = require('/tmp/gh-aw/actions/check_membership.cjs');\nawait main();\n"
            )
        );
    }
}
