// ABOUTME: Shell action step: build/install/clean commands on the worker.
// ABOUTME: Argv elements may reference properties via {name} placeholders.

use std::collections::HashMap;

use super::run_action;
use crate::build::context::StepContext;
use crate::build::error::StepError;
use crate::build::properties::PropertyBag;

/// Substitute `{key}` placeholders with string properties from the bag.
/// Unknown placeholders are left as-is; the action will fail loudly if it
/// needed them.
pub fn interpolate(argv: &[String], bag: &PropertyBag) -> Vec<String> {
    argv.iter()
        .map(|arg| {
            let mut rendered = arg.clone();
            let mut search = 0;
            while let Some(open) = rendered[search..].find('{') {
                let open = search + open;
                let Some(close) = rendered[open..].find('}') else {
                    break;
                };
                let close = open + close;
                let name = &rendered[open + 1..close];
                match bag.get_str(name) {
                    Some(value) => {
                        rendered.replace_range(open..=close, value);
                        search = open + value.len();
                    }
                    None => search = close + 1,
                }
            }
            rendered
        })
        .collect()
}

/// Run one shell-level action with the build's property placeholders
/// substituted into the argv.
pub async fn execute(
    ctx: &StepContext,
    bag: &mut PropertyBag,
    name: &str,
    argv: &[String],
    env: &HashMap<String, String>,
) -> Result<(), StepError> {
    let rendered = interpolate(argv, bag);
    run_action(ctx, name, &rendered, env).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::properties::key;

    #[test]
    fn interpolates_known_properties() {
        let mut bag = PropertyBag::new();
        bag.set(key::DEVICE, "/dev/xvdb");
        let argv = vec!["--device".to_string(), "{device}".to_string()];
        assert_eq!(interpolate(&argv, &bag), vec!["--device", "/dev/xvdb"]);
    }

    #[test]
    fn leaves_unknown_placeholders() {
        let bag = PropertyBag::new();
        let argv = vec!["{missing}".to_string(), "plain".to_string()];
        assert_eq!(interpolate(&argv, &bag), vec!["{missing}", "plain"]);
    }

    #[test]
    fn interpolates_mid_string() {
        let mut bag = PropertyBag::new();
        bag.set(key::APPLIANCE, "core");
        let argv = vec!["/mnt/{appliance}/out".to_string()];
        assert_eq!(interpolate(&argv, &bag), vec!["/mnt/core/out"]);
    }
}
