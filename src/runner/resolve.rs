use crate::error::CommandFailure;
use crate::prefs::Preferences;

/// Turn the user's argument vector into the one that is executed.
///
/// A leading alias is expanded once with shell quoting rules, then the
/// program name is mapped through `cmds` (tool name to executable).
pub fn resolve_argv(argv: &[String], prefs: &Preferences) -> Result<Vec<String>, CommandFailure> {
    let Some((first, rest)) = argv.split_first() else {
        return Err(CommandFailure::Resolve("no command given".to_string()));
    };

    let mut resolved = match prefs.aliases.get(first) {
        Some(expansion) => {
            let words = shell_words::split(expansion)
                .map_err(|e| CommandFailure::Resolve(format!("alias `{}`: {}", first, e)))?;
            if words.is_empty() {
                return Err(CommandFailure::Resolve(format!(
                    "alias `{}` expands to nothing",
                    first
                )));
            }
            tracing::debug!("alias {} -> {:?}", first, words);
            words
        }
        None => vec![first.clone()],
    };
    resolved.extend(rest.iter().cloned());

    if let Some(executable) = prefs.cmds.get(&resolved[0])
        && !executable.is_empty()
    {
        tracing::debug!("command {} -> {}", resolved[0], executable);
        resolved[0] = executable.clone();
    }

    Ok(resolved)
}
