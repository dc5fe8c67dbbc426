//! Command help rendering.

use braid_core::command::Command;

/// Renders one command's help line from its descriptor alone.
///
/// Required parameters are emphasized (`<name>`), optional ones bracketed
/// (`[name]`); the shortcut is appended as an alias. Filtering on
/// `hidden` / `skip_help` is the caller's business.
pub fn describe(command: &Command) -> String {
    let mut text = command.command.clone();

    if let Some(parameters) = &command.parameters {
        for parameter in parameters {
            if parameter.required {
                text.push_str(&format!(" <{}>", parameter.name));
            } else {
                text.push_str(&format!(" [{}]", parameter.name));
            }
        }
    }

    if !command.description.is_empty() {
        text.push_str(" - ");
        text.push_str(&command.description);
    }

    if let Some(shortcut) = &command.shortcut {
        text.push_str(&format!(" (alias: {shortcut})"));
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use braid_core::command::Parameter;

    #[test]
    fn renders_parameters_description_and_alias() {
        let command = Command::new("/weather")
            .parameter(Parameter::required("place"))
            .parameter(Parameter::optional("day"))
            .description("weather report")
            .shortcut("/w");

        assert_eq!(
            describe(&command),
            "/weather <place> [day] - weather report (alias: /w)"
        );
    }

    #[test]
    fn bare_command_renders_token_only() {
        assert_eq!(describe(&Command::new("/ping")), "/ping");
    }
}
