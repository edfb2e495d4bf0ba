//! Autocompletion for dot commands

use reedline::{Completer, Span, Suggestion};

use super::commands::COMMANDS;

pub struct CommandCompleter;

impl Completer for CommandCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let line_to_pos = &line[..pos];

        // Only the command word itself
        if !line_to_pos.starts_with('.') || line_to_pos.contains(char::is_whitespace) {
            return vec![];
        }

        let partial = line_to_pos.to_lowercase();

        let mut suggestions: Vec<Suggestion> = COMMANDS
            .iter()
            .filter(|cmd| cmd.name.starts_with(partial.as_str()))
            .map(|cmd| Suggestion {
                value: cmd.name.to_string(),
                description: Some(cmd.description.to_string()),
                style: None,
                extra: None,
                span: Span::new(0, pos),
                append_whitespace: !cmd.args.is_empty(),
            })
            .collect();

        suggestions.sort_by(|a, b| a.value.cmp(&b.value));
        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completes_prefix() {
        let mut completer = CommandCompleter;

        let suggestions = completer.complete(".p", 2);
        let values: Vec<_> = suggestions.iter().map(|s| s.value.as_str()).collect();
        assert_eq!(values, vec![".pause", ".play", ".providers"]);
    }

    #[test]
    fn test_no_completion_for_plain_text_or_args() {
        let mut completer = CommandCompleter;

        assert!(completer.complete("дождь", "дождь".len()).is_empty());
        assert!(completer.complete(".speed 1", 8).is_empty());
    }
}
