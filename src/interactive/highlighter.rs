//! Input highlighting: commands in yellow, divine events in magenta

use nu_ansi_term::{Color, Style};
use reedline::{Highlighter, StyledText};

use super::commands::COMMANDS;

pub struct InputHighlighter {
    command_style: Style,
    unknown_style: Style,
    arg_style: Style,
    event_style: Style,
}

impl InputHighlighter {
    pub fn new() -> Self {
        Self {
            command_style: Style::new().fg(Color::Yellow).bold(),
            unknown_style: Style::new().fg(Color::Red),
            arg_style: Style::new().fg(Color::Cyan),
            event_style: Style::new().fg(Color::Magenta).italic(),
        }
    }
}

impl Default for InputHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter for InputHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut styled = StyledText::new();

        if line.starts_with('.') {
            let (cmd, rest) = match line.split_once(' ') {
                Some((c, r)) => (c, Some(r)),
                None => (line, None),
            };

            let known = COMMANDS.iter().any(|c| c.matches(&cmd.to_lowercase()));
            let style = if known {
                self.command_style
            } else {
                self.unknown_style
            };
            styled.push((style, cmd.to_string()));

            if let Some(rest) = rest {
                styled.push((Style::new(), " ".to_string()));
                styled.push((self.arg_style, rest.to_string()));
            }
        } else {
            styled.push((self.event_style, line.to_string()));
        }

        styled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_command_and_args() {
        let highlighter = InputHighlighter::new();
        let styled = highlighter.highlight(".speed 5", 0);

        assert_eq!(styled.buffer.len(), 3);
        assert_eq!(styled.buffer[0].1, ".speed");
        assert_eq!(styled.buffer[2].1, "5");
    }

    #[test]
    fn test_highlight_event_text() {
        let highlighter = InputHighlighter::new();
        let styled = highlighter.highlight("Пошёл снег", 0);

        assert_eq!(styled.buffer.len(), 1);
        assert_eq!(styled.buffer[0].0, Style::new().fg(Color::Magenta).italic());
    }
}
