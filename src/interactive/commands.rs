//! Dot commands of the simulation REPL

use std::path::PathBuf;

/// Command table entry, used by help and completion
pub struct CommandInfo {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub args: &'static str,
    pub description: &'static str,
}

impl CommandInfo {
    pub fn matches(&self, cmd: &str) -> bool {
        self.name == cmd || self.aliases.contains(&cmd)
    }

    pub fn usage(&self) -> String {
        if self.args.is_empty() {
            self.name.to_string()
        } else {
            format!("{} {}", self.name, self.args)
        }
    }
}

pub const COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        name: ".help",
        aliases: &[".?", ".h"],
        args: "",
        description: "Show this help",
    },
    CommandInfo {
        name: ".agents",
        aliases: &[".ls"],
        args: "",
        description: "List agents with mood and current action",
    },
    CommandInfo {
        name: ".inspect",
        aliases: &[".i"],
        args: "<agent>",
        description: "Show an agent's relationships and memories",
    },
    CommandInfo {
        name: ".log",
        aliases: &[".l"],
        args: "[n]",
        description: "Show the last n journal entries (default 20)",
    },
    CommandInfo {
        name: ".graph",
        aliases: &[".g"],
        args: "[json|dot]",
        description: "Show the relationship graph",
    },
    CommandInfo {
        name: ".step",
        aliases: &[".s"],
        args: "[n]",
        description: "Run n turns right now (default 1)",
    },
    CommandInfo {
        name: ".play",
        aliases: &[".p"],
        args: "",
        description: "Run the timed loop behind the prompt",
    },
    CommandInfo {
        name: ".pause",
        aliases: &[],
        args: "",
        description: "Pause the timed loop",
    },
    CommandInfo {
        name: ".speed",
        aliases: &[],
        args: "<1-10>",
        description: "Set the simulation speed",
    },
    CommandInfo {
        name: ".event",
        aliases: &[".god"],
        args: "<text>",
        description: "Divine event: change the global context",
    },
    CommandInfo {
        name: ".add",
        aliases: &[],
        args: "<name> | <role> | <persona>",
        description: "Bring a new agent into the world",
    },
    CommandInfo {
        name: ".context",
        aliases: &[],
        args: "",
        description: "Show the global context",
    },
    CommandInfo {
        name: ".providers",
        aliases: &[],
        args: "",
        description: "List available providers and models",
    },
    CommandInfo {
        name: ".save",
        aliases: &[],
        args: "<path>",
        description: "Write a JSON snapshot of the world",
    },
    CommandInfo {
        name: ".info",
        aliases: &[],
        args: "",
        description: "Show simulation info",
    },
    CommandInfo {
        name: ".quit",
        aliases: &[".exit", ".q"],
        args: "",
        description: "Exit",
    },
];

pub const DEFAULT_LOG_LINES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphFormat {
    #[default]
    Text,
    Json,
    Dot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Agents,
    Inspect(String),
    Log(usize),
    Graph(GraphFormat),
    Step(u32),
    Play,
    Pause,
    Speed(u8),
    Event(String),
    Add {
        name: String,
        role: String,
        persona: String,
    },
    Context,
    Providers,
    Save(PathBuf),
    Info,
}

impl Command {
    /// Parses one input line. Plain text is a divine event.
    ///
    /// The error is a user-facing message.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        if !line.starts_with('.') {
            return Ok(Self::Event(line.to_string()));
        }

        let (cmd, args) = match line.split_once(char::is_whitespace) {
            Some((c, a)) => (c, a.trim()),
            None => (line, ""),
        };
        let cmd = cmd.to_lowercase();

        let Some(info) = COMMANDS.iter().find(|c| c.matches(&cmd)) else {
            return Err(format!(
                "Unknown command: {cmd}\nType .help to see available commands."
            ));
        };
        let usage = || format!("Usage: {}", info.usage());

        let command = match info.name {
            ".help" => Self::Help,
            ".quit" => Self::Quit,
            ".agents" => Self::Agents,
            ".inspect" => {
                if args.is_empty() {
                    return Err(usage());
                }
                Self::Inspect(args.to_string())
            }
            ".log" => Self::Log(optional_number(args, DEFAULT_LOG_LINES).ok_or_else(usage)?),
            ".graph" => Self::Graph(match args.to_lowercase().as_str() {
                "" | "text" => GraphFormat::Text,
                "json" => GraphFormat::Json,
                "dot" => GraphFormat::Dot,
                _ => return Err(usage()),
            }),
            ".step" => Self::Step(optional_number(args, 1).ok_or_else(usage)?),
            ".play" => Self::Play,
            ".pause" => Self::Pause,
            ".speed" => Self::Speed(args.parse().map_err(|_| usage())?),
            ".event" => {
                if args.is_empty() {
                    return Err(usage());
                }
                Self::Event(args.to_string())
            }
            ".add" => {
                let mut parts = args.splitn(3, '|').map(str::trim);
                let name = parts.next().unwrap_or_default();
                let role = parts.next().unwrap_or_default();
                let persona = parts.next().unwrap_or_default();
                if name.is_empty() || role.is_empty() {
                    return Err(usage());
                }
                Self::Add {
                    name: name.to_string(),
                    role: role.to_string(),
                    persona: persona.to_string(),
                }
            }
            ".context" => Self::Context,
            ".providers" => Self::Providers,
            ".save" => {
                if args.is_empty() {
                    return Err(usage());
                }
                Self::Save(PathBuf::from(args))
            }
            _ => Self::Info,
        };

        Ok(command)
    }
}

/// Empty means `default`; zero or garbage is rejected.
fn optional_number<T>(args: &str, default: T) -> Option<T>
where
    T: std::str::FromStr + PartialEq + Default,
{
    if args.is_empty() {
        return Some(default);
    }
    args.parse().ok().filter(|n| *n != T::default())
}
