//! Interactive REPL Module
//!
//! Terminal front end for the simulation:
//! - Prompt showing provider:model and the play state
//! - Autocompletion and highlighting for dot commands
//! - Plain input becomes a divine event
//! - Spinner while a stepped turn is thinking
//! - `.play` runs the timed loop behind the prompt; its journal lines are
//!   printed above the line being edited

mod commands;
mod completer;
mod highlighter;
mod prompt;
pub mod render;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use reedline::{
    default_emacs_keybindings, ColumnarMenu, EditMode, Emacs, ExternalPrinter, KeyCode,
    KeyModifiers, MenuBuilder, Reedline, ReedlineEvent, ReedlineMenu, Signal,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::oneshot;
use tokio::task::{self, JoinHandle};

use crate::config::SimConfig;
use crate::errors::{Result, SimError};
use crate::providers::ProviderRegistry;
use crate::sim::{tick_interval, Simulation};
use crate::world::{LogEntry, TurnOutcome, World};

pub use self::commands::{Command, GraphFormat, COMMANDS};
use self::completer::CommandCompleter;
use self::highlighter::InputHighlighter;
use self::prompt::SimPrompt;

const MENU_NAME: &str = "completion_menu";
const PRINTER_CAPACITY: usize = 256;

/// Timed loop running behind the prompt
struct Runner {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<u64>,
    printer: JoinHandle<()>,
}

impl Runner {
    fn spawn(sim: &Simulation, printer: &ExternalPrinter<String>) -> Self {
        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn({
            let sim = sim.clone();
            async move {
                sim.run(None, async {
                    let _ = stopped.await;
                })
                .await
            }
        });

        let mut events = sim.subscribe();
        let lines = printer.sender();
        let printer = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(entry) => {
                        let line = render::log_line(&entry, render::wrap_width());
                        if lines.try_send(line).is_err() {
                            tracing::debug!("Printer queue full, journal line dropped");
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Journal display lagged, {skipped} entries skipped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Self {
            stop,
            handle,
            printer,
        }
    }

    /// Cancels any turn in flight; returns the turns completed by the loop
    async fn shutdown(self) -> u64 {
        let _ = self.stop.send(());
        let completed = self.handle.await.unwrap_or_default();
        self.printer.abort();
        completed
    }
}

/// Interactive REPL
pub struct Interactive {
    sim: Simulation,
    registry: ProviderRegistry,
    config: SimConfig,
    editor: Reedline,
    prompt: SimPrompt,
    printer: ExternalPrinter<String>,
    runner: Option<Runner>,
}

impl Interactive {
    pub fn new(sim: Simulation, registry: ProviderRegistry, config: SimConfig) -> Self {
        let prompt = SimPrompt::new(&sim);
        let printer = ExternalPrinter::new(PRINTER_CAPACITY);
        Self {
            sim,
            registry,
            config,
            editor: Self::create_editor(printer.clone()),
            prompt,
            printer,
            runner: None,
        }
    }

    /// Run the interactive REPL
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        loop {
            self.prompt.update(&self.sim);

            let (editor, prompt) = (&mut self.editor, &self.prompt);
            match task::block_in_place(|| editor.read_line(prompt)) {
                Ok(Signal::Success(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    match Command::parse(line) {
                        Ok(command) => match self.handle_command(command).await {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(e) => eprintln!("\x1b[31m✗ Error: {e}\x1b[0m\n"),
                        },
                        Err(msg) => println!("\x1b[31m{msg}\x1b[0m\n"),
                    }
                }
                Ok(Signal::CtrlC) if self.sim.is_playing() => self.pause(),
                Ok(Signal::CtrlC) => {
                    println!("\x1b[90m(Press Ctrl+D or type .quit to exit)\x1b[0m\n");
                }
                Ok(Signal::CtrlD) => break,
                Err(e) => {
                    eprintln!("\x1b[31m✗ Input error: {e}\x1b[0m\n");
                    break;
                }
            }
        }

        self.sim.pause();
        if let Some(runner) = self.runner.take() {
            let completed = runner.shutdown().await;
            tracing::debug!("Timed loop stopped after {completed} turns");
        }
        println!("\x1b[90mМир засыпает. 👋\x1b[0m");
        Ok(())
    }

    /// Returns `true` when exit was requested
    async fn handle_command(&mut self, command: Command) -> Result<bool> {
        let width = render::wrap_width();
        // The runner's printer already shows every journal entry
        let echo = self.runner.is_none();

        match command {
            Command::Quit => return Ok(true),
            Command::Help => self.print_help(),
            Command::Agents => {
                print!("{}", self.sim.with_world(render::agents));
                println!();
            }
            Command::Inspect(key) => {
                let view = self.sim.with_world(|world| {
                    world
                        .find_agent(&key)
                        .map(|agent| render::inspector(agent, world, width))
                });
                let view = view.ok_or(SimError::UnknownAgent(key))?;
                println!("{view}");
            }
            Command::Log(n) => {
                let log = self.sim.with_world(|world| {
                    let entries: Vec<&LogEntry> = world.journal().recent(n).collect();
                    render::log(&entries, width)
                });
                println!("{log}\n");
            }
            Command::Graph(format) => {
                let graph = self.sim.with_world(World::graph);
                match format {
                    GraphFormat::Text => println!("{}\n", render::graph(&graph)),
                    GraphFormat::Json => println!("{}\n", serde_json::to_string_pretty(&graph)?),
                    GraphFormat::Dot => println!("{}", graph.to_dot()),
                }
            }
            Command::Step(n) => self.step(n, width, echo).await?,
            Command::Play => self.play(),
            Command::Pause => self.pause(),
            Command::Speed(speed) => {
                let applied = self.sim.set_speed(speed);
                println!(
                    "\x1b[32m✓ Speed {applied}x ({:?} per tick)\x1b[0m\n",
                    tick_interval(applied)
                );
            }
            Command::Event(text) => {
                let entry = self.sim.divine_event(&text)?;
                if echo {
                    println!("{}\n", render::log_line(&entry, width));
                }
            }
            Command::Add {
                name,
                role,
                persona,
            } => {
                let agent = self.sim.add_agent(&name, &role, &persona)?;
                println!("{}\n", render::agent_row(&agent));
            }
            Command::Context => {
                let context = self.sim.with_world(|world| world.global_context().to_string());
                println!("  \x1b[1mГлобальный контекст:\x1b[0m {context}\n");
            }
            Command::Providers => self.print_providers().await,
            Command::Save(path) => {
                self.sim.write_snapshot(&path).await?;
                println!("\x1b[32m✓ Snapshot written to {}\x1b[0m\n", path.display());
            }
            Command::Info => self.print_info(),
        }

        Ok(false)
    }

    /// Ctrl+C cancels the turn being decided; its agent is released
    async fn step(&self, n: u32, width: usize, echo: bool) -> Result<()> {
        for _ in 0..n {
            let spinner = spinner("Агент думает...");
            let result = tokio::select! {
                result = self.sim.step() => result,
                _ = tokio::signal::ctrl_c() => {
                    spinner.finish_and_clear();
                    println!("\x1b[90mTurn cancelled.\x1b[0m");
                    break;
                }
            };
            spinner.finish_and_clear();

            match result? {
                Some(outcome) => print_outcome(&self.sim, &outcome, width, echo),
                None => {
                    println!("\x1b[90mA turn is already in flight or nobody is idle.\x1b[0m");
                    break;
                }
            }
        }
        println!();
        Ok(())
    }

    fn play(&mut self) {
        if self.runner.is_none() {
            self.runner = Some(Runner::spawn(&self.sim, &self.printer));
        }
        self.sim.play();
        println!(
            "\x1b[32m▶ Playing at {}x ({:?} per tick). .pause or Ctrl+C to stop.\x1b[0m\n",
            self.sim.speed(),
            tick_interval(self.sim.speed())
        );
    }

    /// The loop keeps running idle; a turn in flight still completes
    fn pause(&self) {
        self.sim.pause();
        println!(
            "\x1b[90m⏸ Paused at {} turns\x1b[0m\n",
            self.sim.state().ticks
        );
    }

    fn create_editor(printer: ExternalPrinter<String>) -> Reedline {
        let menu = ReedlineMenu::EngineCompleter(Box::new(
            ColumnarMenu::default().with_name(MENU_NAME),
        ));

        Reedline::create()
            .with_completer(Box::new(CommandCompleter))
            .with_highlighter(Box::new(InputHighlighter::new()))
            .with_menu(menu)
            .with_edit_mode(Self::create_edit_mode())
            .with_quick_completions(true)
            .with_partial_completions(true)
            .with_ansi_colors(true)
            .with_external_printer(printer)
    }

    fn create_edit_mode() -> Box<dyn EditMode> {
        let mut keybindings = default_emacs_keybindings();

        keybindings.add_binding(
            KeyModifiers::NONE,
            KeyCode::Tab,
            ReedlineEvent::UntilFound(vec![
                ReedlineEvent::Menu(MENU_NAME.to_string()),
                ReedlineEvent::MenuNext,
            ]),
        );
        keybindings.add_binding(
            KeyModifiers::SHIFT,
            KeyCode::BackTab,
            ReedlineEvent::MenuPrevious,
        );

        Box::new(Emacs::new(keybindings))
    }

    fn print_banner(&self) {
        println!();
        println!(
            "\x1b[36m╔══════════════════════════════════════════════════════╗\x1b[0m"
        );
        println!(
            "\x1b[36m║\x1b[0m  \x1b[1m🌍 Simulacrum\x1b[0m v{:<38}\x1b[36m║\x1b[0m",
            env!("CARGO_PKG_VERSION")
        );
        println!(
            "\x1b[36m╚══════════════════════════════════════════════════════╝\x1b[0m"
        );
        println!();
        print!("{}", self.sim.with_world(render::agents));
        println!();
        println!("  \x1b[90mType .help for commands. Plain text is a divine event.\x1b[0m");
        println!();
    }

    fn print_help(&self) {
        println!();
        println!("\x1b[1mCommands:\x1b[0m");
        println!();
        for cmd in COMMANDS {
            println!("  \x1b[33m{:<36}\x1b[0m {}", cmd.usage(), cmd.description);
        }
        println!();
        println!("  \x1b[90mAnything not starting with '.' is sent as a divine event.\x1b[0m");
        println!();
    }

    async fn print_providers(&self) {
        let active = self.sim.decider().provider_name();
        println!("\x1b[1mProviders:\x1b[0m\n");
        for name in self.registry.list() {
            let marker = if name.eq_ignore_ascii_case(active) { "●" } else { " " };
            println!("  \x1b[32m{marker}\x1b[0m \x1b[33m{name}\x1b[0m");
            let Some(provider) = self.registry.get(name) else {
                continue;
            };
            for model in provider.models() {
                println!("      \x1b[36m{}\x1b[0m  {}", model.id, model.description);
            }
            match provider.installed_models().await {
                Ok(installed) if installed.is_empty() => {}
                Ok(installed) => {
                    println!("      \x1b[90minstalled:\x1b[0m {}", installed.join(", "));
                }
                Err(e) => println!("      \x1b[90minstalled: unavailable ({e})\x1b[0m"),
            }
        }
        println!();
    }

    fn print_info(&self) {
        let state = self.sim.state();
        let (agents, logs, busy) = self.sim.with_world(|world| {
            (
                world.agents().len(),
                world.journal().len(),
                world.processing().map(str::to_string),
            )
        });
        let decider = self.sim.decider();
        let config_path = SimConfig::config_path()
            .map_or_else(|| "-".to_string(), |p| p.display().to_string());

        println!();
        println!("\x1b[1mSimulation Info:\x1b[0m");
        println!();
        println!("  \x1b[90mProvider:\x1b[0m   \x1b[33m{}\x1b[0m", decider.provider_name());
        println!("  \x1b[90mModel:\x1b[0m      \x1b[36m{}\x1b[0m", decider.model_name());
        println!(
            "  \x1b[90mState:\x1b[0m      {} at {}x ({:?} per tick)",
            if state.is_playing { "playing" } else { "paused" },
            state.speed,
            tick_interval(state.speed)
        );
        println!("  \x1b[90mTurns:\x1b[0m      {}", state.ticks);
        println!("  \x1b[90mAgents:\x1b[0m     {agents}");
        println!(
            "  \x1b[90mJournal:\x1b[0m    {logs}/{}",
            self.config.limits.journal_limit
        );
        println!("  \x1b[90mThinking:\x1b[0m   {}", busy.as_deref().unwrap_or("-"));
        println!("  \x1b[90mConfig:\x1b[0m     {config_path}");
        println!();
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

fn print_outcome(sim: &Simulation, outcome: &TurnOutcome, width: usize, echo: bool) {
    if echo {
        println!("{}", render::log_line(&outcome.entry, width));
    }

    let Some(shift) = outcome.affinity else {
        return;
    };
    let names = sim.with_world(|world| {
        let name = |id: &str| world.agent(id).map(|a| a.name.clone());
        (
            name(&outcome.agent_id),
            outcome.target_id.as_deref().and_then(name),
        )
    });
    if let (Some(speaker), Some(listener)) = names {
        println!(
            "           \x1b[90m{speaker} → {listener}: {:+} ({}), {listener} → {speaker}: {:+} ({})\x1b[0m",
            shift.speaker_delta,
            shift.speaker_affinity,
            shift.listener_delta,
            shift.listener_affinity
        );
    }
}
