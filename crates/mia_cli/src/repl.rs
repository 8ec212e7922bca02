//! Interactive creation form and chat loop.

use crate::render;
use anyhow::Result;
use mia_client::Backend;
use mia_core::{ChatTurn, Companion, MiaConfig, Mood, PersonalityOption, SessionStore};
use mia_flows::{
    Bootstrap, BootstrapOutcome, ChatFlow, CreationError, CreationFlow, CreationForm,
    ExchangeOutcome, PersonalityChoice, APOLOGY, DEFAULT_COLOR, PALETTE,
};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;

const FEED_AMOUNT: u8 = 20;

enum Exit {
    Quit,
    Reset,
}

pub struct Repl {
    backend: Arc<dyn Backend>,
    session: Arc<SessionStore>,
    config: MiaConfig,
    editor: DefaultEditor,
}

impl Repl {
    pub fn new(
        backend: Arc<dyn Backend>,
        session: Arc<SessionStore>,
        config: MiaConfig,
    ) -> Result<Self> {
        Ok(Self {
            backend,
            session,
            config,
            editor: DefaultEditor::new()?,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        loop {
            let outcome = Bootstrap::new(self.backend.clone(), self.session.clone())
                .run()
                .await;
            let companion = match outcome {
                BootstrapOutcome::Resumed(companion) => companion,
                BootstrapOutcome::NoCompanion => match self.create().await? {
                    Some(companion) => companion,
                    None => return Ok(()),
                },
            };
            match self.converse(&companion).await? {
                Exit::Quit => return Ok(()),
                Exit::Reset => continue,
            }
        }
    }

    /// Read one line with `initial` pre-filled. `None` on Ctrl-C or Ctrl-D.
    fn ask(&mut self, prompt: &str, initial: &str) -> Result<Option<String>> {
        match self.editor.readline_with_initial(prompt, (initial, "")) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create(&mut self) -> Result<Option<Companion>> {
        let flow = CreationFlow::new(
            self.backend.clone(),
            self.session.clone(),
            &self.config.user.user_id,
        );
        println!("Let's create your AI friend!");
        let catalog = flow.load_personalities().await;
        if catalog.is_empty() {
            println!("(Couldn't load personalities, you can still describe your own.)");
        }

        // Kept across attempts so a failed submit never loses input
        let mut form = CreationForm::default();
        loop {
            let Some(name) = self.ask("Name: ", &form.name)? else {
                return Ok(None);
            };
            form.name = name;

            let Some(personality) = self.ask_personality(&catalog, &form.personality)? else {
                return Ok(None);
            };
            form.personality = personality;

            let Some(color) = self.ask_color(&form.color)? else {
                return Ok(None);
            };
            form.color = color;

            match flow.submit(&form).await {
                Ok(companion) => return Ok(Some(companion)),
                Err(err @ CreationError::StatsUnavailable { .. }) => {
                    println!("{}", err);
                    let resumed = Bootstrap::new(self.backend.clone(), self.session.clone())
                        .run()
                        .await;
                    return match resumed {
                        BootstrapOutcome::Resumed(companion) => Ok(Some(companion)),
                        BootstrapOutcome::NoCompanion => {
                            println!("Please try again later.");
                            Ok(None)
                        }
                    };
                }
                Err(err) => println!("{}", err),
            }
        }
    }

    fn ask_personality(
        &mut self,
        catalog: &[PersonalityOption],
        current: &PersonalityChoice,
    ) -> Result<Option<PersonalityChoice>> {
        println!("Choose a personality:");
        for (i, option) in catalog.iter().enumerate() {
            println!("{}", render::personality(i, option));
        }
        println!("  c) Custom - describe your own");

        let initial = match current {
            PersonalityChoice::Predefined(Some(id)) => catalog
                .iter()
                .position(|p| &p.id == id)
                .map(|i| (i + 1).to_string())
                .unwrap_or_default(),
            PersonalityChoice::Predefined(None) => String::new(),
            PersonalityChoice::Custom(_) => "c".to_string(),
        };

        loop {
            let Some(answer) = self.ask("Personality: ", &initial)? else {
                return Ok(None);
            };
            let answer = answer.trim();
            if answer.is_empty() {
                return Ok(Some(PersonalityChoice::Predefined(None)));
            }
            if answer.eq_ignore_ascii_case("c") {
                let previous = match current {
                    PersonalityChoice::Custom(text) => text.as_str(),
                    _ => "",
                };
                return Ok(self
                    .ask("Describe them: ", previous)?
                    .map(PersonalityChoice::Custom));
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=catalog.len()).contains(&n) => {
                    return Ok(Some(PersonalityChoice::Predefined(Some(
                        catalog[n - 1].id.clone(),
                    ))))
                }
                _ => println!("Pick a number from the list or 'c'."),
            }
        }
    }

    fn ask_color(&mut self, current: &str) -> Result<Option<String>> {
        let swatches: Vec<String> = PALETTE
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}) {}", i + 1, c))
            .collect();
        println!("Color: {} (Enter for {})", swatches.join("  "), DEFAULT_COLOR);
        let initial = PALETTE
            .iter()
            .position(|c| *c == current)
            .filter(|_| current != DEFAULT_COLOR)
            .map(|i| (i + 1).to_string())
            .unwrap_or_default();

        loop {
            let Some(answer) = self.ask("Color: ", &initial)? else {
                return Ok(None);
            };
            let answer = answer.trim();
            if answer.is_empty() {
                return Ok(Some(DEFAULT_COLOR.to_string()));
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=PALETTE.len()).contains(&n) => {
                    return Ok(Some(PALETTE[n - 1].to_string()))
                }
                _ => println!("Pick a number between 1 and {}.", PALETTE.len()),
            }
        }
    }

    async fn converse(&mut self, companion: &Companion) -> Result<Exit> {
        let name = companion.name.as_str();
        let flow = ChatFlow::new(
            self.backend.clone(),
            self.session.clone(),
            self.config.chat.history_limit,
        );

        self.print_status(companion, &flow.current_emotion().await);
        flow.enter().await;
        let transcript = flow.transcript().await;
        if transcript.is_empty() {
            println!("{}", render::welcome(name));
        }
        for turn in &transcript {
            println!("{}", render::turn(turn, name));
        }
        println!("Commands: /stats /feed /reset /quit");

        let mut retry = String::new();
        loop {
            let Some(line) = self.ask("> ", &retry)? else {
                return Ok(Exit::Quit);
            };
            retry.clear();

            match line.trim() {
                "/quit" | "/exit" => return Ok(Exit::Quit),
                "/stats" => self.print_status(companion, &flow.current_emotion().await),
                "/feed" => match flow.feed(FEED_AMOUNT).await {
                    Ok(()) => {
                        println!("{} enjoyed the snack!", name);
                        self.print_status(companion, &flow.current_emotion().await);
                    }
                    Err(e) => println!("Couldn't feed {}: {}", name, e),
                },
                "/reset" => {
                    let prompt = format!("Say goodbye to {}? [y/N] ", name);
                    let confirmed = self
                        .ask(&prompt, "")?
                        .is_some_and(|a| a.trim().eq_ignore_ascii_case("y"));
                    if confirmed {
                        self.session.clear();
                        return Ok(Exit::Reset);
                    }
                }
                cmd if cmd.starts_with('/') => {
                    println!("Unknown command {}. Try /stats /feed /reset /quit", cmd)
                }
                _ => {
                    if let Err(e) = self.editor.add_history_entry(line.as_str()) {
                        tracing::debug!("Failed to record input history: {}", e);
                    }
                    println!("{} is typing...", name);
                    match flow.send(&line).await {
                        Some(ExchangeOutcome::Settled { reply }) => {
                            println!("{}", render::turn(&reply, name))
                        }
                        Some(ExchangeOutcome::Failed { retry_text }) => {
                            let apology = ChatTurn::ai(APOLOGY, Mood::Sad);
                            println!("{}", render::turn(&apology, name));
                            retry = retry_text;
                        }
                        None => {}
                    }
                }
            }
        }
    }

    fn print_status(&self, companion: &Companion, mood: &Mood) {
        println!("{}", render::header(companion, mood));
        if let Some(stats) = &self.session.get().stats {
            println!("{}", render::stats_block(stats));
        }
    }
}
