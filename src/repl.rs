//! Interactive terminal session: the consultation form, the manual-paste
//! fallback and the dashboard, one command per line.

use crate::consultation::Orchestrator;
use crate::dashboard::Dashboard;
use crate::detran::DebtSource;
use crate::form::{normalize_plate, FormView, VehicleForm};
use crate::gemini::Oracle;
use failure::Error;
use log::debug;
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use url::Url;

pub const HELP: &str = "Commands:
  plate <PLATE>          set the vehicle plate
  renavam <NUMBER>       set the registration number (RENAVAM)
  consult [PLATE NUMBER] query the registry for debts
  history                list recently consulted vehicles
  use <N|PLATE>          fill the form from a history entry
  delete <PLATE>         remove a vehicle from history
  paste                  paste the registry page by hand (end with a line holding only '.')
  url                    show the registry URL to open by hand
  new                    start another consultation
  show                   redraw the current screen
  help                   this text
  quit                   leave";

const PASTE_END: &str = ".";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Plate(String),
    Renavam(String),
    Consult(Option<(String, String)>),
    History,
    Use(String),
    Delete(String),
    Paste,
    Url,
    New,
    Show,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Command, Error> {
        let mut words = line.split_whitespace();
        let name = words
            .next()
            .ok_or_else(|| format_err!("Empty command"))?
            .to_lowercase();
        let args: Vec<&str> = words.collect();
        let one = |what: &str| match args.as_slice() {
            [arg] => Ok(arg.to_string()),
            _ => Err(format_err!("Usage: {} <{}>", name, what)),
        };
        let command = match name.as_str() {
            "plate" | "placa" => Command::Plate(one("PLATE")?),
            "renavam" => Command::Renavam(one("NUMBER")?),
            "consult" | "c" => match args.as_slice() {
                [] => Command::Consult(None),
                [plate, renavam] => Command::Consult(Some((plate.to_string(), renavam.to_string()))),
                _ => bail!("Usage: consult [PLATE NUMBER]"),
            },
            "history" | "h" => Command::History,
            "use" => Command::Use(one("N|PLATE")?),
            "delete" | "rm" => Command::Delete(one("PLATE")?),
            "paste" => Command::Paste,
            "url" => Command::Url,
            "new" => Command::New,
            "show" => Command::Show,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => bail!("Unknown command '{}', type 'help'", other),
        };
        Ok(command)
    }
}

/// Steps for opening the registry page by hand and pasting it back.
pub struct ManualEntryPanel<'a> {
    pub url: &'a Url,
    pub pasted: &'a str,
}

impl fmt::Display for ManualEntryPanel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CONNECTION ASSISTANT")?;
        writeln!(f, "The registry has to be opened by hand once:")?;
        writeln!(f, "  1. Open {}", self.url)?;
        writeln!(f, "  2. Copy everything on the page (Ctrl+A, Ctrl+C)")?;
        writeln!(
            f,
            "  3. Type 'paste', paste it and finish with a line holding only '{}'",
            PASTE_END
        )?;
        if !self.pasted.is_empty() {
            writeln!(f, "  ({} characters pasted so far)", self.pasted.chars().count())?;
        }
        Ok(())
    }
}

pub struct Session<S, O> {
    app: Orchestrator<S, O>,
    form: VehicleForm,
}

impl<S: DebtSource, O: Oracle> Session<S, O> {
    pub fn new(app: Orchestrator<S, O>) -> Self {
        Session {
            app,
            form: VehicleForm::default(),
        }
    }

    pub fn screen(&self) -> String {
        let state = self.app.state();
        if let Some(consultation) = state.consultation() {
            return format!(
                "{}\nType 'new' for another consultation.",
                Dashboard(consultation)
            );
        }
        let mut out = FormView {
            form: &self.form,
            history: self.app.history(),
            busy: state.is_busy(),
        }
        .to_string();
        if let Some(url) = state.manual_url() {
            out.push('\n');
            out.push_str(
                &ManualEntryPanel {
                    url,
                    pasted: &state.manual_text,
                }
                .to_string(),
            );
        }
        if let Some(e) = &state.error {
            let marker = if e.needs_manual_entry() { "i" } else { "!" };
            out.push_str(&format!("\n{} {}\n", marker, e));
        }
        out
    }

    /// Runs one command and returns the text to show for it.
    pub async fn execute(&mut self, command: Command) -> String {
        let showing_result = self.app.state().consultation().is_some();
        match command {
            Command::Plate(_) | Command::Renavam(_) | Command::Consult(_) | Command::Use(_)
                if showing_result =>
            {
                "Type 'new' to start another consultation first.".to_string()
            }
            Command::Plate(plate) => {
                self.form.set_plate(&plate);
                self.screen()
            }
            Command::Renavam(renavam) => {
                self.form.set_registration_number(&renavam);
                self.screen()
            }
            Command::Consult(fields) => {
                if let Some((plate, renavam)) = fields {
                    self.form.set_plate(&plate);
                    self.form.set_registration_number(&renavam);
                }
                match self.form.submission() {
                    Ok(query) => {
                        self.app.submit(query).await;
                        self.screen()
                    }
                    Err(e) => format!("! {}", e),
                }
            }
            Command::History | Command::Show => self.screen(),
            Command::Use(which) => {
                let plate = self.resolve_plate(&which);
                match self.app.select_history(&plate) {
                    Some(item) => {
                        self.form.fill_from(&item);
                        self.screen()
                    }
                    None => format!("! No vehicle {} in history", which),
                }
            }
            Command::Delete(plate) => {
                self.app.delete_history(&normalize_plate(&plate));
                self.screen()
            }
            Command::Url => match self.app.state().manual_url() {
                Some(url) => url.to_string(),
                None => "No registry request waiting for manual entry.".to_string(),
            },
            Command::New => {
                self.app.new_consultation();
                self.screen()
            }
            Command::Help => HELP.to_string(),
            Command::Paste | Command::Quit => {
                debug!("Paste and quit are handled by the input loop");
                String::new()
            }
        }
    }

    pub async fn paste(&mut self, text: &str) -> String {
        if self.app.state().manual_url().is_none() {
            return "Nothing to paste for: run 'consult' first.".to_string();
        }
        self.app.submit_manual(text).await;
        self.screen()
    }

    /// A 1-based history index or a plate.
    fn resolve_plate(&self, which: &str) -> String {
        let history = self.app.history();
        match which.parse::<usize>() {
            Ok(n) if n >= 1 && n <= history.len() => history[n - 1].plate.clone(),
            _ => normalize_plate(which),
        }
    }
}

/// Reads pasted lines up to a line holding only `PASTE_END` or the end of
/// input.
pub async fn read_paste<R>(lines: &mut Lines<R>) -> Result<String, Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut text = String::new();
    while let Some(line) = lines.next_line().await? {
        if line.trim() == PASTE_END {
            break;
        }
        text.push_str(&line);
        text.push('\n');
    }
    Ok(text)
}

fn prompt(text: &str) -> Result<(), Error> {
    print!("{}", text);
    std::io::stdout().flush()?;
    Ok(())
}

pub async fn run<S: DebtSource, O: Oracle>(mut session: Session<S, O>) -> Result<(), Error> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}\n", HELP);
    println!("{}", session.screen());
    loop {
        prompt("> ")?;
        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break,
        };
        if line.trim().is_empty() {
            continue;
        }
        let output = match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(Command::Paste) => {
                println!("Paste the page, then a line holding only '{}':", PASTE_END);
                let text = read_paste(&mut lines).await?;
                session.paste(&text).await
            }
            Ok(command) => session.execute(command).await,
            Err(e) => e.to_string(),
        };
        println!("{}", output);
    }
    Ok(())
}
