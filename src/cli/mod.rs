//! Terminal front end: a [`Surface`] that prints to stdout and the command-line parser
//! that turns REPL input into portal intents.

use std::io::IsTerminal;

use anyhow::{anyhow, bail, Result};
use parking_lot::Mutex;
use terminal_size::{terminal_size, Width};

use crate::identity::ClaimedIdentity;
use crate::portal::{Intent, Notice, NoticeKind, Surface};
use crate::records::PatientForm;
use crate::view::{format_rendered, Rendered, ViewState};

pub const HELP: &str = "\
Commands:
  login <user> <password>                      log in (login screen)
  register <user> <password> <occupation...>   create an account (register screen)
  show register | show login                   switch between the logged-out screens
  all                                          list every record
  search <min> <max>                           records with weight in [min, max] kg
  add first=.. last=.. gender=male|female age=.. weight=.. height=.. history=\"..\"
                                               add a patient (clinicians only)
  logout                                       end the session
  status                                       show screen and session
  help                                         show this help
  quit | exit                                  leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(Intent),
    Status,
    Help,
    Quit,
    Empty,
}

pub fn parse_command(line: &str) -> Result<Command> {
    let args = split_args(line)?;
    let Some((head, rest)) = args.split_first() else { return Ok(Command::Empty) };
    let cmd = match head.to_ascii_lowercase().as_str() {
        "quit" | "exit" => Command::Quit,
        "help" | "?" => Command::Help,
        "status" => Command::Status,
        "logout" => Command::Run(Intent::Logout),
        "all" => Command::Run(Intent::ViewAll),
        "login" => match rest {
            [user, pass] => Command::Run(Intent::SubmitLogin { username: user.clone(), password: pass.clone() }),
            _ => bail!("usage: login <user> <password>"),
        },
        "register" => match rest {
            [user, pass, occupation @ ..] if !occupation.is_empty() => Command::Run(Intent::SubmitRegister {
                username: user.clone(),
                password: pass.clone(),
                occupation: occupation.join(" "),
            }),
            _ => bail!("usage: register <user> <password> <occupation...>"),
        },
        "show" => match rest.first().map(|s| s.to_ascii_lowercase()).as_deref() {
            Some("register") => Command::Run(Intent::ShowRegister),
            Some("login") => Command::Run(Intent::ShowLogin),
            _ => bail!("usage: show register | show login"),
        },
        // Missing bounds are passed through blank so the portal reports the range error
        "search" => {
            if rest.len() > 2 {
                bail!("usage: search <min> <max>");
            }
            let min = rest.first().cloned().unwrap_or_default();
            let max = rest.get(1).cloned().unwrap_or_default();
            Command::Run(Intent::SearchByWeight { min, max })
        }
        "add" => {
            let mut pairs = Vec::with_capacity(rest.len());
            for arg in rest {
                let (k, v) = arg.split_once('=').ok_or_else(|| anyhow!("expected key=value, got '{}'", arg))?;
                pairs.push((k, v));
            }
            let form = PatientForm::from_pairs(pairs).map_err(|e| anyhow!(e.message().to_string()))?;
            Command::Run(Intent::SubmitPatient(form))
        }
        other => bail!("unknown command '{}'; type 'help'", other),
    };
    Ok(cmd)
}

// Whitespace-separated words; double quotes group words and may appear mid-token
// (history="two words").
fn split_args(line: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut started = false;
    for ch in line.chars() {
        match ch {
            '"' => { in_quotes = !in_quotes; started = true; }
            c if c.is_whitespace() && !in_quotes => {
                if started {
                    out.push(std::mem::take(&mut cur));
                    started = false;
                }
            }
            c => { cur.push(c); started = true; }
        }
    }
    if in_quotes {
        bail!("unterminated quote");
    }
    if started {
        out.push(cur);
    }
    Ok(out)
}

pub fn prompt(view: ViewState, identity: Option<&ClaimedIdentity>) -> String {
    match (view, identity) {
        (ViewState::LoggedInApp, Some(id)) => format!("{}@records> ", id.username()),
        (v, _) => format!("{}> ", v.label()),
    }
}

fn terminal_width() -> usize {
    match terminal_size() {
        Some((Width(w), _)) if w > 4 => (w - 4) as usize,
        _ => 80,
    }
}

/// Prints everything as it happens; notices are kept until the portal dismisses them so
/// `status` can list what is still up.
pub struct TerminalSurface {
    color: bool,
    notices: Mutex<Vec<Notice>>,
}

impl Default for TerminalSurface {
    fn default() -> Self { Self::new() }
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self { color: std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(), notices: Mutex::new(Vec::new()) }
    }

    pub fn active_notices(&self) -> Vec<Notice> { self.notices.lock().clone() }
}

impl Surface for TerminalSurface {
    fn show_screen(&self, screen: ViewState) {
        match screen {
            ViewState::LoggedOutLogin => println!("-- Login --"),
            ViewState::LoggedOutRegister => println!("-- Register --"),
            ViewState::LoggedInApp => println!("-- Patient Records --"),
        }
    }

    fn set_session_banner(&self, identity: Option<&ClaimedIdentity>) {
        if let Some(id) = identity {
            println!("Welcome, {} ({})", id.username(), id.role());
        }
    }

    fn set_append_section_visible(&self, visible: bool) {
        if visible {
            println!("You may add patients with 'add'.");
        }
    }

    fn show_loading(&self, label: &str) { println!("{}", label); }

    fn render(&self, rendered: &Rendered) {
        println!("{}", format_rendered(rendered, terminal_width(), self.color));
    }

    fn show_error_content(&self, message: &str) { eprintln!("{}", message); }

    fn reset_content(&self) {}

    fn show_notice(&self, notice: &Notice) {
        match (notice.kind, self.color) {
            (NoticeKind::Success, true) => println!("\x1b[32m{}\x1b[0m", notice.text),
            (NoticeKind::Error, true) => println!("\x1b[31m{}\x1b[0m", notice.text),
            _ => println!("{}", notice.text),
        }
        self.notices.lock().push(notice.clone());
    }

    fn dismiss_notice(&self, id: u64) { self.notices.lock().retain(|n| n.id != id); }

    fn clear_staged_inputs(&self) {}

    fn reset_register_form(&self) {}

    fn reset_patient_form(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_session_commands() {
        assert_eq!(
            parse_command("login alice s3cret").unwrap(),
            Command::Run(Intent::SubmitLogin { username: "alice".into(), password: "s3cret".into() })
        );
        assert_eq!(
            parse_command("register bob pw Health Care Provider").unwrap(),
            Command::Run(Intent::SubmitRegister {
                username: "bob".into(),
                password: "pw".into(),
                occupation: "Health Care Provider".into()
            })
        );
        assert_eq!(parse_command("LOGOUT").unwrap(), Command::Run(Intent::Logout));
        assert_eq!(parse_command("show register").unwrap(), Command::Run(Intent::ShowRegister));
        assert_eq!(parse_command("   ").unwrap(), Command::Empty);
        assert_eq!(parse_command("exit").unwrap(), Command::Quit);
        assert!(parse_command("login alice").is_err());
        assert!(parse_command("register bob pw").is_err());
        assert!(parse_command("frobnicate").is_err());
    }

    #[test]
    fn search_keeps_blank_bounds() {
        assert_eq!(
            parse_command("search 50").unwrap(),
            Command::Run(Intent::SearchByWeight { min: "50".into(), max: "".into() })
        );
        assert_eq!(
            parse_command("search 50 80").unwrap(),
            Command::Run(Intent::SearchByWeight { min: "50".into(), max: "80".into() })
        );
        assert!(parse_command("search 1 2 3").is_err());
    }

    #[test]
    fn add_with_quoted_history() {
        let cmd = parse_command(
            r#"add first=Ann last=Lee gender=female age=41 weight=60.5 height=170 history="no known allergies""#,
        )
        .unwrap();
        let Command::Run(Intent::SubmitPatient(form)) = cmd else { panic!("unexpected {:?}", cmd) };
        let rec = form.parse().unwrap();
        assert_eq!(rec.first_name, "Ann");
        assert_eq!(rec.history, "no known allergies");
        assert!(parse_command("add first").is_err());
        assert!(parse_command("add colour=blue").is_err());
        assert!(parse_command(r#"add history="open"#).is_err());
    }

    #[test]
    fn prompt_by_view() {
        assert_eq!(prompt(ViewState::LoggedOutLogin, None), "login> ");
        assert_eq!(prompt(ViewState::LoggedOutRegister, None), "register> ");
        assert_eq!(prompt(ViewState::LoggedInApp, None), "app> ");
    }
}
