use crate::{
    browser::BrowserDefinition, dispatcher::{InstallationAttempt, PRIORITY, Strategy}, error::ManagerError, host::Host, session::Session, util::{UnwrapOrExit, logging::success}
};
use inquire::{Confirm, Select};
use owo_colors::OwoColorize;
use std::fmt::Display;
use tracing::{info, warn};

/// Lines of tool output shown per failed attempt.
const OUTPUT_TAIL: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Install,
    Uninstall,
    Refresh,
    Exit
}

const ACTIONS: [Action; 4] = [Action::Install, Action::Uninstall, Action::Refresh, Action::Exit];

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Install => write!(f, "1. Install a browser"),
            Self::Uninstall => write!(f, "2. Uninstall a browser"),
            Self::Refresh => write!(f, "3. Refresh"),
            Self::Exit => write!(f, "4. Exit")
        }
    }
}

struct Listed(&'static BrowserDefinition);

impl Display for Listed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.0.name, self.0.description.dimmed())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Method {
    Automatic,
    /// Tried first, the others remain as fallbacks.
    Prefer(Strategy)
}

impl Method {
    const fn preferred(self) -> Option<Strategy> {
        match self {
            Self::Automatic => None,
            Self::Prefer(strategy) => Some(strategy)
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Automatic => {
                let order = PRIORITY.iter().map(ToString::to_string).collect::<Vec<_>>().join(" > ");
                write!(f, "Automatic ({order})")
            }
            Self::Prefer(strategy) => write!(f, "Prefer {strategy}")
        }
    }
}

pub fn run<H: Host>(session: &mut Session<H>) {
    loop {
        show_system(session);
        show_installed(session);

        let action = Select::new("What would you like to do?", ACTIONS.to_vec())
            .with_page_size(ACTIONS.len())
            .prompt()
            .unwrap_or_exit();

        match action {
            Action::Install => install_menu(session),
            Action::Uninstall => uninstall_menu(session),
            Action::Refresh => {
                session.refresh();
                success("Refreshed installed browsers");
            }
            Action::Exit => break
        }
    }

    info!("Goodbye");
}

fn show_system<H: Host>(session: &Session<H>) {
    let info = &session.info;
    let version = match &info.codename {
        Some(codename) => format!("{} ({codename})", info.version),
        None => info.version.clone()
    };

    println!();
    println!("{}", "System information".bold().underline());
    println!("  {:<18}{}", "Distribution", info.distro.cyan());
    println!("  {:<18}{}", "Version", version);
    println!("  {:<18}{}", "Kernel", info.kernel);
    println!("  {:<18}{}", "Host", info.host_name);
    println!("  {:<18}{}", "Family", info.family);
    println!("  {:<18}{}", "Package managers", session.caps.to_string().cyan());
    println!("  {:<18}{}", "Date", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
}

fn show_installed<H: Host>(session: &Session<H>) {
    println!();
    println!("{}", "Installed browsers".bold().underline());
    if session.installed.is_empty() {
        println!("  {}", "none detected".dimmed());
    }
    for installation in &session.installed {
        println!("  {} {}", installation.browser.name.green(), format!("[{}]", installation.installed_via).dimmed());
    }
    println!();
}

fn install_menu<H: Host>(session: &mut Session<H>) {
    let candidates = session.not_installed().into_iter().map(Listed).collect::<Vec<_>>();
    if candidates.is_empty() {
        info!("Every known browser is already installed");
        return;
    }

    let Some(Listed(browser)) = Select::new("Which browser should be installed?", candidates)
        .with_help_message("esc to go back")
        .prompt_skippable()
        .unwrap_or_exit()
    else {
        return;
    };

    let applicable = session.applicable(browser);
    if applicable.is_empty() {
        warn!("{}", ManagerError::AllStrategiesExhausted { browser: browser.name, attempts: Vec::new() });
        return;
    }

    let methods = std::iter::once(Method::Automatic).chain(applicable.into_iter().map(Method::Prefer)).collect();
    let Some(method) = Select::new(&format!("How should {} be installed?", browser.name), methods)
        .with_help_message("esc to go back")
        .prompt_skippable()
        .unwrap_or_exit()
    else {
        return;
    };

    info!("Installing {}", browser.name);
    match session.install(browser, method.preferred()) {
        Ok(attempt) => {
            success(&format!("Installed {} ({})", attempt.browser, via(&attempt)));
            for note in browser.notes_for(attempt.strategy) {
                info!("{} {note}", "Note:".yellow().bold());
            }
        }
        Err(why) => report(&why)
    }
}

fn uninstall_menu<H: Host>(session: &mut Session<H>) {
    if session.installed.is_empty() {
        info!("No installed browsers were detected");
        return;
    }

    let Some(installation) = Select::new("Which browser should be removed?", session.installed.clone())
        .with_help_message("esc to go back")
        .prompt_skippable()
        .unwrap_or_exit()
    else {
        return;
    };

    let confirmed = Confirm::new(&format!("Remove {installation}?"))
        .with_default(false)
        .prompt_skippable()
        .unwrap_or_exit()
        .unwrap_or(false);
    if !confirmed {
        return;
    }

    match session.uninstall(&installation) {
        Ok(attempt) => success(&format!("Removed {} ({})", installation.browser.name, via(&attempt))),
        Err(why) => report(&why)
    }
}

fn via(attempt: &InstallationAttempt) -> String {
    match attempt.manager {
        Some(manager) => format!("via {manager}"),
        None => format!("via {}", attempt.strategy)
    }
}

fn report(err: &ManagerError) {
    warn!("{err}");

    let ManagerError::AllStrategiesExhausted { attempts, .. } = err else {
        return;
    };

    for attempt in attempts {
        println!("  {} {}", "✗".red().bold(), attempt.strategy.bold());
        for command in &attempt.commands {
            println!("    {} {}", "$".dimmed(), command.dimmed());
        }
        for line in tail(&attempt.output, OUTPUT_TAIL) {
            println!("    {line}");
        }
    }
}

fn tail(output: &str, count: usize) -> Vec<&str> {
    let lines = output.lines().filter(|l| !l.trim().is_empty()).collect::<Vec<_>>();
    let skip = lines.len().saturating_sub(count);
    lines.into_iter().skip(skip).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_are_numbered_in_order() {
        let labels = ACTIONS.iter().map(ToString::to_string).collect::<Vec<_>>();
        assert_eq!(labels, ["1. Install a browser", "2. Uninstall a browser", "3. Refresh", "4. Exit"]);
    }

    #[test]
    fn automatic_lists_the_fallback_order() {
        assert_eq!(
            Method::Automatic.to_string(),
            "Automatic (Native package > Snap > Flatpak > Direct download)"
        );
        assert_eq!(Method::Prefer(Strategy::Flatpak).to_string(), "Prefer Flatpak");
        assert_eq!(Method::Prefer(Strategy::Snap).preferred(), Some(Strategy::Snap));
        assert_eq!(Method::Automatic.preferred(), None);
    }

    #[test]
    fn tail_keeps_the_last_non_empty_lines() {
        let output = "one\n\ntwo\nthree\n  \nfour\n";
        assert_eq!(tail(output, 2), ["three", "four"]);
        assert_eq!(tail(output, 10), ["one", "two", "three", "four"]);
        assert!(tail("", 3).is_empty());
    }
}
