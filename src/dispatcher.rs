use crate::{
    browser::{AptRepository, BrowserDefinition, RpmRepository}, distro::DistroFamily, error::{ManagerError, Result}, host::{CommandSpec, Host}, installation::{Installation, InstalledVia}, package_manager::{
        ManagerKind, PackageFormat, PackageManagerDescriptor, aur_install_command, flathub_remote_command, flatpak_uninstall_command
    }, prober::Capabilities, util::timestamp
};
use std::{
    env, fmt::Display, path::{Path, PathBuf}
};
use tracing::{debug, info, info_span, instrument, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    Native,
    Snap,
    Flatpak,
    Direct
}

/// Fallback order when the user has no preference.
pub const PRIORITY: [Strategy; 4] = [Strategy::Native, Strategy::Snap, Strategy::Flatpak, Strategy::Direct];

impl Strategy {
    const fn for_source(via: &InstalledVia) -> Self {
        match via {
            InstalledVia::Native { .. } => Self::Native,
            InstalledVia::Snap => Self::Snap,
            InstalledVia::Flatpak { .. } => Self::Flatpak,
            InstalledVia::Manual { .. } => Self::Direct
        }
    }
}

impl Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "Native package"),
            Self::Snap => write!(f, "Snap"),
            Self::Flatpak => write!(f, "Flatpak"),
            Self::Direct => write!(f, "Direct download")
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Step {
    Run(CommandSpec),
    /// Failure is recorded but does not stop the recipe.
    Prepare(CommandSpec),
    Fetch { url: &'static str, dest: PathBuf },
    Write { path: PathBuf, contents: String }
}

/// One self-contained way of carrying out a strategy.
#[derive(Clone, Debug)]
struct Recipe {
    manager: Option<ManagerKind>,
    steps: Vec<Step>
}

impl Recipe {
    const fn new(manager: Option<ManagerKind>, steps: Vec<Step>) -> Self {
        Self { manager, steps }
    }
}

#[derive(Clone, Debug)]
pub struct InstallationAttempt {
    pub browser: &'static BrowserDefinition,
    pub strategy: Strategy,
    pub manager: Option<ManagerKind>,
    pub commands: Vec<String>,
    pub code: Option<i32>,
    pub success: bool,
    pub output: String
}

impl InstallationAttempt {
    const fn new(browser: &'static BrowserDefinition, strategy: Strategy) -> Self {
        Self {
            browser,
            strategy,
            manager: None,
            commands: Vec::new(),
            code: None,
            success: false,
            output: String::new()
        }
    }

    fn record(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if !self.output.is_empty() {
            self.output.push('\n');
        }
        self.output.push_str(text);
    }

    /// Last line of diagnostics, or the exit code when the tool said nothing.
    pub fn summary(&self) -> String {
        if let Some(line) = self.output.lines().rev().map(str::trim).find(|l| !l.is_empty()) {
            return line.to_owned();
        }
        match self.code {
            Some(code) => format!("exited with status {code}"),
            None => String::from("no output")
        }
    }
}

pub struct Dispatcher<'a, H: Host> {
    host: &'a H,
    caps: &'a Capabilities,
    family: DistroFamily,
    scratch: PathBuf
}

impl<'a, H: Host> Dispatcher<'a, H> {
    pub fn new(host: &'a H, caps: &'a Capabilities, family: DistroFamily) -> Self {
        let scratch = env::temp_dir().join(format!("browsers-manager-{}", timestamp()));
        Self { host, caps, family, scratch }
    }

    /// Strategies that can run on this host, in priority order.
    pub fn applicable(&self, browser: &BrowserDefinition) -> Vec<Strategy> {
        PRIORITY.into_iter().filter(|s| !self.recipes(browser, *s).is_empty()).collect()
    }

    /// The preferred strategy goes first, the rest keep their priority.
    pub fn plan(preferred: Option<Strategy>) -> Vec<Strategy> {
        preferred.into_iter().chain(PRIORITY.into_iter().filter(|s| Some(*s) != preferred)).collect()
    }

    /// Runs once per strategy, before the first recipe.
    fn setup(&self, browser: &BrowserDefinition, strategy: Strategy) -> Vec<Step> {
        let Some(native) = self.caps.native().filter(|_| strategy == Strategy::Native) else {
            return Vec::new();
        };

        let mut steps = self.repository_steps(browser, native);
        // A single broken third-party source fails the whole refresh
        steps.extend(native.refresh_command().map(Step::Prepare));
        steps
    }

    fn recipes(&self, browser: &BrowserDefinition, strategy: Strategy) -> Vec<Recipe> {
        match strategy {
            Strategy::Native => self.native_recipes(browser),
            Strategy::Snap => self.snap_recipes(browser),
            Strategy::Flatpak => self.flatpak_recipes(browser),
            Strategy::Direct => self.direct_recipes(browser)
        }
    }

    fn native_recipes(&self, browser: &BrowserDefinition) -> Vec<Recipe> {
        let Some(native) = self.caps.native() else {
            return Vec::new();
        };

        let packages = browser.packages.for_family(self.family);
        let mut ret = Vec::with_capacity(packages.len() * 2);

        if native.kind == ManagerKind::Pacman {
            for package in packages {
                if !browser.aur_only {
                    ret.push(Recipe::new(Some(native.kind), vec![Step::Run(native.install_command(package))]));
                }
                if let Some(helper) = self.caps.aur_helper {
                    ret.push(Recipe::new(Some(native.kind), vec![Step::Run(aur_install_command(helper, package))]));
                }
            }
            return ret;
        }

        for package in packages {
            ret.push(Recipe::new(Some(native.kind), vec![Step::Run(native.install_command(package))]));
        }
        ret
    }

    fn repository_steps(&self, browser: &BrowserDefinition, native: &PackageManagerDescriptor) -> Vec<Step> {
        let Some(repository) = &browser.repository else {
            return Vec::new();
        };

        match native.kind {
            ManagerKind::Apt => repository.apt.as_ref().map(|r| self.apt_repository(r)).unwrap_or_default(),
            ManagerKind::Dnf | ManagerKind::Yum => {
                repository.rpm.as_ref().map(|r| self.rpm_repository(r, "/etc/yum.repos.d")).unwrap_or_default()
            }
            ManagerKind::Zypper => {
                repository.rpm.as_ref().map(|r| self.rpm_repository(r, "/etc/zypp/repos.d")).unwrap_or_default()
            }
            ManagerKind::Pacman | ManagerKind::Snap | ManagerKind::Flatpak => Vec::new()
        }
    }

    fn apt_repository(&self, repo: &AptRepository) -> Vec<Step> {
        let key = self.scratch.join("archive-keyring.gpg");
        let list = self.scratch.join("sources.list");

        vec![
            Step::Fetch { url: repo.key_url, dest: key.clone() },
            Step::Run(place(&key, repo.keyring)),
            Step::Write { path: list.clone(), contents: format!("{}\n", repo.source_line) },
            Step::Run(place(&list, repo.list_file)),
        ]
    }

    fn rpm_repository(&self, repo: &RpmRepository, repos_dir: &str) -> Vec<Step> {
        let file = self.scratch.join(format!("{}.repo", repo.alias));
        let dest = format!("{repos_dir}/{}.repo", repo.alias);

        vec![
            Step::Run(import_key(repo.key_url)),
            Step::Write { path: file.clone(), contents: repo_file(repo) },
            Step::Run(place(&file, &dest)),
        ]
    }

    fn snap_recipes(&self, browser: &BrowserDefinition) -> Vec<Recipe> {
        if !self.caps.has(ManagerKind::Snap) {
            return Vec::new();
        }

        let snap = PackageManagerDescriptor::lookup(ManagerKind::Snap);
        browser
            .snap
            .map(|name| Recipe::new(Some(ManagerKind::Snap), vec![Step::Run(snap.install_command(name))]))
            .into_iter()
            .collect()
    }

    fn flatpak_recipes(&self, browser: &BrowserDefinition) -> Vec<Recipe> {
        if !self.caps.has(ManagerKind::Flatpak) {
            return Vec::new();
        }

        let flatpak = PackageManagerDescriptor::lookup(ManagerKind::Flatpak);
        browser
            .flatpak
            .map(|app_id| {
                let steps = vec![Step::Run(flathub_remote_command()), Step::Run(flatpak.install_command(app_id))];
                Recipe::new(Some(ManagerKind::Flatpak), steps)
            })
            .into_iter()
            .collect()
    }

    fn direct_recipes(&self, browser: &BrowserDefinition) -> Vec<Recipe> {
        let Some(native) = self.caps.native() else {
            return Vec::new();
        };
        let Some(format) = native.kind.package_format() else {
            return Vec::new();
        };
        let Some(url) = browser.direct.as_ref().and_then(|d| d.url_for(format)) else {
            return Vec::new();
        };

        let file_name = url.rsplit('/').next().filter(|n| !n.is_empty()).unwrap_or("package");
        let dest = self.scratch.join(file_name);

        let mut steps = Vec::with_capacity(3);
        if format == PackageFormat::Rpm
            && let Some(rpm) = browser.repository.as_ref().and_then(|r| r.rpm.as_ref())
        {
            steps.push(Step::Run(import_key(rpm.key_url)));
        }
        steps.push(Step::Fetch { url, dest: dest.clone() });
        // apt-get needs a path, not a bare name, to treat the argument as a file
        steps.push(Step::Run(native.install_command(&dest.display().to_string())));

        vec![Recipe::new(Some(native.kind), steps)]
    }

    fn execute(&self, steps: &[Step], attempt: &mut InstallationAttempt) -> bool {
        for step in steps {
            let ok = match step {
                Step::Run(command) => {
                    info!("Running: {command}");
                    attempt.commands.push(command.to_string());
                    match self.host.run(command) {
                        Ok(out) => {
                            attempt.code = out.code;
                            attempt.record(&out.combined());
                            out.success
                        }
                        Err(why) => {
                            attempt.record(&format!("{}: {why}", command.program));
                            false
                        }
                    }
                }
                Step::Prepare(command) => {
                    info!("Running: {command}");
                    attempt.commands.push(command.to_string());
                    match self.host.run(command) {
                        Ok(out) if out.success => {}
                        Ok(out) => {
                            warn!(code = ?out.code, "{command} failed, continuing anyway");
                            attempt.record(&out.combined());
                        }
                        Err(why) => {
                            warn!(err = ?why, "{command} failed, continuing anyway");
                            attempt.record(&format!("{}: {why}", command.program));
                        }
                    }
                    true
                }
                Step::Fetch { url, dest } => {
                    info!("Downloading {url}");
                    self.host
                        .fetch(url, dest)
                        .inspect_err(|why| attempt.record(&format!("{why:#}")))
                        .is_ok()
                }
                Step::Write { path, contents } => self
                    .host
                    .write_file(path, contents)
                    .inspect_err(|why| attempt.record(&format!("{}: {why}", path.display())))
                    .is_ok()
            };

            if !ok {
                debug!(output = %attempt.output, "Step failed");
                return false;
            }
        }
        true
    }

    fn attempt(
        &self,
        browser: &'static BrowserDefinition,
        strategy: Strategy,
        setup: &[Step],
        recipes: &[Recipe]
    ) -> InstallationAttempt {
        let span = info_span!("strategy", %strategy);
        let _enter = span.enter();

        let mut attempt = InstallationAttempt::new(browser, strategy);
        attempt.manager = recipes.first().and_then(|r| r.manager);
        if self.execute(setup, &mut attempt) {
            for recipe in recipes {
                attempt.manager = recipe.manager;
                if self.execute(&recipe.steps, &mut attempt) {
                    attempt.success = true;
                    break;
                }
            }
        }

        if let Err(why) = self.host.remove_dir(&self.scratch) {
            warn!(err = ?why, path = %self.scratch.display(), "Failed to clean up downloads");
        }
        attempt
    }

    #[instrument(skip(self, browser), fields(browser = %browser), level = "debug")]
    pub fn install(&self, browser: &'static BrowserDefinition, preferred: Option<Strategy>) -> Result<InstallationAttempt> {
        let mut attempts = Vec::new();

        for strategy in Self::plan(preferred) {
            let recipes = self.recipes(browser, strategy);
            if recipes.is_empty() {
                debug!(%strategy, "Not available on this system, skipping");
                continue;
            }

            let attempt = self.attempt(browser, strategy, &self.setup(browser, strategy), &recipes);
            if attempt.success {
                return Ok(attempt);
            }

            let failure = ManagerError::StrategyFailure {
                browser: browser.name,
                strategy,
                reason: attempt.summary()
            };
            warn!("{failure}");
            attempts.push(attempt);
        }

        Err(ManagerError::AllStrategiesExhausted { browser: browser.name, attempts })
    }

    #[instrument(skip_all, fields(installation = %installation), level = "debug")]
    pub fn uninstall(&self, installation: &Installation) -> Result<InstallationAttempt> {
        let browser = installation.browser;
        let strategy = Strategy::for_source(&installation.installed_via);

        let command = match &installation.installed_via {
            InstalledVia::Native { manager, package } => {
                Some((*manager, PackageManagerDescriptor::lookup(*manager).remove_command(package)))
            }
            InstalledVia::Snap => installation.package_id().map(|name| {
                (ManagerKind::Snap, PackageManagerDescriptor::lookup(ManagerKind::Snap).remove_command(name))
            }),
            InstalledVia::Flatpak { user } => installation
                .package_id()
                .map(|app_id| (ManagerKind::Flatpak, flatpak_uninstall_command(app_id, *user))),
            InstalledVia::Manual { .. } => None
        };

        let Some((manager, command)) = command else {
            let reason = match &installation.installed_via {
                InstalledVia::Manual { path } => {
                    format!("installed by hand at {}, no package manager owns it", path.display())
                }
                _ => String::from("no package id is known for this source")
            };
            return Err(ManagerError::StrategyFailure { browser: browser.name, strategy, reason });
        };

        let recipe = Recipe::new(Some(manager), vec![Step::Run(command)]);
        let attempt = self.attempt(browser, strategy, &[], &[recipe]);
        if attempt.success {
            Ok(attempt)
        } else {
            Err(ManagerError::StrategyFailure { browser: browser.name, strategy, reason: attempt.summary() })
        }
    }
}

/// Copies a scratch file into a root-owned location.
fn place(source: &Path, dest: &str) -> CommandSpec {
    CommandSpec::new("install").args(["-D", "-m", "0644"]).arg(source.display().to_string()).arg(dest).elevated()
}

fn import_key(url: &str) -> CommandSpec {
    CommandSpec::new("rpm").args(["--import", url]).elevated()
}

// Understood by both dnf/yum and zypper
fn repo_file(repo: &RpmRepository) -> String {
    format!(
        "[{alias}]\nname={alias}\nbaseurl={url}\nenabled=1\nautorefresh=1\ntype=rpm-md\ngpgcheck=1\ngpgkey={key}\n",
        alias = repo.alias,
        url = repo.url,
        key = repo.key_url
    )
}
