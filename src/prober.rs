use crate::{
    browser::{BROWSERS, BrowserDefinition}, distro::DistroFamily, error::ManagerError, host::{CommandOutput, CommandSpec, Host}, installation::Installation, package_manager::{AUR_HELPERS, MANAGERS, ManagerKind, PackageManagerDescriptor}
};
use std::{
    collections::{HashMap, HashSet}, fmt::Display, path::{Path, PathBuf}
};
use tracing::{debug, instrument, trace};

/// Package managers found on the host, in detection order.
#[derive(Clone, Debug, Default)]
pub struct Capabilities {
    pub managers: Vec<&'static PackageManagerDescriptor>,
    pub aur_helper: Option<&'static str>
}

impl Capabilities {
    pub fn native(&self) -> Option<&'static PackageManagerDescriptor> {
        self.managers.iter().copied().find(|m| m.kind.is_native())
    }

    pub fn has(&self, kind: ManagerKind) -> bool {
        self.managers.iter().any(|m| m.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}

impl Display for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = self.managers.iter().map(|m| m.kind.to_string()).collect::<Vec<_>>();
        if names.is_empty() {
            return write!(f, "none");
        }
        write!(f, "{}", names.join(", "))
    }
}

#[instrument(skip_all, level = "debug")]
pub fn detect_package_managers<H: Host>(host: &H) -> Capabilities {
    let managers = MANAGERS.iter().filter(|m| host.command_exists(m.binary)).collect::<Vec<_>>();

    let aur_helper = if managers.iter().any(|m| m.kind == ManagerKind::Pacman) {
        AUR_HELPERS.into_iter().find(|h| host.command_exists(h))
    } else {
        None
    };

    let caps = Capabilities { managers, aur_helper };
    debug!(managers = %caps, aur_helper = ?caps.aur_helper, "Detected package managers");
    caps
}

/// Runs a read-only query. Anything that goes wrong means "not there".
fn probe<H: Host>(host: &H, command: &CommandSpec) -> Option<CommandOutput> {
    match host.run(command) {
        Ok(output) => Some(output),
        Err(why) => {
            let failure = ManagerError::DetectionFailure {
                command: command.to_string(),
                reason: why.to_string()
            };
            debug!(err = %failure, "Treating as absent");
            None
        }
    }
}

fn snap_names<H: Host>(host: &H) -> Option<HashSet<String>> {
    let output = probe(host, &CommandSpec::new("snap").arg("list"))?;
    if !output.success {
        // "No snaps are installed yet" comes with a non-zero exit on some versions
        return Some(HashSet::new());
    }

    let names = output
        .stdout
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_owned)
        .collect();
    Some(names)
}

/// Installed app ids mapped to whether the install is per-user.
fn flatpak_apps<H: Host>(host: &H) -> Option<HashMap<String, bool>> {
    let command = CommandSpec::new("flatpak").args(["list", "--app", "--columns=application,installation"]);
    let output = probe(host, &command)?;
    if !output.success {
        return None;
    }

    let apps = output
        .stdout
        .lines()
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            let app_id = columns.next()?;
            Some((app_id.to_owned(), columns.next() == Some("user")))
        })
        .collect();
    Some(apps)
}

/// System-wide then per-user deployment directories for an app, with their scope.
fn flatpak_app_dirs(app_id: &str) -> Vec<(PathBuf, bool)> {
    let mut roots = vec![(Path::new("/var/lib/flatpak/app").join(app_id), false)];
    if let Some(data) = dirs::data_dir() {
        roots.push((data.join("flatpak").join("app").join(app_id), true));
    }
    roots
}

fn native_package<H: Host>(
    host: &H,
    native: &PackageManagerDescriptor,
    browser: &BrowserDefinition,
    family: DistroFamily
) -> Option<&'static str> {
    let query = native.query?;
    browser.packages.for_family(family).iter().copied().find(|package| {
        let found = probe(host, &query.command(package)).is_some_and(|out| query.is_installed(&out));
        trace!(package, found, "Queried native package");
        found
    })
}

#[instrument(skip_all, fields(family = %family), level = "debug")]
pub fn detect_installed_browsers<H: Host>(
    host: &H,
    caps: &Capabilities,
    family: DistroFamily
) -> Vec<Installation> {
    let snaps = if caps.has(ManagerKind::Snap) { snap_names(host) } else { None };
    let flatpaks = if caps.has(ManagerKind::Flatpak) { flatpak_apps(host) } else { None };

    let mut installed = Vec::new();
    for browser in &BROWSERS {
        let before = installed.len();

        if let Some(native) = caps.native()
            && let Some(package) = native_package(host, native, browser, family)
        {
            installed.extend(Installation::builder(browser).native(native.kind, package).build());
        }

        if let (Some(snaps), Some(name)) = (&snaps, browser.snap)
            && snaps.contains(name)
        {
            installed.extend(Installation::builder(browser).snap().build());
        }

        if let Some(app_id) = browser.flatpak {
            let user = match &flatpaks {
                Some(apps) => apps.get(app_id).copied(),
                // Listing failed, the deployment directory still tells us
                None if caps.has(ManagerKind::Flatpak) => flatpak_app_dirs(app_id)
                    .into_iter()
                    .find(|(dir, _)| host.path_exists(dir))
                    .map(|(_, user)| user),
                None => None
            };
            if let Some(user) = user {
                installed.extend(Installation::builder(browser).flatpak(user).build());
            }
        }

        if installed.len() == before
            && let Some(path) = browser.manual_paths.iter().map(Path::new).find(|p| host.path_exists(p))
        {
            installed.extend(Installation::builder(browser).manual(path.to_path_buf()).build());
        }
    }

    debug!(count = installed.len(), "Detected installed browsers");
    installed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{host::fake::FakeHost, installation::InstalledVia};

    fn ids(installed: &[Installation]) -> Vec<(&str, String)> {
        installed.iter().map(|i| (i.browser.id, i.installed_via.to_string())).collect()
    }

    #[test]
    fn finds_managers_in_table_order() {
        let host = FakeHost::with_binaries(&["flatpak", "pacman", "yay", "snap"]);
        let caps = detect_package_managers(&host);

        let kinds = caps.managers.iter().map(|m| m.kind).collect::<Vec<_>>();
        assert_eq!(kinds, [ManagerKind::Pacman, ManagerKind::Snap, ManagerKind::Flatpak]);
        assert_eq!(caps.native().map(|m| m.kind), Some(ManagerKind::Pacman));
        assert_eq!(caps.aur_helper, Some("yay"));
    }

    #[test]
    fn aur_helper_ignored_off_arch() {
        let host = FakeHost::with_binaries(&["apt-get", "yay"]);
        assert_eq!(detect_package_managers(&host).aur_helper, None);
    }

    #[test]
    fn nothing_found_on_a_bare_host() {
        let caps = detect_package_managers(&FakeHost::default());
        assert!(caps.is_empty());
        assert!(caps.native().is_none());
        assert_eq!(caps.to_string(), "none");
    }

    #[test]
    fn detects_each_source() {
        let host = FakeHost::with_binaries(&["apt-get", "dpkg-query", "snap", "flatpak"])
            .preinstalled("native", "firefox-esr")
            .preinstalled("snap", "chromium")
            .preinstalled("flatpak", "com.brave.Browser");
        let caps = detect_package_managers(&host);

        let installed = detect_installed_browsers(&host, &caps, DistroFamily::Debian);
        assert_eq!(
            ids(&installed),
            [
                ("firefox", String::from("APT")),
                ("chromium", String::from("SNAP")),
                ("brave", String::from("FLATPAK"))
            ]
        );
        assert_eq!(
            installed[0].installed_via,
            InstalledVia::Native { manager: ManagerKind::Apt, package: String::from("firefox-esr") }
        );
    }

    #[test]
    fn one_browser_can_be_installed_several_ways() {
        let host = FakeHost::with_binaries(&["dnf", "rpm", "flatpak"])
            .preinstalled("native", "firefox")
            .preinstalled("flatpak", "org.mozilla.firefox");
        let caps = detect_package_managers(&host);

        let installed = detect_installed_browsers(&host, &caps, DistroFamily::Fedora);
        assert_eq!(ids(&installed), [("firefox", String::from("DNF")), ("firefox", String::from("FLATPAK"))]);
    }

    #[test]
    fn detection_is_idempotent() {
        let host = FakeHost::with_binaries(&["zypper", "rpm", "snap"])
            .preinstalled("native", "MozillaFirefox")
            .preinstalled("snap", "opera");
        let caps = detect_package_managers(&host);

        let first = detect_installed_browsers(&host, &caps, DistroFamily::OpenSuse);
        let second = detect_installed_browsers(&host, &caps, DistroFamily::OpenSuse);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn failing_probe_means_absent() {
        // dpkg-query missing: every native query errors out
        let host = FakeHost::with_binaries(&["apt-get"]).preinstalled("native", "firefox");
        let caps = detect_package_managers(&host);

        assert!(detect_installed_browsers(&host, &caps, DistroFamily::Ubuntu).is_empty());
    }

    #[test]
    fn manual_paths_only_when_nothing_else_matched() {
        let mut host = FakeHost::with_binaries(&["pacman"]).preinstalled("native", "chromium");
        host.paths.insert(PathBuf::from("/usr/bin/chromium"));
        host.paths.insert(PathBuf::from("/opt/firefox/firefox"));
        let caps = detect_package_managers(&host);

        let installed = detect_installed_browsers(&host, &caps, DistroFamily::Arch);
        assert_eq!(ids(&installed), [("firefox", String::from("MANUAL")), ("chromium", String::from("PACMAN"))]);
    }

    #[test]
    fn flatpak_directory_used_when_listing_fails() {
        let mut host = FakeHost::with_binaries(&["flatpak"]).failing("flatpak");
        host.paths.insert(PathBuf::from("/var/lib/flatpak/app/com.google.Chrome"));
        let caps = detect_package_managers(&host);

        let installed = detect_installed_browsers(&host, &caps, DistroFamily::Other);
        assert_eq!(ids(&installed), [("chrome", String::from("FLATPAK"))]);
    }

    #[test]
    fn flatpak_scope_comes_from_the_listing() {
        let host = FakeHost::with_binaries(&["flatpak"])
            .preinstalled("flatpak", "org.chromium.Chromium")
            .preinstalled("flatpak-user", "org.mozilla.firefox");
        let caps = detect_package_managers(&host);

        let installed = detect_installed_browsers(&host, &caps, DistroFamily::Other);
        let scopes = installed.iter().map(|i| (i.browser.id, i.installed_via.clone())).collect::<Vec<_>>();
        assert_eq!(
            scopes,
            [
                ("firefox", InstalledVia::Flatpak { user: true }),
                ("chromium", InstalledVia::Flatpak { user: false })
            ]
        );
    }

    #[test]
    fn user_flatpak_directory_is_user_scope() {
        let Some(data) = dirs::data_dir() else {
            return;
        };
        let mut host = FakeHost::with_binaries(&["flatpak"]).failing("flatpak");
        host.paths.insert(data.join("flatpak/app/org.mozilla.firefox"));
        let caps = detect_package_managers(&host);

        let installed = detect_installed_browsers(&host, &caps, DistroFamily::Other);
        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].installed_via, InstalledVia::Flatpak { user: true });
    }

    #[test]
    fn snap_listing_header_is_skipped() {
        let host = FakeHost::with_binaries(&["snap"]).preinstalled("snap", "firefox");
        let names = snap_names(&host).unwrap();
        assert!(names.contains("firefox"));
        assert!(!names.contains("Name"));
    }
}
