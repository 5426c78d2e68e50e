use crate::host::{CommandOutput, CommandSpec};
use std::fmt::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ManagerKind {
    Apt,
    Dnf,
    Yum,
    Pacman,
    Zypper,
    Snap,
    Flatpak
}

impl ManagerKind {
    pub const fn is_native(self) -> bool {
        !matches!(self, Self::Snap | Self::Flatpak)
    }

    /// Native package file format this manager can install from disk.
    pub const fn package_format(self) -> Option<PackageFormat> {
        match self {
            Self::Apt => Some(PackageFormat::Deb),
            Self::Dnf | Self::Yum | Self::Zypper => Some(PackageFormat::Rpm),
            Self::Pacman | Self::Snap | Self::Flatpak => None
        }
    }
}

impl Display for ManagerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Apt => write!(f, "APT"),
            Self::Dnf => write!(f, "DNF"),
            Self::Yum => write!(f, "YUM"),
            Self::Pacman => write!(f, "Pacman"),
            Self::Zypper => write!(f, "Zypper"),
            Self::Snap => write!(f, "Snap"),
            Self::Flatpak => write!(f, "Flatpak")
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackageFormat {
    Deb,
    Rpm
}

/// How a native manager is asked whether a package is installed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstalledQuery {
    /// `dpkg-query -W -f=${Status}`; stdout must contain `ok installed`.
    Dpkg,
    /// `rpm -q`; exit status decides.
    Rpm,
    /// `pacman -Q`; exit status decides.
    Pacman
}

impl InstalledQuery {
    pub fn command(self, package: &str) -> CommandSpec {
        match self {
            Self::Dpkg => CommandSpec::new("dpkg-query").args(["-W", "-f=${Status}", package]),
            Self::Rpm => CommandSpec::new("rpm").args(["-q", package]),
            Self::Pacman => CommandSpec::new("pacman").args(["-Q", package])
        }
    }

    pub fn is_installed(self, output: &CommandOutput) -> bool {
        match self {
            Self::Dpkg => output.success && output.stdout.contains("ok installed"),
            Self::Rpm | Self::Pacman => output.success
        }
    }
}

#[derive(Debug)]
pub struct PackageManagerDescriptor {
    pub kind: ManagerKind,
    /// Looked up on `PATH` to decide whether the manager is present.
    pub binary: &'static str,
    pub install: &'static [&'static str],
    pub remove: &'static [&'static str],
    pub refresh: Option<&'static [&'static str]>,
    pub query: Option<InstalledQuery>
}

impl PackageManagerDescriptor {
    pub fn install_command(&self, package: &str) -> CommandSpec {
        CommandSpec::new(self.binary).args(self.install.iter().copied()).arg(package).elevated()
    }

    pub fn remove_command(&self, package: &str) -> CommandSpec {
        CommandSpec::new(self.binary).args(self.remove.iter().copied()).arg(package).elevated()
    }

    pub fn refresh_command(&self) -> Option<CommandSpec> {
        self.refresh.map(|args| CommandSpec::new(self.binary).args(args.iter().copied()).elevated())
    }

    pub fn lookup(kind: ManagerKind) -> &'static Self {
        // The table has one entry per kind
        MANAGERS.iter().find(|m| m.kind == kind).unwrap_or(&MANAGERS[0])
    }
}

pub const FLATHUB_REPO: &str = "https://flathub.org/repo/flathub.flatpakrepo";

/// Detection order; the first native entry found is the host's native manager.
pub static MANAGERS: [PackageManagerDescriptor; 7] = [
    PackageManagerDescriptor {
        kind: ManagerKind::Apt,
        binary: "apt-get",
        install: &["install", "-y"],
        remove: &["remove", "-y"],
        refresh: Some(&["update"]),
        query: Some(InstalledQuery::Dpkg)
    },
    PackageManagerDescriptor {
        kind: ManagerKind::Dnf,
        binary: "dnf",
        install: &["install", "-y"],
        remove: &["remove", "-y"],
        refresh: None,
        query: Some(InstalledQuery::Rpm)
    },
    PackageManagerDescriptor {
        kind: ManagerKind::Yum,
        binary: "yum",
        install: &["install", "-y"],
        remove: &["remove", "-y"],
        refresh: None,
        query: Some(InstalledQuery::Rpm)
    },
    PackageManagerDescriptor {
        kind: ManagerKind::Pacman,
        binary: "pacman",
        install: &["-S", "--noconfirm", "--needed"],
        remove: &["-R", "--noconfirm"],
        refresh: None,
        query: Some(InstalledQuery::Pacman)
    },
    PackageManagerDescriptor {
        kind: ManagerKind::Zypper,
        binary: "zypper",
        install: &["install", "-y"],
        remove: &["remove", "-y"],
        refresh: Some(&["refresh"]),
        query: Some(InstalledQuery::Rpm)
    },
    PackageManagerDescriptor {
        kind: ManagerKind::Snap,
        binary: "snap",
        install: &["install"],
        remove: &["remove"],
        refresh: None,
        query: None
    },
    PackageManagerDescriptor {
        kind: ManagerKind::Flatpak,
        binary: "flatpak",
        install: &["install", "-y", "--noninteractive", "flathub"],
        remove: &["uninstall", "-y", "--noninteractive"],
        refresh: None,
        query: None
    }
];

/// AUR helpers, tried in this order on Pacman hosts.
pub const AUR_HELPERS: [&str; 2] = ["paru", "yay"];

pub fn aur_install_command(helper: &str, package: &str) -> CommandSpec {
    // makepkg refuses to run as root, the helper elevates on its own
    CommandSpec::new(helper).args(["-S", "--noconfirm", "--needed", package])
}

pub fn flathub_remote_command() -> CommandSpec {
    CommandSpec::new("flatpak")
        .args(["remote-add", "--if-not-exists", "flathub", FLATHUB_REPO])
        .elevated()
}

/// Per-user installs live in the caller's home and must not go through sudo.
pub fn flatpak_uninstall_command(app_id: &str, user: bool) -> CommandSpec {
    let flatpak = PackageManagerDescriptor::lookup(ManagerKind::Flatpak);
    let command = CommandSpec::new(flatpak.binary)
        .args(flatpak.remove.iter().copied())
        .arg(if user { "--user" } else { "--system" })
        .arg(app_id);

    if user { command } else { command.elevated() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_exactly_one_descriptor() {
        for kind in [
            ManagerKind::Apt,
            ManagerKind::Dnf,
            ManagerKind::Yum,
            ManagerKind::Pacman,
            ManagerKind::Zypper,
            ManagerKind::Snap,
            ManagerKind::Flatpak
        ] {
            assert_eq!(MANAGERS.iter().filter(|m| m.kind == kind).count(), 1, "{kind}");
            assert_eq!(PackageManagerDescriptor::lookup(kind).kind, kind);
        }
    }

    #[test]
    fn native_managers_can_query_installed_packages() {
        for m in &MANAGERS {
            assert_eq!(m.kind.is_native(), m.query.is_some(), "{}", m.kind);
        }
    }

    #[test]
    fn install_and_remove_are_elevated_and_end_with_the_package() {
        let apt = PackageManagerDescriptor::lookup(ManagerKind::Apt);
        let install = apt.install_command("firefox-esr");
        assert!(install.elevated);
        assert_eq!(install.to_string(), "sudo apt-get install -y firefox-esr");

        let flatpak = PackageManagerDescriptor::lookup(ManagerKind::Flatpak);
        assert_eq!(
            flatpak.remove_command("org.mozilla.firefox").to_string(),
            "sudo flatpak uninstall -y --noninteractive org.mozilla.firefox"
        );
    }

    #[test]
    fn refresh_only_where_the_manager_needs_it() {
        let apt = PackageManagerDescriptor::lookup(ManagerKind::Apt);
        assert_eq!(apt.refresh_command().map(|c| c.to_string()).as_deref(), Some("sudo apt-get update"));
        assert!(PackageManagerDescriptor::lookup(ManagerKind::Pacman).refresh_command().is_none());
    }

    #[test]
    fn dpkg_query_requires_installed_status() {
        let half = CommandOutput {
            code: Some(0),
            success: true,
            stdout: String::from("deinstall ok config-files"),
            stderr: String::new()
        };
        let full = CommandOutput { stdout: String::from("install ok installed"), ..half.clone() };

        assert!(!InstalledQuery::Dpkg.is_installed(&half));
        assert!(InstalledQuery::Dpkg.is_installed(&full));
        assert!(InstalledQuery::Rpm.is_installed(&half));
    }

    #[test]
    fn flatpak_uninstall_follows_the_install_scope() {
        let user = flatpak_uninstall_command("org.mozilla.firefox", true);
        assert!(!user.elevated);
        assert_eq!(user.to_string(), "flatpak uninstall -y --noninteractive --user org.mozilla.firefox");

        let system = flatpak_uninstall_command("org.mozilla.firefox", false);
        assert_eq!(system.to_string(), "sudo flatpak uninstall -y --noninteractive --system org.mozilla.firefox");
    }

    #[test]
    fn aur_helpers_are_not_elevated() {
        assert!(!aur_install_command("yay", "brave-bin").elevated);
    }
}
