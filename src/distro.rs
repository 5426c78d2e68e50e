use color_eyre::eyre::Context;
use ini::{Ini, ParseOption};
use std::{fmt::Display, fs, path::Path};
use sysinfo::System;
use tracing::{debug, instrument, warn};

const OS_RELEASE: &str = "/etc/os-release";

/// Selects which package names a browser is published under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DistroFamily {
    Debian,
    Ubuntu,
    Fedora,
    Arch,
    OpenSuse,
    Other
}

impl DistroFamily {
    fn from_id(id: &str) -> Option<Self> {
        let family = match id.trim().to_lowercase().as_str() {
            "debian" | "raspbian" | "kali" | "parrot" => Self::Debian,
            "ubuntu" | "linuxmint" | "pop" | "elementary" | "zorin" => Self::Ubuntu,
            "fedora" | "rhel" | "centos" | "rocky" | "almalinux" => Self::Fedora,
            "arch" | "manjaro" | "endeavouros" | "garuda" | "artix" => Self::Arch,
            "opensuse-leap" | "opensuse-tumbleweed" | "opensuse" | "suse" | "sles" => {
                Self::OpenSuse
            }
            _ => return None
        };
        Some(family)
    }

    /// `ID` decides; `ID_LIKE` is consulted for derivatives we don't list by name.
    pub fn classify(id: &str, id_like: Option<&str>) -> Self {
        if let Some(family) = Self::from_id(id) {
            return family;
        }

        id_like
            .into_iter()
            .flat_map(str::split_whitespace)
            .find_map(Self::from_id)
            .unwrap_or(Self::Other)
    }
}

impl Display for DistroFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debian => write!(f, "Debian"),
            Self::Ubuntu => write!(f, "Ubuntu"),
            Self::Fedora => write!(f, "Fedora"),
            Self::Arch => write!(f, "Arch"),
            Self::OpenSuse => write!(f, "openSUSE"),
            Self::Other => write!(f, "Other")
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub id: String,
    pub id_like: Option<String>,
    pub pretty_name: Option<String>,
    pub version_id: Option<String>,
    pub codename: Option<String>
}

impl OsRelease {
    pub fn parse(contents: &str) -> color_eyre::Result<Self> {
        let opt = ParseOption { enabled_quote: true, ..ParseOption::default() };
        let doc = Ini::load_from_str_opt(contents, opt).wrap_err("Failed to parse os-release")?;
        let section = doc.general_section();
        let get = |key: &str| section.get(key).map(str::to_owned).filter(|v| !v.is_empty());

        Ok(Self {
            // os-release(5): ID defaults to "linux" when absent
            id: get("ID").unwrap_or_else(|| String::from("linux")),
            id_like: get("ID_LIKE"),
            pretty_name: get("PRETTY_NAME"),
            version_id: get("VERSION_ID"),
            codename: get("VERSION_CODENAME")
        })
    }

    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> color_eyre::Result<Self> {
        let contents = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&contents)
    }

    pub fn family(&self) -> DistroFamily {
        DistroFamily::classify(&self.id, self.id_like.as_deref())
    }
}

/// Facts shown at the top of every menu iteration.
#[derive(Clone, Debug)]
pub struct SystemInfo {
    pub distro: String,
    pub version: String,
    pub codename: Option<String>,
    pub kernel: String,
    pub host_name: String,
    pub family: DistroFamily
}

impl SystemInfo {
    pub fn gather() -> Self {
        let release = match OsRelease::load(Path::new(OS_RELEASE)) {
            Ok(r) => r,
            Err(why) => {
                warn!(err = ?why, "Failed to read os-release, assuming a generic distribution");
                OsRelease { id: System::distribution_id(), ..OsRelease::default() }
            }
        };

        let family = release.family();
        debug!(id = %release.id, %family, "Detected distribution");

        let unknown = || String::from("unknown");
        Self {
            distro: release.pretty_name.clone().or_else(System::name).unwrap_or_else(unknown),
            version: release.version_id.clone().or_else(System::os_version).unwrap_or_else(unknown),
            codename: release.codename,
            kernel: System::kernel_version().unwrap_or_else(unknown),
            host_name: System::host_name().unwrap_or_else(unknown),
            family
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UBUNTU: &str = r#"PRETTY_NAME="Ubuntu 24.04.1 LTS"
NAME="Ubuntu"
VERSION_ID="24.04"
VERSION="24.04.1 LTS (Noble Numbat)"
VERSION_CODENAME=noble
ID=ubuntu
ID_LIKE=debian
HOME_URL="https://www.ubuntu.com/"
"#;

    const NOBARA: &str = r#"NAME="Nobara Linux"
VERSION_ID=40
ID=nobara
ID_LIKE="rhel centos fedora"
PRETTY_NAME="Nobara Linux 40 (GNOME Edition)"
"#;

    #[test]
    fn parses_quoted_and_bare_values() {
        let release = OsRelease::parse(UBUNTU).unwrap();
        assert_eq!(release.id, "ubuntu");
        assert_eq!(release.id_like.as_deref(), Some("debian"));
        assert_eq!(release.pretty_name.as_deref(), Some("Ubuntu 24.04.1 LTS"));
        assert_eq!(release.version_id.as_deref(), Some("24.04"));
        assert_eq!(release.codename.as_deref(), Some("noble"));
        assert_eq!(release.family(), DistroFamily::Ubuntu);
    }

    #[test]
    fn unknown_id_falls_back_to_id_like() {
        let release = OsRelease::parse(NOBARA).unwrap();
        assert_eq!(release.id, "nobara");
        assert_eq!(release.family(), DistroFamily::Fedora);
    }

    #[test]
    fn missing_id_defaults_to_linux() {
        let release = OsRelease::parse("NAME=Something\n").unwrap();
        assert_eq!(release.id, "linux");
        assert_eq!(release.family(), DistroFamily::Other);
    }

    #[test]
    fn classify_known_ids() {
        assert_eq!(DistroFamily::classify("raspbian", None), DistroFamily::Debian);
        assert_eq!(DistroFamily::classify("linuxmint", Some("ubuntu debian")), DistroFamily::Ubuntu);
        assert_eq!(DistroFamily::classify("endeavouros", None), DistroFamily::Arch);
        assert_eq!(DistroFamily::classify("opensuse-tumbleweed", None), DistroFamily::OpenSuse);
        assert_eq!(DistroFamily::classify("gentoo", None), DistroFamily::Other);
    }

    #[test]
    fn first_recognised_id_like_wins() {
        assert_eq!(DistroFamily::classify("custom", Some("foo arch")), DistroFamily::Arch);
    }
}
