use crate::{dispatcher::Strategy, distro::DistroFamily, package_manager::PackageFormat};
use std::fmt::Display;

/// Candidate package names per distribution family, most preferred first.
#[derive(Debug)]
pub struct Packages {
    pub debian: &'static [&'static str],
    pub ubuntu: &'static [&'static str],
    pub fedora: &'static [&'static str],
    pub arch: &'static [&'static str],
    pub opensuse: &'static [&'static str],
    pub default: &'static [&'static str]
}

impl Packages {
    pub const fn for_family(&self, family: DistroFamily) -> &'static [&'static str] {
        match family {
            DistroFamily::Debian => self.debian,
            DistroFamily::Ubuntu => self.ubuntu,
            DistroFamily::Fedora => self.fedora,
            DistroFamily::Arch => self.arch,
            DistroFamily::OpenSuse => self.opensuse,
            DistroFamily::Other => self.default
        }
    }

    /// Same names on every family.
    const fn everywhere(names: &'static [&'static str]) -> Self {
        Self { debian: names, ubuntu: names, fedora: names, arch: names, opensuse: names, default: names }
    }
}

/// A vendor APT repository, set up before the native install on APT hosts.
#[derive(Debug)]
pub struct AptRepository {
    pub key_url: &'static str,
    pub keyring: &'static str,
    pub list_file: &'static str,
    pub source_line: &'static str
}

/// A vendor RPM repository for DNF, YUM and Zypper hosts.
#[derive(Debug)]
pub struct RpmRepository {
    pub alias: &'static str,
    pub url: &'static str,
    pub key_url: &'static str
}

#[derive(Debug)]
pub struct VendorRepository {
    pub apt: Option<AptRepository>,
    pub rpm: Option<RpmRepository>
}

/// Package files the vendor publishes for installing without a repository.
#[derive(Debug)]
pub struct DirectDownload {
    pub deb: Option<&'static str>,
    pub rpm: Option<&'static str>
}

impl DirectDownload {
    pub const fn url_for(&self, format: PackageFormat) -> Option<&'static str> {
        match format {
            PackageFormat::Deb => self.deb,
            PackageFormat::Rpm => self.rpm
        }
    }
}

/// Shown after a successful install through one of `after`, or any strategy when empty.
#[derive(Debug)]
pub struct Note {
    pub after: &'static [Strategy],
    pub text: &'static str
}

#[derive(Debug)]
pub struct BrowserDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub packages: Packages,
    pub snap: Option<&'static str>,
    pub flatpak: Option<&'static str>,
    /// Installs that bypass every package manager.
    pub manual_paths: &'static [&'static str],
    pub repository: Option<VendorRepository>,
    pub direct: Option<DirectDownload>,
    /// Packages only found in the AUR on Arch.
    pub aur_only: bool,
    pub notes: &'static [Note]
}

impl BrowserDefinition {
    pub fn notes_for(&self, strategy: Strategy) -> impl Iterator<Item = &'static str> {
        self.notes.iter().filter(move |n| n.after.is_empty() || n.after.contains(&strategy)).map(|n| n.text)
    }

    #[cfg(test)]
    pub fn by_id(id: &str) -> Option<&'static Self> {
        BROWSERS.iter().find(|b| b.id == id)
    }
}

impl PartialEq for BrowserDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for BrowserDefinition {}

impl Display for BrowserDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

pub static BROWSERS: [BrowserDefinition; 10] = [
    BrowserDefinition {
        id: "firefox",
        name: "Mozilla Firefox",
        description: "Popular open-source web browser from Mozilla",
        packages: Packages {
            debian: &["firefox-esr", "firefox"],
            ubuntu: &["firefox"],
            fedora: &["firefox"],
            arch: &["firefox"],
            opensuse: &["MozillaFirefox"],
            default: &["firefox", "firefox-esr"]
        },
        snap: Some("firefox"),
        flatpak: Some("org.mozilla.firefox"),
        manual_paths: &["/opt/firefox/firefox"],
        repository: None,
        direct: None,
        aur_only: false,
        notes: &[]
    },
    BrowserDefinition {
        id: "chromium",
        name: "Chromium",
        description: "Open-source browser project that forms the basis for Chrome",
        packages: Packages {
            debian: &["chromium", "chromium-browser"],
            ubuntu: &["chromium-browser"],
            fedora: &["chromium"],
            arch: &["chromium"],
            opensuse: &["chromium"],
            default: &["chromium", "chromium-browser"]
        },
        snap: Some("chromium"),
        flatpak: Some("org.chromium.Chromium"),
        manual_paths: &["/usr/bin/chromium", "/usr/bin/chromium-browser"],
        repository: None,
        direct: None,
        aur_only: false,
        notes: &[Note {
            after: &[Strategy::Native],
            text: "On Ubuntu the chromium-browser package is a transitional wrapper around the Snap."
        }]
    },
    BrowserDefinition {
        id: "chrome",
        name: "Google Chrome",
        description: "Google's web browser",
        packages: Packages {
            debian: &["google-chrome-stable"],
            ubuntu: &["google-chrome-stable"],
            fedora: &["google-chrome-stable"],
            arch: &["google-chrome"],
            opensuse: &["google-chrome-stable"],
            default: &["google-chrome-stable", "google-chrome"]
        },
        snap: Some("google-chrome"),
        flatpak: Some("com.google.Chrome"),
        manual_paths: &["/usr/bin/google-chrome", "/opt/google/chrome/chrome"],
        repository: Some(VendorRepository {
            apt: None,
            rpm: Some(RpmRepository {
                alias: "google-chrome",
                url: "https://dl.google.com/linux/chrome/rpm/stable/x86_64",
                key_url: "https://dl.google.com/linux/linux_signing_key.pub"
            })
        }),
        direct: Some(DirectDownload {
            deb: Some("https://dl.google.com/linux/direct/google-chrome-stable_current_amd64.deb"),
            rpm: Some("https://dl.google.com/linux/direct/google-chrome-stable_current_x86_64.rpm")
        }),
        aur_only: true,
        notes: &[Note {
            after: &[Strategy::Native, Strategy::Direct],
            text: "The package registers Google's repository, so Chrome updates with the rest of the system."
        }]
    },
    BrowserDefinition {
        id: "tor-browser",
        name: "Tor Browser",
        description: "Privacy-focused browser for anonymous browsing",
        packages: Packages {
            debian: &["torbrowser-launcher"],
            ubuntu: &["torbrowser-launcher"],
            fedora: &["torbrowser-launcher"],
            arch: &["torbrowser-launcher"],
            opensuse: &["torbrowser-launcher"],
            default: &["torbrowser-launcher", "tor-browser"]
        },
        snap: None,
        flatpak: Some("org.torproject.torbrowser-launcher"),
        manual_paths: &[],
        repository: None,
        direct: None,
        aur_only: false,
        notes: &[Note { after: &[], text: "The launcher downloads and verifies Tor Browser itself on first run." }]
    },
    BrowserDefinition {
        id: "brave",
        name: "Brave Browser",
        description: "Privacy-focused browser based on Chromium",
        packages: Packages {
            debian: &["brave-browser"],
            ubuntu: &["brave-browser"],
            fedora: &["brave-browser"],
            arch: &["brave-bin"],
            opensuse: &["brave-browser"],
            default: &["brave-browser", "brave-bin"]
        },
        snap: Some("brave"),
        flatpak: Some("com.brave.Browser"),
        manual_paths: &["/opt/brave.com/brave/brave"],
        repository: Some(VendorRepository {
            apt: Some(AptRepository {
                key_url: "https://brave-browser-apt-release.s3.brave.com/brave-browser-archive-keyring.gpg",
                keyring: "/usr/share/keyrings/brave-browser-archive-keyring.gpg",
                list_file: "/etc/apt/sources.list.d/brave-browser-release.list",
                source_line: "deb [signed-by=/usr/share/keyrings/brave-browser-archive-keyring.gpg] https://brave-browser-apt-release.s3.brave.com/ stable main"
            }),
            rpm: Some(RpmRepository {
                alias: "brave-browser",
                url: "https://brave-browser-rpm-release.s3.brave.com/x86_64/",
                key_url: "https://brave-browser-rpm-release.s3.brave.com/brave-core.asc"
            })
        }),
        direct: None,
        aur_only: true,
        notes: &[]
    },
    BrowserDefinition {
        id: "vivaldi",
        name: "Vivaldi",
        description: "Feature-rich browser based on Chromium",
        packages: Packages {
            debian: &["vivaldi-stable"],
            ubuntu: &["vivaldi-stable"],
            fedora: &["vivaldi-stable"],
            arch: &["vivaldi"],
            opensuse: &["vivaldi-stable"],
            default: &["vivaldi-stable", "vivaldi"]
        },
        snap: Some("vivaldi"),
        flatpak: Some("com.vivaldi.Vivaldi"),
        manual_paths: &["/opt/vivaldi/vivaldi"],
        repository: None,
        direct: None,
        aur_only: false,
        notes: &[]
    },
    BrowserDefinition {
        id: "opera",
        name: "Opera",
        description: "Feature-rich browser with built-in VPN",
        packages: Packages {
            debian: &["opera-stable"],
            ubuntu: &["opera-stable"],
            fedora: &["opera-stable"],
            arch: &["opera"],
            opensuse: &["opera"],
            default: &["opera-stable", "opera"]
        },
        snap: Some("opera"),
        flatpak: Some("com.opera.Opera"),
        manual_paths: &[],
        repository: None,
        direct: None,
        aur_only: false,
        notes: &[]
    },
    BrowserDefinition {
        id: "edge",
        name: "Microsoft Edge",
        description: "Microsoft's Chromium-based browser",
        packages: Packages {
            debian: &["microsoft-edge-stable"],
            ubuntu: &["microsoft-edge-stable"],
            fedora: &["microsoft-edge-stable"],
            arch: &["microsoft-edge-stable-bin"],
            opensuse: &["microsoft-edge-stable"],
            default: &["microsoft-edge-stable", "microsoft-edge"]
        },
        snap: None,
        flatpak: Some("com.microsoft.Edge"),
        manual_paths: &["/opt/microsoft/msedge/msedge"],
        repository: None,
        direct: None,
        aur_only: true,
        notes: &[]
    },
    BrowserDefinition {
        id: "falkon",
        name: "Falkon",
        description: "KDE web browser using QtWebEngine",
        packages: Packages::everywhere(&["falkon"]),
        snap: Some("falkon"),
        flatpak: Some("org.kde.falkon"),
        manual_paths: &[],
        repository: None,
        direct: None,
        aur_only: false,
        notes: &[]
    },
    BrowserDefinition {
        id: "midori",
        name: "Midori",
        description: "Lightweight web browser",
        packages: Packages::everywhere(&["midori"]),
        snap: Some("midori"),
        flatpak: Some("org.midori_browser.Midori"),
        manual_paths: &[],
        repository: None,
        direct: None,
        aur_only: false,
        notes: &[]
    }
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique() {
        let ids = BROWSERS.iter().map(|b| b.id).collect::<HashSet<_>>();
        assert_eq!(ids.len(), BROWSERS.len());
    }

    #[test]
    fn every_browser_has_a_package_for_every_family() {
        for browser in &BROWSERS {
            for family in [
                DistroFamily::Debian,
                DistroFamily::Ubuntu,
                DistroFamily::Fedora,
                DistroFamily::Arch,
                DistroFamily::OpenSuse,
                DistroFamily::Other
            ] {
                assert!(
                    !browser.packages.for_family(family).is_empty(),
                    "{} has no package for {family}",
                    browser.id
                );
            }
        }
    }

    #[test]
    fn lookup_by_id() {
        assert_eq!(BrowserDefinition::by_id("chrome").map(|b| b.name), Some("Google Chrome"));
        assert!(BrowserDefinition::by_id("netscape").is_none());
    }

    #[test]
    fn family_selects_package_names() {
        let firefox = BrowserDefinition::by_id("firefox").unwrap();
        assert_eq!(firefox.packages.for_family(DistroFamily::Debian), ["firefox-esr", "firefox"]);
        assert_eq!(firefox.packages.for_family(DistroFamily::OpenSuse), ["MozillaFirefox"]);
    }

    #[test]
    fn notes_follow_the_strategy_used() {
        let chrome = BrowserDefinition::by_id("chrome").unwrap();
        assert_eq!(chrome.notes_for(Strategy::Direct).count(), 1);
        assert_eq!(chrome.notes_for(Strategy::Flatpak).count(), 0);
        assert_eq!(chrome.notes_for(Strategy::Snap).count(), 0);

        let tor = BrowserDefinition::by_id("tor-browser").unwrap();
        assert_eq!(tor.notes_for(Strategy::Flatpak).count(), 1);
    }

    #[test]
    fn chrome_downloads_both_package_formats() {
        let direct = BrowserDefinition::by_id("chrome").and_then(|b| b.direct.as_ref()).unwrap();
        assert!(direct.url_for(PackageFormat::Deb).unwrap().ends_with(".deb"));
        assert!(direct.url_for(PackageFormat::Rpm).unwrap().ends_with(".rpm"));
    }
}
