use crate::{browser::BrowserDefinition, package_manager::ManagerKind};
use std::{fmt::Display, path::PathBuf};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstalledVia {
    Native { manager: ManagerKind, package: String },
    Snap,
    /// `user` for per-user installs under the home directory.
    Flatpak { user: bool },
    Manual { path: PathBuf }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Installation {
    pub browser: &'static BrowserDefinition,
    pub installed_via: InstalledVia
}

impl Installation {
    pub const fn builder(browser: &'static BrowserDefinition) -> InstallationBuilder {
        InstallationBuilder::new(browser)
    }

    /// What the uninstall command has to name.
    pub fn package_id(&self) -> Option<&str> {
        match &self.installed_via {
            InstalledVia::Native { package, .. } => Some(package),
            InstalledVia::Snap => self.browser.snap,
            InstalledVia::Flatpak { .. } => self.browser.flatpak,
            InstalledVia::Manual { .. } => None
        }
    }
}

pub struct InstallationBuilder {
    browser: &'static BrowserDefinition,
    installed_via: Option<InstalledVia>
}

impl InstallationBuilder {
    const fn new(browser: &'static BrowserDefinition) -> Self {
        Self { browser, installed_via: None }
    }

    #[inline]
    pub fn native(mut self, manager: ManagerKind, package: &str) -> Self {
        self.installed_via = Some(InstalledVia::Native { manager, package: package.to_owned() });
        self
    }

    #[inline]
    pub fn snap(mut self) -> Self {
        self.installed_via = Some(InstalledVia::Snap);
        self
    }

    #[inline]
    pub fn flatpak(mut self, user: bool) -> Self {
        self.installed_via = Some(InstalledVia::Flatpak { user });
        self
    }

    #[inline]
    pub fn manual(mut self, path: PathBuf) -> Self {
        self.installed_via = Some(InstalledVia::Manual { path });
        self
    }

    /// `None` until a source was recorded.
    pub fn build(self) -> Option<Installation> {
        Some(Installation { browser: self.browser, installed_via: self.installed_via? })
    }
}

impl Display for InstalledVia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native { manager, .. } => write!(f, "{}", manager.to_string().to_uppercase()),
            Self::Snap => write!(f, "SNAP"),
            Self::Flatpak { .. } => write!(f, "FLATPAK"),
            Self::Manual { .. } => write!(f, "MANUAL")
        }
    }
}

impl Display for Installation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.browser, self.installed_via)
    }
}
