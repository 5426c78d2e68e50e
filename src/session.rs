use crate::{
    browser::{BROWSERS, BrowserDefinition}, dispatcher::{Dispatcher, InstallationAttempt, Strategy}, distro::SystemInfo, error::{ManagerError, Result}, host::Host, installation::Installation, package_manager::MANAGERS, prober::{Capabilities, detect_installed_browsers, detect_package_managers}
};
use std::env;
use tracing::{debug, instrument};

/// Everything probed from the host, kept until the next refresh.
pub struct Session<H: Host> {
    host: H,
    pub info: SystemInfo,
    pub caps: Capabilities,
    pub installed: Vec<Installation>
}

impl<H: Host> Session<H> {
    pub fn start(host: H) -> Result<Self> {
        if !cfg!(target_os = "linux") {
            return Err(ManagerError::EnvironmentUnsupported(format!(
                "only Linux is supported, this is {}",
                env::consts::OS
            )));
        }

        Self::with_info(host, SystemInfo::gather())
    }

    #[instrument(skip_all, fields(distro = %info.distro), level = "debug")]
    pub fn with_info(host: H, info: SystemInfo) -> Result<Self> {
        let caps = detect_package_managers(&host);
        if caps.is_empty() {
            let looked_for = MANAGERS.iter().map(|m| m.binary).collect::<Vec<_>>().join(", ");
            return Err(ManagerError::EnvironmentUnsupported(format!(
                "no supported package manager found (looked for {looked_for})"
            )));
        }

        let installed = detect_installed_browsers(&host, &caps, info.family);
        Ok(Self { host, info, caps, installed })
    }

    pub fn refresh(&mut self) {
        self.caps = detect_package_managers(&self.host);
        self.installed = detect_installed_browsers(&self.host, &self.caps, self.info.family);
        debug!(managers = %self.caps, installed = self.installed.len(), "Refreshed");
    }

    fn dispatcher(&self) -> Dispatcher<'_, H> {
        Dispatcher::new(&self.host, &self.caps, self.info.family)
    }

    pub fn applicable(&self, browser: &BrowserDefinition) -> Vec<Strategy> {
        self.dispatcher().applicable(browser)
    }

    /// Browsers with no detected installation, in table order.
    pub fn not_installed(&self) -> Vec<&'static BrowserDefinition> {
        BROWSERS.iter().filter(|b| !self.installed.iter().any(|i| i.browser == *b)).collect()
    }

    pub fn install(
        &mut self,
        browser: &'static BrowserDefinition,
        preferred: Option<Strategy>
    ) -> Result<InstallationAttempt> {
        let attempt = self.dispatcher().install(browser, preferred)?;
        self.refresh();
        Ok(attempt)
    }

    pub fn uninstall(&mut self, installation: &Installation) -> Result<InstallationAttempt> {
        let attempt = self.dispatcher().uninstall(installation)?;
        self.refresh();
        Ok(attempt)
    }
}
