// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shiny Server launch-spec adapter.
//!
//! Shiny Server is configured through a small text file, so launching it
//! behind the proxy means rendering that file for the requested port and
//! site root, parking it in the temp directory, and handing
//! `shiny-server-launcher` the path. The rendered file is owned by a
//! [`ConfigFileGuard`] so it disappears once the host drops the launch.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use rsp_config::ProxyConfig;
use rsp_core::{AdapterError, Launch, LaunchSpec, LauncherEntry, RunContext, ServerAdapter};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Executable the host spawns; resolved from its PATH at spawn time.
pub const LAUNCHER_BIN: &str = "shiny-server-launcher";

/// Launcher UI title.
pub const TITLE: &str = "Shiny";

// Subdirectory names are load-bearing for existing deployments (bookmarks
// and logs already live there); do not correct the spelling.
const BOOKMARK_SUBDIR: &str = "shiny-server-boomarks";
const LOG_SUBDIR: &str = "logs";

/// Builds launch specifications for Shiny Server.
#[derive(Debug, Clone, Default)]
pub struct ShinyAdapter {
    site_dir: Option<PathBuf>,
}

impl ShinyAdapter {
    /// Adapter with no overrides; the site root is the context's cwd.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapter honoring the `[shiny]` section of a [`ProxyConfig`].
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self {
            site_dir: config.shiny.site_dir.as_ref().map(PathBuf::from),
        }
    }

    /// The site root served for this context: the configured override, else
    /// the context's working directory.
    pub fn site_dir<'a>(&'a self, ctx: &'a RunContext) -> &'a Path {
        self.site_dir.as_deref().unwrap_or(&ctx.cwd)
    }

    /// Render the Shiny Server configuration for a context and port.
    ///
    /// Bookmark state and logs go to fixed subdirectories of the site root;
    /// the server creates them on demand.
    pub fn render_config(&self, ctx: &RunContext, port: u16) -> String {
        let user = &ctx.user;
        let site = self.site_dir(ctx).display();
        format!(
            r#"run_as {user};
server {{
    bookmark_state_dir {site}/{BOOKMARK_SUBDIR};
    listen {port};
    location / {{
        site_dir {site};
        log_dir {site}/{LOG_SUBDIR};
        directory_index on;
    }}
}}
"#
        )
    }
}

impl ServerAdapter for ShinyAdapter {
    fn name(&self) -> &str {
        "shiny"
    }

    fn launcher_entry(&self) -> LauncherEntry {
        LauncherEntry::new(TITLE, icon_dir().join("shiny.svg"))
    }

    fn launch(&self, ctx: &RunContext, port: u16) -> Result<Launch, AdapterError> {
        let rendered = self.render_config(ctx, port);

        let mut file = tempfile::Builder::new()
            .prefix("shiny-server-")
            .suffix(".conf")
            .tempfile()?;
        file.write_all(rendered.as_bytes())?;
        file.flush()?;
        let guard = rsp_core::ConfigFileGuard::from(file.into_temp_path());

        debug!(
            target: "rsp.shiny",
            "rendered config for port {port} at {}",
            guard.path().display()
        );

        let spec = LaunchSpec::new(LAUNCHER_BIN).arg(guard.path().display().to_string());
        Ok(Launch::new(spec).with_config_file(guard))
    }
}

/// Icon directory shipped with this crate.
fn icon_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("icons")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::field_reassign_with_default)]
mod tests {
    use super::*;

    fn ctx() -> RunContext {
        RunContext::new("alice", "/srv/site")
    }

    #[test]
    fn rendered_config_listens_on_the_requested_port() {
        let adapter = ShinyAdapter::new();
        let conf = adapter.render_config(&ctx(), 8101);
        assert!(conf.contains("listen 8101;"));
    }

    #[test]
    fn rendered_config_runs_as_the_context_user() {
        let adapter = ShinyAdapter::new();
        let conf = adapter.render_config(&ctx(), 8101);
        assert!(conf.starts_with("run_as alice;\n"));
    }

    #[test]
    fn rendered_config_serves_the_context_cwd_by_default() {
        let adapter = ShinyAdapter::new();
        let conf = adapter.render_config(&ctx(), 8101);
        assert!(conf.contains("site_dir /srv/site;"));
        assert!(conf.contains("log_dir /srv/site/logs;"));
        assert!(conf.contains("bookmark_state_dir /srv/site/shiny-server-boomarks;"));
    }

    #[test]
    fn configured_site_dir_overrides_the_cwd() {
        let mut config = ProxyConfig::default();
        config.shiny.site_dir = Some("/srv/apps".into());
        let adapter = ShinyAdapter::from_config(&config);
        let conf = adapter.render_config(&ctx(), 8101);
        assert!(conf.contains("site_dir /srv/apps;"));
        assert!(!conf.contains("site_dir /srv/site;"));
    }

    #[test]
    fn launch_points_the_launcher_at_an_existing_config_file() {
        let adapter = ShinyAdapter::new();
        let launch = adapter.launch(&ctx(), 8101).unwrap();
        assert_eq!(launch.spec.program, LAUNCHER_BIN);
        assert_eq!(launch.spec.args.len(), 1);

        let guard = launch.config_file.as_ref().unwrap();
        assert_eq!(launch.spec.args[0], guard.path().display().to_string());
        let content = std::fs::read_to_string(guard.path()).unwrap();
        assert!(content.contains("listen 8101;"));
        assert!(content.contains("run_as alice;"));
    }

    #[test]
    fn dropping_the_launch_removes_the_config_file() {
        let adapter = ShinyAdapter::new();
        let launch = adapter.launch(&ctx(), 8101).unwrap();
        let path = launch.config_file.as_ref().unwrap().path().to_path_buf();
        assert!(path.exists());
        drop(launch);
        assert!(!path.exists());
    }

    #[test]
    fn environment_overrides_stay_empty() {
        // R-tooling env for Shiny is composed by the host, not this adapter.
        let adapter = ShinyAdapter::new();
        let launch = adapter.launch(&ctx(), 8101).unwrap();
        assert!(launch.spec.env.is_empty());
    }

    #[test]
    fn launcher_entry_icon_exists_in_the_crate() {
        let entry = ShinyAdapter::new().launcher_entry();
        assert_eq!(entry.title, "Shiny");
        assert!(entry.icon_path.exists(), "{:?}", entry.icon_path);
    }

    #[test]
    fn two_launches_use_distinct_config_files() {
        let adapter = ShinyAdapter::new();
        let a = adapter.launch(&ctx(), 8101).unwrap();
        let b = adapter.launch(&ctx(), 8101).unwrap();
        assert_ne!(a.spec.args[0], b.spec.args[0]);
    }
}
