//! Window title rendering.

/// Values available to a title template.
#[derive(Debug, Clone)]
pub struct TitleVariables {
    pub command: String,
    pub argv: Vec<String>,
    pub hostname: String,
}

impl TitleVariables {
    /// Variables for `command`, using this machine's hostname.
    pub fn for_command(command: &str, argv: &[String]) -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| {
                tracing::warn!("could not determine hostname");
                "localhost".to_string()
            });
        Self {
            command: command.to_string(),
            argv: argv.to_vec(),
            hostname,
        }
    }
}

/// Substitute `{command}`, `{argv}` and `{hostname}` in `format`.
pub fn render_title(format: &str, vars: &TitleVariables) -> String {
    format
        .replace("{command}", &vars.command)
        .replace("{argv}", &vars.argv.join(" "))
        .replace("{hostname}", &vars.hostname)
}
