//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# blotty configuration
# Only override what you want to change -- missing fields use defaults.

[server]
# address = "0.0.0.0"
# port = 8080
# permit_write = false          # let clients type into the terminal
# title_format = "{command}@{hostname}"   # also {argv}
# reconnect = false
# reconnect_time = 10           # seconds
# width = 0                     # 0 follows the client
# height = 0
# record_dir = "/var/log/blotty"

# Forwarded verbatim (as JSON) to the client terminal.
# [server.preferences]
# font-size = 14
"##
    .to_string()
}
