use std::fs::File;
use std::io;
use std::io::Write;
use std::path::Path;

const CONFIG_SAMPLE: &str = r#"[site]
title = "Disconnection"
# background_url = "https://example.com/background.gif"

# For the file locations, If you want it to be relative to the executable directory
# use ${exe_dir}/location
[paths]
template_dir = "template"
public_dir = "public"

# kind = "rest" talks to a hosted PostgREST/GoTrue project.
# kind = "memory" keeps the tables in the process and signs in admin_email/admin_password.
[backend]
kind = "rest"
url = "https://your-project.supabase.co"
anon_key = "your-anon-key"
sort_order = "descending"

[uploader]
api_key = "your-imgbb-key"

[defaults]
suggestion_limit = 5
session_ttl_secs = 28800

[server]
address = "0.0.0.0"
port = 8001

[log]
level = "Info"
log_to_console = true
"#;

pub(crate) fn write_sample_cfg(file_path: &Path) -> io::Result<()> {
    let mut file = File::create(file_path)?;
    file.write_all(CONFIG_SAMPLE.as_bytes())
}
