//! Container init script handed to the external executor.
//!
//! Written at container creation to
//! `{root}/nodes/{node}/pods/{sandbox-id}/{container-id}.sh`. The script
//! exports the container environment and bind-mounts its volumes; the
//! executor runs it, execri never does.

use execri_shared::errors::ExecriResult;
use execri_shared::{KeyValue, Mount};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

/// Interpreter line of every init script.
pub const SHEBANG: &str = "#!/usr/bin/env bash";

/// Permission bits of the written script.
pub const SCRIPT_MODE: u32 = 0o700;

/// Environment exports and bind mounts of one container, in request order.
#[derive(Debug, Clone, Copy)]
pub struct InitScript<'a> {
    envs: &'a [KeyValue],
    mounts: &'a [Mount],
}

impl<'a> InitScript<'a> {
    pub fn new(envs: &'a [KeyValue], mounts: &'a [Mount]) -> Self {
        Self { envs, mounts }
    }

    /// Render the script body.
    pub fn render(&self) -> String {
        let mut script = format!("{}\n\n", SHEBANG);

        for env in self.envs {
            let _ = writeln!(script, "export {}={}", quote(&env.key), quote(&env.value));
        }

        for mount in self.mounts {
            let _ = writeln!(
                script,
                "mount -o bind {} {}",
                quote(&mount.host_path),
                quote(&mount.container_path)
            );
        }

        script
    }

    /// Write the script to `path`, creating missing parent directories.
    ///
    /// An existing file is truncated. The file is left executable by its owner.
    pub fn write_to(&self, path: &Path) -> ExecriResult<()> {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(SCRIPT_MODE)
            .open(path)?;
        file.write_all(self.render().as_bytes())?;

        // mode() only applies when the file is created
        file.set_permissions(std::fs::Permissions::from_mode(SCRIPT_MODE))?;
        Ok(())
    }
}

/// Double-quote a value for the shell script.
///
/// `"`, `\`, `$` and `` ` `` are backslash-escaped, so the shell reads them
/// literally and never expands a value. Control characters become `\n`, `\t`,
/// `\r` or `\xNN`; bash keeps those sequences verbatim inside double quotes,
/// so such values reach the environment in escaped form.
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '$' => quoted.push_str("\\$"),
            '`' => quoted.push_str("\\`"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            c if c.is_control() && (c as u32) < 0x80 => {
                let _ = write!(quoted, "\\x{:02x}", c as u32);
            }
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
