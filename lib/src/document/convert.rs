use std::process::Command;

use crate::config::Converter;
use crate::error::{Chainable, Fault, Result};

/// Converts `markdown` to `format` with the external `converter`.
///
/// The markdown is written to a temporary file and the converter is run as
/// `<program> --from=markdown --to=<format> --output=<out> [args...] <in>`.
/// Fails with [`Fault::ExternalProcess`] if the program can't be started or
/// exits unsuccessfully.
pub fn convert(converter: &Converter, markdown: &str, format: &str) -> Result<String> {
    let dir = tempfile::tempdir()
        .chain_with(|| error!("failed to create a directory for the converter"))?;

    let input = dir.path().join("document.md");
    let output = dir.path().join(format!("document.{format}"));
    std::fs::write(&input, markdown)
        .chain_with(|| error!("failed to write converter input", "path" => input.display()))?;

    let program = &*converter.program;
    tracing::info!(%program, %format, "running external converter");
    let result = Command::new(program)
        .arg("--from=markdown")
        .arg(format!("--to={format}"))
        .arg(format!("--output={}", output.display()))
        .args(&converter.args)
        .arg(&input)
        .output();

    let fault = match result {
        Ok(out) if out.status.success() => None,
        Ok(out) => Some(Fault::ExternalProcess {
            program: program.to_string(),
            status: out.status.code(),
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        }),
        Err(e) => Some(Fault::ExternalProcess {
            program: program.to_string(),
            status: None,
            stderr: e.to_string(),
        }),
    };

    if let Some(fault) = fault {
        tracing::warn!(%program, %format, "external converter failed: {fault}");
        return Err(fault.into());
    }

    std::fs::read_to_string(&output)
        .chain_with(|| error!("failed to read converter output", "path" => output.display()))
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    use super::*;

    fn script(dir: &Path, name: &str, body: &str) -> Converter {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        Converter { program: path.to_string_lossy().into(), args: vec!["--standalone".into()] }
    }

    // A fork in a concurrent test while a script is open for writing makes
    // exec fail with ETXTBSY, so every script runs from this one test.
    #[test]
    fn runs_the_converter() {
        let dir = tempfile::tempdir().unwrap();

        let echo = script(dir.path(), "echo-converter", r#"
for arg in "$@"; do
    case "$arg" in
        --output=*) out="${arg#--output=}" ;;
        --to=*) to="${arg#--to=}" ;;
        --standalone) standalone=yes ;;
    esac
    last="$arg"
done
{ echo "to=$to standalone=$standalone"; cat "$last"; } > "$out"
"#);

        let converted = convert(&echo, "# Hi\n", "latex").unwrap();
        assert_eq!(converted, "to=latex standalone=yes\n# Hi\n");

        let failing = script(dir.path(), "failing-converter", "echo 'bad input' >&2\nexit 3");
        let error = convert(&failing, "x", "latex").unwrap_err();
        match error.fault() {
            Some(Fault::ExternalProcess { status, stderr, .. }) => {
                assert_eq!(*status, Some(3));
                assert_eq!(stderr, "bad input");
            }
            fault => panic!("expected a process failure, found {fault:?}"),
        }

        let missing = Converter { program: "/nonexistent/converter".into(), args: vec![] };
        let error = convert(&missing, "x", "latex").unwrap_err();
        assert!(matches!(error.fault(), Some(Fault::ExternalProcess { status: None, .. })));
    }
}
