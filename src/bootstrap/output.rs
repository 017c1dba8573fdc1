//! Publishes the setup outcome as GitHub Actions step outputs.

use std::fs::OpenOptions;
use std::io::Write;

use camino::Utf8Path;
use color_eyre::eyre::Context;
use uuid::Uuid;

use super::SetupOutcome;

/// File the runner collects step outputs from.
pub const GITHUB_OUTPUT_ENV: &str = "GITHUB_OUTPUT";

/// Pairs published for every successful run.
fn output_pairs(outcome: &SetupOutcome) -> [(&'static str, &str); 3] {
    [
        ("tools-dir", outcome.tools_dir.as_str()),
        ("codeql-path", outcome.codeql_path.as_str()),
        ("tools-version", outcome.tools_version.as_str()),
    ]
}

/// Appends the outputs to `output_file` using the multi-line delimiter form,
/// or writes `name=value` lines to stdout when no file is configured.
pub(super) fn write_outputs(
    outcome: &SetupOutcome,
    output_file: Option<&Utf8Path>,
) -> color_eyre::Result<()> {
    match output_file {
        Some(path) => {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .wrap_err_with(|| format!("failed to open {GITHUB_OUTPUT_ENV} file {path}"))?;
            file.write_all(render_file_outputs(outcome).as_bytes())
                .wrap_err_with(|| format!("failed to write {GITHUB_OUTPUT_ENV} file {path}"))
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            for (name, value) in output_pairs(outcome) {
                writeln!(stdout, "{name}={value}").context("failed to write outputs to stdout")?;
            }
            Ok(())
        }
    }
}

fn render_file_outputs(outcome: &SetupOutcome) -> String {
    output_pairs(outcome)
        .iter()
        .map(|(name, value)| {
            let delimiter = format!("ghadelimiter_{}", Uuid::new_v4());
            format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::SourceKind;
    use camino::Utf8PathBuf;
    use tempfile::tempdir;

    fn outcome() -> SetupOutcome {
        SetupOutcome {
            tools_dir: Utf8PathBuf::from("/cache/CodeQL/2.14.6"),
            codeql_path: Utf8PathBuf::from("/cache/CodeQL/2.14.6/codeql/codeql"),
            tools_version: "2.14.6".into(),
            source: SourceKind::Toolcache,
            cache_key: Some("2.14.6".into()),
            download_duration: None,
            extraction_duration: None,
        }
    }

    #[test]
    fn outputs_are_appended_with_delimiters() {
        let temp = tempdir().expect("tempdir");
        let path = Utf8PathBuf::from_path_buf(temp.path().join("output")).expect("utf8 path");
        std::fs::write(&path, "earlier=value\n").expect("seed output file");

        write_outputs(&outcome(), Some(&path)).expect("write outputs");

        let written = std::fs::read_to_string(&path).expect("read outputs");
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.first(), Some(&"earlier=value"));
        assert_eq!(lines.len(), 1 + 3 * 3);
        assert!(lines.iter().any(|line| line.starts_with("tools-dir<<ghadelimiter_")));
        assert!(lines.contains(&"/cache/CodeQL/2.14.6/codeql/codeql"));
        assert!(lines.contains(&"2.14.6"));
    }

    #[test]
    fn missing_output_directory_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let path = Utf8PathBuf::from_path_buf(temp.path().join("absent").join("output"))
            .expect("utf8 path");

        let err = write_outputs(&outcome(), Some(&path)).expect_err("missing parent");
        assert!(err.to_string().contains(GITHUB_OUTPUT_ENV));
    }
}
