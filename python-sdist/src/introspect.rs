// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*!
Interrogating `setup.py` scripts with a Python interpreter.
*/

use {
    crate::distribution::SetupDistribution,
    anyhow::{anyhow, Context, Result},
    duct::cmd,
    log::{debug, warn},
    std::{
        ffi::OsString,
        path::{Path, PathBuf},
    },
};

/// Name of the setup script at the root of a source distribution.
pub const SETUP_SCRIPT: &str = "setup.py";

/// Name of the rewritten setup script used when `setup()` is hidden behind a main guard.
pub const MAIN_GUARD_SHIM_SCRIPT: &str = "setup2.py";

const INTROSPECT_SETUP_PY: &str = include_str!("introspect_setup.py");

/// Exit code of the helper when the setup script never called `setup()`.
const SETUP_NOT_CALLED_EXIT_CODE: i32 = 3;

enum HelperOutcome {
    Distribution(SetupDistribution),
    SetupNotCalled,
}

/// Runs a Python interpreter against a source tree to learn what it declares.
#[derive(Clone, Debug)]
pub struct SetupIntrospector {
    python: PathBuf,
}

impl SetupIntrospector {
    pub fn new(python: impl AsRef<Path>) -> Self {
        Self {
            python: python.as_ref().to_path_buf(),
        }
    }

    /// Describe the distribution declared by the setup script in `source_dir`.
    ///
    /// Setup scripts guarding `setup()` with `if __name__ == "__main__"` never
    /// call it when loaded for introspection. In that case the script is
    /// rewritten to [MAIN_GUARD_SHIM_SCRIPT] with the guard neutralized and
    /// introspection is attempted once more.
    pub fn introspect(&self, source_dir: &Path) -> Result<SetupDistribution> {
        let temp_dir = tempfile::Builder::new()
            .prefix("python-sdist-introspect")
            .tempdir()
            .context("creating temporary directory")?;

        let helper_path = temp_dir.path().join("introspect_setup.py");
        std::fs::write(&helper_path, INTROSPECT_SETUP_PY)
            .with_context(|| format!("writing {}", helper_path.display()))?;

        match self.run_helper(&helper_path, source_dir, SETUP_SCRIPT, temp_dir.path())? {
            HelperOutcome::Distribution(dist) => Ok(dist),
            HelperOutcome::SetupNotCalled => {
                warn!(
                    "{} never called setup(); retrying with {}",
                    SETUP_SCRIPT, MAIN_GUARD_SHIM_SCRIPT
                );
                write_main_guard_shim(source_dir)?;

                match self.run_helper(
                    &helper_path,
                    source_dir,
                    MAIN_GUARD_SHIM_SCRIPT,
                    temp_dir.path(),
                )? {
                    HelperOutcome::Distribution(dist) => Ok(dist),
                    HelperOutcome::SetupNotCalled => Err(anyhow!(
                        "{} in {} never calls setup()",
                        SETUP_SCRIPT,
                        source_dir.display()
                    )),
                }
            }
        }
    }

    fn run_helper(
        &self,
        helper_path: &Path,
        source_dir: &Path,
        setup_script: &str,
        state_dir: &Path,
    ) -> Result<HelperOutcome> {
        let output_path = state_dir.join(format!("{}.json", setup_script));

        debug!(
            "introspecting {} in {} with {}",
            setup_script,
            source_dir.display(),
            self.python.display()
        );

        let args: Vec<OsString> = vec![
            helper_path.into(),
            setup_script.into(),
            output_path.clone().into(),
        ];

        let output = cmd(&self.python, args)
            .dir(source_dir)
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .with_context(|| format!("running {}", self.python.display()))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!("{}", line);
        }

        if output.status.code() == Some(SETUP_NOT_CALLED_EXIT_CODE) {
            return Ok(HelperOutcome::SetupNotCalled);
        }

        if !output.status.success() {
            return Err(anyhow!(
                "introspecting {} failed: {}",
                source_dir.join(setup_script).display(),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let data = std::fs::read(&output_path)
            .with_context(|| format!("reading {}", output_path.display()))?;

        Ok(HelperOutcome::Distribution(SetupDistribution::from_json(&data)?))
    }

    /// Run `setup.py egg_info` and locate the `PKG-INFO` file it wrote.
    pub fn egg_info(&self, source_dir: &Path) -> Result<Option<PathBuf>> {
        debug!("running {} egg_info in {}", SETUP_SCRIPT, source_dir.display());

        let output = cmd(&self.python, &[SETUP_SCRIPT, "egg_info"])
            .dir(source_dir)
            .stderr_to_stdout()
            .stdout_capture()
            .unchecked()
            .run()
            .with_context(|| {
                format!(
                    "running {} {} egg_info",
                    self.python.display(),
                    SETUP_SCRIPT
                )
            })?;

        let output = String::from_utf8_lossy(&output.stdout);

        Ok(find_pkg_info_in_output(&output, source_dir))
    }
}

/// Write [MAIN_GUARD_SHIM_SCRIPT] next to the setup script.
///
/// The copy compares `__name__` against itself instead of `"__main__"`.
pub fn write_main_guard_shim(source_dir: &Path) -> Result<PathBuf> {
    let setup_path = source_dir.join(SETUP_SCRIPT);
    let shim_path = source_dir.join(MAIN_GUARD_SHIM_SCRIPT);

    let source = std::fs::read_to_string(&setup_path)
        .with_context(|| format!("reading {}", setup_path.display()))?;

    std::fs::write(&shim_path, source.replace("\"__main__\"", "__name__"))
        .with_context(|| format!("writing {}", shim_path.display()))?;

    Ok(shim_path)
}

/// Find the path of the `PKG-INFO` file mentioned in `egg_info` output.
///
/// Paths in the output are relative to `base`. Only paths that exist are
/// returned.
pub fn find_pkg_info_in_output(output: &str, base: &Path) -> Option<PathBuf> {
    output
        .lines()
        .filter(|line| line.contains(".egg-info/PKG-INFO"))
        .flat_map(|line| line.split_whitespace())
        .filter(|token| token.ends_with("PKG-INFO"))
        .map(|token| base.join(token))
        .find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use {super::*, indoc::indoc};

    #[test]
    fn main_guard_shim() -> Result<()> {
        let td = tempfile::tempdir()?;
        std::fs::write(
            td.path().join(SETUP_SCRIPT),
            indoc! {r#"
                from setuptools import setup

                if __name__ == "__main__":
                    setup(name="guarded")
            "#},
        )?;

        let shim = write_main_guard_shim(td.path())?;
        assert_eq!(shim, td.path().join(MAIN_GUARD_SHIM_SCRIPT));
        assert!(std::fs::read_to_string(&shim)?.contains("if __name__ == __name__:"));

        Ok(())
    }

    #[test]
    fn pkg_info_from_output() -> Result<()> {
        let td = tempfile::tempdir()?;
        let egg_info = td.path().join("src").join("demo.egg-info");
        std::fs::create_dir_all(&egg_info)?;
        std::fs::write(egg_info.join("PKG-INFO"), b"Name: demo\n")?;

        let output = indoc! {"
            running egg_info
            writing src/other.egg-info/PKG-INFO
            writing src/demo.egg-info/PKG-INFO
            writing dependency_links to src/demo.egg-info/dependency_links.txt
        "};

        assert_eq!(
            find_pkg_info_in_output(output, td.path()),
            Some(egg_info.join("PKG-INFO"))
        );
        assert_eq!(find_pkg_info_in_output("running egg_info\n", td.path()), None);

        Ok(())
    }

    /// A stand-in interpreter whose behavior is chosen by a `mode` file in
    /// the source directory. Every invocation is logged to `calls`.
    const FAKE_PYTHON: &str = indoc! {r#"
        #!/bin/sh
        echo "$2" >> calls
        case "$(cat mode)-$2" in
            guarded-setup.py) exit 3 ;;
            guarded-setup2.py) echo '{"name": "guarded"}' > "$3" ;;
            broken-*) echo "boom" >&2; exit 1 ;;
            *) exit 3 ;;
        esac
    "#};

    fn source_dir(root: &Path, mode: &str) -> Result<PathBuf> {
        let dir = root.join(mode);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("mode"), mode)?;
        std::fs::write(
            dir.join(SETUP_SCRIPT),
            "if __name__ == \"__main__\":\n    setup()\n",
        )?;

        Ok(dir)
    }

    fn calls(dir: &Path) -> Result<Vec<String>> {
        Ok(std::fs::read_to_string(dir.join("calls"))?
            .lines()
            .map(|l| l.to_string())
            .collect())
    }

    #[cfg(unix)]
    #[test]
    fn setup_not_called_retried_once() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let td = tempfile::tempdir()?;
        let python = td.path().join("python");
        std::fs::write(&python, FAKE_PYTHON)?;
        std::fs::set_permissions(&python, std::fs::Permissions::from_mode(0o755))?;

        let introspector = SetupIntrospector::new(&python);

        let guarded = source_dir(td.path(), "guarded")?;
        let dist = introspector.introspect(&guarded)?;
        assert_eq!(dist.name.as_deref(), Some("guarded"));
        assert_eq!(calls(&guarded)?, vec![SETUP_SCRIPT, MAIN_GUARD_SHIM_SCRIPT]);
        assert!(guarded.join(MAIN_GUARD_SHIM_SCRIPT).exists());

        let broken = source_dir(td.path(), "broken")?;
        let err = introspector.introspect(&broken).unwrap_err();
        assert!(format!("{:?}", err).contains("boom"));
        assert_eq!(calls(&broken)?, vec![SETUP_SCRIPT]);
        assert!(!broken.join(MAIN_GUARD_SHIM_SCRIPT).exists());

        let never = source_dir(td.path(), "never")?;
        assert!(introspector.introspect(&never).is_err());
        assert_eq!(calls(&never)?, vec![SETUP_SCRIPT, MAIN_GUARD_SHIM_SCRIPT]);

        Ok(())
    }

    #[test]
    fn helper_is_embedded() {
        assert!(INTROSPECT_SETUP_PY.contains("stop_after=\"config\""));
        assert!(INTROSPECT_SETUP_PY.contains(&format!(
            "EXIT_SETUP_NOT_CALLED = {}",
            SETUP_NOT_CALLED_EXIT_CODE
        )));
    }
}
