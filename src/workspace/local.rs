use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info};

use super::{scanner, ShellOutput, Workspace, WorkspaceError};
use crate::checkpoint::FileSet;

/// Shell used when none is configured.
pub const DEFAULT_SHELL: &str = "sh";

/// Package-manager command prefix per language; packages are appended.
pub fn default_package_managers() -> BTreeMap<String, Vec<String>> {
    [
        ("nodejs", &["npm", "install"][..]),
        ("python", &["pip", "install"][..]),
        ("rust", &["cargo", "add"][..]),
        ("go", &["go", "get"][..]),
    ]
    .into_iter()
    .map(|(language, argv)| {
        (
            language.to_string(),
            argv.iter().map(|s| s.to_string()).collect(),
        )
    })
    .collect()
}

/// A workspace rooted at a directory on this machine.
#[derive(Debug, Clone)]
pub struct LocalWorkspace {
    root: PathBuf,
    shell: String,
    package_managers: BTreeMap<String, Vec<String>>,
}

impl LocalWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            shell: DEFAULT_SHELL.to_string(),
            package_managers: default_package_managers(),
        }
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn with_package_managers(mut self, package_managers: BTreeMap<String, Vec<String>>) -> Self {
        self.package_managers = package_managers;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a workspace path onto the filesystem, refusing anything that
    /// would land outside the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, WorkspaceError> {
        let outside = || WorkspaceError::OutsideWorkspace(path.to_string());

        let mut relative = Path::new(path);
        if relative.is_absolute() {
            relative = relative.strip_prefix(&self.root).map_err(|_| outside())?;
        }

        let mut resolved = self.root.clone();
        let mut depth = 0usize;
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    if depth == 0 {
                        return Err(outside());
                    }
                    resolved.pop();
                    depth -= 1;
                }
                Component::RootDir | Component::Prefix(_) => return Err(outside()),
            }
        }

        Ok(resolved)
    }

    async fn run(&self, mut command: Command, command_line: &str) -> Result<Output, WorkspaceError> {
        let output = command
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| WorkspaceError::io(command_line, e))?;

        if output.status.success() {
            Ok(output)
        } else {
            Err(WorkspaceError::CommandFailed {
                command: command_line.to_string(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[async_trait]
impl Workspace for LocalWorkspace {
    async fn read_file(&self, path: &str) -> Result<String, WorkspaceError> {
        let full = self.resolve(path)?;
        tokio::fs::read_to_string(&full)
            .await
            .map_err(|e| WorkspaceError::io(path, e))
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), WorkspaceError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| WorkspaceError::io(path, e))?;
        }
        tokio::fs::write(&full, content)
            .await
            .map_err(|e| WorkspaceError::io(path, e))?;
        debug!("Wrote {} ({} bytes)", path, content.len());
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<(), WorkspaceError> {
        let full = self.resolve(path)?;
        tokio::fs::remove_file(&full)
            .await
            .map_err(|e| WorkspaceError::io(path, e))?;
        debug!("Deleted {}", path);
        Ok(())
    }

    async fn execute_shell(
        &self,
        command: &str,
        working_directory: Option<&str>,
    ) -> Result<ShellOutput, WorkspaceError> {
        let cwd = match working_directory {
            Some(dir) => self.resolve(dir)?,
            None => self.root.clone(),
        };

        info!("Running `{}` in {}", command, cwd.display());
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(command).current_dir(&cwd);
        let output = self.run(cmd, command).await?;

        Ok(ShellOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }

    async fn install_packages(&self, language: &str, packages: &[String]) -> Result<(), WorkspaceError> {
        let argv = self
            .package_managers
            .get(language)
            .or_else(|| self.package_managers.get(&language.to_ascii_lowercase()))
            .filter(|argv| !argv.is_empty())
            .ok_or_else(|| WorkspaceError::UnsupportedLanguage(language.to_string()))?;

        if packages.is_empty() {
            debug!("No {} packages to install", language);
            return Ok(());
        }

        let command_line = argv
            .iter()
            .chain(packages)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        info!("Installing {} package(s): {}", language, command_line);

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]).args(packages).current_dir(&self.root);
        self.run(cmd, &command_line).await?;
        Ok(())
    }

    async fn snapshot_files(&self) -> Result<FileSet, WorkspaceError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || scanner::snapshot_directory(&root))
            .await
            .map_err(|e| {
                WorkspaceError::io(
                    self.root.display().to_string(),
                    std::io::Error::other(e.to_string()),
                )
            })
    }
}
