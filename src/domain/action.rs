//! Typed actions proposed by the assistant.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a proposed file edit changes the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Edit,
    Create,
    Delete,
}

/// A proposed change to a single file.
///
/// Prefer [`FileEdit::edit`], [`FileEdit::create`] and [`FileEdit::delete`]:
/// they fill the content fields the change type needs and derive the line
/// counts. The fields stay public for deserialization, so the executor
/// still rejects an edit whose required content is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEdit {
    pub file: String,
    pub change_type: ChangeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_content: Option<String>,
    /// Lines in `new_content`
    pub added: usize,
    /// Lines in `old_content`
    pub removed: usize,
}

impl FileEdit {
    /// Replace the first occurrence of `old_content` with `new_content`.
    pub fn edit(
        file: impl Into<String>,
        old_content: impl Into<String>,
        new_content: impl Into<String>,
    ) -> Self {
        Self::build(
            file.into(),
            ChangeType::Edit,
            Some(old_content.into()),
            Some(new_content.into()),
        )
    }

    /// Write `new_content` as the whole file.
    pub fn create(file: impl Into<String>, new_content: impl Into<String>) -> Self {
        Self::build(file.into(), ChangeType::Create, None, Some(new_content.into()))
    }

    pub fn delete(file: impl Into<String>) -> Self {
        Self::build(file.into(), ChangeType::Delete, None, None)
    }

    fn build(
        file: String,
        change_type: ChangeType,
        old_content: Option<String>,
        new_content: Option<String>,
    ) -> Self {
        let added = count_lines(new_content.as_deref());
        let removed = count_lines(old_content.as_deref());
        Self {
            file,
            change_type,
            old_content,
            new_content,
            added,
            removed,
        }
    }
}

fn count_lines(content: Option<&str>) -> usize {
    content.map(|c| c.lines().count()).unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellCommand {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
}

impl ShellCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            working_directory: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInstall {
    pub language: String,
    pub packages: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowMode {
    #[default]
    Sequential,
    Parallel,
}

impl fmt::Display for WorkflowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WorkflowMode::Sequential => "sequential",
            WorkflowMode::Parallel => "parallel",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowConfiguration {
    pub workflow_name: String,
    pub commands: Vec<String>,
    pub mode: WorkflowMode,
    pub set_run_button: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,
    pub run_command: String,
}

/// Suggestion that the user open a workspace tool (secrets pane, database, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceToolNudge {
    pub tool_name: String,
    pub reason: String,
}

/// Inline reference to a knowledge source, written as `[path](rag://id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RagSourceReference {
    pub id: String,
    pub path: String,
}

/// Discriminant of [`Action`], in canonical batch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    FileEdit,
    ShellCommand,
    PackageInstall,
    WorkspaceToolNudge,
    WorkflowConfiguration,
    DeploymentConfiguration,
    RagSourceReference,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::FileEdit => "file_edit",
            ActionKind::ShellCommand => "shell_command",
            ActionKind::PackageInstall => "package_install",
            ActionKind::WorkspaceToolNudge => "workspace_tool_nudge",
            ActionKind::WorkflowConfiguration => "workflow_configuration",
            ActionKind::DeploymentConfiguration => "deployment_configuration",
            ActionKind::RagSourceReference => "rag_source_reference",
        }
    }

    /// Whether the batch executor runs this kind; the rest are informational.
    pub fn is_executable(&self) -> bool {
        matches!(
            self,
            ActionKind::FileEdit | ActionKind::ShellCommand | ActionKind::PackageInstall
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any action the assistant can propose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    FileEdit(FileEdit),
    ShellCommand(ShellCommand),
    PackageInstall(PackageInstall),
    WorkspaceToolNudge(WorkspaceToolNudge),
    WorkflowConfiguration(WorkflowConfiguration),
    DeploymentConfiguration(DeploymentConfiguration),
    RagSourceReference(RagSourceReference),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::FileEdit(_) => ActionKind::FileEdit,
            Action::ShellCommand(_) => ActionKind::ShellCommand,
            Action::PackageInstall(_) => ActionKind::PackageInstall,
            Action::WorkspaceToolNudge(_) => ActionKind::WorkspaceToolNudge,
            Action::WorkflowConfiguration(_) => ActionKind::WorkflowConfiguration,
            Action::DeploymentConfiguration(_) => ActionKind::DeploymentConfiguration,
            Action::RagSourceReference(_) => ActionKind::RagSourceReference,
        }
    }
}

impl Action {
    /// Short human-readable label, used in listings.
    pub fn describe(&self) -> String {
        match self {
            Action::FileEdit(edit) => describe_file_edit(edit),
            Action::ShellCommand(cmd) => describe_shell_command(cmd),
            Action::PackageInstall(install) => describe_package_install(install),
            Action::WorkspaceToolNudge(nudge) if nudge.reason.is_empty() => {
                format!("open the {} tool", nudge.tool_name)
            }
            Action::WorkspaceToolNudge(nudge) => {
                format!("open the {} tool: {}", nudge.tool_name, nudge.reason)
            }
            Action::WorkflowConfiguration(workflow) => format!(
                "workflow \"{}\" ({}, {} command(s){})",
                workflow.workflow_name,
                workflow.mode,
                workflow.commands.len(),
                if workflow.set_run_button { ", run button" } else { "" }
            ),
            Action::DeploymentConfiguration(deployment) => match &deployment.build_command {
                Some(build) => format!("deploy: build `{}`, run `{}`", build, deployment.run_command),
                None => format!("deploy: run `{}`", deployment.run_command),
            },
            Action::RagSourceReference(reference) => {
                format!("source \"{}\" ({})", reference.path, reference.id)
            }
        }
    }
}

fn describe_file_edit(edit: &FileEdit) -> String {
    match edit.change_type {
        ChangeType::Edit => format!("edit {} (+{} -{})", edit.file, edit.added, edit.removed),
        ChangeType::Create => format!("write {} (+{})", edit.file, edit.added),
        ChangeType::Delete => format!("delete {}", edit.file),
    }
}

fn describe_shell_command(cmd: &ShellCommand) -> String {
    match &cmd.working_directory {
        Some(dir) => format!("run `{}` in {}", cmd.command, dir),
        None => format!("run `{}`", cmd.command),
    }
}

fn describe_package_install(install: &PackageInstall) -> String {
    format!(
        "install {} package(s) for {}: {}",
        install.packages.len(),
        install.language,
        install.packages.join(", ")
    )
}

/// The actions the batch executor knows how to dispatch to a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutableAction {
    FileEdit(FileEdit),
    ShellCommand(ShellCommand),
    PackageInstall(PackageInstall),
}

impl ExecutableAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            ExecutableAction::FileEdit(_) => ActionKind::FileEdit,
            ExecutableAction::ShellCommand(_) => ActionKind::ShellCommand,
            ExecutableAction::PackageInstall(_) => ActionKind::PackageInstall,
        }
    }

    /// Short human-readable label, used in logs and listings.
    pub fn describe(&self) -> String {
        match self {
            ExecutableAction::FileEdit(edit) => describe_file_edit(edit),
            ExecutableAction::ShellCommand(cmd) => describe_shell_command(cmd),
            ExecutableAction::PackageInstall(install) => describe_package_install(install),
        }
    }
}

impl From<ExecutableAction> for Action {
    fn from(action: ExecutableAction) -> Self {
        match action {
            ExecutableAction::FileEdit(a) => Action::FileEdit(a),
            ExecutableAction::ShellCommand(a) => Action::ShellCommand(a),
            ExecutableAction::PackageInstall(a) => Action::PackageInstall(a),
        }
    }
}

impl TryFrom<Action> for ExecutableAction {
    type Error = Action;

    fn try_from(action: Action) -> Result<Self, Self::Error> {
        match action {
            Action::FileEdit(a) => Ok(ExecutableAction::FileEdit(a)),
            Action::ShellCommand(a) => Ok(ExecutableAction::ShellCommand(a)),
            Action::PackageInstall(a) => Ok(ExecutableAction::PackageInstall(a)),
            other => Err(other),
        }
    }
}
