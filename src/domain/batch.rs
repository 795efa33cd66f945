//! The ordered result of one extraction pass.

use serde::{Deserialize, Serialize};

use super::action::{
    Action, DeploymentConfiguration, ExecutableAction, FileEdit, PackageInstall,
    RagSourceReference, ShellCommand, WorkflowConfiguration, WorkspaceToolNudge,
};

/// Actions recovered from one piece of assistant output.
///
/// One list per kind. Within a list, entries keep the order in which they
/// appeared in the text; across kinds the order is fixed (see
/// [`ActionBatch::actions`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionBatch {
    pub file_edits: Vec<FileEdit>,
    pub shell_commands: Vec<ShellCommand>,
    pub package_installs: Vec<PackageInstall>,
    pub workspace_nudges: Vec<WorkspaceToolNudge>,
    pub workflow_configurations: Vec<WorkflowConfiguration>,
    pub deployment_configurations: Vec<DeploymentConfiguration>,
    pub rag_references: Vec<RagSourceReference>,
}

impl ActionBatch {
    pub fn len(&self) -> usize {
        self.file_edits.len()
            + self.shell_commands.len()
            + self.package_installs.len()
            + self.workspace_nudges.len()
            + self.workflow_configurations.len()
            + self.deployment_configurations.len()
            + self.rag_references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All actions in canonical kind order: file edits, shell commands,
    /// package installs, workspace nudges, workflow configurations,
    /// deployment configurations, RAG references.
    pub fn actions(&self) -> Vec<Action> {
        let mut actions = Vec::with_capacity(self.len());
        actions.extend(self.file_edits.iter().cloned().map(Action::FileEdit));
        actions.extend(self.shell_commands.iter().cloned().map(Action::ShellCommand));
        actions.extend(self.package_installs.iter().cloned().map(Action::PackageInstall));
        actions.extend(
            self.workspace_nudges
                .iter()
                .cloned()
                .map(Action::WorkspaceToolNudge),
        );
        actions.extend(
            self.workflow_configurations
                .iter()
                .cloned()
                .map(Action::WorkflowConfiguration),
        );
        actions.extend(
            self.deployment_configurations
                .iter()
                .cloned()
                .map(Action::DeploymentConfiguration),
        );
        actions.extend(
            self.rag_references
                .iter()
                .cloned()
                .map(Action::RagSourceReference),
        );
        actions
    }

    /// The subset the executor can run, in canonical order.
    pub fn executable(&self) -> Vec<ExecutableAction> {
        self.actions()
            .into_iter()
            .filter_map(|a| ExecutableAction::try_from(a).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ActionKind;

    #[test]
    fn test_canonical_order() {
        let batch = ActionBatch {
            rag_references: vec![RagSourceReference {
                id: "doc-1".to_string(),
                path: "docs/setup.md".to_string(),
            }],
            shell_commands: vec![ShellCommand::new("npm test")],
            file_edits: vec![FileEdit::create("index.js", "console.log(1)")],
            ..Default::default()
        };

        let kinds: Vec<_> = batch.actions().iter().map(Action::kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActionKind::FileEdit,
                ActionKind::ShellCommand,
                ActionKind::RagSourceReference
            ]
        );
        assert_eq!(batch.executable().len(), 2);
        assert_eq!(batch.len(), 3);
    }
}
