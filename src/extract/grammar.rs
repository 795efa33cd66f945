//! Tag grammar: the literal markup vocabulary for proposed actions.
//!
//! Tag and attribute names are part of the contract with the model prompt
//! and are matched case-sensitively.

pub const FILE_REPLACE_SUBSTRING: &str = "proposed_file_replace_substring";
pub const FILE_REPLACE: &str = "proposed_file_replace";
pub const FILE_INSERT: &str = "proposed_file_insert";
pub const SHELL_COMMAND: &str = "proposed_shell_command";
pub const PACKAGE_INSTALL: &str = "proposed_package_install";
pub const WORKSPACE_TOOL_NUDGE: &str = "proposed_workspace_tool_nudge";
pub const WORKFLOW_CONFIGURATION: &str = "proposed_workflow_configuration";
pub const DEPLOYMENT_CONFIGURATION: &str = "proposed_deployment_configuration";

/// Sub-blocks inside `proposed_file_replace_substring`.
pub const OLD_STR: &str = "old_str";
pub const NEW_STR: &str = "new_str";

pub const ATTR_FILE_PATH: &str = "file_path";
pub const ATTR_WORKING_DIRECTORY: &str = "working_directory";
pub const ATTR_LANGUAGE: &str = "language";
pub const ATTR_PACKAGE_LIST: &str = "package_list";
pub const ATTR_TOOL_NAME: &str = "tool_name";
pub const ATTR_REASON: &str = "reason";
pub const ATTR_WORKFLOW_NAME: &str = "workflow_name";
pub const ATTR_SET_RUN_BUTTON: &str = "set_run_button";
pub const ATTR_MODE: &str = "mode";
pub const ATTR_BUILD_COMMAND: &str = "build_command";
pub const ATTR_RUN_COMMAND: &str = "run_command";

/// Pseudo-scheme for inline knowledge-source links: `[label](rag://id)`.
pub const RAG_SCHEME: &str = "rag://";

/// Action tags the extractor recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionTag {
    FileReplaceSubstring,
    FileReplace,
    FileInsert,
    ShellCommand,
    PackageInstall,
    WorkspaceToolNudge,
    WorkflowConfiguration,
    DeploymentConfiguration,
}

impl ActionTag {
    pub fn from_name(name: &str) -> Option<Self> {
        let tag = match name {
            FILE_REPLACE_SUBSTRING => ActionTag::FileReplaceSubstring,
            FILE_REPLACE => ActionTag::FileReplace,
            FILE_INSERT => ActionTag::FileInsert,
            SHELL_COMMAND => ActionTag::ShellCommand,
            PACKAGE_INSTALL => ActionTag::PackageInstall,
            WORKSPACE_TOOL_NUDGE => ActionTag::WorkspaceToolNudge,
            WORKFLOW_CONFIGURATION => ActionTag::WorkflowConfiguration,
            DEPLOYMENT_CONFIGURATION => ActionTag::DeploymentConfiguration,
            _ => return None,
        };
        Some(tag)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActionTag::FileReplaceSubstring => FILE_REPLACE_SUBSTRING,
            ActionTag::FileReplace => FILE_REPLACE,
            ActionTag::FileInsert => FILE_INSERT,
            ActionTag::ShellCommand => SHELL_COMMAND,
            ActionTag::PackageInstall => PACKAGE_INSTALL,
            ActionTag::WorkspaceToolNudge => WORKSPACE_TOOL_NUDGE,
            ActionTag::WorkflowConfiguration => WORKFLOW_CONFIGURATION,
            ActionTag::DeploymentConfiguration => DEPLOYMENT_CONFIGURATION,
        }
    }

    /// Whether the action is carried by the tag body. Tags that only use
    /// attributes may also be written self-closing.
    pub fn has_body(&self) -> bool {
        matches!(
            self,
            ActionTag::FileReplaceSubstring
                | ActionTag::FileReplace
                | ActionTag::FileInsert
                | ActionTag::ShellCommand
                | ActionTag::WorkflowConfiguration
        )
    }
}
