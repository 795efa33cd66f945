//! Per-kind parsing of recognized action tags.
//!
//! Every parser returns `Option`: `None` means the occurrence is incomplete
//! and is dropped from the batch without an error.

use tracing::debug;

use crate::domain::{
    ActionBatch, DeploymentConfiguration, FileEdit, PackageInstall, ShellCommand,
    WorkflowConfiguration, WorkflowMode, WorkspaceToolNudge,
};

use super::grammar::*;
use super::tokenizer::{find_close, Tag, TagKind, Tokenizer};

/// Walk `text` once and append every complete action tag to `batch`.
pub(super) fn collect_tagged(text: &str, batch: &mut ActionBatch) {
    let mut tokens = Tokenizer::new(text);

    while let Some(tag) = tokens.next() {
        let Some(action_tag) = ActionTag::from_name(tag.name) else {
            continue;
        };

        let body = match tag.kind {
            TagKind::Close => continue,
            TagKind::SelfClosing if action_tag.has_body() => {
                debug!("Skipping self-closing <{}> without body", tag.name);
                continue;
            }
            TagKind::SelfClosing => "",
            TagKind::Open => match find_close(text, tag.name, tag.span.end) {
                Some(close) => {
                    tokens.seek(close.end);
                    &text[tag.span.end..close.start]
                }
                None => {
                    debug!("Skipping unclosed <{}> at byte {}", tag.name, tag.span.start);
                    continue;
                }
            },
        };

        if !push_action(action_tag, &tag, body, batch) {
            debug!("Skipping incomplete <{}> at byte {}", tag.name, tag.span.start);
        }
    }
}

fn push_action(action_tag: ActionTag, tag: &Tag<'_>, body: &str, batch: &mut ActionBatch) -> bool {
    match action_tag {
        ActionTag::FileReplaceSubstring => {
            push_some(&mut batch.file_edits, parse_substring_edit(tag, body))
        }
        ActionTag::FileReplace | ActionTag::FileInsert => {
            push_some(&mut batch.file_edits, parse_whole_file(tag, body))
        }
        ActionTag::ShellCommand => push_some(&mut batch.shell_commands, parse_shell(tag, body)),
        ActionTag::PackageInstall => push_some(&mut batch.package_installs, parse_install(tag)),
        ActionTag::WorkspaceToolNudge => push_some(&mut batch.workspace_nudges, parse_nudge(tag)),
        ActionTag::WorkflowConfiguration => {
            push_some(&mut batch.workflow_configurations, parse_workflow(tag, body))
        }
        ActionTag::DeploymentConfiguration => {
            push_some(&mut batch.deployment_configurations, parse_deployment(tag))
        }
    }
}

fn push_some<T>(list: &mut Vec<T>, item: Option<T>) -> bool {
    match item {
        Some(item) => {
            list.push(item);
            true
        }
        None => false,
    }
}

/// Attribute value, trimmed, or `None` when missing or blank.
fn required_attr<'t>(tag: &'t Tag<'_>, name: &str) -> Option<&'t str> {
    tag.attr(name).map(str::trim).filter(|v| !v.is_empty())
}

/// Drop one framing newline after the opening tag and one before the
/// closing tag; the rest of the content is kept verbatim.
fn strip_framing(content: &str) -> &str {
    let content = content
        .strip_prefix("\r\n")
        .or_else(|| content.strip_prefix('\n'))
        .unwrap_or(content);
    content
        .strip_suffix("\r\n")
        .or_else(|| content.strip_suffix('\n'))
        .unwrap_or(content)
}

/// Content of the first `<name>…</name>` block inside `body`.
fn sub_block<'b>(body: &'b str, name: &str) -> Option<&'b str> {
    let open = Tokenizer::new(body).find(|t| t.name == name && t.kind == TagKind::Open)?;
    let close = find_close(body, name, open.span.end)?;
    Some(strip_framing(&body[open.span.end..close.start]))
}

fn parse_substring_edit(tag: &Tag<'_>, body: &str) -> Option<FileEdit> {
    let file = required_attr(tag, ATTR_FILE_PATH)?;
    let old = sub_block(body, OLD_STR)?;
    let new = sub_block(body, NEW_STR)?;
    Some(FileEdit::edit(file, old, new))
}

fn parse_whole_file(tag: &Tag<'_>, body: &str) -> Option<FileEdit> {
    let file = required_attr(tag, ATTR_FILE_PATH)?;
    Some(FileEdit::create(file, strip_framing(body)))
}

fn parse_shell(tag: &Tag<'_>, body: &str) -> Option<ShellCommand> {
    let command = body.trim();
    if command.is_empty() {
        return None;
    }
    Some(ShellCommand {
        command: command.to_string(),
        working_directory: required_attr(tag, ATTR_WORKING_DIRECTORY).map(str::to_string),
    })
}

fn parse_install(tag: &Tag<'_>) -> Option<PackageInstall> {
    let language = required_attr(tag, ATTR_LANGUAGE)?;
    let packages: Vec<String> = tag
        .attr(ATTR_PACKAGE_LIST)?
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();

    if packages.is_empty() {
        return None;
    }
    Some(PackageInstall {
        language: language.to_string(),
        packages,
    })
}

fn parse_nudge(tag: &Tag<'_>) -> Option<WorkspaceToolNudge> {
    Some(WorkspaceToolNudge {
        tool_name: required_attr(tag, ATTR_TOOL_NAME)?.to_string(),
        reason: tag.attr(ATTR_REASON).unwrap_or_default().trim().to_string(),
    })
}

fn parse_workflow(tag: &Tag<'_>, body: &str) -> Option<WorkflowConfiguration> {
    let workflow_name = required_attr(tag, ATTR_WORKFLOW_NAME)?;
    let mode = match tag.attr(ATTR_MODE).map(str::trim) {
        Some("parallel") => WorkflowMode::Parallel,
        _ => WorkflowMode::Sequential,
    };
    let set_run_button = tag.attr(ATTR_SET_RUN_BUTTON).map(str::trim) == Some("true");
    let commands = body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    Some(WorkflowConfiguration {
        workflow_name: workflow_name.to_string(),
        commands,
        mode,
        set_run_button,
    })
}

fn parse_deployment(tag: &Tag<'_>) -> Option<DeploymentConfiguration> {
    Some(DeploymentConfiguration {
        build_command: required_attr(tag, ATTR_BUILD_COMMAND).map(str::to_string),
        run_command: required_attr(tag, ATTR_RUN_COMMAND)?.to_string(),
    })
}
