//! Tests for workspace module.

#[cfg(test)]
mod tests {
    use crate::workspace::{
        HttpWorkspace, InMemoryWorkspace, LocalWorkspace, Workspace, WorkspaceError,
    };
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn local() -> (TempDir, LocalWorkspace) {
        let temp_dir = TempDir::new().unwrap();
        let workspace = LocalWorkspace::new(temp_dir.path());
        (temp_dir, workspace)
    }

    #[tokio::test]
    async fn test_local_write_read_delete() {
        let (temp_dir, workspace) = local();

        workspace
            .write_file("src/nested/app.txt", "hello\n")
            .await
            .unwrap();
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("src/nested/app.txt")).unwrap(),
            "hello\n"
        );
        assert_eq!(
            workspace.read_file("src/nested/app.txt").await.unwrap(),
            "hello\n"
        );

        workspace.delete_file("src/nested/app.txt").await.unwrap();
        assert!(matches!(
            workspace.read_file("src/nested/app.txt").await,
            Err(WorkspaceError::NotFound(_))
        ));
        assert!(matches!(
            workspace.delete_file("src/nested/app.txt").await,
            Err(WorkspaceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_local_rejects_paths_outside_root() {
        let (temp_dir, workspace) = local();

        for path in ["../escape.txt", "a/../../escape.txt", "/etc/passwd"] {
            assert!(
                matches!(
                    workspace.write_file(path, "x").await,
                    Err(WorkspaceError::OutsideWorkspace(_))
                ),
                "{} should be rejected",
                path
            );
        }

        // `..` that stays inside the root is fine, as is an absolute path under it
        workspace.write_file("a/../inside.txt", "ok").await.unwrap();
        let absolute = temp_dir.path().join("inside.txt");
        assert_eq!(
            workspace
                .read_file(absolute.to_str().unwrap())
                .await
                .unwrap(),
            "ok"
        );
    }

    #[tokio::test]
    async fn test_local_shell_success_and_failure() {
        let (temp_dir, workspace) = local();
        fs::create_dir(temp_dir.path().join("sub")).unwrap();

        let output = workspace
            .execute_shell("echo hi && pwd", Some("sub"))
            .await
            .unwrap();
        assert_eq!(output.exit_code, Some(0));
        assert!(output.stdout.starts_with("hi\n"));
        assert!(output.stdout.trim_end().ends_with("sub"));

        match workspace.execute_shell("echo oops >&2; exit 3", None).await {
            Err(WorkspaceError::CommandFailed {
                exit_code, stderr, ..
            }) => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr, "oops");
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_local_install_uses_package_manager_table() {
        let (temp_dir, workspace) = local();
        let workspace = workspace.with_package_managers(BTreeMap::from([(
            "nodejs".to_string(),
            vec!["sh".to_string(), "-c".to_string(), "echo \"$0\" > installed.txt".to_string()],
        )]));

        workspace
            .install_packages("NodeJS", &["lodash".to_string()])
            .await
            .unwrap();
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("installed.txt"))
                .unwrap()
                .trim(),
            "lodash"
        );

        assert!(matches!(
            workspace
                .install_packages("cobol", &["x".to_string()])
                .await,
            Err(WorkspaceError::UnsupportedLanguage(_))
        ));
    }

    #[tokio::test]
    async fn test_local_snapshot_skips_ignored_and_binary_files() {
        let (temp_dir, workspace) = local();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("build")).unwrap();
        fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(root.join("notes.txt"), "notes").unwrap();
        fs::write(root.join(".gitignore"), "build/\n").unwrap();
        fs::write(root.join("build/out.txt"), "generated").unwrap();
        fs::write(root.join("secret.pem"), "key").unwrap();
        fs::write(root.join("image.bin"), [0xff, 0xfe, 0x00, 0x01]).unwrap();

        let files = workspace.snapshot_files().await.unwrap();
        let paths: Vec<_> = files.paths().cloned().collect();
        assert_eq!(paths, vec!["notes.txt", "src/main.rs"]);
        assert_eq!(files.content("src/main.rs"), Some("fn main() {}"));
    }

    #[tokio::test]
    async fn test_memory_workspace_records_side_effects() {
        let workspace = InMemoryWorkspace::default();
        workspace.write_file("a.txt", "one").await.unwrap();
        workspace
            .execute_shell("npm test", Some("web"))
            .await
            .unwrap();
        workspace
            .install_packages("python", &["requests".to_string()])
            .await
            .unwrap();
        workspace.fail_command("make").await;

        assert!(workspace.execute_shell("make", None).await.is_err());
        assert_eq!(workspace.read_file("a.txt").await.unwrap(), "one");

        let commands = workspace.commands().await;
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].working_directory.as_deref(), Some("web"));
        assert_eq!(workspace.installs().await[0].packages, vec!["requests"]);

        workspace.delete_file("a.txt").await.unwrap();
        assert!(workspace.snapshot_files().await.unwrap().is_empty());
    }

    /// Serve each canned `(status line, body)` to one connection, in order.
    /// Returns the base URL and a handle yielding the raw requests.
    async fn serve(
        responses: Vec<(&'static str, &'static str)>,
    ) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut socket).await);
                let reply = format!(
                    "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
            requests
        });

        (format!("http://{}/host", addr), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())?
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn test_http_read_sends_token_and_path() {
        let (base_url, server) = serve(vec![("200 OK", r#"{"content":"fn main() {}"}"#)]).await;
        let workspace = HttpWorkspace::new(&base_url, Some("secret".to_string())).unwrap();

        let content = workspace.read_file("src/main.rs").await.unwrap();
        assert_eq!(content, "fn main() {}");

        let requests = server.await.unwrap();
        let request = &requests[0];
        assert!(request.starts_with("POST /host/api/fs/read "));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer secret"));
        assert!(request.contains(r#""path":"src/main.rs""#));
    }

    #[tokio::test]
    async fn test_http_non_success_status_is_an_error() {
        let (base_url, server) = serve(vec![
            ("500 Internal Server Error", r#"{"error":"disk full"}"#),
            ("404 Not Found", "{}"),
        ])
        .await;
        let workspace = HttpWorkspace::new(&base_url, None).unwrap();

        // Writes are sent once, even on a retriable status
        match workspace.write_file("a.txt", "x").await {
            Err(WorkspaceError::Status { status, body, .. }) => {
                assert_eq!(status, 500);
                assert!(body.contains("disk full"));
            }
            other => panic!("expected Status error, got {:?}", other),
        }

        assert!(matches!(
            workspace.read_file("missing.txt").await,
            Err(WorkspaceError::NotFound(_))
        ));

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(!requests[0].to_ascii_lowercase().contains("authorization"));
    }

    #[tokio::test]
    async fn test_http_shell_non_zero_exit_fails() {
        let (base_url, server) = serve(vec![
            ("200 OK", r#"{"stdout":"ok\n","stderr":"","exitCode":0}"#),
            ("200 OK", r#"{"stdout":"","stderr":"tests failed\n","exitCode":1}"#),
        ])
        .await;
        let workspace = HttpWorkspace::new(&base_url, None).unwrap();

        let output = workspace.execute_shell("npm test", Some("web")).await.unwrap();
        assert_eq!(output.stdout, "ok\n");

        match workspace.execute_shell("npm test", None).await {
            Err(WorkspaceError::CommandFailed {
                exit_code, stderr, ..
            }) => {
                assert_eq!(exit_code, Some(1));
                assert_eq!(stderr, "tests failed");
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }

        let requests = server.await.unwrap();
        assert!(requests[0].contains(r#""workingDirectory":"web""#));
        assert!(!requests[1].contains("workingDirectory"));
    }

    #[tokio::test]
    async fn test_http_snapshot() {
        let (base_url, server) = serve(vec![(
            "200 OK",
            r#"{"files":{"b.txt":"2","a.txt":"1"}}"#,
        )])
        .await;
        let workspace = HttpWorkspace::new(&base_url, None).unwrap();

        let files = workspace.snapshot_files().await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files.content("a.txt"), Some("1"));

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("GET /host/api/fs/snapshot "));
    }
}
